//! Annotation Store service
//!
//! Clusters belong to a workspace, mentions belong to a cluster. Every
//! mutating call is one transaction; cascades (cluster → mentions,
//! workspace → clusters → mentions) are issued explicitly inside it so
//! the store is never left half-deleted.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::errors::{CoreError, CoreResult};
use crate::events::{AnnotationEvent, EventSink};
use crate::ids::{ClusterId, DocumentId, MentionId, WorkspaceId};
use crate::observability::{log_event_with_fields, Event, HealthCheck};
use crate::storage::{Database, Mutation, Tables};
use crate::text_index::join_tokens;

use super::model::{Cluster, Mention};
use super::span::{Span, SpanResolution};

/// Counts removed by `delete_all_annotations`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearedWorkspace {
    pub clusters: usize,
    pub mentions: usize,
}

pub struct AnnotationStore {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

fn cluster_not_found(cluster_id: ClusterId) -> CoreError {
    CoreError::not_found(format!("cluster {}", cluster_id))
}

fn mention_not_found(mention_id: MentionId) -> CoreError {
    CoreError::not_found(format!("mention {}", mention_id))
}

/// Document bound by the cluster's mentions. All mentions share it.
fn bound_document(tables: &Tables, cluster_id: ClusterId) -> Option<DocumentId> {
    tables
        .mentions_in_cluster(cluster_id)
        .next()
        .map(|m| m.document_id)
}

impl AnnotationStore {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        Self { db, events }
    }

    pub fn create_cluster(&self, workspace_id: WorkspaceId) -> CoreResult<Cluster> {
        let cluster = self.db.transaction_then(
            |txn| {
                let cluster = Cluster {
                    id: ClusterId::new(),
                    workspace_id,
                    ordinal: txn.tables().next_ordinal(),
                    created_at: Utc::now(),
                };
                txn.apply(Mutation::InsertCluster {
                    cluster: cluster.clone(),
                })?;
                Ok::<_, CoreError>(cluster)
            },
            |cluster: &Cluster| {
                self.events
                    .publish(AnnotationEvent::cluster_created(workspace_id, cluster.id))
            },
        )?;

        log_event_with_fields(
            Event::ClusterCreated,
            &[
                ("cluster_id", &cluster.id.to_string()),
                ("workspace_id", &workspace_id.to_string()),
            ],
        );
        self.db.metrics().increment_clusters_created();

        Ok(cluster)
    }

    /// Add a mention covering global tokens `[token_start_index, token_end_index]`.
    ///
    /// Checked in order: both bounds non-negative with `start <= end`
    /// (`Validation`), the cluster exists (`NotFound`), the document has
    /// tokens and the span fits inside it (`Validation`), and the cluster
    /// is not already bound to another document (`Validation`). The span
    /// is checked against the index inside the same transaction as the
    /// insert.
    pub fn add_mention(
        &self,
        cluster_id: ClusterId,
        document_id: DocumentId,
        token_start_index: i64,
        token_end_index: i64,
    ) -> CoreResult<Mention> {
        let result = Span::checked(token_start_index, token_end_index).and_then(|span| {
            self.db.transaction_then(
                |txn| {
                    let tables = txn.tables();
                    let workspace_id = tables
                        .cluster(cluster_id)
                        .map(|c| c.workspace_id)
                        .ok_or_else(|| cluster_not_found(cluster_id))?;

                    span.check_within(document_id, tables.max_global_index(document_id))?;

                    if let Some(bound) = bound_document(tables, cluster_id) {
                        if bound != document_id {
                            return Err(CoreError::validation(format!(
                                "cluster {} already holds mentions in document {}",
                                cluster_id, bound
                            )));
                        }
                    }

                    let mention = Mention {
                        id: MentionId::new(),
                        cluster_id,
                        document_id,
                        token_start_index: span.start,
                        token_end_index: span.end,
                        ordinal: tables.next_ordinal(),
                        created_at: Utc::now(),
                    };
                    txn.apply(Mutation::InsertMention {
                        mention: mention.clone(),
                    })?;
                    Ok((workspace_id, mention))
                },
                |(workspace_id, mention): &(WorkspaceId, Mention)| {
                    self.events.publish(AnnotationEvent::mention_added(
                        *workspace_id,
                        cluster_id,
                        document_id,
                        mention.id,
                    ))
                },
            )
        });

        let (_, mention) = match result {
            Ok(added) => added,
            Err(e) => {
                if !e.is_consistency() {
                    self.db.metrics().increment_mentions_rejected();
                    log_event_with_fields(
                        Event::MentionRejected,
                        &[
                            ("cluster_id", &cluster_id.to_string()),
                            ("document_id", &document_id.to_string()),
                            ("reason", &e.to_string()),
                        ],
                    );
                }
                return Err(e);
            }
        };

        log_event_with_fields(
            Event::MentionAdded,
            &[
                ("cluster_id", &cluster_id.to_string()),
                ("mention_id", &mention.id.to_string()),
                ("start", &mention.token_start_index.to_string()),
                ("end", &mention.token_end_index.to_string()),
            ],
        );
        self.db.metrics().increment_mentions_added();

        Ok(mention)
    }

    /// Mentions of the cluster in creation order.
    pub fn get_mentions_for_cluster(&self, cluster_id: ClusterId) -> CoreResult<Vec<Mention>> {
        self.db
            .read(|tables| {
                tables
                    .cluster(cluster_id)
                    .map(|_| tables.mentions_in_cluster(cluster_id).cloned().collect::<Vec<_>>())
            })?
            .ok_or_else(|| cluster_not_found(cluster_id))
    }

    /// Clusters of the workspace in creation order. Empty for an unknown workspace.
    pub fn get_clusters_for_workspace(&self, workspace_id: WorkspaceId) -> CoreResult<Vec<Cluster>> {
        Ok(self.db.read(|tables| {
            tables
                .clusters_in_workspace(workspace_id)
                .cloned()
                .collect::<Vec<_>>()
        })?)
    }

    pub fn mention_count(&self, cluster_id: ClusterId) -> CoreResult<usize> {
        self.db
            .read(|tables| {
                tables
                    .cluster(cluster_id)
                    .map(|_| tables.mention_count(cluster_id))
            })?
            .ok_or_else(|| cluster_not_found(cluster_id))
    }

    pub fn get_cluster(&self, cluster_id: ClusterId) -> CoreResult<Cluster> {
        self.db
            .read(|tables| tables.cluster(cluster_id).cloned())?
            .ok_or_else(|| cluster_not_found(cluster_id))
    }

    pub fn get_mention(&self, mention_id: MentionId) -> CoreResult<Mention> {
        self.db
            .read(|tables| tables.mention(mention_id).cloned())?
            .ok_or_else(|| mention_not_found(mention_id))
    }

    /// The document the cluster's mentions live in, `None` while it is empty.
    pub fn cluster_document(&self, cluster_id: ClusterId) -> CoreResult<Option<DocumentId>> {
        self.db
            .read(|tables| {
                tables
                    .cluster(cluster_id)
                    .map(|_| bound_document(tables, cluster_id))
            })?
            .ok_or_else(|| cluster_not_found(cluster_id))
    }

    /// Look up the tokens a mention covers.
    ///
    /// Returns `Dangling` when any of them has been removed by a document
    /// delete. A dangling span is logged, not an error.
    pub fn resolve_mention(&self, mention_id: MentionId) -> CoreResult<SpanResolution> {
        let (mention, tokens) = self
            .db
            .read(|tables| {
                tables.mention(mention_id).cloned().map(|m| {
                    let tokens: Vec<_> = tables
                        .tokens_in_range(m.document_id, m.token_start_index, m.token_end_index)
                        .cloned()
                        .collect();
                    (m, tokens)
                })
            })?
            .ok_or_else(|| mention_not_found(mention_id))?;

        if tokens.len() != mention.token_len() as usize {
            log_event_with_fields(
                Event::MentionSpanDangling,
                &[
                    ("mention_id", &mention_id.to_string()),
                    ("document_id", &mention.document_id.to_string()),
                    ("expected", &mention.token_len().to_string()),
                    ("found", &tokens.len().to_string()),
                ],
            );
            return Ok(SpanResolution::Dangling);
        }

        let text = join_tokens(&tokens);
        Ok(SpanResolution::Resolved { tokens, text })
    }

    /// Remove one mention. The cluster stays, even if now empty.
    pub fn delete_mention(&self, mention_id: MentionId) -> CoreResult<Mention> {
        let (_, mention) = self.db.transaction_then(
            |txn| {
                let mention = txn
                    .tables()
                    .mention(mention_id)
                    .cloned()
                    .ok_or_else(|| mention_not_found(mention_id))?;
                let workspace_id = txn
                    .tables()
                    .cluster(mention.cluster_id)
                    .map(|c| c.workspace_id)
                    .ok_or_else(|| cluster_not_found(mention.cluster_id))?;
                txn.apply(Mutation::DeleteMention { mention_id })?;
                Ok::<_, CoreError>((workspace_id, mention))
            },
            |(workspace_id, mention): &(WorkspaceId, Mention)| {
                self.events.publish(AnnotationEvent::mention_removed(
                    *workspace_id,
                    mention.cluster_id,
                    mention.document_id,
                    mention_id,
                ))
            },
        )?;

        log_event_with_fields(
            Event::MentionRemoved,
            &[
                ("cluster_id", &mention.cluster_id.to_string()),
                ("mention_id", &mention_id.to_string()),
            ],
        );
        self.db.metrics().increment_mentions_removed();

        Ok(mention)
    }

    /// Remove a cluster and every mention it owns, atomically. Returns the
    /// removed mention ids.
    pub fn delete_cluster(&self, cluster_id: ClusterId) -> CoreResult<Vec<MentionId>> {
        let (_, mention_ids) = self.db.transaction_then(
            |txn| {
                let workspace_id = txn
                    .tables()
                    .cluster(cluster_id)
                    .map(|c| c.workspace_id)
                    .ok_or_else(|| cluster_not_found(cluster_id))?;
                let mention_ids: Vec<MentionId> = txn
                    .tables()
                    .mentions_in_cluster(cluster_id)
                    .map(|m| m.id)
                    .collect();

                for &mention_id in &mention_ids {
                    txn.apply(Mutation::DeleteMention { mention_id })?;
                }
                txn.apply(Mutation::DeleteCluster { cluster_id })?;
                Ok::<_, CoreError>((workspace_id, mention_ids))
            },
            |(workspace_id, mention_ids): &(WorkspaceId, Vec<MentionId>)| {
                self.events.publish(AnnotationEvent::cluster_deleted(
                    *workspace_id,
                    cluster_id,
                    mention_ids.clone(),
                ))
            },
        )?;

        log_event_with_fields(
            Event::ClusterDeleted,
            &[
                ("cluster_id", &cluster_id.to_string()),
                ("mentions", &mention_ids.len().to_string()),
            ],
        );
        self.db
            .metrics()
            .record_cluster_deleted(mention_ids.len() as u64);

        Ok(mention_ids)
    }

    /// Remove every cluster and mention of the workspace, atomically.
    /// Succeeds on an empty or unknown workspace.
    pub fn delete_all_annotations(&self, workspace_id: WorkspaceId) -> CoreResult<ClearedWorkspace> {
        let (cluster_ids, mention_ids) = self.db.transaction_then(
            |txn| {
                let tables = txn.tables();
                let cluster_ids: Vec<ClusterId> = tables
                    .clusters_in_workspace(workspace_id)
                    .map(|c| c.id)
                    .collect();
                let mention_ids: Vec<MentionId> = cluster_ids
                    .iter()
                    .flat_map(|&id| tables.mentions_in_cluster(id).map(|m| m.id))
                    .collect();

                for &mention_id in &mention_ids {
                    txn.apply(Mutation::DeleteMention { mention_id })?;
                }
                for &cluster_id in &cluster_ids {
                    txn.apply(Mutation::DeleteCluster { cluster_id })?;
                }
                Ok::<_, CoreError>((cluster_ids, mention_ids))
            },
            |(cluster_ids, mention_ids): &(Vec<ClusterId>, Vec<MentionId>)| {
                self.events.publish(AnnotationEvent::workspace_cleared(
                    workspace_id,
                    cluster_ids.clone(),
                    mention_ids.clone(),
                ))
            },
        )?;

        let cleared = ClearedWorkspace {
            clusters: cluster_ids.len(),
            mentions: mention_ids.len(),
        };

        log_event_with_fields(
            Event::WorkspaceCleared,
            &[
                ("workspace_id", &workspace_id.to_string()),
                ("clusters", &cleared.clusters.to_string()),
                ("mentions", &cleared.mentions.to_string()),
            ],
        );
        self.db
            .metrics()
            .record_workspace_cleared(cleared.clusters as u64, cleared.mentions as u64);

        Ok(cleared)
    }
}

impl HealthCheck for AnnotationStore {
    fn name(&self) -> &str {
        "annotation_store"
    }

    fn is_healthy(&self) -> bool {
        self.db.read(|_| ()).is_ok()
    }
}
