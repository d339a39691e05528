//! In-memory tables
//!
//! Layout mirrors the persisted model:
//!
//! - `tokens`: keyed by `(document, global_index)`, with a unique secondary
//!   key `(document, sentence_index, token_index)`
//! - `clusters`: keyed by id, with a `(workspace, ordinal)` listing index
//! - `mentions`: keyed by id, with a `(cluster, ordinal)` listing index and a
//!   foreign key to `clusters`
//!
//! All maps are BTreeMaps so every enumeration is deterministic and range
//! scans over a document or a cluster are a single `range` call.
//!
//! Constraint checks run before any map is touched, so a rejected mutation
//! leaves the tables unchanged.

use std::collections::{BTreeMap, BTreeSet};

use crate::annotation::{Cluster, Mention};
use crate::ids::{ClusterId, DocumentId, MentionId, WorkspaceId};
use crate::text_index::Token;

use super::errors::{StorageError, StorageResult};
use super::mutation::Mutation;

/// Row counts across all tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    pub documents: usize,
    pub tokens: usize,
    pub clusters: usize,
    pub mentions: usize,
}

#[derive(Debug, Default)]
pub struct Tables {
    tokens: BTreeMap<(DocumentId, u32), Token>,
    token_positions: BTreeMap<(DocumentId, u32, u32), u32>,
    clusters: BTreeMap<ClusterId, Cluster>,
    clusters_by_workspace: BTreeMap<(WorkspaceId, u64), ClusterId>,
    mentions: BTreeMap<MentionId, Mention>,
    mentions_by_cluster: BTreeMap<(ClusterId, u64), MentionId>,
    /// Highest cluster or mention ordinal ever inserted
    last_ordinal: u64,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Apply a mutation, returning its exact inverse.
    pub fn apply(&mut self, mutation: &Mutation) -> StorageResult<Mutation> {
        match mutation {
            Mutation::InsertTokens {
                document_id,
                tokens,
            } => self.insert_tokens(*document_id, tokens),
            Mutation::DeleteDocument { document_id } => Ok(self.delete_document(*document_id)),
            Mutation::InsertCluster { cluster } => self.insert_cluster(cluster),
            Mutation::DeleteCluster { cluster_id } => self.delete_cluster(*cluster_id),
            Mutation::InsertMention { mention } => self.insert_mention(mention),
            Mutation::DeleteMention { mention_id } => self.delete_mention(*mention_id),
        }
    }

    fn insert_tokens(&mut self, document_id: DocumentId, tokens: &[Token]) -> StorageResult<Mutation> {
        if self.has_document(document_id) {
            return Err(StorageError::constraint_violation(format!(
                "document {} already has tokens",
                document_id
            )));
        }

        let mut globals = BTreeSet::new();
        let mut positions = BTreeSet::new();
        for token in tokens {
            if token.document_id != document_id {
                return Err(StorageError::constraint_violation(format!(
                    "token {} belongs to document {}, not {}",
                    token.global_index, token.document_id, document_id
                )));
            }
            if !globals.insert(token.global_index) {
                return Err(StorageError::constraint_violation(format!(
                    "duplicate global index {} in document {}",
                    token.global_index, document_id
                )));
            }
            if !positions.insert((token.sentence_index, token.token_index)) {
                return Err(StorageError::constraint_violation(format!(
                    "duplicate position ({}, {}) in document {}",
                    token.sentence_index, token.token_index, document_id
                )));
            }
        }

        for token in tokens {
            self.token_positions.insert(
                (document_id, token.sentence_index, token.token_index),
                token.global_index,
            );
            self.tokens
                .insert((document_id, token.global_index), token.clone());
        }

        Ok(Mutation::DeleteDocument { document_id })
    }

    fn delete_document(&mut self, document_id: DocumentId) -> Mutation {
        let keys: Vec<(DocumentId, u32)> = self
            .tokens
            .range((document_id, 0)..=(document_id, u32::MAX))
            .map(|(k, _)| *k)
            .collect();

        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(token) = self.tokens.remove(&key) {
                self.token_positions.remove(&(
                    document_id,
                    token.sentence_index,
                    token.token_index,
                ));
                removed.push(token);
            }
        }

        Mutation::InsertTokens {
            document_id,
            tokens: removed,
        }
    }

    fn insert_cluster(&mut self, cluster: &Cluster) -> StorageResult<Mutation> {
        if self.clusters.contains_key(&cluster.id) {
            return Err(StorageError::constraint_violation(format!(
                "cluster {} already exists",
                cluster.id
            )));
        }
        let listing_key = (cluster.workspace_id, cluster.ordinal);
        if self.clusters_by_workspace.contains_key(&listing_key) {
            return Err(StorageError::constraint_violation(format!(
                "cluster ordinal {} already used in workspace {}",
                cluster.ordinal, cluster.workspace_id
            )));
        }

        self.clusters_by_workspace.insert(listing_key, cluster.id);
        self.clusters.insert(cluster.id, cluster.clone());
        self.last_ordinal = self.last_ordinal.max(cluster.ordinal);

        Ok(Mutation::DeleteCluster {
            cluster_id: cluster.id,
        })
    }

    fn delete_cluster(&mut self, cluster_id: ClusterId) -> StorageResult<Mutation> {
        if self.mention_count(cluster_id) > 0 {
            return Err(StorageError::constraint_violation(format!(
                "cluster {} still owns mentions",
                cluster_id
            )));
        }
        let cluster = self.clusters.remove(&cluster_id).ok_or_else(|| {
            StorageError::constraint_violation(format!("cluster {} does not exist", cluster_id))
        })?;
        self.clusters_by_workspace
            .remove(&(cluster.workspace_id, cluster.ordinal));

        Ok(Mutation::InsertCluster { cluster })
    }

    fn insert_mention(&mut self, mention: &Mention) -> StorageResult<Mutation> {
        if self.mentions.contains_key(&mention.id) {
            return Err(StorageError::constraint_violation(format!(
                "mention {} already exists",
                mention.id
            )));
        }
        if !self.clusters.contains_key(&mention.cluster_id) {
            return Err(StorageError::constraint_violation(format!(
                "mention {} references missing cluster {}",
                mention.id, mention.cluster_id
            )));
        }
        if mention.token_start_index > mention.token_end_index {
            return Err(StorageError::constraint_violation(format!(
                "mention {} has inverted span [{}, {}]",
                mention.id, mention.token_start_index, mention.token_end_index
            )));
        }
        let listing_key = (mention.cluster_id, mention.ordinal);
        if self.mentions_by_cluster.contains_key(&listing_key) {
            return Err(StorageError::constraint_violation(format!(
                "mention ordinal {} already used in cluster {}",
                mention.ordinal, mention.cluster_id
            )));
        }

        self.mentions_by_cluster.insert(listing_key, mention.id);
        self.mentions.insert(mention.id, mention.clone());
        self.last_ordinal = self.last_ordinal.max(mention.ordinal);

        Ok(Mutation::DeleteMention {
            mention_id: mention.id,
        })
    }

    fn delete_mention(&mut self, mention_id: MentionId) -> StorageResult<Mutation> {
        let mention = self.mentions.remove(&mention_id).ok_or_else(|| {
            StorageError::constraint_violation(format!("mention {} does not exist", mention_id))
        })?;
        self.mentions_by_cluster
            .remove(&(mention.cluster_id, mention.ordinal));

        Ok(Mutation::InsertMention { mention })
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Tokens with global index in `[start, end]`, ascending. Empty when
    /// `start > end`.
    pub fn tokens_in_range(
        &self,
        document_id: DocumentId,
        start: u32,
        end: u32,
    ) -> impl Iterator<Item = &Token> + '_ {
        // BTreeMap::range panics on an inverted range
        let range = (start <= end)
            .then(|| self.tokens.range((document_id, start)..=(document_id, end)));
        range.into_iter().flatten().map(|(_, t)| t)
    }

    /// All tokens of a document in global order.
    pub fn document_tokens(&self, document_id: DocumentId) -> impl Iterator<Item = &Token> + '_ {
        self.tokens
            .range((document_id, 0)..=(document_id, u32::MAX))
            .map(|(_, t)| t)
    }

    pub fn max_global_index(&self, document_id: DocumentId) -> Option<u32> {
        self.tokens
            .range((document_id, 0)..=(document_id, u32::MAX))
            .next_back()
            .map(|((_, global), _)| *global)
    }

    /// Look a token up by its sentence-local position.
    pub fn token_at(
        &self,
        document_id: DocumentId,
        sentence_index: u32,
        token_index: u32,
    ) -> Option<&Token> {
        let global = self
            .token_positions
            .get(&(document_id, sentence_index, token_index))?;
        self.tokens.get(&(document_id, *global))
    }

    pub fn token_count(&self, document_id: DocumentId) -> usize {
        self.document_tokens(document_id).count()
    }

    pub fn has_document(&self, document_id: DocumentId) -> bool {
        self.document_tokens(document_id).next().is_some()
    }

    // ------------------------------------------------------------------
    // Clusters & mentions
    // ------------------------------------------------------------------

    pub fn cluster(&self, cluster_id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&cluster_id)
    }

    /// Clusters of a workspace in creation order.
    pub fn clusters_in_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> impl Iterator<Item = &Cluster> + '_ {
        self.clusters_by_workspace
            .range((workspace_id, 0)..=(workspace_id, u64::MAX))
            .filter_map(|(_, id)| self.clusters.get(id))
    }

    pub fn mention(&self, mention_id: MentionId) -> Option<&Mention> {
        self.mentions.get(&mention_id)
    }

    /// Mentions of a cluster in creation order.
    pub fn mentions_in_cluster(&self, cluster_id: ClusterId) -> impl Iterator<Item = &Mention> + '_ {
        self.mentions_by_cluster
            .range((cluster_id, 0)..=(cluster_id, u64::MAX))
            .filter_map(|(_, id)| self.mentions.get(id))
    }

    pub fn mention_count(&self, cluster_id: ClusterId) -> usize {
        self.mentions_by_cluster
            .range((cluster_id, 0)..=(cluster_id, u64::MAX))
            .count()
    }

    /// Next ordinal to hand out for a cluster or mention.
    pub fn next_ordinal(&self) -> u64 {
        self.last_ordinal + 1
    }

    pub fn stats(&self) -> TableStats {
        let documents = self
            .tokens
            .keys()
            .map(|(doc, _)| *doc)
            .collect::<BTreeSet<_>>()
            .len();
        TableStats {
            documents,
            tokens: self.tokens.len(),
            clusters: self.clusters.len(),
            mentions: self.mentions.len(),
        }
    }
}
