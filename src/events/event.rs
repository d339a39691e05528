//! Change notifications
//!
//! One event per committed operation. `sequence` is stamped by the sink at
//! publish time and is strictly increasing per sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClusterId, DocumentId, MentionId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    DocumentIndexed,
    DocumentDeleted,
    ClusterCreated,
    MentionAdded,
    MentionRemoved,
    ClusterDeleted,
    WorkspaceCleared,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DocumentIndexed => "DOCUMENT_INDEXED",
            EventKind::DocumentDeleted => "DOCUMENT_DELETED",
            EventKind::ClusterCreated => "CLUSTER_CREATED",
            EventKind::MentionAdded => "MENTION_ADDED",
            EventKind::MentionRemoved => "MENTION_REMOVED",
            EventKind::ClusterDeleted => "CLUSTER_DELETED",
            EventKind::WorkspaceCleared => "WORKSPACE_CLEARED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEvent {
    /// Stamped by the sink; 0 until published
    pub sequence: u64,

    pub kind: EventKind,

    /// Absent for document events, which are not scoped to a workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<WorkspaceId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<ClusterId>,

    /// Clusters removed by a workspace clear
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_ids: Vec<ClusterId>,

    /// Mentions created or removed by the operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mention_ids: Vec<MentionId>,

    pub timestamp: DateTime<Utc>,
}

impl AnnotationEvent {
    fn new(kind: EventKind) -> Self {
        Self {
            sequence: 0,
            kind,
            workspace_id: None,
            document_id: None,
            cluster_id: None,
            cluster_ids: Vec::new(),
            mention_ids: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn document_indexed(document_id: DocumentId) -> Self {
        Self {
            document_id: Some(document_id),
            ..Self::new(EventKind::DocumentIndexed)
        }
    }

    pub fn document_deleted(document_id: DocumentId) -> Self {
        Self {
            document_id: Some(document_id),
            ..Self::new(EventKind::DocumentDeleted)
        }
    }

    pub fn cluster_created(workspace_id: WorkspaceId, cluster_id: ClusterId) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            cluster_id: Some(cluster_id),
            ..Self::new(EventKind::ClusterCreated)
        }
    }

    pub fn mention_added(
        workspace_id: WorkspaceId,
        cluster_id: ClusterId,
        document_id: DocumentId,
        mention_id: MentionId,
    ) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            cluster_id: Some(cluster_id),
            document_id: Some(document_id),
            mention_ids: vec![mention_id],
            ..Self::new(EventKind::MentionAdded)
        }
    }

    pub fn mention_removed(
        workspace_id: WorkspaceId,
        cluster_id: ClusterId,
        document_id: DocumentId,
        mention_id: MentionId,
    ) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            cluster_id: Some(cluster_id),
            document_id: Some(document_id),
            mention_ids: vec![mention_id],
            ..Self::new(EventKind::MentionRemoved)
        }
    }

    pub fn cluster_deleted(
        workspace_id: WorkspaceId,
        cluster_id: ClusterId,
        mention_ids: Vec<MentionId>,
    ) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            cluster_id: Some(cluster_id),
            mention_ids,
            ..Self::new(EventKind::ClusterDeleted)
        }
    }

    pub fn workspace_cleared(
        workspace_id: WorkspaceId,
        cluster_ids: Vec<ClusterId>,
        mention_ids: Vec<MentionId>,
    ) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            cluster_ids,
            mention_ids,
            ..Self::new(EventKind::WorkspaceCleared)
        }
    }

    /// Topic string, `coref:<workspace>` or `coref:documents`
    pub fn topic(&self) -> String {
        match self.workspace_id {
            Some(workspace_id) => format!("coref:{}", workspace_id),
            None => "coref:documents".to_string(),
        }
    }

    /// Wire format for subscribers
    pub fn to_wire_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "annotation",
            "topic": self.topic(),
            "event": self.kind.as_str(),
            "payload": self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_upper_snake() {
        let json = serde_json::to_value(EventKind::WorkspaceCleared).unwrap();
        assert_eq!(json, "WORKSPACE_CLEARED");
        assert_eq!(EventKind::MentionAdded.to_string(), "MENTION_ADDED");
    }

    #[test]
    fn test_cluster_deleted_lists_mentions() {
        let ws = WorkspaceId::new();
        let cluster = ClusterId::new();
        let mentions = vec![MentionId::new(), MentionId::new()];
        let event = AnnotationEvent::cluster_deleted(ws, cluster, mentions.clone());

        assert_eq!(event.kind, EventKind::ClusterDeleted);
        assert_eq!(event.mention_ids, mentions);
        assert_eq!(event.topic(), format!("coref:{}", ws));
    }

    #[test]
    fn test_workspace_cleared_lists_clusters() {
        let ws = WorkspaceId::new();
        let clusters = vec![ClusterId::new(), ClusterId::new()];
        let event = AnnotationEvent::workspace_cleared(ws, clusters.clone(), Vec::new());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["cluster_ids"], serde_json::to_value(&clusters).unwrap());
        assert!(json.get("mention_ids").is_none());
    }

    #[test]
    fn test_document_event_has_no_workspace() {
        let event = AnnotationEvent::document_indexed(DocumentId::new());
        assert_eq!(event.topic(), "coref:documents");

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("workspace_id").is_none());
        assert!(json.get("mention_ids").is_none());
        assert!(json.get("cluster_ids").is_none());
    }

    #[test]
    fn test_wire_format() {
        let event = AnnotationEvent::cluster_created(WorkspaceId::new(), ClusterId::new());
        let wire = event.to_wire_format();
        assert_eq!(wire["type"], "annotation");
        assert_eq!(wire["event"], "CLUSTER_CREATED");
        assert_eq!(wire["payload"]["kind"], "CLUSTER_CREATED");
    }
}
