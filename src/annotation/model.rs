//! Cluster and mention records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClusterId, DocumentId, MentionId, WorkspaceId};

/// A coreference chain within one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub workspace_id: WorkspaceId,
    /// Creation ordinal, strictly increasing across the database
    pub ordinal: u64,
    pub created_at: DateTime<Utc>,
}

/// An inclusive span of global token indices owned by a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: MentionId,
    pub cluster_id: ClusterId,
    pub document_id: DocumentId,
    pub token_start_index: u32,
    pub token_end_index: u32,
    /// Creation ordinal, strictly increasing across the database
    pub ordinal: u64,
    pub created_at: DateTime<Utc>,
}

impl Mention {
    /// Number of tokens covered by the span
    pub fn token_len(&self) -> u32 {
        self.token_end_index.saturating_sub(self.token_start_index) + 1
    }
}
