//! Table mutations
//!
//! Every change to the tables is expressed as a `Mutation`. A committed
//! transaction is journaled as the ordered list of mutations it applied, and
//! replay re-applies them in the same order. Each mutation has an exact
//! inverse, which is what rollback applies.

use serde::{Deserialize, Serialize};

use crate::annotation::{Cluster, Mention};
use crate::ids::{ClusterId, DocumentId, MentionId};
use crate::text_index::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert every token of a document that currently has none
    InsertTokens {
        document_id: DocumentId,
        tokens: Vec<Token>,
    },
    /// Remove every token of a document
    DeleteDocument { document_id: DocumentId },
    /// Insert a cluster
    InsertCluster { cluster: Cluster },
    /// Remove a cluster that owns no mentions
    DeleteCluster { cluster_id: ClusterId },
    /// Insert a mention under an existing cluster
    InsertMention { mention: Mention },
    /// Remove a mention
    DeleteMention { mention_id: MentionId },
}

impl Mutation {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::InsertTokens { .. } => "insert_tokens",
            Mutation::DeleteDocument { .. } => "delete_document",
            Mutation::InsertCluster { .. } => "insert_cluster",
            Mutation::DeleteCluster { .. } => "delete_cluster",
            Mutation::InsertMention { .. } => "insert_mention",
            Mutation::DeleteMention { .. } => "delete_mention",
        }
    }
}
