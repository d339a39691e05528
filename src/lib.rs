//! corefstore - indexed text with coreference annotations
//!
//! - `text_index`: documents as sentences of tokens, addressable by
//!   `(sentence, token)` and by a document-wide global index
//! - `annotation`: workspace-scoped clusters of mentions over global
//!   token spans
//! - `storage`: transactional tables with a checksummed journal
//! - `events`: change notifications published after commit
//!
//! ```ignore
//! use corefstore::{Engine, DocumentId, WorkspaceId, TokenInput};
//!
//! let engine = Engine::in_memory();
//! let doc = DocumentId::new();
//! engine.text_index().index_document(doc, &[vec![TokenInput::new("Hi", 0, 2)]])?;
//!
//! let cluster = engine.annotations().create_cluster(WorkspaceId::new())?;
//! engine.annotations().add_mention(cluster.id, doc, 0, 0)?;
//! ```

pub mod annotation;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ids;
pub mod observability;
pub mod storage;
pub mod text_index;

pub use annotation::{AnnotationStore, Cluster, Mention, SpanResolution};
pub use config::Config;
pub use engine::Engine;
pub use errors::{CoreError, CoreResult};
pub use ids::{ClusterId, DocumentId, MentionId, WorkspaceId};
pub use text_index::{Sentence, TextIndex, Token, TokenInput};
