//! Annotation Store
//!
//! Coreference clusters scoped to a workspace, each owning mentions that
//! point at inclusive spans of global token indices in one document.

mod model;
mod span;
mod store;

pub use model::{Cluster, Mention};
pub use span::{Span, SpanResolution};
pub use store::{AnnotationStore, ClearedWorkspace};
