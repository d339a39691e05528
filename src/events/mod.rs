//! Outbound change notifications
//!
//! Services publish one `AnnotationEvent` per committed operation through an
//! `EventSink`, after the transaction commits and outside any lock.

mod dispatcher;
mod event;

pub use dispatcher::{DispatchResult, Dispatcher, EventReceiver, EventSender, EventSink, Subscription};
pub use event::{AnnotationEvent, EventKind};
