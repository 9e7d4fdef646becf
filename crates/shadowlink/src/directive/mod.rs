//! Voice platform directives.
//!
//! A control directive becomes exactly one desired-state write plus a
//! synchronous acknowledgment. The translator never touches reported state.

mod error;
mod handler;
pub mod message;
mod operation;
mod translator;

pub use error::DirectiveError;
pub use handler::DirectiveHandler;
pub use handler::DirectiveReply;
pub use message::Directive;
pub use message::DirectiveEnvelope;
pub use operation::Operation;
pub use operation::OperationKind;
pub use translator::DirectiveTranslator;
pub use translator::Translation;
