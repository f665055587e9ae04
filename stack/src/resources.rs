//! Builders for the individual pieces of the stack
//!
//! Each builder knows its own logical ids and hands out the intrinsic tokens
//! other resources use to reference it.
pub mod api;
pub mod event_source;
pub mod function;
pub mod policy;
pub mod queue;

pub use api::RestApi;
pub use event_source::SqsEventSource;
pub use function::{FunctionProps, RustFunction};
pub use policy::PolicyStatement;
pub use queue::{Queue, QueueProps};
