//! CloudFormation template of a two-stage webhook pipeline
//!
//! An API Gateway `POST /` hands requests to the `webhook` function, which enqueues them
//! to SQS. The `process_queue` function consumes the queue one message at a time and
//! reports failed messages back for redelivery. Both handlers are separately compiled
//! Rust binaries referenced by [`Artifact`].
pub mod artifact;
pub mod binding;
pub mod error;
pub mod intrinsic;
pub mod parameter;
pub mod resources;
pub mod stack;
pub mod template;

pub use artifact::{Architecture, Artifact};
pub use error::SynthError;
pub use parameter::{CfnParameter, ParameterValues};
pub use stack::{synthesize, LambdaStack, StackProps, Synthesized};
pub use template::{CfnOutput, CfnResource, Template};
