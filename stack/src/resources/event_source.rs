use super::function::RustFunction;
use super::queue::Queue;
use crate::template::CfnResource;
use eyre::eyre;
use serde_json::json;
use std::time::Duration;

/// Longest batching window Lambda accepts for SQS
const MAX_BATCHING_WINDOW: Duration = Duration::from_secs(300);

/// Poll-and-invoke mapping from an SQS queue to a function
#[derive(Clone, Debug)]
pub struct SqsEventSource {
    pub batch_size: u32,
    pub max_batching_window: Duration,

    /// The handler returns failed message ids instead of failing the whole batch
    pub report_batch_item_failures: bool,
}

impl SqsEventSource {
    pub fn resource(&self, queue: &Queue, function: &RustFunction) -> eyre::Result<CfnResource> {
        // Without a batching window a standard queue allows at most 10 messages per batch
        let max_batch_size = if self.max_batching_window.is_zero() { 10 } else { 10_000 };

        if self.batch_size == 0 || self.batch_size > max_batch_size {
            return Err(eyre!(
                "Batch size must be between 1 and {max_batch_size}, got {}",
                self.batch_size
            ));
        }

        if self.max_batching_window > MAX_BATCHING_WINDOW {
            return Err(eyre!(
                "Maximum batching window is {MAX_BATCHING_WINDOW:?}, got {:?}",
                self.max_batching_window
            ));
        }

        let response_types: Vec<&str> = if self.report_batch_item_failures {
            vec!["ReportBatchItemFailures"]
        } else {
            vec![]
        };

        Ok(CfnResource {
            name: format!("{}SqsEventSource{}", function.id(), queue.id()),
            resource: json!({
                "Type": "AWS::Lambda::EventSourceMapping",
                "Properties": {
                    "FunctionName": function.function_name(),
                    "EventSourceArn": queue.queue_arn(),
                    "BatchSize": self.batch_size,
                    "MaximumBatchingWindowInSeconds": self.max_batching_window.as_secs(),
                    "FunctionResponseTypes": response_types
                }
            }),
        })
    }
}
