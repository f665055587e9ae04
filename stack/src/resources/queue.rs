use super::function::RustFunction;
use super::policy::PolicyStatement;
use crate::intrinsic::{get_att, reference};
use crate::template::CfnResource;
use serde_json::{json, Value};
use std::time::Duration;

const SEND_ACTIONS: [&str; 3] = ["sqs:SendMessage", "sqs:GetQueueAttributes", "sqs:GetQueueUrl"];

const CONSUME_ACTIONS: [&str; 5] = [
    "sqs:ReceiveMessage",
    "sqs:ChangeMessageVisibility",
    "sqs:GetQueueUrl",
    "sqs:DeleteMessage",
    "sqs:GetQueueAttributes",
];

#[derive(Clone, Debug)]
pub struct QueueProps {
    pub visibility_timeout: Duration,
    pub retention_period: Duration,
}

/// Standard (non FIFO) SQS queue with at-least-once delivery
#[derive(Clone, Debug)]
pub struct Queue {
    id: String,
    props: QueueProps,
}

impl Queue {
    pub fn new(id: &str, props: QueueProps) -> Self {
        Queue {
            id: id.to_string(),
            props,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.props.visibility_timeout
    }

    /// "Ref" of a queue resolves to its URL
    pub fn queue_url(&self) -> Value {
        reference(&self.id)
    }

    pub fn queue_arn(&self) -> Value {
        get_att(&self.id, "Arn")
    }

    pub fn queue_name(&self) -> Value {
        get_att(&self.id, "QueueName")
    }

    pub fn grant_send_messages(&self, function: &mut RustFunction) {
        function.add_to_role_policy(PolicyStatement::allow(&SEND_ACTIONS, vec![self.queue_arn()]));
    }

    /// Receive, delete and extend visibility, everything a consumer needs except sending
    pub fn grant_consume_messages(&self, function: &mut RustFunction) {
        function.add_to_role_policy(PolicyStatement::allow(
            &CONSUME_ACTIONS,
            vec![self.queue_arn()],
        ));
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource {
            name: self.id.clone(),
            resource: json!({
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "VisibilityTimeout": self.props.visibility_timeout.as_secs(),
                    "MessageRetentionPeriod": self.props.retention_period.as_secs()
                },
                "UpdateReplacePolicy": "Delete",
                "DeletionPolicy": "Delete"
            }),
        }
    }
}
