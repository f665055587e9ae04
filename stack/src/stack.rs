use crate::artifact::{Architecture, Artifact};
use crate::binding::ConfigBinding;
use crate::error::SynthError;
use crate::parameter::{CfnParameter, ParameterValues};
use crate::resources::{FunctionProps, Queue, QueueProps, RestApi, RustFunction, SqsEventSource};
use crate::template::{CfnOutput, Template};
use serde_json::json;
use std::time::Duration;

pub const WEBHOOK_BINARY: &str = "webhook";
pub const PROCESS_QUEUE_BINARY: &str = "process_queue";

/// The consumer must get this many full attempts within one visibility window
const VISIBILITY_FACTOR: u32 = 4;

/// Every output the stack publishes, downstream tooling relies on these names
pub const OUTPUT_NAMES: [&str; 13] = [
    "RestApiEndpoint",
    "RestApiName",
    "RestApiArn",
    "QueueName",
    "QueueArn",
    "WebhookFunctionName",
    "WebhookFunctionArn",
    "WebhookFunctionLogGroupName",
    "WebhookFunctionLogGroupArn",
    "ProcessQueueFunctionName",
    "ProcessQueueFunctionArn",
    "ProcessQueueFunctionLogGroupName",
    "ProcessQueueFunctionLogGroupArn",
];

#[derive(Clone, Debug)]
pub struct StackProps {
    /// Deployment identifier, also the display name of the API
    pub stack_name: String,

    pub webhook: Artifact,
    pub process_queue: Artifact,
    pub architecture: Architecture,
}

/// Webhook intake stack: API Gateway -> webhook function -> queue -> processor function
#[derive(Clone, Debug)]
pub struct LambdaStack {
    stack_name: String,
    binding: ConfigBinding,
    template: Template,
}

impl LambdaStack {
    pub fn new(props: StackProps) -> eyre::Result<Self> {
        let mut template = Template::new(&format!(
            "Webhook intake for {}: API Gateway, SQS queue and two Rust Lambda functions",
            props.stack_name
        ));

        let binding = ConfigBinding::default();

        for parameter in binding.parameters() {
            template.add_parameter(parameter)?;
        }

        let mut api = RestApi::new("RestApi", &props.stack_name);

        let queue = Queue::new(
            "Queue",
            QueueProps {
                visibility_timeout: Duration::from_secs(20 * 60),
                retention_period: Duration::from_secs(14 * 24 * 60 * 60),
            },
        );

        let mut webhook = RustFunction::new(
            "WebhookFunction",
            FunctionProps {
                artifact: props.webhook.clone(),
                architecture: props.architecture,
                memory_size: 256,
                timeout: Duration::from_secs(10),
                environment: binding.environment(&queue),
            },
        );

        webhook.add_to_role_policy(binding.read_statement());
        queue.grant_send_messages(&mut webhook);
        api.add_root_method("POST", &webhook)?;

        let mut process_queue = RustFunction::new(
            "ProcessQueueFunction",
            FunctionProps {
                artifact: props.process_queue.clone(),
                architecture: props.architecture,
                memory_size: 256,
                timeout: Duration::from_secs(5 * 60),
                environment: binding.environment(&queue),
            },
        );

        process_queue.add_to_role_policy(binding.read_statement());
        queue.grant_consume_messages(&mut process_queue);

        check_visibility(&queue, &process_queue)?;

        let event_source = SqsEventSource {
            batch_size: 1,
            max_batching_window: Duration::ZERO,
            report_batch_item_failures: true,
        };

        template.add_resources(api.resources()?)?;
        template.add_resource(queue.resource())?;
        template.add_resources(webhook.resources())?;
        template.add_resources(process_queue.resources())?;
        template.add_resource(event_source.resource(&queue, &process_queue)?)?;

        let outputs = [
            ("RestApiEndpoint", api.url(), "URL accepting webhook POST requests"),
            ("RestApiName", json!(api.name()), "Name of the REST API"),
            ("RestApiArn", api.arn(), "ARN of the REST API"),
            ("QueueName", queue.queue_name(), "Queue buffering accepted webhooks"),
            ("QueueArn", queue.queue_arn(), "ARN of the webhook queue"),
        ];

        for (name, value, description) in outputs {
            template.add_output(CfnOutput::new(name, value).with_description(description))?;
        }

        for function in [&webhook, &process_queue] {
            publish_function(&mut template, function)?;
        }

        template.validate()?;
        let order = template.dependency_order()?;
        log::debug!("Resources in creation order: {}", order.join(", "));

        Ok(LambdaStack {
            stack_name: props.stack_name,
            binding,
            template,
        })
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn parameters(&self) -> [&CfnParameter; 2] {
        self.binding.parameters()
    }

    /// Check supplied values against the declared parameters
    ///
    /// Values for parameters the template doesn't declare are dropped, CloudFormation rejects them.
    pub fn parameter_values(&self, values: &ParameterValues) -> eyre::Result<ParameterValues> {
        let mut checked = ParameterValues::new();

        for parameter in self.parameters() {
            checked.insert(&parameter.name, parameter.check(values)?);
        }

        for (name, _) in values.iter() {
            if checked.get(name).is_none() {
                log::warn!("Ignoring the unknown parameter {name}");
            }
        }

        Ok(checked)
    }
}

/// Name, ARN and log group of a function as stack outputs
fn publish_function(template: &mut Template, function: &RustFunction) -> eyre::Result<()> {
    let id = function.id();

    let outputs = [
        ("Name", function.function_name(), format!("Name of the {id}")),
        ("Arn", function.function_arn(), format!("ARN of the {id}")),
        ("LogGroupName", function.log_group_name(), format!("Log group of the {id}")),
        ("LogGroupArn", function.log_group_arn(), format!("ARN of the log group of the {id}")),
    ];

    for (suffix, value, description) in outputs {
        template.add_output(
            CfnOutput::new(&format!("{id}{suffix}"), value)
                .with_description(&description),
        )?;
    }

    Ok(())
}

/// A message must not become visible again while the consumer may still be working on it
fn check_visibility(queue: &Queue, consumer: &RustFunction) -> Result<(), SynthError> {
    if queue.visibility_timeout() < consumer.timeout() * VISIBILITY_FACTOR {
        return Err(SynthError::VisibilityTimeout {
            visibility: queue.visibility_timeout(),
            timeout: consumer.timeout(),
            factor: VISIBILITY_FACTOR,
        });
    }

    Ok(())
}

/// Deployable template together with the parameters to pass along with it
#[derive(Clone, Debug)]
pub struct Synthesized {
    pub stack_name: String,
    pub template: Template,
    pub parameters: ParameterValues,
}

impl Synthesized {
    /// The template with parameter values inlined, as the handlers will see them
    pub fn resolved(&self) -> eyre::Result<Template> {
        self.template.resolve(&self.parameters)
    }
}

/// Build the stack and check the parameter values it is going to be deployed with
pub fn synthesize(props: StackProps, values: &ParameterValues) -> eyre::Result<Synthesized> {
    let stack = LambdaStack::new(props)?;
    let parameters = stack.parameter_values(values)?;

    log::info!(
        "Synthesized {} with {} resources",
        stack.stack_name(),
        stack.template().resource_names().count()
    );

    Ok(Synthesized {
        stack_name: stack.stack_name,
        template: stack.template,
        parameters,
    })
}
