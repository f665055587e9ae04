use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use webhook_stack::stack::{OUTPUT_NAMES, PROCESS_QUEUE_BINARY, WEBHOOK_BINARY};
use webhook_stack::{
    synthesize, Architecture, Artifact, LambdaStack, ParameterValues, StackProps, SynthError,
    Template,
};

const PARAMETER_ARN: &str =
    "arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter${ConfigParameterName}";

fn props() -> StackProps {
    StackProps {
        stack_name: "webhooks-staging".into(),
        webhook: Artifact::new(WEBHOOK_BINARY, "artifacts", "webhook/aaa.zip"),
        process_queue: Artifact::new(PROCESS_QUEUE_BINARY, "artifacts", "process_queue/bbb.zip"),
        architecture: Architecture::X86_64,
    }
}

fn template() -> Template {
    LambdaStack::new(props()).unwrap().template().clone()
}

fn values(name: &str, version: &str) -> ParameterValues {
    [("ConfigParameterName", name), ("ConfigParameterVersion", version)]
        .into_iter()
        .collect()
}

fn properties<'a>(template: &'a Template, name: &str) -> &'a Value {
    &template.resource(name).unwrap()["Properties"]
}

fn statements(template: &Template, function: &str) -> Vec<Value> {
    properties(template, &format!("{function}ServiceRoleDefaultPolicy"))["PolicyDocument"]["Statement"]
        .as_array()
        .unwrap()
        .clone()
}

fn actions(statement: &Value) -> Vec<&str> {
    statement["Action"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a.as_str().unwrap())
        .collect()
}

fn single<'a>(template: &'a Template, resource_type: &str) -> (&'a str, &'a Value) {
    let found = template.resources_of_type(resource_type);
    assert_eq!(found.len(), 1, "expected exactly one {resource_type}");
    found[0]
}

#[test]
fn template_is_complete() {
    let template = template();

    assert_eq!(template.resources_of_type("AWS::ApiGateway::RestApi").len(), 1);
    assert_eq!(template.resources_of_type("AWS::SQS::Queue").len(), 1);
    assert_eq!(template.resources_of_type("AWS::Lambda::Function").len(), 2);

    let mut outputs: Vec<&str> = template.output_names().collect();
    let mut expected = OUTPUT_NAMES.to_vec();
    outputs.sort();
    expected.sort();

    assert_eq!(outputs, expected);

    let mut parameters: Vec<&str> = template.parameter_names().collect();
    parameters.sort();
    assert_eq!(parameters, vec!["ConfigParameterName", "ConfigParameterVersion"]);
}

#[test]
fn api_and_queue_are_wired_to_the_functions() {
    let template = template();
    let (_, method) = single(&template, "AWS::ApiGateway::Method");

    assert_eq!(
        method["Properties"]["Integration"]["Uri"],
        json!({"Fn::Sub": "arn:${AWS::Partition}:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${WebhookFunction.Arn}/invocations"})
    );

    assert_eq!(method["Properties"]["Integration"]["Type"], "AWS_PROXY");

    let (_, mapping) = single(&template, "AWS::Lambda::EventSourceMapping");

    assert_eq!(
        mapping["Properties"]["EventSourceArn"],
        json!({"Fn::GetAtt": ["Queue", "Arn"]})
    );

    assert_eq!(
        mapping["Properties"]["FunctionName"],
        json!({"Ref": "ProcessQueueFunction"})
    );
}

#[test]
fn webhook_permissions_are_minimal() {
    let template = template();
    let statements = statements(&template, "WebhookFunction");

    let ssm: Vec<&Value> = statements
        .iter()
        .filter(|s| actions(s).contains(&"ssm:GetParameter"))
        .collect();

    assert_eq!(ssm.len(), 1);
    assert_eq!(actions(ssm[0]), vec!["ssm:GetParameter"]);
    assert_eq!(ssm[0]["Resource"], json!([{"Fn::Sub": PARAMETER_ARN}]));

    let sqs = statements
        .iter()
        .find(|s| actions(s).contains(&"sqs:SendMessage"))
        .unwrap();

    assert_eq!(sqs["Resource"], json!([{"Fn::GetAtt": ["Queue", "Arn"]}]));
    assert!(!actions(sqs).contains(&"sqs:ReceiveMessage"));

    // Wildcards may only come from pseudo parameters, never from a literal "*"
    let document = serde_json::to_string(&statements).unwrap();
    assert!(!document.contains('*'));
}

#[test]
fn processor_consumes_but_does_not_send() {
    let template = template();
    let statements = statements(&template, "ProcessQueueFunction");

    let ssm: Vec<&Value> = statements
        .iter()
        .filter(|s| actions(s).contains(&"ssm:GetParameter"))
        .collect();

    assert_eq!(ssm.len(), 1);
    assert_eq!(ssm[0]["Resource"], json!([{"Fn::Sub": PARAMETER_ARN}]));

    let queue_actions: Vec<&str> = statements
        .iter()
        .filter(|s| s["Resource"] == json!([{"Fn::GetAtt": ["Queue", "Arn"]}]))
        .flat_map(actions)
        .collect();

    for action in ["sqs:ReceiveMessage", "sqs:DeleteMessage", "sqs:GetQueueAttributes"] {
        assert!(queue_actions.contains(&action), "missing {action}");
    }

    assert!(!queue_actions.contains(&"sqs:SendMessage"));
}

#[test]
fn visibility_timeout_covers_four_processor_timeouts() {
    let template = template();
    let visibility = properties(&template, "Queue")["VisibilityTimeout"].as_u64().unwrap();
    let timeout = properties(&template, "ProcessQueueFunction")["Timeout"].as_u64().unwrap();

    assert!(visibility >= 4 * timeout);
}

#[test]
fn processor_handles_one_message_at_a_time() {
    let template = template();
    let (_, mapping) = single(&template, "AWS::Lambda::EventSourceMapping");

    assert_eq!(mapping["Properties"]["BatchSize"], 1);
    assert_eq!(mapping["Properties"]["MaximumBatchingWindowInSeconds"], 0);
    assert_eq!(
        mapping["Properties"]["FunctionResponseTypes"],
        json!(["ReportBatchItemFailures"])
    );
}

#[test]
fn environment_is_passed_through_to_both_functions() {
    let template = template();

    for function in ["WebhookFunction", "ProcessQueueFunction"] {
        assert_eq!(
            properties(&template, function)["Environment"]["Variables"],
            json!({
                "QUEUE_URL": {"Ref": "Queue"},
                "CONFIG_PARAMETER_NAME": {"Ref": "ConfigParameterName"},
                "CONFIG_PARAMETER_VERSION": {"Ref": "ConfigParameterVersion"}
            })
        );
    }
}

#[test]
fn functions_run_the_named_binaries_with_json_logs() {
    let template = template();
    let webhook = properties(&template, "WebhookFunction");
    let processor = properties(&template, "ProcessQueueFunction");

    assert_eq!(webhook["Code"]["S3Key"], "webhook/aaa.zip");
    assert_eq!(webhook["MemorySize"], 256);
    assert_eq!(webhook["Timeout"], 10);
    assert_eq!(processor["MemorySize"], 256);
    assert_eq!(processor["Timeout"], 300);

    for function in [webhook, processor] {
        assert_eq!(function["Runtime"], "provided.al2023");
        assert_eq!(function["LoggingConfig"]["LogFormat"], "JSON");
        assert_eq!(function["LoggingConfig"]["ApplicationLogLevel"], "INFO");
    }
}

#[test]
fn resources_form_a_dag() {
    let template = template();
    let order = template.dependency_order().unwrap();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();

    assert!(position("Queue") < position("WebhookFunctionServiceRoleDefaultPolicy"));
    assert!(position("WebhookFunctionServiceRoleDefaultPolicy") < position("WebhookFunction"));
    assert!(position("WebhookFunction") < position("RestApiPOST"));
    assert!(position("RestApi") < position("RestApiPOST"));
    assert!(position("ProcessQueueFunction") < position("ProcessQueueFunctionSqsEventSourceQueue"));
}

#[test]
fn outputs_point_at_the_right_attributes() {
    let template = template();

    assert_eq!(template.output("RestApiName"), Some(&json!("webhooks-staging")));
    assert_eq!(
        template.output("RestApiArn"),
        Some(&json!({"Fn::Sub": "arn:aws:apigateway:${AWS::Region}::/restapis/${RestApi}"}))
    );
    assert_eq!(
        template.output("QueueName"),
        Some(&json!({"Fn::GetAtt": ["Queue", "QueueName"]}))
    );
    assert_eq!(
        template.output("WebhookFunctionLogGroupArn"),
        Some(&json!({"Fn::GetAtt": ["WebhookFunctionLogGroup", "Arn"]}))
    );
    assert_eq!(
        template.output("ProcessQueueFunctionName"),
        Some(&json!({"Ref": "ProcessQueueFunction"}))
    );
}

#[test]
fn resolved_parameters_reach_processor_and_policy() {
    let synthesized = synthesize(props(), &values("/app/config", "7")).unwrap();
    let resolved = synthesized.resolved().unwrap();

    let variables = &properties(&resolved, "ProcessQueueFunction")["Environment"]["Variables"];
    assert_eq!(variables["CONFIG_PARAMETER_NAME"], "/app/config");
    assert_eq!(variables["CONFIG_PARAMETER_VERSION"], "7");

    let ssm = statements(&resolved, "ProcessQueueFunction")
        .into_iter()
        .find(|s| actions(s).contains(&"ssm:GetParameter"))
        .unwrap();

    assert_eq!(
        ssm["Resource"],
        json!([{"Fn::Sub": "arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter/app/config"}])
    );

    // The deployable template keeps the references, values travel as stack parameters
    assert_eq!(synthesized.template.parameter_names().count(), 2);
    assert_eq!(synthesized.parameters.get("ConfigParameterVersion"), Some("7"));
}

#[test]
fn missing_parameter_halts_synthesis() {
    let values: ParameterValues = [("ConfigParameterVersion", "7")].into_iter().collect();
    let error = synthesize(props(), &values).unwrap_err();

    assert_eq!(
        error.downcast_ref::<SynthError>(),
        Some(&SynthError::UnresolvedParameter("ConfigParameterName".into()))
    );
}

#[test]
fn non_numeric_version_is_rejected() {
    let error = synthesize(props(), &values("/app/config", "latest")).unwrap_err();

    assert!(matches!(
        error.downcast_ref::<SynthError>(),
        Some(SynthError::InvalidParameter { name, .. }) if name == "ConfigParameterVersion"
    ));
}

#[test]
fn event_source_literals() {
    let template = template();
    let (_, mapping) = single(&template, "AWS::Lambda::EventSourceMapping");

    assert_eq!(mapping["Properties"]["BatchSize"].as_u64(), Some(1));
    assert_eq!(
        mapping["Properties"]["MaximumBatchingWindowInSeconds"].as_u64(),
        Some(0)
    );
}

#[test]
fn queue_literals() {
    let template = template();
    let (_, queue) = single(&template, "AWS::SQS::Queue");

    assert_eq!(queue["Properties"]["VisibilityTimeout"].as_u64(), Some(1200));
    assert_eq!(queue["Properties"]["MessageRetentionPeriod"].as_u64(), Some(1_209_600));
}

#[test]
fn api_is_regional_with_a_single_root_post() {
    let template = template();
    let (api_id, api) = single(&template, "AWS::ApiGateway::RestApi");

    assert_eq!(
        api["Properties"]["EndpointConfiguration"]["Types"],
        json!(["REGIONAL"])
    );

    assert_eq!(api["Properties"]["Name"], "webhooks-staging");

    let (_, method) = single(&template, "AWS::ApiGateway::Method");

    assert_eq!(method["Properties"]["HttpMethod"], "POST");
    assert_eq!(
        method["Properties"]["ResourceId"],
        json!({"Fn::GetAtt": [api_id, "RootResourceId"]})
    );
    assert_eq!(method["Properties"]["AuthorizationType"], "NONE");
    assert_eq!(template.resources_of_type("AWS::ApiGateway::Resource").len(), 0);
}

#[test]
fn synthesis_is_deterministic() {
    assert_eq!(
        template().to_json_string().unwrap(),
        template().to_json_string().unwrap()
    );
}
