use super::policy::{lambda_assume_role, PolicyStatement};
use crate::artifact::{Architecture, Artifact};
use crate::intrinsic::{get_att, reference, sub};
use crate::template::CfnResource;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Runtime for natively compiled handlers, the binary is shipped as "bootstrap"
pub const RUNTIME: &str = "provided.al2023";

#[derive(Clone, Debug)]
pub struct FunctionProps {
    pub artifact: Artifact,
    pub architecture: Architecture,

    /// Megabytes
    pub memory_size: u32,
    pub timeout: Duration,

    /// Values are either plain strings or intrinsic functions
    pub environment: BTreeMap<String, Value>,
}

/// A Lambda function running a Rust binary, with its role, inline policy and log group
#[derive(Clone, Debug)]
pub struct RustFunction {
    id: String,
    props: FunctionProps,
    statements: Vec<PolicyStatement>,
}

impl RustFunction {
    pub fn new(id: &str, props: FunctionProps) -> Self {
        RustFunction {
            id: id.to_string(),
            props,
            statements: vec![],
        }
    }

    /// Add a statement to the function's default inline policy
    pub fn add_to_role_policy(&mut self, statement: PolicyStatement) {
        if !self.statements.contains(&statement) {
            self.statements.push(statement);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timeout(&self) -> Duration {
        self.props.timeout
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn role_id(&self) -> String {
        format!("{}ServiceRole", self.id)
    }

    pub fn policy_id(&self) -> String {
        format!("{}ServiceRoleDefaultPolicy", self.id)
    }

    pub fn log_group_id(&self) -> String {
        format!("{}LogGroup", self.id)
    }

    pub fn function_name(&self) -> Value {
        reference(&self.id)
    }

    pub fn function_arn(&self) -> Value {
        get_att(&self.id, "Arn")
    }

    /// URI API Gateway calls for a proxy integration
    pub fn invoke_arn(&self) -> Value {
        sub(&format!(
            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{}.Arn}}/invocations",
            self.id
        ))
    }

    pub fn log_group_name(&self) -> Value {
        reference(&self.log_group_id())
    }

    pub fn log_group_arn(&self) -> Value {
        get_att(&self.log_group_id(), "Arn")
    }

    fn environment(&self) -> Value {
        let variables: Map<String, Value> = self
            .props
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        json!({ "Variables": variables })
    }

    /// CFN resources for the function, its role and its log group
    pub fn resources(&self) -> Vec<CfnResource> {
        let role_id = self.role_id();
        let policy_id = self.policy_id();
        let log_group_id = self.log_group_id();

        let mut depends_on = vec![role_id.clone()];
        let mut resources = vec![];

        resources.push(CfnResource {
            name: role_id.clone(),
            resource: json!({
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": lambda_assume_role(),
                    "ManagedPolicyArns": [
                        sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole")
                    ]
                }
            }),
        });

        // No statements, no policy: IAM rejects empty policy documents
        if !self.statements.is_empty() {
            resources.push(CfnResource {
                name: policy_id.clone(),
                resource: json!({
                    "Type": "AWS::IAM::Policy",
                    "Properties": {
                        "PolicyName": policy_id,
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>()
                        },
                        "Roles": [reference(&role_id)]
                    }
                }),
            });

            depends_on.insert(0, policy_id);
        }

        // Logs go away with the stack
        resources.push(CfnResource {
            name: log_group_id.clone(),
            resource: json!({
                "Type": "AWS::Logs::LogGroup",
                "UpdateReplacePolicy": "Delete",
                "DeletionPolicy": "Delete"
            }),
        });

        resources.push(CfnResource {
            name: self.id.clone(),
            resource: json!({
                "Type": "AWS::Lambda::Function",
                "Properties": {
                    "Code": self.props.artifact.code(),
                    "Handler": "bootstrap",
                    "Runtime": RUNTIME,
                    "Architectures": [self.props.architecture.as_str()],
                    "MemorySize": self.props.memory_size,
                    "Timeout": self.props.timeout.as_secs(),
                    "Role": get_att(&role_id, "Arn"),
                    "Environment": self.environment(),
                    "LoggingConfig": {
                        "LogFormat": "JSON",
                        "ApplicationLogLevel": "INFO",
                        "SystemLogLevel": "INFO",
                        "LogGroup": reference(&log_group_id)
                    }
                },
                "DependsOn": depends_on
            }),
        });

        resources
    }
}
