use super::function::RustFunction;
use crate::intrinsic::{get_att, reference, sub};
use crate::template::CfnResource;
use eyre::eyre;
use serde_json::{json, Value};

/// Clients are co-located with the service, no edge distribution
const ENDPOINT_TYPE: &str = "REGIONAL";

/// Lambda proxy method bound to the root resource
#[derive(Clone, Debug)]
struct Method {
    http_method: String,
    function_id: String,
    function_arn: Value,
    invoke_arn: Value,
}

/// REST API Gateway with its deployment and a single stage
#[derive(Clone, Debug)]
pub struct RestApi {
    id: String,
    name: String,
    stage_name: String,
    methods: Vec<Method>,
}

impl RestApi {
    pub fn new(id: &str, name: &str) -> Self {
        RestApi {
            id: id.to_string(),
            name: name.to_string(),
            stage_name: "prod".to_string(),
            methods: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Proxy all requests of the method on "/" to the function, bodies pass through verbatim
    pub fn add_root_method(&mut self, http_method: &str, function: &RustFunction) -> eyre::Result<()> {
        let http_method = http_method.to_uppercase();

        if self.methods.iter().any(|m| m.http_method == http_method) {
            return Err(eyre!("Method {http_method} is already bound to \"/\""));
        }

        self.methods.push(Method {
            http_method,
            function_id: function.id().to_string(),
            function_arn: function.function_arn(),
            invoke_arn: function.invoke_arn(),
        });

        Ok(())
    }

    pub fn stage_id(&self) -> String {
        format!("{}DeploymentStage{}", self.id, self.stage_name)
    }

    fn method_id(&self, method: &Method) -> String {
        format!("{}{}", self.id, method.http_method)
    }

    /// Invoke URL of the stage, with a trailing slash
    pub fn url(&self) -> Value {
        sub(&format!(
            "https://${{{}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/${{{}}}/",
            self.id,
            self.stage_id()
        ))
    }

    pub fn arn(&self) -> Value {
        sub(&format!(
            "arn:aws:apigateway:${{AWS::Region}}::/restapis/${{{}}}",
            self.id
        ))
    }

    fn method_resource(&self, method: &Method) -> Value {
        json!({
            "Type": "AWS::ApiGateway::Method",
            "Properties": {
                "HttpMethod": method.http_method,
                "ResourceId": get_att(&self.id, "RootResourceId"),
                "RestApiId": reference(&self.id),
                "AuthorizationType": "NONE",
                "Integration": {
                    "Type": "AWS_PROXY",
                    "IntegrationHttpMethod": "POST",
                    "Uri": method.invoke_arn
                }
            }
        })
    }

    /// Allow API Gateway to invoke the function, from the stage and from console test calls
    fn permissions(&self, method: &Method) -> Vec<CfnResource> {
        let method_id = self.method_id(method);

        [
            (format!("{method_id}Permission"), format!("${{{}}}", self.stage_id())),
            (format!("{method_id}PermissionTest"), "test-invoke-stage".to_string()),
        ]
        .into_iter()
        .map(|(name, stage)| CfnResource {
            name,
            resource: json!({
                "Type": "AWS::Lambda::Permission",
                "Properties": {
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": method.function_arn,
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": sub(&format!(
                        "arn:aws:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/{stage}/{}/",
                        self.id, method.http_method
                    ))
                }
            }),
        })
        .collect()
    }

    /// CFN resources of the API
    ///
    /// The deployment id carries a digest of the methods, so any change to them
    /// creates a new deployment and the stage picks it up.
    pub fn resources(&self) -> eyre::Result<Vec<CfnResource>> {
        if self.methods.is_empty() {
            return Err(eyre!("The REST API \"{}\" doesn't contain any methods", self.id));
        }

        let mut resources = vec![CfnResource {
            name: self.id.clone(),
            resource: json!({
                "Type": "AWS::ApiGateway::RestApi",
                "Properties": {
                    "Name": self.name,
                    "EndpointConfiguration": {"Types": [ENDPOINT_TYPE]}
                }
            }),
        }];

        let mut method_ids = vec![];
        let mut fingerprint = String::new();

        for method in self.methods.iter() {
            let method_id = self.method_id(method);
            let resource = self.method_resource(method);

            log::debug!("Binding {} / to {}", method.http_method, method.function_id);
            fingerprint.push_str(&resource.to_string());
            resources.push(CfnResource {
                name: method_id.clone(),
                resource,
            });
            resources.extend(self.permissions(method));
            method_ids.push(method_id);
        }

        let digest = sha256::digest(fingerprint);
        let deployment_id = format!("{}Deployment{}", self.id, &digest[..8]);

        resources.push(CfnResource {
            name: deployment_id.clone(),
            resource: json!({
                "Type": "AWS::ApiGateway::Deployment",
                "Properties": {"RestApiId": reference(&self.id)},
                "DependsOn": method_ids
            }),
        });

        resources.push(CfnResource {
            name: self.stage_id(),
            resource: json!({
                "Type": "AWS::ApiGateway::Stage",
                "Properties": {
                    "RestApiId": reference(&self.id),
                    "DeploymentId": reference(&deployment_id),
                    "StageName": self.stage_name
                }
            }),
        });

        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Architecture, Artifact};
    use crate::resources::FunctionProps;
    use std::time::Duration;

    fn function() -> RustFunction {
        RustFunction::new(
            "Handler",
            FunctionProps {
                artifact: Artifact::new("handler", "bucket", "key"),
                architecture: Architecture::X86_64,
                memory_size: 128,
                timeout: Duration::from_secs(3),
                environment: Default::default(),
            },
        )
    }

    #[test]
    fn api_without_methods_is_rejected() {
        assert!(RestApi::new("Api", "api").resources().is_err());
    }

    #[test]
    fn method_is_bound_once() {
        let mut api = RestApi::new("Api", "api");
        api.add_root_method("post", &function()).unwrap();
        assert!(api.add_root_method("POST", &function()).is_err());
    }

    #[test]
    fn deployment_changes_with_methods() {
        let deployment = |api: &RestApi| {
            api.resources()
                .unwrap()
                .into_iter()
                .find(|r| r.resource["Type"] == "AWS::ApiGateway::Deployment")
                .unwrap()
                .name
        };

        let mut api = RestApi::new("Api", "api");
        api.add_root_method("POST", &function()).unwrap();
        let first = deployment(&api);

        assert!(first.starts_with("ApiDeployment"));
        assert_eq!(first, deployment(&api));

        api.add_root_method("GET", &function()).unwrap();
        assert_ne!(first, deployment(&api));
    }

    #[test]
    fn url_points_at_the_stage() {
        let api = RestApi::new("Api", "api");

        assert_eq!(
            api.url(),
            json!({"Fn::Sub": "https://${Api}.execute-api.${AWS::Region}.${AWS::URLSuffix}/${ApiDeploymentStageprod}/"})
        );
    }
}
