mod graph;
mod resolve;

use crate::error::SynthError;
use crate::parameter::CfnParameter;
use eyre::WrapErr;
use serde_json::{json, Map, Value};

pub use graph::references;

/// One logical resource of the template
#[derive(Clone, Debug, PartialEq)]
pub struct CfnResource {
    pub name: String,
    pub resource: Value,
}

/// A named string published by the stack
#[derive(Clone, Debug, PartialEq)]
pub struct CfnOutput {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
}

impl CfnOutput {
    pub fn new(name: &str, value: Value) -> Self {
        CfnOutput {
            name: name.to_string(),
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// CloudFormation document under construction
///
/// Sections are kept apart and only merged into a single JSON document on output,
/// so lookups never have to dig through the JSON tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Template {
    description: Option<String>,
    parameters: Map<String, Value>,
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl Template {
    pub fn new(description: &str) -> Self {
        Template {
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// Parameters and resources share one namespace, both are targets of "Ref"
    fn ensure_unique(&self, name: &str) -> Result<(), SynthError> {
        if self.resources.contains_key(name) || self.parameters.contains_key(name) {
            return Err(SynthError::DuplicateLogicalId(name.to_string()));
        }

        Ok(())
    }

    /// Add a resource to the CFN template
    pub fn add_resource(&mut self, CfnResource { name, resource }: CfnResource) -> eyre::Result<()> {
        self.ensure_unique(&name)?;
        log::debug!("Adding resource {name}");
        self.resources.insert(name, resource);
        Ok(())
    }

    pub fn add_resources(
        &mut self,
        resources: impl IntoIterator<Item = CfnResource>,
    ) -> eyre::Result<()> {
        for resource in resources {
            self.add_resource(resource)?;
        }

        Ok(())
    }

    pub fn add_parameter(&mut self, parameter: &CfnParameter) -> eyre::Result<()> {
        self.ensure_unique(&parameter.name)?;
        self.parameters
            .insert(parameter.name.clone(), parameter.to_json());

        Ok(())
    }

    pub fn add_output(&mut self, output: CfnOutput) -> eyre::Result<()> {
        if self.outputs.contains_key(&output.name) {
            return Err(SynthError::DuplicateLogicalId(output.name).into());
        }

        let mut body = Map::new();

        if let Some(description) = output.description {
            body.insert("Description".into(), json!(description));
        }

        body.insert("Value".into(), output.value);
        self.outputs.insert(output.name, Value::Object(body));
        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.resources.get(name)
    }

    /// All resources of a given CFN type, e.g. "AWS::SQS::Queue"
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource["Type"] == resource_type)
            .map(|(name, resource)| (name.as_str(), resource))
            .collect()
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// The value of a stack output
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name).map(|output| &output["Value"])
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Whole template as a single JSON document
    pub fn as_json(&self) -> Value {
        let mut template = Map::new();
        template.insert("AWSTemplateFormatVersion".into(), json!("2010-09-09"));

        if let Some(description) = &self.description {
            template.insert("Description".into(), json!(description));
        }

        if !self.parameters.is_empty() {
            template.insert("Parameters".into(), Value::Object(self.parameters.clone()));
        }

        template.insert("Resources".into(), Value::Object(self.resources.clone()));

        if !self.outputs.is_empty() {
            template.insert("Outputs".into(), Value::Object(self.outputs.clone()));
        }

        Value::Object(template)
    }

    pub fn to_json_string(&self) -> eyre::Result<String> {
        serde_json::to_string_pretty(&self.as_json()).wrap_err("Failed to serialize the template")
    }

    /// Check that every reference in resources and outputs points to something declared
    pub fn validate(&self) -> eyre::Result<()> {
        let sections = self
            .resources
            .iter()
            .map(|(name, resource)| (name, graph::resource_references(resource)))
            .chain(
                self.outputs
                    .iter()
                    .map(|(name, output)| (name, references(output))),
            );

        for (from, refs) in sections {
            for to in refs {
                if !self.is_declared(&to) {
                    return Err(SynthError::DanglingReference {
                        from: from.clone(),
                        to,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    fn is_declared(&self, name: &str) -> bool {
        self.resources.contains_key(name)
            || self.parameters.contains_key(name)
            || crate::intrinsic::is_pseudo(name)
    }

    /// Order in which CloudFormation can create the resources
    ///
    /// Fails if resources reference each other in a loop.
    pub fn dependency_order(&self) -> eyre::Result<Vec<String>> {
        graph::dependency_order(&self.resources).map_err(eyre::Report::from)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(&self.as_json()) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::{get_att, reference, sub};
    use pretty_assertions::assert_eq;

    fn queue(name: &str) -> CfnResource {
        CfnResource {
            name: name.into(),
            resource: json!({"Type": "AWS::SQS::Queue", "Properties": {}}),
        }
    }

    #[test]
    fn duplicate_resource_is_a_collision() {
        let mut template = Template::new("test");
        template.add_resource(queue("Queue")).unwrap();
        let error = template.add_resource(queue("Queue")).unwrap_err();

        assert_eq!(
            error.downcast_ref::<SynthError>(),
            Some(&SynthError::DuplicateLogicalId("Queue".into()))
        );
    }

    #[test]
    fn parameter_and_resource_share_namespace() {
        let mut template = Template::new("test");
        template.add_parameter(&CfnParameter::new("Queue")).unwrap();
        assert!(template.add_resource(queue("Queue")).is_err());
    }

    #[test]
    fn duplicate_output_is_a_collision() {
        let mut template = Template::new("test");
        template.add_output(CfnOutput::new("Name", json!("a"))).unwrap();
        assert!(template.add_output(CfnOutput::new("Name", json!("b"))).is_err());
    }

    #[test]
    fn dangling_reference_fails_validation() {
        let mut template = Template::new("test");
        template
            .add_output(CfnOutput::new("QueueArn", get_att("Missing", "Arn")))
            .unwrap();

        let error = template.validate().unwrap_err();

        assert_eq!(
            error.downcast_ref::<SynthError>(),
            Some(&SynthError::DanglingReference {
                from: "QueueArn".into(),
                to: "Missing".into()
            })
        );
    }

    #[test]
    fn pseudo_parameters_and_parameters_are_declared() {
        let mut template = Template::new("test");
        template.add_parameter(&CfnParameter::new("Name")).unwrap();
        template
            .add_output(CfnOutput::new(
                "Arn",
                sub("arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter${Name}"),
            ))
            .unwrap();
        template
            .add_output(CfnOutput::new("Plain", reference("Name")))
            .unwrap();

        template.validate().unwrap();
    }

    #[test]
    fn json_has_all_sections() {
        let mut template = Template::new("test");
        template.add_parameter(&CfnParameter::new("Name")).unwrap();
        template.add_resource(queue("Queue")).unwrap();
        template
            .add_output(CfnOutput::new("QueueUrl", reference("Queue")).with_description("url"))
            .unwrap();

        assert_eq!(
            template.as_json(),
            json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": "test",
                "Parameters": {"Name": {"Type": "String"}},
                "Resources": {"Queue": {"Type": "AWS::SQS::Queue", "Properties": {}}},
                "Outputs": {"QueueUrl": {"Description": "url", "Value": {"Ref": "Queue"}}}
            })
        );

        assert_eq!(template.output("QueueUrl"), Some(&reference("Queue")));
        assert_eq!(template.resources_of_type("AWS::SQS::Queue").len(), 1);
    }

    #[test]
    fn depends_on_undeclared_resource_fails_validation() {
        let mut template = Template::new("test");
        template
            .add_resource(CfnResource {
                name: "Queue".into(),
                resource: json!({
                    "Type": "AWS::SQS::Queue",
                    "DependsOn": ["Role"],
                    "Properties": {}
                }),
            })
            .unwrap();

        let error = template.validate().unwrap_err();

        assert_eq!(
            error.downcast_ref::<SynthError>(),
            Some(&SynthError::DanglingReference {
                from: "Queue".into(),
                to: "Role".into()
            })
        );
    }

    #[test]
    fn display_is_pretty_json() {
        let mut template = Template::new("test");
        template.add_resource(queue("Queue")).unwrap();

        let text = template.to_string();

        assert!(text.starts_with("{\n"));
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), template.as_json());
        assert_eq!(text, template.to_json_string().unwrap());
    }
}
