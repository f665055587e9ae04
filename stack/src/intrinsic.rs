//! Builders for CloudFormation intrinsic functions
use serde_json::{json, Value};

/// Pseudo parameters CloudFormation resolves on its own
pub const PSEUDO_PARAMETERS: [&str; 8] = [
    "AWS::AccountId",
    "AWS::NoValue",
    "AWS::NotificationARNs",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

pub fn is_pseudo(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name)
}

/// `{"Ref": name}`
pub fn reference(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{"Fn::GetAtt": [name, attribute]}`
pub fn get_att(name: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [name, attribute] })
}

/// `{"Fn::Sub": template}`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_att_is_a_pair() {
        assert_eq!(
            get_att("Queue", "Arn"),
            json!({"Fn::GetAtt": ["Queue", "Arn"]})
        );
    }

    #[test]
    fn pseudo_parameters_are_recognized() {
        assert!(is_pseudo("AWS::Region"));
        assert!(!is_pseudo("ConfigParameterName"));
    }
}
