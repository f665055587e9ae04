use crate::parameter::CfnParameter;
use serde_json::{json, Value};

/// A single IAM policy statement
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        PolicyStatement {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
        }
    }

    /// Read access to exactly one SSM parameter, the one named by a stack parameter
    ///
    /// SSM parameter names start with a slash, so there is none after "parameter".
    pub fn ssm_get_parameter(name: &CfnParameter) -> Self {
        Self::allow(
            &["ssm:GetParameter"],
            vec![crate::intrinsic::sub(&format!(
                "arn:aws:ssm:${{AWS::Region}}:${{AWS::AccountId}}:parameter${{{}}}",
                name.name
            ))],
        )
    }

    pub fn to_json(&self) -> Value {
        json!({
            "Effect": "Allow",
            "Action": self.actions,
            "Resource": self.resources,
        })
    }
}

/// Trust policy letting Lambda assume a role
pub(crate) fn lambda_assume_role() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"Service": "lambda.amazonaws.com"},
            "Action": "sts:AssumeRole"
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssm_statement_is_pinned_to_parameter_name() {
        let statement = PolicyStatement::ssm_get_parameter(&CfnParameter::new("ConfigParameterName"));

        assert_eq!(
            statement.to_json(),
            json!({
                "Effect": "Allow",
                "Action": ["ssm:GetParameter"],
                "Resource": [{
                    "Fn::Sub": "arn:aws:ssm:${AWS::Region}:${AWS::AccountId}:parameter${ConfigParameterName}"
                }]
            })
        );
    }
}
