use crate::error::SynthError;
use eyre::{ContextCompat, WrapErr};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A string-typed deploy-time parameter of the stack
#[derive(Clone, Debug, PartialEq)]
pub struct CfnParameter {
    pub name: String,
    pub description: Option<String>,

    /// Anchored regular expression the value must match
    pub allowed_pattern: Option<String>,
    pub constraint_description: Option<String>,
}

impl CfnParameter {
    pub fn new(name: &str) -> Self {
        CfnParameter {
            name: name.to_string(),
            description: None,
            allowed_pattern: None,
            constraint_description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_allowed_pattern(mut self, pattern: &str, constraint: &str) -> Self {
        self.allowed_pattern = Some(pattern.to_string());
        self.constraint_description = Some(constraint.to_string());
        self
    }

    /// The entry under the template's "Parameters" section
    pub fn to_json(&self) -> Value {
        let mut parameter = Map::new();
        parameter.insert("Type".into(), json!("String"));

        if let Some(description) = &self.description {
            parameter.insert("Description".into(), json!(description));
        }

        if let Some(pattern) = &self.allowed_pattern {
            parameter.insert("AllowedPattern".into(), json!(pattern));
        }

        if let Some(constraint) = &self.constraint_description {
            parameter.insert("ConstraintDescription".into(), json!(constraint));
        }

        Value::Object(parameter)
    }

    /// Look the parameter up in supplied values and validate it against the pattern
    pub fn check<'a>(&self, values: &'a ParameterValues) -> eyre::Result<&'a str> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| SynthError::UnresolvedParameter(self.name.clone()))?;

        if let Some(pattern) = &self.allowed_pattern {
            let re = Regex::new(pattern)
                .wrap_err(format!("Bad pattern for the parameter {}", self.name))?;

            if !re.is_match(value) {
                return Err(SynthError::InvalidParameter {
                    name: self.name.clone(),
                    value: value.to_string(),
                    pattern: pattern.clone(),
                }
                .into());
            }
        }

        Ok(value)
    }
}

/// Concrete values for the stack parameters, keyed by parameter name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterValues(BTreeMap<String, String>);

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values from `other` win over the ones already present
    pub fn merge(mut self, other: ParameterValues) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Parse a `Name=Value` pair as passed on the command line
    ///
    /// Only the first `=` splits, so values may contain `=` themselves.
    pub fn parse_assignment(assignment: &str) -> eyre::Result<(String, String)> {
        let (name, value) = assignment
            .split_once('=')
            .wrap_err(format!("Expected Name=Value, got \"{assignment}\""))?;

        let name = name.trim();

        if name.is_empty() {
            return Err(eyre::eyre!("Empty parameter name in \"{assignment}\""));
        }

        Ok((name.to_string(), value.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ParameterValues(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> CfnParameter {
        CfnParameter::new("Version").with_allowed_pattern("^[0-9]+$", "digits")
    }

    #[test]
    fn missing_value_is_unresolved() {
        let error = version().check(&ParameterValues::new()).unwrap_err();

        assert_eq!(
            error.downcast_ref::<SynthError>(),
            Some(&SynthError::UnresolvedParameter("Version".into()))
        );
    }

    #[test]
    fn value_must_match_pattern() {
        let values: ParameterValues = [("Version", "latest")].into_iter().collect();
        let error = version().check(&values).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<SynthError>(),
            Some(SynthError::InvalidParameter { name, .. }) if name == "Version"
        ));

        let values: ParameterValues = [("Version", "12")].into_iter().collect();
        assert_eq!(version().check(&values).unwrap(), "12");
    }

    #[test]
    fn assignment_splits_on_first_equals_sign() {
        assert_eq!(
            ParameterValues::parse_assignment("Name=a=b").unwrap(),
            ("Name".to_string(), "a=b".to_string())
        );

        assert!(ParameterValues::parse_assignment("NoEquals").is_err());
        assert!(ParameterValues::parse_assignment("=value").is_err());
    }

    #[test]
    fn merge_prefers_later_values() {
        let file: ParameterValues = [("A", "1"), ("B", "2")].into_iter().collect();
        let flags: ParameterValues = [("B", "3")].into_iter().collect();
        let merged = file.merge(flags);

        assert_eq!(merged.get("A"), Some("1"));
        assert_eq!(merged.get("B"), Some("3"));
    }

    #[test]
    fn json_contains_only_declared_fields() {
        assert_eq!(
            CfnParameter::new("Plain").to_json(),
            json!({"Type": "String"})
        );
    }
}
