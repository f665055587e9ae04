use super::graph::sub_tokens;
use super::Template;
use crate::error::SynthError;
use crate::parameter::ParameterValues;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

impl Template {
    /// Copy of the template with parameter references replaced by concrete values
    ///
    /// Resource references and pseudo parameters stay as they are, CloudFormation resolves them.
    pub fn resolve(&self, values: &ParameterValues) -> eyre::Result<Template> {
        let mut resolved: BTreeMap<&str, &str> = BTreeMap::new();

        for name in self.parameter_names() {
            let value = values
                .get(name)
                .ok_or_else(|| SynthError::UnresolvedParameter(name.to_string()))?;

            resolved.insert(name, value);
        }

        Ok(Template {
            description: self.description.clone(),
            parameters: Map::new(),
            resources: substitute_map(&self.resources, &resolved),
            outputs: substitute_map(&self.outputs, &resolved),
        })
    }
}

fn substitute_map(map: &Map<String, Value>, values: &BTreeMap<&str, &str>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), substitute(value, values)))
        .collect()
}

fn substitute(value: &Value, values: &BTreeMap<&str, &str>) -> Value {
    match value {
        Value::Object(object) if object.len() == 1 => {
            match object.iter().next() {
                Some((key, Value::String(name))) if key == "Ref" => {
                    if let Some(value) = values.get(name.as_str()) {
                        return Value::String(value.to_string());
                    }
                }

                Some((key, Value::String(template))) if key == "Fn::Sub" => {
                    let mut sub = Map::new();
                    sub.insert(key.clone(), Value::String(substitute_sub(template, values)));
                    return Value::Object(sub);
                }

                Some((key, Value::Array(pair))) if key == "Fn::Sub" => {
                    let mut shadowed = values.clone();

                    // Locally bound variables shadow parameters of the same name, but only
                    // inside the template string. Their values live in the outer scope.
                    if let Some(vars) = pair.get(1).and_then(Value::as_object) {
                        for name in vars.keys() {
                            shadowed.remove(name.as_str());
                        }
                    }

                    let pair = pair
                        .iter()
                        .enumerate()
                        .map(|(i, item)| match (i, item) {
                            (0, Value::String(template)) => {
                                Value::String(substitute_sub(template, &shadowed))
                            }
                            _ => substitute(item, values),
                        })
                        .collect();

                    let mut sub = Map::new();
                    sub.insert(key.clone(), Value::Array(pair));
                    return Value::Object(sub);
                }

                _ => {}
            }

            Value::Object(substitute_map(object, values))
        }

        Value::Object(object) => Value::Object(substitute_map(object, values)),
        Value::Array(items) => Value::Array(items.iter().map(|i| substitute(i, values)).collect()),
        other => other.clone(),
    }
}

/// Replace `${Parameter}` tokens in a Fn::Sub template
///
/// Inserted values are escaped so that a literal "${" in them is not read as a new token.
fn substitute_sub(template: &str, values: &BTreeMap<&str, &str>) -> String {
    sub_tokens()
        .replace_all(template, |captures: &regex::Captures| {
            let token = &captures[1];

            match values.get(token) {
                Some(value) => value.replace("${", "${!"),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}
