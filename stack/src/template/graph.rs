use crate::error::SynthError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Matches `${Name}` and `${Name.Attribute}` tokens of Fn::Sub, including `${!Escaped}` ones
pub(super) fn sub_tokens() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

/// Names referenced by a Fn::Sub template string, except the locally bound ones
fn sub_references(template: &str, bound: &BTreeSet<String>, found: &mut BTreeSet<String>) {
    for capture in sub_tokens().captures_iter(template) {
        let token = &capture[1];

        if token.starts_with('!') {
            continue;
        }

        let name = token.split('.').next().unwrap_or(token);

        if !bound.contains(name) {
            found.insert(name.to_string());
        }
    }
}

fn collect(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(object) => collect_object(object, found),
        Value::Array(items) => items.iter().for_each(|item| collect(item, found)),
        _ => {}
    }
}

fn collect_object(object: &Map<String, Value>, found: &mut BTreeSet<String>) {
    if object.len() == 1 {
        match object.iter().next() {
            Some((key, Value::String(name))) if key == "Ref" => {
                found.insert(name.clone());
                return;
            }

            Some((key, Value::String(path))) if key == "Fn::GetAtt" => {
                let name = path.split('.').next().unwrap_or(path);
                found.insert(name.to_string());
                return;
            }

            Some((key, Value::Array(pair))) if key == "Fn::GetAtt" => {
                if let Some(Value::String(name)) = pair.first() {
                    found.insert(name.clone());
                }

                pair.iter().skip(1).for_each(|item| collect(item, found));
                return;
            }

            Some((key, Value::String(template))) if key == "Fn::Sub" => {
                sub_references(template, &BTreeSet::new(), found);
                return;
            }

            Some((key, Value::Array(pair))) if key == "Fn::Sub" => {
                let variables = pair.get(1).and_then(Value::as_object);

                let bound: BTreeSet<String> = variables
                    .map(|vars| vars.keys().cloned().collect())
                    .unwrap_or_default();

                if let Some(Value::String(template)) = pair.first() {
                    sub_references(template, &bound, found);
                }

                if let Some(vars) = variables {
                    vars.values().for_each(|value| collect(value, found));
                }

                return;
            }

            _ => {}
        }
    }

    object.values().for_each(|value| collect(value, found));
}

/// Every logical id or pseudo parameter referenced from a JSON fragment
pub fn references(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect(value, &mut found);
    found
}

/// References of a resource body, explicit DependsOn included
pub(super) fn resource_references(resource: &Value) -> BTreeSet<String> {
    let mut found = references(resource);

    match resource.get("DependsOn") {
        Some(Value::String(name)) => {
            found.insert(name.clone());
        }

        Some(Value::Array(names)) => {
            found.extend(names.iter().filter_map(Value::as_str).map(String::from));
        }

        _ => {}
    }

    found
}

/// Topological order of resources, ties broken by logical id
pub(super) fn dependency_order(
    resources: &Map<String, Value>,
) -> Result<Vec<String>, SynthError> {
    // Only edges between resources matter, parameters are known before anything is created
    let mut pending: BTreeMap<&str, BTreeSet<String>> = resources
        .iter()
        .map(|(name, resource)| {
            let deps = resource_references(resource)
                .into_iter()
                .filter(|dep| resources.contains_key(dep))
                .collect();

            (name.as_str(), deps)
        })
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if ready.is_empty() {
            return Err(SynthError::CircularReference(find_cycle(&pending)));
        }

        for name in ready {
            pending.remove(name);

            for deps in pending.values_mut() {
                deps.remove(name);
            }

            order.push(name.to_string());
        }
    }

    Ok(order)
}

/// Walk unresolved dependencies until a resource repeats
///
/// Every pending resource still has at least one pending dependency, so the walk never stops early.
fn find_cycle(pending: &BTreeMap<&str, BTreeSet<String>>) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    let mut current = pending.keys().next().map(|name| name.to_string());

    while let Some(name) = current {
        if let Some(start) = path.iter().position(|seen| *seen == name) {
            let mut cycle = path.split_off(start);
            cycle.push(name);
            return cycle;
        }

        current = pending
            .get(name.as_str())
            .and_then(|deps| deps.iter().next())
            .cloned();

        path.push(name);
    }

    path
}
