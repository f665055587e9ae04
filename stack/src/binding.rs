//! Deploy-time configuration shared by both handlers
//!
//! The name and the version of an SSM parameter are passed separately. Changing the
//! configuration means deploying with a new version, so a rollback is a parameter change.
use crate::parameter::CfnParameter;
use crate::resources::{PolicyStatement, Queue};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CONFIG_PARAMETER_NAME: &str = "ConfigParameterName";
pub const CONFIG_PARAMETER_VERSION: &str = "ConfigParameterVersion";

/// Environment variables every handler receives
pub const ENV_QUEUE_URL: &str = "QUEUE_URL";
pub const ENV_CONFIG_PARAMETER_NAME: &str = "CONFIG_PARAMETER_NAME";
pub const ENV_CONFIG_PARAMETER_VERSION: &str = "CONFIG_PARAMETER_VERSION";

#[derive(Clone, Debug)]
pub struct ConfigBinding {
    pub name: CfnParameter,
    pub version: CfnParameter,
}

impl Default for ConfigBinding {
    fn default() -> Self {
        ConfigBinding {
            name: CfnParameter::new(CONFIG_PARAMETER_NAME)
                .with_description("Fully qualified name of the SSM parameter holding the configuration")
                .with_allowed_pattern(
                    "^/[a-zA-Z0-9_.\\-/]+$",
                    "Must be a fully qualified SSM parameter name starting with /",
                ),
            version: CfnParameter::new(CONFIG_PARAMETER_VERSION)
                .with_description("Version of the SSM parameter the handlers are pinned to")
                .with_allowed_pattern("^[0-9]+$", "Must be a numeric version"),
        }
    }
}

impl ConfigBinding {
    pub fn parameters(&self) -> [&CfnParameter; 2] {
        [&self.name, &self.version]
    }

    /// Environment for a handler which talks to the queue and reads the pinned configuration
    pub fn environment(&self, queue: &Queue) -> BTreeMap<String, Value> {
        [
            (ENV_QUEUE_URL, queue.queue_url()),
            (ENV_CONFIG_PARAMETER_NAME, crate::intrinsic::reference(&self.name.name)),
            (ENV_CONFIG_PARAMETER_VERSION, crate::intrinsic::reference(&self.version.name)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// The only SSM permission a handler gets
    pub fn read_statement(&self) -> PolicyStatement {
        PolicyStatement::ssm_get_parameter(&self.name)
    }
}
