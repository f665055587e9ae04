use crate::error::Error;
use eyre::{ContextCompat, WrapErr};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use webhook_stack::{Architecture, ParameterValues};

pub const DEFAULT_CONFIG_FILE: &str = "webhook-stack.toml";

/// ConfigFile is the structure of webhook-stack.toml
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConfigFile {
    /// [stack]
    /// name = "webhooks-prod"
    #[serde(default)]
    stack: StackSection,

    /// [artifacts]
    /// bucket = "my-artifacts"
    artifacts: ArtifactsSection,

    /// [parameters]
    /// ConfigParameterName = "/app/config"
    /// ConfigParameterVersion = 7
    #[serde(default, deserialize_with = "parameter_values")]
    parameters: BTreeMap<String, String>,

    /// Directory containing the config file, relative paths resolve against it
    #[serde(skip)]
    dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StackSection {
    #[serde(default)]
    name: String,
    region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtifactsSection {
    bucket: String,

    #[serde(default = "default_manifest_path")]
    manifest_path: PathBuf,

    #[serde(default)]
    architecture: Architecture,

    /// Where cargo lambda puts the zipped binaries, defaults to target/lambda next to the manifest
    lambda_dir: Option<PathBuf>,
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("Cargo.toml")
}

/// Stack parameters are strings, but numbers and booleans are accepted as written
fn parameter_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, toml::Value>::deserialize(deserializer)?;

    raw.into_iter()
        .map(|(name, value)| {
            let value = match value {
                toml::Value::String(value) => value,
                toml::Value::Integer(value) => value.to_string(),
                toml::Value::Float(value) => value.to_string(),
                toml::Value::Boolean(value) => value.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "parameter {name} must be a string or a number, got {}",
                        other.type_str()
                    )))
                }
            };

            Ok((name, value))
        })
        .collect()
}

impl ConfigFile {
    /// Read the config file
    ///
    /// If the stack name is not set explicitly, the package name from Cargo.toml
    /// next to the config file is used.
    pub(crate) fn from_path(path: &Path) -> eyre::Result<Self> {
        let toml_string = fs::read_to_string(path).wrap_err(Error::new(
            &format!("Failed to read {path:?}"),
            Some("Create the config file or point to it with --config."),
        ))?;

        let mut config: ConfigFile = toml::from_str(&toml_string).wrap_err(Error::new(
            &format!("Failed to parse {path:?}"),
            Some("Check [stack], [artifacts] and [parameters] sections."),
        ))?;

        config.dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if config.stack.name.is_empty() {
            config.stack.name = Self::cargo_toml_name(&config.dir)?;
        }

        Ok(config)
    }

    /// Reads Cargo.toml in a given directory and returns the name
    fn cargo_toml_name(dir: &Path) -> eyre::Result<String> {
        let cargo_toml_path = dir.join("Cargo.toml");

        let cargo_toml_string = fs::read_to_string(&cargo_toml_path).wrap_err(Error::new(
            &format!("Failed to read {cargo_toml_path:?}"),
            Some("Set [stack] name in the config file."),
        ))?;

        let cargo_toml: toml::Value = cargo_toml_string
            .parse::<toml::Value>()
            .wrap_err(format!("Failed to parse TOML in {cargo_toml_path:?}"))?;

        let name = cargo_toml
            .get("package")
            .and_then(|pkg| pkg.get("name"))
            .and_then(|name| name.as_str())
            .wrap_err(Error::new(
                &format!("No crate name property in {cargo_toml_path:?}"),
                Some("Set [stack] name in the config file."),
            ))?
            .to_string();

        Ok(name)
    }

    pub(crate) fn stack_name(&self) -> &str {
        &self.stack.name
    }

    pub(crate) fn region(&self) -> Option<&str> {
        self.stack.region.as_deref()
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.artifacts.bucket
    }

    pub(crate) fn architecture(&self) -> Architecture {
        self.artifacts.architecture
    }

    pub(crate) fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.manifest_path)
    }

    pub(crate) fn lambda_dir(&self) -> PathBuf {
        match &self.artifacts.lambda_dir {
            Some(dir) => self.dir.join(dir),
            None => self
                .manifest_path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
                .join("target")
                .join("lambda"),
        }
    }

    /// Parameter values from the file, overridden by Name=Value assignments
    pub(crate) fn parameters(&self, overrides: &[String]) -> eyre::Result<ParameterValues> {
        let overrides = overrides
            .iter()
            .map(|assignment| ParameterValues::parse_assignment(assignment))
            .collect::<eyre::Result<ParameterValues>>()?;

        let values: ParameterValues = self.parameters.clone().into_iter().collect();
        Ok(values.merge(overrides))
    }
}
