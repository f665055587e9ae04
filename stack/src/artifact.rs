use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// CPU architecture the handler binaries are compiled for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,

    #[serde(rename = "arm64")]
    Arm64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        }
    }
}

/// Zipped handler binary stored in S3
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub binary_name: String,
    pub bucket: String,
    pub key: String,
}

impl Artifact {
    pub fn new(binary_name: &str, bucket: &str, key: &str) -> Self {
        Artifact {
            binary_name: binary_name.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    /// Content addressed key, a rebuilt binary always lands under a new key
    ///
    /// A new key is what makes CloudFormation update the function code.
    pub fn key_for(binary_name: &str, digest: &str) -> String {
        format!("{binary_name}/{digest}.zip")
    }

    /// The "Code" property of a Lambda function
    pub fn code(&self) -> Value {
        json!({
            "S3Bucket": self.bucket,
            "S3Key": self.key,
        })
    }
}
