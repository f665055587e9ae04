use aws_sdk_s3::primitives::ByteStream;
use eyre::{eyre, WrapErr};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use webhook_stack::{Architecture, Artifact};

/// Zipped handler binary produced by cargo lambda
#[derive(Clone, Debug)]
pub(crate) struct Bundle {
    pub(crate) binary_name: String,
    pub(crate) path: PathBuf,
    pub(crate) digest: String,
}

impl Bundle {
    /// Find the zip of a binary and hash it
    pub(crate) fn locate(lambda_dir: &Path, binary_name: &str) -> eyre::Result<Self> {
        let path = lambda_dir.join(binary_name).join("bootstrap.zip");

        if !path.exists() {
            return Err(crate::error::Error::new(
                &format!("No bundle for \"{binary_name}\" at {path:?}"),
                Some("Run the build command first."),
            )
            .into());
        }

        let digest = sha256::try_digest(path.as_path())
            .wrap_err(format!("Failed to hash {path:?}"))?;

        Ok(Bundle {
            binary_name: binary_name.to_string(),
            path,
            digest,
        })
    }

    pub(crate) fn key(&self) -> String {
        Artifact::key_for(&self.binary_name, &self.digest)
    }

    pub(crate) fn artifact(&self, bucket: &str) -> Artifact {
        Artifact::new(&self.binary_name, bucket, &self.key())
    }

    /// Upload the bundle unless the bucket already has it
    ///
    /// Keys are content addressed, so an existing key always holds the same bytes.
    /// Returns false when the upload was skipped.
    pub(crate) async fn upload(&self, client: &aws_sdk_s3::Client, bucket: &str) -> eyre::Result<bool> {
        let key = self.key();

        match client.head_object().bucket(bucket).key(&key).send().await {
            Ok(_) => {
                log::debug!("s3://{bucket}/{key} already exists");
                return Ok(false);
            }

            Err(error) if error.as_service_error().is_some_and(|e| e.is_not_found()) => {}

            Err(error) => {
                return Err(error).wrap_err(format!("Failed to check s3://{bucket}/{key}"));
            }
        }

        let body = ByteStream::from_path(&self.path)
            .await
            .wrap_err(format!("Could not read {:?}", self.path))?;

        client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .wrap_err(format!("Failed to upload s3://{bucket}/{key}"))?;

        Ok(true)
    }
}

/// Compile the handler binaries into zipped bootstrap bundles with cargo lambda
///
/// Compiler errors are collected and returned, the rest of the output only updates the spinner.
pub(crate) async fn build(
    manifest_path: &Path,
    lambda_dir: &Path,
    architecture: Architecture,
    binaries: &[&str],
    progress: &ProgressBar,
) -> eyre::Result<()> {
    let mut command = tokio::process::Command::new("cargo");

    command
        .arg("lambda")
        .arg("build")
        .arg("--release")
        .arg("--output-format")
        .arg("zip")
        .arg("--manifest-path")
        .arg(manifest_path)
        .arg("--lambda-dir")
        .arg(lambda_dir);

    if architecture == Architecture::Arm64 {
        command.arg("--arm64");
    }

    for binary in binaries {
        command.arg("--bin").arg(binary);
    }

    log::debug!("Running {command:?}");

    let mut child = command
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .wrap_err("Failed to execute cargo lambda, is it installed?")?;

    let mut is_failed = false;
    let mut error_message_lines = Vec::new();

    if let Some(stderr) = child.stderr.take() {
        let mut reader = BufReader::new(stderr).lines();

        while let Some(line) = reader.next_line().await? {
            if line.trim().starts_with("error") || is_failed {
                is_failed = true;
                error_message_lines.push(line);
                continue;
            }

            if !line.trim().is_empty() {
                progress.set_message(line.trim().to_string());
            }
        }
    }

    let status = child.wait().await?;

    if !status.success() {
        return Err(eyre!("{}", error_message_lines.join("\n")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_key_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let bundle_dir = dir.path().join("webhook");
        std::fs::create_dir_all(&bundle_dir).unwrap();
        std::fs::write(bundle_dir.join("bootstrap.zip"), b"zip bytes").unwrap();

        let bundle = Bundle::locate(dir.path(), "webhook").unwrap();

        assert_eq!(bundle.digest, sha256::digest("zip bytes"));
        assert_eq!(bundle.key(), format!("webhook/{}.zip", bundle.digest));
        assert_eq!(bundle.artifact("bucket").bucket, "bucket");
    }

    #[test]
    fn missing_bundle_asks_for_a_build() {
        let dir = tempfile::tempdir().unwrap();
        let error = Bundle::locate(dir.path(), "process_queue").unwrap_err();

        assert!(error.to_string().contains("process_queue"));
    }
}
