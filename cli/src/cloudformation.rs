use crate::error::Error;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Capability, Parameter};
use eyre::{eyre, ContextCompat, WrapErr};
use indicatif::ProgressBar;
use std::time::{Duration, Instant};
use webhook_stack::stack::OUTPUT_NAMES;
use webhook_stack::ParameterValues;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Message CloudFormation answers with when an update changes nothing
const NO_UPDATES: &str = "No updates are to be performed";

/// Statuses after which the stack doesn't change on its own
pub(crate) fn is_terminal(status: &str) -> bool {
    !status.ends_with("_IN_PROGRESS")
}

pub(crate) fn is_success(status: &str) -> bool {
    matches!(status, "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE")
}

/// Order outputs the way they are declared, unknown ones go last
pub(crate) fn sort_outputs(outputs: &mut [(String, String)]) {
    outputs.sort_by_key(|(name, _)| {
        OUTPUT_NAMES
            .iter()
            .position(|known| *known == name.as_str())
            .unwrap_or(OUTPUT_NAMES.len())
    });
}

/// Deployed CloudFormation stack
#[derive(Clone, Debug)]
pub(crate) struct Stack {
    client: aws_sdk_cloudformation::Client,
    name: String,
}

impl Stack {
    pub(crate) fn new(config: &aws_config::SdkConfig, name: &str) -> Self {
        Stack {
            client: aws_sdk_cloudformation::Client::new(config),
            name: name.to_string(),
        }
    }

    async fn describe(&self) -> eyre::Result<Option<aws_sdk_cloudformation::types::Stack>> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(&self.name)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.stacks().first().cloned()),

            // Describing a stack which does not exist is a validation error
            Err(error) if error.code() == Some("ValidationError") => Ok(None),

            Err(error) => Err(error).wrap_err("Failed to describe stack"),
        }
    }

    /// Current status, None if the stack doesn't exist
    pub(crate) async fn status(&self) -> eyre::Result<Option<String>> {
        Ok(self
            .describe()
            .await?
            .and_then(|stack| stack.stack_status().map(|s| s.as_str().to_string())))
    }

    /// Create the stack or update the existing one
    ///
    /// Returns false if the update had nothing to change.
    pub(crate) async fn provision(
        &self,
        template: &str,
        parameters: &ParameterValues,
    ) -> eyre::Result<bool> {
        let parameters: Vec<Parameter> = parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect();

        let status = self.status().await?;
        log::debug!("Stack {} status before deploy: {status:?}", self.name);

        match status.as_deref() {
            None => {
                self.client
                    .create_stack()
                    .stack_name(&self.name)
                    .capabilities(Capability::CapabilityIam)
                    .template_body(template)
                    .set_parameters(Some(parameters))
                    .send()
                    .await
                    .wrap_err("Failed to create stack")?;

                Ok(true)
            }

            // A stack whose creation failed can only be deleted
            Some("ROLLBACK_COMPLETE") => Err(Error::new(
                &format!("Stack {} failed to create earlier", self.name),
                Some("Delete it in the CloudFormation console and deploy again."),
            )
            .into()),

            Some(status) if !is_terminal(status) => Err(Error::new(
                &format!("Stack {} is busy ({status})", self.name),
                Some("Wait for the running operation to finish."),
            )
            .into()),

            Some(_) => {
                let result = self
                    .client
                    .update_stack()
                    .stack_name(&self.name)
                    .capabilities(Capability::CapabilityIam)
                    .template_body(template)
                    .set_parameters(Some(parameters))
                    .send()
                    .await;

                match result {
                    Ok(_) => Ok(true),
                    Err(error) if error.message().is_some_and(|m| m.contains(NO_UPDATES)) => {
                        Ok(false)
                    }
                    Err(error) => Err(error).wrap_err("Failed to update stack"),
                }
            }
        }
    }

    /// Poll until the stack settles
    pub(crate) async fn wait(&self, progress: &ProgressBar, timeout: Duration) -> eyre::Result<()> {
        let started = Instant::now();

        loop {
            let stack = self
                .describe()
                .await?
                .wrap_err(format!("Stack {} disappeared", self.name))?;

            let status = stack
                .stack_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default();

            progress.set_message(format!(
                "{status} ({})",
                humantime::format_duration(Duration::from_secs(started.elapsed().as_secs()))
            ));

            if is_terminal(&status) {
                if is_success(&status) {
                    return Ok(());
                }

                return Err(eyre!(
                    "Stack {} ended in {status}: {}",
                    self.name,
                    stack.stack_status_reason().unwrap_or("no reason given")
                ));
            }

            if started.elapsed() > timeout {
                return Err(eyre!(
                    "Stack {} is still {status} after {}",
                    self.name,
                    humantime::format_duration(timeout)
                ));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Outputs of the deployed stack, in declaration order
    pub(crate) async fn outputs(&self) -> eyre::Result<Vec<(String, String)>> {
        let stack = self.describe().await?.wrap_err(Error::new(
            &format!("Stack {} not found", self.name),
            Some("Deploy it first, or check the region."),
        ))?;

        let mut outputs: Vec<(String, String)> = stack
            .outputs()
            .iter()
            .filter_map(|output| {
                Some((
                    output.output_key()?.to_string(),
                    output.output_value()?.to_string(),
                ))
            })
            .collect();

        sort_outputs(&mut outputs);
        Ok(outputs)
    }
}
