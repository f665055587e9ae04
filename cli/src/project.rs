use crate::artifact::Bundle;
use crate::config::ConfigFile;
use aws_config::BehaviorVersion;
use std::path::Path;
use webhook_stack::binding::ConfigBinding;
use webhook_stack::stack::{PROCESS_QUEUE_BINARY, WEBHOOK_BINARY};
use webhook_stack::{synthesize, ParameterValues, StackProps, Synthesized};

/// Handler binaries the stack runs, in build order
pub(crate) const BINARIES: [&str; 2] = [WEBHOOK_BINARY, PROCESS_QUEUE_BINARY];

/// The stack being worked on, as described by the config file
#[derive(Clone, Debug)]
pub(crate) struct Project {
    pub(crate) config: ConfigFile,
}

impl Project {
    pub(crate) fn from_path(config_path: &Path) -> eyre::Result<Self> {
        Ok(Project {
            config: ConfigFile::from_path(config_path)?,
        })
    }

    /// Already built bundles of both binaries
    pub(crate) fn bundles(&self) -> eyre::Result<Vec<Bundle>> {
        BINARIES
            .iter()
            .map(|binary| Bundle::locate(&self.config.lambda_dir(), binary))
            .collect()
    }

    /// Parameter values from the config file and the command line
    ///
    /// Checked against the declared stack parameters, so that a missing or malformed value
    /// is reported before anything is built or looked up.
    pub(crate) fn parameters(&self, overrides: &[String]) -> eyre::Result<ParameterValues> {
        let values = self.config.parameters(overrides)?;

        for parameter in ConfigBinding::default().parameters() {
            parameter.check(&values)?;
        }

        Ok(values)
    }

    /// Template and checked parameters for the given bundles
    pub(crate) fn synthesize(
        &self,
        bundles: &[Bundle],
        parameters: &ParameterValues,
    ) -> eyre::Result<Synthesized> {
        let bucket = self.config.bucket();

        let artifact = |binary: &str| {
            bundles
                .iter()
                .find(|b| b.binary_name == binary)
                .map(|b| b.artifact(bucket))
                .ok_or_else(|| eyre::eyre!("No bundle for {binary}"))
        };

        let props = StackProps {
            stack_name: self.config.stack_name().to_string(),
            webhook: artifact(WEBHOOK_BINARY)?,
            process_queue: artifact(PROCESS_QUEUE_BINARY)?,
            architecture: self.config.architecture(),
        };

        synthesize(props, parameters)
    }

    /// AWS SDK config, in the region from the config file when it has one
    pub(crate) async fn aws_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::v2025_01_17());

        if let Some(region) = self.config.region() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }

        loader.load().await
    }
}
