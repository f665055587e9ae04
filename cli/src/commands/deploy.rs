use crate::cloudformation::Stack;
use crate::commands::build::BuildRunner;
use crate::commands::outputs::print_outputs;
use crate::commands::ParameterArgs;
use crate::error::Error;
use crate::logger::Logger;
use crate::runner::{Runnable, Runner};
use clap::ArgAction;
use eyre::WrapErr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(clap::Args, Clone)]
pub(crate) struct DeployCommand {
    /// Deploy the bundles built before, without running the build
    #[arg(long, action = ArgAction::SetTrue)]
    skip_build: bool,

    /// How long to wait for the stack to settle, e.g. "30m"
    #[arg(long, default_value = "30m", value_parser = humantime::parse_duration)]
    timeout: Duration,

    #[command(flatten)]
    parameters: ParameterArgs,
}

impl Runnable for DeployCommand {
    fn runner(&self, config_path: &Path) -> impl Runner {
        DeployRunner {
            command: self.clone(),
            config_path: config_path.to_path_buf(),
        }
    }
}

struct DeployRunner {
    command: DeployCommand,
    config_path: PathBuf,
}

impl Runner for DeployRunner {
    /// Build the binaries, upload the bundles and create or update the stack
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(&self.config_path)?;

        // Fail on bad parameters before building or uploading anything
        let parameters = project.parameters(&self.command.parameters.parameters)?;

        if !self.command.skip_build {
            BuildRunner {
                config_path: self.config_path.clone(),
            }
            .run()
            .await?;
        }

        let bundles = project.bundles()?;
        let synthesized = project.synthesize(&bundles, &parameters)?;
        let template = synthesized.template.to_json_string()?;

        let aws_config = project.aws_config().await;
        let s3 = aws_sdk_s3::Client::new(&aws_config);
        let bucket = project.config.bucket();

        println!(
            "{} {} bundles to {}",
            console::style("Uploading").green().bold(),
            bundles.len(),
            console::style(bucket).bold()
        );

        for bundle in &bundles {
            let spinner = Logger::spinner(&format!("Uploading {}", bundle.key()));
            let uploaded = bundle.upload(&s3, bucket).await;
            spinner.finish_and_clear();

            let status = if uploaded.wrap_err("Upload failed")? {
                "uploaded"
            } else {
                "unchanged"
            };

            println!(
                "{} {}",
                console::style(&bundle.binary_name).bold(),
                console::style(status).dim()
            );
        }

        println!(
            "{} {}",
            console::style("Deploying").green().bold(),
            synthesized.stack_name
        );

        let stack = Stack::new(&aws_config, &synthesized.stack_name);
        let spinner = Logger::spinner("Submitting template");

        let result = match stack.provision(&template, &synthesized.parameters).await {
            Ok(true) => stack.wait(&spinner, self.command.timeout).await,
            Ok(false) => {
                log::info!("Stack {} is up to date", synthesized.stack_name);
                Ok(())
            }
            Err(error) => Err(error),
        };

        spinner.finish_and_clear();
        result?;

        print_outputs(&stack.outputs().await?, false)?;
        println!("{}", console::style("Done").green().bold());
        Ok(())
    }
}
