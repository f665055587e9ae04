use crate::commands::ParameterArgs;
use crate::error::Error;
use crate::runner::{Runnable, Runner};
use clap::ArgAction;
use std::path::{Path, PathBuf};

#[derive(clap::Args, Clone)]
pub(crate) struct SynthCommand {
    /// Write the template to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Inline parameter values instead of keeping them as stack parameters
    #[arg(long, action = ArgAction::SetTrue)]
    resolved: bool,

    #[command(flatten)]
    parameters: ParameterArgs,
}

impl Runnable for SynthCommand {
    fn runner(&self, config_path: &Path) -> impl Runner {
        SynthRunner {
            command: self.clone(),
            config_path: config_path.to_path_buf(),
        }
    }
}

struct SynthRunner {
    command: SynthCommand,
    config_path: PathBuf,
}

impl Runner for SynthRunner {
    /// Synthesize the template from already built bundles
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(&self.config_path)?;
        let parameters = project.parameters(&self.command.parameters.parameters)?;
        let bundles = project.bundles()?;
        let synthesized = project.synthesize(&bundles, &parameters)?;

        let template = if self.command.resolved {
            synthesized.resolved()?
        } else {
            synthesized.template
        };

        let json = template.to_json_string()?;

        let Some(path) = &self.command.output else {
            println!("{json}");
            return Ok(());
        };

        if let Err(error) = tokio::fs::write(path, json).await {
            return Err(self.error(
                Some(&format!("Failed to write {path:?}")),
                Some("Check that the directory exists and is writable."),
                Some(Box::new(error)),
            ));
        }

        eprintln!(
            "{} {}",
            console::style("Template written to").green().bold(),
            path.display()
        );

        Ok(())
    }
}
