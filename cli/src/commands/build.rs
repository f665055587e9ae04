use crate::artifact;
use crate::error::Error;
use crate::logger::Logger;
use crate::project::BINARIES;
use crate::runner::{Runnable, Runner};
use eyre::WrapErr;
use std::path::{Path, PathBuf};

#[derive(clap::Args, Clone)]
pub(crate) struct BuildCommand {}

impl Runnable for BuildCommand {
    fn runner(&self, config_path: &Path) -> impl Runner {
        BuildRunner {
            config_path: config_path.to_path_buf(),
        }
    }
}

pub(crate) struct BuildRunner {
    pub(crate) config_path: PathBuf,
}

impl Runner for BuildRunner {
    /// Build both handler binaries and show their artifact keys
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(&self.config_path)?;
        let config = &project.config;

        println!(
            "{} {}",
            console::style("Building").green().bold(),
            BINARIES.join(", ")
        );

        let spinner = Logger::spinner("Starting cargo lambda");

        let result = artifact::build(
            &config.manifest_path(),
            &config.lambda_dir(),
            config.architecture(),
            &BINARIES,
            &spinner,
        )
        .await;

        spinner.finish_and_clear();
        result.wrap_err("Build failed")?;

        for bundle in project.bundles()? {
            println!(
                "{} {}",
                console::style(&bundle.binary_name).bold(),
                console::style(bundle.key()).dim()
            );
        }

        println!("{}", console::style("Done").green().bold());
        Ok(())
    }
}
