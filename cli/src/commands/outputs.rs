use crate::cloudformation::Stack;
use crate::error::Error;
use crate::runner::{Runnable, Runner};
use clap::ArgAction;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(clap::Args, Clone)]
pub(crate) struct OutputsCommand {
    /// Print a JSON object instead of a table
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

impl Runnable for OutputsCommand {
    fn runner(&self, config_path: &Path) -> impl Runner {
        OutputsRunner {
            command: self.clone(),
            config_path: config_path.to_path_buf(),
        }
    }
}

struct OutputsRunner {
    command: OutputsCommand,
    config_path: PathBuf,
}

#[derive(Tabled)]
struct OutputRow<'a> {
    #[tabled(rename = "Output")]
    name: &'a str,

    #[tabled(rename = "Value")]
    value: &'a str,
}

/// Show stack outputs as a table, or as a JSON object for scripts
pub(crate) fn print_outputs(outputs: &[(String, String)], json: bool) -> eyre::Result<()> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = outputs
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
            .collect();

        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let rows = outputs.iter().map(|(name, value)| OutputRow { name, value });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

impl Runner for OutputsRunner {
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(&self.config_path)?;
        let aws_config = project.aws_config().await;
        let stack = Stack::new(&aws_config, project.config.stack_name());
        let outputs = stack.outputs().await?;

        if outputs.is_empty() {
            return Err(self.error(
                Some("The stack has no outputs"),
                Some("It may still be creating, check its status in the console."),
                None,
            ));
        }

        print_outputs(&outputs, self.command.json)?;
        Ok(())
    }
}
