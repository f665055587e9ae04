pub(crate) mod build;
pub(crate) mod deploy;
pub(crate) mod outputs;
pub(crate) mod synth;
use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the CloudFormation template
    Synth(synth::SynthCommand),

    /// Build the handler binaries, without deployment
    Build(build::BuildCommand),

    /// Build, upload and deploy the stack
    Deploy(deploy::DeployCommand),

    /// Show the outputs of the deployed stack
    Outputs(outputs::OutputsCommand),
}

/// Values for the stack parameters given on the command line
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct ParameterArgs {
    /// Parameter value as Name=Value, overrides [parameters] of the config file. Repeatable.
    #[arg(short, long = "parameter", value_name = "NAME=VALUE")]
    pub(crate) parameters: Vec<String>,
}
