use crate::error::Error;
use crate::project::Project;
use std::error::Error as StdError;
use std::path::Path;

pub(crate) trait Runner {
    /// Project described by the config file
    fn project(&self, config_path: &Path) -> Result<Project, Error> {
        Ok(Project::from_path(config_path)?)
    }

    /// Run the command
    ///
    /// Returns an error shown to the user in case of failure
    async fn run(&mut self) -> Result<(), Error>;

    /// Construct an error shown to the user
    fn error(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<Box<dyn StdError>>,
    ) -> Error {
        if let Some(origin) = origin {
            log::error!("{origin:?}");
        }

        if let Some(title) = title {
            Error::new(title, description)
        } else {
            Error::new(
                "Failed to run the command",
                Some("Run again with RUST_LOG=debug for details."),
            )
        }
    }
}

/// Return a runner for a command
pub(crate) trait Runnable {
    fn runner(&self, config_path: &Path) -> impl Runner;
}
