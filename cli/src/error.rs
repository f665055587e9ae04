use webhook_stack::SynthError;

/// Display global error message in unified format
#[derive(Debug, Clone)]
pub struct Error(String, Option<String>);

impl Error {
    pub fn new(message: &str, details: Option<&str>) -> Self {
        Error(message.to_string(), details.map(|d| d.to_string()))
    }
}

/// Display the message and details, as sort of a hint
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\n\n{}",
            self.0,
            console::style(self.1.clone().unwrap_or("".into())).dim()
        )
    }
}

impl std::error::Error for Error {}

/// Hint for synthesis failures the user can fix in the config file
fn synth_hint(error: &SynthError) -> Option<&'static str> {
    match error {
        SynthError::UnresolvedParameter(_) => Some(
            "Set it under [parameters] in the config file or pass --parameter Name=Value.",
        ),
        SynthError::InvalidParameter { .. } => {
            Some("ConfigParameterName starts with \"/\", ConfigParameterVersion is a number.")
        }
        _ => None,
    }
}

/// Automatically convert all eyre error reports
///
/// A user facing Error used as the report's context is kept as is.
impl From<eyre::Report> for Error {
    fn from(report: eyre::Report) -> Self {
        let report = match report.downcast::<Error>() {
            Ok(error) => return error,
            Err(report) => report,
        };

        log::error!("{report:?}");

        if let Some(hint) = report.downcast_ref::<SynthError>().and_then(synth_hint) {
            return Error::new(&report.to_string(), Some(hint));
        }

        let causes = report
            .chain()
            .skip(1)
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        Error::new(
            &report.to_string(),
            (!causes.is_empty()).then_some(causes.as_str()),
        )
    }
}
