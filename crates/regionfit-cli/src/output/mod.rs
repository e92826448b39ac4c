//! Output formatting module
//!
//! Results go to stdout as a table or JSON. Progress and diagnostics go to
//! stderr so `regionfit select` can be captured by a shell.

use colored::Colorize;
use regionfit_core::{EventLevel, FailureReason, SelectionOutcome};
use serde::Serialize;
use std::fmt::Display;
use tabled::{Table, Tabled};

/// Output format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use 'table' or 'json'", s)),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Print data in the specified format
pub fn print_output<T>(data: &[T], format: OutputFormat, empty: &str) -> anyhow::Result<()>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", empty);
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    }
    Ok(())
}

/// JSON shape of a selection result
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeJson<'a> {
    Accepted {
        region: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        env_file: Option<String>,
    },
    Failed {
        reason: &'static str,
        message: String,
        exit_code: i32,
    },
}

impl<'a> OutcomeJson<'a> {
    pub fn new(outcome: &'a SelectionOutcome, env_file: Option<String>) -> Self {
        match outcome {
            SelectionOutcome::Accepted(region) => OutcomeJson::Accepted { region, env_file },
            SelectionOutcome::Failed(reason) => OutcomeJson::failed(reason),
        }
    }

    fn failed(reason: &FailureReason) -> Self {
        OutcomeJson::Failed {
            reason: reason.code(),
            message: reason.to_string(),
            exit_code: reason.exit_code(),
        }
    }
}

/// Print the final result of a selection run
///
/// In table mode only the accepted region reaches stdout; failures were
/// already reported as events on stderr.
pub fn print_outcome(outcome: &SelectionOutcome, env_file: Option<String>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if let SelectionOutcome::Accepted(region) = outcome {
                println!("{}", region);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&OutcomeJson::new(outcome, env_file))?);
        }
    }
    Ok(())
}

/// Print a diagnostic line, coloured by level (respects quiet mode for
/// everything but errors)
pub fn print_event(level: EventLevel, message: &str, quiet: bool) {
    match level {
        EventLevel::Error => eprintln!("{}", message.red()),
        _ if quiet => {}
        EventLevel::Warning => eprintln!("{}", message.yellow()),
        EventLevel::Success => eprintln!("{}", message.green()),
        EventLevel::Info => eprintln!("{}", message),
    }
}

/// Print a success message (respects quiet mode)
pub fn print_success(message: &str, quiet: bool) {
    print_event(EventLevel::Success, message, quiet);
}

/// Print an error message
pub fn print_error(message: &str) {
    print_event(EventLevel::Error, message, false);
}

/// Print an info message (respects quiet mode)
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_outcome_json_shapes() {
        let accepted = SelectionOutcome::Accepted("westus3".into());
        let json = serde_json::to_value(OutcomeJson::new(&accepted, None)).unwrap();
        assert_eq!(json["outcome"], "accepted");
        assert_eq!(json["region"], "westus3");
        assert!(json.get("env_file").is_none());

        let failed = SelectionOutcome::Failed(FailureReason::NoRegionMeetsCapacity);
        let json = serde_json::to_value(OutcomeJson::new(&failed, None)).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "no_region_meets_capacity");
        assert_eq!(json["exit_code"], 3);
    }
}
