//! Output selectors shared by the list commands and the report, and the
//! HTML template helper.

use crate::error::ApiError;
use std::fmt;
use std::str::FromStr;
use tera::{Context, Tera};

/// How a list of entities is printed, one entry per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListMode {
    /// `id name`
    #[default]
    Full,
    Ids,
    Names,
    /// Full row plus a per-entity detail column (projects only).
    Verbose,
}

impl ListMode {
    /// Resolve the mutually exclusive `--quiet` / `--names` / `--verbose` flags.
    pub fn from_flags(quiet: bool, names: bool, verbose: bool) -> Self {
        if quiet {
            ListMode::Ids
        } else if names {
            ListMode::Names
        } else if verbose {
            ListMode::Verbose
        } else {
            ListMode::Full
        }
    }
}

/// Rendering format for counts and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Html,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!(
                "Invalid format: {}. Must be text, csv, or html",
                s
            )),
        }
    }
}

/// Render an embedded template. Names ending in `.html` get autoescaping.
pub fn render_template(name: &str, template: &str, context: &Context) -> Result<String, ApiError> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, template)
        .map_err(|e| ApiError::Render {
            format: "html",
            detail: e.to_string(),
        })?;
    tera.render(name, context).map_err(|e| ApiError::Render {
        format: "html",
        detail: e.to_string(),
    })
}
