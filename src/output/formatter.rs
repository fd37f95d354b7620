//! Output formatting

use std::collections::BTreeMap;

use serde::Serialize;

use crate::output::human::format_human;
use crate::output::json::format_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Everything `inspect` reveals about a vessel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub id: i64,
    pub full_name: String,
    pub full_name_with_id: String,
    pub owner: String,
    pub rating: u8,
    pub paradox: bool,
    pub depth: usize,
    /// Full name of the stem
    pub stem: String,
    /// Display form of the stem
    pub stem_vessel: String,
    pub note: String,
    pub program: String,
    pub flags: BTreeMap<String, bool>,
    pub siblings: Vec<String>,
    pub children: Vec<String>,
    pub visible: Vec<String>,
    pub forum: Vec<String>,
}

/// Structured results of informational commands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Inspect(InspectReport),
    Listing { heading: String, vessels: Vec<String> },
}

pub fn format_output(report: &Report, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(report),
        OutputFormat::Json => format_json(report),
    }
}
