//! JSON output formatting

use crate::output::formatter::Report;

pub fn format_json(report: &Report) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_json() {
        let report = Report::Listing {
            heading: "You can see:".to_string(),
            vessels: vec!["red cat (ID: 2)".to_string()],
        };
        let value: serde_json::Value = serde_json::from_str(&format_json(&report)).unwrap();
        assert_eq!(value["kind"], "listing");
        assert_eq!(value["vessels"][0], "red cat (ID: 2)");
    }
}
