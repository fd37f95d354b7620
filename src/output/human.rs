//! Human-readable output formatting

use crate::output::formatter::{InspectReport, Report};

pub fn format_human(report: &Report) -> String {
    match report {
        Report::Inspect(info) => format_inspect(info),
        Report::Listing { heading, vessels } => {
            if vessels.is_empty() {
                return "You can see nothing".to_string();
            }
            let mut output = heading.clone();
            for vessel in vessels {
                output.push_str(&format!("\n - {}", vessel));
            }
            output
        }
    }
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn section(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("{}:\n", title));
    for item in items {
        output.push_str(&format!(" - {}\n", item));
    }
}

fn format_inspect(info: &InspectReport) -> String {
    let title = format!("The {}", info.full_name_with_id);
    let rule = "=".repeat(title.chars().count());
    let mut output = format!("\n{}\n{}\n", title, rule);

    output.push_str(&format!(
        "The {} is owned by the {}, has a rating of {}",
        info.full_name, info.owner, info.rating
    ));
    if info.paradox {
        output.push_str(" and is a paradox\n");
    } else {
        output.push_str(&format!(
            " and is currently {} levels deep within the {} paradox\n",
            info.depth, info.stem
        ));
        output.push_str(&format!("Stem: {}\n", info.stem_vessel));
    }
    if !info.note.is_empty() {
        output.push_str(&format!("Note: {:?}\n", info.note));
    }
    if !info.program.is_empty() {
        output.push_str(&format!("Program: {:?}\n", info.program));
    }
    output.push_str("Flags:\n");
    for (flag, value) in &info.flags {
        output.push_str(&format!(" - {}: {}\n", flag, python_bool(*value)));
    }
    section(&mut output, "Siblings", &info.siblings);
    section(&mut output, "Children", &info.children);
    section(&mut output, "Visible", &info.visible);
    section(&mut output, "Forum", &info.forum);
    output.push_str(&rule);
    output.push('\n');
    output
}
