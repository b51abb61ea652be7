//! Output rendering for the skillgen CLI.

use skill_core::checks::Finding;
use skill_core::{CheckReport, Generated};

/// Print the summary of a generation run.
pub fn print_generated(generated: &Generated) {
    println!("Skill saved as {}", generated.output.display());
    println!("  Records:  {}", generated.records);
    println!("  Intents:  {}", generated.intents);
    println!("  Entities: {}", generated.entities);
    println!("  Nodes:    {}", generated.nodes);
    if !generated.report.findings.is_empty() {
        println!();
        print_check_report(&generated.report);
    }
}

/// Print the findings of a structural check.
pub fn print_check_report(report: &CheckReport) {
    let errors: Vec<&Finding> = report.errors().collect();
    let warnings: Vec<&Finding> = report.warnings().collect();

    if report.findings.is_empty() {
        println!("Checks passed ({} nodes).", report.nodes);
        return;
    }

    println!("{:<20}  {}", "CHECK", "DETAIL");
    println!("{}", "-".repeat(90));
    for finding in errors.iter().chain(&warnings) {
        println!("{:<20}  {}", finding.kind.as_str(), truncate(&finding.message, 68));
    }

    println!();
    println!(
        "{} node(s), {} error(s), {} warning(s)",
        report.nodes,
        errors.len(),
        warnings.len()
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}
