//! Tables printed after a command finishes.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use trackmigrate_core::identity::{ResourceMap, ResourceMaps};
use trackmigrate_core::migration::MigrationSummary;

use crate::style;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Print per-kind counts, then follow-up failures and failures.
pub fn print_summary(summary: &MigrationSummary) {
    println!();
    println!("{}", style::header("Migration summary"));
    println!();

    let mut table = new_table(vec!["Entity", "Created", "Skipped"]);
    for (kind, created, skipped) in [
        ("Iterations", summary.iterations_created, summary.iterations_skipped),
        ("Labels", summary.labels_created, summary.labels_skipped),
        ("Milestones", summary.milestones_created, summary.milestones_skipped),
        ("Epics", summary.epics_created, summary.epics_skipped),
        ("Epic comments", summary.epic_comments_created, 0),
        ("Stories", summary.stories_created, summary.stories_skipped),
        ("Story links", summary.links_created, summary.links_existing + summary.links_skipped),
    ] {
        table.add_row(vec![Cell::new(kind), Cell::new(created), Cell::new(skipped)]);
    }
    println!("{}", table);

    if summary.files_linked + summary.files_failed > 0 {
        println!(
            "  Files linked: {}, failed: {}",
            summary.files_linked, summary.files_failed
        );
    }
    if summary.links_skipped > 0 {
        println!(
            "  {}",
            style::skipped(&format!(
                "{} story link(s) skipped: an endpoint is not migrated yet",
                summary.links_skipped
            ))
        );
    }
    if !summary.follow_up_failures.is_empty() {
        println!();
        println!(
            "{}",
            style::warn("Imported, but a later step failed (re-running may duplicate these):")
        );
        for failure in &summary.follow_up_failures {
            println!(
                "  {}: {}",
                style::entity(failure.kind, &failure.source_id),
                failure.message
            );
        }
    }

    if summary.failures.is_empty() {
        println!(
            "{}",
            style::success(&format!("{} entities processed", summary.processed()))
        );
        println!();
        return;
    }

    println!();
    println!(
        "{}",
        style::error(&format!("{} failure(s)", summary.failures.len()))
    );
    let mut failures = new_table(vec!["Kind", "Source ID", "Error"]);
    for failure in &summary.failures {
        failures.add_row(vec![
            Cell::new(failure.kind),
            Cell::new(&failure.source_id),
            Cell::new(&failure.message).fg(Color::Red),
        ]);
    }
    println!("{}", failures);
    println!();
}

/// Print every `source -> target` pair of the three resource maps.
pub fn print_maps(maps: &ResourceMaps) {
    println!();
    println!("{}", style::header("Resource maps"));
    println!();

    let mut table = new_table(vec!["Map", "Source ID", "Target ID"]);
    for (name, map) in [
        ("members", &maps.members),
        ("iterations", &maps.iterations),
        ("workflow states", &maps.workflow_states),
    ] {
        for (from, to) in sorted(map) {
            table.add_row(vec![Cell::new(name), Cell::new(from), Cell::new(to)]);
        }
    }
    println!("{}", table);
    println!(
        "  members: {}, iterations: {}, workflow states: {}",
        maps.members.len(),
        maps.iterations.len(),
        maps.workflow_states.len()
    );
    println!();
}

fn sorted(map: &ResourceMap) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = map.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
