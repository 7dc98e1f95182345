//! Terminal styling for migration output.

use std::fmt::Display;

use console::Style;

fn mark(symbol: &str, style: Style, msg: &str) -> String {
    format!("{} {}", style.apply_to(symbol), msg)
}

pub fn success(msg: &str) -> String {
    mark("✓", Style::new().green(), msg)
}

pub fn error(msg: &str) -> String {
    mark("✗", Style::new().red(), msg)
}

pub fn warn(msg: &str) -> String {
    mark("⚠", Style::new().yellow(), msg)
}

/// Entities left alone: already migrated or not resolvable yet.
pub fn skipped(msg: &str) -> String {
    mark("↷", Style::new().cyan(), msg)
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// A source entity reference such as `story 42`.
pub fn entity(kind: impl Display, id: impl Display) -> String {
    format!("{} {}", kind, Style::new().bold().apply_to(id))
}

/// The marker migrated source entities carry, shown with a placeholder ID.
pub fn marker_hint() -> String {
    format!(
        "Migrated source entities will be renamed with a {} marker.",
        Style::new().cyan().apply_to("[Migrated:<id>]")
    )
}
