//! Human-readable output for deploy, list and rollback.

use std::io::{self, IsTerminal};

use chrono::DateTime;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use wpr_deploy::{DeployReport, ReleaseEntry, RollbackReport};

pub fn print_deploy_summary(report: &DeployReport) {
    if report.dry_run {
        println!("Dry run: nothing was written.");
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Step"), header_cell("Result")]);
    apply_table_style(&mut table);

    table.add_row(vec![
        Cell::new("Release"),
        Cell::new(report.release.to_string())
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    let id_detail = match report.id.timestamp {
        Some(ts) => format!("{} ({} via {})", report.id.value, ts, report.id.source),
        None => format!("{} ({})", report.id.value, report.id.source),
    };
    table.add_row(vec![
        Cell::new("Identifier"),
        if report.id.is_fallback() {
            Cell::new(id_detail).fg(Color::Yellow)
        } else {
            Cell::new(id_detail)
        },
    ]);
    table.add_row(vec![Cell::new("SHA256"), dim_cell(&report.archive_sha256)]);
    if !report.dry_run {
        table.add_row(vec![
            Cell::new("Extracted"),
            Cell::new(format!(
                "{} entries, {} bytes",
                report.extracted.entries, report.extracted.bytes
            )),
        ]);
        table.add_row(vec![
            Cell::new("Permissions"),
            Cell::new(format!(
                "{} dirs, {} files",
                report.permissions.dirs, report.permissions.files
            )),
        ]);
    }
    let hooks_label = if report.dry_run { "Hooks (planned)" } else { "Hooks" };
    table.add_row(vec![Cell::new(hooks_label), list_cell(&report.hooks)]);
    if let Some(stored) = &report.stored_archive {
        table.add_row(vec![
            Cell::new("Archive"),
            Cell::new(stored.display().to_string()),
        ]);
    }
    if !report.dry_run {
        let mut removed = report.pruned.removed_releases.clone();
        removed.extend(report.pruned.removed_archives.iter().cloned());
        table.add_row(vec![Cell::new("Pruned"), list_cell(&removed)]);
        table.add_row(vec![
            Cell::new("Current"),
            Cell::new(report.current_link.display().to_string()),
        ]);
    }
    println!("{table}");
}

/// Print the release history: a table on a terminal, plain lines otherwise.
pub fn print_release_history(entries: &[ReleaseEntry]) {
    let output = render_release_history(entries, io::stdout().is_terminal());
    if !output.is_empty() {
        println!("{output}");
    }
}

pub fn render_release_history(entries: &[ReleaseEntry], interactive: bool) -> String {
    if !interactive {
        return render_release_lines(entries);
    }
    if entries.is_empty() {
        return "No releases.".to_string();
    }
    release_table(entries).to_string()
}

fn release_table(entries: &[ReleaseEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Release"),
        header_cell("Modified (UTC)"),
        header_cell("Current"),
        header_cell("Archive"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Center);
    for entry in entries {
        let name = if entry.is_current {
            Cell::new(&entry.name)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&entry.name)
        };
        table.add_row(vec![
            name,
            Cell::new(format_modified(entry.modified_unix)),
            check_cell(entry.is_current),
            check_cell(entry.archive_present),
        ]);
    }
    table
}

pub fn print_rollback_summary(report: &RollbackReport) {
    println!(
        "current-release: {} -> {}",
        report.from.as_deref().unwrap_or("<none>"),
        report.to
    );
}

/// One line per release, newest first, for pipes and scripts.
fn render_release_lines(entries: &[ReleaseEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mut flags = Vec::new();
            if entry.is_current {
                flags.push("current");
            }
            flags.push(if entry.archive_present {
                "archive"
            } else {
                "no archive"
            });
            format!(
                "{}  {}  {}",
                entry.name,
                format_modified(entry.modified_unix),
                flags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_modified(unix: i64) -> String {
    DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn check_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn list_cell(items: &[String]) -> Cell {
    if items.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(items.join("\n"))
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str, modified_unix: i64, is_current: bool, archive_present: bool) -> ReleaseEntry {
        ReleaseEntry {
            name: name.to_string(),
            path: PathBuf::from("releases").join(name),
            modified_unix,
            is_current,
            archive_present,
        }
    }

    fn history() -> Vec<ReleaseEntry> {
        vec![
            entry("release-20240302-bbbbbbbb", 1_709_337_600, false, true),
            entry("release-20240301-aaaaaaaa", 1_709_251_200, true, true),
            entry("release-20240229-99999999", 1_709_164_800, false, false),
        ]
    }

    #[test]
    fn test_piped_history_is_plain_lines() {
        insta::assert_snapshot!(render_release_history(&history(), false), @r"
        release-20240302-bbbbbbbb  2024-03-02 00:00:00  archive
        release-20240301-aaaaaaaa  2024-03-01 00:00:00  current, archive
        release-20240229-99999999  2024-02-29 00:00:00  no archive
        ");
    }

    #[test]
    fn test_terminal_history_is_a_table() {
        let output = render_release_history(&history(), true);
        assert!(output.contains("Modified (UTC)"));
        assert!(output.contains("release-20240229-99999999"));
        assert!(output.contains('✓'));
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_release_history(&[], false), "");
        assert_eq!(render_release_history(&[], true), "No releases.");
    }

    #[test]
    fn test_format_modified_out_of_range() {
        assert_eq!(format_modified(i64::MAX), "-");
    }
}
