use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};
use std::fmt::Write as _;
use std::path::Path;

use crate::analyzers::revert_tracker::count_reverts;
use crate::error::Result;
use crate::store::MAX_CHANGES_THRESHOLD;
use crate::types::{HistoryRecord, HistoryReport};

/// Prints the report to stdout, or writes it uncolored to `output_file`.
pub fn report_terminal(report: &HistoryReport, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            colored::control::set_override(false);
            let text = render(report, false);
            std::fs::write(path, text)?;
            eprintln!("✓ Report written to {}", path.display());
        }
        None => {
            eprintln!();
            print!("{}", render(report, true));
        }
    }
    Ok(())
}

/// Renders the full report. `styled` controls table cell colors; text colors
/// follow the global `colored` setting.
pub fn render(report: &HistoryReport, styled: bool) -> String {
    let mut out = String::new();
    let stats = &report.statistics;

    let _ = writeln!(
        out,
        "{} {} ({} migration file{})",
        "🗂  migtrail".cyan().bold(),
        report.meta.repo_path.bright_black(),
        report.meta.file_count,
        if report.meta.file_count == 1 { "" } else { "s" },
    );
    if !report.meta.filters.is_empty() {
        let _ = writeln!(out, "   {}", format!("filters: {}", report.meta.filters.join(", ")).bright_black());
    }
    let _ = writeln!(out);

    if stats.total_migrations == 0 {
        let _ = writeln!(out, "{}", "  No migration files found with current filters.".yellow());
        let _ = writeln!(out);
        return out;
    }

    let _ = writeln!(
        out,
        "   {} changes across {} migrations ({:.1} per migration)",
        stats.total_changes.to_string().bold(),
        stats.total_migrations.to_string().bold(),
        stats.average_changes_per_migration,
    );
    let _ = writeln!(out);

    // ── Most changed migrations ────────────────────────────────────────────
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    if !styled {
        table.force_no_tty();
    }
    table.set_header(vec!["RANK", "MIGRATION", "CHANGES", "REVERTS", "FIRST SEEN", "LAST MODIFIED"]);
    for (i, record) in stats.most_changed_migrations.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("{:3}", i + 1)),
            Cell::new(truncate_path(&record.file_path, 52)),
            changes_cell(record.change_count),
            reverts_cell(record),
            Cell::new(record.first_seen.date().format("%Y-%m-%d").to_string()),
            Cell::new(record.last_modified.date().format("%Y-%m-%d").to_string()),
        ]);
    }
    let _ = writeln!(out, "{table}");

    // ── Frequency ──────────────────────────────────────────────────────────
    let freq = &report.frequency;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} {:.1}/week, {:.1}/month",
        "📈 Frequency:".cyan(),
        freq.migrations_per_week,
        freq.migrations_per_month,
    );
    for peak in &freq.peak_periods {
        let _ = writeln!(out, "    {} {}", "peak".bright_black(), peak);
    }

    // ── Problems ───────────────────────────────────────────────────────────
    if !stats.problematic_patterns.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "⚠️  Problematic migrations:".yellow());
        for p in &stats.problematic_patterns {
            let _ = writeln!(out, "    {} {}", "•".yellow(), p);
        }
    }

    if !report.patterns.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "🔁 Recurring table changes:".yellow());
        for p in &report.patterns {
            let _ = writeln!(out, "    {} {}", "•".white(), p.description);
        }
    }

    if !report.hotspots.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} {}", "🔥 Hotspots:".red(), report.hotspots.join(", "));
    }

    // ── Recommendations ────────────────────────────────────────────────────
    if !report.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "💡 Recommendations:".cyan());
        for rec in &report.recommendations {
            let _ = writeln!(out, "    {} {}", "•".white(), rec);
        }
    }

    let _ = writeln!(out);
    out
}

// ─── Cell builders ────────────────────────────────────────────────────────────

fn changes_cell(count: usize) -> Cell {
    let text = format!("{count:3}");
    if count > MAX_CHANGES_THRESHOLD {
        Cell::new(text).fg(Color::Red).add_attribute(Attribute::Bold)
    } else if count > 2 {
        Cell::new(text).fg(Color::Yellow)
    } else {
        Cell::new(text)
    }
}

fn reverts_cell(record: &HistoryRecord) -> Cell {
    match count_reverts(&record.changes) {
        0 => Cell::new("0").fg(Color::DarkGrey),
        n => Cell::new(n.to_string()).fg(Color::Red),
    }
}

fn truncate_path(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let tail: String = s.chars().rev().take(max - 1).collect::<Vec<_>>().into_iter().rev().collect();
    format!("…{tail}")
}
