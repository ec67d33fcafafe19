//! Terminal rendering of pipeline results.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use ptr_model::{
    BatchStatus, GateStatus, Resolution, ResolvedColumnMap, Severity, ValidationVerdict,
};

use crate::commands::{RunOutcome, canonical_fields};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn status_cell(status: GateStatus) -> Cell {
    match status {
        GateStatus::Blocked => Cell::new("BLOCKED").fg(Color::Red),
        GateStatus::PassedWithWarnings => Cell::new("PASSED WITH WARNINGS").fg(Color::Yellow),
        GateStatus::Passed => Cell::new("PASSED").fg(Color::Green),
    }
    .add_attribute(Attribute::Bold)
}

pub fn print_run_summary(outcome: &RunOutcome) {
    println!("Run: {}", outcome.run.id);
    println!(
        "Staged: {} rows ({} with recorded errors, {} cell errors)",
        outcome.stage.staged_rows, outcome.stage.error_rows, outcome.stage.cell_errors
    );
    if !outcome.stage.unresolved.is_empty() {
        let names: Vec<&str> = outcome
            .stage
            .unresolved
            .iter()
            .map(|field| field.as_str())
            .collect();
        println!("Unresolved fields: {}", names.join(", "));
    }
    if let Some(rules) = &outcome.rules {
        println!(
            "Rules: {} rows visited, {} excluded",
            rules.rows, rules.excluded_rows
        );
    }
    if let Some(batch) = &outcome.batch {
        let status = match batch.status {
            BatchStatus::Applied => "applied",
            BatchStatus::AppliedWithWarnings => "applied with warnings",
            BatchStatus::Blocked => "blocked",
        };
        println!(
            "Classification: batch {} {status} ({} rows, {} usable)",
            batch.id, batch.total_rows, batch.valid_rows
        );
    }
    println!();
    print_verdict(&outcome.verdict);
}

pub fn print_verdict(verdict: &ValidationVerdict) {
    let mut status = Table::new();
    apply_table_style(&mut status);
    status.set_header(vec![
        header_cell("Verdict"),
        header_cell("Scanned"),
        header_cell("Excluded"),
        header_cell("Blockers"),
        header_cell("Warnings"),
    ]);
    let (total_blockers, total_warnings) = severity_totals(verdict);
    status.add_row(vec![
        status_cell(verdict.status),
        Cell::new(verdict.counts.scanned_rows).set_alignment(CellAlignment::Right),
        Cell::new(verdict.counts.excluded_rows).set_alignment(CellAlignment::Right),
        Cell::new(total_blockers)
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right),
        Cell::new(total_warnings)
            .fg(Color::Yellow)
            .set_alignment(CellAlignment::Right),
    ]);
    println!("{status}");

    if verdict.blockers.is_empty() && verdict.warnings.is_empty() {
        return;
    }
    let mut findings = Table::new();
    apply_table_style(&mut findings);
    findings.set_header(vec![
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Row"),
        header_cell("Message"),
    ]);
    for finding in &verdict.blockers {
        findings.add_row(vec![
            Cell::new("blocker").fg(Color::Red),
            Cell::new(finding.code.as_str()),
            row_cell(finding.row.map(|row| row.as_u64())),
            Cell::new(&finding.message),
        ]);
    }
    for finding in &verdict.warnings {
        findings.add_row(vec![
            Cell::new("warning").fg(Color::Yellow),
            Cell::new(finding.code.as_str()),
            row_cell(finding.row.map(|row| row.as_u64())),
            Cell::new(&finding.message),
        ]);
    }
    println!("{findings}");

    let itemized = verdict.blockers.len() as u64 + verdict.warnings.len() as u64;
    let total = total_blockers + total_warnings;
    if total > itemized {
        println!("({} further findings not itemized)", total - itemized);
    }
}

fn severity_totals(verdict: &ValidationVerdict) -> (u64, u64) {
    let mut blockers = 0;
    let mut warnings = 0;
    for (code, count) in &verdict.counts.by_code {
        match code.severity() {
            Severity::Blocker => blockers += count,
            Severity::Warning => warnings += count,
        }
    }
    (blockers, warnings)
}

fn row_cell(row: Option<u64>) -> Cell {
    match row {
        Some(number) => Cell::new(number).set_alignment(CellAlignment::Right),
        None => Cell::new("-").set_alignment(CellAlignment::Center),
    }
}

pub fn print_resolution(resolved: &ResolvedColumnMap) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Source header"),
        header_cell("Resolves to"),
        header_cell("Type"),
    ]);
    for header in &resolved.headers {
        let Some(resolution) = resolved.columns.get(header) else {
            continue;
        };
        match resolution {
            Resolution::Canonical {
                field,
                value_type,
                format,
            } => {
                let rendered = match format {
                    Some(format) => format!("{value_type} ({format})"),
                    None => value_type.to_string(),
                };
                table.add_row(vec![
                    Cell::new(header),
                    Cell::new(field.as_str()).fg(Color::Green),
                    Cell::new(rendered),
                ]);
            }
            Resolution::Passthrough { alias } => {
                let name = alias.as_deref().unwrap_or(header.as_str());
                table.add_row(vec![
                    Cell::new(header),
                    Cell::new(format!("passthrough \"{name}\"")),
                    Cell::new("text"),
                ]);
            }
        }
    }
    println!("{table}");

    for (field, value) in &resolved.defaults {
        println!("default: {} = {}", field.as_str(), value.render());
    }
    if !resolved.unresolved.is_empty() {
        let names: Vec<&str> = resolved
            .unresolved
            .iter()
            .map(|field| field.as_str())
            .collect();
        println!("unresolved: {}", names.join(", "));
    }
}

pub fn print_fields() {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![header_cell("Field"), header_cell("Type")]);
    for field in canonical_fields() {
        table.add_row(vec![
            Cell::new(field.as_str()),
            Cell::new(field.default_value_type().to_string()),
        ]);
    }
    println!("{table}");
}
