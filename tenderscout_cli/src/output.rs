//! Table and JSON rendering for command output.

use crate::cli::CliError;
use comfy_table::Table;
use owo_colors::OwoColorize;
use tenderscout_core::model::{CanonicalTenderRecord, TenderStatus};
use tenderscout_core::saved::SavedSearch;
use tenderscout_core::{AggregatedResult, SourceRegistry};

fn format_deadline(record: &CanonicalTenderRecord) -> String {
    record
        .deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_value(record: &CanonicalTenderRecord) -> String {
    match (record.value, record.currency.as_deref()) {
        (Some(value), Some(currency)) => format!("{:.0} {}", value, currency),
        (Some(value), None) => format!("{:.0}", value),
        _ => "-".to_string(),
    }
}

fn format_status(status: TenderStatus) -> &'static str {
    match status {
        TenderStatus::Open => "open",
        TenderStatus::Closed => "closed",
        TenderStatus::Awarded => "awarded",
    }
}

pub fn render_result(result: &AggregatedResult, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.records.is_empty() {
        println!("no results");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            "deadline", "title", "buyer", "country", "value", "status", "source",
        ]);
        for record in &result.records {
            table.add_row(vec![
                format_deadline(record),
                record.title.clone(),
                record.buyer.clone(),
                record.country.clone(),
                format_value(record),
                format_status(record.status).to_string(),
                record.source.clone(),
            ]);
        }
        println!("{table}");
    }

    println!(
        "{} of {} result(s) in {}ms",
        result.records.len(),
        result.total,
        result.duration_ms
    );

    let mut ids: Vec<_> = result.sources.keys().collect();
    ids.sort();
    for id in ids {
        let outcome = &result.sources[id];
        if outcome.is_success() {
            let timing = outcome
                .duration_ms
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default();
            println!(
                "  {} {}: {} record(s){}",
                "ok".green(),
                id,
                outcome.records,
                timing
            );
        } else if outcome.available {
            println!(
                "  {} {}: {}",
                "failed".red(),
                id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        } else {
            println!(
                "  {} {}: {}",
                "unavailable".dimmed(),
                id,
                outcome.error.as_deref().unwrap_or("not configured")
            );
        }
    }

    Ok(())
}

pub fn render_sources(registry: &SourceRegistry, json: bool) -> Result<(), CliError> {
    let descriptors = registry.list_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "id",
        "name",
        "enabled",
        "credential",
        "rate/min",
        "timeout",
    ]);
    for descriptor in descriptors {
        table.add_row(vec![
            descriptor.id.clone(),
            descriptor.display_name.clone(),
            descriptor.enabled.to_string(),
            if descriptor.requires_credential {
                "required".to_string()
            } else {
                "-".to_string()
            },
            descriptor.rate_limit_per_minute.to_string(),
            format!("{}ms", descriptor.call_timeout().as_millis()),
        ]);
    }
    println!("{table}");

    Ok(())
}

pub fn render_saved(entries: &[SavedSearch], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("no saved searches");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["id", "name", "query", "notify", "created", "last used"]);
    for entry in entries {
        table.add_row(vec![
            entry.id.to_string(),
            entry.name.clone(),
            entry.query.text.clone().unwrap_or_else(|| "-".to_string()),
            entry.notify.to_string(),
            entry.created_at.format("%Y-%m-%d").to_string(),
            entry
                .last_used
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "never".to_string()),
        ]);
    }
    println!("{table}");

    Ok(())
}
