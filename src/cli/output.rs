/// Standard output utilities for consistent command formatting
use crate::harness::HarnessSummary;
use busprobe_core::{BusReport, StorageOutcome, StorageReport};
use colored::*;

/// Display a section header with optional underline
pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
}

pub fn section_header_with_line(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "─".repeat(title.len()).dimmed());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Display an info message
pub fn info(message: &str) {
    println!("{} {}", "●".blue(), message);
}

/// Display a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Display an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Display a process/action message
pub fn action(message: &str) {
    println!("{} {}", "▶".cyan(), message);
}

/// Tree structure item
pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    if let Some(val) = value {
        println!("{} {}: {}", prefix.dimmed(), label, val);
    } else {
        println!("{} {}", prefix.dimmed(), label);
    }
}

/// Tree section with nested items
pub fn tree_section(title: &str, items: Vec<(&str, String)>, is_last: bool) {
    tree_item(is_last, title, None);
    let continuation = if is_last { "   " } else { "│  " };

    for (i, (label, value)) in items.iter().enumerate() {
        let is_last_item = i == items.len() - 1;
        let prefix = if is_last_item { "└─" } else { "├─" };
        println!(
            "{}{} {}: {}",
            continuation.dimmed(),
            prefix.dimmed(),
            label,
            value
        );
    }
}

/// Format bytes with appropriate unit
pub fn format_size(bytes: u64) -> String {
    use humansize::{format_size as hs_format, BINARY};
    hs_format(bytes, BINARY)
}

/// Format a number with thousands separator
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

fn bus_items(report: &BusReport) -> Vec<(&'static str, String)> {
    vec![
        ("Passes", format_number(report.passes)),
        ("Arena", format_size(report.arena_size as u64)),
        ("Traffic", format_size(report.bytes_filled())),
        (
            "Last fill",
            report
                .last_fill
                .map(|b| format!("0x{:02X}", b))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

fn storage_items(report: &StorageReport) -> Vec<(&'static str, String)> {
    let stats = &report.stats;
    vec![
        ("Outcome", report.outcome.label().to_string()),
        ("Iterations", format_number(stats.iterations)),
        ("Verified", format_size(stats.bytes_verified())),
        ("Written", format_size(stats.bytes_written())),
        ("Flushes", format_number(stats.flushes)),
        (
            "Transient failures",
            format!(
                "{} (write {}, seek {}, read {}, flush {})",
                stats.transient_failures(),
                stats.write_failures,
                stats.seek_failures,
                stats.read_failures,
                stats.flush_failures
            ),
        ),
    ]
}

pub fn print_bus_report(report: &BusReport) {
    section_header_with_line("Bus Saturation");
    tree_section("Arena", bus_items(report), true);
}

pub fn print_storage_report(report: &StorageReport) {
    section_header_with_line("Storage Integrity");
    tree_section("Run", storage_items(report), true);
    print_outcome(&report.outcome);
}

pub fn print_summary(summary: &HarnessSummary) {
    section_header_with_line("Stress Test Summary");
    tree_item(false, "Seed", Some(&summary.seed.to_string()));
    tree_item(false, "Elapsed", Some(&format!("{} ms", summary.elapsed_ms)));
    tree_section("Bus saturation", bus_items(&summary.bus), false);
    tree_section("Storage integrity", storage_items(&summary.storage), true);
    println!();
    print_outcome(&summary.storage.outcome);
}

fn print_outcome(outcome: &StorageOutcome) {
    match outcome {
        StorageOutcome::CompletedFully => success("All blocks verified"),
        StorageOutcome::Stopped => info("Stopped before the iteration budget ran out"),
        StorageOutcome::StoppedOnMismatch(violation) => {
            error(&format!("Data corruption detected: {}", violation))
        }
        StorageOutcome::OpenFailed { reason } => error(&format!("Could not open file: {}", reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(262144), "262,144");
        assert_eq!(format_number(1_000_000), "1,000,000");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1024), "1 KiB");
        assert_eq!(format_size(256 * 1024), "256 KiB");
    }

    #[test]
    fn test_bus_items_without_passes() {
        let items = bus_items(&BusReport {
            passes: 0,
            arena_size: 1024,
            last_fill: None,
        });
        assert_eq!(items[3].1, "-");
    }
}
