//! UI utilities for pretty printing

use colored::Colorize;
use confpush_core::{PushConfig, PushEvent, PushOutcome};

use crate::scenario::Scenario;

pub fn print_banner(scenario: Scenario, config: &PushConfig) {
    println!("{}", "=".repeat(60).bright_blue());
    println!("{}", format!("  {}", confpush_core::version_string()).bright_cyan().bold());
    println!("{}", "=".repeat(60).bright_blue());
    println!("  {:<28} {:?}", "Scenario:".bright_green(), scenario);
    println!("  {:<28} {}ms", "Capability wait:".bright_green(), config.max_wait_for_capabilities_ms);
    println!("  {:<28} {}ms", "Conflict timeout:".bright_green(), config.conflicting_version_timeout_ms);
    println!();
}

pub fn print_event(event: &PushEvent) {
    match event {
        PushEvent::Completed { position, outcome, stats } => {
            let label = format!("snapshot #{}", position);
            match outcome {
                PushOutcome::Success(reply) => println!(
                    "{} {} pushed after {} attempt(s) in {}ms: {}",
                    "✓".bright_green(),
                    label,
                    stats.attempts,
                    stats.elapsed.as_millis(),
                    reply
                ),
                PushOutcome::Failed(err) => println!(
                    "{} {} failed after {} attempt(s): {}",
                    "✗".bright_red(),
                    label,
                    stats.attempts,
                    err
                ),
                PushOutcome::Cancelled => println!("{} {} abandoned on shutdown", "-".yellow(), label),
            }
        }
        PushEvent::Halted { position, skipped } => println!(
            "{} halted at snapshot #{}; skipped {:?}",
            "⚠".yellow(),
            position,
            skipped
        ),
    }
}

pub fn print_summary(reports: &[String]) {
    println!();
    if reports.is_empty() {
        println!("{}", "No failures reported".bright_green().bold());
        return;
    }
    println!("{}", "Reported failures:".bright_red().bold());
    for message in reports {
        println!("  {}", message);
    }
}
