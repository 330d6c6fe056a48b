//! Plain-text display surface for the terminal.

use labtrack_core::{
    time, DisplaySurface, ProgressView, ShellNotice, StepStatus, ValidationFeedback,
};
use labtrack_progress::AnalyticsSummary;

const BAR_WIDTH: usize = 30;

/// Prints tracker notifications to stdout, warnings to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDisplay;

fn bar(rate: f64) -> String {
    let filled = ((rate / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn elapsed(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m {:02}s", minutes, duration.num_seconds() % 60)
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DisplaySurface for TerminalDisplay {
    fn show_progress(&self, view: &ProgressView, detailed: bool) {
        let resumed = if view.resumed { " (resumed)" } else { "" };
        println!("📚 {}{}", view.lab_name, resumed);
        println!(
            "{} {:.1}% ({}/{} steps)",
            bar(view.completion_rate),
            view.completion_rate,
            view.completed,
            view.total
        );
        if let Some(avg) = view.average_score {
            println!("Average score: {avg:.1}");
        }

        for step in &view.steps {
            let icon = match step.status {
                StepStatus::Completed => "✅",
                StepStatus::InProgress(_) => "🔄",
                StepStatus::Pending => "⏳",
            };
            println!("  {icon} {} - {}", step.name, step.status.label());
            if !detailed {
                continue;
            }
            if let Some(ts) = &step.timestamp {
                println!("      completed: {}", time::format_timestamp(ts));
            }
            if let Some(score) = step.score {
                println!("      score: {score}/100");
            }
            if step.attempts > 0 {
                println!("      attempts: {}", step.attempts);
            }
            if !step.notes.is_empty() {
                println!("      notes: {}", step.notes);
            }
        }
        println!("Elapsed: {}", elapsed(view.elapsed));
    }

    fn show_warning(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }

    fn show_info(&self, title: &str, message: &str) {
        println!("ℹ️  {title}");
        println!("{}", indent(message));
    }

    fn show_validation(&self, feedback: &ValidationFeedback) {
        let icon = if feedback.success { "✅" } else { "❌" };
        println!("{icon} {}", feedback.message);
        if !feedback.details.is_empty() {
            println!("    {}", feedback.details);
        }
    }

    fn show_shell(&self, notice: &ShellNotice) {
        match notice {
            ShellNotice::Started {
                step,
                command,
                working_dir,
            } => {
                println!("🖥️  {step}");
                println!("$ {command}");
                println!("  (in {working_dir})");
            }
            ShellNotice::Finished {
                returncode,
                stdout,
                stderr,
                execution_time,
                success,
                expected_output,
                ..
            } => {
                if !stdout.is_empty() {
                    println!("{}", indent(stdout.trim_end()));
                }
                if !stderr.is_empty() {
                    eprintln!("{}", indent(stderr.trim_end()));
                }
                let icon = if *success { "✅ SUCCESS" } else { "❌ FAILED" };
                println!("{icon} (exit {returncode}, {execution_time:.2}s)");
                if let (Some(expected), false) = (expected_output, *success) {
                    println!("    expected output containing: {expected}");
                }
            }
            ShellNotice::TimedOut { command, timeout } => {
                eprintln!("⏰ Command timed out after {timeout}s: {command}");
            }
            ShellNotice::Failed { command, error } => {
                eprintln!("💥 Could not run {command}: {error}");
            }
            ShellNotice::SequenceStarted {
                step,
                count,
                stop_on_error,
            } => {
                let stop = if *stop_on_error { "Yes" } else { "No" };
                println!("🔄 Shell Command Sequence: {step}");
                println!("Executing {count} commands | Stop on error: {stop}");
            }
            ShellNotice::SequenceFinished {
                succeeded,
                total,
                success,
            } => {
                let text = if *success {
                    "✅ SEQUENCE COMPLETED"
                } else {
                    "❌ SEQUENCE FAILED"
                };
                println!("{text} - Success: {succeeded}/{total}");
            }
        }
    }
}

/// Print the analytics summary as metric, event-type and step tables.
pub fn print_analytics(summary: &AnalyticsSummary) {
    let duration = summary
        .session_duration
        .map(|s| format!("{:.1} min", s / 60.0))
        .unwrap_or_else(|| "N/A".to_string());
    let average = summary
        .average_score
        .map(|s| format!("{s:.1}"))
        .unwrap_or_else(|| "N/A".to_string());

    println!("📊 Analytics");
    println!("{:<20} {}", "Metric", "Value");
    for (metric, value) in [
        ("Total Events", summary.total_events.to_string()),
        ("Session Duration", duration),
        (
            "Steps Completed",
            format!("{}/{}", summary.steps_completed, summary.total_steps),
        ),
        ("Completion Rate", format!("{:.1}%", summary.completion_rate)),
        ("Average Score", average),
        ("Total Attempts", summary.total_attempts.to_string()),
    ] {
        println!("{metric:<20} {value}");
    }

    if !summary.event_types.is_empty() {
        println!();
        println!("{:<20} {}", "Event Type", "Count");
        for (kind, count) in &summary.event_types {
            println!("{kind:<20} {count}");
        }
    }

    println!();
    println!(
        "{:<24} {:<10} {:>8} {:>8} {:>8}",
        "Step", "Status", "Attempts", "Score", "Time"
    );
    for step in &summary.step_analytics {
        let status = if step.completed { "✅" } else { "⏳" };
        let score = step
            .score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let spent = step
            .time_spent
            .map(|s| format!("{:.1}m", s / 60.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<10} {:>8} {:>8} {:>8}",
            step.step_name, status, step.attempts, score, spent
        );
    }
}
