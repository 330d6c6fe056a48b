//! labtrack CLI - track lab progress from the terminal.

mod terminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use labtrack_core::NullDisplay;
use labtrack_progress::{LabProgress, SequenceOptions, ShellStepOptions};
use labtrack_storage::default_persist_file;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use terminal::{print_analytics, TerminalDisplay};

#[derive(Parser)]
#[command(name = "labtrack")]
#[command(about = "Lab progress tracker", long_about = None)]
struct Cli {
    /// Progress file
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Lab name, used to find the default progress file
    #[arg(long, global = true)]
    lab: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a lab
    Init {
        /// Step names in order
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Mark a step completed
    Done {
        /// Step name
        step: String,
        /// Score (0-100)
        #[arg(long)]
        score: Option<f64>,
        /// Notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Record partial progress on a step
    Partial {
        /// Step name
        step: String,
        /// Progress between 0 and 1
        progress: f64,
        /// Notes
        #[arg(long, default_value = "")]
        notes: String,
        /// Checkpoint name
        #[arg(long)]
        checkpoint: Option<String>,
    },
    /// Count an attempt on a step
    Attempt {
        /// Step name
        step: String,
    },
    /// Reset one step, or all of them
    Reset {
        /// Step name
        step: Option<String>,
    },
    /// Show progress
    Status {
        /// Include timestamps, scores and notes
        #[arg(long)]
        detailed: bool,
    },
    /// Print the text report
    Report,
    /// Show the analytics summary
    Summary,
    /// Export analytics as CSV
    ExportCsv {
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export analytics as JSON
    ExportJson {
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a shell command for a step
    Shell {
        /// Step name
        step: String,
        /// Command line
        command: String,
        /// Text stdout must contain
        #[arg(long)]
        expect: Option<String>,
        /// Timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Run shell commands in order for a step
    Sequence {
        /// Step name
        step: String,
        /// Command lines
        #[arg(required = true)]
        commands: Vec<String>,
        /// Keep going after a failing command
        #[arg(long)]
        keep_going: bool,
        /// Timeout per command in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Show tips for a step, or the current one
    Tips {
        /// Step name
        step: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { steps } = &cli.command {
        let lab = cli.lab.clone().unwrap_or_else(|| "Lab".to_string());
        let file = cli.file.clone().unwrap_or_else(|| default_persist_file(&lab));
        let progress = LabProgress::builder()
            .lab_name(&lab)
            .steps(steps.iter().cloned())
            .persist(true)
            .persist_file(&file)
            .display(Arc::new(TerminalDisplay))
            .open()
            .await?;
        progress.save().await?;
        info!(
            "Tracking {} ({} steps) in {}",
            progress.lab_name(),
            progress.steps().len(),
            progress.persist_file().display()
        );
        return Ok(());
    }

    let mut progress = LabProgress::builder()
        .display(Arc::new(NullDisplay))
        .resume(cli.lab.as_deref(), cli.file.as_deref())
        .await?;
    progress.set_display(Arc::new(TerminalDisplay));

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Done { step, score, notes } => {
            progress.mark_done(&step, score, &notes).await?;
        }
        Commands::Partial {
            step,
            progress: value,
            notes,
            checkpoint,
        } => {
            progress
                .mark_partial(&step, value, &notes, checkpoint.as_deref())
                .await?;
        }
        Commands::Attempt { step } => {
            progress.increment_attempts(&step).await?;
            if let Some(state) = progress.step(&step) {
                println!("{}: {} attempts", step, state.attempts);
            }
        }
        Commands::Reset { step } => match step {
            Some(step) => progress.reset_step(&step).await?,
            None => progress.reset_all().await?,
        },
        Commands::Status { detailed } => {
            progress.display_progress(detailed);
        }
        Commands::Report => {
            print!("{}", progress.export_report());
        }
        Commands::Summary => match progress.get_analytics_summary() {
            Some(summary) => print_analytics(&summary),
            None => println!("No analytics data available yet."),
        },
        Commands::ExportCsv { out } => {
            let path = progress.export_analytics_csv(out.as_deref()).await?;
            println!("{}", path.display());
        }
        Commands::ExportJson { out } => {
            let path = progress.export_analytics_json(out.as_deref()).await?;
            println!("{}", path.display());
        }
        Commands::Shell {
            step,
            command,
            expect,
            timeout,
            cwd,
        } => {
            let options = ShellStepOptions {
                expected_output: expect,
                timeout: Duration::from_secs(timeout),
                working_dir: cwd,
                auto_mark_complete: true,
            };
            let ok = progress.run_shell_step(&step, &command, &options).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Sequence {
            step,
            commands,
            keep_going,
            timeout,
            cwd,
        } => {
            let options = SequenceOptions {
                working_dir: cwd,
                stop_on_error: !keep_going,
                timeout_per_command: Duration::from_secs(timeout),
            };
            let ok = progress.run_shell_sequence(&step, &commands, &options).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Tips { step } => {
            progress.show_step_tips(step.as_deref());
        }
    }

    Ok(())
}
