//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to the command handlers.

use crate::commands::{self, ViewOptions};
use crate::config::get_config_path;
use crate::logging;
use crate::setup;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

/// A terminal waveform visualizer for live audio input
#[derive(Parser)]
#[command(name = "pcmviz")]
#[command(version)]
#[command(about = "Live PCM waveform visualizer with amplitude banding")]
#[command(long_about = "Live PCM waveform visualizer with amplitude banding.\n\nCaptures mono audio through ffmpeg, keeps the last few seconds in memory and\ndraws them as a scrolling waveform. Samples above the warning and critical\nthresholds are highlighted.\n\nDEFAULT COMMAND:\n    If no command is specified, 'view' is used by default.\n\nKEYS:\n    Space/Enter  start or stop capture\n    + / -        gain\n    ] / [        time zoom\n    Up / Down    vertical padding\n    b / c        toggle bands / cursor\n    w / g        cycle wave / background color\n    r            reset gain, zoom and padding\n    q / Esc      quit\n\nEXAMPLES:\n    $ pcmviz\n    $ pcmviz view -d :1 --sample-rate 48000\n    $ pcmviz list-devices\n    $ kill -USR1 $(pgrep pcmviz)    # start/stop capture from a hotkey")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/pcmviz/pcmviz.toml\n    Logs:               ~/.local/state/pcmviz/pcmviz.log.*"
)]
struct Cli {
    #[command(flatten)]
    view: ViewArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct ViewArgs {
    /// Capture device id (overrides the config file)
    #[arg(short, long, value_name = "ID", global = true)]
    device: Option<String>,

    /// Capture sample rate in Hz
    #[arg(long, value_name = "HZ", global = true)]
    sample_rate: Option<u32>,

    /// Seconds of audio kept on screen at zoom 1
    #[arg(long, value_name = "SECONDS", global = true)]
    buffer_seconds: Option<u32>,

    /// Frames per read from the capture stream
    #[arg(long, value_name = "FRAMES", global = true)]
    block_size: Option<usize>,

    /// Open the view without starting capture
    #[arg(long, global = true)]
    no_autostart: bool,
}

impl From<ViewArgs> for ViewOptions {
    fn from(args: ViewArgs) -> Self {
        ViewOptions {
            device: args.device,
            sample_rate: args.sample_rate,
            buffer_seconds: args.buffer_seconds,
            block_size: args.block_size,
            no_autostart: args.no_autostart,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open the live waveform view (default)
    ///
    /// Space/Enter starts and stops capture, q/Escape quits.
    #[command(visible_alias = "v")]
    View,

    /// List available audio input devices
    ///
    /// Shows the identifiers ffmpeg accepts for the configured input format,
    /// for use as `device` in pcmviz.toml or with --device.
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   pcmviz completions bash > pcmviz.bash
    ///   pcmviz completions zsh > _pcmviz
    ///   pcmviz completions fish > pcmviz.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the default config cannot be written
/// - If command execution fails
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // These print to the terminal and need neither logging nor setup.
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "pcmviz", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;
    setup::ensure_config(&get_config_path()?).map_err(|e| {
        tracing::error!("Setup failed: {e}");
        anyhow::anyhow!("Setup failed: {e}")
    })?;

    match cli.command {
        None | Some(Commands::View) => commands::handle_view(cli.view.into())?,
        Some(Commands::ListDevices) => commands::handle_list_devices()?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
