//! gctrace-bridge CLI
//!
//! Runs a Go program with GC tracing enabled and streams the
//! garbage-collector and scavenger lines it prints as JSON events.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;

use gctrace_bridge::bridge::Stream;
use gctrace_bridge::commands::utils::{display_patterns, display_version};
use gctrace_bridge::commands::{
    execute_parse, execute_run, summary_line, OutputTarget, ParseArgs, RunArgs,
};
use gctrace_bridge::parser::{FormatSelector, GcFormat};
use gctrace_bridge::utils::config::GO_VERSION_ENV;

/// gctrace-bridge - live GC trace events from a child process
#[derive(Parser, Debug)]
#[command(name = "gctrace-bridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program and stream its GC trace
    Run {
        /// Child stream carrying the trace (Go writes it to stderr)
        #[arg(short, long, value_enum, default_value = "stderr")]
        stream: StreamArg,

        #[command(flatten)]
        format: FormatArgs,

        /// Where to write JSON events
        #[arg(short, long, value_enum, default_value = "stdout")]
        events: StreamArg,

        /// Extra environment for the child (KEY=VALUE, repeatable)
        #[arg(long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Program and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Parse a saved trace file (or stdin)
    Parse {
        /// Trace file to parse; reads stdin when omitted
        file: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        /// Also print unmatched lines as raw events
        #[arg(long)]
        include_raw: bool,

        /// Print a summary line after the events
        #[arg(long)]
        summary: bool,
    },

    /// Display the trace grammars
    Patterns,

    /// Display version information
    Version,
}

/// GC grammar selection shared by run and parse
#[derive(clap::Args, Debug)]
struct FormatArgs {
    /// Go version of the traced program, e.g. go1.4.2
    #[arg(long, env = GO_VERSION_ENV)]
    go_version: Option<String>,

    /// GC grammar to use; takes precedence over --go-version
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

impl FormatArgs {
    fn selector(self) -> FormatSelector {
        match (self.format, self.go_version) {
            (Some(format), _) => FormatSelector::Explicit(format.into()),
            (None, Some(version)) => FormatSelector::GoVersion(version),
            (None, None) => FormatSelector::default(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StreamArg {
    Stdout,
    Stderr,
}

impl From<StreamArg> for Stream {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::Stdout => Stream::Stdout,
            StreamArg::Stderr => Stream::Stderr,
        }
    }
}

impl From<StreamArg> for OutputTarget {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::Stdout => OutputTarget::Stdout,
            StreamArg::Stderr => OutputTarget::Stderr,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Legacy,
    Current,
}

impl From<FormatArg> for GcFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Legacy => GcFormat::Legacy,
            FormatArg::Current => GcFormat::Current,
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging (stderr, so it never mixes with JSON events on stdout)
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Run {
            stream,
            format,
            events,
            env,
            command,
        } => {
            let args = RunArgs {
                command,
                stream: stream.into(),
                format: format.selector(),
                events_to: events.into(),
                env,
            };

            execute_run(args)?;
        }

        Commands::Parse {
            file,
            format,
            include_raw,
            summary,
        } => {
            let args = ParseArgs {
                input: file,
                format: format.selector(),
                include_raw,
            };

            let result = execute_parse(args)?;
            if summary {
                println!("{}", summary_line(&result)?);
            }
        }

        Commands::Patterns => {
            display_patterns();
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
