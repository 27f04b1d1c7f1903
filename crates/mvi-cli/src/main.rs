//! CLI for mvi: does a one-hot microstate model fit this recording?

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mvi")]
#[command(about = "mvi: score how well a recording fits the one-hot microstate model")]
#[command(version = mvi_core::VERSION)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the Microstate Validity Index of a recording.
    /// Prints the global record and decision; --ranking adds band relevance.
    Analyze {
        /// Signal JSON: {"sfreq": .., "data": [[..], ..], "channel_names": [..]}
        signal: String,

        /// Rank frequency bands by how well they track the MVI over time
        #[arg(long)]
        ranking: bool,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<String>,

        /// Output view: summary (default) or detailed (per-window table)
        #[arg(long, default_value = "summary", value_parser = ["summary", "detailed"])]
        view: String,

        /// Base configuration JSON (see `mvi config`)
        #[arg(long)]
        config: Option<String>,

        /// Window length in seconds
        #[arg(long)]
        window: Option<f64>,

        /// Step between windows in seconds
        #[arg(long)]
        step: Option<f64>,

        /// Number of quantization scales for the dimension estimate
        #[arg(long)]
        scales: Option<usize>,

        /// Decision threshold (MVI strictly above is valid)
        #[arg(long)]
        threshold: Option<f64>,

        /// Centering before windowing
        #[arg(long, value_parser = ["channel", "common_average"])]
        centering: Option<String>,

        /// Worker threads for the per-window stage
        #[arg(long)]
        workers: Option<usize>,

        /// Replace the band set; repeat as name:low:high (e.g. --band alpha:8:12)
        #[arg(long = "band")]
        bands: Vec<String>,
    },

    /// Write a deterministic synthetic recording as signal JSON
    Synth {
        /// rank1 (one oscillating topography), noise (independent channels),
        /// mixture (alternating fixed topographies)
        #[arg(long, default_value = "rank1", value_parser = ["rank1", "noise", "mixture"])]
        kind: String,

        /// Number of channels
        #[arg(long, default_value = "8")]
        channels: usize,

        /// Duration in seconds
        #[arg(long, default_value = "10")]
        seconds: f64,

        /// Sampling rate in Hz
        #[arg(long, default_value = "250")]
        sfreq: f64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output path
        #[arg(long, default_value = "signal.json")]
        output: String,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Analyze {
            signal,
            ranking,
            output,
            view,
            config,
            window,
            step,
            scales,
            threshold,
            centering,
            workers,
            bands,
        } => commands::analyze::run(commands::analyze::AnalyzeCommandConfig {
            signal_path: &signal,
            ranking,
            output_path: output.as_deref(),
            view: &view,
            overrides: commands::ConfigOverrides {
                config_path: config.as_deref(),
                window_secs: window,
                step_secs: step,
                num_scales: scales,
                threshold,
                centering: centering.as_deref(),
                workers,
                bands: &bands,
            },
        }),
        Commands::Synth {
            kind,
            channels,
            seconds,
            sfreq,
            seed,
            output,
        } => commands::synth::run(commands::synth::SynthCommandConfig {
            kind: &kind,
            channels,
            seconds,
            sfreq,
            seed,
            output_path: &output,
        }),
        Commands::Config => commands::config::run(),
    }
}
