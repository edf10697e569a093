//! Strider walking pipeline CLI.
//!
//! Provides three modes of operation:
//! - `walk`: Run the headless pipeline and print the phase timeline and timings
//! - `staircase`: Generate a staircase stance sequence and write it as JSON
//! - `info`: Print crate versions and the effective configuration

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use strider_contact::{StanceSequence, generate_staircase};
use strider_core::{Shared, StriderError, WalkTime, WalkingConfig, lock, shared};
use strider_geometry::ProjectionSettings;
use strider_mpc::{RecordingDrawSink, SharedSink, WalkingBuilder, WalkingPipeline};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Multi-contact walking with CoM tube preview control.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the walking pipeline headless.
    Walk {
        /// Simulated duration in seconds.
        #[arg(short, long, default_value_t = 10.0)]
        duration: f64,

        /// Walk a stance sequence from JSON instead of the generated staircase.
        #[arg(short, long)]
        stances: Option<PathBuf>,

        /// Record drawing primitives and report how many were emitted.
        #[arg(long)]
        draw: bool,
    },

    /// Write the generated staircase to a JSON file.
    Staircase {
        /// Output path.
        #[arg(short, long, default_value = "staircase.json")]
        output: PathBuf,

        /// Override the RNG seed of the configuration.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print crate information and configuration.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<WalkingConfig, StriderError> {
    match path {
        Some(path) => Ok(WalkingConfig::from_file(path)?),
        None => Ok(WalkingConfig::default()),
    }
}

/// Pipeline for `walk`, with the sink recording its drawings when `draw` is set.
fn build_walk(
    config: WalkingConfig,
    stances: Option<&Path>,
    draw: bool,
) -> Result<(WalkingPipeline, Shared<RecordingDrawSink>), StriderError> {
    let mut builder = WalkingBuilder::new(config);
    if let Some(path) = stances {
        let sequence = StanceSequence::load(path, &ProjectionSettings::default())
            .map_err(|err| StriderError::Stances(err.to_string()))?;
        builder = builder.with_stances(sequence);
    }
    let sink = shared(RecordingDrawSink::new());
    if draw {
        let draw_sink: SharedSink = sink.clone();
        builder = builder.with_draw_sink(draw_sink);
    }
    Ok((builder.build()?, sink))
}

fn run_walk(
    config: WalkingConfig,
    duration: f64,
    stances: Option<&Path>,
    draw: bool,
) -> Result<(), StriderError> {
    let (mut pipeline, sink) = build_walk(config, stances, draw)?;

    println!("{:>8}  {:>5}  phase", "time", "index");
    let mut last_index = None;
    let end = WalkTime::from_secs(duration);
    while pipeline.sim.time() < end {
        let (index, label, over) = {
            let fsm = lock(&pipeline.fsm);
            (fsm.cur_index(), fsm.cur_stance().label(), fsm.is_over())
        };
        if last_index != Some(index) {
            println!(
                "{:>8.3}  {index:>5}  {}",
                pipeline.sim.time().secs(),
                label.as_str()
            );
            last_index = Some(index);
        }
        if over {
            info!(time = %pipeline.sim.time(), "walk over");
            break;
        }
        pipeline.sim.step();
    }

    let com = lock(&pipeline.com);
    println!(
        "\nfinal com: ({:.3}, {:.3}, {:.3}) after {} ticks",
        com.p.x,
        com.p.y,
        com.p.z,
        pipeline.sim.nb_ticks()
    );
    if draw {
        let sink = lock(&sink);
        println!("drawn: {} primitives, {} live", sink.total_drawn(), sink.nb_live());
    }
    println!("\ncomputation times:\n{}", pipeline.sim.comp_times());
    Ok(())
}

fn run_staircase(
    mut config: WalkingConfig,
    output: &Path,
    seed: Option<u64>,
) -> Result<(), StriderError> {
    if let Some(seed) = seed {
        config.staircase.seed = seed;
    }
    config.validate()?;
    let stances = generate_staircase(&config.staircase, &ProjectionSettings::default())
        .and_then(|stances| stances.save(output).map(|()| stances))
        .map_err(|err| StriderError::Stances(err.to_string()))?;
    println!(
        "wrote {} stances ({:.1} s) to {}",
        stances.len(),
        stances.total_duration(),
        output.display()
    );
    Ok(())
}

fn run_info(config: &WalkingConfig) {
    println!("strider v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  strider-core      {}", env!("CARGO_PKG_VERSION"));
    println!("  strider-geometry  {}", env!("CARGO_PKG_VERSION"));
    println!("  strider-contact   {}", env!("CARGO_PKG_VERSION"));
    println!("  strider-mpc       {}", env!("CARGO_PKG_VERSION"));
    println!();
    match toml::to_string_pretty(config) {
        Ok(text) => println!("configuration:\n{text}"),
        Err(err) => eprintln!("cannot print configuration: {err}"),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strider_mpc=info,strider=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Some(Commands::Walk {
            duration,
            stances,
            draw,
        }) => run_walk(config, duration, stances.as_deref(), draw),
        Some(Commands::Staircase { output, seed }) => run_staircase(config, &output, seed),
        Some(Commands::Info) => {
            run_info(&config);
            Ok(())
        }
        // Default: a short walk on the generated staircase
        None => run_walk(config, 10.0, None, false),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_with_drawing_records_primitives() {
        let (mut pipeline, sink) = build_walk(WalkingConfig::default(), None, true).unwrap();
        assert_eq!(pipeline.sim.process_names().len(), 6);
        pipeline.sim.run_steps(3);
        let sink = lock(&sink);
        assert!(sink.total_drawn() > 0);
        assert!(sink.nb_live() > 0);
    }

    #[test]
    fn walk_without_drawing_leaves_sink_unused() {
        let (mut pipeline, sink) = build_walk(WalkingConfig::default(), None, false).unwrap();
        assert_eq!(pipeline.sim.process_names().len(), 3);
        pipeline.sim.run_steps(3);
        assert_eq!(lock(&sink).total_drawn(), 0);
    }

    #[test]
    fn missing_stance_file_is_reported() {
        let err = build_walk(
            WalkingConfig::default(),
            Some(Path::new("does/not/exist.json")),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, StriderError::Stances(_)));
    }
}
