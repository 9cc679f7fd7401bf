use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use enso_game::{
    CachedLoader, EngineError, MemoryStore, MissionEngine, MissionSet, ProgressStore, StartMode,
};
use std::io::{Write, stdin, stdout};
use std::path::PathBuf;

use enso_console::loader::TableLoader;
use enso_console::session::{Session, SessionOutcome};
use enso_console::store::CsvProgressStore;
use enso_console::{OutputTarget, load_mission_set, report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Console,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "enso-console", version)]
#[command(about = "Play the ENSO cipher challenge against a monthly ONI table")]
struct Args {
    /// CSV table to play against (defaults to the bundled ONI table)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Mission set: decoder, case-file, or a path to a JSON mission set
    #[arg(long, default_value = "decoder")]
    missions: String,

    /// Team name used as the progress identity
    #[arg(long, default_value = "team")]
    team: String,

    /// Progress file shared by every team
    #[arg(long, default_value = "enso-progress.csv")]
    store: PathBuf,

    /// Keep progress in memory only
    #[arg(long)]
    memory: bool,

    /// Continue an existing run instead of refusing to start
    #[arg(long)]
    reuse: bool,

    /// Wipe the team's progress before playing
    #[arg(long)]
    reset: bool,

    /// List the missions of the selected set and exit
    #[arg(long)]
    list_missions: bool,

    /// Print the leaderboard and exit
    #[arg(long)]
    leaderboard: bool,

    /// Leaderboard format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    format: ReportFormat,

    /// Optional path to write listings and leaderboards instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let missions = load_mission_set(&args.missions)?;
    if args.list_missions {
        let mut output_target = OutputTarget::new(args.output.clone())?;
        report::generate_mission_list(output_target.writer(), &missions)?;
        output_target.flush_inner()?;
        return Ok(());
    }

    if args.memory {
        run_with_store(&args, missions, MemoryStore::new())
    } else {
        run_with_store(&args, missions, CsvProgressStore::new(&args.store))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run_with_store<S: ProgressStore>(args: &Args, missions: MissionSet, store: S) -> Result<()> {
    let engine = MissionEngine::new(missions, store).context("mission set is not playable")?;

    if args.leaderboard {
        return write_leaderboard(args, &engine);
    }

    let loader = CachedLoader::new(TableLoader::from_arg(args.data.clone()));
    let dataset = loader.get().context("dataset unavailable")?;

    if args.reset {
        engine.reset(&args.team)?;
        println!("{}", format!("Progress for {} reset.", args.team).yellow());
    }
    let mode = if args.reuse {
        StartMode::Reuse
    } else {
        StartMode::Fresh
    };
    let state = match engine.start(&args.team, mode) {
        Err(EngineError::AlreadyStarted { identity }) => anyhow::bail!(
            "{identity} already has a run in progress; pass --reuse to continue or --reset to start over"
        ),
        other => other?,
    };

    announce_banner(&engine.missions().name, &args.team);
    let mut out = stdout().lock();
    let outcome = Session::new(&engine, &dataset, state).run(stdin().lock(), &mut out)?;
    out.flush()?;
    log::info!("{}: session ended with {outcome:?}", args.team);
    if outcome == SessionOutcome::InputClosed {
        log::debug!("input closed before the run finished");
    }
    Ok(())
}

fn write_leaderboard<S: ProgressStore, C: enso_game::Clock>(
    args: &Args,
    engine: &MissionEngine<S, C>,
) -> Result<()> {
    let entries = engine.leaderboard()?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.format {
        ReportFormat::Console => {
            report::generate_console_leaderboard(&mut output_target, &entries, engine.total())?;
        }
        ReportFormat::Json => report::generate_json_leaderboard(&mut output_target, &entries)?,
        ReportFormat::Csv => report::generate_csv_leaderboard(&mut output_target, &entries)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn announce_banner(set_name: &str, team: &str) {
    println!("{}", "🌊 ENSO Cipher Challenge".bright_cyan().bold());
    println!("{}", "========================".cyan());
    println!("{set_name} | team {}", team.bold());
}
