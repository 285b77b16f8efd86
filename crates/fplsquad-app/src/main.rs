// fplsquad entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the report)
// 2. Load config
// 3. Load the player pool
// 4. Build the squad (optimal, or from random values with --random)
// 5. Validate it against the game rules
// 6. Print the report

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fplsquad_core::builder::SquadBuilder;
use fplsquad_core::catalogue;
use fplsquad_core::config::{self, OutputFormat};
use fplsquad_core::player::Player;
use fplsquad_core::squad::Squad;
use fplsquad_core::validator::SquadValidator;

/// Pick a fantasy football squad under budget, club and position rules.
#[derive(Parser, Debug)]
#[command(name = "fplsquad")]
#[command(version)]
struct Cli {
    /// Players CSV, overriding `data_paths.players`
    #[arg(long)]
    players: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Ignore the CSV values and score every player randomly
    #[arg(long)]
    random: bool,

    /// Seed for --random
    #[arg(long, requires = "random")]
    seed: Option<u64>,
}

/// JSON shape of the printed squad.
#[derive(Serialize)]
struct SquadReport<'a> {
    generated_at: DateTime<Utc>,
    formation: String,
    cost: u32,
    captain: &'a Player,
    vice_captain: &'a Player,
    starting_eleven: &'a [Player],
    bench: &'a [Player],
}

impl<'a> SquadReport<'a> {
    fn new(squad: &'a Squad) -> Self {
        SquadReport {
            generated_at: Utc::now(),
            formation: squad.formation().to_string(),
            cost: squad.cost(),
            captain: squad.captain(),
            vice_captain: squad.vice_captain(),
            starting_eleven: squad.starting_eleven(),
            bench: squad.bench(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = std::env::current_dir().context("cannot read working directory")?;

    // 1. Initialize tracing
    init_tracing(&base_dir.join("logs")).context("failed to set up logging")?;
    info!("fplsquad starting up in {}", base_dir.display());

    // 2. Load config
    let config = config::load_config(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: squad of {}, {} starters, club limit {}, budget {}..={}",
        config.rules.squad_size(),
        config.rules.starting_size(),
        config.rules.club_limit(),
        config.request.budget.lower,
        config.request.budget.upper
    );

    // 3. Load the player pool
    let players_path = cli
        .players
        .clone()
        .unwrap_or_else(|| base_dir.join(&config.data_paths.players));
    let pool = catalogue::load_pool(&players_path, &config.data_paths.value_columns)
        .with_context(|| format!("failed to load players from {}", players_path.display()))?;
    info!("Loaded {} players from {}", pool.len(), players_path.display());

    // 4. Build the squad
    let builder = SquadBuilder::with_options(&config.rules, config.solver);
    let squad = if cli.random {
        let mut rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let players = pool.into_iter().map(|(player, _)| player);
        builder
            .random_squad(players, &config.request, &mut rng)
            .context("failed to build random squad")?
    } else {
        builder
            .optimal_squad(pool, &config.request)
            .context("failed to build squad")?
    };

    // 5. Validate
    if let Err(e) = SquadValidator::new(&config.rules).check_squad(&squad) {
        warn!("Built squad breaks a game rule: {}", e);
        return Err(e).context("squad failed validation");
    }

    // 6. Print the report
    if cli.json || config.output.format == OutputFormat::Json {
        let report = SquadReport::new(&squad);
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
    } else {
        print_text_report(&squad);
    }

    info!("fplsquad finished");
    Ok(())
}

fn print_text_report(squad: &Squad) {
    println!("{squad}");
    println!();
    println!("Formation:    {}", squad.formation());
    println!("Captain:      {}", squad.captain());
    println!("Vice-captain: {}", squad.vice_captain());
    println!("Cost:         {}", squad.cost());
}

/// Send log output to `<log_dir>/fplsquad.log`; stdout is the report.
fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("fplsquad.log"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fplsquad=info,fplsquad_core=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
