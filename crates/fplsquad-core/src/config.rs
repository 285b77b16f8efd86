// Configuration loading and parsing (rules.toml, optimizer.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::builder::SquadRequest;
use crate::engine::{BudgetBounds, SolverOptions};
use crate::player::{PlayerId, Position};
use crate::rules::{GameRuleSettings, PositionRule};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub rules: GameRuleSettings,
    pub request: SquadRequest,
    pub solver: SolverOptions,
    pub data_paths: DataPaths,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// rules.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[rules]` table in rules.toml.
#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    rules: RulesSection,
}

#[derive(Debug, Clone, Deserialize)]
struct RulesSection {
    squad_size: usize,
    starting_size: usize,
    club_limit: usize,
    /// Keyed by short position name (GK, DEF, MID, FWD).
    positions: HashMap<String, PositionRule>,
}

// ---------------------------------------------------------------------------
// optimizer.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire optimizer.toml file.
#[derive(Debug, Clone, Deserialize)]
struct OptimizerFile {
    budget: BudgetSection,
    #[serde(default)]
    selection: SelectionSection,
    solver: SolverSection,
    data_paths: DataPaths,
    #[serde(default)]
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct BudgetSection {
    upper: u32,
    #[serde(default)]
    interval: u32,
    /// Overrides `upper - interval` when present.
    lower: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SelectionSection {
    #[serde(default)]
    required: Vec<u32>,
    #[serde(default)]
    reforce_required_in_lineup: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SolverSection {
    time_limit_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    /// Value columns to read from the players CSV, primary first. Empty means
    /// every value column in file order.
    #[serde(default)]
    pub value_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/rules.toml` and
/// `config/optimizer.toml`, relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- rules.toml ---
    let rules_path = config_dir.join("rules.toml");
    let rules_text = read_file(&rules_path)?;
    let rules_file: RulesFile =
        toml::from_str(&rules_text).map_err(|e| ConfigError::ParseError {
            path: rules_path.clone(),
            source: e,
        })?;
    let rules = build_rules(rules_file.rules)?;

    // --- optimizer.toml ---
    let optimizer_path = config_dir.join("optimizer.toml");
    let optimizer_text = read_file(&optimizer_path)?;
    let optimizer: OptimizerFile =
        toml::from_str(&optimizer_text).map_err(|e| ConfigError::ParseError {
            path: optimizer_path.clone(),
            source: e,
        })?;

    validate_optimizer(&optimizer)?;

    let budget = match optimizer.budget.lower {
        Some(lower) => BudgetBounds::new(lower, optimizer.budget.upper),
        None => BudgetBounds::with_interval(optimizer.budget.upper, optimizer.budget.interval),
    };
    let request = SquadRequest {
        budget,
        required: optimizer
            .selection
            .required
            .iter()
            .map(|&id| PlayerId(id))
            .collect(),
        reforce_required_in_lineup: optimizer.selection.reforce_required_in_lineup,
    };
    let solver = SolverOptions {
        time_limit: time_limit(optimizer.solver.time_limit_secs)?,
    };

    let config = Config {
        rules,
        request,
        solver,
        data_paths: optimizer.data_paths,
        output: optimizer.output,
    };

    validate(&config)?;

    Ok(config)
}

/// Files read from `config/`, each with a template of the same name in
/// `defaults/`.
pub const CONFIG_FILES: [&str; 2] = ["rules.toml", "optimizer.toml"];

/// Copy every missing file in `CONFIG_FILES` from `defaults/` into
/// `config/`, returning the paths written. Existing files are left alone.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_err = |message: String| ConfigError::DefaultsCopyError { message };

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.is_file() {
            continue;
        }
        let template = defaults_dir.join(name);
        if !template.is_file() {
            return Err(copy_err(format!(
                "{} is missing and no template exists at {}",
                target.display(),
                template.display()
            )));
        }

        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_err(format!("cannot create {}: {e}", config_dir.display())))?;
        std::fs::copy(&template, &target)
            .map_err(|e| copy_err(format!("cannot copy {}: {e}", template.display())))?;
        info!("initialized {} from {}", target.display(), template.display());
        copied.push(target);
    }
    Ok(copied)
}

/// Fill in missing config files under `base_dir`, then load and validate.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn build_rules(section: RulesSection) -> Result<GameRuleSettings, ConfigError> {
    let mut positions = BTreeMap::new();
    for (key, rule) in section.positions {
        let position = Position::from_str_pos(&key)
            .ok_or_else(|| invalid(format!("rules.positions.{key}"), "unknown position"))?;
        if positions.insert(position, rule).is_some() {
            return Err(invalid(
                format!("rules.positions.{key}"),
                format!("duplicate rule for {position}"),
            ));
        }
    }
    Ok(GameRuleSettings::new(
        section.squad_size,
        section.starting_size,
        section.club_limit,
        positions,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Positive, finite and small enough to fit a `Duration`.
fn time_limit(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(
            "solver.time_limit_secs",
            format!("must be > 0, got {secs}"),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| invalid("solver.time_limit_secs", format!("{secs} is out of range: {e}")))
}

fn validate_optimizer(file: &OptimizerFile) -> Result<(), ConfigError> {
    time_limit(file.solver.time_limit_secs)?;
    if let Some(lower) = file.budget.lower {
        if lower > file.budget.upper {
            return Err(invalid(
                "budget.lower",
                format!("must not exceed budget.upper ({}), got {lower}", file.budget.upper),
            ));
        }
    }
    if file.data_paths.players.trim().is_empty() {
        return Err(invalid("data_paths.players", "must not be empty"));
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let rules = &config.rules;

    let size_fields: &[(&str, usize)] = &[
        ("rules.squad_size", rules.squad_size()),
        ("rules.starting_size", rules.starting_size()),
        ("rules.club_limit", rules.club_limit()),
    ];
    for (name, val) in size_fields {
        if *val == 0 {
            return Err(invalid(*name, "must be > 0"));
        }
    }

    if rules.starting_size() > rules.squad_size() {
        return Err(invalid(
            "rules.starting_size",
            format!(
                "must not exceed squad_size ({}), got {}",
                rules.squad_size(),
                rules.starting_size()
            ),
        ));
    }

    for position in Position::ALL {
        if rules.position(position).is_none() {
            return Err(invalid(
                format!("rules.positions.{}", position.display_str()),
                "missing",
            ));
        }
    }

    let (mut quota_sum, mut min_sum, mut max_sum) = (0, 0, 0);
    for (position, rule) in rules.positions() {
        if rule.min_play > rule.max_play || rule.max_play > rule.quota {
            return Err(invalid(
                format!("rules.positions.{}", position.display_str()),
                format!(
                    "need min_play <= max_play <= quota, got {} / {} / {}",
                    rule.min_play, rule.max_play, rule.quota
                ),
            ));
        }
        quota_sum += rule.quota;
        min_sum += rule.min_play;
        max_sum += rule.max_play;
    }

    if quota_sum != rules.squad_size() {
        return Err(invalid(
            "rules.positions",
            format!(
                "quotas sum to {quota_sum}, expected squad_size {}",
                rules.squad_size()
            ),
        ));
    }
    if !(min_sum..=max_sum).contains(&rules.starting_size()) {
        return Err(invalid(
            "rules.starting_size",
            format!(
                "must lie between the summed min_play ({min_sum}) and max_play ({max_sum}), got {}",
                rules.starting_size()
            ),
        ));
    }

    if config.request.required.len() > rules.squad_size() {
        return Err(invalid(
            "selection.required",
            format!(
                "{} required players exceed squad_size {}",
                config.request.required.len(),
                rules.squad_size()
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
