// Two-phase squad optimization.
//
// Phase 1 picks the full squad from the whole pool under the squad rules
// (size, club limit, budget, required players, exact position quotas).
// Phase 2 picks the starting eleven from those players only, under the
// starting min/max per position. Captaincy and bench order are derived from
// each player's primary value afterwards, not by the solver.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{
    BudgetBounds, ConstraintEngine, EngineError, PositionBounds, SelectionConstraints,
    SolverOptions,
};
use crate::player::{Player, PlayerId, Position};
use crate::pool::{PlayerPoolIndex, PoolError, ValueEntry};
use crate::rules::{GameRuleSettings, PositionRule};
use crate::squad::{Squad, SquadError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Squad(#[from] SquadError),

    #[error("no rule defined for position {0}")]
    MissingPositionRule(Position),

    #[error("starting eleven has {0} players, captaincy needs at least two")]
    NotEnoughStarters(usize),

    #[error("bench has no goalkeeper to put first")]
    NoBenchGoalkeeper,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Caller-controlled inputs for one squad build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadRequest {
    pub budget: BudgetBounds,
    #[serde(default)]
    pub required: Vec<PlayerId>,
    /// Also force the required players into the starting eleven.
    #[serde(default)]
    pub reforce_required_in_lineup: bool,
}

impl Default for SquadRequest {
    fn default() -> Self {
        SquadRequest {
            budget: BudgetBounds::with_interval(1000, 3),
            required: Vec::new(),
            reforce_required_in_lineup: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct SquadBuilder<'r> {
    rules: &'r GameRuleSettings,
    options: SolverOptions,
}

impl<'r> SquadBuilder<'r> {
    pub fn new(rules: &'r GameRuleSettings) -> Self {
        Self::with_options(rules, SolverOptions::default())
    }

    pub fn with_options(rules: &'r GameRuleSettings, options: SolverOptions) -> Self {
        SquadBuilder { rules, options }
    }

    /// Constraints for phase 1: exact squad size, club limit, budget,
    /// required players, and an exact quota per position.
    pub fn squad_constraints(&self, request: &SquadRequest) -> Result<SelectionConstraints, BuildError> {
        Ok(SelectionConstraints {
            num_players: Some(self.rules.squad_size()),
            club_limit: Some(self.rules.club_limit()),
            budget: Some(request.budget),
            required: request.required.clone(),
            positions: self.position_bounds(|rule| (rule.quota, rule.quota))?,
        })
    }

    /// Constraints for phase 2: starting size and the starting range per
    /// position.
    pub fn lineup_constraints(&self, request: &SquadRequest) -> Result<SelectionConstraints, BuildError> {
        let required = if request.reforce_required_in_lineup {
            request.required.clone()
        } else {
            Vec::new()
        };
        Ok(SelectionConstraints {
            num_players: Some(self.rules.starting_size()),
            club_limit: None,
            budget: None,
            required,
            positions: self.position_bounds(|rule| (rule.min_play, rule.max_play))?,
        })
    }

    /// Build the best squad for `pool` (player plus ordered values).
    pub fn optimal_squad(
        &self,
        pool: impl IntoIterator<Item = (Player, ValueEntry)>,
        request: &SquadRequest,
    ) -> Result<Squad, BuildError> {
        let index = PlayerPoolIndex::new(pool)?;
        info!(
            "building squad of {} from {} candidates",
            self.rules.squad_size(),
            index.len()
        );

        let squad_index = self.select_squad(index, request)?;
        let lineup_index = squad_index.clone();
        let starting = self.select_lineup(lineup_index, request)?;

        let bench: Vec<Player> = squad_index
            .player_pool()
            .iter()
            .filter(|p| !starting.iter().any(|s| s.id == p.id))
            .cloned()
            .collect();

        let (captain, vice_captain) = rank_captains(&squad_index, &starting)?;
        let bench = order_bench(&squad_index, bench)?;

        let squad = Squad::new(starting, bench, captain, vice_captain)?;
        info!(
            "squad built: formation {}, cost {}, captain {}, vice-captain {}",
            squad.formation(),
            squad.cost(),
            squad.captain(),
            squad.vice_captain()
        );
        Ok(squad)
    }

    /// Give every player one random value in 1..10 and build the best squad
    /// for those values.
    pub fn random_squad<R: Rng>(
        &self,
        players: impl IntoIterator<Item = Player>,
        request: &SquadRequest,
        rng: &mut R,
    ) -> Result<Squad, BuildError> {
        let mut pool = Vec::new();
        for player in players {
            let value = f64::from(rng.gen_range(1u32..10));
            pool.push((player, ValueEntry::single(value)?));
        }
        self.optimal_squad(pool, request)
    }

    /// Phase 1. Returns an index scoped to the chosen squad, with fresh
    /// decision variables, ready for phase 2.
    pub fn select_squad(
        &self,
        index: PlayerPoolIndex,
        request: &SquadRequest,
    ) -> Result<PlayerPoolIndex, BuildError> {
        let mut engine = ConstraintEngine::with_options(index, self.options);
        engine.apply(&self.squad_constraints(request)?)?;

        let solved = engine.solve()?;
        let chosen = solved.find_players_in_solution();
        debug!("phase 1 selected {} players", chosen.len());
        let squad_index = engine.index().restricted_to(chosen)?;
        Ok(squad_index)
    }

    /// Phase 2. `squad_index` must be scoped to the squad chosen in phase 1.
    pub fn select_lineup(
        &self,
        squad_index: PlayerPoolIndex,
        request: &SquadRequest,
    ) -> Result<Vec<Player>, BuildError> {
        let mut engine = ConstraintEngine::with_options(squad_index, self.options);
        engine.apply(&self.lineup_constraints(request)?)?;

        let solved = engine.solve()?;
        let starting: Vec<Player> = solved
            .find_players_in_solution()
            .into_iter()
            .cloned()
            .collect();
        debug!("phase 2 selected {} starters", starting.len());
        Ok(starting)
    }

    fn position_bounds(
        &self,
        bounds: impl Fn(PositionRule) -> (usize, usize),
    ) -> Result<Vec<PositionBounds>, BuildError> {
        Position::ALL
            .iter()
            .map(|&position| {
                let rule = self
                    .rules
                    .position(position)
                    .ok_or(BuildError::MissingPositionRule(position))?;
                let (min, max) = bounds(rule);
                Ok(PositionBounds { position, min, max })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Captaincy and bench order
// ---------------------------------------------------------------------------

fn primary(index: &PlayerPoolIndex, player: &Player) -> Result<f64, BuildError> {
    Ok(index.values(player)?.primary_rank_value())
}

/// Descending by primary value; equal values keep their input order.
fn rank_descending<'a>(
    index: &PlayerPoolIndex,
    players: &'a [Player],
) -> Result<Vec<&'a Player>, BuildError> {
    let mut ranked = players
        .iter()
        .map(|p| primary(index, p).map(|v| (p, v)))
        .collect::<Result<Vec<_>, BuildError>>()?;
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Ok(ranked.into_iter().map(|(p, _)| p).collect())
}

/// Top two starters by primary value become captain and vice-captain.
fn rank_captains(
    index: &PlayerPoolIndex,
    starting: &[Player],
) -> Result<(PlayerId, PlayerId), BuildError> {
    match rank_descending(index, starting)?.as_slice() {
        [first, second, ..] => Ok((first.id, second.id)),
        _ => Err(BuildError::NotEnoughStarters(starting.len())),
    }
}

/// Goalkeeper first (the best one if there are several), then everyone
/// else by primary value.
fn order_bench(index: &PlayerPoolIndex, bench: Vec<Player>) -> Result<Vec<Player>, BuildError> {
    let ranked: Vec<Player> = rank_descending(index, &bench)?.into_iter().cloned().collect();
    let keeper_at = ranked
        .iter()
        .position(|p| p.position.is_goalkeeper())
        .ok_or(BuildError::NoBenchGoalkeeper)?;

    let mut ordered = ranked;
    let keeper = ordered.remove(keeper_at);
    ordered.insert(0, keeper);
    Ok(ordered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
