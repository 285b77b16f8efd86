// Incrementally built 0/1 selection program over one player pool.
//
// Constraints are recorded as plain values and only turned into a HiGHS model
// when `solve` is called, so clearing them is just clearing a vector.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use good_lp::constraint::{eq, geq, leq};
use good_lp::solvers::highs::highs;
use good_lp::solvers::SolutionStatus;
use good_lp::{
    variable, Constraint as LpConstraint, Expression, ProblemVariables, Solution, SolverModel,
    Variable,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::player::{PlayerId, Position};
use crate::pool::PlayerPoolIndex;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("cannot select {requested} players from a pool of {pool_size}")]
    CountExceedsPool { requested: usize, pool_size: usize },

    #[error("invalid budget: lower bound {lower} is above upper bound {upper}")]
    InvertedBudget { lower: u32, upper: u32 },

    #[error("invalid {position} bounds: min {min} is above max {max}")]
    InvertedPositionBounds {
        position: Position,
        min: usize,
        max: usize,
    },

    #[error("required player {0} is not in the pool")]
    UnknownRequiredPlayer(PlayerId),

    #[error("{required} required players do not fit in a selection of {count}")]
    TooManyRequired { required: usize, count: usize },

    #[error("squad generation failed: {reason}")]
    SolveFailed { reason: String },
}

// ---------------------------------------------------------------------------
// Constraint description
// ---------------------------------------------------------------------------

/// Inclusive bounds on the total cost of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetBounds {
    pub lower: u32,
    pub upper: u32,
}

impl BudgetBounds {
    pub const fn new(lower: u32, upper: u32) -> Self {
        BudgetBounds { lower, upper }
    }

    /// `[budget - interval, budget]`, clamped at zero.
    pub fn with_interval(budget: u32, interval: u32) -> Self {
        BudgetBounds {
            lower: budget.saturating_sub(interval),
            upper: budget,
        }
    }

    pub fn contains(&self, cost: u32) -> bool {
        (self.lower..=self.upper).contains(&cost)
    }
}

/// Inclusive bounds on how many selected players hold a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionBounds {
    pub position: Position,
    pub min: usize,
    pub max: usize,
}

/// Every constraint kind the engine understands, with typed bounds.
///
/// Unset fields add nothing. `apply` adds them in declaration order, so
/// validation failures surface in that order too.
#[derive(Debug, Clone, Default)]
pub struct SelectionConstraints {
    pub num_players: Option<usize>,
    pub club_limit: Option<usize>,
    pub budget: Option<BudgetBounds>,
    pub required: Vec<PlayerId>,
    pub positions: Vec<PositionBounds>,
}

/// One recorded constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    PlayerCount(usize),
    ClubLimit(usize),
    Budget(BudgetBounds),
    Required(PlayerId),
    PositionRange(PositionBounds),
}

/// Solver tuning that is not part of the model itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub time_limit: Duration,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            time_limit: Duration::from_secs(30),
        }
    }
}

/// A linear row `lower <= sum(coef * x[column]) <= upper` over pool columns.
#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, f64)>,
    lower: Option<f64>,
    upper: Option<f64>,
}

impl Row {
    fn count(columns: impl IntoIterator<Item = usize>) -> Self {
        Row {
            terms: columns.into_iter().map(|c| (c, 1.0)).collect(),
            lower: None,
            upper: None,
        }
    }

    fn at_least(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    fn at_most(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    fn exactly(self, value: f64) -> Self {
        self.at_least(value).at_most(value)
    }

    /// Whether a row with no terms (value 0) is satisfiable.
    fn empty_row_holds(&self) -> bool {
        self.lower.map_or(true, |l| l <= 0.0) && self.upper.map_or(true, |u| u >= 0.0)
    }

    fn to_lp(&self, vars: &[Variable]) -> Vec<LpConstraint> {
        let mut expr = Expression::with_capacity(self.terms.len());
        for &(column, coef) in &self.terms {
            expr.add_mul(coef, vars[column]);
        }
        match (self.lower, self.upper) {
            (Some(l), Some(u)) if l == u => vec![eq(expr, l)],
            (Some(l), Some(u)) => vec![geq(expr.clone(), l), leq(expr, u)],
            (Some(l), None) => vec![geq(expr, l)],
            (None, Some(u)) => vec![leq(expr, u)],
            (None, None) => vec![],
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns one selection problem over one pool. The objective is fixed at
/// construction (maximize the summed player values); constraints accumulate
/// until `reset_problem`.
#[derive(Debug)]
pub struct ConstraintEngine {
    index: PlayerPoolIndex,
    constraints: Vec<ConstraintKind>,
    options: SolverOptions,
}

impl ConstraintEngine {
    pub fn new(index: PlayerPoolIndex) -> Self {
        Self::with_options(index, SolverOptions::default())
    }

    pub fn with_options(index: PlayerPoolIndex, options: SolverOptions) -> Self {
        ConstraintEngine {
            index,
            constraints: Vec::new(),
            options,
        }
    }

    pub fn index(&self) -> &PlayerPoolIndex {
        &self.index
    }

    pub fn constraints(&self) -> &[ConstraintKind] {
        &self.constraints
    }

    /// Exactly `n` players selected across the pool.
    pub fn set_num_players(&mut self, n: usize) -> Result<(), EngineError> {
        let pool_size = self.index.len();
        if n > pool_size {
            return Err(EngineError::CountExceedsPool {
                requested: n,
                pool_size,
            });
        }
        let required = self.required_ids().len();
        if required > n {
            return Err(EngineError::TooManyRequired { required, count: n });
        }
        debug!("constraint: exactly {} players", n);
        self.constraints.push(ConstraintKind::PlayerCount(n));
        Ok(())
    }

    /// At most `limit` selected players per club represented in the pool.
    pub fn num_players_same_club(&mut self, limit: usize) -> Result<(), EngineError> {
        debug!("constraint: at most {} players per club", limit);
        self.constraints.push(ConstraintKind::ClubLimit(limit));
        Ok(())
    }

    /// Total cost of the selection within `[lower, upper]`.
    pub fn budget(&mut self, upper: u32, lower: u32) -> Result<(), EngineError> {
        if lower > upper {
            return Err(EngineError::InvertedBudget { lower, upper });
        }
        debug!("constraint: cost between {} and {}", lower, upper);
        self.constraints
            .push(ConstraintKind::Budget(BudgetBounds::new(lower, upper)));
        Ok(())
    }

    /// Force every listed player into the selection. Nothing is recorded if
    /// any of them is rejected.
    pub fn required_players(&mut self, players: &[PlayerId]) -> Result<(), EngineError> {
        if let Some(&missing) = players.iter().find(|&&id| !self.index.contains(id)) {
            return Err(EngineError::UnknownRequiredPlayer(missing));
        }

        let mut required = self.required_ids();
        let fresh: Vec<PlayerId> = players
            .iter()
            .copied()
            .filter(|&id| required.insert(id))
            .collect();

        if let Some(count) = self.smallest_count() {
            if required.len() > count {
                return Err(EngineError::TooManyRequired {
                    required: required.len(),
                    count,
                });
            }
        }

        for id in fresh {
            debug!("constraint: player {} required", id);
            self.constraints.push(ConstraintKind::Required(id));
        }
        Ok(())
    }

    /// Selected players at `position` within `[min_players, max_players]`.
    pub fn position_min_max(
        &mut self,
        position: Position,
        min_players: usize,
        max_players: usize,
    ) -> Result<(), EngineError> {
        if min_players > max_players {
            return Err(EngineError::InvertedPositionBounds {
                position,
                min: min_players,
                max: max_players,
            });
        }
        debug!(
            "constraint: between {} and {} {} players",
            min_players, max_players, position
        );
        self.constraints
            .push(ConstraintKind::PositionRange(PositionBounds {
                position,
                min: min_players,
                max: max_players,
            }));
        Ok(())
    }

    /// Apply every constraint set in `constraints`, stopping at the first
    /// rejected one.
    pub fn apply(&mut self, constraints: &SelectionConstraints) -> Result<(), EngineError> {
        if let Some(n) = constraints.num_players {
            self.set_num_players(n)?;
        }
        if let Some(limit) = constraints.club_limit {
            self.num_players_same_club(limit)?;
        }
        if let Some(budget) = constraints.budget {
            self.budget(budget.upper, budget.lower)?;
        }
        if !constraints.required.is_empty() {
            self.required_players(&constraints.required)?;
        }
        for bounds in &constraints.positions {
            self.position_min_max(bounds.position, bounds.min, bounds.max)?;
        }
        Ok(())
    }

    /// Drop every constraint added so far. The pool and objective stay.
    pub fn reset_problem(&mut self) {
        debug!("discarding {} constraints", self.constraints.len());
        self.constraints.clear();
    }

    /// Build the model from the recorded constraints and run HiGHS once.
    ///
    /// An infeasible model is an error; a feasible model whose best answer
    /// selects nobody is a valid, empty solution.
    pub fn solve(&self) -> Result<crate::extract::SolvedProblem<'_>, EngineError> {
        info!(
            "solving selection over {} players with {} constraints",
            self.index.len(),
            self.constraints.len()
        );

        let rows = self.rows();
        if let Some(row) = rows.iter().find(|r| r.terms.is_empty() && !r.empty_row_holds()) {
            warn!("constraint on an empty player group cannot hold: {:?}", row);
            return Err(EngineError::SolveFailed {
                reason: "a constraint applies to no players but requires some".into(),
            });
        }

        let mut vars = ProblemVariables::new();
        let columns: Vec<Variable> = self
            .index
            .iter()
            .map(|(_, player, _)| vars.add(variable().binary().name(format!("p{}", player.id))))
            .collect();

        let mut objective = Expression::with_capacity(columns.len());
        for (var, _, values) in self.index.iter() {
            objective.add_mul(values.objective_value(), columns[var.column()]);
        }

        let mut model = vars.maximise(objective).using(highs);
        model.set_verbose(false);
        let mut model = model.set_time_limit(self.options.time_limit.as_secs_f64());
        for row in rows.iter().filter(|r| !r.terms.is_empty()) {
            for constraint in row.to_lp(&columns) {
                model = model.with(constraint);
            }
        }

        let solution = model.solve().map_err(|e| {
            warn!("selection problem could not be solved: {}", e);
            EngineError::SolveFailed {
                reason: e.to_string(),
            }
        })?;

        // A timed-out run carries the incumbent, not a proven optimum.
        if matches!(solution.status(), SolutionStatus::TimeLimit) {
            warn!(
                "solver stopped at the {:?} time limit before proving optimality",
                self.options.time_limit
            );
            return Err(EngineError::SolveFailed {
                reason: format!("time limit of {:?} reached", self.options.time_limit),
            });
        }

        let selected: Vec<bool> = columns.iter().map(|&v| solution.value(v) > 0.5).collect();
        let objective_value: f64 = self
            .index
            .iter()
            .filter(|(var, _, _)| selected[var.column()])
            .map(|(_, _, values)| values.objective_value())
            .sum();

        info!(
            "solved: {} players selected, objective {:.3}",
            selected.iter().filter(|&&s| s).count(),
            objective_value
        );

        Ok(crate::extract::SolvedProblem::new(
            &self.index,
            selected,
            objective_value,
        ))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn required_ids(&self) -> HashSet<PlayerId> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                ConstraintKind::Required(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn smallest_count(&self) -> Option<usize> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                ConstraintKind::PlayerCount(n) => Some(*n),
                _ => None,
            })
            .min()
    }

    /// Translate recorded constraints into rows over pool columns.
    fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for constraint in &self.constraints {
            match *constraint {
                ConstraintKind::PlayerCount(n) => {
                    rows.push(Row::count(0..self.index.len()).exactly(n as f64));
                }
                ConstraintKind::ClubLimit(limit) => {
                    let mut by_club: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
                    for (var, player, _) in self.index.iter() {
                        by_club
                            .entry(player.club.as_str())
                            .or_default()
                            .push(var.column());
                    }
                    for (_, columns) in by_club {
                        rows.push(Row::count(columns).at_most(limit as f64));
                    }
                }
                ConstraintKind::Budget(bounds) => {
                    let terms = self
                        .index
                        .iter()
                        .map(|(var, player, _)| (var.column(), f64::from(player.cost)))
                        .collect();
                    rows.push(Row {
                        terms,
                        lower: Some(f64::from(bounds.lower)),
                        upper: Some(f64::from(bounds.upper)),
                    });
                }
                ConstraintKind::Required(id) => {
                    if let Ok(player) = self.index.player(id) {
                        if let Ok(var) = self.index.decision_variable(player) {
                            rows.push(Row::count([var.column()]).exactly(1.0));
                        }
                    }
                }
                ConstraintKind::PositionRange(bounds) => {
                    let columns = self
                        .index
                        .iter()
                        .filter(|(_, player, _)| player.position == bounds.position)
                        .map(|(var, _, _)| var.column());
                    rows.push(
                        Row::count(columns)
                            .at_least(bounds.min as f64)
                            .at_most(bounds.max as f64),
                    );
                }
            }
        }
        rows
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
