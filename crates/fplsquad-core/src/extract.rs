// Reading chosen players back out of a solved selection problem.

use crate::player::{Player, PlayerId};
use crate::pool::PlayerPoolIndex;

/// Result handle of a successful `ConstraintEngine::solve`. It only exists for
/// solved problems, so extraction never sees an unsolved or failed model.
#[derive(Debug, Clone)]
pub struct SolvedProblem<'a> {
    index: &'a PlayerPoolIndex,
    selected: Vec<bool>,
    objective: f64,
}

impl<'a> SolvedProblem<'a> {
    pub(crate) fn new(index: &'a PlayerPoolIndex, selected: Vec<bool>, objective: f64) -> Self {
        SolvedProblem {
            index,
            selected,
            objective,
        }
    }

    /// Every player whose decision variable solved to 1, mapped back through
    /// the variable's player token. Callers must not rely on the order.
    pub fn find_players_in_solution(&self) -> Vec<&'a Player> {
        let index = self.index;
        index
            .iter()
            .filter(|(var, _, _)| self.selected[var.column()])
            .filter_map(|(var, _, _)| index.player(var.player_id()).ok())
            .collect()
    }

    pub fn selected_ids(&self) -> Vec<PlayerId> {
        self.find_players_in_solution().iter().map(|p| p.id).collect()
    }

    /// Summed objective value of the selected players.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn is_empty(&self) -> bool {
        !self.selected.iter().any(|&s| s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
