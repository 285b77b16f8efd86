// Game-rule snapshot: squad/lineup sizes, club limit, per-position quotas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::player::Position;

/// Squad and starting-lineup bounds for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRule {
    /// Exact number of squad members at this position.
    pub quota: usize,
    /// Fewest starters allowed at this position.
    pub min_play: usize,
    /// Most starters allowed at this position.
    pub max_play: usize,
}

impl PositionRule {
    pub const fn new(quota: usize, min_play: usize, max_play: usize) -> Self {
        PositionRule {
            quota,
            min_play,
            max_play,
        }
    }
}

/// Read-only rule set for one solve. Refreshed between solves by building a
/// new value; nothing mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRuleSettings {
    squad_size: usize,
    starting_size: usize,
    club_limit: usize,
    positions: BTreeMap<Position, PositionRule>,
}

impl GameRuleSettings {
    pub fn new(
        squad_size: usize,
        starting_size: usize,
        club_limit: usize,
        positions: BTreeMap<Position, PositionRule>,
    ) -> Self {
        GameRuleSettings {
            squad_size,
            starting_size,
            club_limit,
            positions,
        }
    }

    pub fn squad_size(&self) -> usize {
        self.squad_size
    }

    pub fn starting_size(&self) -> usize {
        self.starting_size
    }

    pub fn club_limit(&self) -> usize {
        self.club_limit
    }

    /// Rule for a single position, if the rule set defines one.
    pub fn position(&self, position: Position) -> Option<PositionRule> {
        self.positions.get(&position).copied()
    }

    /// All position rules in canonical position order (GK, DEF, MID, FWD).
    pub fn positions(&self) -> impl Iterator<Item = (Position, PositionRule)> + '_ {
        self.positions.iter().map(|(&pos, &rule)| (pos, rule))
    }
}

impl Default for GameRuleSettings {
    /// Standard Fantasy Premier League rules.
    fn default() -> Self {
        let positions = BTreeMap::from([
            (Position::Goalkeeper, PositionRule::new(2, 1, 1)),
            (Position::Defender, PositionRule::new(5, 3, 5)),
            (Position::Midfielder, PositionRule::new(5, 2, 5)),
            (Position::Forward, PositionRule::new(3, 1, 3)),
        ]);
        GameRuleSettings::new(15, 11, 3, positions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_match_fpl() {
        let rules = GameRuleSettings::default();
        assert_eq!(rules.squad_size(), 15);
        assert_eq!(rules.starting_size(), 11);
        assert_eq!(rules.club_limit(), 3);
        assert_eq!(
            rules.position(Position::Goalkeeper),
            Some(PositionRule::new(2, 1, 1))
        );
        assert_eq!(
            rules.position(Position::Midfielder),
            Some(PositionRule::new(5, 2, 5))
        );
    }

    #[test]
    fn default_quotas_sum_to_squad_size() {
        let rules = GameRuleSettings::default();
        let total: usize = rules.positions().map(|(_, r)| r.quota).sum();
        assert_eq!(total, rules.squad_size());
    }

    #[test]
    fn positions_iterate_in_canonical_order() {
        let rules = GameRuleSettings::default();
        let order: Vec<Position> = rules.positions().map(|(p, _)| p).collect();
        assert_eq!(order, Position::ALL.to_vec());
    }
}
