// Rule check for an arbitrary starting eleven + bench, independent of the
// optimizer. Stops at the first broken rule.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::player::{Player, Position};
use crate::rules::GameRuleSettings;
use crate::squad::Squad;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("club limit exceeded: {count} players from {club}, limit is {limit}")]
    ClubLimitExceeded {
        club: String,
        count: usize,
        limit: usize,
    },

    #[error("expected {expected} {position} players in the squad, got {actual}")]
    PositionQuota {
        position: Position,
        expected: usize,
        actual: usize,
    },

    #[error("got {actual} starting {position} players, expected between {min} and {max}")]
    StartingPositionRange {
        position: Position,
        actual: usize,
        min: usize,
        max: usize,
    },

    #[error("no rule defined for position {0}")]
    MissingPositionRule(Position),

    #[error("expected {expected} players in the starting eleven, got {actual}")]
    StartingSize { expected: usize, actual: usize },

    #[error("expected {expected} players in the squad, got {actual}")]
    SquadSize { expected: usize, actual: usize },
}

pub struct SquadValidator<'r> {
    rules: &'r GameRuleSettings,
}

impl<'r> SquadValidator<'r> {
    pub fn new(rules: &'r GameRuleSettings) -> Self {
        SquadValidator { rules }
    }

    /// Check, in order: club limit, per-position quota and starting range,
    /// starting-eleven size, squad size.
    pub fn check(&self, starting_eleven: &[Player], bench: &[Player]) -> Result<(), ValidationError> {
        let full_squad: Vec<&Player> = starting_eleven.iter().chain(bench).collect();

        self.num_players_from_clubs(&full_squad)?;
        self.num_players_in_position(starting_eleven, &full_squad)?;
        self.num_players_in_starting(starting_eleven)?;
        self.num_players_in_squad(&full_squad)?;
        Ok(())
    }

    pub fn check_squad(&self, squad: &Squad) -> Result<(), ValidationError> {
        self.check(squad.starting_eleven(), squad.bench())
    }

    fn num_players_from_clubs(&self, full_squad: &[&Player]) -> Result<(), ValidationError> {
        let mut per_club: BTreeMap<&str, usize> = BTreeMap::new();
        for player in full_squad {
            *per_club.entry(player.club.as_str()).or_default() += 1;
        }

        let limit = self.rules.club_limit();
        match per_club.into_iter().find(|&(_, count)| count > limit) {
            Some((club, count)) => Err(ValidationError::ClubLimitExceeded {
                club: club.to_string(),
                count,
                limit,
            }),
            None => Ok(()),
        }
    }

    fn num_players_in_position(
        &self,
        starting_eleven: &[Player],
        full_squad: &[&Player],
    ) -> Result<(), ValidationError> {
        for position in Position::ALL {
            let rule = self
                .rules
                .position(position)
                .ok_or(ValidationError::MissingPositionRule(position))?;

            let in_squad = full_squad.iter().filter(|p| p.position == position).count();
            if in_squad != rule.quota {
                return Err(ValidationError::PositionQuota {
                    position,
                    expected: rule.quota,
                    actual: in_squad,
                });
            }

            let starting = starting_eleven
                .iter()
                .filter(|p| p.position == position)
                .count();
            if !(rule.min_play..=rule.max_play).contains(&starting) {
                return Err(ValidationError::StartingPositionRange {
                    position,
                    actual: starting,
                    min: rule.min_play,
                    max: rule.max_play,
                });
            }
        }
        Ok(())
    }

    fn num_players_in_starting(&self, starting_eleven: &[Player]) -> Result<(), ValidationError> {
        let expected = self.rules.starting_size();
        if starting_eleven.len() != expected {
            return Err(ValidationError::StartingSize {
                expected,
                actual: starting_eleven.len(),
            });
        }
        Ok(())
    }

    fn num_players_in_squad(&self, full_squad: &[&Player]) -> Result<(), ValidationError> {
        let expected = self.rules.squad_size();
        if full_squad.len() != expected {
            return Err(ValidationError::SquadSize {
                expected,
                actual: full_squad.len(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PositionRule;

    const CLUBS: [&str; 5] = ["ARS", "CHE", "LIV", "MCI", "TOT"];

    /// A valid 4-4-2 squad spread over five clubs, three players each.
    fn valid_squad() -> (Vec<Player>, Vec<Player>) {
        let layout = [
            (Position::Goalkeeper, true),
            (Position::Defender, true),
            (Position::Defender, true),
            (Position::Defender, true),
            (Position::Defender, true),
            (Position::Midfielder, true),
            (Position::Midfielder, true),
            (Position::Midfielder, true),
            (Position::Midfielder, true),
            (Position::Forward, true),
            (Position::Forward, true),
            (Position::Goalkeeper, false),
            (Position::Defender, false),
            (Position::Midfielder, false),
            (Position::Forward, false),
        ];
        let mut starting = Vec::new();
        let mut bench = Vec::new();
        for (i, &(pos, starts)) in layout.iter().enumerate() {
            let player = Player::new(i as u32 + 1, format!("P{i}"), CLUBS[i % 5], pos, 50);
            if starts {
                starting.push(player);
            } else {
                bench.push(player);
            }
        }
        (starting, bench)
    }

    #[test]
    fn valid_squad_passes() {
        let rules = GameRuleSettings::default();
        let (starting, bench) = valid_squad();
        assert_eq!(SquadValidator::new(&rules).check(&starting, &bench), Ok(()));
    }

    #[test]
    fn club_limit_is_checked_first() {
        let rules = GameRuleSettings::default();
        let (mut starting, mut bench) = valid_squad();
        for p in starting.iter_mut().take(4) {
            p.club = "NEW".into();
        }
        // Also break the squad size; the club error must win.
        bench.pop();

        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::ClubLimitExceeded {
                club: "NEW".into(),
                count: 4,
                limit: 3
            })
        );
    }

    #[test]
    fn position_quota_is_exact() {
        let rules = GameRuleSettings::default();
        let (starting, mut bench) = valid_squad();
        bench.push(Player::new(16, "Extra", "EVE", Position::Midfielder, 45));

        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::PositionQuota {
                position: Position::Midfielder,
                expected: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn starting_range_is_checked_per_position() {
        let rules = GameRuleSettings::default();
        let (mut starting, mut bench) = valid_squad();
        // Swap the benched keeper in for a starting defender: 2 GK start.
        let gk = bench.remove(0);
        let def_idx = starting
            .iter()
            .position(|p| p.position == Position::Defender)
            .unwrap();
        let def = std::mem::replace(&mut starting[def_idx], gk);
        bench.insert(0, def);

        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::StartingPositionRange {
                position: Position::Goalkeeper,
                actual: 2,
                min: 1,
                max: 1
            })
        );
    }

    #[test]
    fn starting_size_is_checked() {
        // Loose position rules so only the size check can fail.
        let rules = GameRuleSettings::new(
            15,
            11,
            3,
            BTreeMap::from([
                (Position::Goalkeeper, PositionRule::new(2, 0, 2)),
                (Position::Defender, PositionRule::new(5, 0, 5)),
                (Position::Midfielder, PositionRule::new(5, 0, 5)),
                (Position::Forward, PositionRule::new(3, 0, 3)),
            ]),
        );
        let (mut starting, mut bench) = valid_squad();
        let moved = starting.pop().unwrap();
        bench.push(moved);

        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::StartingSize {
                expected: 11,
                actual: 10
            })
        );
    }

    #[test]
    fn squad_size_is_checked_last() {
        let rules = GameRuleSettings::new(
            16,
            11,
            3,
            BTreeMap::from([
                (Position::Goalkeeper, PositionRule::new(2, 1, 1)),
                (Position::Defender, PositionRule::new(5, 3, 5)),
                (Position::Midfielder, PositionRule::new(5, 2, 5)),
                (Position::Forward, PositionRule::new(3, 1, 3)),
            ]),
        );
        let (starting, bench) = valid_squad();

        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::SquadSize {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn missing_position_rule_is_reported() {
        let rules = GameRuleSettings::new(
            15,
            11,
            3,
            BTreeMap::from([(Position::Goalkeeper, PositionRule::new(2, 1, 1))]),
        );
        let (starting, bench) = valid_squad();
        assert_eq!(
            SquadValidator::new(&rules).check(&starting, &bench),
            Err(ValidationError::MissingPositionRule(Position::Defender))
        );
    }
}
