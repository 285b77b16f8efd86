// Squad result: starting eleven, ordered bench, captaincy.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::player::{total_cost, Player, PlayerId, Position};

#[derive(Debug, Error, PartialEq)]
pub enum SquadError {
    #[error("captain {0} is not in the starting eleven")]
    CaptainNotStarting(PlayerId),

    #[error("vice-captain {0} is not in the starting eleven")]
    ViceCaptainNotStarting(PlayerId),

    #[error("player {0} cannot be both captain and vice-captain")]
    SameCaptainAndVice(PlayerId),
}

/// Starters per position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Formation {
    counts: BTreeMap<Position, usize>,
}

impl Formation {
    pub fn from_players<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut counts: BTreeMap<Position, usize> =
            Position::ALL.iter().map(|&p| (p, 0)).collect();
        for player in players {
            *counts.entry(player.position).or_default() += 1;
        }
        Formation { counts }
    }

    pub fn count(&self, position: Position) -> usize {
        self.counts.get(&position).copied().unwrap_or(0)
    }
}

impl fmt::Display for Formation {
    /// Outfield counts joined by dashes, e.g. "4-4-2".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Position::ALL
            .iter()
            .filter(|p| !p.is_goalkeeper())
            .map(|&p| self.count(p).to_string())
            .collect();
        write!(f, "{}", parts.join("-"))
    }
}

/// A fifteen-player squad split into a starting eleven and an ordered bench.
///
/// Captaincy is held as slots in `starting_eleven`, so a captain is always a
/// starter by construction.
#[derive(Debug, Clone, Serialize)]
pub struct Squad {
    starting_eleven: Vec<Player>,
    bench: Vec<Player>,
    captain_slot: usize,
    vice_captain_slot: usize,
}

impl Squad {
    /// Assemble a squad. Captain and vice-captain must be distinct starters;
    /// the remaining game rules are checked separately by `SquadValidator`.
    pub fn new(
        starting_eleven: Vec<Player>,
        bench: Vec<Player>,
        captain: PlayerId,
        vice_captain: PlayerId,
    ) -> Result<Self, SquadError> {
        let (captain_slot, vice_captain_slot) =
            captaincy_slots(&starting_eleven, captain, vice_captain)?;
        Ok(Squad {
            starting_eleven,
            bench,
            captain_slot,
            vice_captain_slot,
        })
    }

    pub fn starting_eleven(&self) -> &[Player] {
        &self.starting_eleven
    }

    pub fn bench(&self) -> &[Player] {
        &self.bench
    }

    /// Starters followed by the bench.
    pub fn full_squad(&self) -> impl Iterator<Item = &Player> + '_ {
        self.starting_eleven.iter().chain(&self.bench)
    }

    pub fn captain(&self) -> &Player {
        &self.starting_eleven[self.captain_slot]
    }

    pub fn vice_captain(&self) -> &Player {
        &self.starting_eleven[self.vice_captain_slot]
    }

    pub fn set_captain(&mut self, captain: PlayerId) -> Result<(), SquadError> {
        let vice_captain = self.vice_captain().id;
        let (slot, _) = captaincy_slots(&self.starting_eleven, captain, vice_captain)?;
        self.captain_slot = slot;
        Ok(())
    }

    pub fn set_vice_captain(&mut self, vice_captain: PlayerId) -> Result<(), SquadError> {
        let captain = self.captain().id;
        let (_, slot) = captaincy_slots(&self.starting_eleven, captain, vice_captain)?;
        self.vice_captain_slot = slot;
        Ok(())
    }

    pub fn formation(&self) -> Formation {
        Formation::from_players(&self.starting_eleven)
    }

    /// Total price of all squad members.
    pub fn cost(&self) -> u32 {
        total_cost(self.full_squad())
    }
}

/// Positions of captain and vice-captain in `starting`.
fn captaincy_slots(
    starting: &[Player],
    captain: PlayerId,
    vice_captain: PlayerId,
) -> Result<(usize, usize), SquadError> {
    let slot_of = |id: PlayerId| starting.iter().position(|p| p.id == id);
    let captain_slot = slot_of(captain).ok_or(SquadError::CaptainNotStarting(captain))?;
    let vice_slot =
        slot_of(vice_captain).ok_or(SquadError::ViceCaptainNotStarting(vice_captain))?;
    if captain == vice_captain {
        return Err(SquadError::SameCaptainAndVice(captain));
    }
    Ok((captain_slot, vice_slot))
}

fn quoted_names<'a>(players: impl Iterator<Item = &'a Player>) -> String {
    players
        .map(|p| format!("'{}'", p.name))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Squad {
    /// One centred row of quoted names per position, a rule, then the bench.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<String> = Position::ALL
            .iter()
            .map(|&pos| quoted_names(self.starting_eleven.iter().filter(|p| p.position == pos)))
            .collect();
        let bench = quoted_names(self.bench.iter());

        let width = rows
            .iter()
            .chain(std::iter::once(&bench))
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0);

        rows.push("-".repeat(width));
        rows.push(bench);
        let lines: Vec<String> = rows.iter().map(|r| format!("{r:^width$}")).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u32, name: &str, pos: Position, cost: u32) -> Player {
        Player::new(id, name, "ARS", pos, cost)
    }

    /// 4-4-2 starting eleven plus a four-man bench.
    fn four_four_two() -> (Vec<Player>, Vec<Player>) {
        let starting = vec![
            p(1, "Keeper", Position::Goalkeeper, 50),
            p(2, "D1", Position::Defender, 45),
            p(3, "D2", Position::Defender, 45),
            p(4, "D3", Position::Defender, 45),
            p(5, "D4", Position::Defender, 45),
            p(6, "M1", Position::Midfielder, 80),
            p(7, "M2", Position::Midfielder, 80),
            p(8, "M3", Position::Midfielder, 80),
            p(9, "M4", Position::Midfielder, 80),
            p(10, "F1", Position::Forward, 100),
            p(11, "F2", Position::Forward, 100),
        ];
        let bench = vec![
            p(12, "S", Position::Goalkeeper, 40),
            p(13, "D5", Position::Defender, 40),
            p(14, "M5", Position::Midfielder, 45),
            p(15, "F3", Position::Forward, 45),
        ];
        (starting, bench)
    }

    #[test]
    fn formation_ignores_goalkeeper() {
        let (starting, _) = four_four_two();
        let formation = Formation::from_players(&starting);
        assert_eq!(formation.to_string(), "4-4-2");
        assert_eq!(formation.count(Position::Goalkeeper), 1);
    }

    #[test]
    fn cost_covers_starters_and_bench() {
        let (starting, bench) = four_four_two();
        let squad = Squad::new(starting, bench, PlayerId(10), PlayerId(6)).unwrap();
        assert_eq!(squad.cost(), 50 + 4 * 45 + 4 * 80 + 2 * 100 + 40 + 40 + 45 + 45);
        assert_eq!(squad.full_squad().count(), 15);
        assert_eq!(squad.captain().name, "F1");
        assert_eq!(squad.vice_captain().name, "M1");
    }

    #[test]
    fn captain_must_start() {
        let (starting, bench) = four_four_two();
        let err = Squad::new(starting, bench, PlayerId(12), PlayerId(6)).unwrap_err();
        assert_eq!(err, SquadError::CaptainNotStarting(PlayerId(12)));
    }

    #[test]
    fn reassigning_captaincy_rechecks_membership() {
        let (starting, bench) = four_four_two();
        let mut squad = Squad::new(starting, bench, PlayerId(10), PlayerId(6)).unwrap();

        squad.set_captain(PlayerId(1)).unwrap();
        assert_eq!(squad.captain().id, PlayerId(1));

        assert_eq!(
            squad.set_vice_captain(PlayerId(13)),
            Err(SquadError::ViceCaptainNotStarting(PlayerId(13)))
        );
        assert_eq!(squad.vice_captain().id, PlayerId(6));
    }

    #[test]
    fn captaincy_resolves_to_the_named_starter() {
        let (starting, bench) = four_four_two();
        let ids: Vec<PlayerId> = starting.iter().map(|p| p.id).collect();
        let mut squad = Squad::new(starting, bench, PlayerId(10), PlayerId(6)).unwrap();

        for &id in &ids {
            if id == squad.vice_captain().id {
                continue;
            }
            squad.set_captain(id).unwrap();
            assert_eq!(squad.captain().id, id);
            assert_eq!(squad.vice_captain().id, PlayerId(6));
        }

        // A rejected change leaves both armbands where they were.
        let before = (squad.captain().id, squad.vice_captain().id);
        assert!(squad.set_captain(PlayerId(14)).is_err());
        assert_eq!((squad.captain().id, squad.vice_captain().id), before);
    }

    #[test]
    fn captain_and_vice_must_differ() {
        let (starting, bench) = four_four_two();
        let mut squad = Squad::new(starting, bench, PlayerId(10), PlayerId(6)).unwrap();
        assert_eq!(
            squad.set_vice_captain(PlayerId(10)),
            Err(SquadError::SameCaptainAndVice(PlayerId(10)))
        );
    }

    #[test]
    fn display_centres_rows_over_bench() {
        let (starting, bench) = four_four_two();
        let squad = Squad::new(starting, bench, PlayerId(10), PlayerId(6)).unwrap();
        let rendered = squad.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "'D1' 'D2' 'D3' 'D4'");
        assert!(lines[0].trim() == "'Keeper'");
        assert!(lines[4].chars().all(|c| c == '-'));
        assert_eq!(lines[5].trim(), "'S' 'D5' 'M5' 'F3'");
        assert!(lines.iter().all(|l| l.chars().count() == lines[1].chars().count()));
    }
}
