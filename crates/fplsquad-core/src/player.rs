// Player records consumed from the catalogue, and the closed set of positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable catalogue identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playing positions. Declaration order is the canonical display order and
/// the order in which per-position rules are applied and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Accepts the short catalogue names ("GK"/"GKP", "DEF", "MID", "FWD"),
    /// a few common aliases, and the numeric element-type ids 1-4.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GKP" | "G" | "1" => Some(Position::Goalkeeper),
            "DEF" | "D" | "2" => Some(Position::Defender),
            "MID" | "M" | "3" => Some(Position::Midfielder),
            "FWD" | "FW" | "F" | "4" => Some(Position::Forward),
            _ => None,
        }
    }

    /// Return the short display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn is_goalkeeper(&self) -> bool {
        matches!(self, Position::Goalkeeper)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A player as supplied by the catalogue. Immutable for the duration of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Club short name; at most `club_limit` squad members may share one.
    pub club: String,
    pub position: Position,
    /// Price in tenths of a million (FPL `now_cost`), e.g. 55 = 5.5m.
    pub cost: u32,
}

impl Player {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        club: impl Into<String>,
        position: Position,
        cost: u32,
    ) -> Self {
        Player {
            id: PlayerId(id),
            name: name.into(),
            club: club.into(),
            position,
            cost,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}, {})", self.name, self.club, self.position, self.id)
    }
}

/// Total cost of a group of players.
pub fn total_cost<'a>(players: impl IntoIterator<Item = &'a Player>) -> u32 {
    players.into_iter().map(|p| p.cost).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalogue_short_names() {
        assert_eq!(Position::from_str_pos("GKP"), Some(Position::Goalkeeper));
        assert_eq!(Position::from_str_pos("gk"), Some(Position::Goalkeeper));
        assert_eq!(Position::from_str_pos("DEF"), Some(Position::Defender));
        assert_eq!(Position::from_str_pos(" mid "), Some(Position::Midfielder));
        assert_eq!(Position::from_str_pos("FWD"), Some(Position::Forward));
        assert_eq!(Position::from_str_pos("3"), Some(Position::Midfielder));
        assert_eq!(Position::from_str_pos("ST"), None);
    }

    #[test]
    fn display_round_trips_through_parser() {
        for pos in Position::ALL {
            assert_eq!(Position::from_str_pos(pos.display_str()), Some(pos));
        }
    }

    #[test]
    fn canonical_order_starts_with_goalkeeper() {
        let mut shuffled = vec![
            Position::Forward,
            Position::Goalkeeper,
            Position::Midfielder,
            Position::Defender,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Position::ALL.to_vec());
    }

    #[test]
    fn total_cost_sums_prices() {
        let players = vec![
            Player::new(1, "A", "ARS", Position::Goalkeeper, 45),
            Player::new(2, "B", "CHE", Position::Defender, 60),
        ];
        assert_eq!(total_cost(&players), 105);
        assert_eq!(total_cost(&Vec::<Player>::new()), 0);
    }
}
