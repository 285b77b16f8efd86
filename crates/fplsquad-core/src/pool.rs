// Candidate pool for one optimization phase: players, their value lists, and
// the decision-variable column each player owns in that phase.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::{Player, PlayerId};

#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("player pool is empty")]
    EmptyPool,

    #[error("player {0} appears more than once in the pool")]
    DuplicatePlayer(PlayerId),

    #[error("player {0} is not in the pool")]
    UnknownPlayer(PlayerId),

    #[error("value list must contain at least one entry")]
    EmptyValues,

    #[error("value list contains a non-finite entry at index {index}")]
    NonFiniteValue { index: usize },
}

/// Ordered scalar values attached to a player.
///
/// The two uses of the list are kept apart: the first entry ranks players for
/// captaincy and bench order, the sum of all entries is the objective
/// coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ValueEntry(Vec<f64>);

impl ValueEntry {
    pub fn new(values: Vec<f64>) -> Result<Self, PoolError> {
        if values.is_empty() {
            return Err(PoolError::EmptyValues);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PoolError::NonFiniteValue { index });
        }
        Ok(ValueEntry(values))
    }

    /// Single-value convenience constructor.
    pub fn single(value: f64) -> Result<Self, PoolError> {
        ValueEntry::new(vec![value])
    }

    /// First entry; used for captaincy ranking and bench ordering.
    pub fn primary_rank_value(&self) -> f64 {
        self.0[0]
    }

    /// Sum of all entries; used as the objective coefficient.
    pub fn objective_value(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for ValueEntry {
    type Error = PoolError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        ValueEntry::new(values)
    }
}

impl From<ValueEntry> for Vec<f64> {
    fn from(entry: ValueEntry) -> Self {
        entry.0
    }
}

/// Handle to the binary variable a player owns inside one index. The column
/// number is only meaningful for the index that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionVariable {
    column: usize,
    player: PlayerId,
}

impl DecisionVariable {
    pub fn column(&self) -> usize {
        self.column
    }

    /// Identifying token mapping the variable back to its player.
    pub fn player_id(&self) -> PlayerId {
        self.player
    }
}

/// Fixed candidate pool for a single optimization phase.
#[derive(Debug, Clone)]
pub struct PlayerPoolIndex {
    players: Vec<Player>,
    values: Vec<ValueEntry>,
    columns: HashMap<PlayerId, usize>,
}

impl PlayerPoolIndex {
    /// Build an index over `(player, values)` pairs. Insertion order fixes the
    /// column order and therefore every downstream tie-break.
    pub fn new(entries: impl IntoIterator<Item = (Player, ValueEntry)>) -> Result<Self, PoolError> {
        let mut players = Vec::new();
        let mut values = Vec::new();
        let mut columns = HashMap::new();

        for (player, entry) in entries {
            if columns.insert(player.id, players.len()).is_some() {
                return Err(PoolError::DuplicatePlayer(player.id));
            }
            players.push(player);
            values.push(entry);
        }

        if players.is_empty() {
            return Err(PoolError::EmptyPool);
        }

        Ok(PlayerPoolIndex {
            players,
            values,
            columns,
        })
    }

    /// Narrow this index to the given players, giving them fresh columns.
    /// Used to scope the lineup phase to the chosen squad.
    pub fn restricted_to<'a>(
        &self,
        players: impl IntoIterator<Item = &'a Player>,
    ) -> Result<PlayerPoolIndex, PoolError> {
        let mut entries = Vec::new();
        for player in players {
            let column = self.column_of(player.id)?;
            entries.push((self.players[column].clone(), self.values[column].clone()));
        }
        PlayerPoolIndex::new(entries)
    }

    pub fn player_pool(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.columns.contains_key(&id)
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, PoolError> {
        self.column_of(id).map(|c| &self.players[c])
    }

    pub fn decision_variable(&self, player: &Player) -> Result<DecisionVariable, PoolError> {
        let column = self.column_of(player.id)?;
        Ok(DecisionVariable {
            column,
            player: player.id,
        })
    }

    pub fn value_sum(&self, player: &Player) -> Result<f64, PoolError> {
        self.values(player).map(ValueEntry::objective_value)
    }

    pub fn values(&self, player: &Player) -> Result<&ValueEntry, PoolError> {
        self.column_of(player.id).map(|c| &self.values[c])
    }

    /// Iterate `(variable, player, values)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (DecisionVariable, &Player, &ValueEntry)> + '_ {
        self.players
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(column, (player, values))| {
                let var = DecisionVariable {
                    column,
                    player: player.id,
                };
                (var, player, values)
            })
    }

    fn column_of(&self, id: PlayerId) -> Result<usize, PoolError> {
        self.columns
            .get(&id)
            .copied()
            .ok_or(PoolError::UnknownPlayer(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Position;

    fn entry(values: &[f64]) -> ValueEntry {
        ValueEntry::new(values.to_vec()).unwrap()
    }

    fn small_index() -> PlayerPoolIndex {
        PlayerPoolIndex::new(vec![
            (Player::new(10, "Keeper", "ARS", Position::Goalkeeper, 45), entry(&[2.0, 1.0])),
            (Player::new(20, "Back", "CHE", Position::Defender, 50), entry(&[4.5])),
            (Player::new(30, "Wide", "LIV", Position::Midfielder, 80), entry(&[6.0, -1.0, 0.5])),
        ])
        .unwrap()
    }

    #[test]
    fn value_entry_separates_rank_from_objective() {
        let v = entry(&[3.0, 1.5, 0.5]);
        assert_eq!(v.primary_rank_value(), 3.0);
        assert_eq!(v.objective_value(), 5.0);
    }

    #[test]
    fn value_entry_rejects_empty_and_non_finite() {
        assert_eq!(ValueEntry::new(vec![]), Err(PoolError::EmptyValues));
        assert_eq!(
            ValueEntry::new(vec![1.0, f64::NAN]),
            Err(PoolError::NonFiniteValue { index: 1 })
        );
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = PlayerPoolIndex::new(Vec::new()).unwrap_err();
        assert_eq!(err, PoolError::EmptyPool);
    }

    #[test]
    fn duplicate_player_is_rejected() {
        let p = Player::new(1, "Dup", "ARS", Position::Forward, 70);
        let err = PlayerPoolIndex::new(vec![(p.clone(), entry(&[1.0])), (p, entry(&[2.0]))])
            .unwrap_err();
        assert_eq!(err, PoolError::DuplicatePlayer(PlayerId(1)));
    }

    #[test]
    fn lookups_follow_insertion_order() {
        let index = small_index();
        let ids: Vec<u32> = index.player_pool().iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        let wide = index.player(PlayerId(30)).unwrap().clone();
        let var = index.decision_variable(&wide).unwrap();
        assert_eq!(var.column(), 2);
        assert_eq!(var.player_id(), PlayerId(30));
        assert_eq!(index.value_sum(&wide).unwrap(), 5.5);
        assert_eq!(index.values(&wide).unwrap().as_slice(), &[6.0, -1.0, 0.5]);
    }

    #[test]
    fn decision_variable_for_unknown_player_fails() {
        let index = small_index();
        let stranger = Player::new(99, "Stranger", "MUN", Position::Forward, 60);
        assert_eq!(
            index.decision_variable(&stranger),
            Err(PoolError::UnknownPlayer(PlayerId(99)))
        );
    }

    #[test]
    fn restricted_index_issues_fresh_columns() {
        let index = small_index();
        let chosen = vec![
            index.player(PlayerId(30)).unwrap().clone(),
            index.player(PlayerId(10)).unwrap().clone(),
        ];
        let narrow = index.restricted_to(&chosen).unwrap();
        assert_eq!(narrow.len(), 2);
        assert_eq!(narrow.decision_variable(&chosen[0]).unwrap().column(), 0);
        assert!(!narrow.contains(PlayerId(20)));
        assert_eq!(narrow.value_sum(&chosen[1]).unwrap(), 3.0);
    }
}
