// Player pool loading from a catalogue CSV export.
//
// Expected header: `id,name,club,position,cost` followed by one or more
// numeric value columns (projected points, form, ...). Value columns are kept
// in file order unless a column list is given, and the first one becomes the
// primary rank value.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::player::{Player, PlayerId, Position};
use crate::pool::ValueEntry;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("value column `{0}` not found in header")]
    MissingValueColumn(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Fixed leading columns of a catalogue row. Value columns are read
/// separately by header position.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: u32,
    name: String,
    club: String,
    position: String,
    cost: u32,
}

const FIXED_COLUMNS: [&str; 5] = ["id", "name", "club", "position", "cost"];

// ---------------------------------------------------------------------------
// Reader-based loader
// ---------------------------------------------------------------------------

/// Column indices holding player values, in the order they should appear in
/// each player's value list.
fn value_column_indices(
    headers: &csv::StringRecord,
    value_columns: &[String],
) -> Result<Vec<usize>, CatalogueError> {
    if value_columns.is_empty() {
        return Ok(headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !FIXED_COLUMNS.contains(&h.trim()))
            .map(|(i, _)| i)
            .collect());
    }

    let by_name: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();
    value_columns
        .iter()
        .map(|name| {
            by_name
                .get(name.as_str())
                .copied()
                .ok_or_else(|| CatalogueError::MissingValueColumn(name.clone()))
        })
        .collect()
}

fn load_pool_from_reader<R: Read>(
    rdr: R,
    value_columns: &[String],
) -> Result<Vec<(Player, ValueEntry)>, CatalogueError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let csv_err = |source| CatalogueError::Csv {
        path: "<reader>".into(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let value_indices = value_column_indices(&headers, value_columns)?;
    if value_indices.is_empty() {
        return Err(CatalogueError::Validation(
            "CSV has no value columns after the fixed player columns".into(),
        ));
    }

    let mut pool = Vec::new();
    let mut seen: HashMap<PlayerId, usize> = HashMap::new();

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let raw: RawPlayerRow = match record.deserialize(Some(&headers)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };

        let Some(position) = Position::from_str_pos(&raw.position) else {
            warn!("skipping player '{}': unknown position '{}'", raw.name, raw.position);
            continue;
        };

        let values: Result<Vec<f64>, _> = value_indices
            .iter()
            .map(|&i| record.get(i).unwrap_or("").parse::<f64>())
            .collect();
        let values = match values.ok().map(ValueEntry::new) {
            Some(Ok(v)) => v,
            _ => {
                warn!("skipping player '{}': missing or non-finite value", raw.name);
                continue;
            }
        };

        let player = Player {
            id: PlayerId(raw.id),
            name: raw.name,
            club: raw.club,
            position,
            cost: raw.cost,
        };
        if let Some(&at) = seen.get(&player.id) {
            warn!("duplicate player id {}, using latest row", player.id);
            pool[at] = (player, values);
        } else {
            seen.insert(player.id, pool.len());
            pool.push((player, values));
        }
    }

    Ok(pool)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the candidate pool from a catalogue CSV file.
///
/// `value_columns` picks and orders the value columns; empty means every
/// non-fixed column in file order.
pub fn load_pool(
    path: &Path,
    value_columns: &[String],
) -> Result<Vec<(Player, ValueEntry)>, CatalogueError> {
    let file = std::fs::File::open(path).map_err(|e| CatalogueError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let pool = load_pool_from_reader(file, value_columns).map_err(|e| match e {
        CatalogueError::Csv { source, .. } => CatalogueError::Csv {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })?;

    if pool.is_empty() {
        return Err(CatalogueError::Validation(format!(
            "{} produced zero valid player rows",
            path.display()
        )));
    }
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
id,name,club,position,cost,xp,form
1,Raya,ARS,GKP,55,4.5,3.0
2,Saliba,ARS,DEF,60,5.0,4.0
3,Salah,LIV,MID,130,8.5,7.5
4,Haaland,MCI,FWD,150,9.0,6.0
";

    #[test]
    fn loads_all_value_columns_in_file_order() {
        let pool = load_pool_from_reader(SAMPLE.as_bytes(), &[]).unwrap();
        assert_eq!(pool.len(), 4);

        let (salah, values) = &pool[2];
        assert_eq!(salah.name, "Salah");
        assert_eq!(salah.club, "LIV");
        assert_eq!(salah.position, Position::Midfielder);
        assert_eq!(salah.cost, 130);
        assert_eq!(values.as_slice(), &[8.5, 7.5]);
        assert_eq!(values.primary_rank_value(), 8.5);
    }

    #[test]
    fn selected_value_columns_set_the_order() {
        let columns = vec!["form".to_string(), "xp".to_string()];
        let pool = load_pool_from_reader(SAMPLE.as_bytes(), &columns).unwrap();
        assert_eq!(pool[0].1.as_slice(), &[3.0, 4.5]);
    }

    #[test]
    fn unknown_value_column_is_an_error() {
        let columns = vec!["ict".to_string()];
        let err = load_pool_from_reader(SAMPLE.as_bytes(), &columns).unwrap_err();
        assert!(matches!(err, CatalogueError::MissingValueColumn(c) if c == "ict"));
    }

    #[test]
    fn bad_rows_are_skipped() {
        let data = "\
id,name,club,position,cost,xp
1,Keeper,ARS,GKP,45,2.0
2,Nobody,ARS,COACH,45,2.0
3,Broken,ARS,DEF,cheap,2.0
4,Blank,ARS,DEF,45,
5,Fine,CHE,MID,50,3.5
";
        let pool = load_pool_from_reader(data.as_bytes(), &[]).unwrap();
        let ids: Vec<u32> = pool.iter().map(|(p, _)| p.id.0).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn duplicate_ids_keep_the_latest_row() {
        let data = "\
id,name,club,position,cost,xp
7,Old,ARS,MID,60,1.0
7,New,ARS,MID,65,2.0
";
        let pool = load_pool_from_reader(data.as_bytes(), &[]).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].0.name, "New");
        assert_eq!(pool[0].0.cost, 65);
    }

    #[test]
    fn header_without_value_columns_is_rejected() {
        let data = "id,name,club,position,cost\n1,A,ARS,GKP,45\n";
        let err = load_pool_from_reader(data.as_bytes(), &[]).unwrap_err();
        assert!(matches!(err, CatalogueError::Validation(_)));
    }

    #[test]
    fn load_pool_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let pool = load_pool(file.path(), &[]).unwrap();
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn empty_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"id,name,club,position,cost,xp\n").unwrap();
        let err = load_pool(file.path(), &[]).unwrap_err();
        assert!(matches!(err, CatalogueError::Validation(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_pool(Path::new("/nonexistent/players.csv"), &[]).unwrap_err();
        assert!(matches!(err, CatalogueError::Io { .. }));
    }
}
