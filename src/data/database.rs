//! SQLite loader for scraped tables
//!
//! Every `Table` is upserted by its key columns. SQL tables are created on
//! first use and gain columns as pages reveal new stat names.

use crate::{GridironError, Result, Table, Value};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Tables the scrapers emit
pub const KNOWN_TABLES: [&str; 9] = [
    "season_info",
    "season_team_seeds",
    "team_season_info",
    "game_info",
    "game_stats",
    "game_player_stats",
    "game_drives",
    "player_profile",
    "allpro_votes",
];

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Bool(b) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Quote an identifier; stat names carry spaces and punctuation
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Database { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Database { conn })
    }

    /// Column names of an existing SQL table, empty if it does not exist
    pub fn table_columns(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(name)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Create the SQL table for `table` or add any columns it lacks
    fn ensure_schema(&self, table: &Table) -> Result<()> {
        let existing = self.table_columns(table.name())?;
        if existing.is_empty() {
            let columns: Vec<String> = table.columns().iter().map(|c| quote(c)).collect();
            let key: Vec<String> = table.key().iter().map(|c| quote(c)).collect();
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
                quote(table.name()),
                columns.join(", "),
                key.join(", ")
            ))?;
            log::debug!("Created table {}", table.name());
            return Ok(());
        }

        for column in table.columns() {
            if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                self.conn.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote(table.name()),
                    quote(column)
                ))?;
                log::debug!("Added column {}.{}", table.name(), column);
            }
        }
        Ok(())
    }

    /// Insert or update every row of `table` by its key.
    ///
    /// A null in a re-scraped row keeps the stored value. Rows with a null
    /// key column are skipped.
    pub fn upsert_table(&mut self, table: &Table) -> Result<usize> {
        if table.key().is_empty() {
            return Err(GridironError::Config(format!(
                "table {} has no key columns",
                table.name()
            )));
        }
        self.ensure_schema(table)?;

        let columns = table.columns();
        let column_list: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let key_list: Vec<String> = table.key().iter().map(|c| quote(c)).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !table.key().contains(&c.as_str()))
            .map(|c| {
                let c = quote(c);
                format!("{c} = COALESCE(excluded.{c}, {c})")
            })
            .collect();
        let conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            quote(table.name()),
            column_list.join(", "),
            placeholders.join(", "),
            key_list.join(", "),
            conflict
        );

        let key_idx: Vec<usize> = table
            .key()
            .iter()
            .filter_map(|k| columns.iter().position(|c| c.as_str() == *k))
            .collect();

        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (i, row) in table.values().enumerate() {
                if key_idx.iter().any(|&k| row[k].is_null()) {
                    log::warn!("{}: skipping row {} with null key", table.name(), i);
                    continue;
                }
                stmt.execute(params_from_iter(row.iter()))?;
                count += 1;
            }
        }
        tx.commit()?;

        log::info!("Upserted {} rows into {}", count, table.name());
        Ok(count)
    }

    /// Upsert several tables; returns total rows written
    pub fn upsert_tables(&mut self, tables: &[Table]) -> Result<usize> {
        let mut count = 0;
        for table in tables {
            count += self.upsert_table(table)?;
        }
        Ok(count)
    }

    /// Read one column for the row matching a single-column key (for checks)
    pub fn lookup(&self, name: &str, key: &str, key_value: &str, column: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT CAST({} AS TEXT) FROM {} WHERE {} = ?1",
            quote(column),
            quote(name),
            quote(key)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([key_value])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn stats_table(rows: &[(&str, &str, Value)]) -> Table {
        let mut table = Table::new("game_stats", &["game_id", "team_id"]);
        for (game, team, first_downs) in rows {
            table.push(
                Record::new()
                    .with("game_id", *game)
                    .with("team_id", *team)
                    .with("First Downs", first_downs.clone()),
            );
        }
        table
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut db = Database::in_memory().unwrap();
        let table = stats_table(&[
            ("2022_htx_kan_15", "kan", Value::text("24")),
            ("2022_htx_kan_15", "htx", Value::text("18")),
        ]);
        assert_eq!(db.upsert_table(&table).unwrap(), 2);
        assert_eq!(db.upsert_table(&table).unwrap(), 2);
        assert_eq!(db.row_count("game_stats").unwrap(), 2);
    }

    #[test]
    fn test_new_columns_are_added() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_table(&stats_table(&[("g1", "kan", Value::text("24"))]))
            .unwrap();

        let mut wider = stats_table(&[("g2", "sfo", Value::text("20"))]);
        wider.fill("Net Pass Yards", "301");
        db.upsert_table(&wider).unwrap();

        let columns = db.table_columns("game_stats").unwrap();
        assert!(columns.iter().any(|c| c == "Net Pass Yards"));
        assert_eq!(db.row_count("game_stats").unwrap(), 2);
    }

    #[test]
    fn test_column_case_matches_existing_schema() {
        let mut db = Database::in_memory().unwrap();
        let mut first = Table::new("game_info", &["game_id"]);
        first.push(Record::new().with("game_id", "g1").with("Stadium", "Arrowhead"));
        db.upsert_table(&first).unwrap();

        let mut second = Table::new("game_info", &["game_id"]);
        second.push(Record::new().with("game_id", "g2").with("stadium", "NRG Stadium"));
        assert_eq!(db.upsert_table(&second).unwrap(), 1);

        assert_eq!(db.table_columns("game_info").unwrap().len(), 2);
        assert_eq!(
            db.lookup("game_info", "game_id", "g2", "Stadium").unwrap(),
            Some("NRG Stadium".to_string())
        );
    }

    #[test]
    fn test_null_does_not_overwrite() {
        let mut db = Database::in_memory().unwrap();
        let mut info = Table::new("player_profile", &["player_id"]);
        info.push(Record::new().with("player_id", "MahoPa00").with("weight", "225"));
        db.upsert_table(&info).unwrap();

        let mut rescrape = Table::new("player_profile", &["player_id"]);
        rescrape.push(Record::new().with("player_id", "MahoPa00").with("weight", Value::Null));
        db.upsert_table(&rescrape).unwrap();

        assert_eq!(
            db.lookup("player_profile", "player_id", "MahoPa00", "weight").unwrap(),
            Some("225".to_string())
        );
    }

    #[test]
    fn test_null_key_rows_skipped() {
        let mut db = Database::in_memory().unwrap();
        let mut table = Table::new("player_profile", &["player_id"]);
        table.push(Record::new().with("name", "nobody"));
        table.push(Record::new().with("player_id", "KelcTr00"));
        assert_eq!(db.upsert_table(&table).unwrap(), 1);
    }

    #[test]
    fn test_bool_and_int_values() {
        let mut db = Database::in_memory().unwrap();
        let mut table = Table::new("game_info", &["game_id"]);
        table.push(
            Record::new()
                .with("game_id", "g1")
                .with("overtime", true)
                .with("home_points", 21i64),
        );
        db.upsert_table(&table).unwrap();
        assert_eq!(
            db.lookup("game_info", "game_id", "g1", "overtime").unwrap(),
            Some("1".to_string())
        );
        assert_eq!(
            db.lookup("game_info", "game_id", "g1", "home_points").unwrap(),
            Some("21".to_string())
        );
    }
}
