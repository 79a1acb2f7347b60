//! Game (boxscore) page scraper
//!
//! Resolves game identity from the week heading and the linescore, then
//! extracts game info, per-team stats, per-player stats and drives.

use super::drives::{ScoringLog, Side};
use super::ids;
use super::{strip_label, Scraper};
use crate::data::page::{self, attr, body_rows, cells, children, first, select, text};
use crate::{
    Filtered, GridironError, Page, PageKind, PlayerId, Record, Result, Table, TeamId, Value,
};
use scraper::ElementRef;
use std::collections::{BTreeSet, HashMap};

const SEASON_WEEK_SCORES_DIV_ID: &str = "div_other_scores";
const SCOREBOX_DIV_ID: &str = "scorebox";
const SCOREBOX_META_DIV_ID: &str = "scorebox_meta";
const LINESCORE_TABLE_CLASS: &str = "linescore";
const GAME_INFO_TABLE_ID: &str = "game_info";
const TEAM_STATS_TABLE_ID: &str = "team_stats";
const GAME_SUMMARIES_DIV_CLASS: &str = "game_summaries";

const SNAPCOUNT_HOME_TEAM_TABLE_ID: &str = "home_snap_counts";
const SNAPCOUNT_VISITING_TEAM_TABLE_ID: &str = "vis_snap_counts";
const HOME_DRIVES_TABLE_ID: &str = "home_drives";
const VIS_DRIVES_TABLE_ID: &str = "vis_drives";
const SCORING_TABLE_ID: &str = "scoring";

/// Required per-player tables
const PLAYER_GENERAL_STATS_TABLE_IDS: [&str; 3] = ["player_offense", "player_defense", "kicking"];

/// Per-player tables merged when present
const PLAYER_ADVANCED_STATS_TABLE_IDS: [&str; 7] = [
    "returns",
    "passing_advanced",
    "rushing_advanced",
    "receiving_advanced",
    "defense_advanced",
    SNAPCOUNT_HOME_TEAM_TABLE_ID,
    SNAPCOUNT_VISITING_TEAM_TABLE_ID,
];

/// Linescore rows: 4 quarters + total, plus one overtime column when played
const LINESCORE_CELLS: usize = 7;
const LINESCORE_CELLS_OT: usize = 8;

/// Drive rows: number, quarter, start clock, start position, plays, duration, net yards, result
const DRIVE_CELLS: usize = 8;

/// Who played, when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    pub season_year: i64,
    pub season_week: i64,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub game_id: String,
}

impl GameIdentity {
    pub fn new(season_year: i64, season_week: i64, home: TeamId, away: TeamId) -> Self {
        let game_id = format!("{}_{}_{}_{}", season_year, home, away, season_week);
        GameIdentity {
            season_year,
            season_week,
            home_team_id: home,
            away_team_id: away,
            game_id,
        }
    }
}

/// One team's linescore row
#[derive(Debug, Clone)]
struct LinescoreRow {
    team_id: TeamId,
    cell_count: usize,
    /// Quarter scores, optional overtime, then the total
    scores: Vec<Option<i64>>,
}

impl LinescoreRow {
    fn total(&self) -> Option<i64> {
        self.scores.last().copied().flatten()
    }
}

/// Scraper over one loaded boxscore page
pub struct GamePageScraper<'p> {
    page: &'p Page,
    identity: GameIdentity,
    /// Row 0 is the visitor, row 1 the home team
    linescore: [LinescoreRow; 2],
}

impl<'p> GamePageScraper<'p> {
    /// Resolve game identity; fails if the week heading or linescore is unusable
    pub fn new(page: &'p Page) -> Result<Self> {
        let (season_year, season_week) = Self::season_and_week(page)?;
        let [away, home] = Self::parse_linescore(page)?;
        let identity = GameIdentity::new(
            season_year,
            season_week,
            home.team_id.clone(),
            away.team_id.clone(),
        );
        log::debug!("Resolved game {} from {}", identity.game_id, page.url());

        Ok(GamePageScraper {
            page,
            identity,
            linescore: [away, home],
        })
    }

    pub fn identity(&self) -> &GameIdentity {
        &self.identity
    }

    pub fn game_id(&self) -> &str {
        &self.identity.game_id
    }

    fn season_and_week(page: &Page) -> Result<(i64, i64)> {
        let div = page.require_div(SEASON_WEEK_SCORES_DIV_ID)?;
        let h2 = first(div, "h2")?.ok_or_else(|| {
            GridironError::missing(format!("<h2> in div '{}'", SEASON_WEEK_SCORES_DIV_ID), page.url())
        })?;
        let href = page::link_href(h2)?.ok_or_else(|| {
            GridironError::missing(
                format!("<a href> in <h2> of div '{}'", SEASON_WEEK_SCORES_DIV_ID),
                page.url(),
            )
        })?;
        ids::season_week_from_href(href).ok_or_else(|| GridironError::Unresolved {
            what: "season week",
            input: href.to_string(),
        })
    }

    fn parse_linescore(page: &Page) -> Result<[LinescoreRow; 2]> {
        let table = page.require_table(LINESCORE_TABLE_CLASS)?;
        let rows = body_rows(table)?;
        if rows.len() != 2 {
            return Err(GridironError::malformed(
                "linescore table",
                format!("{} rows found, expected 2", rows.len()),
            ));
        }

        let parse_row = |row: ElementRef<'_>, side: &str| -> Result<LinescoreRow> {
            let tds = select(row, "td")?;
            let href = tds
                .get(1)
                .map(|td| page::link_href(*td))
                .transpose()?
                .flatten()
                .ok_or_else(|| {
                    GridironError::missing(format!("{} team link in linescore", side), page.url())
                })?;
            let team_id = ids::team_id_from_href(href).ok_or_else(|| GridironError::Unresolved {
                what: "team id",
                input: href.to_string(),
            })?;
            let scores = tds
                .iter()
                .skip(2)
                .map(|td| {
                    let t = text(*td);
                    if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) {
                        t.parse().ok()
                    } else {
                        None
                    }
                })
                .collect();
            Ok(LinescoreRow {
                team_id,
                cell_count: tds.len(),
                scores,
            })
        };

        Ok([parse_row(rows[0], "away")?, parse_row(rows[1], "home")?])
    }

    // ---------------------------------------------
    // Game info
    // ---------------------------------------------

    /// One `game_info` row: info table, scorebox and linescore-derived fields
    pub fn game_info(&self) -> Result<Table> {
        let mut info = Record::new().with("url", self.page.url());
        self.parse_game_info_table(&mut info)?;
        self.parse_scorebox(&mut info)?;
        self.parse_linescore_general_info(&mut info)?;
        info.set("game_id", self.identity.game_id.as_str());

        let mut table = Table::new("game_info", &["game_id"]);
        table.push(info);
        Ok(table)
    }

    fn parse_game_info_table(&self, info: &mut Record) -> Result<()> {
        let table = self.page.require_table(GAME_INFO_TABLE_ID)?;
        let rows = select(table, "tr")?;
        if rows.is_empty() {
            return Err(GridironError::malformed(
                format!("table '{}'", GAME_INFO_TABLE_ID),
                "no rows found",
            ));
        }

        // First row is the caption header
        for (i, row) in rows.iter().enumerate().skip(1) {
            let header = first(*row, "th")?;
            let value = first(*row, "td")?;
            let (Some(header), Some(value)) = (header, value) else {
                return Err(GridironError::malformed(
                    format!("table '{}'", GAME_INFO_TABLE_ID),
                    format!("header or value missing at row {}", i),
                ));
            };
            let header = text(header);
            if header.is_empty() {
                log::debug!("Unlabelled game info row {} on {}", i, self.page.url());
                continue;
            }
            info.set(header, Value::text(text(value)));
        }
        Ok(())
    }

    fn parse_scorebox(&self, info: &mut Record) -> Result<()> {
        let scorebox = self.page.require_div(SCOREBOX_DIV_ID)?;
        let team_divs = children(scorebox, "div");
        if team_divs.len() < 2 {
            return Err(GridironError::malformed(
                "scorebox",
                format!("{} team blocks found, expected 2", team_divs.len()),
            ));
        }

        // Third line of each team block is its record going into the game
        let record = |block: ElementRef<'_>| {
            children(block, "div")
                .get(2)
                .map(|d| Value::text(text(*d)))
                .unwrap_or_default()
        };
        info.set("away_team_record", record(team_divs[0]));
        info.set("home_team_record", record(team_divs[1]));

        let meta = self.page.require_div(SCOREBOX_META_DIV_ID)?;
        let meta_divs = select(meta, "div")?;
        if meta_divs.is_empty() {
            return Err(GridironError::malformed("scorebox meta", "no lines found"));
        }
        for (label, div) in ["date", "start_time", "stadium"].iter().zip(&meta_divs) {
            let line = text(*div);
            let value = if *label == "date" {
                line.as_str()
            } else {
                strip_label(&line)
            };
            info.set(*label, Value::text(value));
        }
        Ok(())
    }

    fn parse_linescore_general_info(&self, info: &mut Record) -> Result<()> {
        let [away, home] = &self.linescore;
        let away_points = away
            .total()
            .ok_or_else(|| GridironError::malformed("linescore table", "away total is not a number"))?;
        let home_points = home
            .total()
            .ok_or_else(|| GridironError::malformed("linescore table", "home total is not a number"))?;

        info.set("away_points", away_points);
        info.set("home_points", home_points);
        info.set("away_team_id", self.identity.away_team_id.as_str());
        info.set("home_team_id", self.identity.home_team_id.as_str());

        let winner = match home_points.cmp(&away_points) {
            std::cmp::Ordering::Greater => Value::text(self.identity.home_team_id.as_str()),
            std::cmp::Ordering::Less => Value::text(self.identity.away_team_id.as_str()),
            std::cmp::Ordering::Equal => Value::Null,
        };
        info.set("winning_team_id", winner);
        info.set("overtime", away.cell_count == LINESCORE_CELLS_OT);
        info.set("season_week", self.identity.season_week);
        info.set("season_year", self.identity.season_year);
        Ok(())
    }

    // ---------------------------------------------
    // Team stats
    // ---------------------------------------------

    /// Two `game_stats` rows (visitor, home); stat columns come from the page
    pub fn game_stats(&self) -> Result<Table> {
        let table = self.page.require_table(TEAM_STATS_TABLE_ID)?;
        let rows = select(table, "tr")?;
        if rows.is_empty() {
            return Err(GridironError::malformed(
                format!("table '{}'", TEAM_STATS_TABLE_ID),
                "no rows found",
            ));
        }

        let mut stats = Table::new("game_stats", &["game_id", "team_id"]);
        let team_rows = [
            stats.push(Record::new().with("team_id", self.identity.away_team_id.as_str())),
            stats.push(Record::new().with("team_id", self.identity.home_team_id.as_str())),
        ];

        let mut filtered = Filtered::new(());
        for (i, row) in rows.iter().enumerate().skip(1) {
            let Some(label) = first(*row, r#"th[data-stat="stat"]"#)? else {
                filtered.drop_row(i, "no stat label");
                continue;
            };
            let stat_name = text(label);
            if stat_name.is_empty() {
                filtered.drop_row(i, "empty stat label");
                continue;
            }
            let values = select(*row, "td")?;
            for (idx, team_row) in team_rows.iter().enumerate() {
                let value = values
                    .get(idx)
                    .map(|td| Value::text(text(*td)))
                    .unwrap_or_default();
                stats.set(*team_row, &stat_name, value);
            }
        }
        filtered.into_logged(TEAM_STATS_TABLE_ID);

        for (team_row, line) in team_rows.iter().zip(&self.linescore) {
            if line.cell_count != LINESCORE_CELLS && line.cell_count != LINESCORE_CELLS_OT {
                return Err(GridironError::malformed(
                    "linescore table",
                    format!("{} cells found for {}", line.cell_count, line.team_id),
                ));
            }
            let score = |i: usize| Value::from(line.scores.get(i).copied().flatten());
            stats.set(*team_row, "points_q1", score(0));
            stats.set(*team_row, "points_q2", score(1));
            stats.set(*team_row, "points_q3", score(2));
            stats.set(*team_row, "points_q4", score(3));
            let overtime = if line.scores.len() == 6 {
                score(4)
            } else {
                Value::Int(0)
            };
            stats.set(*team_row, "points_overtime", overtime);
            stats.set(*team_row, "points_total", Value::from(line.total()));
        }

        stats.fill("game_id", self.identity.game_id.as_str());
        Ok(stats)
    }

    // ---------------------------------------------
    // Player stats
    // ---------------------------------------------

    /// One `game_player_stats` row per player, merged across every stat table
    pub fn player_stats(&self) -> Result<Table> {
        let mut builder = PlayerStatsBuilder::new();

        for table_id in PLAYER_GENERAL_STATS_TABLE_IDS {
            let table = self.page.require_table(table_id)?;
            Self::merge_player_table(&mut builder, table, table_id)?;
        }
        for table_id in PLAYER_ADVANCED_STATS_TABLE_IDS {
            match self.page.table(table_id)? {
                Some(table) => Self::merge_player_table(&mut builder, table, table_id)?,
                None => log::debug!("Optional table '{}' not on {}", table_id, self.page.url()),
            }
        }

        self.assign_player_team_ids(&mut builder)?;
        Ok(builder.finish(&self.identity.game_id))
    }

    fn merge_player_table(
        builder: &mut PlayerStatsBuilder,
        table: ElementRef<'_>,
        table_id: &str,
    ) -> Result<()> {
        let rows = select(table, "tr")?;
        if rows.is_empty() {
            return Err(GridironError::malformed(
                format!("table '{}'", table_id),
                "no rows found",
            ));
        }

        for row in rows {
            let Some(player_cell) = first(row, "th")? else {
                continue;
            };
            // Header rows carry no player id
            let Some(player_id) = attr(player_cell, "data-append-csv") else {
                continue;
            };
            let player_name = match first(player_cell, "a")? {
                Some(a) => text(a),
                None => text(player_cell),
            };

            for td in select(row, "td")? {
                let Some(stat_name) = attr(td, "data-stat") else {
                    continue;
                };
                builder.insert(player_id, &player_name, stat_name, Value::text(text(td)))?;
            }
        }
        log::debug!("Merged player table '{}'", table_id);
        Ok(())
    }

    fn assign_player_team_ids(&self, builder: &mut PlayerStatsBuilder) -> Result<()> {
        let home = self.page.table(SNAPCOUNT_HOME_TEAM_TABLE_ID)?;
        let away = self.page.table(SNAPCOUNT_VISITING_TEAM_TABLE_ID)?;
        let (Some(home), Some(away)) = (home, away) else {
            log::warn!("Snap count tables missing on {}; players left without team", self.page.url());
            return Ok(());
        };

        for (table, team_id) in [
            (home, &self.identity.home_team_id),
            (away, &self.identity.away_team_id),
        ] {
            let player_ids: Vec<&str> = select(table, "tbody > tr > th[data-append-csv]")?
                .into_iter()
                .filter_map(|th| attr(th, "data-append-csv"))
                .collect();
            builder.assign_team(&player_ids, team_id);
        }
        Ok(())
    }

    // ---------------------------------------------
    // Drives
    // ---------------------------------------------

    /// One `game_drives` row per possession, with points attributed
    pub fn drives(&self) -> Result<Table> {
        let log = self.scoring_log()?;
        let mut drives = Table::new("game_drives", &["game_id", "team_id", "drive_num"]);
        self.parse_team_drives(
            &mut drives,
            &log,
            HOME_DRIVES_TABLE_ID,
            &self.identity.home_team_id,
            Side::Home,
        )?;
        self.parse_team_drives(
            &mut drives,
            &log,
            VIS_DRIVES_TABLE_ID,
            &self.identity.away_team_id,
            Side::Away,
        )?;
        drives.fill("game_id", self.identity.game_id.as_str());
        Ok(drives)
    }

    /// Scoring plays; a missing or unreadable table attributes nothing
    fn scoring_log(&self) -> Result<ScoringLog> {
        let Some(table) = self.page.table(SCORING_TABLE_ID)? else {
            log::warn!("No scoring table on {}; drives score 0", self.page.url());
            return Ok(ScoringLog::default());
        };
        let rows: Vec<Vec<String>> = body_rows(table)?
            .into_iter()
            .map(|row| cells(row).into_iter().map(text).collect())
            .collect();
        Ok(ScoringLog::from_rows(rows).unwrap_or_else(|| {
            log::warn!("Malformed scoring table on {}; drives score 0", self.page.url());
            ScoringLog::default()
        }))
    }

    fn parse_team_drives(
        &self,
        drives: &mut Table,
        log: &ScoringLog,
        table_id: &str,
        team_id: &str,
        side: Side,
    ) -> Result<()> {
        let table = self.page.require_table(table_id)?;
        let rows = body_rows(table)?;
        if rows.is_empty() {
            return Err(GridironError::malformed(
                format!("table '{}'", table_id),
                "no rows found",
            ));
        }

        for row in rows {
            let values: Vec<String> = cells(row).into_iter().map(text).collect();
            if values.len() != DRIVE_CELLS {
                continue;
            }
            let outcome = log.attribute(&values[1], &values[2], &values[5], side);
            drives.push(
                Record::new()
                    .with("team_id", team_id)
                    .with("drive_num", values[0].as_str())
                    .with("quarter", values[1].as_str())
                    .with("time_start", values[2].as_str())
                    .with("start_at", values[3].as_str())
                    .with("plays", values[4].as_str())
                    .with("time_total", values[5].as_str())
                    .with("net_yds", values[6].as_str())
                    .with("end_event", values[7].as_str())
                    .with("points_scored", outcome.points_scored)
                    .with("opposing_touchdown", outcome.opposing_touchdown),
            );
        }
        Ok(())
    }

    // ---------------------------------------------
    // Links
    // ---------------------------------------------

    /// Profile URLs for every player in either snap count table
    pub fn player_urls(&self, base: &str) -> Result<Vec<String>> {
        let mut player_ids = BTreeSet::new();
        for table_id in [SNAPCOUNT_HOME_TEAM_TABLE_ID, SNAPCOUNT_VISITING_TEAM_TABLE_ID] {
            let table = self.page.require_table(table_id)?;
            let rows = select(table, "tr")?;
            if rows.is_empty() {
                return Err(GridironError::malformed(
                    format!("table '{}'", table_id),
                    "no rows found",
                ));
            }
            for row in rows {
                let th = first(row, "th")?.ok_or_else(|| {
                    GridironError::malformed(format!("table '{}'", table_id), "row without header cell")
                })?;
                match attr(th, "data-append-csv") {
                    Some(id) if id.len() == 8 => {
                        player_ids.insert(id.to_string());
                    }
                    _ => continue,
                }
            }
        }
        Ok(player_ids
            .iter()
            .filter_map(|id| ids::player_url(base, id))
            .collect())
    }
}

impl Scraper for GamePageScraper<'_> {
    fn kind(&self) -> PageKind {
        PageKind::Game
    }

    fn scrape_all(&self) -> Result<Vec<Table>> {
        Ok(vec![
            self.game_info()?,
            self.game_stats()?,
            self.player_stats()?,
            self.drives()?,
        ])
    }
}

/// Accumulates per-player stats across tables.
///
/// The same (player, stat) pair may show up in several tables; a later
/// sighting may fill a null but never change a value already recorded.
pub struct PlayerStatsBuilder {
    table: Table,
    rows: HashMap<PlayerId, usize>,
}

impl Default for PlayerStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStatsBuilder {
    pub fn new() -> Self {
        let mut table = Table::new("game_player_stats", &["game_id", "player_id"]);
        table.ensure_column("player_name");
        PlayerStatsBuilder {
            table,
            rows: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, player_id: &str, stat: &str) -> Option<&Value> {
        let row = *self.rows.get(player_id)?;
        self.table.get(row, stat)
    }

    pub fn insert(
        &mut self,
        player_id: &str,
        player_name: &str,
        stat: &str,
        value: Value,
    ) -> Result<()> {
        if matches!(stat, "game_id" | "player_id" | "player_name") {
            return Ok(());
        }

        let row = match self.rows.get(player_id) {
            Some(&row) => row,
            None => {
                let row = self.table.push(
                    Record::new()
                        .with("player_id", player_id)
                        .with("player_name", player_name),
                );
                self.rows.insert(player_id.to_string(), row);
                row
            }
        };

        self.table.ensure_column(stat);
        let existing = self.table.get(row, stat).cloned().unwrap_or_default();
        if existing.is_null() {
            self.table.set(row, stat, value);
        } else if !value.is_null() && existing != value {
            return Err(GridironError::StatConflict {
                player_id: player_id.to_string(),
                stat: stat.to_string(),
                existing,
                new: value,
            });
        }
        Ok(())
    }

    /// Tag the listed players with a team
    pub fn assign_team(&mut self, player_ids: &[&str], team_id: &str) {
        self.table.ensure_column("team_id");
        for id in player_ids {
            if let Some(&row) = self.rows.get(*id) {
                self.table.set(row, "team_id", team_id);
            }
        }
    }

    pub fn finish(mut self, game_id: &str) -> Table {
        self.table.ensure_column("team_id");
        self.table.fill("game_id", game_id);
        self.table
    }
}

/// Game page URLs listed on a week page (`/years/<y>/week_<n>.htm`)
pub fn week_game_links(page: &Page, base: &str) -> Result<Vec<String>> {
    let summaries = page.require_div(GAME_SUMMARIES_DIV_CLASS)?;
    let mut links = Vec::new();
    for td in select(summaries, "td.gamelink")? {
        let href = page::link_href(td)?.ok_or_else(|| {
            GridironError::missing("link in gamelink cell", page.url())
        })?;
        links.push(ids::absolute_url(base, href));
    }
    Ok(links)
}
