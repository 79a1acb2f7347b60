//! Team season page scraper (`/teams/<abbr>/<yyyy>.htm`)

use super::ids;
use super::Scraper;
use crate::data::page::{self, attr, body_rows, select, spaced_text, text};
use crate::{GridironError, Page, PageKind, Record, Result, Table, TeamId, Value};
use scraper::{ElementRef, Node};
use std::collections::HashMap;

const SUMMARY_SELECTOR: &str = r#"div[data-template="Partials/Teams/Summary"]"#;
const LOGO_SELECTOR: &str = "img.teamlogo";
const TEAM_STATS_TABLE_ID: &str = "team_stats";
const GAMES_TABLE_ID: &str = "games";

/// Summary labels and the columns they fill
const SUMMARY_LABELS: [(&str, &str); 10] = [
    ("Record", "record"),
    ("Coach", "coach"),
    ("Points For", "points_for_summary"),
    ("Points Against", "points_against_summary"),
    ("Playoffs", "playoffs"),
    ("Offensive Coordinator", "offensive_coordinator"),
    ("Defensive Coordinator", "defensive_coordinator"),
    ("Stadium", "stadium"),
    ("Offensive Scheme", "offensive_scheme"),
    ("Defensive Alignment", "defensive_alignment"),
];

/// Which stats row a column reads from
#[derive(Debug, Clone, Copy)]
enum StatsRow {
    Team,
    Opponent,
}

/// (column, row, stat) for the season stats table
const SEASON_STATS: [(&str, StatsRow, &str); 17] = [
    ("points_for", StatsRow::Team, "points"),
    ("points_against", StatsRow::Opponent, "points"),
    ("total_yards_for", StatsRow::Team, "total_yards"),
    ("total_yards_against", StatsRow::Opponent, "total_yards"),
    ("turnovers", StatsRow::Team, "turnovers"),
    ("forced_turnovers", StatsRow::Opponent, "turnovers"),
    ("pass_yards_for", StatsRow::Team, "pass_yds"),
    ("pass_yards_against", StatsRow::Opponent, "pass_yds"),
    ("pass_td_for", StatsRow::Team, "pass_td"),
    ("pass_td_against", StatsRow::Opponent, "pass_td"),
    ("pass_ints_thrown", StatsRow::Team, "pass_int"),
    ("pass_ints", StatsRow::Opponent, "pass_int"),
    ("rush_yards_for", StatsRow::Team, "rush_yds"),
    ("rush_yards_against", StatsRow::Opponent, "rush_yds"),
    ("rush_td_for", StatsRow::Team, "rush_td"),
    ("rush_td_against", StatsRow::Opponent, "rush_td"),
    ("penalties_for", StatsRow::Team, "penalties"),
];

/// A run of summary paragraph content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Bold label, trailing colon removed
    Label(String),
    Text(String),
}

/// Values following each known label.
///
/// A value runs from its label to the next label of any kind; anything
/// before the first label, or after an unknown one, is ignored.
pub fn labeled_values(segments: &[Segment], known: &[&str]) -> Vec<(String, String)> {
    fn flush(current: &mut Option<(&str, Vec<&str>)>, values: &mut Vec<(String, String)>) {
        if let Some((label, parts)) = current.take() {
            values.push((label.to_string(), parts.join(" ")));
        }
    }

    let mut values = Vec::new();
    let mut current: Option<(&str, Vec<&str>)> = None;
    for segment in segments {
        match segment {
            Segment::Label(label) => {
                flush(&mut current, &mut values);
                if known.contains(&label.as_str()) {
                    current = Some((label.as_str(), Vec::new()));
                }
            }
            Segment::Text(t) => {
                if let Some((_, parts)) = current.as_mut() {
                    if !t.is_empty() {
                        parts.push(t.as_str());
                    }
                }
            }
        }
    }
    flush(&mut current, &mut values);
    values
}

/// Split a paragraph into label and text segments
fn paragraph_segments(p: ElementRef<'_>) -> Vec<Segment> {
    let mut segments = Vec::new();
    for child in p.children() {
        match child.value() {
            Node::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    segments.push(Segment::Text(t.to_string()));
                }
            }
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.value().name() {
                    "strong" | "b" => {
                        let label = text(el);
                        segments.push(Segment::Label(label.trim_end_matches(':').trim().to_string()));
                    }
                    "br" => {}
                    _ => {
                        let t = spaced_text(el);
                        if !t.is_empty() {
                            segments.push(Segment::Text(t));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    segments
}

/// Scraper over one loaded team season page
pub struct TeamPageScraper<'p> {
    page: &'p Page,
    team_id: TeamId,
    season_year: i64,
}

impl<'p> TeamPageScraper<'p> {
    /// Resolve team and season from the page URL
    pub fn new(page: &'p Page) -> Result<Self> {
        let (team_id, season_year) =
            ids::team_season_from_href(page.url()).ok_or_else(|| GridironError::Unresolved {
                what: "team season",
                input: page.url().to_string(),
            })?;
        Ok(TeamPageScraper {
            page,
            team_id,
            season_year,
        })
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// One `team_season_info` row: summary fields and season stat totals
    pub fn team_info(&self) -> Result<Table> {
        let mut info = Record::new()
            .with("team_id", self.team_id.as_str())
            .with("season_year", self.season_year)
            .with("url", self.page.url());
        self.parse_summary(&mut info)?;
        self.parse_season_stats(&mut info)?;

        let mut table = Table::new("team_season_info", &["team_id", "season_year"]);
        table.push(info);
        Ok(table)
    }

    fn parse_summary(&self, info: &mut Record) -> Result<()> {
        let summary = self
            .page
            .select_first(SUMMARY_SELECTOR)?
            .ok_or_else(|| GridironError::missing("team summary", self.page.url()))?;
        let logo = self
            .page
            .select_first(LOGO_SELECTOR)?
            .and_then(|img| attr(img, "src"))
            .ok_or_else(|| GridironError::missing("team logo", self.page.url()))?;
        info.set("logo", logo);

        let known: Vec<&str> = SUMMARY_LABELS.iter().map(|(label, _)| *label).collect();
        let mut found: HashMap<String, String> = HashMap::new();
        for p in select(summary, "p")? {
            for (label, value) in labeled_values(&paragraph_segments(p), &known) {
                found.entry(label).or_insert(value);
            }
        }

        for (label, column) in SUMMARY_LABELS {
            info.set(column, Value::opt_text(found.remove(label)));
        }
        Ok(())
    }

    fn parse_season_stats(&self, info: &mut Record) -> Result<()> {
        let table = self.page.require_table(TEAM_STATS_TABLE_ID)?;
        let rows = body_rows(table)?;
        if rows.len() < 2 {
            return Err(GridironError::malformed(
                format!("table '{}'", TEAM_STATS_TABLE_ID),
                format!("{} rows found, expected team and opponent", rows.len()),
            ));
        }

        let row_stats = |row: ElementRef<'_>| -> Result<HashMap<String, String>> {
            Ok(select(row, "td")?
                .into_iter()
                .filter_map(|td| attr(td, "data-stat").map(|k| (k.to_string(), text(td))))
                .collect())
        };
        let team = row_stats(rows[0])?;
        let opponent = row_stats(rows[1])?;

        for (column, row, stat) in SEASON_STATS {
            let source = match row {
                StatsRow::Team => &team,
                StatsRow::Opponent => &opponent,
            };
            info.set(column, Value::opt_text(source.get(stat).cloned()));
        }
        Ok(())
    }

    /// Game page URLs from the schedule table
    pub fn game_links(&self, base: &str) -> Result<Vec<String>> {
        let games = self.page.require_table(GAMES_TABLE_ID)?;
        let mut links = Vec::new();
        for td in select(games, r#"td[data-stat="boxscore_word"]"#)? {
            if let Some(href) = page::link_href(td)? {
                links.push(ids::absolute_url(base, href));
            }
        }
        log::debug!("{} game links for {} {}", links.len(), self.team_id, self.season_year);
        Ok(links)
    }
}

impl Scraper for TeamPageScraper<'_> {
    fn kind(&self) -> PageKind {
        PageKind::Team
    }

    fn scrape_all(&self) -> Result<Vec<Table>> {
        Ok(vec![self.team_info()?])
    }
}
