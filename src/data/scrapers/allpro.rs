//! All-Pro selections scraper (`/years/<yyyy>/allpro.htm`)

use super::ids;
use super::teams::TeamDirectory;
use super::Scraper;
use crate::data::page::{attr, body_rows, first, spaced_text};
use crate::{Filtered, GridironError, Page, PageKind, Record, Result, Table, Value};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const ALL_PRO_TABLE_ID: &str = "all_pro";

static AP_TEAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)AP\s*:\s*(1st|2nd)\s*Tm").unwrap());

/// AP team (1 or 2) named in an all-pro summary cell
pub fn ap_team(cell: &str) -> Option<i64> {
    let caps = AP_TEAM_RE.captures(cell)?;
    let rank = caps.get(1)?.as_str();
    Some(if rank.starts_with('1') { 1 } else { 2 })
}

pub struct AllProScraper<'p> {
    page: &'p Page,
    season_year: i64,
    teams: TeamDirectory,
}

impl<'p> AllProScraper<'p> {
    pub fn new(page: &'p Page) -> Result<Self> {
        Self::with_teams(page, TeamDirectory::default())
    }

    pub fn with_teams(page: &'p Page, teams: TeamDirectory) -> Result<Self> {
        let season_year =
            ids::season_year_from_url(page.url()).ok_or_else(|| GridironError::Unresolved {
                what: "season year",
                input: page.url().to_string(),
            })?;
        Ok(AllProScraper {
            page,
            season_year,
            teams,
        })
    }

    /// `allpro_votes` rows for AP first and second team players
    pub fn votes(&self) -> Result<Table> {
        let filtered = self.parse_votes()?;
        log::info!(
            "{} All-Pro selections for {} ({} dropped)",
            filtered.kept.len(),
            self.season_year,
            filtered.dropped.len()
        );
        Ok(filtered.into_logged(ALL_PRO_TABLE_ID))
    }

    /// Selections plus rows dropped for an unresolved player or team
    pub fn parse_votes(&self) -> Result<Filtered<Table>> {
        let table = self.page.require_table(ALL_PRO_TABLE_ID)?;
        let mut filtered = Filtered::new(Table::new("allpro_votes", &["season_year", "player_id"]));
        let mut seen = HashSet::new();

        for (i, row) in body_rows(table)?.into_iter().enumerate() {
            if row.value().classes().any(|c| c == "thead") {
                continue;
            }
            let Some(summary) = first(row, r#"td[data-stat="all_pro_string"]"#)? else {
                continue;
            };
            let Some(rank) = ap_team(&spaced_text(summary)) else {
                continue;
            };

            let player_cell = first(row, r#"[data-stat="player"]"#)?;
            let player_id = match player_cell {
                Some(cell) => match attr(cell, "data-append-csv") {
                    Some(id) => Some(id.to_string()),
                    None => first(cell, "a[href]")?
                        .and_then(|a| attr(a, "href"))
                        .and_then(href_stem),
                },
                None => None,
            };
            let Some(player_id) = player_id else {
                filtered.drop_row(i, "no player id");
                continue;
            };

            let team_text = first(row, r#"[data-stat="team"]"#)?
                .map(spaced_text)
                .unwrap_or_default();
            let Some(team_id) = self.teams.resolve(&team_text) else {
                filtered.drop_row(i, format!("unmapped team '{}'", team_text));
                continue;
            };

            if !seen.insert(player_id.clone()) {
                filtered.drop_row(i, format!("duplicate player {}", player_id));
                continue;
            }

            let position = first(row, r#"[data-stat="pos"]"#)?.map(spaced_text);
            filtered.kept.push(
                Record::new()
                    .with("season_year", self.season_year)
                    .with("player_id", player_id)
                    .with("team_id", team_id)
                    .with("position", Value::opt_text(position))
                    .with("ap_team", rank),
            );
        }
        Ok(filtered)
    }
}

/// `/players/B/BosaNi00.htm` -> `BosaNi00`
fn href_stem(href: &str) -> Option<String> {
    let file = href.rsplit('/').next()?;
    let stem = file.split('.').next()?;
    (!stem.is_empty()).then(|| stem.to_string())
}

impl Scraper for AllProScraper<'_> {
    fn kind(&self) -> PageKind {
        PageKind::AllPro
    }

    fn scrape_all(&self) -> Result<Vec<Table>> {
        Ok(vec![self.votes()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.pro-football-reference.com/years/2022/allpro.htm";

    fn row(player: &str, team: &str, pos: &str, summary: &str) -> String {
        format!(
            r#"<tr><th data-stat="pos">{pos}</th><td data-stat="player" data-append-csv="{player}"><a href="/players/X/{player}.htm">{player}</a></td><td data-stat="team">{team}</td><td data-stat="all_pro_string">{summary}</td></tr>"#
        )
    }

    fn page(rows: &[String]) -> Page {
        let html = format!(
            r#"<html><body><div id="all_all_pro"><table id="all_pro"><thead><tr><th>Pos</th></tr></thead><tbody>{}</tbody></table></div></body></html>"#,
            rows.concat()
        );
        Page::parse(URL, &html)
    }

    #[test]
    fn test_first_team_with_mapped_abbreviation() {
        let page = page(&[row("BosaNi00", "SF", "DE", "AP:1st Tm, PFWA: 1st Tm")]);
        let votes = AllProScraper::new(&page).unwrap().votes().unwrap();
        let rows = votes.records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("ap_team"), Some(&Value::Int(1)));
        assert_eq!(rows[0].text("team_id"), Some("sfo"));
        assert_eq!(rows[0].text("player_id"), Some("BosaNi00"));
        assert_eq!(rows[0].text("position"), Some("DE"));
        assert_eq!(rows[0].get("season_year"), Some(&Value::Int(2022)));
    }

    #[test]
    fn test_unmapped_team_is_dropped() {
        let page = page(&[
            row("BosaNi00", "ZZ", "DE", "AP:1st Tm"),
            row("KelcTr00", "KC", "TE", "AP: 2nd Tm"),
        ]);
        let filtered = AllProScraper::new(&page).unwrap().parse_votes().unwrap();
        assert_eq!(filtered.kept.len(), 1);
        assert_eq!(filtered.kept.get(0, "player_id"), Some(&Value::text("KelcTr00")));
        assert_eq!(filtered.kept.get(0, "ap_team"), Some(&Value::Int(2)));
        assert_eq!(filtered.dropped.len(), 1);
        assert_eq!(filtered.dropped[0].reason, "unmapped team 'ZZ'");
        assert!(filtered.kept.find_row("player_id", "BosaNi00").is_none());
    }

    #[test]
    fn test_non_ap_rows_skipped() {
        let page = page(&[row("AllePo00", "SF", "WR", "PFWA: 1st Tm")]);
        let filtered = AllProScraper::new(&page).unwrap().parse_votes().unwrap();
        assert!(filtered.kept.is_empty());
        assert!(filtered.dropped.is_empty());
    }

    #[test]
    fn test_player_id_falls_back_to_href() {
        let html = row("BosaNi00", "SF", "DE", "AP: 1st Tm").replace(r#" data-append-csv="BosaNi00""#, "");
        let page = page(&[html]);
        let votes = AllProScraper::new(&page).unwrap().votes().unwrap();
        assert_eq!(votes.get(0, "player_id"), Some(&Value::text("BosaNi00")));
    }

    #[test]
    fn test_ap_team_pattern() {
        assert_eq!(ap_team("AP:1st Tm"), Some(1));
        assert_eq!(ap_team("ap : 2nd tm"), Some(2));
        assert_eq!(ap_team("PFWA: 1st Tm"), None);
    }

    #[test]
    fn test_season_year_from_url_required() {
        let page = Page::parse("https://www.pro-football-reference.com/allpro.htm", "<html></html>");
        assert!(AllProScraper::new(&page).is_err());
    }
}
