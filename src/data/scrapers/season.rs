//! Season page scraper: award winners, playoff seeds, team links

use super::ids;
use super::Scraper;
use crate::data::page::{self, attr, body_rows, children, first, select, spaced_text, text};
use crate::{Filtered, GridironError, Page, PageKind, Record, Result, Table, TeamId, Value};
use scraper::ElementRef;

const META_DIV_ID: &str = "meta";
const STANDINGS_TABLE_IDS: [&str; 2] = ["AFC", "NFC"];
const SEED_TABLES: [(&str, &str); 2] = [
    ("AFC", "afc_playoff_standings"),
    ("NFC", "nfc_playoff_standings"),
];

/// Seed slots emitted per conference
pub const SEED_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Award {
    /// Player award, stored as `<prefix>_id` and `<prefix>_name`
    Player(&'static str),
    /// Team award, stored as a team id in the named column
    Team(&'static str),
}

const AWARDS: [(&str, Award); 9] = [
    ("Super Bowl Champion", Award::Team("sb_champ")),
    ("AP MVP", Award::Player("mvp")),
    ("AP Offensive Player of the Year", Award::Player("opoy")),
    ("AP Defensive Player of the Year", Award::Player("dpoy")),
    ("AP Offensive Rookie of the Year", Award::Player("oroy")),
    ("AP Defensive Rookie of the Year", Award::Player("droy")),
    ("Passing Leader", Award::Player("passing_leader")),
    ("Rushing Leader", Award::Player("rushing_leader")),
    ("Receiving Leader", Award::Player("receiving_leader")),
];

/// Scraper over one loaded season page (`/years/<yyyy>/`)
pub struct SeasonPageScraper<'p> {
    page: &'p Page,
    season_year: i64,
}

impl<'p> SeasonPageScraper<'p> {
    /// Resolve the season year from the meta heading
    pub fn new(page: &'p Page) -> Result<Self> {
        let season_year = Self::parse_season_year(page)?;
        Ok(SeasonPageScraper { page, season_year })
    }

    pub fn season_year(&self) -> i64 {
        self.season_year
    }

    fn parse_season_year(page: &Page) -> Result<i64> {
        let heading = match page.div(META_DIV_ID)? {
            Some(meta) => first(meta, "h1")?.map(spaced_text),
            None => None,
        };
        let heading = heading.ok_or_else(|| {
            GridironError::missing(format!("<h1> in div '{}'", META_DIV_ID), page.url())
        })?;
        ids::season_year_from_text(&heading).ok_or(GridironError::Unresolved {
            what: "season year",
            input: heading,
        })
    }

    /// One `season_info` row; every award column is present, null when absent
    pub fn season_info(&self) -> Result<Table> {
        let mut info = Record::new()
            .with("url", self.page.url())
            .with("season_year", self.season_year);
        for (_, award) in AWARDS {
            match award {
                Award::Team(column) => info.set(column, Value::Null),
                Award::Player(prefix) => {
                    info.set(format!("{}_id", prefix), Value::Null);
                    info.set(format!("{}_name", prefix), Value::Null);
                }
            }
        }

        match self.award_paragraphs()? {
            Some(paragraphs) => {
                for p in paragraphs {
                    Self::parse_award(p, &mut info)?;
                }
            }
            None => log::warn!("No award section on {}", self.page.url()),
        }

        let mut table = Table::new("season_info", &["season_year"]);
        table.push(info);
        Ok(table)
    }

    /// Paragraphs of the meta block's award listing
    fn award_paragraphs(&self) -> Result<Option<Vec<ElementRef<'p>>>> {
        let Some(meta) = self.page.div(META_DIV_ID)? else {
            return Ok(None);
        };

        let blocks = children(meta, "div");
        let mut inner = None;
        for block in &blocks {
            if first(*block, "p")?.is_some() && first(*block, "strong")?.is_some() {
                inner = Some(*block);
                break;
            }
        }
        let inner = inner.unwrap_or_else(|| blocks.get(1).copied().unwrap_or(meta));
        Ok(Some(select(inner, "p")?))
    }

    fn parse_award(p: ElementRef<'_>, info: &mut Record) -> Result<()> {
        let Some(strong) = first(p, "strong")? else {
            return Ok(());
        };
        let label = text(strong);
        let Some((_, award)) = AWARDS.iter().find(|(l, _)| *l == label) else {
            return Ok(());
        };

        let link = first(p, "a")?;
        let href = link.and_then(|a| attr(a, "href"));
        match award {
            Award::Team(column) => {
                info.set(*column, href.and_then(ids::team_id_from_href));
            }
            Award::Player(prefix) => {
                let link_text = link.map(text);
                let name = award_winner_name(link_text.as_deref(), &text(p));
                info.set(format!("{}_id", prefix), href.and_then(ids::player_id_from_href));
                info.set(format!("{}_name", prefix), name);
            }
        }
        Ok(())
    }

    /// One `season_team_seeds` row per conference with all 16 slots
    pub fn team_seeds(&self) -> Result<Table> {
        let mut seeds = Table::new("season_team_seeds", &["season_year", "conference"]);
        for (conference, table_id) in SEED_TABLES {
            let mut record = Record::new()
                .with("season_year", self.season_year)
                .with("conference", conference);
            for n in 1..=SEED_SLOTS {
                record.set(format!("seed_{}_team_id", n), Value::Null);
                record.set(format!("seed_{}_reason", n), Value::Null);
            }

            match self.page.table(table_id)? {
                Some(table) => {
                    let parsed = parse_seed_rows(table)?.into_logged(table_id);
                    log::debug!("{} {}: {} seeds", self.season_year, conference, parsed.len());
                    for seed in parsed {
                        record.set(format!("seed_{}_team_id", seed.seed), seed.team_id);
                        record.set(format!("seed_{}_reason", seed.seed), seed.reason);
                    }
                }
                None => log::warn!(
                    "Seed table '{}' not on {}; {} seeds left null",
                    table_id,
                    self.page.url(),
                    conference
                ),
            }
            seeds.push(record);
        }
        Ok(seeds)
    }

    /// Team page URLs from the AFC and NFC standings tables
    pub fn team_links(&self, base: &str) -> Result<Vec<String>> {
        let mut links = Vec::new();
        for table_id in STANDINGS_TABLE_IDS {
            let table = self.page.require_table(table_id)?;
            for cell in select(table, r#"[data-stat="team"]"#)? {
                if let Some(href) = page::link_href(cell)? {
                    links.push(ids::absolute_url(base, href));
                }
            }
        }
        Ok(links)
    }
}

impl Scraper for SeasonPageScraper<'_> {
    fn kind(&self) -> PageKind {
        PageKind::Season
    }

    fn scrape_all(&self) -> Result<Vec<Table>> {
        Ok(vec![self.season_info()?, self.team_seeds()?])
    }
}

/// Award winner's display name: link text first, else the words after the
/// first colon of the paragraph
pub fn award_winner_name(link_text: Option<&str>, paragraph: &str) -> Option<String> {
    if let Some(name) = link_text.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(name.to_string());
    }

    let (_, rest) = paragraph.split_once(':')?;
    let guess = rest
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ");
    let guess = guess.trim_matches(|c: char| matches!(c, '.' | ',' | '(' | ')'));
    (guess.len() > 2).then(|| guess.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Seed {
    seed: usize,
    team_id: TeamId,
    reason: Value,
}

/// Seeded rows keyed by their seed number, not row order
fn parse_seed_rows(table: ElementRef<'_>) -> Result<Filtered<Vec<Seed>>> {
    let mut filtered = Filtered::new(Vec::new());
    let mut taken = [false; SEED_SLOTS + 1];

    for (i, row) in body_rows(table)?.into_iter().enumerate() {
        if row.value().classes().any(|c| c == "thead") {
            continue;
        }

        let seed = first(row, r#"[data-stat="seed"]"#)?.and_then(|cell| {
            let t = text(cell);
            t.parse::<usize>()
                .ok()
                .or_else(|| attr(cell, "csk").and_then(|c| c.parse().ok()))
        });
        let Some(seed) = seed else {
            filtered.drop_row(i, "no seed number");
            continue;
        };
        if !(1..=SEED_SLOTS).contains(&seed) {
            filtered.drop_row(i, format!("seed {} out of range", seed));
            continue;
        }
        if taken[seed] {
            filtered.drop_row(i, format!("duplicate seed {}", seed));
            continue;
        }

        let team_id = select(row, "a[href]")?
            .into_iter()
            .filter_map(|a| attr(a, "href"))
            .find_map(ids::team_id_from_href);
        let Some(team_id) = team_id else {
            filtered.drop_row(i, "unresolved team");
            continue;
        };

        let mut reason = Value::Null;
        for stat in ["why", "reason"] {
            if let Some(cell) = first(row, &format!(r#"[data-stat="{}"]"#, stat))? {
                reason = Value::text(spaced_text(cell));
                break;
            }
        }

        taken[seed] = true;
        filtered.kept.push(Seed {
            seed,
            team_id,
            reason,
        });
    }
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEASON_HTML: &str = r#"<html><body>
<div id="meta">
  <div><img class="teamlogo" src="logo.png"></div>
  <div>
    <h1><span>2022</span> <span>NFL Standings &amp; Team Stats</span></h1>
    <p><strong>Super Bowl Champion</strong>: <a href="/teams/kan/2022.htm">Kansas City Chiefs</a></p>
    <p><strong>AP MVP</strong>: <a href="/players/M/MahoPa00.htm">Patrick Mahomes</a></p>
    <p><strong>AP Defensive Player of the Year</strong>: Nick Bosa</p>
    <p><strong>Passing Leader</strong>: <a href="/players/M/MahoPa00.htm">Patrick Mahomes</a> (5,250)</p>
    <p><strong>Total Attendance</strong>: 18,800,000</p>
  </div>
</div>
<div id="all_AFC"><table id="AFC"><tbody>
  <tr class="thead onecell"><td>AFC East</td></tr>
  <tr><th data-stat="team"><a href="/teams/buf/2022.htm">Buffalo Bills</a>*</th><td data-stat="wins">13</td></tr>
  <tr><th data-stat="team"><a href="/teams/mia/2022.htm">Miami Dolphins</a>+</th><td data-stat="wins">9</td></tr>
</tbody></table></div>
<div id="all_NFC"><!--<table id="NFC"><tbody>
  <tr><th data-stat="team"><a href="/teams/phi/2022.htm">Philadelphia Eagles</a>*</th></tr>
</tbody></table>--></div>
<div id="all_playoff_standings"><!--
<table id="afc_playoff_standings"><tbody>
  <tr><th data-stat="seed">2</th><td data-stat="team"><a href="/teams/buf/2022.htm">Buffalo Bills</a></td><td data-stat="why">Lost Divisional</td></tr>
  <tr><th data-stat="seed">1</th><td data-stat="team"><a href="/teams/kan/2022.htm">Kansas City Chiefs</a></td><td data-stat="why">Won Super Bowl</td></tr>
  <tr class="thead"><th>Seed</th></tr>
  <tr><th data-stat="seed">8</th><td data-stat="team"><a href="/teams/nwe/2022.htm">New England Patriots</a></td><td data-stat="why"></td></tr>
  <tr><th data-stat="seed">Div</th><td data-stat="team"><a href="/teams/jax/2022.htm">Jacksonville Jaguars</a></td></tr>
  <tr><th data-stat="seed">7</th><td data-stat="team">Miami Dolphins</td></tr>
</tbody></table>
--></div>
</body></html>"#;

    fn page() -> Page {
        Page::parse("https://www.pro-football-reference.com/years/2022/", SEASON_HTML)
    }

    #[test]
    fn test_season_year_from_heading() {
        let page = page();
        assert_eq!(SeasonPageScraper::new(&page).unwrap().season_year(), 2022);
    }

    #[test]
    fn test_missing_meta_is_fatal() {
        let page = Page::parse("u", "<html><body><p>nothing</p></body></html>");
        let err = SeasonPageScraper::new(&page).err().unwrap();
        assert!(err.to_string().contains("meta"));
    }

    #[test]
    fn test_award_winners() {
        let page = page();
        let scraper = SeasonPageScraper::new(&page).unwrap();
        let info = scraper.season_info().unwrap().records().remove(0);

        assert_eq!(info.text("sb_champ"), Some("kan"));
        assert_eq!(info.text("mvp_id"), Some("MahoPa00"));
        assert_eq!(info.text("mvp_name"), Some("Patrick Mahomes"));
        assert_eq!(info.get("dpoy_id"), Some(&Value::Null));
        assert_eq!(info.text("dpoy_name"), Some("Nick Bosa"));
        assert_eq!(info.text("passing_leader_id"), Some("MahoPa00"));
        assert_eq!(info.get("oroy_id"), Some(&Value::Null));
        assert_eq!(info.get("receiving_leader_name"), Some(&Value::Null));
        assert_eq!(info.get("season_year"), Some(&Value::Int(2022)));
        assert!(info.get("Total Attendance").is_none());
    }

    #[test]
    fn test_missing_award_section_gives_null_columns() {
        let html = r#"<html><body><div id="meta"><h1>1999 NFL Season</h1></div></body></html>"#;
        let page = Page::parse("u", html);
        let scraper = SeasonPageScraper::new(&page).unwrap();
        let info = scraper.season_info().unwrap().records().remove(0);
        assert_eq!(info.get("season_year"), Some(&Value::Int(1999)));
        assert_eq!(info.get("sb_champ"), Some(&Value::Null));
        assert_eq!(info.get("mvp_name"), Some(&Value::Null));
        assert_eq!(info.len(), 2 + 1 + 8 * 2);
    }

    #[test]
    fn test_award_winner_name_fallback() {
        assert_eq!(
            award_winner_name(Some(" Aaron Donald "), "ignored").as_deref(),
            Some("Aaron Donald")
        );
        assert_eq!(
            award_winner_name(None, "AP MVP: Aaron Rodgers").as_deref(),
            Some("Aaron Rodgers")
        );
        assert_eq!(
            award_winner_name(Some(""), "Passing Leader: Tom Brady, 5,316 yds").as_deref(),
            Some("Tom Brady, 5,316")
        );
        assert_eq!(award_winner_name(None, "AP MVP: JJ"), None);
        assert_eq!(award_winner_name(None, "no colon here"), None);
    }

    #[test]
    fn test_seeds_always_sixteen_slots() {
        let page = page();
        let scraper = SeasonPageScraper::new(&page).unwrap();
        let seeds = scraper.team_seeds().unwrap();
        assert_eq!(seeds.len(), 2);

        let rows = seeds.records();
        let afc = &rows[0];
        assert_eq!(afc.text("conference"), Some("AFC"));
        assert_eq!(afc.text("seed_1_team_id"), Some("kan"));
        assert_eq!(afc.text("seed_1_reason"), Some("Won Super Bowl"));
        assert_eq!(afc.text("seed_2_team_id"), Some("buf"));
        assert_eq!(afc.text("seed_8_team_id"), Some("nwe"));
        assert_eq!(afc.get("seed_8_reason"), Some(&Value::Null));
        assert_eq!(afc.get("seed_7_team_id"), Some(&Value::Null));
        assert_eq!(afc.get("seed_16_team_id"), Some(&Value::Null));

        let nfc = &rows[1];
        assert_eq!(nfc.text("conference"), Some("NFC"));
        for row in &rows {
            let slots = row.columns().filter(|c| c.starts_with("seed_")).count();
            assert_eq!(slots, SEED_SLOTS * 2);
        }
        assert!((1..=SEED_SLOTS).all(|n| nfc.get(&format!("seed_{}_team_id", n)) == Some(&Value::Null)));
    }

    #[test]
    fn test_seed_filter_reports_drops() {
        let page = page();
        let table = page.require_table("afc_playoff_standings").unwrap();
        let filtered = parse_seed_rows(table).unwrap();
        assert_eq!(filtered.kept.len(), 3);
        let reasons: Vec<_> = filtered.dropped.iter().map(|d| d.reason.as_str()).collect();
        assert_eq!(reasons, ["no seed number", "unresolved team"]);
    }

    #[test]
    fn test_team_links() {
        let page = page();
        let scraper = SeasonPageScraper::new(&page).unwrap();
        let links = scraper
            .team_links("https://www.pro-football-reference.com")
            .unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.pro-football-reference.com/teams/buf/2022.htm",
                "https://www.pro-football-reference.com/teams/mia/2022.htm",
                "https://www.pro-football-reference.com/teams/phi/2022.htm",
            ]
        );
    }

    #[test]
    fn test_team_links_require_both_conferences() {
        let html = SEASON_HTML.replace(r#"<table id="NFC">"#, "<table>");
        let page = Page::parse("u", &html);
        let scraper = SeasonPageScraper::new(&page).unwrap();
        let err = scraper.team_links("https://x.test").unwrap_err();
        assert!(err.to_string().contains("NFC"));
    }
}
