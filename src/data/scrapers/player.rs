//! Player profile scraper (`/players/<L>/<id>.htm`)

use super::ids;
use super::Scraper;
use crate::data::page::{attr, first, select, spaced_text, text};
use crate::{GridironError, Page, PageKind, PlayerId, Record, Result, Table, Value};
use chrono::NaiveDate;
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

const META_DIV_ID: &str = "meta";

static HEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+-\d+").unwrap());
static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*lb").unwrap());
static BIRTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-birth=["']?(\d{4}-\d{2}-\d{2})"#).unwrap());

/// Scraper over one loaded player profile page
pub struct PlayerPageScraper<'p> {
    page: &'p Page,
    player_id: PlayerId,
}

impl<'p> PlayerPageScraper<'p> {
    /// Resolve the player id from the page URL
    pub fn new(page: &'p Page) -> Result<Self> {
        let player_id =
            ids::player_id_from_href(page.url()).ok_or_else(|| GridironError::Unresolved {
                what: "player id",
                input: page.url().to_string(),
            })?;
        Ok(PlayerPageScraper { page, player_id })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// One `player_profile` row
    pub fn profile(&self) -> Result<Table> {
        let meta = self.page.require_div(META_DIV_ID)?;
        let url = self.page.url();

        let heading = match first(meta, "h1 span")? {
            Some(span) => Some(span),
            None => first(meta, "h1")?,
        };
        let name = heading
            .map(text)
            .ok_or_else(|| GridironError::missing("player name heading", url))?;

        let image = first(meta, "div.media-item img")?.and_then(|img| attr(img, "src"));

        let meta_text = spaced_text(meta);
        let height = HEIGHT_RE
            .find(&meta_text)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| GridironError::missing("height", url))?;
        let weight = WEIGHT_RE
            .captures(&meta_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let dob = Self::birth_date(meta).ok_or_else(|| GridironError::missing("date of birth", url))?;
        let college = Self::college(meta)?;

        let record = Record::new()
            .with("player_id", self.player_id.as_str())
            .with("url", url)
            .with("name", name)
            .with("img", Value::opt_text(image))
            .with("height", height)
            .with("weight", Value::opt_text(weight))
            .with("dob", dob.format("%Y-%m-%d").to_string())
            .with("college", Value::opt_text(college));

        let mut table = Table::new("player_profile", &["player_id"]);
        table.push(record);
        Ok(table)
    }

    fn birth_date(meta: ElementRef<'_>) -> Option<NaiveDate> {
        let html = meta.html();
        let caps = BIRTH_RE.captures(&html)?;
        NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()
    }

    /// First link after the `College` label in its paragraph
    fn college(meta: ElementRef<'_>) -> Result<Option<String>> {
        for strong in select(meta, "strong")? {
            if text(strong).trim_end_matches(':') != "College" {
                continue;
            }
            for sibling in strong.next_siblings().filter_map(ElementRef::wrap) {
                let link = if sibling.value().name() == "a" {
                    Some(sibling)
                } else {
                    first(sibling, "a")?
                };
                if let Some(a) = link {
                    let name = text(a);
                    return Ok((!name.is_empty()).then_some(name));
                }
            }
        }
        Ok(None)
    }
}

impl Scraper for PlayerPageScraper<'_> {
    fn kind(&self) -> PageKind {
        PageKind::Player
    }

    fn scrape_all(&self) -> Result<Vec<Table>> {
        Ok(vec![self.profile()?])
    }
}
