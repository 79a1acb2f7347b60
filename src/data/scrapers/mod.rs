//! Page scrapers for pro-football-reference.com

pub mod allpro;
pub mod drives;
pub mod game;
pub mod ids;
pub mod player;
pub mod season;
pub mod team;
pub mod teams;

use crate::{GridironError, Page, PageKind, Result, Table};
use std::time::Duration;

pub const BASE_URL: &str = "https://www.pro-football-reference.com";

/// Trait for all page scrapers
pub trait Scraper {
    /// The page type this scraper reads
    fn kind(&self) -> PageKind;

    /// Run every extraction the page supports
    fn scrape_all(&self) -> Result<Vec<Table>>;
}

/// Scraper for a page of the given kind
pub fn scraper_for<'p>(kind: PageKind, page: &'p Page) -> Result<Box<dyn Scraper + 'p>> {
    Ok(match kind {
        PageKind::Game => Box::new(game::GamePageScraper::new(page)?),
        PageKind::Season => Box::new(season::SeasonPageScraper::new(page)?),
        PageKind::Team => Box::new(team::TeamPageScraper::new(page)?),
        PageKind::Player => Box::new(player::PlayerPageScraper::new(page)?),
        PageKind::AllPro => Box::new(allpro::AllProScraper::new(page)?),
        PageKind::Week => {
            return Err(GridironError::Unsupported(format!(
                "{} pages only provide links",
                kind
            )))
        }
    })
}

/// Outbound crawl links for a page of the given kind
pub fn links_for(kind: PageKind, page: &Page, base: &str) -> Result<Vec<String>> {
    match kind {
        PageKind::Game => game::GamePageScraper::new(page)?.player_urls(base),
        PageKind::Season => season::SeasonPageScraper::new(page)?.team_links(base),
        PageKind::Team => team::TeamPageScraper::new(page)?.game_links(base),
        PageKind::Week => game::week_game_links(page, base),
        PageKind::Player | PageKind::AllPro => Err(GridironError::Unsupported(format!(
            "{} pages have no crawl links",
            kind
        ))),
    }
}

/// Retry an operation with exponential backoff.
///
/// Only transient failures are retried; structural page errors are returned
/// on the first attempt.
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                std::thread::sleep(backoff(attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Delay before retry `attempt + 1`: 100ms doubling, capped at 30s
fn backoff(attempt: u32) -> Duration {
    let ms = 100u64.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

const MAX_BACKOFF_MS: u64 = 30_000;

/// Drop a leading `Label:` from a summary line
pub(crate) fn strip_label(line: &str) -> &str {
    match line.split_once(':') {
        Some((label, rest)) if !label.chars().any(|c| c.is_ascii_digit()) => rest.trim(),
        _ => line.trim(),
    }
}
