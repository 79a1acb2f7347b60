//! Identifier resolvers
//!
//! Pure functions pulling canonical ids out of hrefs, URLs and headings.
//! Each returns `None` when its pattern does not match.

use crate::{PlayerId, TeamId};
use regex::Regex;
use std::sync::LazyLock;

static PLAYER_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/players/[A-Za-z]/([A-Za-z0-9]+)\.htm").unwrap());
static TEAM_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/teams/([A-Za-z]{3})/(\d{4})\.htm").unwrap());
static YEAR_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static YEAR_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/years/(\d{4})/").unwrap());
static WEEK_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/years/(\d{4})/week_(\d+)\.htm").unwrap());

/// `/players/M/MahoPa00.htm` -> `MahoPa00`
pub fn player_id_from_href(href: &str) -> Option<PlayerId> {
    PLAYER_HREF_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `/teams/kan/2023.htm` -> `kan`
pub fn team_id_from_href(href: &str) -> Option<TeamId> {
    team_season_from_href(href).map(|(team, _)| team)
}

/// `/teams/kan/2023.htm` -> (`kan`, 2023)
pub fn team_season_from_href(href: &str) -> Option<(TeamId, i64)> {
    let caps = TEAM_HREF_RE.captures(href)?;
    let team = caps.get(1)?.as_str().to_lowercase();
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some((team, year))
}

/// First 19xx/20xx token in free text
pub fn season_year_from_text(text: &str) -> Option<i64> {
    YEAR_TOKEN_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// `/years/2022/allpro.htm` -> 2022
pub fn season_year_from_url(url: &str) -> Option<i64> {
    YEAR_PATH_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `/years/2022/week_15.htm` -> (2022, 15)
pub fn season_week_from_href(href: &str) -> Option<(i64, i64)> {
    let caps = WEEK_HREF_RE.captures(href)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let week = caps.get(2)?.as_str().parse().ok()?;
    Some((year, week))
}

/// Absolute URL for a site-relative href
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), href)
    }
}

/// Profile URL for a player id
pub fn player_url(base: &str, player_id: &str) -> Option<String> {
    let letter = player_id.chars().next()?.to_ascii_uppercase();
    Some(format!(
        "{}/players/{}/{}.htm",
        base.trim_end_matches('/'),
        letter,
        player_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id() {
        assert_eq!(
            player_id_from_href("/players/M/MahoPa00.htm").as_deref(),
            Some("MahoPa00")
        );
        assert_eq!(
            player_id_from_href("https://www.pro-football-reference.com/players/K/KelcTr00.htm")
                .as_deref(),
            Some("KelcTr00")
        );
        assert_eq!(player_id_from_href("/teams/kan/2023.htm"), None);
        assert_eq!(player_id_from_href(""), None);
    }

    #[test]
    fn test_team_id_is_lowercased() {
        assert_eq!(team_id_from_href("/teams/KAN/2023.htm").as_deref(), Some("kan"));
        assert_eq!(
            team_season_from_href("https://x.test/teams/sfo/2019.htm"),
            Some(("sfo".to_string(), 2019))
        );
        assert_eq!(team_id_from_href("/teams/kan/"), None);
    }

    #[test]
    fn test_season_year() {
        assert_eq!(season_year_from_text("2022 NFL Standings & Team Stats"), Some(2022));
        assert_eq!(season_year_from_text("Week 3, 1999 season"), Some(1999));
        assert_eq!(season_year_from_text("Week 21800"), None);
        assert_eq!(season_year_from_url("/years/2021/allpro.htm"), Some(2021));
        assert_eq!(season_year_from_url("/teams/kan/2021.htm"), None);
    }

    #[test]
    fn test_season_week() {
        assert_eq!(season_week_from_href("/years/2022/week_15.htm"), Some((2022, 15)));
        assert_eq!(season_week_from_href("/years/2022/"), None);
    }

    #[test]
    fn test_urls() {
        let base = "https://www.pro-football-reference.com";
        assert_eq!(
            absolute_url(base, "/boxscores/202209110chi.htm"),
            "https://www.pro-football-reference.com/boxscores/202209110chi.htm"
        );
        assert_eq!(absolute_url(base, "https://a.test/x"), "https://a.test/x");
        assert_eq!(
            player_url(base, "MahoPa00").as_deref(),
            Some("https://www.pro-football-reference.com/players/M/MahoPa00.htm")
        );
    }
}
