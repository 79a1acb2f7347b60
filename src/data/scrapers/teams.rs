//! Static team mapping from displayed names to internal team ids
//!
//! Internal ids are the lower-case franchise codes used in team page URLs
//! (`/teams/kan/2023.htm`). Lookups are exact after normalization: an unknown
//! abbreviation resolves to nothing rather than a best guess.

use crate::TeamId;
use std::collections::HashMap;

/// Lookup table for team abbreviations, cities and nicknames
pub struct TeamDirectory {
    aliases: HashMap<String, TeamId>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamDirectory {
    pub fn new() -> Self {
        TeamDirectory {
            aliases: Self::default_team_aliases(),
        }
    }

    /// Resolve a displayed abbreviation or name to an internal id
    pub fn resolve(&self, name: &str) -> Option<TeamId> {
        let name_clean = name
            .trim()
            .trim_end_matches(['*', '+'])
            .trim()
            .to_lowercase()
            .replace(['[', ']', '†'], "");
        self.aliases.get(&name_clean).cloned()
    }

    /// All internal ids known to the directory
    pub fn team_ids(&self) -> Vec<TeamId> {
        let mut ids: Vec<TeamId> = self.aliases.values().cloned().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Build the default alias mapping
    fn default_team_aliases() -> HashMap<String, TeamId> {
        let mut aliases = HashMap::new();
        let mut add = |id: &str, names: &[&str]| {
            aliases.insert(id.to_string(), id.to_string());
            for name in names {
                aliases.insert(name.to_lowercase(), id.to_string());
            }
        };

        // AFC East
        add("buf", &["BUF", "Buffalo", "Bills", "Buffalo Bills"]);
        add("mia", &["MIA", "Miami", "Dolphins", "Miami Dolphins"]);
        add("nwe", &["NE", "NWE", "New England", "Patriots", "New England Patriots"]);
        add("nyj", &["NYJ", "NY Jets", "Jets", "New York Jets"]);

        // AFC North
        add(
            "rav",
            &["BAL", "Baltimore", "Ravens", "Baltimore Ravens"],
        );
        add("cin", &["CIN", "Cincinnati", "Bengals", "Cincinnati Bengals"]);
        add("cle", &["CLE", "Cleveland", "Browns", "Cleveland Browns"]);
        add("pit", &["PIT", "Pittsburgh", "Steelers", "Pittsburgh Steelers"]);

        // AFC South
        add("htx", &["HOU", "Houston", "Texans", "Houston Texans"]);
        add(
            "clt",
            &["IND", "Indianapolis", "Colts", "Indianapolis Colts", "Baltimore Colts"],
        );
        add("jax", &["JAX", "Jacksonville", "Jaguars", "Jacksonville Jaguars"]);
        add(
            "oti",
            &[
                "TEN",
                "Tennessee",
                "Titans",
                "Tennessee Titans",
                "Tennessee Oilers",
                "Houston Oilers",
            ],
        );

        // AFC West
        add("den", &["DEN", "Denver", "Broncos", "Denver Broncos"]);
        add("kan", &["KC", "KAN", "Kansas City", "Chiefs", "Kansas City Chiefs"]);
        add(
            "rai",
            &[
                "LV",
                "LVR",
                "OAK",
                "Las Vegas",
                "Oakland",
                "Raiders",
                "Las Vegas Raiders",
                "Oakland Raiders",
                "Los Angeles Raiders",
            ],
        );
        add(
            "sdg",
            &[
                "LAC",
                "SD",
                "SDG",
                "LA Chargers",
                "San Diego",
                "Chargers",
                "Los Angeles Chargers",
                "San Diego Chargers",
            ],
        );

        // NFC East
        add("dal", &["DAL", "Dallas", "Cowboys", "Dallas Cowboys"]);
        add("nyg", &["NYG", "NY Giants", "Giants", "New York Giants"]);
        add(
            "phi",
            &["PHI", "Philadelphia", "Eagles", "Philadelphia Eagles"],
        );
        add(
            "was",
            &[
                "WAS",
                "WSH",
                "Washington",
                "Commanders",
                "Washington Commanders",
                "Washington Football Team",
                "Washington Redskins",
            ],
        );

        // NFC North
        add("chi", &["CHI", "Chicago", "Bears", "Chicago Bears"]);
        add("det", &["DET", "Detroit", "Lions", "Detroit Lions"]);
        add("gnb", &["GB", "GNB", "Green Bay", "Packers", "Green Bay Packers"]);
        add("min", &["MIN", "Minnesota", "Vikings", "Minnesota Vikings"]);

        // NFC South
        add("atl", &["ATL", "Atlanta", "Falcons", "Atlanta Falcons"]);
        add("car", &["CAR", "Carolina", "Panthers", "Carolina Panthers"]);
        add("nor", &["NO", "NOR", "New Orleans", "Saints", "New Orleans Saints"]);
        add(
            "tam",
            &["TB", "TAM", "Tampa Bay", "Buccaneers", "Tampa Bay Buccaneers"],
        );

        // NFC West
        add(
            "crd",
            &[
                "ARI",
                "ARZ",
                "Arizona",
                "Cardinals",
                "Arizona Cardinals",
                "Phoenix Cardinals",
                "St. Louis Cardinals",
            ],
        );
        add(
            "ram",
            &[
                "LAR",
                "LA",
                "STL",
                "LA Rams",
                "Rams",
                "Los Angeles Rams",
                "St. Louis Rams",
            ],
        );
        add(
            "sfo",
            &["SF", "SFO", "San Francisco", "49ers", "San Francisco 49ers"],
        );
        add("sea", &["SEA", "Seattle", "Seahawks", "Seattle Seahawks"]);

        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviations_resolve() {
        let teams = TeamDirectory::new();
        assert_eq!(teams.resolve("SF").as_deref(), Some("sfo"));
        assert_eq!(teams.resolve("KAN").as_deref(), Some("kan"));
        assert_eq!(teams.resolve("Green Bay Packers*").as_deref(), Some("gnb"));
        assert_eq!(teams.resolve("htx").as_deref(), Some("htx"));
    }

    #[test]
    fn test_unknown_abbreviation_is_not_guessed() {
        let teams = TeamDirectory::new();
        assert_eq!(teams.resolve("ZZ"), None);
        assert_eq!(teams.resolve("2TM"), None);
        assert_eq!(teams.resolve("San"), None);
    }

    #[test]
    fn test_thirty_two_franchises() {
        assert_eq!(TeamDirectory::new().team_ids().len(), 32);
    }
}
