//! Pro-football-reference scraping CLI
//!
//! Fetches one page, runs the matching scraper and prints the tables or
//! upserts them into SQLite.

use clap::{Parser, Subcommand};
use gridiron::{Config, PageKind, Result};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "Scrape pro-football-reference pages into relational tables", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one page into tables
    Scrape {
        /// Page type: game, season, team, player or allpro
        kind: PageKind,
        /// Page URL
        url: String,
        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
        /// Cache directory for HTML files
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Print the crawl links found on a page
    Links {
        /// Page type: game, season, team or week
        kind: PageKind,
        /// Page URL
        url: String,
        /// Cache directory for HTML files
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Show database status
    Status,
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Json,
    Db,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "db" => Ok(OutputFormat::Db),
            _ => Err(format!("Unknown format: {}. Use json or db.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Scrape {
            kind,
            url,
            format,
            cache,
            offline,
        } => commands::scrape(&config, kind, &url, format, cache, offline),
        Commands::Links {
            kind,
            url,
            cache,
            offline,
        } => commands::links(&config, kind, &url, cache, offline),
        Commands::Status => commands::status(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::database::KNOWN_TABLES;
    use gridiron::data::scrapers::{links_for, scraper_for};
    use gridiron::data::{Database, PageFetcher};

    fn fetcher(config: &Config, cache: Option<String>, offline: bool) -> Result<PageFetcher> {
        let mut fetch = config.fetch.clone();
        if let Some(cache_dir) = cache {
            log::info!("Using cache directory: {}", cache_dir);
            fetch.cache_dir = Some(cache_dir);
        }
        if offline {
            log::info!("Offline mode: using cached files only");
            fetch.offline_only = true;
        }
        PageFetcher::new(&fetch)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'gridiron scrape season {}/years/2023/'", config.fetch.base_url);
        println!("  3. Run 'gridiron links season <URL>' to list team pages to scrape next");

        Ok(())
    }

    pub fn scrape(
        config: &Config,
        kind: PageKind,
        url: &str,
        format: OutputFormat,
        cache: Option<String>,
        offline: bool,
    ) -> Result<()> {
        let page = fetcher(config, cache, offline)?.fetch(url)?;
        let scraper = scraper_for(kind, &page)?;
        let tables = scraper.scrape_all()?;
        log::info!("Scraped {} tables from {} page {}", tables.len(), kind, url);

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            }
            OutputFormat::Db => {
                let mut db = Database::open(&config.data.database_path)?;
                let count = db.upsert_tables(&tables)?;
                println!("Stored {} rows in {}", count, config.data.database_path);
            }
        }
        Ok(())
    }

    pub fn links(
        config: &Config,
        kind: PageKind,
        url: &str,
        cache: Option<String>,
        offline: bool,
    ) -> Result<()> {
        let page = fetcher(config, cache, offline)?.fetch(url)?;
        let links = links_for(kind, &page, &config.fetch.base_url)?;
        for link in &links {
            println!("{}", link);
        }
        log::info!("{} links on {}", links.len(), url);
        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path: {}", config.data.database_path);
        for name in KNOWN_TABLES {
            if db.table_columns(name)?.is_empty() {
                println!("  {:<20} -", name);
            } else {
                println!("  {:<20} {}", name, db.row_count(name)?);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cli_flags_override_fetch_config() {
            let config = Config::default();
            let dir = std::env::temp_dir().join("gridiron-cli-cache");
            let fetcher = fetcher(&config, Some(dir.to_string_lossy().into_owned()), true).unwrap();
            assert_eq!(
                fetcher.cache().map(|c| c.path_for("https://example.test/a.htm")),
                Some(dir.join("example.test/a.htm"))
            );
            match fetcher.fetch_html("https://example.test/missing.htm") {
                Err(gridiron::GridironError::Offline(_)) => {}
                other => panic!("expected offline error, got ok={}", other.is_ok()),
            }
        }

        #[test]
        fn test_offline_flag_without_cache_is_rejected() {
            assert!(fetcher(&Config::default(), None, true).is_err());
        }
    }
}
