//! Page loader with an on-disk HTML cache
//!
//! Sports-reference rate limits clients to 20 requests a minute, so network
//! fetches are spaced by `request_delay_ms`. Cached pages are served without
//! touching the network.

use super::scrapers::with_retry;
use crate::{FetchConfig, GridironError, Page, Result};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// HTML pages stored on disk under the site's own path layout, e.g.
/// `<root>/www.pro-football-reference.com/boxscores/202212180htx.htm`
#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        PageCache {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_key(url))
    }

    pub fn read(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let html = std::fs::read_to_string(&path).ok()?;
        log::debug!("Cache hit {}", path.display());
        Some(html)
    }

    pub fn write(&self, url: &str, html: &str) -> Result<()> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, html)?;
        log::debug!("Cached {}", path.display());
        Ok(())
    }
}

pub struct PageFetcher {
    client: reqwest::blocking::Client,
    cache: Option<PageCache>,
    offline_only: bool,
    request_delay: Duration,
    max_attempts: u32,
    last_request: Cell<Option<Instant>>,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.offline_only && config.cache_dir.is_none() {
            return Err(GridironError::Config(
                "offline_only needs a cache_dir".to_string(),
            ));
        }
        log::debug!(
            "Fetcher cache={:?} offline_only={}",
            config.cache_dir,
            config.offline_only
        );

        Ok(PageFetcher {
            client,
            cache: config.cache_dir.as_ref().map(PageCache::new),
            offline_only: config.offline_only,
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_attempts: config.max_attempts,
            last_request: Cell::new(None),
        })
    }

    pub fn cache(&self) -> Option<&PageCache> {
        self.cache.as_ref()
    }

    /// Load and parse a page, from the cache when present
    pub fn fetch(&self, url: &str) -> Result<Page> {
        let html = self.fetch_html(url)?;
        Ok(Page::parse(url, &html))
    }

    pub fn fetch_html(&self, url: &str) -> Result<String> {
        if let Some(html) = self.cache.as_ref().and_then(|c| c.read(url)) {
            return Ok(html);
        }
        if self.offline_only {
            return Err(GridironError::Offline(url.to_string()));
        }

        let html = with_retry(
            || {
                self.wait_for_slot();
                log::info!("Fetching {}", url);
                let response = self.client.get(url).send()?.error_for_status()?;
                Ok(response.text()?)
            },
            self.max_attempts,
        )?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(url, &html) {
                log::warn!("Failed to cache {}: {}", url, e);
            }
        }
        Ok(html)
    }

    /// Sleep until the configured delay since the previous request has passed
    fn wait_for_slot(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                std::thread::sleep(self.request_delay - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }
}

/// Relative cache path for a URL: host, then the URL path segments.
///
/// Directory URLs such as `/years/2022/` map to `index.htm`; a query string
/// is folded into the final file name. Segments are reduced to
/// `[A-Za-z0-9._-]` and `..` is never produced.
pub fn cache_key(url: &str) -> PathBuf {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };

    let mut key = PathBuf::new();
    let mut segments: Vec<String> = rest
        .split('/')
        .filter(|seg| !seg.is_empty())
        .map(sanitize)
        .collect();
    if rest.ends_with('/') || segments.len() < 2 {
        segments.push("index.htm".to_string());
    }
    if let (Some(query), Some(last)) = (query, segments.last_mut()) {
        last.push('_');
        last.push_str(&sanitize(query));
    }
    for seg in segments {
        key.push(seg);
    }
    key
}

fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridiron-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn offline_config(dir: &Path) -> FetchConfig {
        let mut config = Config::default().fetch;
        config.cache_dir = Some(dir.to_string_lossy().into_owned());
        config.offline_only = true;
        config
    }

    #[test]
    fn test_cache_key_follows_site_layout() {
        assert_eq!(
            cache_key("https://www.pro-football-reference.com/boxscores/202212180htx.htm"),
            Path::new("www.pro-football-reference.com/boxscores/202212180htx.htm")
        );
        assert_eq!(
            cache_key("https://www.pro-football-reference.com/years/2022/"),
            Path::new("www.pro-football-reference.com/years/2022/index.htm")
        );
        assert_eq!(
            cache_key("https://www.pro-football-reference.com/"),
            Path::new("www.pro-football-reference.com/index.htm")
        );
        assert_eq!(
            cache_key("https://www.pro-football-reference.com/play-index/search.cgi?x=1&y=2"),
            Path::new("www.pro-football-reference.com/play-index/search.cgi_x_1_y_2")
        );
        assert_eq!(
            cache_key("https://example.test/a/../b.htm"),
            Path::new("example.test/a/__/b.htm")
        );
    }

    #[test]
    fn test_offline_serves_cache() {
        let dir = temp_dir("cache");
        let url = "https://www.pro-football-reference.com/years/2022/";
        let cache = PageCache::new(&dir);
        cache
            .write(url, r#"<div id="meta"><h1>2022 NFL</h1></div>"#)
            .unwrap();

        let fetcher = PageFetcher::new(&offline_config(&dir)).unwrap();
        let page = fetcher.fetch(url).unwrap();
        assert_eq!(page.url(), url);
        assert!(page.div("meta").unwrap().is_some());
        assert!(dir.join("www.pro-football-reference.com/years/2022/index.htm").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_offline_without_cache_fails() {
        let dir = temp_dir("empty");
        let fetcher = PageFetcher::new(&offline_config(&dir)).unwrap();
        match fetcher.fetch("https://www.pro-football-reference.com/years/1990/") {
            Err(GridironError::Offline(url)) => assert!(url.ends_with("/1990/")),
            other => panic!("expected offline error, got ok={}", other.is_ok()),
        }
    }

    #[test]
    fn test_offline_needs_cache_dir() {
        let mut config = Config::default().fetch;
        config.offline_only = true;
        assert!(matches!(PageFetcher::new(&config), Err(GridironError::Config(_))));
    }
}
