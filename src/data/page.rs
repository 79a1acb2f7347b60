//! Parsed page handle with id/class locators
//!
//! Sports-reference ships most secondary tables inside HTML comments and
//! un-comments them with javascript. Every comment that contains markup is
//! parsed as its own fragment so the locators find those tables too.

use crate::{GridironError, Result};
use scraper::{ElementRef, Html, Selector};

/// A loaded page plus the URL it came from
pub struct Page {
    url: String,
    document: Html,
    commented: Vec<Html>,
}

impl Page {
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        let url = url.into();
        let document = Html::parse_document(html);
        let commented: Vec<Html> = document
            .tree
            .nodes()
            .filter_map(|node| node.value().as_comment())
            .filter_map(|comment| {
                let markup: &str = comment;
                markup.contains('<').then(|| Html::parse_fragment(markup))
            })
            .collect();

        log::debug!("Parsed {} ({} commented fragments)", url, commented.len());

        Page {
            url,
            document,
            commented,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn roots(&self) -> impl Iterator<Item = &Html> {
        std::iter::once(&self.document).chain(self.commented.iter())
    }

    /// First element matching `css` in the page or any commented fragment
    pub fn select_first(&self, css: &str) -> Result<Option<ElementRef<'_>>> {
        let selector = selector(css)?;
        Ok(self.roots().find_map(|doc| doc.select(&selector).next()))
    }

    pub fn select_all(&self, css: &str) -> Result<Vec<ElementRef<'_>>> {
        let selector = selector(css)?;
        Ok(self
            .roots()
            .flat_map(|doc| doc.select(&selector).collect::<Vec<_>>())
            .collect())
    }

    /// Find a `<table>` by id, falling back to class
    pub fn table(&self, name: &str) -> Result<Option<ElementRef<'_>>> {
        self.find_by_id_or_class("table", name)
    }

    /// Find a `<div>` by id, falling back to class
    pub fn div(&self, name: &str) -> Result<Option<ElementRef<'_>>> {
        self.find_by_id_or_class("div", name)
    }

    pub fn require_table(&self, name: &str) -> Result<ElementRef<'_>> {
        self.table(name)?
            .ok_or_else(|| GridironError::missing(format!("table '{}'", name), &self.url))
    }

    pub fn require_div(&self, name: &str) -> Result<ElementRef<'_>> {
        self.div(name)?
            .ok_or_else(|| GridironError::missing(format!("div '{}'", name), &self.url))
    }

    fn find_by_id_or_class(&self, tag: &str, name: &str) -> Result<Option<ElementRef<'_>>> {
        if let Some(el) = self.select_first(&format!("{}[id=\"{}\"]", tag, name))? {
            return Ok(Some(el));
        }
        self.select_first(&format!("{}.{}", tag, name))
    }
}

/// Compile a CSS selector
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| GridironError::Selector(format!("{}: {:?}", css, e)))
}

/// All descendants of `el` matching `css`
pub fn select<'a>(el: ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(el.select(&selector).collect())
}

pub fn first<'a>(el: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(el.select(&selector).next())
}

/// Direct child elements with the given tag name
pub fn children<'a>(el: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == tag)
        .collect()
}

/// Rows of a table body (thead rows excluded)
pub fn body_rows(table: ElementRef<'_>) -> Result<Vec<ElementRef<'_>>> {
    select(table, "tbody > tr")
}

/// `th` and `td` cells of a row, in order
pub fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "th" | "td"))
        .collect()
}

pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// Text with each piece trimmed and joined without separator
pub fn text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Text with each piece trimmed and joined by single spaces
pub fn spaced_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `href` of the first link inside `el`
pub fn link_href<'a>(el: ElementRef<'a>) -> Result<Option<&'a str>> {
    Ok(first(el, "a[href]")?.and_then(|a| a.value().attr("href")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html><body>
          <div id="meta"><h1><span>2022 NFL</span></h1></div>
          <table class="linescore nohover"><tbody><tr><td>a</td></tr></tbody></table>
          <div id="all_kicking">
            <!--
            <div class="table_container">
              <table id="kicking"><tbody>
                <tr><th data-append-csv="ButkHa00"> Harrison <a>Butker</a> </th><td>3</td></tr>
              </tbody></table>
            </div>
            -->
          </div>
          <!-- plain comment -->
        </body></html>
    "#;

    #[test]
    fn test_finds_commented_table() {
        let page = Page::parse("https://example.test/g.htm", HTML);
        let table = page.require_table("kicking").unwrap();
        let rows = body_rows(table).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(cells(rows[0]).len(), 2);
        assert_eq!(attr(cells(rows[0])[0], "data-append-csv"), Some("ButkHa00"));
    }

    #[test]
    fn test_table_by_class_fallback() {
        let page = Page::parse("u", HTML);
        assert!(page.table("linescore").unwrap().is_some());
        assert!(page.table("scoring").unwrap().is_none());
    }

    #[test]
    fn test_missing_table_names_element_and_url() {
        let page = Page::parse("https://example.test/g.htm", HTML);
        let err = page.require_table("team_stats").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("team_stats"));
        assert!(msg.contains("https://example.test/g.htm"));
    }

    #[test]
    fn test_text_helpers() {
        let page = Page::parse("u", HTML);
        let table = page.require_table("kicking").unwrap();
        let th = first(table, "th").unwrap().unwrap();
        assert_eq!(text(th), "HarrisonButker");
        assert_eq!(spaced_text(th), "Harrison Butker");
    }
}
