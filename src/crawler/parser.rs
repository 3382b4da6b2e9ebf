//! HTML parser for extracting indexable page text
//!
//! This module turns storefront pages into plain text for the page
//! collection: the `<title>` followed by the visible body text, with
//! scripts, styles and whitespace runs removed.

use scraper::{Html, Selector};

/// Elements whose text never reaches the index
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible body text, whitespace-normalized
    pub body: String,
}

impl PageText {
    /// Title and body joined into the indexed document
    pub fn to_document(&self) -> String {
        match &self.title {
            Some(title) if !self.body.is_empty() => format!("{}\n\n{}", title, self.body),
            Some(title) => title.clone(),
            None => self.body.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_empty()
    }
}

/// Parses HTML content and extracts its title and visible text
///
/// # Example
///
/// ```
/// use storefront_sync::crawler::extract_page_text;
///
/// let html = r#"<html><head><title>About</title></head><body><p>We sell  lamps.</p></body></html>"#;
/// let page = extract_page_text(html);
/// assert_eq!(page.title, Some("About".to_string()));
/// assert_eq!(page.body, "We sell lamps.");
/// ```
pub fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    PageText {
        title: extract_title(&document),
        body: extract_body_text(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn extract_body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut words = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        words.extend(text.split_whitespace());
    }

    words.join(" ")
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
