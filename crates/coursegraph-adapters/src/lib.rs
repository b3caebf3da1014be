//! Campus source adapters: async fetch + pure, separately testable parsers.
//!
//! Each campus publishes its catalog in a different shape (a JSON API, a
//! POST-form JSON API with per-course calendar pages, an HTML timetable).
//! Adapters reduce all three to the same intermediate shape: a map from raw
//! source course code to [`RawCourseRecord`]. The HTML scraping here is
//! best-effort; the pages are loosely structured and upstream markup changes
//! degrade fields to `None` rather than failing the run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use coursegraph_core::{Campus, RawCourseRecord};
use coursegraph_storage::{FetchError, HttpFetcher};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use uuid::Uuid;

pub mod utm;
pub mod utsc;
pub mod utsg;

pub use utm::UtmSource;
pub use utsc::UtscSource;
pub use utsg::UtsgSource;

pub const CRATE_NAME: &str = "coursegraph-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Per-run context handed to every adapter fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MineContext {
    pub run_id: Uuid,
}

/// One implementation per campus; `mine` performs the network round trips
/// and hands back the uniform raw record map.
#[async_trait]
pub trait CampusSource: Send + Sync {
    fn campus(&self) -> Campus;

    async fn mine(
        &self,
        http: &HttpFetcher,
        ctx: &MineContext,
    ) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError>;
}

pub(crate) fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(e.to_string()))
}

pub(crate) fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Flatten an HTML fragment (e.g. a description field shipped as markup
/// inside JSON) to its plain text.
pub(crate) fn fragment_text(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    text_or_none(fragment.root_element().text().collect::<String>())
}

pub(crate) fn select_first_text(
    document: &Html,
    css: &str,
) -> Result<Option<String>, AdapterError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>())))
}

/// Text of the node following `el`, skipping blank text nodes. This is how
/// the calendar and timetable pages attach requirement text to its label.
pub(crate) fn sibling_text(el: ElementRef<'_>) -> Option<String> {
    let mut node = el.next_sibling();
    while let Some(n) = node {
        if let Some(t) = n.value().as_text() {
            if let Some(s) = text_or_none(t.to_string()) {
                return Some(s);
            }
            node = n.next_sibling();
        } else if let Some(e) = ElementRef::wrap(n) {
            return text_or_none(e.text().collect::<String>());
        } else {
            node = n.next_sibling();
        }
    }
    None
}

/// Find the first `<div>` whose own text is exactly `label` and return the
/// text of its following sibling.
pub(crate) fn labelled_div_sibling_text(
    document: &Html,
    label: &str,
) -> Result<Option<String>, AdapterError> {
    let div = selector("div")?;
    Ok(document
        .select(&div)
        .find(|el| el.text().collect::<String>().trim() == label)
        .and_then(sibling_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_text_strips_markup() {
        assert_eq!(
            fragment_text("<p>Hello <em>world</em>.</p>").as_deref(),
            Some("Hello world.")
        );
        assert_eq!(fragment_text("  <p>  </p> "), None);
    }

    #[test]
    fn labelled_div_sibling_skips_blank_nodes() {
        let html = Html::parse_document(
            "<div>Prerequisite:</div>\n   <div>CSCA08H3 or equivalent</div>",
        );
        let text = labelled_div_sibling_text(&html, "Prerequisite:").unwrap();
        assert_eq!(text.as_deref(), Some("CSCA08H3 or equivalent"));
    }

    #[test]
    fn labelled_div_sibling_is_none_when_label_absent() {
        let html = Html::parse_document("<div>Exclusion:</div><div>X</div>");
        let text = labelled_div_sibling_text(&html, "Prerequisite:").unwrap();
        assert!(text.is_none());
    }
}
