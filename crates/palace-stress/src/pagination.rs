//! `next` link extraction for paginated OPDS 2 feeds.

use serde_json::Value;
use url::Url;

fn rel_is_next(rel: &Value) -> bool {
    match rel {
        Value::String(s) => s == "next",
        Value::Array(rels) => rels.iter().any(|r| r.as_str() == Some("next")),
        _ => false,
    }
}

/// The string `href` of the first link whose `rel` is (or contains) `"next"`.
///
/// Matching links with a missing or non-string `href` are skipped.
pub fn get_next_url(document: &Value) -> Option<&str> {
    document
        .get("links")?
        .as_array()?
        .iter()
        .filter(|link| link.get("rel").is_some_and(rel_is_next))
        .find_map(|link| link.get("href")?.as_str())
}

/// Parse a response body and resolve its `next` link against `page_url`.
///
/// Unparseable JSON and unresolvable hrefs both mean "no next page": a
/// success with broken pagination metadata is treated as the last page.
pub fn next_page_url(page_url: &str, body: &str) -> Option<String> {
    let document: Value = serde_json::from_str(body).ok()?;
    let href = get_next_url(&document)?;
    match Url::parse(page_url) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => Url::parse(href).ok().map(String::from),
    }
}
