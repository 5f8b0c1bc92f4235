//! Text normalization used to compare contract texts regardless of formatting.
//!
//! Steps, in order:
//! 1. Render markdown to HTML (pulldown-cmark, CommonMark without extensions)
//! 2. Extract plain text from the HTML (drop tags and comments, decode entities)
//! 3. Collapse every whitespace run to a single space and trim
//! 4. Lowercase
//! 5. Replace every underscore run with `[underscore]`

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Parser};
use regex::{Captures, Regex};

pub const UNDERSCORE_PLACEHOLDER: &str = "[underscore]";

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Normalizes markdown text into a lowercase, whitespace-collapsed plain-text string.
pub fn normalize(text: &str) -> String {
    let html = markdown_to_html(text);
    let plain = html_to_text(&html);
    let collapsed = RE_WHITESPACE.replace_all(&plain, " ");
    let lowered = collapsed.trim().to_lowercase();
    RE_UNDERSCORES
        .replace_all(&lowered, UNDERSCORE_PLACEHOLDER)
        .into_owned()
}

fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new(markdown));
    out
}

/// Concatenates the text nodes of an HTML fragment.
fn html_to_text(html: &str) -> String {
    let stripped = RE_TAG.replace_all(html, "");
    RE_ENTITY
        .replace_all(&stripped, |caps: &Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from);
    }
    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "sect" => "\u{a7}",
        _ => return None,
    };
    Some(decoded.to_string())
}
