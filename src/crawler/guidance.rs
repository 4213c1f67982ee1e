//! Guidance page extraction
//!
//! Some sites publish their guidance as rendered HTML rather than as files. This
//! module pulls the readable body text out of such pages and selects which
//! links are worth treating as guidance pages.
//!
//! # Region rules
//!
//! Text is collected from `p`, `li`, `h1`, `h2` and `h3` elements that sit inside a
//! main-content region and outside any navigation region:
//! - main: `main`, `article`, `section`, or a class/id hinting at content
//! - excluded: `nav`, `header`, `footer`, `aside`, or a class/id hinting at chrome
//!
//! An excluded region nested inside a main region stays excluded. `script`,
//! `style` and `noscript` are never read.

use crate::crawler::links::collapse_whitespace;
use crate::url::{extension_of, is_document_extension, is_listing_url, path_depth, path_segments, same_origin};
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Pages with less main-content text than this are rejected
pub const MIN_GUIDANCE_CHARS: usize = 200;

const MAIN_TAGS: &[&str] = &["main", "article", "section"];
const EXCLUDED_TAGS: &[&str] = &["nav", "header", "footer", "aside"];
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];
const TEXT_TAGS: &[&str] = &["p", "li", "h1", "h2", "h3"];

const MAIN_HINTS: &[&str] = &["content", "main", "article", "guidance", "body-text", "govspeak"];
const EXCLUDED_HINTS: &[&str] = &["nav", "menu", "breadcrumb", "footer", "header", "cookie", "sidebar"];

/// Why a page was not accepted as guidance
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuidanceRejection {
    #[error("main content too short ({length} < {minimum} characters)")]
    TooShort { length: usize, minimum: usize },

    #[error("no main content region found")]
    NoMainContent,
}

/// Text accepted from a guidance page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceContent {
    pub title: String,
    /// Paragraphs separated by blank lines
    pub text: String,
}

impl GuidanceContent {
    /// Bytes stored and hashed for the page
    ///
    /// Contains nothing time-dependent, so an unchanged page hashes the same on
    /// every run.
    pub fn to_document(&self, url: &str) -> Vec<u8> {
        format!("{}\nSource: {}\n\n{}\n", self.title, url, self.text).into_bytes()
    }
}

/// Where the walk currently is relative to content and chrome regions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RegionState {
    in_main: bool,
    in_excluded: bool,
}

fn has_hint(element: &Element, hints: &[&str]) -> bool {
    let class_tokens = element.classes();
    let id = element.id();
    class_tokens
        .chain(id)
        .map(|token| token.to_ascii_lowercase())
        .any(|token| hints.iter().any(|hint| token.contains(hint)))
}

impl RegionState {
    /// State inside `element`, given the state outside it
    ///
    /// Leaving the element means going back to the caller's state, so there is
    /// no explicit exit transition.
    fn enter(self, element: &Element) -> Self {
        let tag = element.name();
        let excluded = EXCLUDED_TAGS.contains(&tag) || has_hint(element, EXCLUDED_HINTS);
        let main = MAIN_TAGS.contains(&tag) || has_hint(element, MAIN_HINTS);

        Self {
            in_main: self.in_main || (main && !excluded),
            in_excluded: self.in_excluded || excluded,
        }
    }

    fn collects(&self) -> bool {
        self.in_main && !self.in_excluded
    }
}

#[derive(Default)]
struct Walk {
    paragraphs: Vec<String>,
    saw_main: bool,
}

impl Walk {
    fn visit(&mut self, node: ElementRef<'_>, outer: RegionState) {
        for child in node.children().filter_map(ElementRef::wrap) {
            let element = child.value();
            if SKIPPED_TAGS.contains(&element.name()) {
                continue;
            }

            let state = outer.enter(element);
            if state.collects() {
                self.saw_main = true;
            }

            if TEXT_TAGS.contains(&element.name()) && state.collects() {
                let text = collapse_whitespace(&visible_text(child));
                if !text.is_empty() {
                    self.paragraphs.push(text);
                }
                continue;
            }

            self.visit(child, state);
        }
    }
}

/// Text of an element, skipping script-like descendants
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&child_el.value().name()) {
                out.push(' ');
                out.push_str(&visible_text(child_el));
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    out
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    for selector in ["title", "h1"] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        let title = document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty());
        if title.is_some() {
            return title;
        }
    }
    None
}

/// Extracts the readable main content of a guidance page
///
/// # Returns
///
/// * `Ok(GuidanceContent)` - At least [`MIN_GUIDANCE_CHARS`] characters of main content
/// * `Err(GuidanceRejection::NoMainContent)` - No text inside a main region
/// * `Err(GuidanceRejection::TooShort { .. })` - Main content below the minimum
///
/// # Example
///
/// ```
/// use docwatch::crawler::{extract_guidance, GuidanceRejection};
///
/// let html = "<main><p>Too short.</p></main>";
/// assert!(matches!(extract_guidance(html), Err(GuidanceRejection::TooShort { .. })));
/// ```
pub fn extract_guidance(html: &str) -> Result<GuidanceContent, GuidanceRejection> {
    let document = Html::parse_document(html);

    let mut walk = Walk::default();
    walk.visit(document.root_element(), RegionState::default().enter(document.root_element().value()));

    if !walk.saw_main || walk.paragraphs.is_empty() {
        return Err(GuidanceRejection::NoMainContent);
    }

    let text = walk.paragraphs.join("\n\n");
    let length = text.chars().count();
    if length < MIN_GUIDANCE_CHARS {
        return Err(GuidanceRejection::TooShort {
            length,
            minimum: MIN_GUIDANCE_CHARS,
        });
    }

    Ok(GuidanceContent {
        title: extract_title(&document).unwrap_or_else(|| "Untitled".to_string()),
        text,
    })
}

fn is_file_link(url: &Url) -> bool {
    extension_of(url).is_some_and(|ext| is_document_extension(&ext))
}

fn parse_unique(links: &[String], seen: &mut HashSet<String>) -> Vec<Url> {
    links
        .iter()
        .filter_map(|link| Url::parse(link).ok())
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Category pages: same-origin links exactly one path segment below the entry page
pub fn select_category_pages(entry: &Url, links: &[String]) -> Vec<Url> {
    let root = path_segments(entry);
    let mut seen = HashSet::new();

    parse_unique(links, &mut seen)
        .into_iter()
        .filter(|url| same_origin(entry, url))
        .filter(|url| {
            let segments = path_segments(url);
            segments.len() == root.len() + 1 && segments.starts_with(&root)
        })
        .filter(|url| !is_listing_url(url) && !is_file_link(url))
        .collect()
}

/// Guidance pages: same-origin links at least `min_path_depth` segments deep
/// that are neither listings nor files
pub fn select_guidance_pages(entry: &Url, links: &[String], min_path_depth: usize) -> Vec<Url> {
    let mut seen = HashSet::new();

    parse_unique(links, &mut seen)
        .into_iter()
        .filter(|url| same_origin(entry, url))
        .filter(|url| path_depth(url) >= min_path_depth)
        .filter(|url| !is_listing_url(url) && !is_file_link(url))
        .collect()
}
