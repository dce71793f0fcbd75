//! Page inspection: turns a fetched HTML page into a searchable record
//!
//! This module extracts from a page:
//! - A short title
//! - Indexable contents (content tags plus descriptive meta tags)
//! - Server keywords from the response headers
//! - Outbound links, resolved to absolute URLs
//! - Images with a best-effort description
//!
//! Pages whose static markup is nearly empty can be re-rendered through a
//! [`Renderer`] when unsafe mode is on, recovering content that only exists
//! after the page scripts run.

use crate::crawler::render::Renderer;
use crate::crawler::text::{collapse_whitespace, trim_to_word, truncate_chars};
use crate::storage::{Client, Host, Image};
use crate::url::resolve;
use reqwest::header::{HeaderMap, CONTENT_TYPE, SERVER};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Tags whose text makes up the page contents, in extraction order
pub const CONTENT_TAGS: [&str; 8] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "li"];

/// Pages with at most this many characters of content-tag text count as empty
pub const EMPTY_THRESHOLD: usize = 15;

pub const MAX_SOURCE_LEN: usize = 120;
pub const MAX_TITLE_WORDS: usize = 5;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_CONTENTS_LEN: usize = 65534;
pub const MAX_KEYWORDS_LEN: usize = 255;
pub const MAX_IMAGE_SRC_LEN: usize = 255;
pub const MAX_IMAGE_DSC_LEN: usize = 128;

/// Meta tags appended to the contents: (attribute, value)
const CONTENT_METAS: [(&str, &str); 6] = [
    ("name", "description"),
    ("name", "keywords"),
    ("name", "author"),
    ("property", "og:site_name"),
    ("property", "og:type"),
    ("property", "og:title"),
];

/// Reasons a page is rejected before extraction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InspectError {
    #[error("Unknown content type {0}")]
    UnsupportedContentType(String),

    #[error("A source is too long! ({0} characters)")]
    SourceTooLong(usize),
}

/// Everything extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub host: Host,
    /// Distinct absolute links in first-seen order
    pub links: Vec<String>,
    pub images: Vec<Image>,
}

/// Extracts hosts, links and images from fetched pages
///
/// Both collaborators are optional: without a renderer near-empty pages are
/// inspected as-is, without a client nothing is persisted.
#[derive(Clone, Default)]
pub struct Inspector {
    renderer: Option<Arc<dyn Renderer>>,
    client: Option<Arc<dyn Client>>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_client(mut self, client: Arc<dyn Client>) -> Self {
        self.client = Some(client);
        self
    }

    /// Inspects a page body fetched from `source`
    ///
    /// # Arguments
    ///
    /// * `body` - The page HTML
    /// * `headers` - Response headers (content type and server keywords)
    /// * `source` - Address the page was fetched from
    /// * `unsafe_mode` - Whether near-empty pages may be rendered with scripts
    ///
    /// # Returns
    ///
    /// * `Ok(Inspection)` - Extracted host, links and images; returned even if
    ///   persisting them failed
    /// * `Err(InspectError)` - Unsupported content type or oversized source
    pub async fn inspect(
        &self,
        body: &str,
        headers: &HeaderMap,
        source: &str,
        unsafe_mode: bool,
    ) -> Result<Inspection, InspectError> {
        check_content_type(headers)?;
        check_source(source)?;

        let renderer = self.renderer.as_ref().filter(|_| unsafe_mode);

        // Documents are not Send, so each parse lives in its own scope
        let static_inspection = {
            let document = Html::parse_document(body);
            if renderer.is_some() && is_empty(&document) {
                None
            } else {
                Some(extract(&document, headers, source))
            }
        };

        let inspection = match (static_inspection, renderer) {
            (Some(inspection), _) => inspection,
            (None, renderer) => {
                let rendered = match renderer {
                    Some(renderer) => {
                        tracing::debug!("{} looks empty, rendering scripts", source);
                        match renderer.render(body, source).await {
                            Ok(html) => html,
                            Err(e) => {
                                tracing::warn!("Render fallback failed for {}: {}", source, e);
                                body.to_string()
                            }
                        }
                    }
                    None => body.to_string(),
                };
                let document = Html::parse_document(&rendered);
                extract(&document, headers, source)
            }
        };

        self.persist(&inspection);
        Ok(inspection)
    }

    fn persist(&self, inspection: &Inspection) {
        let Some(client) = &self.client else {
            return;
        };

        if let Err(e) = client.push(&inspection.host) {
            tracing::warn!("Failed to store host {}: {}", inspection.host.addr, e);
        }
        for image in &inspection.images {
            if let Err(e) = client.push_img(image) {
                tracing::warn!("Failed to store image {}: {}", image.src, e);
            }
        }
    }
}

/// Rejects bodies that are neither HTML nor images
///
/// A missing content type is accepted.
pub fn check_content_type(headers: &HeaderMap) -> Result<(), InspectError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };

    let content_type = String::from_utf8_lossy(value.as_bytes()).to_ascii_lowercase();
    if content_type.contains("text/html")
        || content_type.contains("xhtml")
        || content_type.trim_start().starts_with("image/")
    {
        Ok(())
    } else {
        Err(InspectError::UnsupportedContentType(content_type))
    }
}

/// Rejects source addresses that do not fit the storage column
pub fn check_source(source: &str) -> Result<(), InspectError> {
    let len = source.chars().count();
    if len > MAX_SOURCE_LEN {
        Err(InspectError::SourceTooLong(len))
    } else {
        Ok(())
    }
}

/// Runs every extractor over a parsed document
pub fn extract(document: &Html, headers: &HeaderMap, source: &str) -> Inspection {
    Inspection {
        host: Host {
            title: get_title(document, source),
            addr: source.to_string(),
            contents: get_contents(document),
            keywords: get_keywords(headers),
        },
        links: find_links(document, source),
        images: get_images(document, source),
    }
}

/// Returns true if the content tags hold no more than [`EMPTY_THRESHOLD`]
/// characters of text
pub fn is_empty(document: &Html) -> bool {
    let mut total = 0;

    for tag in CONTENT_TAGS {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        for element in document.select(&selector) {
            total += element_text(&element).chars().count();
            if total > EMPTY_THRESHOLD {
                return false;
            }
        }
    }

    true
}

/// Extracts the page title
///
/// Preference order: `<title>`, the first non-empty `h1`..`h6`, the
/// `meta[name=title]` content, and finally the source address. The result is
/// shortened to five words or 100 characters, with `...` marking the cut.
pub fn get_title(document: &Html, source: &str) -> String {
    let title = first_text(document, "title")
        .or_else(|| (1..=6).find_map(|level| first_text(document, &format!("h{}", level))))
        .or_else(|| meta_content(document, "name", "title"))
        .unwrap_or_else(|| source.to_string());

    shorten_title(&title)
}

fn shorten_title(title: &str) -> String {
    let title = collapse_whitespace(title);
    let title = title.trim();

    let words: Vec<&str> = title.split(' ').collect();
    let title = if words.len() > MAX_TITLE_WORDS {
        format!("{}...", words[..MAX_TITLE_WORDS].join(" "))
    } else {
        title.to_string()
    };

    if title.chars().count() > MAX_TITLE_LEN {
        format!("{}...", truncate_chars(&title, MAX_TITLE_LEN).trim_end())
    } else {
        title
    }
}

/// Extracts the indexable contents
///
/// Text of every non-empty content tag plus the descriptive meta tags,
/// whitespace-collapsed and cut back to a whole word within
/// [`MAX_CONTENTS_LEN`] characters.
pub fn get_contents(document: &Html) -> String {
    let mut contents = String::new();

    for tag in CONTENT_TAGS {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = element_text(&element);
            if !text.is_empty() {
                contents.push_str(&text);
                contents.push(' ');
            }
        }
    }

    for (attr, value) in CONTENT_METAS {
        if let Some(content) = meta_content(document, attr, value) {
            contents.push_str(&content);
            contents.push(' ');
        }
    }

    trim_to_word(collapse_whitespace(&contents).trim_start(), MAX_CONTENTS_LEN)
}

/// Builds the keywords from the `x-powered-by` and `server` headers
pub fn get_keywords(headers: &HeaderMap) -> String {
    let keywords = ["x-powered-by", SERVER.as_str()]
        .iter()
        .filter_map(|name| headers.get(*name))
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    trim_to_word(collapse_whitespace(&keywords).trim_start(), MAX_KEYWORDS_LEN)
}

/// Resolves the `href` of every element against `source`
///
/// Returns distinct absolute links in first-seen order.
pub fn find_links(document: &Html, source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(link) = resolve(href, source) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

/// Collects images with a description
///
/// Images whose `src` is missing, empty, or longer than
/// [`MAX_IMAGE_SRC_LEN`] either as written or once resolved are skipped.
/// The description joins the image's `alt` and `title`, the parent's `title`
/// and `alt`, and the parent's text.
pub fn get_images(document: &Html, source: &str) -> Vec<Image> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() || src.chars().count() > MAX_IMAGE_SRC_LEN {
                return None;
            }
            let src = resolve(src, source)?;
            if src.chars().count() > MAX_IMAGE_SRC_LEN {
                return None;
            }

            let parent = img.parent().and_then(ElementRef::wrap);
            let parts = [
                img.value().attr("alt").map(str::to_string),
                img.value().attr("title").map(str::to_string),
                parent.and_then(|p| p.value().attr("title").map(str::to_string)),
                parent.and_then(|p| p.value().attr("alt").map(str::to_string)),
                parent.map(|p| element_text(&p)),
            ];

            let dsc = parts
                .into_iter()
                .flatten()
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            Some(Image {
                src,
                dsc: trim_to_word(collapse_whitespace(&dsc).trim(), MAX_IMAGE_DSC_LEN),
                addr: source.to_string(),
            })
        })
        .collect()
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect()
}

/// Trimmed text of the first element matching `css`, if non-empty
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element_text(&element).trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Content attribute of `meta[attr="value"]`, if non-empty
fn meta_content(document: &Html, attr: &str, value: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[{}="{}"]"#, attr, value)).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}
