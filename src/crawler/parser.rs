//! HTML parser for listing pages and letter detail views
//!
//! Listing pages yield letter IDs in document order. Detail views yield a
//! `LetterRecord`, extracted field by field:
//! - `date` comes from the container's first paragraph and must look like
//!   `DD.MM.YYYY`, otherwise the epoch sentinel is used
//! - `author`, `sender`, `recipient` and `destination` come from the element
//!   wrapping a labelled `<span>`, falling back to `"unknown"`
//! - `text` is mandatory: without its block the letter is discarded

use crate::config::MarkupConfig;
use crate::storage::{unknown_date, LetterRecord, UNKNOWN};
use crate::ConfigError;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Accepted shape of the date paragraph
const DATE_PATTERN: &str = r"^\d{2}\.\d{2}\.\d{2,4}$";

/// Why a detail view produced no letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingElement {
    #[error("letter container not found")]
    Container,

    #[error("text block not found")]
    Text,
}

/// Inline labels marking the free-text fields
#[derive(Debug, Clone)]
pub struct FieldLabels {
    pub author: String,
    pub sender: String,
    pub recipient: String,
    pub destination: String,
}

/// Compiled selectors and labels describing the archive's markup
#[derive(Debug, Clone)]
pub struct ArchiveMarkup {
    container: Selector,
    text: Selector,
    listing: Selector,
    paragraph: Selector,
    span: Selector,
    id_attribute: String,
    labels: FieldLabels,
    date_pattern: Regex,
}

impl ArchiveMarkup {
    pub fn from_config(config: &MarkupConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            container: compile(&config.container_selector)?,
            text: compile(&config.text_selector)?,
            listing: compile(&config.listing_selector)?,
            paragraph: compile("p")?,
            span: compile("span")?,
            id_attribute: config.id_attribute.clone(),
            labels: FieldLabels {
                author: config.author_label.clone(),
                sender: config.sender_label.clone(),
                recipient: config.recipient_label.clone(),
                destination: config.destination_label.clone(),
            },
            date_pattern: Regex::new(DATE_PATTERN)
                .map_err(|e| ConfigError::Validation(e.to_string()))?,
        })
    }

    pub fn labels(&self) -> &FieldLabels {
        &self.labels
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Extracts letter IDs from a listing page, in document order
///
/// Anchors without the ID attribute, or with an empty one, are skipped.
/// Duplicates are kept.
pub fn parse_letter_ids(html: &str, markup: &ArchiveMarkup) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&markup.listing)
        .filter_map(|anchor| anchor.value().attr(&markup.id_attribute))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a letter detail view
///
/// # Arguments
///
/// * `html` - The rendered detail page
/// * `id` - The letter ID the page was requested for
/// * `url` - The exact URL that was fetched
/// * `markup` - Selectors and labels of the archive
///
/// # Returns
///
/// * `Ok(LetterRecord)` - Every field filled, with fallbacks where needed
/// * `Err(MissingElement)` - The container or the text block is absent
pub fn parse_letter(
    html: &str,
    id: &str,
    url: &str,
    markup: &ArchiveMarkup,
) -> Result<LetterRecord, MissingElement> {
    let document = Html::parse_document(html);

    let container = document
        .select(&markup.container)
        .next()
        .ok_or(MissingElement::Container)?;

    let date = container
        .select(&markup.paragraph)
        .next()
        .map(|p| parse_date(&p.text().collect::<String>(), &markup.date_pattern))
        .unwrap_or_else(unknown_date);

    let labels = &markup.labels;
    let author = labelled_field(container, &markup.span, &labels.author);
    let sender = labelled_field(container, &markup.span, &labels.sender);
    let recipient = labelled_field(container, &markup.span, &labels.recipient);
    let destination = labelled_field(container, &markup.span, &labels.destination);

    let text = container
        .select(&markup.text)
        .next()
        .map(extract_text)
        .ok_or(MissingElement::Text)?;

    Ok(LetterRecord {
        id: id.to_string(),
        date,
        author: author.unwrap_or_else(|| UNKNOWN.to_string()),
        sender: sender.unwrap_or_else(|| UNKNOWN.to_string()),
        recipient: recipient.unwrap_or_else(|| UNKNOWN.to_string()),
        destination: destination.unwrap_or_else(|| UNKNOWN.to_string()),
        text,
        url: url.to_string(),
    })
}

/// Parses `DD.MM.YYYY`, falling back to the sentinel date
///
/// Strings that have the right shape but name no real day (`31.02.1943`)
/// fall back too. Short years are taken literally.
fn parse_date(raw: &str, pattern: &Regex) -> NaiveDate {
    let raw = raw.trim();

    if !pattern.is_match(raw) {
        return unknown_date();
    }

    NaiveDate::parse_from_str(raw, "%d.%m.%Y").unwrap_or_else(|_| unknown_date())
}

/// Text of the element wrapping the `<span>` whose text is `label`
///
/// The label is stripped and whitespace collapsed. `None` when the marker
/// is absent or nothing is left after stripping.
fn labelled_field(container: ElementRef<'_>, span: &Selector, label: &str) -> Option<String> {
    let label = label.trim();

    let marker = container
        .select(span)
        .find(|s| s.text().collect::<String>().trim() == label)?;
    let parent = marker.parent().and_then(ElementRef::wrap)?;

    let value = parent
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(label, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Joins the text nodes of the body block with newlines
fn extract_text(block: ElementRef<'_>) -> String {
    let text = block.text().collect::<Vec<_>>().join("\n");
    let text = text.trim();

    if text.is_empty() {
        UNKNOWN.to_string()
    } else {
        text.to_string()
    }
}
