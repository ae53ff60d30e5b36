//! Wire model of the customer-reviews JSON feed.
//!
//! Every field is optional: a malformed entry degrades to empty strings and
//! `None` rather than failing the page.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::model::Review;

static PAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"page=(\d+)").expect("valid page regex"));

#[derive(Deserialize, Debug, Default)]
pub struct FeedResponse {
    #[serde(default)]
    pub feed: FeedBody,
}

#[derive(Deserialize, Debug, Default)]
pub struct FeedBody {
    #[serde(default)]
    pub link: OneOrMany<RawLink>,
    #[serde(default)]
    pub entry: OneOrMany<RawEntry>,
}

/// The feed collapses single-element arrays into a bare object.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(one) => vec![one],
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(one) => std::slice::from_ref(one),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Label {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RawAuthor {
    #[serde(default)]
    pub name: Option<Label>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RawEntry {
    #[serde(default)]
    pub id: Option<Label>,
    #[serde(default)]
    pub author: Option<RawAuthor>,
    #[serde(default)]
    pub title: Option<Label>,
    #[serde(default)]
    pub content: Option<Label>,
    #[serde(default, rename = "im:rating")]
    pub rating: Option<Label>,
    #[serde(default)]
    pub updated: Option<Label>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RawLink {
    #[serde(default)]
    pub attributes: Option<LinkAttributes>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LinkAttributes {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

/// One fetched page: normalized entries in feed order (newest first) and the
/// feed-reported last page, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPage {
    pub entries: Vec<Review>,
    pub last_page: Option<u32>,
}

impl From<FeedResponse> for RawPage {
    fn from(resp: FeedResponse) -> Self {
        let last_page = extract_last_page(resp.feed.link.as_slice());
        let entries = resp
            .feed
            .entry
            .into_vec()
            .into_iter()
            .map(Review::from)
            .collect();
        RawPage { entries, last_page }
    }
}

fn label_of(l: Option<Label>) -> Option<String> {
    l.and_then(|l| l.label).filter(|s| !s.is_empty())
}

fn parse_rating(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|r| (1..=5).contains(r))
}

impl From<RawEntry> for Review {
    fn from(e: RawEntry) -> Self {
        Review {
            id: label_of(e.id).unwrap_or_default(),
            author: label_of(e.author.and_then(|a| a.name)).unwrap_or_default(),
            title: label_of(e.title).unwrap_or_default(),
            content: label_of(e.content).unwrap_or_default(),
            rating: label_of(e.rating).as_deref().and_then(parse_rating),
            date: label_of(e.updated),
        }
    }
}

/// Page number encoded in the `rel=last` link's href.
pub fn extract_last_page(links: &[RawLink]) -> Option<u32> {
    let href = links
        .iter()
        .filter_map(|l| l.attributes.as_ref())
        .find(|a| a.rel.as_deref() == Some("last"))?
        .href
        .as_deref()?;
    PAGE_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
