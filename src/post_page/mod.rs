//! Post detail page controller
//!
//! A post page starts out `Loading` and settles exactly once, either to
//! `Ready` with everything the template needs or to `NotFound`. Nothing is
//! computed while loading.

use serde::Serialize;

use crate::content::rich_text::as_html;
use crate::content::{ContentSource, PostDetail};
use crate::error::{BlogError, Result};
use crate::helpers::{date_xml, reading_time, DateFormatter};

/// Look up one post by slug
pub async fn resolve<S>(source: &S, doc_type: &str, slug: &str) -> Result<PostDetail>
where
    S: ContentSource + ?Sized,
{
    let raw = source.get_by_uid(doc_type, slug).await?;
    PostDetail::from_raw(raw)
}

/// Display state of a post page
#[derive(Debug, Clone)]
pub enum PostPage {
    Loading { slug: String },
    Ready(PostView),
    NotFound { slug: String },
}

impl PostPage {
    pub fn loading(slug: &str) -> Self {
        Self::Loading {
            slug: slug.to_string(),
        }
    }

    /// Settle a loading page with the outcome of [`resolve`].
    ///
    /// `NotFound` becomes the terminal `NotFound` state; any other error is
    /// returned to the caller. Pages that already settled are returned as is.
    pub fn settle(
        self,
        outcome: Result<PostDetail>,
        formatter: &DateFormatter,
        words_per_minute: usize,
    ) -> Result<Self> {
        let slug = match self {
            Self::Loading { slug } => slug,
            settled => return Ok(settled),
        };

        match outcome {
            Ok(detail) => Ok(Self::Ready(PostView::new(detail, formatter, words_per_minute))),
            Err(BlogError::NotFound { .. }) => Ok(Self::NotFound { slug }),
            Err(e) => Err(e),
        }
    }

    /// Resolve `slug` and settle in one step
    pub async fn load<S>(
        source: &S,
        doc_type: &str,
        slug: &str,
        formatter: &DateFormatter,
        words_per_minute: usize,
    ) -> Result<Self>
    where
        S: ContentSource + ?Sized,
    {
        let outcome = resolve(source, doc_type, slug).await;
        Self::loading(slug).settle(outcome, formatter, words_per_minute)
    }

    pub fn slug(&self) -> &str {
        match self {
            Self::Loading { slug } | Self::NotFound { slug } => slug,
            Self::Ready(view) => &view.slug,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// Everything the post template renders
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    /// Localized publication date
    pub published: String,
    /// Machine-readable publication date for `<time datetime>`
    pub published_xml: Option<String>,
    /// Estimated minutes to read
    pub reading_time: usize,
    pub sections: Vec<SectionView>,
}

/// One rendered section, keyed by position
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub index: usize,
    pub heading: String,
    pub html: String,
}

impl PostView {
    pub fn new(detail: PostDetail, formatter: &DateFormatter, words_per_minute: usize) -> Self {
        let reading_time = reading_time(&detail.sections, words_per_minute);
        let published = formatter.format_optional(detail.first_publication_date.as_ref());
        let published_xml = detail.first_publication_date.as_ref().map(|d| date_xml(d));

        let sections = detail
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| SectionView {
                index,
                heading: section.heading.clone(),
                html: as_html(&section.body),
            })
            .collect();

        Self {
            slug: detail.slug,
            title: detail.title,
            subtitle: detail.subtitle,
            author: detail.author,
            banner_url: detail.banner_url,
            published,
            published_xml,
            reading_time,
            sections,
        }
    }
}
