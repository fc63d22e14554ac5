//! Listing page controller
//!
//! A [`ListingSession`] owns the pagination state of one listing page view:
//! the summaries materialized so far and the cursor to the next page. It is
//! created when the page is mounted and dropped when the view ends.
//!
//! `load_more` takes `&mut self`, so calls on one session cannot overlap.
//! A session shared between tasks goes behind a `tokio::sync::Mutex`; a
//! second trigger then waits for the first and continues from the cursor
//! the first one stored. State is only touched after a page has been fetched
//! and every record normalized, so a failed call leaves the session as it was.

use crate::content::{PageFetcher, PostSummary, RawPage, RawPost};
use crate::error::{BlogError, Result};
use crate::helpers::DateFormatter;

/// Pagination state of a listing page
#[derive(Debug, Clone)]
pub struct ListingSession {
    formatter: DateFormatter,
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    pages_loaded: usize,
}

impl ListingSession {
    /// An empty session; call [`initialize`](Self::initialize) before use
    pub fn new(formatter: DateFormatter) -> Self {
        Self {
            formatter,
            posts: Vec::new(),
            next_page: None,
            pages_loaded: 0,
        }
    }

    /// Create a session seeded with the first page
    pub fn mount(page: &RawPage, formatter: DateFormatter) -> Result<Self> {
        let mut session = Self::new(formatter);
        session.initialize(page)?;
        Ok(session)
    }

    /// Replace the visible posts and cursor with those of `page`
    pub fn initialize(&mut self, page: &RawPage) -> Result<()> {
        let posts = self.normalize(&page.results)?;
        self.posts = posts;
        self.next_page = page.cursor().map(str::to_string);
        self.pages_loaded = 1;
        Ok(())
    }

    /// Fetch the page behind the cursor and append its posts.
    ///
    /// Returns the number of appended posts. Fails with `NoMorePages` without
    /// touching the network when the cursor is empty. Posts are not
    /// deduplicated; an overlapping cursor yields repeated entries.
    pub async fn load_more<F>(&mut self, fetcher: &F) -> Result<usize>
    where
        F: PageFetcher + ?Sized,
    {
        let cursor = self.next_page.clone().ok_or(BlogError::NoMorePages)?;

        let page = fetcher.fetch_page(&cursor).await?;
        let fresh = self.normalize(&page.results)?;
        let appended = fresh.len();

        self.posts.extend(fresh);
        self.next_page = page.cursor().map(str::to_string);
        self.pages_loaded += 1;

        tracing::debug!(
            "Loaded page {} ({} posts, more: {})",
            self.pages_loaded,
            appended,
            self.has_more()
        );
        Ok(appended)
    }

    /// Keep loading until the cursor is exhausted
    pub async fn load_all<F>(&mut self, fetcher: &F) -> Result<()>
    where
        F: PageFetcher + ?Sized,
    {
        while self.has_more() {
            self.load_more(fetcher).await?;
        }
        Ok(())
    }

    /// Posts in display order
    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    /// The cursor to the next page, if any
    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the "load more" control should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Pages fetched so far, including the initial one
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    fn normalize(&self, records: &[RawPost]) -> Result<Vec<PostSummary>> {
        records
            .iter()
            .map(|raw| PostSummary::from_raw(raw, &self.formatter))
            .collect()
    }
}
