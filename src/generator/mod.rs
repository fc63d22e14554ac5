//! Generator module - writes the static site using the built-in templates

use std::fs;
use std::path::{Path, PathBuf};

use crate::content::{all_uids, ContentSource, PageFetcher, RawPage};
use crate::error::{BlogError, Result};
use crate::helpers::DateFormatter;
use crate::listing::ListingSession;
use crate::post_page::PostPage;
use crate::templates::{TemplateRenderer, STYLESHEET};
use crate::Blog;

/// Build-time first listing page, read back by the server
pub const LISTING_SNAPSHOT: &str = "listing.json";

/// Counts of what a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub listing_pages: usize,
    pub posts: usize,
    /// Slugs that were listed but could not be rendered
    pub skipped: Vec<String>,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    formatter: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            renderer: TemplateRenderer::new(&blog.config)?,
            formatter: DateFormatter::from_config(&blog.config)?,
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn formatter(&self) -> &DateFormatter {
        &self.formatter
    }

    /// Generate the entire site
    pub async fn generate<S>(&self, source: &S) -> Result<GenerateReport>
    where
        S: ContentSource + ?Sized,
    {
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)?;
        write_file(&public_dir.join("css/style.css"), STYLESHEET)?;

        let prismic = &self.blog.config.prismic;
        let first = source
            .get_by_type(&prismic.document_type, Some(prismic.page_size))
            .await?;
        self.write_snapshot(&first)?;

        let mut report = GenerateReport {
            listing_pages: self.generate_listing(&first, source).await?,
            ..GenerateReport::default()
        };

        let uids = all_uids(source, &prismic.document_type).await?;
        tracing::info!("Generating {} post pages", uids.len());

        for uid in uids {
            if !is_safe_slug(&uid) {
                tracing::warn!("Skipping post with unsafe slug {:?}", uid);
                report.skipped.push(uid);
                continue;
            }

            let page = match self.load_post(source, &uid).await {
                Ok(page) => page,
                Err(e @ BlogError::MalformedRecord { .. }) => {
                    tracing::warn!("Skipping post {}: {}", uid, e);
                    report.skipped.push(uid);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.write_post(&page)?.is_some() {
                report.posts += 1;
            } else {
                tracing::warn!("Post {} disappeared during generation", uid);
                report.skipped.push(uid);
            }
        }

        Ok(report)
    }

    /// Write `index.html` and one accumulated page per further cursor.
    ///
    /// Returns the number of listing pages written.
    pub async fn generate_listing<F>(&self, first: &RawPage, fetcher: &F) -> Result<usize>
    where
        F: PageFetcher + ?Sized,
    {
        let mut session = ListingSession::mount(first, self.formatter.clone())?;
        self.write_listing(&session)?;

        while session.has_more() {
            session.load_more(fetcher).await?;
            self.write_listing(&session)?;
        }

        tracing::info!(
            "Generated {} listing pages with {} posts",
            session.pages_loaded(),
            session.posts().len()
        );
        Ok(session.pages_loaded())
    }

    /// Resolve a post into a settled page
    pub async fn load_post<S>(&self, source: &S, slug: &str) -> Result<PostPage>
    where
        S: ContentSource + ?Sized,
    {
        PostPage::load(
            source,
            &self.blog.config.prismic.document_type,
            slug,
            &self.formatter,
            self.blog.config.words_per_minute,
        )
        .await
    }

    /// Write the page of a ready post; other states write nothing
    pub fn write_post(&self, page: &PostPage) -> Result<Option<PathBuf>> {
        if !matches!(page, PostPage::Ready(_)) {
            return Ok(None);
        }
        let html = self.renderer.render_post(page)?;
        let path = post_output_path(&self.blog.public_dir, page.slug());
        write_file(&path, &html)?;
        tracing::debug!("Wrote {:?}", path);
        Ok(Some(path))
    }

    fn write_listing(&self, session: &ListingSession) -> Result<()> {
        let html = self.renderer.render_listing(session)?;
        let path = listing_output_path(&self.blog.public_dir, session.pages_loaded());
        write_file(&path, &html)
    }

    fn write_snapshot(&self, first: &RawPage) -> Result<()> {
        let json = serde_json::to_string_pretty(first)
            .map_err(|e| BlogError::malformed(format!("listing snapshot: {}", e)))?;
        write_file(&self.blog.public_dir.join(LISTING_SNAPSHOT), &json)
    }
}

/// Read the build-time first listing page, if the site was generated
pub fn load_snapshot(public_dir: &Path) -> Result<Option<RawPage>> {
    let path = public_dir.join(LISTING_SNAPSHOT);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| BlogError::malformed(format!("{:?}: {}", path, e)))?;
    RawPage::from_value(value).map(Some)
}

/// `public/post/<slug>/index.html`
pub fn post_output_path(public_dir: &Path, slug: &str) -> PathBuf {
    public_dir.join("post").join(slug).join("index.html")
}

/// `public/index.html` for the first page, `public/page/<n>/index.html` after
pub fn listing_output_path(public_dir: &Path, number: usize) -> PathBuf {
    if number <= 1 {
        public_dir.join("index.html")
    } else {
        public_dir
            .join("page")
            .join(number.to_string())
            .join("index.html")
    }
}

/// Slugs usable as a single directory name
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\', '\0'])
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
