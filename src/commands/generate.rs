//! Generate static files

use anyhow::Result;

use crate::content::ContentSource;
use crate::generator::Generator;
use crate::Blog;

/// Generate the static site from the configured content repository
pub async fn run(blog: &Blog) -> Result<()> {
    let source = blog.content_source()?;
    run_with_source(blog, &source).await
}

/// Generate the static site from any content source
pub async fn run_with_source<S>(blog: &Blog, source: &S) -> Result<()>
where
    S: ContentSource + ?Sized,
{
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let report = generator.generate(source).await?;

    if !report.skipped.is_empty() {
        tracing::warn!(
            "Skipped {} posts: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        report.listing_pages,
        report.posts,
        duration.as_secs_f64()
    );

    Ok(())
}
