//! List posts

use anyhow::Result;

use crate::content::ContentSource;
use crate::helpers::DateFormatter;
use crate::listing::ListingSession;
use crate::Blog;

/// Print the first listing page, or every page when `all` is set
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let source = blog.content_source()?;
    let session = load(blog, &source, all).await?;

    println!("Posts ({}):", session.posts().len());
    for line in lines(&session) {
        println!("{}", line);
    }
    if session.has_more() {
        println!("More posts available (use --all)");
    }

    Ok(())
}

/// Build a listing session the way the listing page would
pub async fn load<S>(blog: &Blog, source: &S, all: bool) -> Result<ListingSession>
where
    S: ContentSource + ?Sized,
{
    let prismic = &blog.config.prismic;
    let first = source
        .get_by_type(&prismic.document_type, Some(prismic.page_size))
        .await?;

    let mut session = ListingSession::mount(&first, DateFormatter::from_config(&blog.config)?)?;
    if all {
        session.load_all(source).await?;
    }

    Ok(session)
}

/// One line per post
pub fn lines(session: &ListingSession) -> Vec<String> {
    session
        .posts()
        .iter()
        .map(|post| {
            format!(
                "  {} - {} by {} [{}]",
                post.first_publication_date, post.title, post.author, post.slug
            )
        })
        .collect()
}
