//! Built-in templates using the Tera template engine
//!
//! All templates and the stylesheet are embedded in the binary.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::{LabelsConfig, SiteConfig};
use crate::error::Result;
use crate::helpers::{listing_url, post_url, url_for};
use crate::listing::ListingSession;
use crate::post_page::PostPage;

/// Stylesheet written to `css/style.css`
pub const STYLESHEET: &str = include_str!("theme/style.css");

/// Seconds before the loading placeholder reloads itself
const LOADING_REFRESH_SECS: u64 = 2;

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    config: SiteConfig,
    site: SiteData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("loading.html", include_str!("theme/loading.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
        ])?;

        let site = SiteData {
            title: config.title.clone(),
            language: config.language.clone(),
            home: url_for(config, ""),
            stylesheet: url_for(config, "css/style.css"),
            generator: format!("cms-blog {}", env!("CARGO_PKG_VERSION")),
            labels: config.labels.clone(),
        };

        Ok(Self {
            tera,
            config: config.clone(),
            site,
        })
    }

    /// Render the listing page for the current state of a session
    pub fn render_listing(&self, session: &ListingSession) -> Result<String> {
        let posts: Vec<ListingPostData> = session
            .posts()
            .iter()
            .map(|post| ListingPostData {
                href: post_url(&self.config, &post.slug),
                title: post.title.clone(),
                subtitle: post.subtitle.clone(),
                author: post.author.clone(),
                first_publication_date: post.first_publication_date.clone(),
            })
            .collect();

        let next_link = session
            .has_more()
            .then(|| listing_url(&self.config, session.pages_loaded() + 1));

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("next_link", &next_link);
        self.render("index.html", &context)
    }

    /// Render a post page in whatever state it is in
    pub fn render_post(&self, page: &PostPage) -> Result<String> {
        let mut context = self.base_context();
        match page {
            PostPage::Loading { .. } => {
                context.insert("refresh_secs", &LOADING_REFRESH_SECS);
                self.render("loading.html", &context)
            }
            PostPage::Ready(view) => {
                context.insert("post", view);
                self.render("post.html", &context)
            }
            PostPage::NotFound { .. } => self.render_not_found(),
        }
    }

    /// Render the not-found page
    pub fn render_not_found(&self) -> Result<String> {
        self.render("not_found.html", &self.base_context())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    /// Render a template with given context
    fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub home: String,
    pub stylesheet: String,
    pub generator: String,
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPostData {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub first_publication_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Block, PostDetail, RawPage, RawPost, RawPostData, Section};
    use crate::helpers::{DateFormatter, Locale};
    use crate::post_page::PostView;

    fn formatter() -> DateFormatter {
        DateFormatter::new(Locale::PtBr, chrono_tz::UTC, "\u{2014}")
    }

    fn raw(uid: &str, title: &str) -> RawPost {
        RawPost {
            uid: uid.to_string(),
            first_publication_date: Some("2021-04-19T12:00:00Z".to_string()),
            data: RawPostData {
                title: title.to_string(),
                subtitle: "Subtitle".to_string(),
                author: "Danilo Vieira".to_string(),
                banner: None,
                content: Vec::new(),
            },
        }
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn test_render_listing_with_more() {
        let page = RawPage {
            next_page: Some("https://cms/api?page=2".to_string()),
            results: vec![raw("criando-um-app", "Tom & Jerry <3")],
        };
        let session = ListingSession::mount(&page, formatter()).unwrap();
        let html = renderer().render_listing(&session).unwrap();

        assert!(html.contains(r#"href="/post/criando-um-app/""#));
        assert!(html.contains("Tom &amp; Jerry &lt;3"));
        assert!(html.contains("19 Abr 2021"));
        assert!(html.contains(r#"href="/page/2/""#));
        assert!(html.contains("Carregar mais posts"));
    }

    #[test]
    fn test_render_listing_without_more() {
        let page = RawPage {
            next_page: None,
            results: vec![raw("a", "A")],
        };
        let session = ListingSession::mount(&page, formatter()).unwrap();
        let html = renderer().render_listing(&session).unwrap();
        assert!(!html.contains("Carregar mais posts"));
    }

    #[test]
    fn test_render_ready_post() {
        let detail = PostDetail {
            slug: "hooks".to_string(),
            first_publication_date: None,
            title: "Como utilizar Hooks".to_string(),
            subtitle: String::new(),
            author: "Joseph Oliveira".to_string(),
            banner_url: "https://images.prismic.io/banner.png".to_string(),
            sections: vec![Section {
                heading: "Proin et varius".to_string(),
                body: vec![Block::paragraph("Lorem ipsum")],
            }],
        };
        let page = PostPage::Ready(PostView::new(detail, &formatter(), 200));
        let html = renderer().render_post(&page).unwrap();

        assert!(html.contains(r#"<h1 class="post-title">Como utilizar Hooks</h1>"#));
        assert!(html.contains("<p>Lorem ipsum</p>"));
        assert!(html.contains("1 min"));
        assert!(html.contains("\u{2014}"));
        assert!(html.contains(r#"data-section="0""#));
        assert_eq!(html.matches("<img").count(), 1);
    }

    #[test]
    fn test_render_empty_post_shows_zero_minutes() {
        let detail = PostDetail {
            slug: "empty".to_string(),
            first_publication_date: None,
            title: "Empty".to_string(),
            subtitle: String::new(),
            author: "Nobody".to_string(),
            banner_url: "https://images.prismic.io/banner.png".to_string(),
            sections: Vec::new(),
        };
        let page = PostPage::Ready(PostView::new(detail, &formatter(), 200));
        let html = renderer().render_post(&page).unwrap();
        assert!(html.contains("0 min"));
    }

    #[test]
    fn test_render_loading_and_not_found() {
        let html = renderer().render_post(&PostPage::loading("new")).unwrap();
        assert!(html.contains("Carregando..."));
        assert!(html.contains(r#"http-equiv="refresh""#));
        assert!(!html.contains("<article"));

        let html = renderer()
            .render_post(&PostPage::NotFound {
                slug: "gone".to_string(),
            })
            .unwrap();
        assert!(html.contains("Post n\u{e3}o encontrado"));
    }
}
