//! Site server
//!
//! Serves the generated site and fills the gaps a static build leaves:
//! listing pages beyond the pre-rendered ones are assembled on request by
//! continuing from the build-time first page, and posts published after the
//! build are resolved in the background while a loading page is shown.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::{ContentSource, RawPage};
use crate::error::BlogError;
use crate::generator::{self, is_safe_slug, listing_output_path, post_output_path, Generator};
use crate::listing::ListingSession;
use crate::post_page::PostPage;
use crate::Blog;

/// How long a slug the content source did not know is answered with 404
pub const MISSING_TTL: Duration = Duration::from_secs(60);

/// Most not-found slugs remembered at once
pub const MISSING_CAPACITY: usize = 256;

/// Recently unknown slugs. Entries expire so a post published later is
/// resolved again, and the oldest entry is evicted when full.
#[derive(Debug)]
pub struct MissingSlugs {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<String, Instant>,
}

impl MissingSlugs {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Whether `slug` was recorded and has not expired at `now`
    pub fn contains(&mut self, slug: &str, now: Instant) -> bool {
        match self.entries.get(slug) {
            Some(&at) if now.duration_since(at) < self.ttl => true,
            Some(_) => {
                self.entries.remove(slug);
                false
            }
            None => false,
        }
    }

    /// Record `slug` as unknown at `now`
    pub fn insert(&mut self, slug: String, now: Instant) {
        let ttl = self.ttl;
        self.entries.retain(|_, at| now.duration_since(*at) < ttl);

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&slug) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(slug, _)| slug.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(slug, now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MissingSlugs {
    fn default() -> Self {
        Self::new(MISSING_TTL, MISSING_CAPACITY)
    }
}

/// Server state
pub struct ServerState {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    generator: Generator,
    /// Build-time first listing page
    snapshot: Option<RawPage>,
    /// Slugs being resolved in the background
    pending: Mutex<HashSet<String>>,
    /// Slugs the content source recently did not know
    missing: Mutex<MissingSlugs>,
}

impl ServerState {
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let snapshot = match generator::load_snapshot(&blog.public_dir) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring unreadable listing snapshot: {}", e);
                None
            }
        };

        Ok(Self {
            blog: blog.clone(),
            source,
            generator: Generator::new(blog)?,
            snapshot,
            pending: Mutex::new(HashSet::new()),
            missing: Mutex::new(MissingSlugs::default()),
        })
    }

    /// Replace the not-found memo, e.g. with a shorter expiry
    pub fn with_missing(mut self, missing: MissingSlugs) -> Self {
        self.missing = Mutex::new(missing);
        self
    }

    async fn first_page(&self) -> crate::error::Result<RawPage> {
        if let Some(page) = &self.snapshot {
            return Ok(page.clone());
        }
        let prismic = &self.blog.config.prismic;
        self.source
            .get_by_type(&prismic.document_type, Some(prismic.page_size))
            .await
    }

    /// Render the listing holding the first `number` pages, `None` if there are fewer
    async fn render_listing(&self, number: usize) -> crate::error::Result<Option<String>> {
        let first = self.first_page().await?;
        let mut session = ListingSession::mount(&first, self.generator.formatter().clone())?;

        while session.pages_loaded() < number {
            if !session.has_more() {
                return Ok(None);
            }
            session.load_more(self.source.as_ref()).await?;
        }

        self.generator.renderer().render_listing(&session).map(Some)
    }

    /// Start resolving a post unless a resolution is already running
    async fn resolve_in_background(self: &Arc<Self>, slug: String) {
        if !self.pending.lock().await.insert(slug.clone()) {
            return;
        }

        let state = Arc::clone(self);
        tokio::spawn(async move {
            match state.generator.load_post(state.source.as_ref(), &slug).await {
                Ok(page @ PostPage::Ready(_)) => match state.generator.write_post(&page) {
                    Ok(_) => tracing::info!("Generated post {} on demand", slug),
                    Err(e) => tracing::error!("Failed to write post {}: {}", slug, e),
                },
                Ok(_) => {
                    tracing::info!("Post {} does not exist", slug);
                    state
                        .missing
                        .lock()
                        .await
                        .insert(slug.clone(), Instant::now());
                }
                Err(e) => tracing::error!("Failed to resolve post {}: {}", slug, e),
            }
            state.pending.lock().await.remove(&slug);
        });
    }

    fn not_found(&self) -> Response {
        match self.generator.renderer().render_not_found() {
            Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    }

    fn error_response(&self, error: BlogError) -> Response {
        tracing::error!("{}", error);
        match error {
            BlogError::NotFound { .. } => self.not_found(),
            BlogError::Network { .. } => (StatusCode::BAD_GATEWAY, error.to_string()).into_response(),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/page/:number", get(listing_handler))
        .route("/page/:number/", get(listing_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let source: Arc<dyn ContentSource> = Arc::new(blog.content_source()?);
    let state = Arc::new(ServerState::new(blog, source)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    serve_listing(state, 1).await
}

async fn listing_handler(
    State(state): State<Arc<ServerState>>,
    Path(number): Path<usize>,
) -> Response {
    serve_listing(state, number).await
}

async fn serve_listing(state: Arc<ServerState>, number: usize) -> Response {
    if number == 0 {
        return state.not_found();
    }

    let prebuilt = listing_output_path(&state.blog.public_dir, number);
    if let Ok(html) = tokio::fs::read_to_string(&prebuilt).await {
        return Html(html).into_response();
    }

    match state.render_listing(number).await {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => state.not_found(),
        Err(e) => state.error_response(e),
    }
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if !is_safe_slug(&slug) {
        return state.not_found();
    }

    let path = post_output_path(&state.blog.public_dir, &slug);
    if let Ok(html) = tokio::fs::read_to_string(&path).await {
        return Html(html).into_response();
    }

    if state.missing.lock().await.contains(&slug, Instant::now()) {
        return state.not_found();
    }

    let loading = PostPage::loading(&slug);
    state.resolve_in_background(slug).await;

    match state.generator.renderer().render_post(&loading) {
        Ok(html) => Html(html).into_response(),
        Err(e) => state.error_response(e),
    }
}

/// Serve generated assets from the public directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => state.not_found(),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{PageFetcher, RawImage, RawPost, RawPostData};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Posts a, b, c served one per page. `late-post` exists once published.
    #[derive(Default)]
    struct FakeSource {
        late_published: AtomicBool,
    }

    fn raw(uid: &str) -> RawPost {
        RawPost {
            uid: uid.to_string(),
            first_publication_date: Some("2021-04-19T12:00:00Z".to_string()),
            data: RawPostData {
                title: format!("Post {}", uid),
                subtitle: "Subtitle".to_string(),
                author: "Joseph Oliveira".to_string(),
                banner: Some(RawImage {
                    url: Some("https://images.prismic.io/banner.png".to_string()),
                }),
                content: Vec::new(),
            },
        }
    }

    fn page(index: usize) -> RawPage {
        let uids = ["a", "b", "c"];
        RawPage {
            next_page: (index + 1 < uids.len()).then(|| format!("page-{}", index + 1)),
            results: vec![raw(uids[index])],
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSource {
        async fn fetch_page(&self, url: &str) -> crate::error::Result<RawPage> {
            url.strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .filter(|n: &usize| *n < 3)
                .map(page)
                .ok_or_else(|| BlogError::network(url, "unknown cursor"))
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn get_by_type(
            &self,
            _doc_type: &str,
            _page_size: Option<usize>,
        ) -> crate::error::Result<RawPage> {
            Ok(page(0))
        }

        async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> crate::error::Result<RawPost> {
            let late = uid == "late-post" && self.late_published.load(Ordering::SeqCst);
            if late || ["a", "b", "c", "fresh-post"].contains(&uid) {
                Ok(raw(uid))
            } else {
                Err(BlogError::NotFound {
                    slug: uid.to_string(),
                })
            }
        }
    }

    fn blog(dir: &std::path::Path) -> Blog {
        let config = SiteConfig::default();
        Blog {
            public_dir: dir.join(&config.public_dir),
            base_dir: dir.to_path_buf(),
            config,
        }
    }

    async fn spawn_server(dir: &std::path::Path) -> (String, Blog) {
        let blog = blog(dir);
        let state = ServerState::new(&blog, Arc::new(FakeSource::default())).unwrap();
        (serve(state).await, blog)
    }

    async fn serve(state: ServerState) -> String {
        let state = Arc::new(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn get(url: &str) -> (StatusCode, String) {
        let response = reqwest::get(url).await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.text().await.unwrap())
    }

    /// Poll until the background resolution of `slug` has finished
    async fn wait_for_resolution(base: &str, slug: &str) -> (StatusCode, String) {
        for _ in 0..100 {
            let (status, body) = get(&format!("{}/post/{}/", base, slug)).await;
            if !body.contains("Carregando...") {
                return (status, body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("post {} never resolved", slug);
    }

    #[tokio::test]
    async fn test_listing_pages_are_built_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = spawn_server(dir.path()).await;

        let (status, body) = get(&format!("{}/", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post a"));
        assert!(body.contains(r#"href="/page/2/""#));

        let (status, body) = get(&format!("{}/page/3/", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post a") && body.contains("Post b") && body.contains("Post c"));
        assert!(!body.contains("Carregar mais posts"));

        let (status, _) = get(&format!("{}/page/4/", base)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prebuilt_pages_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let (base, blog) = spawn_server(dir.path()).await;
        let path = post_output_path(&blog.public_dir, "a");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<p>prebuilt</p>").unwrap();

        let (status, body) = get(&format!("{}/post/a", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>prebuilt</p>");
    }

    #[tokio::test]
    async fn test_new_post_is_generated_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let (base, blog) = spawn_server(dir.path()).await;

        let (status, body) = get(&format!("{}/post/fresh-post/", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        let (status, body) = wait_for_resolution(&base, "fresh-post").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post fresh-post"));
        assert!(post_output_path(&blog.public_dir, "fresh-post").exists());
    }

    #[tokio::test]
    async fn test_unknown_post_becomes_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = spawn_server(dir.path()).await;

        let (status, _) = get(&format!("{}/post/missing-slug/", base)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = wait_for_resolution(&base, "missing-slug").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post n\u{e3}o encontrado"));
    }

    #[tokio::test]
    async fn test_post_published_after_not_found_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());
        let source = Arc::new(FakeSource::default());
        let state = ServerState::new(&blog, source.clone())
            .unwrap()
            .with_missing(MissingSlugs::new(Duration::from_millis(200), MISSING_CAPACITY));
        let base = serve(state).await;

        get(&format!("{}/post/late-post/", base)).await;
        let (status, _) = wait_for_resolution(&base, "late-post").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        source.late_published.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;

        let (status, body) = get(&format!("{}/post/late-post/", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        let (status, body) = wait_for_resolution(&base, "late-post").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post late-post"));
    }

    #[test]
    fn test_missing_slugs_are_bounded() {
        let mut missing = MissingSlugs::new(Duration::from_secs(60), 256);
        let start = Instant::now();
        for i in 0..300 {
            missing.insert(format!("junk-{}", i), start + Duration::from_millis(i));
        }

        let now = start + Duration::from_secs(1);
        assert_eq!(missing.len(), 256);
        assert!(!missing.contains("junk-0", now));
        assert!(!missing.contains("junk-43", now));
        assert!(missing.contains("junk-44", now));
        assert!(missing.contains("junk-299", now));
    }

    #[test]
    fn test_missing_slugs_expire() {
        let mut missing = MissingSlugs::new(Duration::from_secs(60), 8);
        let start = Instant::now();
        missing.insert("gone".to_string(), start);

        assert!(missing.contains("gone", start + Duration::from_secs(59)));
        assert!(!missing.contains("gone", start + Duration::from_secs(60)));
        assert!(missing.is_empty());

        // Expired entries are dropped on insert too
        missing.insert("old".to_string(), start);
        missing.insert("new".to_string(), start + Duration::from_secs(61));
        assert_eq!(missing.len(), 1);
    }
}
