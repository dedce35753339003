//! Single-page fetch and readable-text extraction.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};

use crate::core::errors::ApiError;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(3);
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const STRIPPED_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];
const CONTENT_ROOTS: [&str; 3] = ["main", "article", "body"];

/// Best-effort page reader: an empty string means "nothing usable", never
/// an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, max_chars: usize) -> String;
}

#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DESKTOP_USER_AGENT)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!("HTTP {}", response.status())));
        }

        response.text().await.map_err(ApiError::internal)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, max_chars: usize) -> String {
        match self.fetch_html(url).await {
            Ok(html) => extract_readable_text(&html, max_chars),
            Err(err) => {
                tracing::debug!(url = %url, "page fetch failed: {}", err);
                String::new()
            }
        }
    }
}

/// Plain text of the page's main region (`<main>`, else `<article>`, else
/// `<body>`), skipping chrome such as scripts and navigation, whitespace
/// collapsed and cut to `max_chars` characters.
pub fn extract_readable_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);
    let Some(root) = content_root(&doc) else {
        return String::new();
    };

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|ancestor| is_stripped(ancestor.value())) {
            continue;
        }
        raw.push_str(text);
        raw.push(' ');
    }

    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&normalized, max_chars)
}

/// First `main` or `article` that does not sit inside stripped chrome (a
/// sidebar teaser card, a header landmark), else `body`.
fn content_root(doc: &Html) -> Option<ElementRef<'_>> {
    CONTENT_ROOTS.iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        doc.select(&selector)
            .find(|el| !el.ancestors().any(|ancestor| is_stripped(ancestor.value())))
    })
}

fn is_stripped(node: &Node) -> bool {
    node.as_element()
        .map(|el| STRIPPED_TAGS.contains(&el.name()))
        .unwrap_or(false)
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn prefers_main_and_drops_page_chrome() {
        let html = r#"
            <html><head><title>T</title><style>.x{}</style></head>
            <body>
              <header>Menú principal</header>
              <nav>Inicio | Recursos</nav>
              <main>
                <h1>Fracciones</h1>
                <p>Una fracción   representa
                   partes de un todo.</p>
                <script>track()</script>
                <aside>Publicidad</aside>
              </main>
              <footer>© 2024</footer>
            </body></html>"#;

        let text = extract_readable_text(html, 1_000);

        assert_eq!(text, "Fracciones Una fracción representa partes de un todo.");
    }

    #[test]
    fn falls_back_to_article_then_body() {
        let article = "<body><p>fuera</p><article><p>dentro</p></article></body>";
        assert_eq!(extract_readable_text(article, 100), "dentro");

        let body = "<body><nav>menu</nav><p>solo cuerpo</p></body>";
        assert_eq!(extract_readable_text(body, 100), "solo cuerpo");
    }

    #[test]
    fn regions_nested_in_page_chrome_are_not_chosen() {
        let sidebar_card = "<body><div><h1>Fracciones</h1><p>Una fraccion es parte de un todo.</p></div>\
                            <aside><article>Relacionado</article></aside></body>";
        assert_eq!(
            extract_readable_text(sidebar_card, 800),
            "Fracciones Una fraccion es parte de un todo."
        );

        let header_main = "<body><header><main>logo</main></header><p>contenido real</p></body>";
        assert_eq!(extract_readable_text(header_main, 800), "contenido real");

        let both = "<body><aside><article>teaser</article></aside><article>nota completa</article></body>";
        assert_eq!(extract_readable_text(both, 800), "nota completa");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        let html = "<main>educación básica</main>";
        assert_eq!(extract_readable_text(html, 8), "educació");
        assert_eq!(truncate_chars("ñandú", 0), "");
        assert_eq!(truncate_chars("ñandú", 10), "ñandú");
    }

    #[tokio::test]
    async fn fetch_sends_desktop_user_agent() {
        let router = Router::new().route(
            "/page",
            get(|headers: HeaderMap| async move {
                let ua = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                axum::response::Html(format!("<main>{}</main>", ua))
            }),
        );
        let base = spawn(router).await;
        let fetcher = HttpPageFetcher::new().unwrap();

        let text = fetcher.fetch(&format!("{}/page", base), 2_000).await;

        assert_eq!(text, DESKTOP_USER_AGENT);
    }

    #[tokio::test]
    async fn failures_become_empty_text() {
        let router = Router::new()
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "<main>nope</main>") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "<main>late</main>"
                }),
            );
        let base = spawn(router).await;
        let fetcher = HttpPageFetcher::with_timeout(Duration::from_millis(100)).unwrap();

        assert_eq!(fetcher.fetch(&format!("{}/missing", base), 100).await, "");
        assert_eq!(fetcher.fetch(&format!("{}/slow", base), 100).await, "");
        assert_eq!(fetcher.fetch("not a url", 100).await, "");
    }
}
