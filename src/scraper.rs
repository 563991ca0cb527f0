use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, Response, header::CONTENT_TYPE};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AppError, Result};

pub const EXCERPT_LINE_LIMIT: usize = 50;
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// Create static selectors to avoid recompiling them each time
static HEADER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("header").expect("Failed to parse header selector")
});
static NAV_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("nav").expect("Failed to parse nav selector")
});
static HERO_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("section, div").expect("Failed to parse section selector")
});

// Verification failures only; a server demanding a client certificate is not retried.
const CERT_VERIFY_MARKERS: &[&str] = &[
    "certificate verify failed",
    "invalid peer certificate",
    "self-signed",
    "self signed",
    "unknownissuer",
    "unknown issuer",
    "certificate has expired",
    "notvalidforname",
    "cert verify",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A fetched response, before any interpretation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    async fn from_response(response: Response) -> Result<Self> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(FetchResult {
            status,
            content_type,
            body,
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Verified,
    Unverified,
}

/// HTTP clients for page fetching and proxy relaying, built once at startup.
pub struct PageFetcher {
    client: Client,
    insecure_client: Client,
    relay_client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let builder = || {
            ClientBuilder::new()
                .timeout(timeout)
                .user_agent(BROWSER_USER_AGENT)
                .pool_max_idle_per_host(10)
        };
        let client = builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let insecure_client = builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let relay_client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(PageFetcher {
            client,
            insecure_client,
            relay_client,
        })
    }

    /// Fetches a landing page. Non-2xx responses are errors.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchResult> {
        let url = parse_url(url)?;
        let response = with_tls_fallback(url.as_str(), |mode| {
            let client = match mode {
                TlsMode::Verified => &self.client,
                TlsMode::Unverified => &self.insecure_client,
            };
            client.get(url.clone()).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let page = FetchResult::from_response(response).await?;
        debug!(url = %url, bytes = page.body.len(), "page fetched");
        Ok(page)
    }

    /// Fetches `url` for the proxy relay; the origin status is passed through as-is.
    pub async fn relay(&self, url: &str) -> Result<FetchResult> {
        let url = parse_url(url)?;
        let response = self.relay_client.get(url).send().await?;
        FetchResult::from_response(response).await
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::Fetch(format!("Invalid URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Fetch(format!("Unsupported URL scheme '{}'", url.scheme())));
    }
    Ok(url)
}

/// Runs `attempt` with verification on, and once more with it off only when
/// the first failure was a certificate problem.
pub async fn with_tls_fallback<T, E, F, Fut>(url: &str, mut attempt: F) -> std::result::Result<T, E>
where
    F: FnMut(TlsMode) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: StdError + 'static,
{
    match attempt(TlsMode::Verified).await {
        Err(err) if is_certificate_error(&err) => {
            warn!(url, error = %err, "TLS certificate verification failed, retrying without verification");
            attempt(TlsMode::Unverified).await
        }
        other => other,
    }
}

/// Walks the source chain looking for a certificate verification failure.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let msg = e.to_string().to_ascii_lowercase();
        if CERT_VERIFY_MARKERS.iter().any(|marker| msg.contains(marker)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// The bounded markup snippet sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt(String);

impl Excerpt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

/// Header, nav and the first section-or-div, prettified and cut to 50 lines.
pub fn extract_excerpt(html: &str) -> Result<Excerpt> {
    let document = Html::parse_document(html);

    let fragments: Vec<String> = [&*HEADER_SELECTOR, &*NAV_SELECTOR, &*HERO_SELECTOR]
        .into_iter()
        .filter_map(|selector| document.select(selector).next())
        .map(prettify)
        .collect();

    let joined = fragments.join("\n");
    let truncated = joined
        .lines()
        .take(EXCERPT_LINE_LIMIT)
        .collect::<Vec<_>>()
        .join("\n");

    if truncated.trim().is_empty() {
        return Err(AppError::EmptyContent);
    }
    Ok(Excerpt(truncated))
}

/// One tag or text node per line, indented one space per level.
pub fn prettify(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_element(element, 0, &mut out);
    out.truncate(out.trim_end().len());
    out
}

fn write_element(element: ElementRef<'_>, depth: usize, out: &mut String) {
    let value = element.value();
    let name = value.name();

    push_indent(out, depth);
    out.push('<');
    out.push_str(name);
    for (attr, val) in value.attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        push_escaped(out, val, true);
        out.push('"');
    }
    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");

    let raw_text = matches!(name, "script" | "style");
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, depth + 1, out);
                }
            }
            Node::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                push_indent(out, depth + 1);
                if raw_text {
                    out.push_str(text);
                } else {
                    push_escaped(out, text, false);
                }
                out.push('\n');
            }
            Node::Comment(comment) => {
                push_indent(out, depth + 1);
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->\n");
            }
            _ => {}
        }
    }

    push_indent(out, depth);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn push_indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat(' ').take(depth));
}

fn push_escaped(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
