//! Bounded URL fetcher used by tools that accept a `url` argument.
//!
//! Downloads are capped in time and size, restricted to http/https on
//! non-local hosts, and HTML is reduced to readable text before analysis.

use std::time::Duration;

use futures::StreamExt;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FETCH_BYTES: usize = 5 * 1024 * 1024;
const USER_AGENT: &str = concat!("lexis/", env!("CARGO_PKG_VERSION"));

const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Refusing to fetch local address: {0}")]
    LocalAddress(String),

    #[error("HTTP {status}: failed to fetch content from {url}")]
    Status { status: u16, url: String },

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Content too large (exceeded {0} bytes)")]
    TooLarge(usize),

    #[error("No readable text content found")]
    NoContent,

    #[error("Failed to fetch URL: {0}")]
    Network(#[from] reqwest::Error),
}

/// Text extracted from one fetched page
#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub text: String,
    pub word_count: usize,
}

/// Fetch a page and reduce it to readable text.
pub async fn fetch_url_content(url: &str) -> Result<FetchedPage, FetchError> {
    let parsed = validate_url(url)?;
    info!(%parsed, "Fetching URL content");

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;

    let response = client
        .get(parsed.clone())
        .header("Accept", "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    let supported = ["text/html", "application/xhtml", "text/plain"]
        .iter()
        .any(|ct| content_type.contains(ct));
    if !content_type.is_empty() && !supported {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    if let Some(length) = response.content_length() {
        if length as usize > MAX_FETCH_BYTES {
            return Err(FetchError::TooLarge(MAX_FETCH_BYTES));
        }
    }

    let mut body: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > MAX_FETCH_BYTES {
            return Err(FetchError::TooLarge(MAX_FETCH_BYTES));
        }
        body.extend_from_slice(&chunk);
    }

    let raw = String::from_utf8_lossy(&body);
    let page = if content_type.contains("text/plain") {
        FetchedPage {
            url: url.to_string(),
            title: String::new(),
            text: collapse_whitespace(&raw),
            word_count: 0,
        }
    } else {
        extract_page(url, &raw)
    };

    if page.text.trim().is_empty() {
        warn!(url, "Fetched page produced no readable text");
        return Err(FetchError::NoContent);
    }

    let word_count = page.text.split_whitespace().count();
    debug!(url, word_count, "Extracted page text");
    Ok(FetchedPage { word_count, ..page })
}

fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?
        .to_lowercase();
    if BLOCKED_HOSTS.iter().any(|blocked| host == *blocked) {
        return Err(FetchError::LocalAddress(host));
    }
    Ok(parsed)
}

/// Strip markup down to text. Script, style and comment blocks go first so
/// their contents never leak into the output.
fn extract_page(url: &str, html: &str) -> FetchedPage {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
        .unwrap()
        .captures(html)
        .map(|c| collapse_whitespace(&decode_entities(c[1].trim())))
        .unwrap_or_default();

    let mut text = html.to_string();
    for pattern in [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?is)<style[^>]*>.*?</style>",
        r"(?is)<noscript[^>]*>.*?</noscript>",
        r"(?is)<head[^>]*>.*?</head>",
        r"(?s)<!--.*?-->",
    ] {
        text = Regex::new(pattern).unwrap().replace_all(&text, " ").to_string();
    }
    text = Regex::new(r"<[^>]+>")
        .unwrap()
        .replace_all(&text, " ")
        .to_string();

    FetchedPage {
        url: url.to_string(),
        title,
        text: collapse_whitespace(&decode_entities(&text)),
        word_count: 0,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

fn collapse_whitespace(text: &str) -> String {
    Regex::new(r"\s+")
        .unwrap()
        .replace_all(text, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(validate_url("https://example.com/page").is_ok());
    }

    #[test]
    fn rejects_local_hosts() {
        assert!(matches!(
            validate_url("http://localhost:8080/"),
            Err(FetchError::LocalAddress(_))
        ));
        assert!(matches!(
            validate_url("http://127.0.0.1/admin"),
            Err(FetchError::LocalAddress(_))
        ));
    }

    #[test]
    fn extracts_title_and_body_text() {
        let html = r#"
            <html>
              <head><title>A Page</title><style>body { color: red; }</style></head>
              <body>
                <script>var x = 1;</script>
                <h1>Heading</h1>
                <p>First paragraph with &amp; entity.</p>
                <!-- hidden comment -->
              </body>
            </html>
        "#;
        let page = extract_page("https://example.com", html);
        assert_eq!(page.title, "A Page");
        assert!(page.text.contains("Heading"));
        assert!(page.text.contains("First paragraph with & entity."));
        assert!(!page.text.contains("var x"));
        assert!(!page.text.contains("color: red"));
        assert!(!page.text.contains("hidden comment"));
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
    }
}
