//! HTTP-backed link provider
//!
//! Fetches a page with reqwest, requires an HTML content type, and extracts
//! the `href` of every anchor, resolved against the final URL after
//! redirects.

use crate::fetch::{FetchError, FetchResult, LinkProvider};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Link provider that fetches pages over HTTP(S)
pub struct HttpLinkProvider {
    client: Client,
}

impl HttpLinkProvider {
    /// Builds a provider with the given User-Agent and request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl LinkProvider for HttpLinkProvider {
    async fn links(&self, url: &str) -> FetchResult<Vec<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("text/html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        // Resolve relative links against the URL reqwest ended up at.
        let base_url = response.url().clone();

        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(extract_links(&body, &base_url))
    }
}

/// Extracts absolute links from `a[href]` elements in an HTML document
fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, non-navigational schemes such as
/// `javascript:`, `mailto:`, `tel:` and `data:`, and anything that fails to
/// parse.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_links_resolves_relative() {
        let html = r#"<html><body>
            <a href="/one">One</a>
            <a href="two.html">Two</a>
            <a href="https://other.example/three">Three</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/dir/page.html").unwrap();

        let links = extract_links(html, &base);
        assert_eq!(
            links,
            vec![
                "https://example.com/one",
                "https://example.com/dir/two.html",
                "https://other.example/three",
            ]
        );
    }

    #[test]
    fn test_extract_links_skips_special_schemes() {
        let html = r#"<html><body>
            <a href="javascript:void(0)">Js</a>
            <a href="mailto:a@b.c">Mail</a>
            <a href="tel:+1234">Tel</a>
            <a href="data:text/plain,hi">Data</a>
            <a href="ftp://example.com/file">Ftp</a>
            <a href="">Empty</a>
            <a href="/real">Real</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/").unwrap();

        let links = extract_links(html, &base);
        assert_eq!(links, vec!["https://example.com/real"]);
    }

    #[tokio::test]
    async fn test_links_from_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><a href="/page1">P1</a></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let provider = HttpLinkProvider::new("test/1.0", Duration::from_secs(5)).unwrap();
        let links = provider.links(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(links, vec![format!("{}/page1", server.uri())]);
    }

    #[tokio::test]
    async fn test_non_html_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let provider = HttpLinkProvider::new("test/1.0", Duration::from_secs(5)).unwrap();
        let result = provider
            .links(&format!("{}/data.json", server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::NotHtml { .. })));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = HttpLinkProvider::new("test/1.0", Duration::from_secs(5)).unwrap();
        let result = provider.links(&format!("{}/missing", server.uri())).await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
