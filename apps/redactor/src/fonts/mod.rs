//! Font resolution: fetches the embeddable typeface used for the redaction overlay.
//!
//! Never fails: any network error, non-2xx status, or unparseable font file
//! yields a `FontAsset` of kind `Fallback` with no bytes. The renderer then uses
//! the built-in Latin-only face and ASCII labels.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const FONT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("font server returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontKind {
    Embedded,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontAsset {
    bytes: Option<Vec<u8>>,
}

impl FontAsset {
    /// Wraps downloaded font bytes. Bytes that do not parse as a font face
    /// produce a fallback asset.
    pub fn embedded(bytes: Vec<u8>) -> Self {
        if ttf_parser::Face::parse(&bytes, 0).is_ok() {
            Self { bytes: Some(bytes) }
        } else {
            warn!("Font file could not be parsed; using fallback font");
            Self::fallback()
        }
    }

    pub fn fallback() -> Self {
        Self { bytes: None }
    }

    pub fn kind(&self) -> FontKind {
        match self.bytes {
            Some(_) => FontKind::Embedded,
            None => FontKind::Fallback,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }
}

/// Source of the overlay typeface. Implementations must not fail.
#[async_trait]
pub trait FontSource: Send + Sync {
    async fn resolve(&self) -> FontAsset;
}

/// Fetches the font with a single GET.
pub struct HttpFontResolver {
    client: Client,
    url: String,
}

impl HttpFontResolver {
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(FONT_FETCH_TIMEOUT_SECS))
                .build()?,
            url,
        })
    }

    async fn fetch(&self) -> Result<Vec<u8>, FontError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FontError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl FontSource for HttpFontResolver {
    async fn resolve(&self) -> FontAsset {
        match self.fetch().await {
            Ok(bytes) => {
                info!("Fetched overlay font ({} bytes)", bytes.len());
                FontAsset::embedded(bytes)
            }
            Err(e) => {
                warn!("Font fetch from {} failed: {e}; using fallback font", self.url);
                FontAsset::fallback()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{routing::get, Router};

    /// Latin-only TrueType face (DejaVu Sans Mono, no Hangul coverage).
    pub(crate) const LATIN_FACE: &[u8] = include_bytes!("../../fixtures/DejaVuSansMono.ttf");

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/font.ttf")
    }

    #[test]
    fn test_fallback_has_no_bytes() {
        let asset = FontAsset::fallback();
        assert_eq!(asset.kind(), FontKind::Fallback);
        assert!(asset.bytes().is_none());
    }

    #[test]
    fn test_garbage_bytes_degrade_to_fallback() {
        let asset = FontAsset::embedded(b"<html>not a font</html>".to_vec());
        assert_eq!(asset.kind(), FontKind::Fallback);
    }

    #[test]
    fn test_truetype_bytes_are_embedded() {
        let asset = FontAsset::embedded(LATIN_FACE.to_vec());
        assert_eq!(asset.kind(), FontKind::Embedded);
        assert_eq!(asset.bytes().unwrap().len(), LATIN_FACE.len());
    }

    #[tokio::test]
    async fn test_unreachable_url_resolves_to_fallback() {
        // port 9 (discard) is closed on loopback; the connection is refused
        let resolver = HttpFontResolver::new("http://127.0.0.1:9/font.ttf".to_string()).unwrap();
        let asset = resolver.resolve().await;
        assert_eq!(asset.kind(), FontKind::Fallback);
    }

    #[tokio::test]
    async fn test_invalid_url_resolves_to_fallback() {
        let resolver = HttpFontResolver::new("not a url".to_string()).unwrap();
        assert_eq!(resolver.resolve().await.kind(), FontKind::Fallback);
    }

    #[tokio::test]
    async fn test_not_found_status_resolves_to_fallback() {
        let url = serve(Router::new().route(
            "/font.ttf",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "no such font") }),
        ))
        .await;
        let resolver = HttpFontResolver::new(url).unwrap();

        let err = resolver.fetch().await.unwrap_err();
        assert!(matches!(err, FontError::Status(status) if status.as_u16() == 404));
        assert_eq!(resolver.resolve().await.kind(), FontKind::Fallback);
    }

    #[tokio::test]
    async fn test_non_font_body_resolves_to_fallback() {
        let url = serve(Router::new().route(
            "/font.ttf",
            get(|| async { "<html>font moved</html>" }),
        ))
        .await;
        let resolver = HttpFontResolver::new(url).unwrap();
        assert_eq!(resolver.resolve().await.kind(), FontKind::Fallback);
    }

    #[tokio::test]
    async fn test_font_body_resolves_to_embedded() {
        let url = serve(Router::new().route(
            "/font.ttf",
            get(|| async { LATIN_FACE.to_vec() }),
        ))
        .await;
        let resolver = HttpFontResolver::new(url).unwrap();

        let asset = resolver.resolve().await;
        assert_eq!(asset.kind(), FontKind::Embedded);
        assert_eq!(asset.bytes().unwrap(), LATIN_FACE);
    }
}
