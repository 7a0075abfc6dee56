//! GitHub Contents API client for the shared catalog document.
//!
//! The catalog lives as one JSON file in a repository; the file's blob SHA
//! is the content token for optimistic-concurrency writes.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CatalogDocument, RemoteConfig};
use crate::util::{compact_text, is_http_url};

use super::{RemoteDocumentClient, RemoteSnapshot};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("shelf/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct GitHubContentsClient {
    config: RemoteConfig,
    api_base: String,
    client: reqwest::Client,
}

impl fmt::Debug for GitHubContentsClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GitHubContentsClient")
            .field("repository", &self.config.repository)
            .field("branch", &self.config.branch)
            .field("file_path", &self.config.file_path)
            .finish()
    }
}

impl GitHubContentsClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (e.g. GitHub Enterprise or
    /// a local test server).
    pub fn with_api_base(config: RemoteConfig, api_base: impl Into<String>) -> Result<Self> {
        if !config.is_configured() {
            return Err(Error::InvalidInput(
                "remote token and repository must be configured".into(),
            ));
        }
        config.owner_and_name()?;

        let api_base = api_base.into().trim_end_matches('/').to_string();
        if !is_http_url(&api_base) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| Error::RemoteUnavailable(error.to_string()))?;

        Ok(Self {
            config,
            api_base,
            client,
        })
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.config.repository,
            encode_path(&self.config.file_path)
        )
    }
}

impl RemoteDocumentClient for GitHubContentsClient {
    async fn read(&self) -> Result<RemoteSnapshot> {
        let response = self
            .client
            .get(self.contents_url())
            .query(&[("ref", self.config.branch.as_str())])
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("remote catalog document does not exist yet");
                Ok(RemoteSnapshot::default())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized(status_message(response).await))
            }
            status if status.is_success() => {
                let body: ContentsResponse = response
                    .json()
                    .await
                    .map_err(|error| Error::InvalidRemoteFormat(error.to_string()))?;
                let document = decode_document(body.content.as_deref().unwrap_or_default())?;
                Ok(RemoteSnapshot {
                    document: Some(document),
                    token: Some(body.sha),
                })
            }
            _ => Err(Error::RemoteUnavailable(status_message(response).await)),
        }
    }

    async fn write(
        &self,
        document: &CatalogDocument,
        expected_token: Option<&str>,
    ) -> Result<String> {
        let body = serde_json::to_string_pretty(document)?;
        let payload = WritePayload {
            message: format!("Update catalog ({} books)", document.books.len()),
            content: BASE64_STANDARD.encode(body),
            branch: &self.config.branch,
            sha: expected_token,
        };

        let response = self
            .client
            .put(self.contents_url())
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            // 409 is the documented stale-sha answer; 422 covers creating a
            // file that already exists (a write raced ours)
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(Error::Conflict(status_message(response).await))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized(status_message(response).await))
            }
            status if status.is_success() => {
                let body: WriteResponse = response
                    .json()
                    .await
                    .map_err(|error| Error::InvalidRemoteFormat(error.to_string()))?;
                Ok(body.content.sha)
            }
            _ => Err(Error::RemoteUnavailable(status_message(response).await)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    /// Base64-encoded file body; GitHub inserts line breaks
    content: Option<String>,
    sha: String,
}

#[derive(Debug, Serialize)]
struct WritePayload<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a base64 Contents API body into a catalog document.
///
/// An empty body maps to an empty document; anything that decodes but is
/// not the expected document shape is `InvalidRemoteFormat`.
fn decode_document(encoded: &str) -> Result<CatalogDocument> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(CatalogDocument::default());
    }

    let bytes = BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|error| Error::InvalidRemoteFormat(format!("invalid base64 content: {error}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|error| Error::InvalidRemoteFormat(format!("not a catalog document: {error}")))
}

async fn status_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(&body) {
        if let Some(message) = payload.message {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(&body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, BookDraft};

    fn config() -> RemoteConfig {
        RemoteConfig::new("ghp_secret", "alice/books")
    }

    #[test]
    fn test_new_rejects_unconfigured_remote() {
        let error = GitHubContentsClient::new(RemoteConfig::new("", "alice/books")).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));

        let error = GitHubContentsClient::new(RemoteConfig::new("t", "no-slash")).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[test]
    fn test_with_api_base_rejects_missing_scheme() {
        let error = GitHubContentsClient::with_api_base(config(), "api.github.com").unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[test]
    fn test_contents_url_encodes_path_segments() {
        let mut cfg = config();
        cfg.file_path = "data/my books.json".to_string();
        let client = GitHubContentsClient::new(cfg).unwrap();
        assert_eq!(
            client.contents_url(),
            "https://api.github.com/repos/alice/books/contents/data/my%20books.json"
        );
    }

    #[test]
    fn test_decode_document_tolerates_line_breaks() {
        let document = CatalogDocument::new(
            vec![Book::from_draft(
                BookDraft::new("Dune", "Frank Herbert"),
                "b1".parse().unwrap(),
                1_000,
            )
            .unwrap()],
            3,
            Some(2_000),
        );
        let encoded = BASE64_STANDARD.encode(serde_json::to_string(&document).unwrap());

        // GitHub wraps base64 bodies at 60 columns
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let decoded = decode_document(&wrapped).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_decode_document_empty_body_is_empty_document() {
        assert_eq!(decode_document("").unwrap(), CatalogDocument::default());
    }

    #[test]
    fn test_decode_document_rejects_wrong_shape() {
        let encoded = BASE64_STANDARD.encode(r#"{"version": 3}"#);
        let error = decode_document(&encoded).unwrap_err();
        assert!(matches!(error, Error::InvalidRemoteFormat(_)));

        let error = decode_document("!!! not base64 !!!").unwrap_err();
        assert!(matches!(error, Error::InvalidRemoteFormat(_)));
    }

    #[test]
    fn test_debug_omits_token() {
        let client = GitHubContentsClient::new(config()).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("alice/books"));
    }
}
