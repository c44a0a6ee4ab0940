//! Drive REST adapter.
//!
//! Thin request/response shaping over the Drive v3 API: create a native
//! document from text, grant a user permission, resolve a file's MIME type,
//! and drain document content through export or raw media download. Each
//! operation is a single remote call (two for read) with no retry; any
//! service failure propagates as [`DriveError::RemoteService`].

use crate::content::DocContent;
use crate::link::extract_file_id;
use crate::{DriveError, Result};
use reqwest::{StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

/// MIME type of a native Drive document.
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
/// MIME type of a plain-text file.
pub const PLAIN_TEXT_MIME: &str = "text/plain";
/// Role granted when the share request names none.
pub const DEFAULT_SHARE_ROLE: &str = "writer";

const UPLOAD_BOUNDARY: &str = "gdrive_mcp_upload_boundary";
const DOWNLOAD_CHUNK_SIZE: u64 = 256 * 1024;

static API_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://www.googleapis.com/drive/v3/")
        .expect("unreachable error: failed to parse default API base URL")
});
static UPLOAD_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://www.googleapis.com/upload/drive/v3/")
        .expect("unreachable error: failed to parse default upload base URL")
});

/// Outcome of a read: content, or an explicit empty-file signal.
///
/// Failures are `Err`, never folded into `Empty`, so callers can always tell
/// an empty file from a failed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Content(String),
    Empty,
}

#[derive(Debug, Deserialize)]
struct FileResource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
}

fn multipart_related_body(metadata: &str, text: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + text.len() + 256);
    body.extend_from_slice(format!("--{UPLOAD_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{UPLOAD_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: text/plain; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(text.as_bytes());
    body.extend_from_slice(format!("\r\n--{UPLOAD_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Parse the total length out of a `Content-Range: bytes a-b/total` header.
fn content_range_total(header_value: &str) -> Option<u64> {
    header_value.rsplit_once('/')?.1.parse().ok()
}

/// Client for the Drive v3 REST API.
///
/// Holds an already-valid access token; credential acquisition lives in
/// [`crate::auth`]. Base URLs are overridable so tests can point at a mock
/// service.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: Url,
    upload_base: Url,
    access_token: String,
    chunk_size: u64,
}

impl DriveClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: API_BASE_URL.clone(),
            upload_base: UPLOAD_BASE_URL.clone(),
            access_token: access_token.into(),
            chunk_size: DOWNLOAD_CHUNK_SIZE,
        }
    }

    /// Override the ranged-download chunk size (bytes per round trip).
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override the API base URL (must end with a trailing slash).
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.api_base = url;
        self
    }

    /// Override the upload base URL (must end with a trailing slash).
    pub fn with_upload_base_url(mut self, url: Url) -> Self {
        self.upload_base = url;
        self
    }

    /// Create a native Drive document with the given title and text content.
    ///
    /// `folder_id`, when present, becomes the sole parent container; otherwise
    /// the document lands in the Drive root. Returns the new file's ID.
    pub async fn create_document(
        &self,
        title: &str,
        content: DocContent,
        folder_id: Option<&str>,
    ) -> Result<String> {
        let mut metadata = json!({"name": title, "mimeType": DOCUMENT_MIME});
        if let Some(folder_id) = folder_id {
            metadata["parents"] = json!([folder_id]);
        }
        let body = multipart_related_body(&metadata.to_string(), content.as_text());

        let mut url = self.upload_base.join("files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={UPLOAD_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;
        let file: FileResource = Self::unwrap_json(response).await?;
        let file_id = file.id.ok_or_else(|| DriveError::RemoteService {
            status: 200,
            message: "create response carried no file ID".to_string(),
        })?;
        info!(title, file_id = %file_id, "created document");
        Ok(file_id)
    }

    /// Grant a user access to a file at the given role (default "writer"),
    /// with the service instructed to email the grantee. No local validation
    /// of `file_id` or `email`; the service's own errors are authoritative.
    pub async fn share_document(
        &self,
        file_id: &str,
        email: &str,
        role: Option<&str>,
    ) -> Result<String> {
        let role = role.unwrap_or(DEFAULT_SHARE_ROLE);
        let mut url = self.api_base.join(&format!("files/{file_id}/permissions"))?;
        url.query_pairs_mut().append_pair("sendNotificationEmail", "true");

        let permission = json!({"type": "user", "role": role, "emailAddress": email});
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&permission)
            .send()
            .await?;
        Self::check_status(response).await?;
        info!(file_id, email, role, "shared document");
        Ok(format!("Shared with {email} as {role}"))
    }

    /// Look up a file's MIME type.
    pub async fn file_mime_type(&self, file_id: &str) -> Result<String> {
        let mut url = self.api_base.join(&format!("files/{file_id}"))?;
        url.query_pairs_mut().append_pair("fields", "mimeType");

        let response = self.http.get(url).bearer_auth(&self.access_token).send().await?;
        let file: FileResource = Self::unwrap_json(response).await?;
        file.mime_type.ok_or_else(|| DriveError::RemoteService {
            status: 200,
            message: "metadata response carried no mimeType".to_string(),
        })
    }

    /// Read a document's text content from a share URL.
    ///
    /// Native documents are exported as plain text; plain-text files are
    /// downloaded raw; any other MIME type is [`DriveError::UnsupportedFormat`]
    /// and no download is attempted.
    pub async fn read_document(&self, file_url: &str) -> Result<ReadOutcome> {
        let file_id = extract_file_id(file_url)?;
        let mime_type = self.file_mime_type(&file_id).await?;

        let url = match mime_type.as_str() {
            DOCUMENT_MIME => {
                let mut url = self.api_base.join(&format!("files/{file_id}/export"))?;
                url.query_pairs_mut().append_pair("mimeType", PLAIN_TEXT_MIME);
                url
            }
            PLAIN_TEXT_MIME => {
                let mut url = self.api_base.join(&format!("files/{file_id}"))?;
                url.query_pairs_mut().append_pair("alt", "media");
                url
            }
            other => return Err(DriveError::UnsupportedFormat(other.to_string())),
        };

        let bytes = self.download(url).await?;
        if bytes.is_empty() {
            return Ok(ReadOutcome::Empty);
        }
        let text = String::from_utf8(bytes).map_err(|e| DriveError::RemoteService {
            status: 200,
            message: format!("content is not valid UTF-8: {e}"),
        })?;
        Ok(ReadOutcome::Content(text))
    }

    /// Drain a download in ranged chunks until the service reports the final
    /// one. Completion may only become known on the last chunk; the loop has
    /// no iteration bound.
    async fn download(&self, url: Url) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let start = buffer.len() as u64;
            let end = start + self.chunk_size - 1;
            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .header(header::RANGE, format!("bytes={start}-{end}"))
                .send()
                .await?;

            match response.status() {
                // Whole body in one response; the service ignored the range.
                StatusCode::OK => {
                    if start != 0 {
                        return Err(DriveError::RemoteService {
                            status: 200,
                            message: "service restarted the download mid-stream".to_string(),
                        });
                    }
                    return Ok(response.bytes().await?.to_vec());
                }
                StatusCode::PARTIAL_CONTENT => {
                    let total = response
                        .headers()
                        .get(header::CONTENT_RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(content_range_total);
                    let requested = (end - start + 1) as usize;
                    let chunk = response.bytes().await?;
                    let chunk_len = chunk.len();
                    buffer.extend_from_slice(&chunk);
                    debug!(received = buffer.len(), chunk = chunk_len, "fetched download chunk");

                    let done = match total {
                        Some(total) => buffer.len() as u64 >= total,
                        // No usable Content-Range: a short chunk is the end.
                        None => chunk_len < requested,
                    };
                    if done {
                        return Ok(buffer);
                    }
                }
                // Zero-length file: nothing to fetch.
                StatusCode::RANGE_NOT_SATISFIABLE => return Ok(buffer),
                status => {
                    let message = response.text().await.unwrap_or_default();
                    return Err(DriveError::RemoteService { status: status.as_u16(), message });
                }
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(DriveError::RemoteService { status, message })
    }

    async fn unwrap_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }
}
