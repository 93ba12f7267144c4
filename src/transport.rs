//! Raw payload fetching from slurmrestd.
//!
//! [`Fetcher`] is the seam the scrape cache depends on. [`SlurmClient`] is the
//! production implementation: `http://` and `https://` urls go through
//! `reqwest` with the `X-SLURM-USER-*` auth headers, `unix://` urls are sent
//! as plain HTTP/1.0 over the local slurmrestd socket without auth.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::resource::Resource;
use crate::schema::ApiVersion;

/// Fetches one resource payload per call.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, resource: Resource) -> Result<Bytes, FetchError>;
}

/// Status and body of one slurmrestd response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Connection settings for [`SlurmClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub api_user: Option<String>,
    pub api_token: Option<String>,
    pub api_version: ApiVersion,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:6820".to_string(),
            api_user: None,
            api_token: None,
            api_version: ApiVersion::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

enum Transport {
    Http {
        client: reqwest::Client,
        base_url: String,
        user: String,
        token: String,
    },
    Unix {
        socket_path: PathBuf,
    },
}

/// slurmrestd client over TCP or a unix socket.
pub struct SlurmClient {
    transport: Transport,
    api_version: ApiVersion,
    request_timeout: Duration,
}

impl SlurmClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, FetchError> {
        let url = settings.api_url.trim();

        let transport = if let Some(path) = url.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(FetchError::InvalidUrl(url.to_string()));
            }
            Transport::Unix {
                socket_path: PathBuf::from(path),
            }
        } else if url.starts_with("http://") || url.starts_with("https://") {
            let client = reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .connect_timeout(settings.request_timeout)
                .build()
                .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
            Transport::Http {
                client,
                base_url: url.trim_end_matches('/').to_string(),
                user: settings.api_user.clone().unwrap_or_default(),
                token: settings.api_token.clone().unwrap_or_default(),
            }
        } else {
            return Err(FetchError::InvalidUrl(url.to_string()));
        };

        Ok(Self {
            transport,
            api_version: settings.api_version,
            request_timeout: settings.request_timeout,
        })
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Performs one GET without interpreting the status code.
    pub async fn get(&self, resource: Resource) -> Result<RawResponse, FetchError> {
        let path = self.api_version.endpoint(resource);
        let transport_err = |message: String| FetchError::Transport { resource, message };

        match &self.transport {
            Transport::Http {
                client,
                base_url,
                user,
                token,
            } => {
                let resp = client
                    .get(format!("{base_url}/{path}"))
                    .header("Accept", "application/json")
                    .header("X-SLURM-USER-NAME", user)
                    .header("X-SLURM-USER-TOKEN", token)
                    .send()
                    .await
                    .map_err(|e| transport_err(e.to_string()))?;
                let status = resp.status().as_u16();
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| transport_err(format!("failed to read response body: {e}")))?;
                Ok(RawResponse { status, body })
            }
            Transport::Unix { socket_path } => {
                let request = unix_get(socket_path, &path);
                match tokio::time::timeout(self.request_timeout, request).await {
                    Ok(result) => result.map_err(transport_err),
                    Err(_) => Err(transport_err(format!(
                        "request timed out after {:?}",
                        self.request_timeout
                    ))),
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for SlurmClient {
    #[instrument(skip(self))]
    async fn fetch(&self, resource: Resource) -> Result<Bytes, FetchError> {
        debug!("Performing slurmrestd request");
        let response = self.get(resource).await?;
        classify_response(resource, response)
    }
}

/// Sends `GET /<path>` over the socket and splits the HTTP/1.0 response.
async fn unix_get(socket_path: &Path, path: &str) -> Result<RawResponse, String> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| format!("failed to connect to {}: {}", socket_path.display(), e))?;

    let request = format!(
        "GET /{path} HTTP/1.0\r\nHost: localhost\r\nAccept: application/json\r\nConnection: close\r\n\r\n"
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| format!("failed to write request: {e}"))?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;

    parse_http_response(&raw)
}

/// Splits a raw HTTP/1.x response into status code and body.
fn parse_http_response(raw: &[u8]) -> Result<RawResponse, String> {
    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| "invalid HTTP response from slurmrestd socket".to_string())?;

    let head = String::from_utf8_lossy(&raw[..header_end]);
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| "missing status line in slurmrestd response".to_string())?;

    Ok(RawResponse {
        status,
        body: Bytes::copy_from_slice(&raw[header_end + 4..]),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorEntry {
    description: Option<String>,
    error: Option<String>,
}

/// Extracts `errors[].description` from a slurmrestd error body.
fn api_error_message(body: &[u8]) -> String {
    let parsed: ApiErrorBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return "tried to get more data about the error but failed. try debug mode for more information"
                .to_string()
        }
    };
    let messages: Vec<String> = parsed
        .errors
        .into_iter()
        .filter_map(|e| e.description.or(e.error))
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        "no error description in response".to_string()
    } else {
        messages.join("; ")
    }
}

/// Maps a response status onto the payload or a [`FetchError`].
pub fn classify_response(resource: Resource, response: RawResponse) -> Result<Bytes, FetchError> {
    match response.status {
        200 => {
            debug!("Successfully queried slurmrestd {} data", resource);
            Ok(response.body)
        }
        401 => Err(FetchError::Unauthorized { resource }),
        500 => {
            debug!(
                "Unexpected status 500 for {}: {}",
                resource,
                String::from_utf8_lossy(&response.body)
            );
            Err(FetchError::Server {
                resource,
                message: api_error_message(&response.body),
            })
        }
        status => {
            debug!(
                "Unexpected status {} for {}: {}",
                status,
                resource,
                String::from_utf8_lossy(&response.body)
            );
            Err(FetchError::UnexpectedStatus { resource, status })
        }
    }
}
