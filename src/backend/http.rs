//! reqwest implementation of [`UploadBackend`].

use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{ProcessingState, UploadProgress};

use super::{AuthOutcome, AuthStatus, ProgressSender, UploadBackend, UploadRequest, UploadResponse};

/// Header carrying the anti-forgery token on state-changing requests
pub(crate) const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct AuthBody {
    #[serde(default)]
    authenticated: bool,
}

#[derive(Deserialize)]
struct CreatedBody {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: Option<String>,
}

/// Production [`UploadBackend`] talking JSON and multipart over HTTP.
///
/// The session is cookie-based, so the client keeps a cookie store: the cookie set
/// by `auth/status` or `auth` is presented on every later request.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    chunk_size: usize,
}

impl HttpBackend {
    /// Build a backend from the server and upload settings of `config`
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.server.parsed_base_url()?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.server.request_timeout)
            .user_agent(config.server.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base,
            chunk_size: config.upload.chunk_size.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

/// Pull the `error` field out of a failure body; empty messages count as absent
async fn error_message(response: reqwest::Response) -> Option<String> {
    let bytes = response.bytes().await.ok()?;
    serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()?
        .error
        .filter(|message| !message.is_empty())
}

#[async_trait::async_trait]
impl UploadBackend for HttpBackend {
    async fn auth_status(&self) -> Result<AuthStatus> {
        let url = self.endpoint("auth/status")?;
        let response = self.client.get(url).send().await?;
        let status = response.json::<AuthStatus>().await?;
        tracing::debug!(authenticated = status.authenticated, "auth status fetched");
        Ok(status)
    }

    async fn authenticate(&self, password: &str, csrf_token: &str) -> Result<AuthOutcome> {
        let url = self.endpoint("auth")?;
        let response = self
            .client
            .post(url)
            .header(CSRF_HEADER, csrf_token)
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(AuthOutcome::Rejected {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let bytes = response.bytes().await?;
        let body: AuthBody = serde_json::from_slice(&bytes).map_err(|e| {
            Error::InvalidResponse(format!("auth response is not valid JSON: {}", e))
        })?;
        Ok(AuthOutcome::Accepted {
            authenticated: body.authenticated,
        })
    }

    async fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressSender,
    ) -> Result<UploadResponse> {
        let url = self.endpoint("upload")?;
        let name = request.file.name().to_string();
        let total = request.file.size();

        // Progress is reported as the transport pulls each chunk off the body stream
        let content = request.file.content();
        let chunks: Vec<Vec<u8>> = content.chunks(self.chunk_size).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let body_stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress.send(UploadProgress { sent, total }).ok();
            Ok::<_, std::io::Error>(chunk)
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body_stream),
            total,
        )
        .file_name(name.clone())
        .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .header(CSRF_HEADER, &request.csrf_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(filename = %name, status = status.as_u16(), "upload response received");

        match status {
            StatusCode::CREATED => {
                let bytes = response.bytes().await?;
                let body: CreatedBody = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::InvalidResponse(format!("upload response is not valid JSON: {}", e))
                })?;
                match body.filename {
                    Some(filename) if !filename.is_empty() => {
                        Ok(UploadResponse::Created { filename })
                    }
                    _ => Err(Error::InvalidResponse(
                        "upload response is missing 'filename'".to_string(),
                    )),
                }
            }
            StatusCode::CONFLICT => Ok(UploadResponse::Duplicate),
            StatusCode::UNAUTHORIZED => Ok(UploadResponse::Unauthorized),
            other => Ok(UploadResponse::Rejected {
                status: other.as_u16(),
                message: error_message(response).await,
            }),
        }
    }

    async fn upload_status(&self, filename: &str) -> Result<ProcessingState> {
        let url = self.endpoint("upload/status")?;
        let response = self
            .client
            .get(url)
            .query(&[("filename", filename)])
            .send()
            .await?;

        // The body decides, whatever the HTTP status; a body without `status` reads as pending
        let bytes = response.bytes().await?;
        let body: StatusBody = serde_json::from_slice(&bytes).map_err(|e| {
            Error::InvalidResponse(format!("status response is not valid JSON: {}", e))
        })?;
        Ok(ProcessingState::from_wire(body.status.as_deref()))
    }
}
