//! Request/response calls against the poll backend that are not part of the
//! live results flow: admin session, poll lifecycle and response submission.

use pollview_core::{
    AdminDashboard, AdminIdentity, CreatePollRequest, PollDefinition, PollId, PollResultSnapshot,
    PollStatus, SubmitResponseRequest,
};
use pollview_logging::{pv_debug, pv_info};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::fetch::{ReqwestResultsFetcher, ResultsFetcher};
use crate::settings::ApiSettings;
use crate::FetchError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `{success, message?, data?, error?}` envelope used by the admin endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Cookie-aware client for the admin and participant endpoints.
///
/// The backend keeps the admin session in a server-side cookie, so one
/// `PollApi` must be reused for `login` and the calls that follow it.
pub struct PollApi {
    settings: ApiSettings,
    client: reqwest::Client,
    results: ReqwestResultsFetcher,
}

impl PollApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            results: ReqwestResultsFetcher::new(settings.clone()),
            settings,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.settings.base_url
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AdminIdentity, ApiError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please enter both username and password".to_string(),
            ));
        }
        let response = self
            .request(Method::POST, &["admin", "login"])?
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let admin = self.admin_envelope(response).await?;
        pv_info!("signed in as {} (id {})", admin.username, admin.id);
        Ok(admin)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &["admin", "logout"])?
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Admin bound to the current cookie session, if any.
    pub async fn current_admin(&self) -> Result<AdminIdentity, ApiError> {
        let response = self
            .request(Method::GET, &["admin", "current"])?
            .send()
            .await?;
        self.admin_envelope(response).await
    }

    pub async fn poll_by_code(&self, poll_code: &str) -> Result<PollDefinition, ApiError> {
        let poll_code = non_blank(poll_code)?;
        let response = self
            .request(Method::GET, &["polls", "code", poll_code])?
            .send()
            .await?;
        decode(response).await
    }

    pub async fn results(&self, poll_code: &str) -> Result<PollResultSnapshot, ApiError> {
        Ok(self.results.fetch(poll_code).await?)
    }

    pub async fn create_poll(
        &self,
        admin_id: u64,
        request: &CreatePollRequest,
    ) -> Result<PollDefinition, ApiError> {
        let mut url = self.url(&["polls", "create"])?;
        url.query_pairs_mut()
            .append_pair("adminId", &admin_id.to_string());
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await?;
        let created: PollDefinition = decode(response).await?;
        pv_info!("created poll {} ({})", created.poll_code, created.id);
        Ok(created)
    }

    pub async fn update_status(
        &self,
        poll_id: PollId,
        status: PollStatus,
    ) -> Result<PollDefinition, ApiError> {
        let poll_id = poll_id.to_string();
        let status_id = status.id().to_string();
        let response = self
            .request(Method::PUT, &["polls", poll_id.as_str(), "status", status_id.as_str()])?
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_poll(&self, poll_id: PollId) -> Result<(), ApiError> {
        let poll_id = poll_id.to_string();
        let response = self
            .request(Method::DELETE, &["polls", poll_id.as_str()])?
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn dashboard(&self, admin_id: u64) -> Result<AdminDashboard, ApiError> {
        let admin_id = admin_id.to_string();
        let response = self
            .request(Method::GET, &["polls", "dashboard", admin_id.as_str()])?
            .send()
            .await?;
        decode(response).await
    }

    pub async fn submit_response(&self, request: &SubmitResponseRequest) -> Result<(), ApiError> {
        non_blank(&request.poll_code)?;
        let response = self
            .request(Method::POST, &["responses", "submit"])?
            .json(request)
            .send()
            .await?;
        check_status(response).await?;
        pv_info!("submitted response for {}", request.poll_code);
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        self.settings.endpoint(segments).ok_or_else(|| {
            ApiError::InvalidRequest(format!(
                "cannot build request url from {}",
                self.settings.base_url
            ))
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.url(segments)?;
        pv_debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    async fn admin_envelope(&self, response: Response) -> Result<AdminIdentity, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;
        let envelope: Envelope<AdminIdentity> = serde_json::from_slice(&body)
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        if status == StatusCode::UNAUTHORIZED || !envelope.success {
            if status.is_success() || status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized(envelope.reason()));
            }
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: envelope.reason(),
            });
        }
        let reason = envelope.reason();
        envelope
            .data
            .ok_or_else(|| ApiError::Decode(format!("admin data missing: {reason}")))
    }
}

fn non_blank(poll_code: &str) -> Result<&str, ApiError> {
    let trimmed = poll_code.trim();
    if trimmed.is_empty() {
        Err(ApiError::InvalidRequest("Please enter a poll code.".to_string()))
    } else {
        Ok(trimmed)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
    let message = parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        other => ApiError::Rejected {
            status: other.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
}
