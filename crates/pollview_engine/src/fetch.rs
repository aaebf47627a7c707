use pollview_core::PollResultSnapshot;
use pollview_logging::{pv_debug, pv_warn};
use reqwest::StatusCode;

use crate::settings::ApiSettings;
use crate::{FailureKind, FetchError};

/// One-shot retrieval of the current results for a poll code.
#[async_trait::async_trait]
pub trait ResultsFetcher: Send + Sync {
    async fn fetch(&self, poll_code: &str) -> Result<PollResultSnapshot, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestResultsFetcher {
    settings: ApiSettings,
}

impl ReqwestResultsFetcher {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ResultsFetcher for ReqwestResultsFetcher {
    async fn fetch(&self, poll_code: &str) -> Result<PollResultSnapshot, FetchError> {
        let poll_code = poll_code.trim();
        if poll_code.is_empty() {
            return Err(FetchError::new(
                FailureKind::InvalidPollCode,
                "poll code is empty",
            ));
        }
        let url = self
            .settings
            .endpoint(&self.settings.results_route.segments(poll_code))
            .ok_or_else(|| {
                FetchError::new(
                    FailureKind::InvalidPollCode,
                    format!("cannot build results url from {}", self.settings.base_url),
                )
            })?;

        let client = self.build_client()?;
        pv_debug!("GET {}", url);
        let response = client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::new(
                FailureKind::NotFound,
                format!("no poll with code {poll_code}"),
            ));
        }
        if !status.is_success() {
            pv_warn!("results for {} answered {}", poll_code, status);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice::<PollResultSnapshot>(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
