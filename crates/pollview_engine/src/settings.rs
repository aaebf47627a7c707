use std::time::Duration;

use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:9092/pollapi";
const BROKER_PATH: [&str; 3] = ["ws", "poll", "websocket"];

/// Which backend route serves the results snapshot. Both return the same body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultsRoute {
    /// `/responses/{pollCode}/results`
    #[default]
    Responses,
    /// `/polls/{pollCode}/results`
    Polls,
}

impl ResultsRoute {
    pub(crate) fn segments(self, poll_code: &str) -> [&str; 3] {
        match self {
            ResultsRoute::Responses => ["responses", poll_code, "results"],
            ResultsRoute::Polls => ["polls", poll_code, "results"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub results_route: ResultsRoute,
}

impl ApiSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            results_route: ResultsRoute::default(),
        }
    }

    /// Appends percent-encoded `segments` to the base path.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Option<Url> {
        append_segments(&self.base_url, segments)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::new(default_base())
    }
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub ws_url: Url,
    /// Bound on WebSocket connect plus STOMP `CONNECTED`.
    pub handshake_timeout: Duration,
    /// Heart-beat interval we offer and request.
    pub heartbeat: Duration,
    pub topic_prefix: String,
}

impl ChannelSettings {
    /// Broker endpoint for an API base: same host and path, `ws`/`wss`
    /// scheme, `/ws/poll/websocket` appended.
    pub fn for_api_base(base_url: &Url) -> Self {
        let mut ws_url = append_segments(base_url, &BROKER_PATH).unwrap_or_else(|| base_url.clone());
        let scheme = if base_url.scheme() == "https" { "wss" } else { "ws" };
        // Only fails for cannot-be-a-base URLs, which append_segments already rejected.
        let _ = ws_url.set_scheme(scheme);
        Self {
            ws_url,
            handshake_timeout: Duration::from_secs(5),
            heartbeat: Duration::from_secs(20),
            topic_prefix: "/topic/poll/".to_string(),
        }
    }

    pub fn topic(&self, poll_code: &str) -> String {
        format!("{}{}", self.topic_prefix, poll_code)
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::for_api_base(&default_base())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub channel: ChannelSettings,
}

impl EngineSettings {
    pub fn for_api_base(base_url: Url) -> Self {
        Self {
            channel: ChannelSettings::for_api_base(&base_url),
            api: ApiSettings::new(base_url),
        }
    }
}

fn default_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url")
}

fn append_segments(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}
