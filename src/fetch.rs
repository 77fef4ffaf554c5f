//! HTTP fetch collaborator.
//!
//! A shared blocking client with a retry loop. The client is built lazily so
//! markup-only scrapes never pay for HTTP plumbing; workers share one
//! [`Fetcher`] through the engine.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::error::{BindError, Result};

/// Default User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("docbind/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP fetcher with per-source retries.
pub struct Fetcher {
    client: OnceLock<Client>,
    timeout: Duration,
    retries: u32,
    user_agent: String,
}

impl Fetcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: OnceLock::new(),
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or_else(|| USER_AGENT.to_string()),
        }
    }

    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = Client::builder()
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(self.timeout)
            .build()
            .map_err(|e| BindError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(self.client.get_or_init(|| built))
    }

    /// GET the URL, retrying on any failure (connection error, non-success
    /// status, body read failure). The per-source retry override wins over
    /// the configured default; exhausting all attempts yields
    /// [`BindError::Fetch`].
    pub(crate) fn get(
        &self,
        url: &Url,
        retries: Option<u32>,
        user_agent: Option<&str>,
    ) -> Result<String> {
        let client = self.client()?;
        let attempts = retries.unwrap_or(self.retries) + 1;
        let mut last = String::new();

        for attempt in 1..=attempts {
            let mut request = client.get(url.as_str());
            if let Some(ua) = user_agent {
                request = request.header(reqwest::header::USER_AGENT, ua);
            }

            match request.send() {
                Ok(response) if response.status().is_success() => match response.text() {
                    Ok(body) => {
                        debug!(%url, attempt, bytes = body.len(), "fetched document");
                        return Ok(body);
                    }
                    Err(e) => last = format!("body read failed: {e}"),
                },
                Ok(response) => last = format!("HTTP {}", response.status()),
                Err(e) => last = e.to_string(),
            }

            if attempt < attempts {
                warn!(%url, attempt, error = %last, "fetch failed, retrying");
            }
        }

        Err(BindError::Fetch {
            url: url.to_string(),
            attempts,
            message: last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The fetcher is blocking, so tests host wiremock on a hand-built tokio
    // runtime and drive the client from the (non-async) test thread.
    fn start_server() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        (rt, server)
    }

    #[test]
    fn fetch_returns_body_on_success() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/page"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
                .mount(&server),
        );

        let fetcher = Fetcher::new(&EngineConfig::default());
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let body = fetcher.get(&url, Some(0), None).unwrap();
        assert!(body.contains("ok"));
    }

    #[test]
    fn fetch_fails_after_exhausting_retries() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server),
        );

        let fetcher = Fetcher::new(&EngineConfig::default());
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.get(&url, Some(2), None).unwrap_err();
        match err {
            BindError::Fetch { attempts, message, .. } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("503"));
            }
            other => panic!("expected fetch error, got: {other}"),
        }
    }

    #[test]
    fn per_source_user_agent_overrides_the_default() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("GET"))
                .and(wiremock::matchers::header("user-agent", "custom/1.0"))
                .respond_with(ResponseTemplate::new(200).set_body_string("ua ok"))
                .mount(&server),
        );

        let fetcher = Fetcher::new(&EngineConfig::default());
        let url = Url::parse(&server.uri()).unwrap();
        let body = fetcher.get(&url, Some(0), Some("custom/1.0")).unwrap();
        assert_eq!(body, "ua ok");
    }
}
