//! HTTP fetcher: retrieve pages and feeds from the federation.
//!
//! Uses `ureq` for synchronous HTTP requests. No retries and no timeout
//! override: a failure is reported once, typed, and the caller decides
//! whether the unit of work is lost.

use crate::error::FetchError;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Longest slice of an error body kept for diagnostics.
const ERROR_BODY_PREVIEW: usize = 500;

/// Source of page bodies keyed by URL.
///
/// `Sync` so restaurant pages can be fetched from a worker pool.
pub trait Fetch: Send + Sync {
    /// GET `url` and return the body as text.
    fn get_text(&self, url: &str) -> FetchResult<String>;
}

/// Blocking HTTP fetcher backed by a shared `ureq::Agent`.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(user_agent).build(),
        }
    }
}

impl Fetch for HttpFetcher {
    fn get_text(&self, url: &str) -> FetchResult<String> {
        tracing::debug!(url, "GET");
        match self.agent.get(url).call() {
            Ok(response) => response.into_string().map_err(|e| FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                    body: preview(&body),
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

/// Truncate an error body on a char boundary.
pub(crate) fn preview(body: &str) -> String {
    if body.len() <= ERROR_BODY_PREVIEW {
        return body.to_string();
    }
    let mut end = ERROR_BODY_PREVIEW;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
