use std::io::Read;
use std::time::Duration;

use snafu::ResultExt;

use crate::common::{
    ApiSnafu, ConnectionSnafu, RateLimitedSnafu, ReadBodySnafu, Result, ServerUnavailableSnafu,
    TimeoutSnafu, UnauthorizedSnafu,
};

use super::Session;

/// A response as seen by the transport, whatever its status.
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Box<dyn Read + Send>,
}

/// Failure below HTTP: DNS, connect, TLS, or a timeout.
#[derive(Debug, Clone)]
pub struct NetworkError {
    pub timed_out: bool,
    pub message: String,
}

/// Issues a single blocking GET. Implementations must not retry.
pub trait HttpAgent {
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, NetworkError>;
}

/// `ureq` backed agent. One connection pool is shared by every attempt.
pub struct UreqAgent {
    agent: ureq::Agent,
}

impl Default for UreqAgent {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            );
        }
        source = inner.source();
    }
    false
}

impl HttpAgent for UreqAgent {
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, NetworkError> {
        let mut req = self.agent.get(url).timeout(timeout);
        for (name, value) in headers {
            req = req.set(name, value);
        }

        // Non-2xx statuses are classified by the transport, not here.
        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(NetworkError {
                    timed_out: is_timeout(&err),
                    message: err.to_string(),
                })
            }
        };

        Ok(HttpResponse {
            status: response.status(),
            reason: response.status_text().to_string(),
            body: Box::new(response.into_reader()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep before each retry.
    pub delay: Duration,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct Transport<A> {
    agent: A,
    policy: RetryPolicy,
    debug: bool,
}

impl<A: HttpAgent> Transport<A> {
    pub fn new(agent: A, policy: RetryPolicy, debug: bool) -> Self {
        Self {
            agent,
            policy,
            debug,
        }
    }

    /// GET `path` under the session's base URL and return the 200 body.
    ///
    /// Timeouts, connection failures and 5xx statuses are retried up to the
    /// policy limit. Anything else fails immediately. When attempts run out
    /// the error of the last attempt is returned as is.
    pub fn fetch(&self, session: &Session, path: &str) -> Result<Vec<u8>> {
        let url = session.endpoint(path);
        let authorization = session.credential().bearer();
        let headers = [
            ("Authorization", authorization.as_str()),
            ("Accept", "application/json"),
        ];
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.attempt(&url, &headers, attempt) {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Request failed, retrying"
                    );
                    std::thread::sleep(self.policy.delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        url = %url,
                        attempt,
                        max_attempts,
                        kind = err.kind(),
                        "Request failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    fn attempt(&self, url: &str, headers: &[(&str, &str)], attempt: u32) -> Result<Vec<u8>> {
        if self.debug {
            tracing::debug!(method = "GET", url = %url, attempt, "Sending request");
        }

        let mut response = self
            .agent
            .get(url, headers, self.policy.timeout)
            .map_err(|err| match err.timed_out {
                true => TimeoutSnafu {
                    url,
                    attempt,
                    message: err.message,
                }
                .build(),
                false => ConnectionSnafu {
                    url,
                    attempt,
                    message: err.message,
                }
                .build(),
            })?;

        match response.status {
            200 => {}
            401 => return UnauthorizedSnafu { url }.fail(),
            429 => return RateLimitedSnafu { url }.fail(),
            status if status >= 500 => {
                return ServerUnavailableSnafu {
                    url,
                    status,
                    reason: response.reason.clone(),
                    attempt,
                }
                .fail()
            }
            status => {
                return ApiSnafu {
                    url,
                    status,
                    reason: response.reason.clone(),
                }
                .fail()
            }
        }

        let mut body = Vec::new();
        response
            .body
            .read_to_end(&mut body)
            .context(ReadBodySnafu { url })?;

        if self.debug {
            tracing::debug!(
                url = %url,
                status = response.status,
                body = %String::from_utf8_lossy(&body),
                "API response"
            );
        }

        Ok(body)
    }
}
