use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("GET {url} timed out (attempt {attempt}): {message}"))]
    Timeout {
        url: String,
        attempt: u32,
        message: String,
    },
    #[snafu(display("GET {url} failed (attempt {attempt}): {message}"))]
    Connection {
        url: String,
        attempt: u32,
        message: String,
    },
    #[snafu(display("Unauthorized: invalid API key"))]
    Unauthorized { url: String },
    #[snafu(display("Rate limit exceeded: too many requests, try again later"))]
    RateLimited { url: String },
    #[snafu(display("API temporarily unavailable: {status} {reason} (attempt {attempt})"))]
    ServerUnavailable {
        url: String,
        status: u16,
        reason: String,
        attempt: u32,
    },
    #[snafu(display("API error {status}: {reason}"))]
    Api {
        url: String,
        status: u16,
        reason: String,
    },
    #[snafu(display("Failed to read response body from {url}: {source}"))]
    ReadBody {
        url: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse API response: {source}"))]
    MalformedJson {
        source: serde_json::Error,
        body: String,
    },
    #[snafu(display("Unexpected API response shape: {source}"))]
    ShapeMismatch {
        source: serde_json::Error,
        body: String,
    },
    #[snafu(display("Failed to load configuration: {source}"))]
    ConfigLoad { source: ::config::ConfigError },
    #[snafu(display("{message}"))]
    Config { message: String },
    #[snafu(display(
        "API key is missing. Provide it via --api-key, the API_KEY environment variable, or the config file"
    ))]
    MissingCredential,
}

impl Error {
    /// Failures worth another attempt: network trouble and 5xx responses.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Connection { .. } | Error::ServerUnavailable { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::Timeout { .. } => "timeout",
            Error::Connection { .. } => "connection",
            Error::Unauthorized { .. } => "unauthorized",
            Error::RateLimited { .. } => "rate_limited",
            Error::ServerUnavailable { .. } => "server_unavailable",
            Error::Api { .. } => "api",
            Error::ReadBody { .. } => "read_body",
            Error::MalformedJson { .. } => "malformed_json",
            Error::ShapeMismatch { .. } => "shape_mismatch",
            Error::ConfigLoad { .. } | Error::Config { .. } => "config",
            Error::MissingCredential => "missing_credential",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigLoad { .. } | Error::Config { .. } => 1,
            Error::MissingCredential => 3,
            _ => 2,
        }
    }

    /// The raw response body, when the failure happened while decoding it.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::MalformedJson { body, .. } | Error::ShapeMismatch { body, .. } => Some(body),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
