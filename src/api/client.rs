use crate::common::{ListResult, Result, Sink};
use crate::Config;

use super::{
    decode, validate_batch, Credential, HttpAgent, RetryPolicy, Session, Transport, UreqAgent,
};

const MACHINES_PATH: &str = "/computers";

/// Session-scoped API client. Holds no state besides its session and
/// transport, so one instance can serve any number of calls.
pub struct Client<A = UreqAgent> {
    session: Session,
    transport: Transport<A>,
    debug: bool,
}

impl Client<UreqAgent> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let credential = Credential::new(config.api_key.clone().unwrap_or_default())?;
        Ok(Self::new(
            Session::new(config.api_url.clone(), credential),
            UreqAgent::default(),
            RetryPolicy::default(),
            config.debug_mode,
        ))
    }
}

impl<A: HttpAgent> Client<A> {
    pub fn new(session: Session, agent: A, policy: RetryPolicy, debug: bool) -> Self {
        Self {
            session,
            transport: Transport::new(agent, policy, debug),
            debug,
        }
    }

    /// Fetch, decode and validate the available machines.
    ///
    /// Transport and decode failures abort the call unchanged. Schema drift
    /// only shrinks the returned set and is reported through `sink`.
    pub fn list_machines(&self, sink: &dyn Sink) -> Result<ListResult> {
        let body = self
            .transport
            .fetch(&self.session, MACHINES_PATH)
            .inspect_err(|err| {
                if self.debug {
                    tracing::debug!(error = ?err, "Raw API request error");
                }
            })?;

        let records = decode(&body).inspect_err(|err| {
            if self.debug {
                tracing::debug!(body = err.body().unwrap_or_default(), "Failed response body");
            }
        })?;

        if records.is_empty() {
            if self.debug {
                tracing::debug!("No available machines returned from API");
            }
            return Ok(ListResult::default());
        }

        let result = validate_batch(records, sink);
        tracing::info!(
            total = result.total,
            valid = result.valid,
            invalid = result.invalid,
            "Listed machines"
        );
        Ok(result)
    }
}
