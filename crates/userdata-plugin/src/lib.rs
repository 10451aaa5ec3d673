//! Plugin side of the user data plugin mechanism.
//!
//! A provider implements [`Provider`], hands it to a new [`Plugin`], and
//! calls [`Plugin::run`]. The harness owns the transport convention: the
//! request arrives JSON-encoded in [`ENV_USER_DATA_REQUEST`], the response
//! leaves as a single JSON document on stdout.

mod types;

pub use types::*;

use std::env::{self, VarError};
use std::io::{self, Write};

use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request payload does not match the wire schema. The controller
    /// and the plugin disagree on the protocol, so there is no well-formed
    /// response to give.
    #[error("failed to decode user data request: {0}")]
    DecodeRequest(#[source] serde_json::Error),

    #[error("user data request in '{}' is not valid unicode", ENV_USER_DATA_REQUEST)]
    RequestNotUnicode,

    #[error("failed to encode user data response: {0}")]
    EncodeResponse(#[source] serde_json::Error),

    #[error("failed to write user data response to stdout: {0}")]
    WriteResponse(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error type providers report generation failures with. The message is
/// forwarded to the controller verbatim.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Interface each plugin implements to generate user data for a machine.
///
/// Implementations must not write to stdout: the harness owns the stream,
/// and the controller parses all of it as the response.
pub trait Provider {
    fn user_data(&self, req: &UserDataRequest) -> std::result::Result<String, ProviderError>;
}

/// Maps a request from the process environment to the given provider and
/// prints the response.
pub struct Plugin<P> {
    provider: P,
    debug: bool,
}

impl<P: Provider> Plugin<P> {
    pub fn new(provider: P, debug: bool) -> Self {
        Self { provider, debug }
    }

    /// Handle one request: read it from the environment, dispatch it to the
    /// provider, and write exactly one response to stdout.
    ///
    /// A missing (or empty) request variable is a normal protocol outcome
    /// and still produces a response. An undecodable request is returned as
    /// an error with nothing written, so the caller fails the process
    /// instead of masking a schema mismatch as a provider failure.
    pub fn run(&self) -> Result<()> {
        let raw = match env::var(ENV_USER_DATA_REQUEST) {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) | Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => return Err(Error::RequestNotUnicode),
        };
        let resp = self.respond(raw.as_deref())?;
        write_response(&resp)
    }

    fn respond(&self, raw: Option<&str>) -> Result<UserDataResponse> {
        let Some(raw) = raw else {
            return Ok(UserDataResponse::failure(format!(
                "environment variable '{ENV_USER_DATA_REQUEST}' not set"
            )));
        };
        if self.debug {
            debug!(request = raw, "received user data request");
        }
        let req: UserDataRequest = serde_json::from_str(raw).map_err(Error::DecodeRequest)?;
        debug!(
            machine = %req.machine_spec.name,
            cloud = %req.cloud_provider_name,
            "generating user data"
        );
        Ok(match self.provider.user_data(&req) {
            Ok(user_data) => UserDataResponse::success(user_data),
            Err(err) => UserDataResponse::failure(err.to_string()),
        })
    }
}

/// Serialize the response and print it to stdout.
fn write_response(resp: &UserDataResponse) -> Result<()> {
    let body = serde_json::to_string(resp).map_err(Error::EncodeResponse)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(body.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
