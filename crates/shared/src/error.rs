use std::time::Duration;

use thiserror::Error;

/// Failures a transport probe can hit before it produces a verdict.
///
/// The detector folds these into `NoInternet` rounds, but implementations
/// surface them typed so embedders running probes directly can tell a dead
/// socket from a misconfigured endpoint.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe url must be http or https: {0}")]
    InvalidUrl(String),
    #[error("probe timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("probe could not connect: {0}")]
    Connect(String),
    #[error("probe http exchange failed: {0}")]
    Http(String),
}
