use async_trait::async_trait;
use shared::state::ConnectionState;

/// Optional platform-level verdict consulted before any HTTP probing.
///
/// Implementations wrap whatever the host exposes (netlink flags, Android
/// NetworkCapabilities, SCNetworkReachability). `Unknown` means "cannot
/// tell", which sends the round on to the HTTP stages.
#[async_trait]
pub trait SystemSignal: Send + Sync {
    async fn current_verdict(&self) -> ConnectionState;

    /// When true, the system verdict is final and no HTTP probe is sent.
    fn skips_http_probes(&self) -> bool {
        false
    }
}

/// Null implementation for hosts with no usable system signal.
pub struct NoSystemSignal;

#[async_trait]
impl SystemSignal for NoSystemSignal {
    async fn current_verdict(&self) -> ConnectionState {
        ConnectionState::Unknown
    }
}
