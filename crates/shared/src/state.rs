use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the detector currently stands on Internet reachability.
///
/// A link being up is not the same as being online: the uplink may be dead
/// (`NoInternet`) or intercepted by a sign-in page (`CaptivePortal`).
/// `Validated` is only ever produced by an actual probe round or a system
/// verdict, never assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Initial state, or reachability has not been evaluated yet.
    Unknown,
    /// The embedder reported the link down.
    Disconnected,
    /// The link is up but probes cannot reach the Internet.
    NoInternet,
    /// Probe responses were intercepted; the user has not completed sign-in.
    CaptivePortal,
    /// A probe round confirmed end-to-end reachability.
    Validated,
}

impl ConnectionState {
    /// True only for `Validated`; a captive portal still blocks real traffic.
    pub fn is_online(self) -> bool {
        matches!(self, ConnectionState::Validated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::NoInternet => "no_internet",
            ConnectionState::CaptivePortal => "captive_portal",
            ConnectionState::Validated => "validated",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough class of the underlying link, as reported by the embedder.
///
/// Only informational; control flow cares solely about offline vs. online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    Other,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkKind::Wifi => "wifi",
            NetworkKind::Cellular => "cellular",
            NetworkKind::Ethernet => "ethernet",
            NetworkKind::Vpn => "vpn",
            NetworkKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Link signal fed by the embedder, the portable stand-in for platform
/// connectivity callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkSignal {
    Offline,
    Online(NetworkKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validated_counts_as_online() {
        assert!(ConnectionState::Validated.is_online());
        assert!(!ConnectionState::Unknown.is_online());
        assert!(!ConnectionState::Disconnected.is_online());
        assert!(!ConnectionState::NoInternet.is_online());
        assert!(!ConnectionState::CaptivePortal.is_online());
    }

    #[test]
    fn display_matches_serialized_form() {
        let serialized = serde_json::to_string(&ConnectionState::CaptivePortal).expect("serialize");
        assert_eq!(serialized, "\"captive_portal\"");
        assert_eq!(ConnectionState::CaptivePortal.to_string(), "captive_portal");
    }
}
