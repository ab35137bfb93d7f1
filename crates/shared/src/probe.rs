use serde::{Deserialize, Serialize};

use crate::state::ConnectionState;

/// Conclusion of a single transport probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeVerdict {
    Validated,
    CaptivePortal,
    NoInternet,
}

impl ProbeVerdict {
    pub fn connection_state(self) -> ConnectionState {
        match self {
            ProbeVerdict::Validated => ConnectionState::Validated,
            ProbeVerdict::CaptivePortal => ConnectionState::CaptivePortal,
            ProbeVerdict::NoInternet => ConnectionState::NoInternet,
        }
    }
}

/// Classify the response to a generate-204 probe.
///
/// Portals answer in place of the endpoint, so a redirect or an unexpected
/// body means interception. A 200 with `Content-Length: 0` is accepted as
/// validated because some portals and proxies rewrite 204s into empty 200s.
/// 4xx/5xx means the endpoint itself was unreachable or broken, which is
/// evidence of a dead uplink rather than a portal.
pub fn classify_http_response(status: u16, content_length: Option<u64>) -> ProbeVerdict {
    match status {
        204 => ProbeVerdict::Validated,
        200 if content_length == Some(0) => ProbeVerdict::Validated,
        200..=399 => ProbeVerdict::CaptivePortal,
        _ => ProbeVerdict::NoInternet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_content_validates() {
        assert_eq!(classify_http_response(204, None), ProbeVerdict::Validated);
        assert_eq!(classify_http_response(204, Some(0)), ProbeVerdict::Validated);
    }

    #[test]
    fn empty_ok_is_treated_as_rewritten_204() {
        assert_eq!(classify_http_response(200, Some(0)), ProbeVerdict::Validated);
    }

    #[test]
    fn ok_with_body_means_interception() {
        assert_eq!(
            classify_http_response(200, Some(512)),
            ProbeVerdict::CaptivePortal
        );
        // No Content-Length at all (e.g. chunked portal page) counts as a body.
        assert_eq!(classify_http_response(200, None), ProbeVerdict::CaptivePortal);
    }

    #[test]
    fn redirects_mean_interception() {
        assert_eq!(classify_http_response(301, None), ProbeVerdict::CaptivePortal);
        assert_eq!(
            classify_http_response(302, Some(0)),
            ProbeVerdict::CaptivePortal
        );
        assert_eq!(classify_http_response(307, None), ProbeVerdict::CaptivePortal);
    }

    #[test]
    fn other_success_codes_mean_interception() {
        assert_eq!(classify_http_response(201, Some(0)), ProbeVerdict::CaptivePortal);
        assert_eq!(classify_http_response(206, None), ProbeVerdict::CaptivePortal);
    }

    #[test]
    fn client_and_server_errors_mean_no_internet() {
        assert_eq!(classify_http_response(400, None), ProbeVerdict::NoInternet);
        assert_eq!(classify_http_response(404, Some(0)), ProbeVerdict::NoInternet);
        assert_eq!(classify_http_response(500, None), ProbeVerdict::NoInternet);
        assert_eq!(classify_http_response(503, Some(10)), ProbeVerdict::NoInternet);
    }

    #[test]
    fn verdicts_map_onto_connection_states() {
        assert_eq!(
            ProbeVerdict::Validated.connection_state(),
            ConnectionState::Validated
        );
        assert_eq!(
            ProbeVerdict::CaptivePortal.connection_state(),
            ConnectionState::CaptivePortal
        );
        assert_eq!(
            ProbeVerdict::NoInternet.connection_state(),
            ConnectionState::NoInternet
        );
    }
}
