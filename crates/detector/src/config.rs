use std::time::Duration;

use url::Url;

use crate::DetectorError;

/// Primary generate-204 endpoint, probed first.
pub const DEFAULT_PROBE_URL: &str = "http://connectivitycheck.gstatic.com/generate_204";
/// Probed when the default endpoint does not validate.
pub const FALLBACK_PROBE_URL: &str = "http://www.google.com/gen_204";

pub const DEFAULT_USER_AGENT: &str = concat!("netwatch/", env!("CARGO_PKG_VERSION"));

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(2 * 60);

/// Tunables for the detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub default_probe_url: Url,
    pub fallback_probe_url: Url,
    /// Per-attempt HTTP budget, covering connect and response.
    pub probe_timeout: Duration,
    /// Delay before the first retry after a non-validated round.
    pub initial_retry_delay: Duration,
    /// Retry delays double per round; the episode ends once the next delay
    /// would exceed this cap.
    pub max_retry_delay: Duration,
    /// Sent as `User-Agent` on probe requests.
    pub user_agent: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            default_probe_url: Url::parse(DEFAULT_PROBE_URL).expect("default probe url is valid"),
            fallback_probe_url: Url::parse(FALLBACK_PROBE_URL)
                .expect("fallback probe url is valid"),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            initial_retry_delay: DEFAULT_INITIAL_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorError> {
        for url in [&self.default_probe_url, &self.fallback_probe_url] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(DetectorError::UnsupportedProbeScheme(url.clone()));
            }
        }
        if self.probe_timeout.is_zero() {
            return Err(DetectorError::ZeroDuration("probe_timeout"));
        }
        if self.initial_retry_delay.is_zero() {
            return Err(DetectorError::ZeroDuration("initial_retry_delay"));
        }
        if self.initial_retry_delay > self.max_retry_delay {
            return Err(DetectorError::RetryDelayRange);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        DetectorConfig::default().validate().expect("default config");
    }

    #[test]
    fn rejects_non_http_probe_url() {
        let mut config = DetectorConfig::default();
        config.default_probe_url = Url::parse("ftp://example.com/probe").expect("url");
        assert!(matches!(
            config.validate(),
            Err(DetectorError::UnsupportedProbeScheme(_))
        ));
    }

    #[test]
    fn rejects_zero_probe_timeout() {
        let mut config = DetectorConfig::default();
        config.probe_timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(DetectorError::ZeroDuration("probe_timeout"))
        ));
    }

    #[test]
    fn rejects_initial_delay_above_cap() {
        let mut config = DetectorConfig::default();
        config.initial_retry_delay = Duration::from_secs(300);
        config.max_retry_delay = Duration::from_secs(120);
        assert!(matches!(
            config.validate(),
            Err(DetectorError::RetryDelayRange)
        ));
    }
}
