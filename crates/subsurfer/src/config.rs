use crate::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// region:        --- Constants

// timeouts
pub const DISCOVERY_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const TAKEOVER_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const RESOLVE_DNS_TIMEOUT_MS: u64 = 4000;
pub const ZONE_TRANSFER_TIMEOUT_MS: u64 = 5000;

// concurrency numbers
pub const ACTIVE_MODULES_CONCURRENCY: usize = 2;
pub const DNS_QUERIES_CONCURRENCY: usize = 32;

// reverse sweep: width of the network swept around each address
pub const SWEEP_PREFIX_LEN: u8 = 28;
pub const SWEEP_PREFIX_LEN_MIN: u8 = 24;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Well-known service discovery records queried under the target.
pub const SRV_RECORDS: &[&str] = &[
    // -- Directory / auth
    "_ldap._tcp",
    "_ldaps._tcp",
    "_gc._tcp",
    "_kerberos._tcp",
    "_kerberos._udp",
    "_kpasswd._tcp",
    "_kpasswd._udp",
    // -- Mail
    "_submission._tcp",
    "_submissions._tcp",
    "_imap._tcp",
    "_imaps._tcp",
    "_pop3._tcp",
    "_pop3s._tcp",
    "_autodiscover._tcp",
    // -- Collaboration
    "_sip._tcp",
    "_sip._udp",
    "_sip._tls",
    "_sipfederationtls._tcp",
    "_sipinternaltls._tcp",
    "_xmpp-client._tcp",
    "_xmpp-server._tcp",
    "_jabber._tcp",
    "_matrix._tcp",
    "_collab-edge._tls",
    "_cisco-uds._tcp",
    "_h323cs._tcp",
    // -- Calendars / contacts
    "_caldav._tcp",
    "_caldavs._tcp",
    "_carddav._tcp",
    "_carddavs._tcp",
    // -- Misc
    "_turn._udp",
    "_stun._udp",
    "_vlmcs._tcp",
    "_minecraft._tcp",
];

// endregion:     --- Constants

// region:        --- Config

/// Every tunable of a scan. Missing keys in a config file fall back to the
/// constants above.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub discovery_timeout_ms: u64,
    pub takeover_timeout_ms: u64,
    pub dns_timeout_ms: u64,
    pub zone_transfer_timeout_ms: u64,
    pub active_concurrency: usize,
    pub dns_concurrency: usize,
    pub sweep_prefix_len: u8,
    pub srv_records: Vec<String>,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: DISCOVERY_HTTP_TIMEOUT_MS,
            takeover_timeout_ms: TAKEOVER_HTTP_TIMEOUT_MS,
            dns_timeout_ms: RESOLVE_DNS_TIMEOUT_MS,
            zone_transfer_timeout_ms: ZONE_TRANSFER_TIMEOUT_MS,
            active_concurrency: ACTIVE_MODULES_CONCURRENCY,
            dns_concurrency: DNS_QUERIES_CONCURRENCY,
            sweep_prefix_len: SWEEP_PREFIX_LEN,
            srv_records: SRV_RECORDS.iter().map(|record| record.to_string()).collect(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn takeover_timeout(&self) -> Duration {
        Duration::from_millis(self.takeover_timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn zone_transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.zone_transfer_timeout_ms)
    }

    pub fn active_concurrency(&self) -> usize {
        self.active_concurrency.max(1)
    }

    pub fn dns_concurrency(&self) -> usize {
        self.dns_concurrency.max(1)
    }

    /// Clamped so a sweep never exceeds a /24.
    pub fn sweep_prefix_len(&self) -> u8 {
        self.sweep_prefix_len.clamp(SWEEP_PREFIX_LEN_MIN, 32)
    }
}

// endregion:     --- Config
