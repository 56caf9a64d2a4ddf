pub mod fingerprint;
pub mod probe;

use self::fingerprint::FingerprintStore;
use self::probe::{CnameLookup, HttpProbe};
use crate::events::{Observer, ScanEvent, Silent};
use crate::model::{Finding, HostnameSet};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, instrument, trace};

/// Checks hostnames for dangling CNAMEs pointing to claimable services.
pub struct TakeoverVerifier {
    store: Arc<FingerprintStore>,
    cname_lookup: Arc<dyn CnameLookup>,
    http_probe: Arc<dyn HttpProbe>,
    observer: Arc<dyn Observer>,
}

// region:        --- Constructors

impl TakeoverVerifier {
    pub fn new(
        store: Arc<FingerprintStore>,
        cname_lookup: Arc<dyn CnameLookup>,
        http_probe: Arc<dyn HttpProbe>,
    ) -> Self {
        Self {
            store,
            cname_lookup,
            http_probe,
            observer: Arc::new(Silent),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }
}

// endregion:     --- Constructors

impl TakeoverVerifier {
    /// Every host is checked concurrently; findings come back in completion
    /// order.
    #[instrument(name = "takeover", level = "info", skip_all, fields(targets = hostnames.len()))]
    pub async fn scan(&self, hostnames: &HostnameSet) -> Vec<Finding> {
        self.observer.notify(ScanEvent::TakeoverStarted {
            targets: hostnames.len(),
        });

        if self.store.is_empty() {
            debug!("No fingerprint loaded, nothing can match");
        }

        let findings: Vec<Finding> = hostnames
            .iter()
            .map(|host| async move {
                match AssertUnwindSafe(self.check(host)).catch_unwind().await {
                    Ok(finding) => finding,
                    Err(_) => {
                        error!("Takeover check panicked on {}", host);
                        None
                    }
                }
            })
            .collect::<FuturesUnordered<_>>()
            .filter_map(|finding| async move { finding })
            .inspect(|finding| self.observer.notify(ScanEvent::Vulnerable(finding.clone())))
            .collect()
            .await;

        self.observer.notify(ScanEvent::TakeoverFinished {
            vulnerable: findings.len(),
        });
        findings
    }

    /// CNAME, then HTTP, then fingerprints; the first step without a
    /// conclusive answer ends the check.
    pub async fn check(&self, host: &str) -> Option<Finding> {
        let cname = match self.cname_lookup.cname(host).await {
            Ok(Some(cname)) => cname,
            Ok(None) => {
                trace!("{}: no CNAME", host);
                return None;
            }
            Err(err) => {
                trace!("{}: CNAME lookup failed: {}", host, err);
                return None;
            }
        };

        let evidence = match self.http_probe.probe(host).await {
            Ok(evidence) => evidence,
            Err(err) => {
                debug!("{} (CNAME {}): unreachable: {}", host, cname, err);
                return None;
            }
        };

        let record = self
            .store
            .match_first(&cname, evidence.status, &evidence.body)?;

        Some(Finding::new(host, &cname, &record.service, evidence.status))
    }
}
