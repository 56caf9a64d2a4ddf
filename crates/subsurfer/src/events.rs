use crate::model::Finding;
use crate::modules::ModuleKind;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Progress of a scan, emitted to an [`Observer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    ModuleStarted { module: String, kind: ModuleKind },
    ModuleFinished { module: String, count: usize },
    ModuleFailed { module: String, reason: String },
    DiscoveryFinished { count: usize },
    TakeoverStarted { targets: usize },
    Vulnerable(Finding),
    TakeoverFinished { vulnerable: usize },
}

pub trait Observer: Send + Sync {
    fn notify(&self, event: ScanEvent);
}

/// Turns every event into a log line.
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&self, event: ScanEvent) {
        match event {
            ScanEvent::ModuleStarted { module, kind } => info!("{:12} - {} ({})", "STARTED", module, kind),
            ScanEvent::ModuleFinished { module, count } => {
                info!("{:12} - {}: {} found", "FINISHED", module, count)
            }
            ScanEvent::ModuleFailed { module, reason } => {
                warn!("{:12} - {}: {}", "FAILED", module, reason)
            }
            ScanEvent::DiscoveryFinished { count } => {
                info!("{:12} - {} unique subdomains", "DISCOVERY", count)
            }
            ScanEvent::TakeoverStarted { targets } => {
                info!("{:12} - checking {} subdomains", "TAKEOVER", targets)
            }
            ScanEvent::Vulnerable(finding) => warn!(
                "{:12} - {} -> {} (CNAME: {})",
                "VULNERABLE", finding.domain, finding.service, finding.cname
            ),
            ScanEvent::TakeoverFinished { vulnerable } => {
                info!("{:12} - {} vulnerable subdomains", "TAKEOVER", vulnerable)
            }
        }
    }
}

pub struct Silent;

impl Observer for Silent {
    fn notify(&self, _event: ScanEvent) {}
}

// a dropped receiver only means nobody listens anymore
impl Observer for mpsc::UnboundedSender<ScanEvent> {
    fn notify(&self, event: ScanEvent) {
        let _ = self.send(event);
    }
}
