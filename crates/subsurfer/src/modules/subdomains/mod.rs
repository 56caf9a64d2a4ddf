pub mod abuseipdb;
pub mod anubisdb;
pub mod bufferover;
pub mod crtsh;
pub mod digitorus;
pub mod hackertarget;
pub mod merklemap;
pub mod urlscan;
pub mod web_archive;

use super::{Module, ModuleKind};
use crate::model::{AdapterResult, Domain, HostnameSet};
use crate::Result;
use async_trait::async_trait;

/// A discovery source. `enumerate` may fail any way it likes; `scan` is the
/// boundary seen by the orchestrator and never fails.
#[async_trait]
pub trait SubdomainModule: Module + Send + Sync {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Passive
    }

    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>>;

    async fn scan(&self, domain: &Domain) -> AdapterResult {
        match self.enumerate(domain).await {
            Ok(candidates) => AdapterResult::Found {
                module: self.name(),
                hostnames: HostnameSet::from_candidates(domain, candidates),
            },
            Err(err) => AdapterResult::Failed {
                module: self.name(),
                reason: err.to_string(),
            },
        }
    }
}
