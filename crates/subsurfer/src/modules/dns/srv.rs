use crate::dns::{trim_name, DnsResolver};
use crate::model::Domain;
use crate::modules::subdomains::SubdomainModule;
use crate::modules::{Module, ModuleKind};
use crate::Result;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct SrvEnum {
    dns_resolver: DnsResolver,
    records: Vec<String>,
    concurrency: usize,
}

impl SrvEnum {
    pub fn new(dns_resolver: DnsResolver, records: Vec<String>, concurrency: usize) -> Self {
        Self {
            dns_resolver,
            records,
            concurrency,
        }
    }

    fn record_names(&self, domain: &Domain) -> Vec<String> {
        self.records
            .iter()
            .map(|record| format!("{}.{}.", record.trim_end_matches('.'), domain))
            .collect()
    }
}

impl Module for SrvEnum {
    fn name(&self) -> String {
        "dns/srv".to_string()
    }

    fn description(&self) -> String {
        "Resolve well-known SRV records and collect their targets".to_string()
    }
}

// endregion:     --- Module info

#[async_trait]
impl SubdomainModule for SrvEnum {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Active
    }

    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let targets: HashSet<String> = stream::iter(self.record_names(domain))
            .map(|name| {
                let dns_resolver = &self.dns_resolver;
                async move {
                    match dns_resolver.srv_lookup(name.as_str()).await {
                        Ok(lookup) => lookup
                            .iter()
                            .map(|srv| trim_name(&srv.target().to_utf8()))
                            .inspect(|target| trace!("{} -> {}", name, target))
                            .collect::<Vec<String>>(),
                        Err(err) => {
                            trace!("{}: {}", name, err);
                            Vec::new()
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .flat_map(stream::iter)
            .collect()
            .await;

        debug!("{} collected", targets.len());
        Ok(targets.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::SrvEnum;
    use crate::config::ScanConfig;
    use crate::dns::new_resolver;
    use crate::model::Domain;

    #[tokio::test]
    async fn fully_qualified_record_names() {
        let config = ScanConfig::default();
        let module = SrvEnum::new(
            new_resolver(&config),
            vec!["_sip._tcp".to_string(), "_ldap._tcp.".to_string()],
            4,
        );
        let domain = Domain::parse("example.com").unwrap();

        assert_eq!(
            module.record_names(&domain),
            vec!["_sip._tcp.example.com.", "_ldap._tcp.example.com."]
        );
    }
}
