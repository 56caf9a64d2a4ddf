use crate::dns::{trim_name, DnsResolver};
use crate::model::Domain;
use crate::modules::subdomains::SubdomainModule;
use crate::modules::{Module, ModuleKind};
use crate::Result;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct ReverseSweep {
    dns_resolver: DnsResolver,
    prefix_len: u8,
    concurrency: usize,
}

impl ReverseSweep {
    pub fn new(dns_resolver: DnsResolver, prefix_len: u8, concurrency: usize) -> Self {
        Self {
            dns_resolver,
            prefix_len,
            concurrency,
        }
    }

    /// IPv4 networks hosting the apex and `www.` records.
    async fn seed_networks(&self, domain: &Domain) -> BTreeSet<Ipv4Addr> {
        let mut networks = BTreeSet::new();
        for host in [domain.to_string(), format!("www.{}", domain)] {
            match self.dns_resolver.lookup_ip(host.as_str()).await {
                Ok(lookup_ip) => {
                    for ip in lookup_ip.iter() {
                        if let IpAddr::V4(ip) = ip {
                            networks.insert(network_of(ip, self.prefix_len));
                        }
                    }
                }
                Err(err) => trace!("{}: {}", host, err),
            }
        }
        networks
    }
}

impl Module for ReverseSweep {
    fn name(&self) -> String {
        "dns/reverse_sweep".to_string()
    }

    fn description(&self) -> String {
        "Reverse lookup the networks around the target's addresses".to_string()
    }
}

// endregion:     --- Module info

fn network_of(ip: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    let prefix_len = prefix_len.min(32);
    let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
    Ipv4Addr::from(u32::from(ip) & mask)
}

fn sweep_range(network: Ipv4Addr, prefix_len: u8) -> impl Iterator<Item = Ipv4Addr> {
    let size = 1u32 << (32 - prefix_len.min(32) as u32).min(31);
    let base = u32::from(network);
    (0..size).map(move |offset| Ipv4Addr::from(base.wrapping_add(offset)))
}

#[async_trait]
impl SubdomainModule for ReverseSweep {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Active
    }

    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let networks = self.seed_networks(domain).await;
        debug!("{} networks to sweep (/{})", networks.len(), self.prefix_len);

        let addresses: Vec<Ipv4Addr> = networks
            .into_iter()
            .flat_map(|network| sweep_range(network, self.prefix_len))
            .collect();

        let names: HashSet<String> = stream::iter(addresses)
            .map(|ip| {
                let dns_resolver = &self.dns_resolver;
                async move {
                    match dns_resolver.reverse_lookup(IpAddr::V4(ip)).await {
                        Ok(lookup) => lookup
                            .iter()
                            .map(|ptr| trim_name(&ptr.to_string()))
                            .inspect(|name| trace!("{} -> {}", ip, name))
                            .collect::<Vec<String>>(),
                        Err(_) => Vec::new(),
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .flat_map(stream::iter)
            .collect()
            .await;

        debug!("{} collected", names.len());
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{network_of, sweep_range};
    use std::net::Ipv4Addr;

    #[test]
    fn network_masks_host_bits() {
        let ip = Ipv4Addr::new(93, 184, 216, 34);

        assert_eq!(network_of(ip, 24), Ipv4Addr::new(93, 184, 216, 0));
        assert_eq!(network_of(ip, 28), Ipv4Addr::new(93, 184, 216, 32));
        assert_eq!(network_of(ip, 32), ip);
    }

    #[test]
    fn range_covers_network() {
        let range: Vec<Ipv4Addr> = sweep_range(Ipv4Addr::new(10, 0, 0, 16), 28).collect();

        assert_eq!(range.len(), 16);
        assert_eq!(range.first(), Some(&Ipv4Addr::new(10, 0, 0, 16)));
        assert_eq!(range.last(), Some(&Ipv4Addr::new(10, 0, 0, 31)));
        assert_eq!(sweep_range(Ipv4Addr::new(10, 0, 0, 1), 32).count(), 1);
    }
}
