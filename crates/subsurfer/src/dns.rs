use crate::config::ScanConfig;
use crate::Result;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use std::sync::Arc;
use tracing::{debug, trace};

pub type DnsResolver = Arc<TokioAsyncResolver>;

pub fn new_resolver(config: &ScanConfig) -> DnsResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = config.dns_timeout();
    opts.attempts = 1;
    debug!("DNS resolver options: {:?}", opts);
    let dns_resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

    debug!("DNS resolver created: {:?}", dns_resolver);
    Arc::new(dns_resolver)
}

/// First CNAME target of `host`, lower-cased and without trailing dot.
pub async fn resolve_cname(dns_resolver: &DnsResolver, host: &str) -> Result<Option<String>> {
    let lookup = match dns_resolver.lookup(host, RecordType::CNAME).await {
        Ok(lookup) => lookup,
        Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
            trace!("{} has no CNAME", host);
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let cname = lookup
        .iter()
        .filter_map(|rdata| rdata.as_cname())
        .map(|cname| trim_name(&cname.to_string()))
        .find(|cname| !cname.is_empty());

    trace!("{} CNAME {:?}", host, cname);
    Ok(cname)
}

/// Presentation form of a DNS name: no trailing dot, lower-cased.
pub fn trim_name(name: &str) -> String {
    name.trim_end_matches('.').to_lowercase()
}
