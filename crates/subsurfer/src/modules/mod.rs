pub mod dns;
pub mod subdomains;

use self::dns::{reverse_sweep::ReverseSweep, srv::SrvEnum, zone_transfer::ZoneTransfer};
use self::subdomains::abuseipdb::AbuseIpDb;
use self::subdomains::anubisdb::AnubisDb;
use self::subdomains::bufferover::BufferOver;
use self::subdomains::crtsh::CrtSh;
use self::subdomains::digitorus::Digitorus;
use self::subdomains::hackertarget::HackerTarget;
use self::subdomains::merklemap::MerkleMap;
use self::subdomains::urlscan::Urlscan;
use self::subdomains::web_archive::WebArchive;
use self::subdomains::SubdomainModule;
use crate::config::ScanConfig;
use crate::dns::DnsResolver;
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

/// Passive modules query third-party indexes, active ones talk DNS to the
/// target's own infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModuleKind {
    Passive,
    Active,
}

impl core::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ModuleKind::Passive => f.write_str("passive"),
            ModuleKind::Active => f.write_str("active"),
        }
    }
}

pub fn subdomains_modules(
    config: &ScanConfig,
    http_client: &Client,
    dns_resolver: &DnsResolver,
) -> Vec<Box<dyn SubdomainModule>> {
    vec![
        // -- Passive
        Box::new(CrtSh::new(http_client.clone())),
        Box::new(WebArchive::new(http_client.clone())),
        Box::new(HackerTarget::new(http_client.clone())),
        Box::new(Urlscan::new(http_client.clone())),
        Box::new(MerkleMap::new(http_client.clone())),
        Box::new(AnubisDb::new(http_client.clone())),
        Box::new(BufferOver::new(http_client.clone())),
        Box::new(AbuseIpDb::new(http_client.clone())),
        Box::new(Digitorus::new(http_client.clone())),
        // -- Active
        Box::new(ZoneTransfer::new(
            dns_resolver.clone(),
            config.zone_transfer_timeout(),
        )),
        Box::new(SrvEnum::new(
            dns_resolver.clone(),
            config.srv_records.clone(),
            config.dns_concurrency(),
        )),
        Box::new(ReverseSweep::new(
            dns_resolver.clone(),
            config.sweep_prefix_len(),
            config.dns_concurrency(),
        )),
    ]
}

pub fn display_all(modules: &[Box<dyn SubdomainModule>]) {
    for kind in [ModuleKind::Passive, ModuleKind::Active] {
        println!("\n{} modules", kind);
        for module in modules.iter().filter(|module| module.kind() == kind) {
            println!("- {:25}{}", module.name(), module.description());
        }
    }
}

// region:        --- HTTP requests

pub async fn http_request(http_client: &Client, url: &str) -> Result<Response> {
    send_request(http_client.get(url), url).await
}

#[instrument(name = "HTTP_request", level = "debug", skip_all, fields(url = url))]
pub async fn send_request(request: RequestBuilder, url: &str) -> Result<Response> {
    debug!("Sending request");
    match request.send().await {
        Ok(res) => {
            debug!("Receive with status: {}", res.status());
            Ok(res)
        }
        Err(err) => {
            error!("Reason: {}", err);
            Err(Error::Reqwest(err))
        }
    }
}

/// Body of a successful response; rate limiting and other statuses are
/// reported as errors of the calling module.
pub async fn success_body(res: Response, module: String) -> Result<String> {
    match res.status() {
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited(module)),
        status if !status.is_success() => {
            info!("{} answered {}", module, status);
            Err(Error::InvalidHttpResponse(module))
        }
        _ => Ok(res.text().await?),
    }
}

// endregion:     --- HTTP requests
