use crate::dns::{resolve_cname, DnsResolver};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP status and body observed on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEvidence {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait CnameLookup: Send + Sync {
    /// `Ok(None)` when the host has no CNAME record.
    async fn cname(&self, host: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn probe(&self, host: &str) -> Result<HttpEvidence>;
}

// region:        --- DNS

pub struct ResolverCnameLookup {
    dns_resolver: DnsResolver,
}

impl ResolverCnameLookup {
    pub fn new(dns_resolver: DnsResolver) -> Self {
        Self { dns_resolver }
    }
}

#[async_trait]
impl CnameLookup for ResolverCnameLookup {
    async fn cname(&self, host: &str) -> Result<Option<String>> {
        resolve_cname(&self.dns_resolver, host).await
    }
}

// endregion:     --- DNS

// region:        --- HTTP

const SCHEMES: [&str; 2] = ["https", "http"];

/// Certificates are not validated: dangling resources rarely serve a valid
/// one for the victim's hostname.
pub struct ReqwestProbe {
    http_client: Client,
}

impl ReqwestProbe {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::limited(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { http_client })
    }

    async fn fetch(&self, url: &str) -> Result<HttpEvidence> {
        let res = self.http_client.get(url).send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;

        Ok(HttpEvidence { status, body })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    #[instrument(name = "probe", level = "debug", fields(host = host), skip_all)]
    async fn probe(&self, host: &str) -> Result<HttpEvidence> {
        let mut last_error = None;
        for scheme in SCHEMES {
            let url = format!("{}://{}", scheme, host);
            match self.fetch(&url).await {
                Ok(evidence) => {
                    debug!("{} answered {}", url, evidence.status);
                    return Ok(evidence);
                }
                Err(err) => {
                    debug!("{}: {}", url, err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::InvalidHttpResponse(host.to_string())))
    }
}

// endregion:     --- HTTP
