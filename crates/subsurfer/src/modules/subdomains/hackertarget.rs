use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct HackerTarget {
    http_client: Client,
}

impl HackerTarget {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    /// `host,ip` per line. The API answers 200 with a plain text message
    /// when the quota is exhausted.
    fn parse_hostsearch(&self, body: &str) -> Result<Vec<String>> {
        let lowered = body.trim_start().to_lowercase();
        if lowered.starts_with("error") || lowered.contains("api count exceeded") {
            return Err(Error::RateLimited(self.name()));
        }

        Ok(body
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect())
    }
}

impl Module for HackerTarget {
    fn name(&self) -> String {
        "subdomains/hackertarget".to_string()
    }

    fn description(&self) -> String {
        "Use HackerTarget host search API to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[async_trait]
impl SubdomainModule for HackerTarget {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://api.hackertarget.com/hostsearch/?q={}", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = self.parse_hostsearch(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}
