use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct BufferOver {
    http_client: Client,
}

impl BufferOver {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for BufferOver {
    fn name(&self) -> String {
        "subdomains/bufferover".to_string()
    }

    fn description(&self) -> String {
        "Use BufferOver TLS passive DNS to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Results", default)]
    results: Option<Vec<String>>,
}

/// Rows look like `ip,sha256,org,hostname`; the hostname is the last field.
fn parse_results(body: &str) -> Result<Vec<String>> {
    let response: DnsResponse = serde_json::from_str(body)?;

    Ok(response
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| row.rsplit(',').next().map(|host| host.trim().to_string()))
        .filter(|host| !host.is_empty())
        .collect())
}

#[async_trait]
impl SubdomainModule for BufferOver {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://tls.bufferover.run/dns?q=.{}", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_results(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_results;

    #[test]
    fn hostname_is_last_field() {
        let body = r#"{
            "Meta": {"Errors": []},
            "Results": [
                "93.184.216.34,3b2f...,Example Inc,www.example.com",
                "93.184.216.35,,,mail.example.com",
                ""
            ]
        }"#;

        assert_eq!(parse_results(body).unwrap(), vec!["www.example.com", "mail.example.com"]);
    }

    #[test]
    fn null_results() {
        assert!(parse_results(r#"{"Meta": {}, "Results": null}"#).unwrap().is_empty());
    }
}
