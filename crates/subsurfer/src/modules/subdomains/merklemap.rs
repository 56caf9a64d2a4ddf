use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{send_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct MerkleMap {
    http_client: Client,
}

impl MerkleMap {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for MerkleMap {
    fn name(&self) -> String {
        "subdomains/merklemap".to_string()
    }

    fn description(&self) -> String {
        "Use MerkleMap certificate search to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    hostname: Option<String>,
    subject_common_name: Option<String>,
}

fn parse_search(body: &str) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    Ok(response
        .results
        .into_iter()
        .flat_map(|entry| [entry.hostname, entry.subject_common_name])
        .flatten()
        .collect())
}

#[async_trait]
impl SubdomainModule for MerkleMap {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = "https://api.merklemap.com/v1-webui/search-noauth";
        let query = format!("*.{}", domain);
        let request = self
            .http_client
            .get(url)
            .query(&[("query", query.as_str()), ("page", "0")])
            .header(header::ACCEPT, "*/*")
            .header(header::ORIGIN, "https://www.merklemap.com")
            .header(header::REFERER, "https://www.merklemap.com/");
        let res = send_request(request, url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_search(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_search;
    use crate::model::{Domain, HostnameSet};

    #[test]
    fn collect_hostnames_and_common_names() {
        let body = r#"{
            "count": 2,
            "results": [
                {"hostname": "api.example.com", "subject_common_name": "*.example.com"},
                {"hostname": "vpn.example.com", "subject_common_name": null},
                {"subject_common_name": "other.org"}
            ]
        }"#;

        let domain = Domain::parse("example.com").unwrap();
        let hostnames = HostnameSet::from_candidates(&domain, parse_search(body).unwrap());

        assert_eq!(
            hostnames.sorted(),
            vec!["api.example.com", "example.com", "vpn.example.com"]
        );
    }
}
