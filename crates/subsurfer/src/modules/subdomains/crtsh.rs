use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct CrtSh {
    http_client: Client,
}

impl CrtSh {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for CrtSh {
    fn name(&self) -> String {
        "subdomains/crtsh".to_string()
    }

    fn description(&self) -> String {
        "Use crt.sh/ certificate transparency logs to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

fn parse_entries(body: &str) -> Result<Vec<String>> {
    let entries: Vec<CrtShEntry> = serde_json::from_str(body)?;

    // one certificate can hold many names, one per line
    let subdomains: HashSet<String> = entries
        .into_iter()
        .flat_map(|entry| {
            entry
                .name_value
                .split('\n')
                .map(|subdomain| subdomain.trim().to_string())
                .collect::<Vec<String>>()
        })
        .filter(|subdomain| !subdomain.is_empty())
        .inspect(|subdomain| trace!("Collecting: {:?}", subdomain))
        .collect();

    Ok(subdomains.into_iter().collect())
}

#[async_trait]
impl SubdomainModule for CrtSh {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://crt.sh/?q=%25.{}&output=json", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_entries(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_entries;
    use crate::model::{Domain, HostnameSet};

    #[test]
    fn split_multi_names_entries() {
        let body = r#"[
            {"issuer_ca_id": 1, "name_value": "a.example.com\n*.b.example.com"},
            {"issuer_ca_id": 2, "name_value": "A.example.com"},
            {"issuer_ca_id": 3, "name_value": "example.org"}
        ]"#;

        let domain = Domain::parse("example.com").unwrap();
        let hostnames = HostnameSet::from_candidates(&domain, parse_entries(body).unwrap());

        assert_eq!(hostnames.sorted(), vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn reject_non_json_body() {
        assert!(parse_entries("<html>Too many requests</html>").is_err());
    }
}
