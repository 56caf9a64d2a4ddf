use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct AnubisDb {
    http_client: Client,
}

impl AnubisDb {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for AnubisDb {
    fn name(&self) -> String {
        "subdomains/anubisdb".to_string()
    }

    fn description(&self) -> String {
        "Use AnubisDB subdomain index to find subdomains".to_string()
    }
}

// endregion:     --- Module info

fn parse_subdomains(body: &str) -> Result<Vec<String>> {
    let subdomains: Vec<String> = serde_json::from_str(body)?;
    Ok(subdomains
        .into_iter()
        .map(|subdomain| subdomain.trim().to_string())
        .filter(|subdomain| !subdomain.is_empty())
        .collect())
}

#[async_trait]
impl SubdomainModule for AnubisDb {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://jonlu.ca/anubis/subdomains/{}", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_subdomains(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_subdomains;
    use crate::model::{Domain, HostnameSet};

    #[test]
    fn parse_anubis_list() {
        let body = r#"["www.example.com", " API.example.com ", "", "mx.example.com.", "other.org"]"#;
        let domain = Domain::parse("example.com").unwrap();

        let hostnames = HostnameSet::from_candidates(&domain, parse_subdomains(body).unwrap());

        assert_eq!(
            hostnames.sorted(),
            vec!["api.example.com", "mx.example.com", "www.example.com"]
        );
    }

    #[test]
    fn unexpected_body_is_an_error() {
        assert!(parse_subdomains(r#"{"error": "not found"}"#).is_err());
        assert!(parse_subdomains("[]").unwrap().is_empty());
    }
}
