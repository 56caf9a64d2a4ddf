use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{send_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct Urlscan {
    http_client: Client,
}

impl Urlscan {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for Urlscan {
    fn name(&self) -> String {
        "subdomains/urlscan".to_string()
    }

    fn description(&self) -> String {
        "Use urlscan.io search API to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    page: Option<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    domain: Option<String>,
}

fn parse_search(body: &str) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    Ok(response
        .results
        .into_iter()
        .filter_map(|result| result.page.and_then(|page| page.domain))
        .collect())
}

#[async_trait]
impl SubdomainModule for Urlscan {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = "https://urlscan.io/api/v1/search/";
        let query = format!("page.domain:{}", domain);
        let request = self
            .http_client
            .get(url)
            .query(&[("q", query.as_str()), ("size", "10000")]);
        let res = send_request(request, url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_search(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}
