use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct WebArchive {
    http_client: Client,
}

impl WebArchive {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for WebArchive {
    fn name(&self) -> String {
        "subdomains/webarchive".to_string()
    }
    fn description(&self) -> String {
        "Use web.archive.org to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct WebArchiveResponse(Vec<Vec<String>>);

fn parse_urls(body: &str) -> Result<Vec<String>> {
    let urls: Vec<String> = serde_json::from_str::<WebArchiveResponse>(body)?
        .0
        .into_iter()
        .flatten()
        .collect();

    let subdomains: HashSet<String> = urls
        .into_iter()
        .filter_map(|url| {
            // header row
            if url == "original" {
                return None;
            }
            match Url::parse(&url) {
                Ok(parsed_url) => parsed_url.host_str().map(|host| host.to_string()),
                Err(_) => {
                    trace!("Parsing url: {:?}", url);
                    None
                }
            }
        })
        .inspect(|host| trace!("Collecting: {:?}", host))
        .collect();

    Ok(subdomains.into_iter().collect())
}

#[async_trait]
impl SubdomainModule for WebArchive {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://web.archive.org/cdx/search/cdx?url={}&output=json&matchType=domain&fl=original&collapse=urlkey", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_urls(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_urls;

    #[test]
    fn extract_hosts_from_archived_urls() {
        let body = r#"[["original"],
            ["http://www.example.com:80/"],
            ["https://shop.example.com/cart?id=1"],
            ["https://www.example.com/about"],
            ["not a url"]]"#;

        let mut hosts = parse_urls(body).unwrap();
        hosts.sort();

        assert_eq!(hosts, vec!["shop.example.com", "www.example.com"]);
    }

    #[test]
    fn empty_archive() {
        assert!(parse_urls("[]").unwrap().is_empty());
    }
}
