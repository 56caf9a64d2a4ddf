use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{http_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use lazy_regex::regex;
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct Digitorus {
    http_client: Client,
}

impl Digitorus {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for Digitorus {
    fn name(&self) -> String {
        "subdomains/digitorus".to_string()
    }

    fn description(&self) -> String {
        "Scrape certificatedetails.com (Digitorus) to find subdomains".to_string()
    }
}

// endregion:     --- Module info

/// Every hostname-looking token of the page; the caller keeps the ones under
/// the target.
fn extract_hostnames(html: &str) -> Vec<String> {
    let hostname_regex =
        regex!(r"(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}");

    let hostnames: HashSet<String> = hostname_regex
        .find_iter(html)
        .map(|found| found.as_str().to_lowercase())
        .collect();

    hostnames.into_iter().collect()
}

#[async_trait]
impl SubdomainModule for Digitorus {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://certificatedetails.com/{}", domain);
        let res = http_request(&self.http_client, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = extract_hostnames(&body);
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::extract_hostnames;
    use crate::model::{Domain, HostnameSet};

    #[test]
    fn hostnames_from_links() {
        let html = r#"<table>
            <tr><td><a href="https://certificatedetails.com/dev.example.com">dev.example.com</a></td></tr>
            <tr><td><a href="/Api.Example.com">Api.Example.com</a></td></tr>
            <tr><td>example.com.evil.net</td></tr>
        </table>"#;

        let domain = Domain::parse("example.com").unwrap();
        let hostnames = HostnameSet::from_candidates(&domain, extract_hostnames(html));

        assert_eq!(hostnames.sorted(), vec!["api.example.com", "dev.example.com"]);
    }
}
