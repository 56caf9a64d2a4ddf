use super::SubdomainModule;
use crate::model::Domain;
use crate::modules::{send_request, success_body, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use select::document::Document;
use select::predicate::Name;
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct AbuseIpDb {
    http_client: Client,
}

impl AbuseIpDb {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Module for AbuseIpDb {
    fn name(&self) -> String {
        "subdomains/abuseipdb".to_string()
    }

    fn description(&self) -> String {
        "Scrape the AbuseIPDB WHOIS page to find subdomains".to_string()
    }
}

// endregion:     --- Module info

/// The page lists bare labels (`www`, `mail`) in the first list following
/// the `Subdomains` heading.
fn parse_whois_page(html: &str, domain: &Domain) -> Vec<String> {
    let document = Document::from(html);

    let Some(heading) = document
        .find(Name("h4"))
        .find(|node| node.text().trim() == "Subdomains")
    else {
        debug!("No subdomains section");
        return Vec::new();
    };

    let mut sibling = heading.next();
    while let Some(node) = sibling {
        if matches!(node.name(), Some("div") | Some("ul")) {
            return node
                .find(Name("li"))
                .map(|li| li.text().trim().to_string())
                .filter(|label| !label.is_empty())
                .inspect(|label| trace!("Collecting: {:?}", label))
                .map(|label| format!("{}.{}", label, domain))
                .collect();
        }
        sibling = node.next();
    }

    Vec::new()
}

#[async_trait]
impl SubdomainModule for AbuseIpDb {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let url = format!("https://www.abuseipdb.com/whois/{}", domain);
        let request = self
            .http_client
            .get(&url)
            .header(header::COOKIE, "XSRF-TOKEN=");
        let res = send_request(request, &url).await?;
        let body = success_body(res, self.name()).await?;

        let subdomains = parse_whois_page(&body, domain);
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_whois_page;
    use crate::model::Domain;

    #[test]
    fn labels_under_subdomains_heading() {
        let html = r#"<html><body>
            <h2>WHOIS</h2>
            <h4>Subdomains</h4>
            <div class="col"><ul><li>www</li><li> mail </li><li></li></ul></div>
            <h2>Current DNS Records</h2>
            <div><ul><li>not-a-label</li></ul></div>
        </body></html>"#;

        let domain = Domain::parse("example.com").unwrap();

        assert_eq!(
            parse_whois_page(html, &domain),
            vec!["www.example.com", "mail.example.com"]
        );
    }

    #[test]
    fn page_without_section() {
        let domain = Domain::parse("example.com").unwrap();

        assert!(parse_whois_page("<html><h4>Other</h4></html>", &domain).is_empty());
    }
}
