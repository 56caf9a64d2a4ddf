use crate::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::to_string_pretty;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

// region:        --- Domain

/// Target of a scan, lower-cased and without trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let domain = trimmed
            .trim_end_matches('/')
            .trim_end_matches('.')
            .to_lowercase();

        if !domain.contains('.') || !is_hostname(&domain) {
            return Err(Error::InvalidDomain(input.to_string()));
        }

        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Clean a raw candidate and keep it only if it is the domain itself or
    /// one of its subdomains.
    pub fn normalize(&self, candidate: &str) -> Option<String> {
        let host = candidate
            .trim()
            .trim_start_matches("*.")
            .trim_start_matches('.')
            .trim_end_matches('.')
            .to_lowercase();

        // e-mail addresses, URLs and markup leftovers are not hostnames
        if !is_hostname(&host) {
            return None;
        }

        if host == self.0 || host.ends_with(&format!(".{}", self.0)) {
            Some(host)
        } else {
            None
        }
    }
}

/// Lower-case letters, digits and hyphens, in non-empty labels that neither
/// start nor end with a hyphen.
fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && host
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// endregion:     --- Domain

// region:        --- Models

/// Lower-cased hostnames, each one validated against a [`Domain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostnameSet(HashSet<String>);

impl HostnameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_candidates<I, S>(domain: &Domain, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hostnames = Self::new();
        for candidate in candidates {
            hostnames.insert(domain, candidate.as_ref());
        }
        hostnames
    }

    /// Returns false when the candidate is rejected or already present.
    pub fn insert(&mut self, domain: &Domain, candidate: &str) -> bool {
        match domain.normalize(candidate) {
            Some(host) => self.0.insert(host),
            None => false,
        }
    }

    pub fn merge(&mut self, other: HostnameSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, host: &str) -> bool {
        self.0.contains(&host.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut hostnames: Vec<String> = self.0.iter().cloned().collect();
        hostnames.sort();
        hostnames
    }
}

impl IntoIterator for HostnameSet {
    type Item = String;
    type IntoIter = std::collections::hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for HostnameSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

/// What a discovery module hands back to the orchestrator.
#[derive(Debug)]
pub enum AdapterResult {
    Found { module: String, hostnames: HostnameSet },
    Failed { module: String, reason: String },
}

impl AdapterResult {
    pub fn module(&self) -> &str {
        match self {
            AdapterResult::Found { module, .. } | AdapterResult::Failed { module, .. } => module,
        }
    }

    pub fn into_hostnames(self) -> HostnameSet {
        match self {
            AdapterResult::Found { hostnames, .. } => hostnames,
            AdapterResult::Failed { .. } => HostnameSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub domain: String,
    pub cname: String,
    pub service: String,
    pub http_status: u16,
    pub vulnerable: bool,
}

impl Finding {
    pub fn new(domain: &str, cname: &str, service: &str, http_status: u16) -> Self {
        Self {
            domain: domain.to_string(),
            cname: cname.to_string(),
            service: service.to_string(),
            http_status,
            vulnerable: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub subdomains: HostnameSet,
    pub takeovers: Vec<Finding>,
}

// endregion:     --- Models

// region:        --- Exporting utils

pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        Ok(false)
    } else {
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}

pub fn export_to_json(report: &ScanReport, path: &Path) -> Result<()> {
    let json = to_string_pretty(report)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

pub fn export_to_text(report: &ScanReport, path: &Path) -> Result<()> {
    let content = render_text(report)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Stdout lines of the pipe modes: hostnames (as `https://` URLs with
/// `web`), then one line per takeover finding.
pub fn pipe_lines(report: &ScanReport, web: bool) -> Vec<String> {
    let mut lines: Vec<String> = report
        .subdomains
        .sorted()
        .into_iter()
        .map(|subdomain| match web {
            true => format!("https://{}", subdomain),
            false => subdomain,
        })
        .collect();
    lines.extend(report.takeovers.iter().map(vulnerable_line));
    lines
}

pub fn vulnerable_line(finding: &Finding) -> String {
    format!(
        "VULNERABLE: {} -> {} (CNAME: {})",
        finding.domain, finding.service, finding.cname
    )
}

fn render_text(report: &ScanReport) -> Result<String> {
    let mut content = String::new();
    writeln!(&mut content, "SubSurfer - subdomain")?;
    for subdomain in report.subdomains.sorted() {
        writeln!(&mut content, "{}", subdomain)?;
    }

    if !report.takeovers.is_empty() {
        writeln!(&mut content)?;
        writeln!(&mut content, "SubSurfer - takeover")?;
        for finding in &report.takeovers {
            writeln!(
                &mut content,
                "{} -> {} (CNAME: {}, status: {})",
                finding.domain, finding.service, finding.cname, finding.http_status
            )?;
        }
    }

    Ok(content)
}

// endregion:     --- Exporting utils
