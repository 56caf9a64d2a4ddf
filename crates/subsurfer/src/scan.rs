use crate::config::ScanConfig;
use crate::events::{Observer, ScanEvent, Silent};
use crate::model::{AdapterResult, Domain, HostnameSet, ScanReport};
use crate::modules::{self, subdomains::SubdomainModule, ModuleKind};
use crate::takeover::fingerprint::FingerprintStore;
use crate::takeover::probe::{ReqwestProbe, ResolverCnameLookup};
use crate::takeover::TakeoverVerifier;
use crate::{dns, Result};
use futures::future::join_all;
use futures::{stream, FutureExt, StreamExt};
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

// region:        --- Discovery

/// Runs every registered module and unions what they found.
pub struct Discovery {
    modules: Vec<Box<dyn SubdomainModule>>,
    active_concurrency: usize,
    observer: Arc<dyn Observer>,
}

impl Discovery {
    pub fn new(modules: Vec<Box<dyn SubdomainModule>>) -> Self {
        Self {
            modules,
            active_concurrency: crate::config::ACTIVE_MODULES_CONCURRENCY,
            observer: Arc::new(Silent),
        }
    }

    pub fn with_active_concurrency(mut self, active_concurrency: usize) -> Self {
        self.active_concurrency = active_concurrency.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn modules(&self) -> &[Box<dyn SubdomainModule>] {
        &self.modules
    }

    /// Passive modules all run at once; active ones share a gate of
    /// `active_concurrency` slots. Returns once every module is done.
    #[instrument(name = "subdomains", level = "info", skip_all, fields(domain = %domain))]
    pub async fn collect(&self, domain: &Domain) -> HostnameSet {
        let (passive, active): (Vec<_>, Vec<_>) = self
            .modules
            .iter()
            .partition(|module| module.kind() == ModuleKind::Passive);
        info!("{} passive & {} active modules", passive.len(), active.len());

        let passive_runs = join_all(
            passive
                .into_iter()
                .map(|module| self.run_module(&**module, domain)),
        );
        let active_runs = stream::iter(active)
            .map(|module| self.run_module(&**module, domain))
            .buffer_unordered(self.active_concurrency)
            .collect::<Vec<AdapterResult>>();

        let (passive_results, active_results) = tokio::join!(passive_runs, active_runs);

        let hostnames = merge(passive_results.into_iter().chain(active_results));
        self.observer.notify(ScanEvent::DiscoveryFinished {
            count: hostnames.len(),
        });
        hostnames
    }

    async fn run_module(&self, module: &dyn SubdomainModule, domain: &Domain) -> AdapterResult {
        self.observer.notify(ScanEvent::ModuleStarted {
            module: module.name(),
            kind: module.kind(),
        });

        let result = match AssertUnwindSafe(module.scan(domain)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => AdapterResult::Failed {
                module: module.name(),
                reason: "module panicked".to_string(),
            },
        };

        match &result {
            AdapterResult::Found { module, hostnames } => {
                self.observer.notify(ScanEvent::ModuleFinished {
                    module: module.clone(),
                    count: hostnames.len(),
                })
            }
            AdapterResult::Failed { module, reason } => {
                self.observer.notify(ScanEvent::ModuleFailed {
                    module: module.clone(),
                    reason: reason.clone(),
                })
            }
        }

        result
    }
}

/// Case-insensitive union; failed modules contribute nothing.
pub fn merge<I>(results: I) -> HostnameSet
where
    I: IntoIterator<Item = AdapterResult>,
{
    let mut hostnames = HostnameSet::new();
    for result in results {
        trace!("Merging {}", result.module());
        hostnames.merge(result.into_hostnames());
    }
    hostnames
}

// endregion:     --- Discovery

// region:        --- Scan main function

pub struct ScanRequest {
    pub target: Domain,
    /// Already collected hostnames: discovery is skipped.
    pub hostnames: Option<HostnameSet>,
    pub verify: bool,
    pub fingerprints: FingerprintStore,
}

#[instrument(name = "scan", level = "info", skip_all, fields(target = %request.target))]
pub async fn scan(
    request: ScanRequest,
    config: &ScanConfig,
    observer: Arc<dyn Observer>,
) -> Result<ScanReport> {
    trace!("Start scan on {}", request.target);

    // create http client
    let http_client = Client::builder()
        .timeout(config.discovery_timeout())
        .user_agent(config.user_agent.as_str())
        .build()?;
    debug!("HTTP Client created: {:?}", http_client);
    let dns_resolver = dns::new_resolver(config);

    // fails before any discovery module runs
    let http_probe = match request.verify {
        true => Some(ReqwestProbe::new(
            config.takeover_timeout(),
            &config.user_agent,
        )?),
        false => None,
    };

    // discovery
    let subdomains = match request.hostnames {
        Some(hostnames) => {
            info!("{} subdomains given, discovery skipped", hostnames.len());
            hostnames
        }
        None => {
            let modules = modules::subdomains_modules(config, &http_client, &dns_resolver);
            Discovery::new(modules)
                .with_active_concurrency(config.active_concurrency())
                .with_observer(observer.clone())
                .collect(&request.target)
                .await
        }
    };

    // takeover
    let takeovers = match http_probe {
        Some(http_probe) => {
            let verifier = TakeoverVerifier::new(
                Arc::new(request.fingerprints),
                Arc::new(ResolverCnameLookup::new(dns_resolver.clone())),
                Arc::new(http_probe),
            )
            .with_observer(observer);
            verifier.scan(&subdomains).await
        }
        None => Vec::new(),
    };

    Ok(ScanReport {
        target: request.target.to_string(),
        subdomains,
        takeovers,
    })
}

// endregion:     --- Scan main function

#[cfg(test)]
mod tests {
    use super::{merge, scan, Discovery, ScanRequest};
    use crate::config::ScanConfig;
    use crate::takeover::fingerprint::FingerprintStore;
    use crate::events::ScanEvent;
    use crate::model::{AdapterResult, Domain, HostnameSet};
    use crate::modules::subdomains::SubdomainModule;
    use crate::modules::{Module, ModuleKind};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Clone)]
    enum Behavior {
        Find(Vec<&'static str>),
        Fail,
        Panic,
    }

    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    struct FakeModule {
        name: &'static str,
        kind: ModuleKind,
        behavior: Behavior,
        delay: Duration,
        in_flight: Arc<InFlight>,
    }

    impl FakeModule {
        fn new(name: &'static str, kind: ModuleKind, behavior: Behavior) -> Self {
            Self {
                name,
                kind,
                behavior,
                delay: Duration::from_millis(10),
                in_flight: Arc::new(InFlight::default()),
            }
        }

        fn tracked(mut self, in_flight: &Arc<InFlight>, delay: Duration) -> Self {
            self.in_flight = Arc::clone(in_flight);
            self.delay = delay;
            self
        }
    }

    impl Module for FakeModule {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn description(&self) -> String {
            "fake".to_string()
        }
    }

    #[async_trait]
    impl SubdomainModule for FakeModule {
        fn kind(&self) -> ModuleKind {
            self.kind
        }

        async fn enumerate(&self, _domain: &Domain) -> Result<Vec<String>> {
            let now = self.in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.in_flight.max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.current.fetch_sub(1, Ordering::SeqCst);

            match &self.behavior {
                Behavior::Find(hosts) => Ok(hosts.iter().map(|host| host.to_string()).collect()),
                Behavior::Fail => Err(Error::Timeout(self.name.to_string())),
                Behavior::Panic => panic!("{} exploded", self.name),
            }
        }
    }

    fn example() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    #[tokio::test]
    async fn union_case_folded_and_failure_ignored() {
        let discovery = Discovery::new(vec![
            Box::new(FakeModule::new(
                "passive/one",
                ModuleKind::Passive,
                Behavior::Find(vec!["a.example.com", "B.EXAMPLE.COM"]),
            )),
            Box::new(FakeModule::new(
                "passive/two",
                ModuleKind::Passive,
                Behavior::Find(vec!["a.example.com", "c.example.com"]),
            )),
            Box::new(FakeModule::new("active/timeout", ModuleKind::Active, Behavior::Fail)),
        ]);

        let hostnames = discovery.collect(&example()).await;

        assert_eq!(
            hostnames.sorted(),
            vec!["a.example.com", "b.example.com", "c.example.com"]
        );
    }

    #[tokio::test]
    async fn results_respect_suffix() {
        let discovery = Discovery::new(vec![Box::new(FakeModule::new(
            "passive/noisy",
            ModuleKind::Passive,
            Behavior::Find(vec![
                "www.example.com",
                "example.com",
                "badexample.com",
                "example.com.attacker.net",
                "*.dev.example.com",
            ]),
        ))]);

        let hostnames = discovery.collect(&example()).await;

        assert_eq!(
            hostnames.sorted(),
            vec!["dev.example.com", "example.com", "www.example.com"]
        );
        assert!(hostnames
            .iter()
            .all(|host| host == "example.com" || host.ends_with(".example.com")));
    }

    #[tokio::test]
    async fn panicking_module_is_isolated() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let discovery = Discovery::new(vec![
            Box::new(FakeModule::new("active/panic", ModuleKind::Active, Behavior::Panic)),
            Box::new(FakeModule::new(
                "passive/ok",
                ModuleKind::Passive,
                Behavior::Find(vec!["ok.example.com"]),
            )),
            Box::new(FakeModule::new("passive/fail", ModuleKind::Passive, Behavior::Fail)),
        ])
        .with_observer(Arc::new(tx));

        let hostnames = discovery.collect(&example()).await;
        assert_eq!(hostnames.sorted(), vec!["ok.example.com"]);

        let mut failed = Vec::new();
        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                ScanEvent::ModuleFailed { module, .. } => failed.push(module),
                ScanEvent::ModuleFinished { module, count } => finished.push((module, count)),
                _ => {}
            }
        }
        failed.sort();
        assert_eq!(failed, vec!["active/panic", "passive/fail"]);
        assert_eq!(finished, vec![("passive/ok".to_string(), 1)]);
    }

    #[tokio::test]
    async fn active_gate_caps_in_flight_probes() {
        let in_flight = Arc::new(InFlight::default());
        let delay = Duration::from_millis(50);
        let modules: Vec<Box<dyn SubdomainModule>> = ["dns/one", "dns/two", "dns/three"]
            .into_iter()
            .map(|name| {
                Box::new(
                    FakeModule::new(name, ModuleKind::Active, Behavior::Find(vec!["x.example.com"]))
                        .tracked(&in_flight, delay),
                ) as Box<dyn SubdomainModule>
            })
            .collect();

        let hostnames = Discovery::new(modules)
            .with_active_concurrency(2)
            .collect(&example())
            .await;

        assert_eq!(hostnames.len(), 1);
        assert_eq!(in_flight.max.load(Ordering::SeqCst), 2);
        assert_eq!(in_flight.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passive_modules_are_not_capped() {
        let in_flight = Arc::new(InFlight::default());
        let delay = Duration::from_millis(50);
        let modules: Vec<Box<dyn SubdomainModule>> = ["p/1", "p/2", "p/3", "p/4", "p/5"]
            .into_iter()
            .map(|name| {
                Box::new(
                    FakeModule::new(name, ModuleKind::Passive, Behavior::Find(Vec::new()))
                        .tracked(&in_flight, delay),
                ) as Box<dyn SubdomainModule>
            })
            .collect();

        let hostnames = Discovery::new(modules).collect(&example()).await;

        assert!(hostnames.is_empty());
        assert_eq!(in_flight.max.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn unusable_takeover_client_fails_before_discovery() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = ScanConfig {
            user_agent: "subsurfer\nbroken".to_string(),
            ..ScanConfig::default()
        };
        let request = ScanRequest {
            target: example(),
            hostnames: None,
            verify: true,
            fingerprints: FingerprintStore::default(),
        };

        let result = scan(request, &config, Arc::new(tx)).await;

        assert!(matches!(result, Err(Error::Reqwest(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn merge_order_does_not_matter() {
        let domain = example();
        let found = |module: &str, hosts: &[&str]| AdapterResult::Found {
            module: module.to_string(),
            hostnames: HostnameSet::from_candidates(&domain, hosts),
        };

        let forward = merge(vec![
            found("one", &["a.example.com", "b.example.com"]),
            found("two", &["b.example.com", "c.example.com"]),
        ]);
        let backward = merge(vec![
            found("two", &["b.example.com", "c.example.com"]),
            found("one", &["a.example.com", "b.example.com"]),
            found("one", &["a.example.com", "b.example.com"]),
        ]);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }
}
