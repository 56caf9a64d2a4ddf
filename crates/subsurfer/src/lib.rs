pub mod config;
pub mod dns;
pub mod error;
pub mod events;
pub mod model;
pub mod modules;
pub mod scan;
pub mod takeover;
pub mod utils;

pub use error::{Error, Result};
pub use model::{AdapterResult, Domain, Finding, HostnameSet, ScanReport};
pub use scan::{scan, Discovery, ScanRequest};
pub use takeover::TakeoverVerifier;
