use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    // -- Input
    InvalidDomain(String),
    CliUsage(String),

    // -- Sources
    InvalidHttpResponse(String),
    RateLimited(String),
    Timeout(String),

    // -- Externals
    #[from]
    File(std::io::Error),

    #[from]
    Fmt(std::fmt::Error),

    #[from]
    Reqwest(reqwest::Error),

    #[from]
    SerdeJson(serde_json::Error),

    #[from]
    Resolve(hickory_resolver::error::ResolveError),

    #[from]
    DnsProto(hickory_resolver::proto::error::ProtoError),

    #[from]
    Subscriber(tracing::subscriber::SetGlobalDefaultError),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
