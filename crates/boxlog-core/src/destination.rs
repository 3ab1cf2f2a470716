//! Remote log destination identity.

use std::fmt;

/// Static access credentials for the remote endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Where relayed records go: a log group and stream in one region.
///
/// Built once before the session starts and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDestination {
    pub group: String,
    pub stream: String,
    pub region: String,
    pub credentials: Credentials,
    /// Endpoint override, e.g. a local emulator.
    pub endpoint_url: Option<String>,
}

impl LogDestination {
    /// Create a destination for the default regional endpoint.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        stream: impl Into<String>,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
            region: region.into(),
            credentials,
            endpoint_url: None,
        }
    }

    /// Route requests to a custom endpoint.
    #[must_use]
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }
}

impl fmt::Display for LogDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.group, self.stream, self.region)
    }
}
