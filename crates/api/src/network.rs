//! rquery network related types.
//!
//! rquery never puts bytes on the wire itself. A [Network] opens one
//! [NetworkHandle] per transport attempt, and the orchestrator drives the
//! handle through [NetworkHandle::execute] and [NetworkHandle::abort].

use crate::*;
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Response / request headers.
pub type Headers = BTreeMap<String, String>;

/// The request methods a [Network] may be asked to open.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET, the default for queries.
    Get,
    /// HEAD
    Head,
    /// POST, the default for mutations.
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// The canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = RqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(RqError::precondition(format!(
                "Unsupported HTTP method: {s}"
            ))),
        }
    }
}

/// Whether credentials (cookies, auth headers) accompany a request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Always send credentials, also cross-origin.
    Include,
    /// Never send credentials.
    Omit,
    /// Only send credentials to the same origin.
    SameOrigin,
}

/// Everything besides url and method that a [Network] needs to open
/// a handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkOptions {
    /// The request body.
    pub body: Option<serde_json::Value>,

    /// Extra request headers.
    pub headers: Headers,

    /// Credentials policy, transport default if `None`.
    pub credentials: Option<Credentials>,

    /// Send the body as multipart form data.
    pub multipart: bool,
}

impl NetworkOptions {
    /// Check these options can be sent with `method`.
    pub fn check(&self, method: HttpMethod) -> RqResult<()> {
        if self.multipart && method != HttpMethod::Post {
            return Err(RqError::precondition(
                "Files can only be uploaded with POST requests.",
            ));
        }
        Ok(())
    }
}

/// The outcome of one transport attempt.
///
/// A transport error (connection failure, abort) is carried in `error`,
/// usually with status 0. It is never returned as an `Err`.
#[derive(Debug, Clone, Default)]
pub struct NetworkResponse {
    /// Transport level error, if any.
    pub error: Option<RqError>,

    /// HTTP status code, 0 if no response was received.
    pub status: u16,

    /// The parsed response body.
    pub body: Option<serde_json::Value>,

    /// The raw response text.
    pub text: Option<String>,

    /// The response headers.
    pub headers: Headers,
}

impl NetworkResponse {
    /// A response with a status and a json body. The text is the
    /// serialized body.
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            error: None,
            status,
            text: Some(body.to_string()),
            body: Some(body),
            headers: Headers::new(),
        }
    }

    /// A response that carries only a status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// A transport failure without any response.
    pub fn failed(error: RqError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// What an aborted handle resolves with.
    pub fn cancelled() -> Self {
        Self::failed(RqError::cancelled("request aborted"))
    }

    /// Add a response header.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// True if there was no transport error and the status is 2xx.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.status / 100 == 2
    }
}

/// One in-flight transport attempt.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait NetworkHandle: 'static + Send + Sync + std::fmt::Debug {
    /// Perform the request. Must be called at most once.
    ///
    /// The returned future resolves exactly once, regardless of success
    /// or failure, and also after [NetworkHandle::abort] (then with an
    /// error indicating cancellation).
    fn execute(&self) -> BoxFut<'_, NetworkResponse>;

    /// Request cancellation. Cooperative: `execute` may still take
    /// a moment to resolve.
    fn abort(&self);
}

/// Trait-object [NetworkHandle].
pub type DynNetworkHandle = Arc<dyn NetworkHandle>;

/// Opens [NetworkHandle]s.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait Network: 'static + Send + Sync + std::fmt::Debug {
    /// Open a handle for a single attempt. Nothing is sent until the
    /// handle is executed.
    fn open(
        &self,
        url: &str,
        method: HttpMethod,
        options: NetworkOptions,
    ) -> RqResult<DynNetworkHandle>;
}

/// Trait-object [Network].
pub type DynNetwork = Arc<dyn Network>;

/// A factory for creating [Network] instances.
pub trait NetworkFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> RqResult<()>;

    /// Construct a network instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, RqResult<DynNetwork>>;
}

/// Trait-object [NetworkFactory].
pub type DynNetworkFactory = Arc<dyn NetworkFactory>;
