//! An in-memory network for testing and demos.
//!
//! Responses are scripted per `(method, url)` and handed out in FIFO order.
//! Once a route's queue is down to its last response, that response is
//! repeated for every further request. Unscripted routes answer 404.

use crate::abort::AbortSignal;
use rquery_api::{builder, network::*, BoxFut, RqError, RqResult};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// MemNetwork configuration types.
pub mod config {
    /// Configuration parameters for [MemNetworkFactory](super::MemNetworkFactory).
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MemNetworkConfig {
        /// Latency of responses scripted without their own. Default: 0.
        pub default_latency_ms: u32,
    }

    /// Module-level configuration for MemNetwork.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MemNetworkModConfig {
        /// MemNetwork configuration.
        pub mem_network: MemNetworkConfig,
    }
}

use config::*;

/// The in-memory network factory.
#[derive(Debug)]
pub struct MemNetworkFactory {
    network: Option<Arc<MemNetwork>>,
}

impl MemNetworkFactory {
    /// Construct a factory that creates a fresh [MemNetwork] from config.
    pub fn create() -> DynNetworkFactory {
        let out: DynNetworkFactory = Arc::new(Self { network: None });
        out
    }

    /// Construct a factory that hands out `network`, so a test can keep
    /// scripting it after the engine is built.
    pub fn from_network(network: Arc<MemNetwork>) -> DynNetworkFactory {
        let out: DynNetworkFactory = Arc::new(Self {
            network: Some(network),
        });
        out
    }
}

impl NetworkFactory for MemNetworkFactory {
    fn default_config(
        &self,
        config: &mut rquery_api::config::Config,
    ) -> RqResult<()> {
        config.set_module_config(&MemNetworkModConfig::default())
    }

    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, RqResult<DynNetwork>> {
        let network = self.network.clone();
        Box::pin(async move {
            let network = match network {
                Some(network) => network,
                None => {
                    let config: MemNetworkModConfig =
                        builder.config.get_module_config()?;
                    MemNetwork::new(config.mem_network)
                }
            };
            let out: DynNetwork = network;
            Ok(out)
        })
    }
}

/// A request as it was handed to [Network::open].
#[derive(Debug, Clone, PartialEq)]
pub struct MemRequest {
    /// The request method.
    pub method: HttpMethod,

    /// The request url.
    pub url: String,

    /// The request options.
    pub options: NetworkOptions,
}

#[derive(Debug, Clone)]
struct Scripted {
    response: NetworkResponse,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    routes: HashMap<(HttpMethod, String), VecDeque<Scripted>>,
    requests: Vec<MemRequest>,
}

/// A scripted in-memory [Network].
#[derive(Debug)]
pub struct MemNetwork {
    config: MemNetworkConfig,
    inner: Mutex<Inner>,
    executed: Arc<AtomicUsize>,
}

impl MemNetwork {
    /// Construct a network without any scripted responses.
    pub fn new(config: MemNetworkConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            inner: Mutex::new(Inner::default()),
            executed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue a response for `method url`.
    pub fn respond(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        response: NetworkResponse,
    ) {
        self.push(method, url.into(), response, None);
    }

    /// Queue a response for `method url` that takes `latency` to arrive.
    pub fn respond_after(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        latency: Duration,
        response: NetworkResponse,
    ) {
        self.push(method, url.into(), response, Some(latency));
    }

    fn push(
        &self,
        method: HttpMethod,
        url: String,
        response: NetworkResponse,
        latency: Option<Duration>,
    ) {
        self.inner
            .lock()
            .unwrap()
            .routes
            .entry((method, url))
            .or_default()
            .push_back(Scripted { response, latency });
    }

    /// How many handles were opened.
    pub fn opened_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// How many handles were executed.
    pub fn executed_count(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    /// Every request opened so far, oldest first.
    pub fn requests(&self) -> Vec<MemRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Network for MemNetwork {
    fn open(
        &self,
        url: &str,
        method: HttpMethod,
        options: NetworkOptions,
    ) -> RqResult<DynNetworkHandle> {
        options.check(method)?;

        let mut lock = self.inner.lock().unwrap();
        lock.requests.push(MemRequest {
            method,
            url: url.to_string(),
            options,
        });

        let scripted = match lock.routes.get_mut(&(method, url.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
        .unwrap_or_else(|| Scripted {
            response: NetworkResponse::status(404),
            latency: None,
        });

        tracing::trace!(%method, url, status = scripted.response.status, "open");

        let out: DynNetworkHandle = Arc::new(MemHandle {
            response: Mutex::new(Some(scripted.response)),
            latency: scripted.latency.unwrap_or(Duration::from_millis(
                self.config.default_latency_ms as u64,
            )),
            abort: AbortSignal::default(),
            executed: self.executed.clone(),
        });
        Ok(out)
    }
}

#[derive(Debug)]
struct MemHandle {
    response: Mutex<Option<NetworkResponse>>,
    latency: Duration,
    abort: AbortSignal,
    executed: Arc<AtomicUsize>,
}

impl NetworkHandle for MemHandle {
    fn execute(&self) -> BoxFut<'_, NetworkResponse> {
        Box::pin(async move {
            self.executed.fetch_add(1, Ordering::SeqCst);
            let response = self.response.lock().unwrap().take();
            let Some(response) = response else {
                return NetworkResponse::failed(RqError::other(
                    "handle executed twice",
                ));
            };
            tokio::select! {
                biased;
                _ = self.abort.aborted() => NetworkResponse::cancelled(),
                _ = tokio::time::sleep(self.latency) => response,
            }
        })
    }

    fn abort(&self) {
        self.abort.abort();
    }
}
