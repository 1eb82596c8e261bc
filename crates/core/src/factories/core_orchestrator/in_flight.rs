use crate::abort::AbortSignal;
use rquery_api::{
    network::{DynNetworkHandle, NetworkHandle, NetworkResponse},
    store::AbortHandle,
    BoxFut, RqError,
};
use std::sync::Mutex;

/// The abort handle of an attempt chain.
///
/// Tracks whichever network handle is currently executing. Once aborted,
/// the attempt in flight is aborted, any handle swapped in later is
/// aborted on arrival, and the chain stops retrying.
#[derive(Debug)]
pub(super) struct InFlight {
    signal: AbortSignal,
    current: Mutex<DynNetworkHandle>,
}

impl InFlight {
    pub fn new(handle: DynNetworkHandle) -> Self {
        Self {
            signal: AbortSignal::default(),
            current: Mutex::new(handle),
        }
    }

    pub fn current(&self) -> DynNetworkHandle {
        self.current.lock().unwrap().clone()
    }

    /// Swap in the handle of the next attempt.
    pub fn replace(&self, handle: DynNetworkHandle) {
        *self.current.lock().unwrap() = handle.clone();
        if self.signal.is_aborted() {
            handle.abort();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }

    pub async fn aborted(&self) {
        self.signal.aborted().await
    }
}

impl AbortHandle for InFlight {
    fn abort(&self) {
        self.signal.abort();
        self.current.lock().unwrap().abort();
    }
}

/// Stands in for an attempt whose handle could not be opened. Executing it
/// resolves with the open error at once.
#[derive(Debug)]
pub(super) struct FailedOpen(Mutex<Option<RqError>>);

impl FailedOpen {
    pub fn new(err: RqError) -> Self {
        Self(Mutex::new(Some(err)))
    }
}

impl NetworkHandle for FailedOpen {
    fn execute(&self) -> BoxFut<'_, NetworkResponse> {
        let err = self
            .0
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| RqError::other("handle executed twice"));
        Box::pin(async move { NetworkResponse::failed(err) })
    }

    fn abort(&self) {}
}
