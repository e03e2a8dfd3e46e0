//! Shared test helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use horizon_lattice_dispatch::adapter::settle;
use horizon_lattice_dispatch::{
    Adapter, AdapterFuture, Body, RequestConfig, Response, TransportHandle,
};
use parking_lot::Mutex;

struct Recorded {
    configs: Mutex<Vec<RequestConfig>>,
    urls: Mutex<Vec<String>>,
    aborts: AtomicUsize,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// An in-memory adapter that records every request it receives.
#[derive(Clone)]
pub struct RecordingAdapter {
    inner: Arc<Recorded>,
}

impl RecordingAdapter {
    /// Respond with `status` and `body` to every request.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self::build(status, body.into(), None)
    }

    /// Respond with `200 {}` after `delay`.
    pub fn delayed(delay: Duration) -> Self {
        Self::build(200, "{}".to_string(), Some(delay))
    }

    fn build(status: u16, body: String, delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Recorded {
                configs: Mutex::new(Vec::new()),
                urls: Mutex::new(Vec::new()),
                aborts: AtomicUsize::new(0),
                status,
                body,
                delay,
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.configs.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.inner.urls.lock().clone()
    }

    pub fn last_config(&self) -> Option<RequestConfig> {
        self.inner.configs.lock().last().cloned()
    }

    pub fn aborts(&self) -> usize {
        self.inner.aborts.load(Ordering::SeqCst)
    }
}

impl Default for RecordingAdapter {
    fn default() -> Self {
        Self::new(200, r#"{"ok":true}"#)
    }
}

impl Adapter for RecordingAdapter {
    fn dispatch(&self, config: RequestConfig, transport: TransportHandle) -> AdapterFuture {
        self.inner.configs.lock().push(config.clone());
        self.inner.urls.lock().push(transport.url().to_string());

        let inner = self.inner.clone();
        async move {
            if let Some(delay) = inner.delay {
                tokio::time::sleep(delay).await;
            }
            settle(Response {
                data: Body::Text(inner.body.clone()),
                status: inner.status,
                status_text: String::new(),
                headers: http::HeaderMap::new(),
                config,
                request: transport,
            })
        }
        .boxed()
    }

    fn abort(&self, _: &TransportHandle) {
        self.inner.aborts.fetch_add(1, Ordering::SeqCst);
    }
}
