//! Request dispatch pipeline for Horizon Lattice.
//!
//! This crate sits between the code that wants to make a request and the
//! transport that performs it:
//!
//! - **Configuration**: per-call [`RequestConfig`]s are merged over instance
//!   defaults, with header groups per method
//! - **Interceptors**: fulfilled/rejected hook pairs run before and after the
//!   transport, with a synchronous fast path when no hook suspends
//! - **Transforms**: payload transforms on both sides of the transport
//! - **Cancellation**: [`CancelToken`]s and [`AbortSignal`]s, unified per
//!   request so the transport is aborted at most once
//! - **Adapters**: the transport boundary, with a `reqwest`-backed
//!   [`HttpAdapter`] as the default
//!
//! # Making requests
//!
//! ```ignore
//! use horizon_lattice_dispatch::{Dispatcher, RequestConfig, defaults::default_config};
//!
//! let api = Dispatcher::new(default_config().base_url("https://api.example.com"));
//!
//! let users = api.get("/users").query("page", "2").send().await?;
//! let created = api
//!     .post("/users", Body::json(&serde_json::json!({"name": "John"}))?)
//!     .send()
//!     .await?;
//! ```
//!
//! # Interceptors
//!
//! ```ignore
//! use horizon_lattice_dispatch::Interceptor;
//!
//! let id = api.interceptors.request.register(
//!     Interceptor::new()
//!         .on_fulfilled(|config| Ok(config.bearer_auth(load_token())))
//!         .synchronous(true),
//! );
//! api.interceptors.response.register(
//!     Interceptor::new().on_rejected(|error| {
//!         tracing::warn!("request failed: {error}");
//!         Err(error)
//!     }),
//! );
//! api.interceptors.request.eject(id);
//! ```
//!
//! # Cancellation
//!
//! ```ignore
//! use horizon_lattice_dispatch::AbortController;
//!
//! let controller = AbortController::new();
//! let pending = api.get("/slow").signal(controller.signal()).send();
//! controller.abort();
//! assert!(pending.await.unwrap_err().is_cancel());
//! ```
//!
//! # Logging
//!
//! The crate logs through `tracing` under the `horizon_lattice_dispatch`
//! target and never installs a subscriber.

pub mod adapter;
pub mod cancel;
pub mod config;
pub mod defaults;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod transform;

pub use error::{DispatchError, ErrorKind, Result, TimeoutKind};

// Re-export commonly used types at the crate root
pub use adapter::{Adapter, AdapterFuture, HttpAdapter, HttpAdapterBuilder, TransportHandle};
pub use cancel::{AbortController, AbortSignal, CancelSource, CancelToken, Canceller};
pub use config::{
    DispatcherSettings, Headers, RequestConfig, StatusValidator, TransitionalOptions,
    merge_config,
};
pub use dispatcher::{Dispatcher, RequestBuilder};
pub use self::http::{Authentication, Body, Method, Response, ResponseType, TransferProgress};
pub use interceptor::{ExecutionStrategy, Interceptor, InterceptorId, InterceptorManager};
pub use transform::{Transform, transform_data};
