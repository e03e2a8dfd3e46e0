//! The adapter dispatch step: the bridge between the request chain and the
//! transport.

use std::sync::{Arc, OnceLock};

use crate::adapter::{Adapter, HttpAdapter, TransportHandle};
use crate::cancel::{CancellationController, throw_if_cancellation_requested};
use crate::config::RequestConfig;
use crate::error::{DispatchError, Result};
use crate::http::Response;
use crate::transform::transform_data;

/// The shared default adapter, built on first use.
fn default_adapter() -> Result<Arc<dyn Adapter>> {
    static DEFAULT: OnceLock<Arc<dyn Adapter>> = OnceLock::new();

    if let Some(adapter) = DEFAULT.get() {
        return Ok(adapter.clone());
    }
    let adapter: Arc<dyn Adapter> = Arc::new(HttpAdapter::builder().build()?);
    Ok(DEFAULT.get_or_init(|| adapter).clone())
}

/// Send a finalized config through its adapter.
///
/// Fails without touching the transport if the request is already cancelled.
/// Otherwise the payload runs through the request transforms, the header
/// groups are flattened, and the adapter is invoked under a
/// [`CancellationController`]. A cancellation observed while the adapter
/// runs, or after it settles, takes precedence over its outcome.
#[tracing::instrument(
    skip_all,
    target = "horizon_lattice_dispatch::dispatcher",
    level = "debug",
    fields(method = %config.method_or_default())
)]
pub(crate) async fn dispatch_request(mut config: RequestConfig) -> Result<Response> {
    if let Err(error) = throw_if_cancellation_requested(&config) {
        return Err(with_context(error, &config, None));
    }

    let mut headers = std::mem::take(&mut config.headers.direct);
    let data = config.data.take().unwrap_or_default();
    let data = transform_data(
        &config,
        data,
        &mut headers,
        None,
        config.transform_request.as_deref(),
    );
    config.headers.direct = headers;
    match data {
        Ok(data) => config.data = Some(data),
        Err(error) => return Err(with_context(error, &config, None)),
    }

    let method = config.method_or_default();
    config.method = Some(method);
    config.headers.flatten(method);

    let adapter = match config.adapter.clone() {
        Some(adapter) => adapter,
        None => default_adapter().map_err(|e| with_context(e, &config, None))?,
    };
    let transport = TransportHandle::new(method, config.full_url());

    let mut controller = (config.cancel_token.is_some() || config.signal.is_some()).then(|| {
        CancellationController::attach(
            config.cancel_token.as_ref(),
            config.signal.as_ref(),
            adapter.clone(),
            transport.clone(),
        )
    });

    tracing::debug!(
        target: "horizon_lattice_dispatch::dispatcher",
        id = %transport.id(),
        url = transport.url(),
        "invoking adapter"
    );
    let in_flight = adapter.dispatch(config.clone(), transport.clone());
    let outcome = match controller.as_mut() {
        Some(controller) => tokio::select! {
            biased;
            reason = controller.cancelled() => Err(reason),
            outcome = in_flight => outcome,
        },
        None => in_flight.await,
    };
    // Releases the listeners on both sources
    drop(controller);

    match outcome {
        Ok(mut response) => {
            if let Err(error) = throw_if_cancellation_requested(&config) {
                return Err(with_context(error, &config, Some(&transport)));
            }
            transform_response(&config, &mut response)
                .map_err(|e| with_context(e, &config, Some(&transport)))?;
            Ok(response)
        }
        Err(mut error) => {
            if !error.is_cancel() {
                if let Err(cancelled) = throw_if_cancellation_requested(&config) {
                    return Err(with_context(cancelled, &config, Some(&transport)));
                }
                if let Some(response) = error.response_mut() {
                    transform_response(&config, response)
                        .map_err(|e| with_context(e, &config, Some(&transport)))?;
                }
            }
            tracing::debug!(
                target: "horizon_lattice_dispatch::dispatcher",
                id = %transport.id(),
                code = error.code(),
                "adapter rejected"
            );
            Err(with_context(error, &config, Some(&transport)))
        }
    }
}

fn transform_response(config: &RequestConfig, response: &mut Response) -> Result<()> {
    let data = std::mem::take(&mut response.data);
    let mut headers = std::mem::take(&mut response.headers);
    let data = transform_data(
        config,
        data,
        &mut headers,
        Some(response.status),
        config.transform_response.as_deref(),
    );
    response.headers = headers;
    response.data = data?;
    Ok(())
}

/// Fill in the config and transport an error does not carry yet.
fn with_context(
    mut error: DispatchError,
    config: &RequestConfig,
    transport: Option<&TransportHandle>,
) -> DispatchError {
    if error.config().is_none() {
        error = error.with_config(config.clone());
    }
    if let Some(transport) = transport
        && error.transport().is_none()
    {
        error = error.with_transport(transport.clone());
    }
    error
}
