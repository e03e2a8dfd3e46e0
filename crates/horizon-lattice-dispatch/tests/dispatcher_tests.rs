//! Integration tests for the request pipeline.

mod common;

use std::sync::Arc;

use common::RecordingAdapter;
use horizon_lattice_dispatch::defaults::default_config;
use horizon_lattice_dispatch::{
    AbortSignal, Body, DispatchError, Dispatcher, ErrorKind, Interceptor, Method, RequestConfig,
    Response, TransitionalOptions,
};
use parking_lot::Mutex;

fn dispatcher_with(adapter: &RecordingAdapter) -> Dispatcher {
    Dispatcher::new(
        default_config()
            .base_url("https://api.test")
            .adapter(adapter.clone()),
    )
}

#[tokio::test]
async fn test_base_url_merge() {
    let adapter = RecordingAdapter::default();
    let dispatcher = Dispatcher::new(
        RequestConfig::new()
            .base_url("https://api.test")
            .adapter(adapter.clone()),
    );

    dispatcher
        .request_with("/users", RequestConfig::new().method(Method::Get))
        .await
        .expect("request failed");

    assert_eq!(adapter.calls(), 1);
    assert_eq!(adapter.urls(), vec!["https://api.test/users".to_string()]);

    let config = adapter.last_config().unwrap();
    assert_eq!(config.method, Some(Method::Get));
    assert_eq!(config.url.as_deref(), Some("/users"));
    assert_eq!(config.base_url.as_deref(), Some("https://api.test"));
}

#[tokio::test]
async fn test_json_response_is_parsed() {
    let adapter = RecordingAdapter::new(200, r#"{"id":7,"name":"Ada"}"#);
    let dispatcher = dispatcher_with(&adapter);

    let response = dispatcher.get("/users/7").send().await.unwrap();
    let data = response.data.as_json().expect("JSON body");
    assert_eq!(data["name"], "Ada");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_rejected_status_carries_transformed_response() {
    let adapter = RecordingAdapter::new(404, r#"{"error":"missing"}"#);
    let dispatcher = dispatcher_with(&adapter);

    let error = dispatcher.get("/users/0").send().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadRequest);
    assert_eq!(error.message(), "Request failed with status code 404");

    let response = error.response().expect("partial response");
    assert_eq!(response.status, 404);
    assert_eq!(response.data.as_json().unwrap()["error"], "missing");
}

#[tokio::test]
async fn test_post_json_body() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);

    let body = Body::json(&serde_json::json!({"name": "John"})).unwrap();
    dispatcher.post("/users", body).send().await.unwrap();

    let config = adapter.last_config().unwrap();
    assert_eq!(config.method, Some(Method::Post));
    assert_eq!(config.data, Some(Body::Text(r#"{"name":"John"}"#.to_string())));
    assert_eq!(config.headers.get("content-type"), Some("application/json"));
    assert_eq!(
        config.headers.get("accept"),
        Some("application/json, text/plain, */*")
    );
}

#[tokio::test]
async fn test_request_interceptors_run_most_recent_first() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let log = log.clone();
        dispatcher.interceptors.request.register(
            Interceptor::new()
                .on_fulfilled(move |config: RequestConfig| {
                    log.lock().push(tag);
                    Ok(config.header("x-last-interceptor", tag))
                })
                .synchronous(true),
        );
    }

    dispatcher.get("/").send().await.unwrap();
    assert_eq!(*log.lock(), vec!["third", "second", "first"]);
    assert_eq!(
        adapter.last_config().unwrap().headers.get("x-last-interceptor"),
        Some("first")
    );
}

#[tokio::test]
async fn test_response_interceptors_run_in_registration_order() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in ["A", "B"] {
        let log = log.clone();
        dispatcher
            .interceptors
            .response
            .register(Interceptor::new().on_fulfilled(move |response: Response| {
                log.lock().push(tag);
                Ok(response)
            }));
    }

    dispatcher.get("/").send().await.unwrap();
    assert_eq!(*log.lock(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_response_error_skips_to_next_rejected_handler() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    let b_fulfilled = Arc::new(Mutex::new(false));
    let b_saw = Arc::new(Mutex::new(None));

    dispatcher.interceptors.response.register(
        Interceptor::new().on_fulfilled(|_: Response| {
            Err(DispatchError::new(ErrorKind::BadResponse, "A failed"))
        }),
    );
    {
        let b_fulfilled = b_fulfilled.clone();
        let b_saw = b_saw.clone();
        dispatcher.interceptors.response.register(
            Interceptor::new()
                .on_fulfilled(move |response: Response| {
                    *b_fulfilled.lock() = true;
                    Ok(response)
                })
                .on_rejected(move |error: DispatchError| {
                    *b_saw.lock() = Some(error.message().to_string());
                    Err(error)
                }),
        );
    }

    let error = dispatcher.get("/").send().await.unwrap_err();
    assert_eq!(error.message(), "A failed");
    assert!(!*b_fulfilled.lock());
    assert_eq!(b_saw.lock().as_deref(), Some("A failed"));
}

#[tokio::test]
async fn test_response_rejected_handler_can_recover() {
    let adapter = RecordingAdapter::new(500, "boom");
    let dispatcher = dispatcher_with(&adapter);

    dispatcher
        .interceptors
        .response
        .register(Interceptor::new().on_rejected(|mut error: DispatchError| {
            match error.take_response() {
                Some(mut response) => {
                    response.data = Body::from("fallback");
                    Ok(response)
                }
                None => Err(error),
            }
        }));

    let response = dispatcher.get("/").send().await.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.data.as_text(), Some("fallback"));
}

fn failing_interceptor(synchronous: bool) -> Interceptor<RequestConfig> {
    Interceptor::new()
        .on_fulfilled(|_: RequestConfig| Err(DispatchError::new(ErrorKind::BadRequest, "no token")))
        .synchronous(synchronous)
}

fn record_rejections(dispatcher: &Dispatcher) -> Arc<Mutex<Option<&'static str>>> {
    let seen = Arc::new(Mutex::new(None));
    let recorder = seen.clone();
    dispatcher
        .interceptors
        .response
        .register(Interceptor::new().on_rejected(move |error: DispatchError| {
            *recorder.lock() = Some(error.code());
            Err(error)
        }));
    seen
}

#[tokio::test]
async fn test_request_interceptor_error_reaches_response_handlers() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    dispatcher.interceptors.request.register(failing_interceptor(false));
    let seen = record_rejections(&dispatcher);

    let error = dispatcher.get("/").send().await.unwrap_err();
    assert_eq!(error.message(), "no token");
    assert_eq!(*seen.lock(), Some("ERR_BAD_REQUEST"));
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_synchronous_request_interceptor_error_rejects_directly() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    dispatcher.interceptors.request.register(failing_interceptor(true));
    let seen = record_rejections(&dispatcher);

    let error = dispatcher.get("/").send().await.unwrap_err();
    assert_eq!(error.message(), "no token");
    assert_eq!(*seen.lock(), None);
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_already_aborted_signal_never_reaches_adapter() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);

    let error = dispatcher
        .get("/")
        .signal(AbortSignal::already_aborted())
        .send()
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Canceled);
    assert!(error.is_cancel());
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_invalid_transitional_fails_before_interceptors() {
    let adapter = RecordingAdapter::default();
    let dispatcher = dispatcher_with(&adapter);
    let ran = Arc::new(Mutex::new(false));
    {
        let ran = ran.clone();
        dispatcher.interceptors.request.register(
            Interceptor::new().on_fulfilled(move |config: RequestConfig| {
                *ran.lock() = true;
                Ok(config)
            }),
        );
    }

    let options = TransitionalOptions::new().set("strictParsing", true);
    let error = dispatcher
        .request(RequestConfig::from("/").transitional(options))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::BadOption);
    assert_eq!(error.message(), "Unknown option strictParsing");
    assert!(!*ran.lock());
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn test_strict_json_parsing_rejects_bad_payload() {
    let adapter = RecordingAdapter::new(200, "not json");
    let dispatcher = dispatcher_with(&adapter);

    let lenient = dispatcher.get("/").send().await.unwrap();
    assert_eq!(lenient.data.as_text(), Some("not json"));

    let strict = TransitionalOptions::new().set("silentJSONParsing", false);
    let error = dispatcher
        .get("/")
        .config(RequestConfig::new().transitional(strict))
        .send()
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadResponse);
}

#[tokio::test]
async fn test_created_instance_inherits_defaults() {
    let adapter = RecordingAdapter::default();
    let parent = dispatcher_with(&adapter);
    let child = parent.create(&RequestConfig::new().base_url("https://v2.api.test"));

    child.delete("/sessions/1").send().await.unwrap();
    assert_eq!(adapter.urls(), vec!["https://v2.api.test/sessions/1".to_string()]);
    assert_eq!(adapter.last_config().unwrap().method, Some(Method::Delete));
}

#[tokio::test]
async fn test_get_uri_includes_params() {
    let dispatcher = Dispatcher::new(RequestConfig::new().base_url("https://api.test/"));
    let uri = dispatcher.get_uri(
        RequestConfig::from("search")
            .param("q", "rust lang")
            .param("tags", "a,b"),
    );
    assert_eq!(uri, "https://api.test/search?q=rust+lang&tags=a,b");
}
