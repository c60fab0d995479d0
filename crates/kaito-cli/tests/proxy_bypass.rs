//! Local traffic must not follow `HTTP_PROXY`.
//!
//! Kept in its own test binary because it changes process environment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use kaito_cli::endpoint::{AccessClass, Endpoint, EndpointProbe, NetworkProbe};
use kaito_cli::inference::{ChatBackend, InferenceClient};
use kaito_cli::params::GenerationParams;
use kaito_cli::CliError;

async fn serve(router: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    port
}

#[test]
fn local_endpoints_bypass_proxy_environment() {
    // Current-thread runtime: no other threads exist while the environment
    // is modified below.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let proxy_hits = Arc::new(AtomicUsize::new(0));
        let hits = proxy_hits.clone();
        let proxy_port = serve(Router::new().fallback(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            async { (StatusCode::OK, "proxied") }
        }))
        .await;

        let chat_port = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(json!({"choices": [{"message": {"content": "hi"}}]}))
            }),
        ))
        .await;

        let closed_port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            listener.local_addr().expect("addr").port()
        };

        let proxy = format!("http://127.0.0.1:{proxy_port}");
        #[allow(unsafe_code)]
        // SAFETY: single-threaded runtime and the only test in this binary.
        unsafe {
            for key in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"] {
                std::env::set_var(key, &proxy);
            }
            for key in ["NO_PROXY", "no_proxy"] {
                std::env::remove_var(key);
            }
        }

        let probe = NetworkProbe::new().expect("probe");
        assert!(
            !probe
                .responds(&format!("http://localhost:{closed_port}"))
                .await,
            "closed port must not be reported as a port-forward"
        );

        let client = InferenceClient::new().expect("client");
        let params = GenerationParams::default();
        let local = Endpoint::new(
            format!("http://localhost:{chat_port}"),
            AccessClass::LocalPortForward,
        );
        let reply = client
            .send_message(&local, "hello", &params)
            .await
            .expect("direct reply");
        assert_eq!(reply, "hi");
        assert_eq!(proxy_hits.load(Ordering::SeqCst), 0);

        // Cluster DNS names still follow the proxy settings.
        let internal = Endpoint::new(
            "http://llama.default.svc.cluster.local:80",
            AccessClass::ClusterInternal,
        );
        let err = client
            .send_message(&internal, "hello", &params)
            .await
            .expect_err("proxy body is not a completion");
        assert!(matches!(err, CliError::ResponseFormat(_)), "{err}");
        assert_eq!(proxy_hits.load(Ordering::SeqCst), 1);
    });
}
