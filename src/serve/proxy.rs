// src/serve/proxy.rs

//! Live-reload reverse proxy.
//!
//! Every request is forwarded to the upstream app server. HTML responses
//! get the client script tag injected; the proxy itself serves the client
//! script and the WebSocket that pushes [`ReloadMessage`]s.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::header::{
    ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use reqwest::redirect::Policy;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::serve::livereload::{
    CLIENT_SCRIPT_PATH, LIVERELOAD_PATH, LiveReloadHub, ReloadMessage, client_script,
    inject_client_tag,
};

const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

#[derive(Clone)]
struct ProxyState {
    client: reqwest::Client,
    upstream: Url,
    hub: LiveReloadHub,
}

/// Bind the proxy listener on localhost. Port 0 picks a free port.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding live-reload proxy on {addr}"))?;
    Ok(listener)
}

/// Routes of the proxy: the live-reload endpoints, everything else upstream.
pub fn router(upstream: &str, hub: LiveReloadHub) -> Result<Router> {
    let upstream = Url::parse(upstream)
        .map_err(|e| PipelineError::ConfigError(format!("[serve].upstream: {e}")))?;
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .context("building proxy HTTP client")?;

    let state = ProxyState {
        client,
        upstream,
        hub,
    };

    Ok(Router::new()
        .route(LIVERELOAD_PATH, get(livereload_socket))
        .route(CLIENT_SCRIPT_PATH, get(client_js))
        .fallback(forward)
        .with_state(state))
}

/// Serve until the listener fails or the task is aborted.
pub async fn serve_proxy(listener: TcpListener, app: Router) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("live-reload proxy on http://{addr}");
    }
    axum::serve(listener, app)
        .await
        .context("live-reload proxy stopped")?;
    Ok(())
}

async fn client_js() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/javascript; charset=utf-8")],
        client_script(),
    )
}

async fn forward(State(state): State<ProxyState>, req: Request) -> Response {
    match forward_request(&state, req).await {
        Ok(response) => response,
        Err(err) => {
            warn!("proxy request failed: {err:#}");
            (
                StatusCode::BAD_GATEWAY,
                format!("assetpipe: upstream {} unavailable: {err}", state.upstream),
            )
                .into_response()
        }
    }
}

async fn forward_request(state: &ProxyState, req: Request) -> anyhow::Result<Response> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = state
        .upstream
        .join(path_and_query)
        .with_context(|| format!("joining {path_and_query} onto upstream"))?;
    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .context("reading request body")?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(HOST);
    // Identity encoding keeps HTML injectable.
    headers.remove(ACCEPT_ENCODING);

    debug!(method = %parts.method, %url, "forwarding");
    let upstream = state
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let is_html = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    let bytes = upstream.bytes().await.context("reading upstream body")?;

    let body = if is_html {
        headers.remove(CONTENT_LENGTH);
        Body::from(inject_client_tag(&String::from_utf8_lossy(&bytes)))
    } else {
        Body::from(bytes)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    const HOP_BY_HOP: [HeaderName; 8] = [
        CONNECTION,
        HeaderName::from_static("keep-alive"),
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
    ];
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

async fn livereload_socket(ws: WebSocketUpgrade, State(state): State<ProxyState>) -> Response {
    ws.on_upgrade(move |socket| relay(socket, state.hub))
}

async fn relay(socket: WebSocket, hub: LiveReloadHub) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();
    debug!(clients = hub.subscriber_count(), "live-reload client connected");

    if send_message(&mut sender, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    let outgoing = async {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if send_message(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live-reload client lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    let incoming = async {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    };

    tokio::select! {
        _ = outgoing => {},
        _ = incoming => {},
    }
    debug!("live-reload client disconnected");
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ReloadMessage,
) -> std::result::Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|e| {
        warn!("failed to encode live-reload message: {e}");
    })?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
