use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use gate_core::{count_tokens_handler, list_models_handler, proxy_handler, AuthProvider, ProxyEngine};

/// Shared state backing the proxy router: the handler pulls both pieces out
/// via `FromRef`, so either can be swapped (a different `AuthProvider`, a
/// rebuilt `ProxyEngine`) without touching route wiring.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ProxyEngine>,
    pub auth: Arc<dyn AuthProvider>,
}

impl FromRef<GatewayState> for Arc<ProxyEngine> {
    fn from_ref(state: &GatewayState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<GatewayState> for Arc<dyn AuthProvider> {
    fn from_ref(state: &GatewayState) -> Self {
        state.auth.clone()
    }
}

/// The wire-family endpoints of the gateway surface, each registered both
/// bare and under a `/{platform}/...` prefix; classification of the path
/// and body (`classify_request`) determines the family and any forced
/// platform, not the route match itself, so every forwarding route shares
/// one handler function.
pub fn gateway_router(engine: Arc<ProxyEngine>, auth: Arc<dyn AuthProvider>) -> Router {
    let state = GatewayState { engine, auth };

    Router::new()
        .route("/v1/messages", post(proxy_handler))
        .route("/v1/messages/count_tokens", post(count_tokens_handler))
        .route("/v1/chat/completions", post(proxy_handler))
        .route("/v1/responses", post(proxy_handler))
        .route("/v1beta/models/{*rest}", post(proxy_handler))
        .route("/v1/models", get(list_models_handler))
        .route("/{platform}/v1/messages", post(proxy_handler))
        .route(
            "/{platform}/v1/messages/count_tokens",
            post(count_tokens_handler),
        )
        .route("/{platform}/v1/chat/completions", post(proxy_handler))
        .route("/{platform}/v1/responses", post(proxy_handler))
        .route("/{platform}/v1beta/models/{*rest}", post(proxy_handler))
        .route("/{platform}/v1/models", get(list_models_handler))
        .with_state(state)
}
