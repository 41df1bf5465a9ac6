// crates/seig-rpc/src/server.rs
//
// RPC server setup: SeigRpcServer and RpcConfig.
//
// A single tonic unary service accepts JSON-encoded requests with a method
// field, dispatches to the appropriate handler, and returns JSON-encoded
// responses. No proto codegen is involved; tonic provides the transport and
// the interceptor stack.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response};
use http_body::Body as HttpBody;
use http_body_util::{BodyExt, Full};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tonic::body::BoxBody;
use tonic::transport::Server;
use tonic::Status;
use tower_service::Service;

use seig_economics::{StakingEngine, TokenLedger};
use seig_store::EngineStore;

use crate::handlers;
use crate::middleware;

/// Engine shared between the RPC server and the daemon's scheduler.
pub type SharedEngine = Arc<RwLock<StakingEngine<TokenLedger>>>;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50061,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC-style request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The RPC method to invoke (e.g., "staking/deposit", "lottery/end_round").
    pub method: String,
    /// JSON-encoded parameters for the method.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<serde_json::Value>,
    /// Error message (if not success).
    pub error: Option<String>,
}

impl JsonRpcResponse {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// SeigRpcServer
// ---------------------------------------------------------------------------

/// The RPC server for the staking service.
#[derive(Clone)]
pub struct SeigRpcServer {
    config: RpcConfig,
    engine: SharedEngine,
    /// Snapshot store written after every successful mutation.
    store: Option<Arc<EngineStore>>,
    /// Daemon start time for uptime calculation.
    start_time: Option<Instant>,
}

impl fmt::Debug for SeigRpcServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeigRpcServer")
            .field("config", &self.config)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl SeigRpcServer {
    pub fn new(config: RpcConfig, engine: SharedEngine) -> Self {
        Self {
            config,
            engine,
            store: None,
            start_time: None,
        }
    }

    /// Persist the engine through `store` after each mutating call.
    pub fn with_store(mut self, store: Arc<EngineStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the daemon start time for uptime calculation.
    pub fn with_start_time(mut self, st: Instant) -> Self {
        self.start_time = Some(st);
        self
    }

    fn service(&self) -> SeigServiceImpl {
        SeigServiceImpl {
            engine: self.engine.clone(),
            store: self.store.clone(),
            start_time: self.start_time,
        }
    }

    /// Start the RPC server and listen for requests.
    ///
    /// Serves until the process is terminated or the transport fails.
    pub async fn start(&self) -> Result<(), Box<dyn StdError>> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Seig RPC server starting on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                SeigJsonRpcServer::new(self.service()),
                middleware::logging_interceptor,
            ))
            .serve(addr)
            .await?;

        Ok(())
    }

    /// Dispatch one request in-process, bypassing the transport.
    pub async fn call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.service().dispatch(request).await
    }
}

// ---------------------------------------------------------------------------
// Service implementation
// ---------------------------------------------------------------------------

/// Holds shared state and dispatches JSON-RPC calls to handlers.
#[derive(Clone)]
struct SeigServiceImpl {
    engine: SharedEngine,
    store: Option<Arc<EngineStore>>,
    start_time: Option<Instant>,
}

impl SeigServiceImpl {
    /// Dispatch a JSON-RPC request to the appropriate handler based on the method name.
    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let engine = &self.engine;
        let store = self.store.as_ref();
        tracing::debug!("Dispatching {}", request.method);

        let result = match request.method.as_str() {
            // Chains
            "chain/register" => {
                dispatch_handler(request.params, |r| {
                    handlers::chain::handle_register_chain(r, engine, store)
                })
                .await
            }
            "chain/commit" => {
                dispatch_handler(request.params, |r| handlers::chain::handle_commit(r, engine, store))
                    .await
            }
            "chain/info" => {
                dispatch_handler(request.params, |r| handlers::chain::handle_get_chain_info(r, engine))
                    .await
            }
            "chain/list" => {
                dispatch_handler(request.params, |r| handlers::chain::handle_list_chains(r, engine))
                    .await
            }

            // Staking
            "staking/deposit" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_deposit(r, engine, store)
                })
                .await
            }
            "staking/deposit_base" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_deposit_base(r, engine, store)
                })
                .await
            }
            "staking/request_withdrawal" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_request_withdrawal(r, engine, store)
                })
                .await
            }
            "staking/process" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_process_request(r, engine, store)
                })
                .await
            }
            "staking/redeposit" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_redeposit(r, engine, store)
                })
                .await
            }
            "staking/redeposit_multi" => {
                dispatch_handler(request.params, |r| {
                    handlers::staking::handle_redeposit_multi(r, engine, store)
                })
                .await
            }
            "staking/requests" => {
                dispatch_handler(request.params, |r| handlers::staking::handle_get_requests(r, engine))
                    .await
            }
            "staking/stake" => {
                dispatch_handler(request.params, |r| handlers::staking::handle_get_stake(r, engine))
                    .await
            }

            // PowerTON
            "lottery/init" => {
                dispatch_handler(request.params, |r| handlers::lottery::handle_init(r, engine, store))
                    .await
            }
            "lottery/start" => {
                dispatch_handler(request.params, |r| handlers::lottery::handle_start(r, engine, store))
                    .await
            }
            "lottery/end_round" => {
                dispatch_handler(request.params, |r| {
                    handlers::lottery::handle_end_round(r, engine, store)
                })
                .await
            }
            "lottery/power" => {
                dispatch_handler(request.params, |r| handlers::lottery::handle_get_power(r, engine))
                    .await
            }
            "lottery/winner" => {
                dispatch_handler(request.params, |r| handlers::lottery::handle_get_winner(r, engine))
                    .await
            }
            "lottery/round" => {
                dispatch_handler(request.params, |r| handlers::lottery::handle_get_round(r, engine))
                    .await
            }

            // Assets
            "asset/faucet" => {
                dispatch_handler(request.params, |r| handlers::asset::handle_faucet(r, engine, store))
                    .await
            }
            "asset/approve" => {
                dispatch_handler(request.params, |r| handlers::asset::handle_approve(r, engine, store))
                    .await
            }
            "asset/balance" => {
                dispatch_handler(request.params, |r| handlers::asset::handle_get_balance(r, engine))
                    .await
            }

            // Node
            "node/status" => {
                let start_time = self.start_time;
                dispatch_handler(request.params, |r| {
                    handlers::node::handle_get_status(r, engine, store, start_time)
                })
                .await
            }
            "node/catch_up" => {
                dispatch_handler(request.params, |r| handlers::node::handle_catch_up(r, engine, store))
                    .await
            }

            _ => Err(format!("Unknown method: {}", request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                success: true,
                result: Some(value),
                error: None,
            },
            Err(err) => {
                tracing::debug!("RPC {} failed: {}", request.method, err);
                JsonRpcResponse::failure(err)
            }
        }
    }
}

/// Generic dispatch helper: deserialize params into a request type,
/// call the handler, and serialize the result to JSON.
///
/// Absent params are treated as an empty object so parameterless methods
/// accept `{"method": "..."}`.
async fn dispatch_handler<Req, Resp, F, Fut>(
    params: serde_json::Value,
    handler: F,
) -> Result<serde_json::Value, String>
where
    Req: serde::de::DeserializeOwned,
    Resp: serde::Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp, String>>,
{
    let params = if params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        params
    };
    let request: Req = serde_json::from_value(params)
        .map_err(|e| format!("Failed to deserialize request: {}", e))?;
    let response = handler(request).await?;
    serde_json::to_value(response).map_err(|e| format!("Failed to serialize response: {}", e))
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// One service with one method, `Call`. Request and response bodies are raw
// JSON bytes (JsonRpcRequest / JsonRpcResponse).

/// The tonic service wrapper.
#[derive(Clone)]
pub struct SeigJsonRpcServer {
    inner: SeigServiceImpl,
}

impl fmt::Debug for SeigJsonRpcServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeigJsonRpcServer").finish()
    }
}

impl SeigJsonRpcServer {
    fn new(inner: SeigServiceImpl) -> Self {
        Self { inner }
    }
}

impl tonic::server::NamedService for SeigJsonRpcServer {
    const NAME: &'static str = "seig.rpc.SeigService";
}

type BoxError = Box<dyn StdError + Send + Sync>;
type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response<BoxBody>, Infallible>> + Send>>;

impl<B> Service<Request<B>> for SeigJsonRpcServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<BoxError> + Send,
    B::Data: Send,
{
    type Response = Response<BoxBody>;
    type Error = Infallible;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let body = match read_body(req.into_body()).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    return Ok(failure_response(format!("Failed to read request body: {}", e)));
                }
            };
            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body) {
                Ok(r) => r,
                Err(e) => return Ok(failure_response(format!("Invalid JSON-RPC request: {}", e))),
            };

            let rpc_response = inner.dispatch(rpc_request).await;
            Ok(json_response(serde_json::to_vec(&rpc_response).unwrap_or_default()))
        })
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, String>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| e.into().to_string())
}

fn failure_response(message: String) -> Response<BoxBody> {
    let body = serde_json::to_vec(&JsonRpcResponse::failure(message)).unwrap_or_default();
    json_response(body)
}

/// A 200 response carrying `json`.
fn json_response(json: Vec<u8>) -> Response<BoxBody> {
    let body = BoxBody::new(
        Full::new(Bytes::from(json)).map_err(|e| Status::internal(format!("body error: {}", e))),
    );
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::handlers::test_support::{alice, chain, engine_with_clock};

    fn server() -> (SeigRpcServer, seig_core::ManualClock) {
        let (engine, clock) = engine_with_clock();
        (SeigRpcServer::new(RpcConfig::default(), engine), clock)
    }

    async fn call(server: &SeigRpcServer, method: &str, params: serde_json::Value) -> JsonRpcResponse {
        server
            .call(JsonRpcRequest {
                method: method.to_string(),
                params,
            })
            .await
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (server, _clock) = server();
        let resp = call(&server, "staking/teleport", json!({})).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unknown method: staking/teleport"));
    }

    #[tokio::test]
    async fn test_bad_params_are_reported() {
        let (server, _clock) = server();
        let resp = call(&server, "chain/register", json!({ "chain": "0x1234" })).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("Failed to deserialize request"));
    }

    #[tokio::test]
    async fn test_null_params_for_parameterless_method() {
        let (server, _clock) = server();
        let resp = call(&server, "chain/list", serde_json::Value::Null).await;
        assert!(resp.success);
        assert_eq!(resp.result.unwrap()["chains"], json!([]));
    }

    #[tokio::test]
    async fn test_deposit_flow_over_envelope() {
        let (server, clock) = server();
        let chain = chain().to_string();
        let alice = alice().to_string();
        let hundred = (100 * seig_core::WRAPPED_ONE).to_string();

        assert!(call(&server, "chain/register", json!({ "chain": chain })).await.success);
        assert!(
            call(&server, "asset/faucet", json!({ "account": alice, "asset": "wrapped", "amount": hundred }))
                .await
                .success
        );
        assert!(
            call(&server, "asset/approve", json!({ "owner": alice, "amount": hundred }))
                .await
                .success
        );
        let deposit = call(
            &server,
            "staking/deposit",
            json!({ "chain": chain, "staker": alice, "amount": hundred }),
        )
        .await;
        assert!(deposit.success, "{:?}", deposit.error);
        assert_eq!(deposit.result.unwrap()["stake"], json!(hundred));

        clock.advance(1);
        let stake = call(&server, "staking/stake", json!({ "staker": alice })).await;
        let stake: u128 = stake.result.unwrap()["stake"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(101 * seig_core::WRAPPED_ONE - stake <= 1);
    }

    #[test]
    fn test_json_response_sets_content_type() {
        let resp = json_response(b"{}".to_vec());
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
    }

    async fn post(service: &mut SeigJsonRpcServer, body: Vec<u8>) -> JsonRpcResponse {
        let response = service
            .call(Request::new(Full::new(Bytes::from(body))))
            .await
            .unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_http_service_dispatches_json_body() {
        let (server, _clock) = server();
        let mut service = SeigJsonRpcServer::new(server.service());

        let body = serde_json::to_vec(&json!({ "method": "chain/list", "params": null })).unwrap();
        let resp = post(&mut service, body).await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.result.unwrap()["chains"], json!([]));

        let resp = post(&mut service, b"not json".to_vec()).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Invalid JSON-RPC request"));
    }
}
