//! # HTTP API
//!
//! The axum router in front of a vault deployment. Reads are plain REST;
//! state-changing calls go through a JSON-RPC 2.0 gateway. Callers are
//! assumed to be authenticated upstream: the `caller` parameter is taken
//! at face value.
//!
//! ## Endpoints
//!
//! | Method | Path                                   | Description                        |
//! |--------|----------------------------------------|------------------------------------|
//! | GET    | `/health`                              | Liveness probe                     |
//! | GET    | `/vaults`                              | Every vault with its live numbers  |
//! | GET    | `/vaults/:id`                          | One vault                          |
//! | GET    | `/vaults/:id/balances/:principal`      | Share balance of a holder          |
//! | GET    | `/vaults/:id/preview-withdraw/:shares` | Gross, fee, and net for a redeem   |
//! | GET    | `/vaults/:id/strategies/:address`      | Whitelist status and allocation    |
//! | GET    | `/registry`                            | Strategy manager view              |
//! | POST   | `/rpc`                                 | JSON-RPC 2.0 gateway               |
//!
//! Engine errors are returned as JSON-RPC errors whose `code` is the
//! engine's stable error code (401, 403, ...) and whose `data.kind` is the
//! error name.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use snp_engine::clock::{BlockClock, ManualClock};
use snp_engine::registry::StrategyRecord;
use snp_engine::transfer::MemoryAssetLedger;
use snp_engine::{
    Amount, Deployment, Principal, Vault, VaultError, VaultInfo, VaultResult, VaultTier,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Reported version string.
    pub version: String,
    /// The vaults being served.
    pub deployment: Arc<Deployment>,
    /// The node's block clock, advanced by the block ticker.
    pub clock: Arc<ManualClock>,
    /// Simulated wallets backing deposits and payouts.
    pub ledger: Arc<MemoryAssetLedger>,
    /// Enables the `devnet_*` RPC methods.
    pub devnet: bool,
    /// Prometheus handles.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/vaults", get(vaults_handler))
        .route("/vaults/:id", get(vault_handler))
        .route("/vaults/:id/balances/:principal", get(balance_handler))
        .route("/vaults/:id/preview-withdraw/:shares", get(preview_handler))
        .route("/vaults/:id/strategies/:address", get(strategy_handler))
        .route("/registry", get(registry_handler))
        .route("/rpc", post(rpc_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Named parameters.
    pub params: Option<Value>,
    /// Request identifier, echoed back.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Engine error code, or a JSON-RPC protocol code (-32xxx).
    pub code: i32,
    /// Human-readable description.
    pub message: String,
    /// Structured detail; `{"kind": "ERR-..."}` for engine errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn protocol(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&VaultError> for JsonRpcError {
    fn from(err: &VaultError) -> Self {
        Self {
            code: err.code() as i32,
            message: err.to_string(),
            data: Some(json!({ "kind": err.kind() })),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub block_height: u64,
    pub vaults: usize,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// One vault, as returned by `/vaults` and `/vaults/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultResponse {
    pub id: String,
    pub tier: VaultTier,
    pub owner: Principal,
    pub performance_fee_bps: u16,
    pub idle_balance: Amount,
    pub accrued_fees: Amount,
    pub active_strategy: Option<Principal>,
    pub info: VaultInfo,
}

/// `GET /vaults/:id/balances/:principal`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub vault: String,
    pub principal: Principal,
    pub shares: Amount,
}

/// `GET /vaults/:id/strategies/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StrategyResponse {
    pub vault: String,
    pub strategy: Principal,
    pub whitelisted: bool,
    pub active: bool,
    pub allocation: Amount,
}

/// `GET /registry`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub strategy_manager: String,
    /// Vault the strategy manager is bound to.
    pub managed_vault: Option<String>,
    /// Distinct strategy addresses ever registered.
    pub strategy_count: usize,
    pub strategies: Vec<StrategyRecord>,
}

/// Error body for REST endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// REST Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
        block_height: state.clock.block_height(),
        vaults: state.deployment.vaults().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn describe(vault: &Vault) -> VaultResult<VaultResponse> {
    Ok(VaultResponse {
        id: vault.id().clone(),
        tier: vault.config().tier,
        owner: vault.get_owner().await,
        performance_fee_bps: vault.get_performance_fee().await,
        idle_balance: vault.get_idle_balance().await?,
        accrued_fees: vault.get_accrued_fees().await,
        active_strategy: vault.get_active_strategy().await,
        info: vault.get_vault_info().await?,
    })
}

fn lookup(state: &AppState, id: &str) -> Result<Arc<Vault>, Response> {
    state
        .deployment
        .vault(id)
        .cloned()
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Vault not found: {}", id)))
}

/// `GET /vaults` — every vault in deployment order.
async fn vaults_handler(State(state): State<AppState>) -> Response {
    let mut vaults = Vec::with_capacity(state.deployment.vaults().len());
    for vault in state.deployment.vaults() {
        match describe(vault).await {
            Ok(v) => vaults.push(v),
            Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
    Json(vaults).into_response()
}

/// `GET /vaults/:id`.
async fn vault_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let vault = match lookup(&state, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match describe(&vault).await {
        Ok(v) => Json(v).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /vaults/:id/balances/:principal`.
async fn balance_handler(
    Path((id, principal)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let vault = match lookup(&state, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let principal = Principal::new(principal);
    let shares = vault.get_balance_of(&principal).await;
    Json(BalanceResponse {
        vault: id,
        principal,
        shares,
    })
    .into_response()
}

/// `GET /vaults/:id/preview-withdraw/:shares`.
async fn preview_handler(
    Path((id, shares)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let vault = match lookup(&state, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Ok(shares) = shares.parse::<Amount>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid share amount: {}", shares),
        );
    };
    match vault.preview_withdraw(shares).await {
        Ok(preview) => Json(preview).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// `GET /vaults/:id/strategies/:address`.
async fn strategy_handler(
    Path((id, address)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let vault = match lookup(&state, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let strategy = Principal::new(address);
    let response = StrategyResponse {
        whitelisted: vault.is_strategy_whitelisted(&strategy).await,
        active: vault.get_active_strategy().await.as_ref() == Some(&strategy),
        allocation: vault.get_strategy_allocation(&strategy).await,
        vault: id,
        strategy,
    };
    Json(response).into_response()
}

/// `GET /registry`.
async fn registry_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.deployment.registry();
    let manager = state.deployment.config().strategy_manager_id.clone();
    Json(RegistryResponse {
        managed_vault: registry.get_vault(&manager),
        strategy_manager: manager,
        strategy_count: registry.get_strategy_count(),
        strategies: registry.records(),
    })
}

// ---------------------------------------------------------------------------
// JSON-RPC Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DepositParams {
    vault: String,
    caller: Principal,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct WithdrawParams {
    vault: String,
    caller: Principal,
    shares: Amount,
    #[serde(default)]
    min_assets_out: Amount,
    deadline: u64,
}

#[derive(Debug, Deserialize)]
struct AdminParams {
    vault: String,
    caller: Principal,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WhitelistParams {
    vault: String,
    caller: Principal,
    strategy: Principal,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct StrategyParams {
    vault: String,
    caller: Principal,
    strategy: Principal,
}

#[derive(Debug, Deserialize)]
struct StrategyAmountParams {
    vault: String,
    caller: Principal,
    strategy: Principal,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct FeeParams {
    vault: String,
    caller: Principal,
    fee_bps: u16,
}

#[derive(Debug, Deserialize)]
struct CollectParams {
    vault: String,
    caller: Principal,
    recipient: Principal,
}

#[derive(Debug, Deserialize)]
struct OwnerParams {
    vault: String,
    caller: Principal,
    new_owner: Principal,
}

#[derive(Debug, Deserialize)]
struct FundParams {
    principal: Principal,
    amount: Amount,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or(Value::Null);
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::protocol(-32602, format!("Invalid params: {}", e)))
}

fn rpc_vault(state: &AppState, id: &str) -> Result<Arc<Vault>, JsonRpcError> {
    state
        .deployment
        .vault(id)
        .cloned()
        .ok_or_else(|| JsonRpcError::protocol(-32001, format!("Vault not found: {}", id)))
}

/// Records the outcome and maps it onto the JSON-RPC result.
fn finish<T: Serialize>(
    state: &AppState,
    vault: &str,
    operation: &str,
    outcome: VaultResult<T>,
) -> Result<Value, JsonRpcError> {
    state.metrics.record(vault, operation, &outcome);
    match outcome {
        Ok(value) => serde_json::to_value(value)
            .map_err(|e| JsonRpcError::protocol(-32603, format!("Internal error: {}", e))),
        Err(e) => Err(JsonRpcError::from(&e)),
    }
}

async fn dispatch(
    state: &AppState,
    method: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    match method {
        "vault_deposit" => {
            let p: DepositParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.deposit(&p.caller, p.amount).await;
            finish(state, &p.vault, "deposit", out)
        }
        "vault_withdraw" => {
            let p: WithdrawParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault
                .withdraw(&p.caller, p.shares, p.min_assets_out, p.deadline)
                .await;
            finish(state, &p.vault, "withdraw", out)
        }
        "vault_pause" => {
            let p: AdminParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.pause(&p.caller).await;
            finish(state, &p.vault, "pause", out)
        }
        "vault_resume" => {
            let p: AdminParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.resume(&p.caller).await;
            finish(state, &p.vault, "resume", out)
        }
        "vault_whitelistStrategy" => {
            let p: WhitelistParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault
                .whitelist_strategy(&p.caller, &p.strategy, p.enabled)
                .await;
            finish(state, &p.vault, "whitelist_strategy", out)
        }
        "vault_setActiveStrategy" => {
            let p: StrategyParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.set_active_strategy(&p.caller, &p.strategy).await;
            finish(state, &p.vault, "set_active_strategy", out)
        }
        "vault_allocate" => {
            let p: StrategyAmountParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault
                .allocate_to_strategy(&p.caller, &p.strategy, p.amount)
                .await;
            finish(state, &p.vault, "allocate", out)
        }
        "vault_harvest" => {
            let p: StrategyParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.harvest_strategy(&p.caller, &p.strategy).await;
            finish(state, &p.vault, "harvest", out)
        }
        "vault_emergencyWithdraw" => {
            let p: StrategyAmountParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault
                .emergency_withdraw_from_strategy(&p.caller, &p.strategy, p.amount)
                .await;
            finish(state, &p.vault, "emergency_withdraw", out)
        }
        "vault_setPerformanceFee" => {
            let p: FeeParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.set_performance_fee(&p.caller, p.fee_bps).await;
            finish(state, &p.vault, "set_performance_fee", out)
        }
        "vault_collectFees" => {
            let p: CollectParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.collect_fees(&p.caller, &p.recipient).await;
            finish(state, &p.vault, "collect_fees", out)
        }
        "vault_transferOwner" => {
            let p: OwnerParams = parse_params(params)?;
            let vault = rpc_vault(state, &p.vault)?;
            let out = vault.transfer_owner(&p.caller, p.new_owner).await;
            finish(state, &p.vault, "transfer_owner", out)
        }
        "devnet_fund" if state.devnet => {
            let p: FundParams = parse_params(params)?;
            state.ledger.fund(&p.principal, p.amount);
            tracing::info!(principal = %p.principal, amount = p.amount, "devnet wallet funded");
            Ok(json!(state.ledger.balance_of(&p.principal)))
        }
        _ => Err(JsonRpcError::protocol(
            -32601,
            format!("Method not found: {}", method),
        )),
    }
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::protocol(
                -32600,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params).await {
        Ok(value) => (Some(value), None),
        Err(e) => {
            tracing::debug!(method = %req.method, code = e.code, "rpc call rejected: {}", e.message);
            (None, Some(e))
        }
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use snp_engine::config::SCALE;
    use snp_engine::{DeploymentConfig, WithdrawPreview};
    use tower::ServiceExt;

    const OWNER: &str = "ST1OWNER";
    const ALICE: &str = "ST2ALICE";
    const STACKING: &str = "strategy-stx-stacking";

    /// AppState over a fresh three-tier deployment, alice funded.
    fn test_app_state() -> AppState {
        let clock = Arc::new(ManualClock::new(100));
        let ledger = Arc::new(MemoryAssetLedger::new());
        ledger.fund(&Principal::from(ALICE), 100_000 * SCALE);
        let mut config = DeploymentConfig::three_tier(Principal::from(OWNER));
        config.strategies = vec![Principal::from(STACKING)];
        let deployment =
            Deployment::from_config(config, ledger.clone(), clock.clone()).expect("deployment");
        AppState {
            version: "0.1.0-test".into(),
            deployment: Arc::new(deployment),
            clock,
            ledger,
            devnet: true,
            metrics: Arc::new(crate::metrics::NodeMetrics::new().expect("metrics")),
        }
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn deposit(router: &Router, vault: &str, amount: Amount) -> JsonRpcResponse {
        rpc(
            router,
            "vault_deposit",
            json!({ "vault": vault, "caller": ALICE, "amount": amount as u64 }),
        )
        .await
    }

    // -- Reads ---------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let resp: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.block_height, 100);
        assert_eq!(resp.vaults, 3);
    }

    #[tokio::test]
    async fn vaults_endpoint_lists_three_tiers() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/vaults").await;

        assert_eq!(status, StatusCode::OK);
        let vaults: Vec<VaultResponse> = serde_json::from_slice(&body).unwrap();
        let symbols: Vec<_> = vaults.iter().map(|v| v.info.symbol.as_str()).collect();
        assert_eq!(symbols, ["snSTX-CONS", "snSTX-BAL", "snSTX-GRTH"]);
        assert!(vaults.iter().all(|v| !v.info.initialized));
    }

    #[tokio::test]
    async fn unknown_vault_returns_404() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/vaults/vault-nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("not found"));
    }

    #[tokio::test]
    async fn deposit_then_preview_matches_growth_scenario() {
        let router = create_router(test_app_state());
        let resp = deposit(&router, "vault-growth", 1_000 * SCALE).await;
        assert!(resp.error.is_none(), "{:?}", resp.error);
        assert_eq!(resp.result, Some(json!(1_000_000_000u64)));

        let (status, body) = get(&router, "/vaults/vault-growth/preview-withdraw/1000000000").await;
        assert_eq!(status, StatusCode::OK);
        let preview: WithdrawPreview = serde_json::from_slice(&body).unwrap();
        assert_eq!(preview.gross, 1_000_000_000);
        assert_eq!(preview.fee, 80_000_000);
        assert_eq!(preview.net, 920_000_000);
        assert_eq!(preview.current_block, 100);

        let (_, body) = get(&router, &format!("/vaults/vault-growth/balances/{}", ALICE)).await;
        let balance: BalanceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(balance.shares, 1_000_000_000);
    }

    #[tokio::test]
    async fn preview_rejects_malformed_shares() {
        let router = create_router(test_app_state());
        let (status, _) = get(&router, "/vaults/vault-growth/preview-withdraw/lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -- JSON-RPC ------------------------------------------------------------

    #[tokio::test]
    async fn engine_errors_surface_with_their_codes() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "vault_pause",
            json!({ "vault": "vault-stx-v2", "caller": ALICE }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, 401);
        assert_eq!(err.data.unwrap()["kind"], "ERR-NOT-AUTHORIZED");

        rpc(&router, "vault_pause", json!({ "vault": "vault-stx-v2", "caller": OWNER })).await;
        let resp = deposit(&router, "vault-stx-v2", 1_000 * SCALE).await;
        assert_eq!(resp.error.unwrap().code, 403);
    }

    #[tokio::test]
    async fn withdraw_round_trip_over_rpc() {
        let state = test_app_state();
        let ledger = state.ledger.clone();
        let router = create_router(state);
        deposit(&router, "vault-conservative", 1_000 * SCALE).await;

        let resp = rpc(
            &router,
            "vault_withdraw",
            json!({
                "vault": "vault-conservative",
                "caller": ALICE,
                "shares": 1_000_000_000u64,
                "deadline": 150
            }),
        )
        .await;
        assert_eq!(resp.result, Some(json!(999_999_000u64)));
        assert_eq!(
            ledger.balance_of(&Principal::from(ALICE)),
            100_000 * SCALE - 1_000
        );
    }

    #[tokio::test]
    async fn strategy_lifecycle_over_rpc() {
        let state = test_app_state();
        let deployment = state.deployment.clone();
        let router = create_router(state);
        deposit(&router, "vault-growth", 1_000 * SCALE).await;

        let resp = rpc(
            &router,
            "vault_whitelistStrategy",
            json!({ "vault": "vault-growth", "caller": OWNER, "strategy": STACKING }),
        )
        .await;
        assert!(resp.error.is_none());

        let resp = rpc(
            &router,
            "vault_allocate",
            json!({ "vault": "vault-growth", "caller": OWNER, "strategy": STACKING, "amount": 400_000_000u64 }),
        )
        .await;
        assert!(resp.error.is_none(), "{:?}", resp.error);

        let (_, body) = get(&router, &format!("/vaults/vault-growth/strategies/{}", STACKING)).await;
        let strategy: StrategyResponse = serde_json::from_slice(&body).unwrap();
        assert!(strategy.whitelisted);
        assert_eq!(strategy.allocation, 400_000_000);

        deployment
            .memory_strategy("vault-growth", &Principal::from(STACKING))
            .unwrap()
            .accrue(10_000_000);
        let resp = rpc(
            &router,
            "vault_harvest",
            json!({ "vault": "vault-growth", "caller": OWNER, "strategy": STACKING }),
        )
        .await;
        assert_eq!(resp.result, Some(json!(9_200_000u64)));

        let resp = rpc(
            &router,
            "vault_emergencyWithdraw",
            json!({ "vault": "vault-growth", "caller": OWNER, "strategy": STACKING, "amount": 400_000_000u64 }),
        )
        .await;
        assert!(resp.error.is_none());

        let (_, body) = get(&router, "/registry").await;
        let registry: RegistryResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(registry.strategy_count, 1);
        assert_eq!(registry.managed_vault.as_deref(), Some("vault-stx-v2"));
    }

    #[tokio::test]
    async fn failed_harvest_is_counted() {
        let state = test_app_state();
        let deployment = state.deployment.clone();
        let metrics = state.metrics.clone();
        let router = create_router(state);
        rpc(
            &router,
            "vault_whitelistStrategy",
            json!({ "vault": "vault-stx-v2", "caller": OWNER, "strategy": STACKING }),
        )
        .await;
        deployment
            .memory_strategy("vault-stx-v2", &Principal::from(STACKING))
            .unwrap()
            .set_failing(Some("offline"));

        let resp = rpc(
            &router,
            "vault_harvest",
            json!({ "vault": "vault-stx-v2", "caller": OWNER, "strategy": STACKING }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, 412);
        assert_eq!(
            metrics
                .harvest_failures_total
                .with_label_values(&["vault-stx-v2"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn protocol_errors() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "vault_teleport", json!({})).await;
        assert_eq!(resp.error.unwrap().code, -32601);

        let resp = rpc(&router, "vault_deposit", json!({ "vault": "vault-growth" })).await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = rpc(
            &router,
            "vault_deposit",
            json!({ "vault": "vault-nope", "caller": ALICE, "amount": 1 }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32001);
    }

    #[tokio::test]
    async fn devnet_fund_credits_wallet() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "devnet_fund",
            json!({ "principal": "ST3BOB", "amount": 5_000_000u64 }),
        )
        .await;
        assert_eq!(resp.result, Some(json!(5_000_000u64)));
    }

    #[tokio::test]
    async fn devnet_fund_is_unknown_outside_devnet() {
        let mut state = test_app_state();
        state.devnet = false;
        let ledger = state.ledger.clone();
        let router = create_router(state);
        let resp = rpc(
            &router,
            "devnet_fund",
            json!({ "principal": "ST3BOB", "amount": 5_000_000u64 }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32601);
        assert_eq!(ledger.balance_of(&Principal::from("ST3BOB")), 0);
    }
}
