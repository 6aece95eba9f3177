use crate::config::ApiConfig;
use crate::core::{Block, ChainStatus, Ledger, SharedLedger, Transaction};
use crate::{LedgerError, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone, Serialize)]
pub struct UrlDescription {
    pub url: String,
    pub method: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub ok: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBlockRequest {
    #[serde(default, alias = "Message")]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddTransactionRequest {
    #[serde(alias = "To")]
    pub to: String,
    #[serde(alias = "Amount")]
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceQuery {
    pub total: Option<String>,
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error_message: message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidInput(_)
            | LedgerError::AmountOverflow(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(ledger: SharedLedger, config: ApiConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(config),
        }
    }

    fn read(&self) -> ApiResult<RwLockReadGuard<'_, Ledger>> {
        self.ledger
            .read()
            .map_err(|_| ApiError::Internal("Failed to access ledger".to_string()))
    }

    fn write(&self) -> ApiResult<RwLockWriteGuard<'_, Ledger>> {
        self.ledger
            .write()
            .map_err(|_| ApiError::Internal("Failed to access ledger".to_string()))
    }
}

pub struct RestApi {
    ledger: SharedLedger,
    config: ApiConfig,
}

impl RestApi {
    pub fn new(ledger: SharedLedger, config: ApiConfig) -> Self {
        Self { ledger, config }
    }

    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        log::info!("🚀 Starting REST API on {}", addr);

        let app = create_router(AppState::new(self.ledger, self.config));
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| LedgerError::Api(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("✅ REST API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| LedgerError::Api(format!("Server error: {}", e)))?;

        log::info!("🛑 REST API stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(documentation))
        .route("/status", get(status))
        .route("/blocks", get(get_blocks).post(add_block))
        .route("/blocks/:height", get(get_block))
        .route("/balance/:address", get(get_balance))
        .route("/mempool", get(get_mempool))
        .route("/transactions", post(add_transaction))
        .route("/wallet", get(get_wallet))
        .route("/validate", get(validate_chain))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Parses a `/blocks/{height}` segment. Digit strings too large for `i64`
/// still name a height past the tip, so they are not found rather than bad.
fn parse_height(segment: &str) -> ApiResult<i64> {
    match segment.parse::<i64>() {
        Ok(height) => Ok(height),
        Err(_) if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) => {
            Err(LedgerError::NotFound { height: i64::MAX }.into())
        }
        Err(_) => Err(ApiError::BadRequest(format!("Invalid block height: {}", segment))),
    }
}

// Handler functions

async fn documentation(State(state): State<AppState>) -> Json<Vec<UrlDescription>> {
    let port = state.config.port;
    let describe = |path: &str, method: &str, description: &str, payload: Option<&str>| UrlDescription {
        url: format!("http://localhost:{}{}", port, path),
        method: method.to_string(),
        description: description.to_string(),
        payload: payload.map(str::to_string),
    };

    Json(vec![
        describe("/", "GET", "See Documentation", None),
        describe("/status", "GET", "See the Status of the Ledger", None),
        describe("/blocks", "GET", "See All Blocks", None),
        describe("/blocks", "POST", "Add A Block", Some("message:string")),
        describe("/blocks/{height}", "GET", "See A Block", None),
        describe("/balance/{address}", "GET", "Get Unspent Outputs for an Address (?total=true for the balance)", None),
        describe("/mempool", "GET", "See Pending Transactions", None),
        describe("/transactions", "POST", "Make a Transaction", Some("to:string, amount:int")),
        describe("/wallet", "GET", "See the Node Wallet", None),
        describe("/validate", "GET", "Check Chain Integrity", None),
    ])
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<ChainStatus>> {
    let ledger = state.read()?;
    Ok(Json(ledger.status()))
}

async fn get_blocks(State(state): State<AppState>) -> ApiResult<Json<Vec<Block>>> {
    let ledger = state.read()?;
    Ok(Json(ledger.all_blocks().to_vec()))
}

async fn add_block(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddBlockRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Block>)> {
    // The body is optional: a request without a JSON content type commits an
    // empty message.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => AddBlockRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let block = state.write()?.append_block(request.message);
    log::debug!("Block {} created via API", block.height);

    Ok((StatusCode::CREATED, Json(block)))
}

async fn get_block(
    State(state): State<AppState>,
    Path(height): Path<String>,
) -> ApiResult<Json<Block>> {
    let height = parse_height(&height)?;

    let ledger = state.read()?;
    let block = ledger.block_at(height)?;
    Ok(Json(block.clone()))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Response> {
    let ledger = state.read()?;

    if query.total.as_deref() == Some("true") {
        let balance = ledger.balance_of(&address);
        Ok(Json(BalanceResponse { address, balance }).into_response())
    } else {
        Ok(Json(ledger.unspent_outputs_for(&address)).into_response())
    }
}

async fn get_mempool(State(state): State<AppState>) -> ApiResult<Json<Vec<Transaction>>> {
    let ledger = state.read()?;
    Ok(Json(ledger.mempool().pending().to_vec()))
}

async fn add_transaction(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddTransactionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let Json(request) = payload?;

    let tx = state.write()?.add_transaction(&request.to, request.amount)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn get_wallet(State(state): State<AppState>) -> ApiResult<Json<BalanceResponse>> {
    let ledger = state.read()?;
    let address = ledger.wallet_address().to_string();
    let balance = ledger.balance_of(&address);

    Ok(Json(BalanceResponse { address, balance }))
}

async fn validate_chain(State(state): State<AppState>) -> ApiResult<Json<ValidateResponse>> {
    let errors = state.read()?.verify();
    if !errors.is_empty() {
        log::warn!("⚠️ Chain validation found {} problem(s)", errors.len());
    }

    Ok(Json(ValidateResponse {
        ok: errors.is_empty(),
        errors,
    }))
}
