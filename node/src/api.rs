//! # REST API
//!
//! Builds the axum router over an in-memory lending deployment. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                          |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/health`                | Liveness probe                       |
//! | GET    | `/status`                | Book and reserve summary             |
//! | POST   | `/loans`                 | Open a loan against a collateral asset |
//! | GET    | `/loans/:id`             | Loan snapshot                        |
//! | GET    | `/loans/:id/interest`    | Interest owed as of now              |
//! | POST   | `/loans/:id/repay`       | Repay principal + interest           |
//! | POST   | `/loans/:id/interest`    | Partial interest payment             |
//! | POST   | `/loans/:id/liquidate`   | Liquidate an overdue loan            |
//! | GET    | `/accounts/:account`     | Balances, held assets, loans         |
//! | GET    | `/events`                | Loan event journal                   |
//! | POST   | `/assets`                | Devnet: mint a collateral asset      |
//! | POST   | `/faucet`                | Devnet: mint reward units            |
//!
//! Amounts travel as strings. Request bodies take decimal amounts
//! (`"500"`, `"12.5"`); responses carry raw 18-decimal integers.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nftlend_contracts::{
    InterestQuote, LendingError, Loan, LoanEvent, LoanLedger, ReceiptClosed, ReceiptLiquidated,
};
use nftlend_protocol::clock::Clock;
use nftlend_protocol::config::{ConfigError, LendingParams};
use nftlend_protocol::ledger::{
    AssetRegistry, CollateralRegistry, FungibleLedger, FungibleToken, LedgerError, RegistryError,
};
use nftlend_protocol::units::{
    AccountId, AmountParseError, AssetId, LoanId, RewardAmount, Timestamp, ValueAmount,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The loan engine.
    pub ledger: Arc<LoanLedger>,
    /// Value unit ledger (principal).
    pub value: Arc<FungibleToken<ValueAmount>>,
    /// Reward unit ledger (interest).
    pub reward: Arc<FungibleToken<RewardAmount>>,
    /// Collateral registry.
    pub assets: Arc<CollateralRegistry>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Whether `/assets` and `/faucet` are served.
    pub devnet: bool,
}

impl AppState {
    /// Deploys the engine against fresh in-memory collaborators.
    pub fn in_memory(
        version: String,
        params: LendingParams,
        clock: Arc<dyn Clock>,
        metrics: SharedMetrics,
        devnet: bool,
    ) -> Result<Self, ConfigError> {
        let value = Arc::new(FungibleToken::<ValueAmount>::new("USD Coin", "USDC"));
        let reward = Arc::new(FungibleToken::<RewardAmount>::new("EmpowerDefi", "ED"));
        let assets = Arc::new(CollateralRegistry::new("EmpowerDefi NFT", "DefiNFT"));

        let ledger = LoanLedger::new(
            params,
            value.clone(),
            reward.clone(),
            assets.clone(),
            clock,
        )?;

        Ok(Self {
            version,
            ledger: Arc::new(ledger),
            value,
            reward,
            assets,
            metrics,
            devnet,
        })
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/loans", post(open_loan_handler))
        .route("/loans/:id", get(loan_handler))
        .route(
            "/loans/:id/interest",
            get(interest_quote_handler).post(pay_interest_handler),
        )
        .route("/loans/:id/repay", post(repay_handler))
        .route("/loans/:id/liquidate", post(liquidate_handler))
        .route("/accounts/:account", get(account_handler))
        .route("/events", get(events_handler))
        .route("/assets", post(mint_asset_handler))
        .route("/faucet", post(faucet_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /loans`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenLoanRequest {
    pub borrower: AccountId,
    pub asset_id: AssetId,
    /// Decimal amount in value units.
    pub principal: String,
}

/// Body of `POST /loans/:id/repay` and `POST /loans/:id/liquidate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallerRequest {
    pub caller: AccountId,
}

/// Body of `POST /loans/:id/interest`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InterestPaymentRequest {
    pub caller: AccountId,
    /// Decimal amount in reward units.
    pub amount: String,
}

/// Response of `POST /loans/:id/interest`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InterestPaymentResponse {
    pub loan_id: LoanId,
    pub paid: RewardAmount,
    /// Interest still outstanding after this payment.
    pub remaining: RewardAmount,
}

/// Body of `POST /assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintAssetRequest {
    pub owner: AccountId,
}

/// Response of `POST /assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintAssetResponse {
    pub asset_id: AssetId,
    pub owner: AccountId,
}

/// Body of `POST /faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub account: AccountId,
    /// Decimal amount in reward units.
    pub amount: String,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Engine clock, unix seconds.
    pub now: Timestamp,
    pub loan_count: usize,
    pub open_loans: usize,
    pub liquidatable_loans: Vec<LoanId>,
    pub total_outstanding_principal: ValueAmount,
    pub reserve_cap: ValueAmount,
    pub reserve_available: ValueAmount,
    pub params: LendingParams,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:account`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: AccountId,
    pub value_balance: ValueAmount,
    pub reward_balance: RewardAmount,
    /// Number of collateral assets held.
    pub assets_held: u64,
    /// Every loan this account has borrowed under.
    pub loans: Vec<LoanId>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind.
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler failure, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Lending(LendingError),
    InvalidAmount(AmountParseError),
    DevnetDisabled,
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError::Lending(err)
    }
}

impl From<AmountParseError> for ApiError {
    fn from(err: AmountParseError) -> Self {
        ApiError::InvalidAmount(err)
    }
}

fn lending_status(err: &LendingError) -> StatusCode {
    match err {
        LendingError::LoanNotFound(_) | LendingError::Registry(RegistryError::AssetNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        LendingError::NotOwner { .. } | LendingError::NotBorrower { .. } => StatusCode::FORBIDDEN,
        LendingError::AlreadyPledged(_)
        | LendingError::AlreadyClosed { .. }
        | LendingError::NotYetDue { .. }
        | LendingError::ReserveExceeded { .. } => StatusCode::CONFLICT,
        LendingError::InsufficientCollateral { .. }
        | LendingError::InsufficientFunds { .. }
        | LendingError::ZeroAmount
        | LendingError::ExcessInterestPayment { .. }
        | LendingError::InvalidBeneficiary { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LendingError::Registry(RegistryError::InvalidAccount)
        | LendingError::Ledger(LedgerError::InvalidAccount) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, error) = match &self {
            ApiError::Lending(err) => (lending_status(err), err.kind(), err.to_string()),
            ApiError::InvalidAmount(err) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", err.to_string())
            }
            ApiError::DevnetDisabled => (
                StatusCode::FORBIDDEN,
                "devnet_disabled",
                "devnet helpers are disabled on this node".to_string(),
            ),
        };
        let body = ErrorResponse {
            error,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Records latency and outcome of one engine call and refreshes the book
/// gauges.
fn instrumented<T>(
    state: &AppState,
    operation: &'static str,
    call: impl FnOnce(&LoanLedger) -> Result<T, LendingError>,
) -> Result<T, ApiError> {
    let timer = state.metrics.start_timer(operation);
    let result = call(state.ledger.as_ref());
    drop(timer);

    if let Err(err) = &result {
        state.metrics.record_failure(operation, err);
    }
    state.metrics.observe_book(state.ledger.as_ref());
    result.map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: book and reserve summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = &state.ledger;
    let resp = StatusResponse {
        version: state.version.clone(),
        now: ledger.now(),
        loan_count: ledger.loan_count(),
        open_loans: ledger.open_loan_count(),
        liquidatable_loans: ledger.liquidatable_loans(),
        total_outstanding_principal: ledger.total_outstanding_principal(),
        reserve_cap: ledger.treasury().cap(),
        reserve_available: ledger.reserve_available(),
        params: ledger.params().clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /loans`: pledge an asset and borrow against it.
async fn open_loan_handler(
    State(state): State<AppState>,
    Json(req): Json<OpenLoanRequest>,
) -> Result<(StatusCode, Json<Loan>), ApiError> {
    let principal: ValueAmount = req.principal.parse()?;
    let loan = instrumented(&state, "open_loan", |ledger| {
        let id = ledger.open_loan(&req.borrower, req.asset_id, principal)?;
        ledger.get_loan(id)
    })?;
    state.metrics.loans_opened_total.inc();
    Ok((StatusCode::CREATED, Json(loan)))
}

/// `GET /loans/:id`
async fn loan_handler(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Loan>, ApiError> {
    Ok(Json(state.ledger.get_loan(LoanId(id))?))
}

/// `GET /loans/:id/interest`
async fn interest_quote_handler(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<InterestQuote>, ApiError> {
    Ok(Json(state.ledger.interest_quote(LoanId(id))?))
}

/// `POST /loans/:id/interest`: settle part of the accrued interest.
async fn pay_interest_handler(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(req): Json<InterestPaymentRequest>,
) -> Result<Json<InterestPaymentResponse>, ApiError> {
    let amount: RewardAmount = req.amount.parse()?;
    let loan_id = LoanId(id);
    let remaining = instrumented(&state, "partial_interest_payment", |ledger| {
        ledger.partial_interest_payment(loan_id, &req.caller, amount)
    })?;
    state.metrics.interest_payments_total.inc();
    Ok(Json(InterestPaymentResponse {
        loan_id,
        paid: amount,
        remaining,
    }))
}

/// `POST /loans/:id/repay`
async fn repay_handler(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<ReceiptClosed>, ApiError> {
    let receipt = instrumented(&state, "repay", |ledger| {
        ledger.repay(LoanId(id), &req.caller)
    })?;
    state.metrics.loans_repaid_total.inc();
    Ok(Json(receipt))
}

/// `POST /loans/:id/liquidate`: permissionless; any caller may trigger it.
async fn liquidate_handler(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<ReceiptLiquidated>, ApiError> {
    let receipt = instrumented(&state, "liquidate", |ledger| {
        ledger.liquidate(LoanId(id), &req.caller)
    })?;
    state.metrics.loans_liquidated_total.inc();
    Ok(Json(receipt))
}

/// `GET /accounts/:account`
async fn account_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let loans = state
        .ledger
        .loans_by_borrower(&account)
        .into_iter()
        .map(|l| l.id)
        .collect();

    Json(AccountResponse {
        value_balance: state.value.balance_of(&account),
        reward_balance: state.reward.balance_of(&account),
        assets_held: state.assets.balance_of(&account),
        loans,
        account,
    })
}

/// `GET /events`: the journal, oldest first.
async fn events_handler(State(state): State<AppState>) -> Json<Vec<LoanEvent>> {
    Json(state.ledger.events())
}

/// `POST /assets`: devnet helper minting a fresh collateral asset.
async fn mint_asset_handler(
    State(state): State<AppState>,
    Json(req): Json<MintAssetRequest>,
) -> Result<(StatusCode, Json<MintAssetResponse>), ApiError> {
    if !state.devnet {
        return Err(ApiError::DevnetDisabled);
    }
    let asset_id = state
        .assets
        .mint(&req.owner)
        .map_err(LendingError::from)?;
    tracing::info!(asset_id = %asset_id, owner = %req.owner, "devnet asset minted");
    Ok((
        StatusCode::CREATED,
        Json(MintAssetResponse {
            asset_id,
            owner: req.owner,
        }),
    ))
}

/// `POST /faucet`: devnet helper minting reward units for interest.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if !state.devnet {
        return Err(ApiError::DevnetDisabled);
    }
    let amount: RewardAmount = req.amount.parse()?;
    state
        .reward
        .mint(&req.account, amount)
        .map_err(LendingError::from)?;
    tracing::info!(account = %req.account, amount = %amount, "devnet faucet drip");

    let account = req.account;
    Ok(Json(AccountResponse {
        value_balance: state.value.balance_of(&account),
        reward_balance: state.reward.balance_of(&account),
        assets_held: state.assets.balance_of(&account),
        loans: state
            .ledger
            .loans_by_borrower(&account)
            .into_iter()
            .map(|l| l.id)
            .collect(),
        account,
    }))
}
