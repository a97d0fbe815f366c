//! HTTP API for MedChain
//!
//! Exposes mining, transaction submission, the peer wire contract
//! (`GET /chain`), peer registration and consensus resolution.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::{Block, PatientRecord};
use crate::error::ChainError;
use crate::network::ChainResponse;
use crate::node::Node;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e @ ChainError::InvalidPeerAddress(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "New Block Forged".to_string(),
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct TransactionResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct PatientRecordsResponse {
    pub patient: String,
    pub count: usize,
    pub records: Vec<PatientRecord>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Ledger endpoints
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/chain", get(full_chain))
        // Peer endpoints
        .route("/nodes", get(list_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(consensus))
        // Record retrieval
        .route("/patients/:patient/records", get(patient_records))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Bind `addr` and serve the API until the server stops.
pub async fn run_api_server(node: Arc<Node>, addr: SocketAddr) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let state = node.state().await;
    Json(serde_json::json!({
        "status": "healthy",
        "node_state": format!("{:?}", state),
        "node_id": node.node_id(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(MineResponse::from(block)))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(tx): Json<Transaction>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let index = node.submit_transaction(tx).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            message: format!("Transaction will be added to Block {}", index),
            index,
        }),
    ))
}

async fn pending_transactions(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let transactions = node.pending_transactions().await;
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions
    }))
}

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    Json(node.chain().await)
}

async fn list_nodes(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let peers = node.peer_list().await;
    Json(serde_json::json!({
        "count": peers.len(),
        "nodes": peers
    }))
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterNodesRequest>,
) -> Result<(StatusCode, Json<RegisterNodesResponse>), ApiError> {
    if req.nodes.is_empty() {
        return Err(ApiError::InvalidInput(
            "Please supply a valid list of nodes".to_string(),
        ));
    }

    let total_nodes = node.register_peers(req.nodes.as_slice()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
    ))
}

async fn consensus(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let outcome = node.resolve().await;
    if outcome.replaced {
        Json(serde_json::json!({
            "message": "Our chain was replaced",
            "replaced": true,
            "new_chain": outcome.chain
        }))
    } else {
        Json(serde_json::json!({
            "message": "Our chain is authoritative",
            "replaced": false,
            "chain": outcome.chain
        }))
    }
}

async fn patient_records(
    State(node): State<Arc<Node>>,
    Path(patient): Path<String>,
) -> Result<Json<PatientRecordsResponse>, ApiError> {
    if patient.trim().is_empty() {
        return Err(ApiError::InvalidInput("Patient id cannot be empty".to_string()));
    }

    let records = node.records(&patient).await;
    Ok(Json(PatientRecordsResponse {
        patient,
        count: records.len(),
        records,
    }))
}

async fn get_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.stats().await)
}
