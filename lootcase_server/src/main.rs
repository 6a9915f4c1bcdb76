use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lootcase_core::{
    Catalog, EconomyConfig, KeyValueStore, ReplayRng, Session, SqliteStore, DEFAULT_DB_PATH,
};
use lootcase_shared::{
    ApiError, CaseView, CasesResponse, ErrorBody, OpenCaseRequest, OpenCaseResponse, SellRequest,
    SellResponse, StateResponse, UpgradeRequest, UpgradeResponse,
};

const FEATURED_ITEMS: usize = 5;

type SessionRng = Box<dyn RngCore + Send>;

struct AppState<S> {
    session: Mutex<Session<S, SessionRng>>,
}

type Shared<S> = State<Arc<AppState<S>>>;

struct AppError(ApiError);

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError(err)
    }
}

impl From<lootcase_core::LootError> for AppError {
    fn from(err: lootcase_core::LootError) -> Self {
        if let lootcase_core::LootError::Store(store) = &err {
            error!("store failure: {store}");
        }
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// one request at a time; contention is reported instead of queued
fn lock<S>(state: &AppState<S>) -> Result<MutexGuard<'_, Session<S, SessionRng>>, AppError> {
    state.session.try_lock().map_err(|_| AppError(ApiError::Busy))
}

async fn route_cases<S: KeyValueStore>(
    State(state): Shared<S>,
) -> Result<Json<CasesResponse>, AppError> {
    let session = lock(&state)?;
    let cases = session
        .catalog()
        .cases
        .iter()
        .map(|case| -> Result<CaseView, AppError> {
            Ok(CaseView {
                id: case.id,
                name: case.name.clone(),
                price: case.price,
                item_count: case.skins.len(),
                odds: session.odds(case.id)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(CasesResponse { cases }))
}

async fn route_state<S: KeyValueStore>(
    State(state): Shared<S>,
) -> Result<Json<StateResponse>, AppError> {
    let mut session = lock(&state)?;
    session.refresh()?;
    Ok(Json(StateResponse {
        balance: session.balance(),
        inventory: session.inventory().to_vec(),
        summary: session.summary(FEATURED_ITEMS),
    }))
}

async fn route_open<S: KeyValueStore>(
    State(state): Shared<S>,
    Json(req): Json<OpenCaseRequest>,
) -> Result<Json<OpenCaseResponse>, AppError> {
    let mut session = lock(&state)?;
    let opening = session.open_case(req.case_id)?;
    session.settle();
    Ok(Json(OpenCaseResponse { opening }))
}

async fn route_sell<S: KeyValueStore>(
    State(state): Shared<S>,
    Json(req): Json<SellRequest>,
) -> Result<Json<SellResponse>, AppError> {
    let mut session = lock(&state)?;
    let sold = session.sell_item(req.item_id)?;
    info!(item_id = req.item_id, price = %sold.price, "item sold");
    Ok(Json(SellResponse {
        sold,
        balance: session.balance(),
    }))
}

async fn route_upgrade<S: KeyValueStore>(
    State(state): Shared<S>,
    Json(req): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, AppError> {
    if req.item_ids.is_empty() {
        return Err(ApiError::Invalid("item_ids must not be empty".into()).into());
    }
    let mut session = lock(&state)?;
    let outcome = session.upgrade(&req.item_ids, req.manual_chance)?;
    session.settle();
    Ok(Json(UpgradeResponse {
        outcome,
        balance: session.balance(),
    }))
}

fn app<S: KeyValueStore + Send + 'static>(session: Session<S, SessionRng>) -> Router {
    let state = Arc::new(AppState {
        session: Mutex::new(session),
    });
    Router::new()
        .route("/cases", get(route_cases::<S>))
        .route("/state", get(route_state::<S>))
        .route("/open", post(route_open::<S>))
        .route("/sell", post(route_sell::<S>))
        .route("/upgrade", post(route_upgrade::<S>))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let catalog_path =
        std::env::var("LOOTCASE_CATALOG").unwrap_or_else(|_| "data/cases.json".to_string());
    let catalog = Catalog::load(&catalog_path)?;
    let config = match std::env::var("LOOTCASE_CONFIG") {
        Ok(path) => EconomyConfig::load(path)?,
        Err(_) => EconomyConfig::default(),
    };
    let store = SqliteStore::open(
        std::env::var("LOOTCASE_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
    )?;
    let rng: SessionRng = match std::env::var("LOOTCASE_SEED") {
        Ok(seed) => {
            let rng = ReplayRng::new(seed, 0);
            info!(seed_hash = %rng.seed_hash_hex(), "replaying from seed");
            Box::new(rng)
        }
        Err(_) => Box::new(StdRng::from_entropy()),
    };
    let session = Session::start(store, catalog, config, rng)?;

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app(session)).await?;
    Ok(())
}
