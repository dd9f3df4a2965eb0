//! REST surface of the marketplace
//!
//! Serves the endpoints the dashboards talk to. Runs an axum server
//! on its own tokio runtime; the rest of this program is plain
//! threads, so every handler hops to a blocking task to touch the
//! stores. Mutations run their validation and their write inside one
//! transaction and append a domain event before committing.
use crate::event::{ApiEvent, Event};
use crate::event_log::{SharedWriter, Writer as _};
use crate::market::{
    self, Bid, Dashboard, DemandMap, NewBid, NewRequirement, Requirement, RequirementId, Scope,
    UserProfile, ValidationError,
};
use crate::persistence::{Connection, Persistence, Transaction};
use crate::service::LoopService;
use crate::store::{
    BidStore as _, RequirementStore as _, SharedBidStore, SharedRequirementStore, SharedUserStore,
    UserStore as _,
};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{debug, error};

/// Everything a handler needs, shared by value into the router.
pub struct ApiState<P: Persistence> {
    pub persistence: P,
    pub users: SharedUserStore<P>,
    pub requirements: SharedRequirementStore<P>,
    pub bids: SharedBidStore<P>,
    pub event_writer: SharedWriter<P>,
}

impl<P: Persistence> Clone for ApiState<P> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
            users: self.users.clone(),
            requirements: self.requirements.clone(),
            bids: self.bids.clone(),
            event_writer: self.event_writer.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("unknown requirement: {0}")]
    UnknownRequirement(RequirementId),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnknownUser(_) | ApiError::UnknownRequirement(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                error!("api request failed: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub struct Api {
    // cancels all tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl Api {
    pub fn new<P: Persistence>(listen_addr: SocketAddr, state: ApiState<P>) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        runtime.spawn(async move {
            tx.send(
                run_http_server(listen_addr, state)
                    .await
                    .context("failed to run http server"),
            )
            .expect("send to work");
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Api {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(std::time::Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("http server died without leaving a response"))
            }
        }
    }
}

async fn run_http_server<P: Persistence>(
    listen_addr: SocketAddr,
    state: ApiState<P>,
) -> Result<()> {
    let api = Router::new()
        .route("/users", post(register_user::<P>))
        .route("/requirements", post(create_requirement::<P>))
        .route("/requirements/state/:state", get(requirements_by_state::<P>))
        .route("/bids", post(create_bid::<P>))
        .route("/bids/state/:state", get(bids_by_state::<P>))
        .route("/bids/requirement/:id", get(bids_by_requirement::<P>))
        .route("/demand/state/:state", get(demand_by_state::<P>))
        .route(
            "/demand/state/:state/pincode/:pincode",
            get(demand_by_pincode::<P>),
        )
        .route("/dashboard/:clerk_user_id", get(dashboard::<P>))
        .with_state(state);

    let app = Router::new().nest("/api", api);

    debug!(%listen_addr, "starting http server");
    axum::Server::try_bind(&listen_addr)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

/// The stores are synchronous; run them off the runtime's core threads.
async fn blocking<T>(f: impl FnOnce() -> Result<T, ApiError> + Send + 'static) -> Result<T, ApiError>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format_err!("blocking task failed: {e}")))?
}

async fn register_user<P: Persistence>(
    State(api): State<ApiState<P>>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    blocking(move || register_user_sync(&api, profile))
        .await
        .map(Json)
}

async fn create_requirement<P: Persistence>(
    State(api): State<ApiState<P>>,
    Json(new): Json<NewRequirement>,
) -> Result<Json<Requirement>, ApiError> {
    blocking(move || create_requirement_sync(&api, new))
        .await
        .map(Json)
}

async fn requirements_by_state<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path(state): Path<String>,
) -> Result<Json<Vec<Requirement>>, ApiError> {
    blocking(move || {
        let mut conn = api.persistence.get_connection()?;
        Ok(api.requirements.list_by_state(&mut conn, &state)?)
    })
    .await
    .map(Json)
}

async fn create_bid<P: Persistence>(
    State(api): State<ApiState<P>>,
    Json(new): Json<NewBid>,
) -> Result<Json<Bid>, ApiError> {
    blocking(move || create_bid_sync(&api, new)).await.map(Json)
}

async fn bids_by_state<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path(state): Path<String>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    blocking(move || {
        let mut conn = api.persistence.get_connection()?;
        Ok(api.bids.list_by_state(&mut conn, &state)?)
    })
    .await
    .map(Json)
}

async fn bids_by_requirement<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path(id): Path<RequirementId>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    blocking(move || bids_by_requirement_sync(&api, id))
        .await
        .map(Json)
}

async fn demand_by_state<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path(state): Path<String>,
) -> Result<Json<DemandMap>, ApiError> {
    blocking(move || demand_sync(&api, Scope::state_wide(state)))
        .await
        .map(Json)
}

async fn demand_by_pincode<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path((state, pincode)): Path<(String, String)>,
) -> Result<Json<DemandMap>, ApiError> {
    blocking(move || demand_sync(&api, Scope::within_pincode(state, pincode)))
        .await
        .map(Json)
}

async fn dashboard<P: Persistence>(
    State(api): State<ApiState<P>>,
    Path(clerk_user_id): Path<String>,
) -> Result<Json<Dashboard>, ApiError> {
    blocking(move || dashboard_sync(&api, &clerk_user_id))
        .await
        .map(Json)
}

pub(crate) fn register_user_sync<P: Persistence>(
    api: &ApiState<P>,
    profile: UserProfile,
) -> Result<UserProfile, ApiError> {
    market::ensure_valid_profile(&profile)?;

    let mut conn = api.persistence.get_connection()?;
    let mut transaction = conn.start_transaction()?;

    api.users.upsert_tr(&mut transaction, &profile)?;
    api.event_writer.write_tr(
        &mut transaction,
        &[Event::Api(ApiEvent::UserRegistered {
            clerk_user_id: profile.clerk_user_id.clone(),
            role: profile.role,
        })],
    )?;
    transaction.commit()?;

    Ok(profile)
}

pub(crate) fn create_requirement_sync<P: Persistence>(
    api: &ApiState<P>,
    new: NewRequirement,
) -> Result<Requirement, ApiError> {
    market::ensure_valid_requirement(&new)?;

    let mut conn = api.persistence.get_connection()?;
    let mut transaction = conn.start_transaction()?;

    let req = api.requirements.insert_tr(&mut transaction, &new)?;
    api.event_writer.write_tr(
        &mut transaction,
        &[Event::Api(ApiEvent::RequirementPosted(req.clone()))],
    )?;
    transaction.commit()?;

    Ok(req)
}

/// Atomic conditional create-or-update of a supplier's bid.
///
/// The read of the current lowest bid and the write of the new one
/// share a transaction, so two suppliers racing to undercut the same
/// price cannot both get in: whoever commits second sees the other's
/// bid and is rejected.
pub(crate) fn create_bid_sync<P: Persistence>(
    api: &ApiState<P>,
    new: NewBid,
) -> Result<Bid, ApiError> {
    if new.item.trim().is_empty() {
        return Err(ValidationError::EmptyItem.into());
    }

    let mut conn = api.persistence.get_connection()?;
    let mut transaction = conn.start_transaction()?;

    let current_lowest = api
        .bids
        .lowest_for_item_tr(&mut transaction, &new.item, &new.state)?;
    market::ensure_valid_bid(new.price, current_lowest)?;

    let bid = api.bids.upsert_tr(&mut transaction, &new)?;
    api.event_writer.write_tr(
        &mut transaction,
        &[Event::Api(ApiEvent::BidPlaced(bid.clone()))],
    )?;
    transaction.commit()?;

    Ok(bid)
}

/// Legacy lookup, kept for older clients: bids "for a requirement"
/// are the bids on that requirement's item within its state.
pub(crate) fn bids_by_requirement_sync<P: Persistence>(
    api: &ApiState<P>,
    id: RequirementId,
) -> Result<Vec<Bid>, ApiError> {
    let mut conn = api.persistence.get_connection()?;

    let req = api
        .requirements
        .get(&mut conn, id)?
        .ok_or(ApiError::UnknownRequirement(id))?;

    let mut bids = api.bids.list_by_state(&mut conn, &req.state)?;
    bids.retain(|bid| bid.item == req.item);
    Ok(bids)
}

pub(crate) fn demand_sync<P: Persistence>(
    api: &ApiState<P>,
    scope: Scope,
) -> Result<DemandMap, ApiError> {
    let mut conn = api.persistence.get_connection()?;

    let requirements = api.requirements.list_by_state(&mut conn, &scope.state)?;
    let bids = api.bids.list_by_state(&mut conn, &scope.state)?;

    Ok(market::aggregate(&requirements, &bids, &scope))
}

pub(crate) fn dashboard_sync<P: Persistence>(
    api: &ApiState<P>,
    clerk_user_id: &str,
) -> Result<Dashboard, ApiError> {
    let mut conn = api.persistence.get_connection()?;

    let user = api
        .users
        .get(&mut conn, clerk_user_id)?
        .ok_or_else(|| ApiError::UnknownUser(clerk_user_id.to_owned()))?;
    let session = user.session();

    let requirements = api.requirements.list_by_state(&mut conn, &session.state)?;
    let bids = api.bids.list_by_state(&mut conn, &session.state)?;

    Ok(market::dashboard_for(&session, &requirements, &bids))
}
