//! Scenario endpoints

use crate::error::ApiError;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use grading_core::GradeLadder;
use grading_scenario::{
    BudgetImpact, Comparison, HeadcountSnapshot, LegacyScenario, NewScenario, Scenario,
    ScenarioError, ScenarioId, ScenarioStatus, ScenarioStore,
};
use serde::{Deserialize, Serialize};

type ApiResult<T> = Result<T, ApiError>;

/// Body of `POST /scenario`
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Ladder to derive against; the configured default when absent
    #[serde(default)]
    pub ladder: Option<GradeLadder>,
    /// Name and inputs
    #[serde(flatten)]
    pub scenario: NewScenario,
}

/// Body of `PATCH /scenario/{id}`
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// New name
    pub name: String,
}

/// Query of `GET /scenario`
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Status filter, case-insensitive
    #[serde(default)]
    pub status: Option<String>,
}

/// Query of `GET /scenario/compare`
#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma-separated scenario ids
    pub ids: String,
    /// Prepend the current scenario
    #[serde(default)]
    pub with_current: bool,
}

/// Body of `GET /healthz`
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `ok`
    pub status: &'static str,
    /// Engine version
    pub version: &'static str,
    /// Stored scenarios
    pub scenarios: usize,
    /// Current scenario id
    pub current: Option<ScenarioId>,
}

/// Run a store operation off the async runtime
async fn with_store<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ScenarioStore) -> Result<T, ScenarioError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn parse_id(raw: &str) -> ApiResult<ScenarioId> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid scenario id '{raw}': {e}")))
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let snapshot = state.store.snapshot();
    Json(Health {
        status: "ok",
        version: grading_scenario::VERSION,
        scenarios: snapshot.len(),
        current: snapshot.current_id(),
    })
}

pub(crate) async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let Json(request) = payload?;
    let scenario = with_store(&state, move |store| {
        let ladder = store.resolve_ladder(request.ladder)?;
        store.create_draft(ladder, request.scenario)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NewScenario>, JsonRejection>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    with_store(&state, move |store| store.update_draft(id, request))
        .await
        .map(Json)
}

pub(crate) async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    with_store(&state, move |store| store.rename(id, &request.name))
        .await
        .map(Json)
}

pub(crate) async fn apply(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    with_store(&state, move |store| store.apply_as_current(id))
        .await
        .map(Json)
}

pub(crate) async fn archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    with_store(&state, move |store| store.archive_draft(id))
        .await
        .map(Json)
}

/// Budget impact; recorded on the scenario when it is a draft
pub(crate) async fn impact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<HeadcountSnapshot>, JsonRejection>,
) -> ApiResult<Json<BudgetImpact>> {
    let id = parse_id(&id)?;
    let Json(headcount) = payload?;
    // Drafts keep the figure; anything else, including a draft applied
    // meanwhile, is only reported.
    with_store(&state, move |store| match store.record_budget_impact(id, &headcount) {
        Err(ScenarioError::InvalidTransition { .. }) => store.budget_impact(id, &headcount),
        other => other,
    })
    .await
    .map(Json)
}

pub(crate) async fn import_legacy(
    State(state): State<AppState>,
    payload: Result<Json<LegacyScenario>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let Json(legacy) = payload?;
    let scenario = with_store(&state, move |store| store.import_legacy_current(legacy)).await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}

pub(crate) async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Scenario>>> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ScenarioStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.store.list(status)))
}

pub(crate) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| ScenarioError::NotFound(id).into())
}

pub(crate) async fn current(State(state): State<AppState>) -> ApiResult<Json<Scenario>> {
    state
        .store
        .current()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no current scenario".to_string()))
}

pub(crate) async fn compare(
    State(state): State<AppState>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> ApiResult<Json<Comparison>> {
    let Query(query) = query?;
    let ids = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_id)
        .collect::<ApiResult<Vec<_>>>()?;

    let comparison = if query.with_current {
        state.store.compare_with_current(&ids)
    } else {
        state.store.compare(&ids)
    }?;
    Ok(Json(comparison))
}
