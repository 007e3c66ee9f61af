/**
 * API REST FIREGROUND - Vues du dashboard servies par le kernel
 *
 * RÔLE :
 * Expose les vues projetées (liste, détail, équipes, balises, alertes), la barre
 * d'état, la sélection courante et le health du service.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, sérialisation JSON des vues du projecteur
 * - Verrou de l'état pris brièvement par handler, jamais à travers un await
 * - DELETE /alerts/{id} : 204 même si l'alerte n'existe plus
 *
 * SÉCURITÉ :
 * - Header x-api-key exigé partout sauf /health quand une clé est configurée
 */

use crate::health::{HealthTracker, KernelHealth};
use crate::models::BeaconSnapshot;
use crate::notices::NoticeFilter;
use crate::projector::{self, AlertView, FirefighterDetail, FirefighterView, ViewFilters};
use crate::selection::SelectionView;
use crate::state::{DashboardState, Shared, StatusView};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct AppState {
    pub state: Shared<DashboardState>,
    pub health_tracker: HealthTracker,
    pub api_key: Option<String>,
}

async fn require_api_key(State(app): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    // Health check toujours accessible
    if req.uri().path().starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let Some(expected) = app.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);

    if !ok {
        tracing::warn!(path = %req.uri().path(), "requête refusée: x-api-key absente ou invalide");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/status", get(get_status))
        .route("/firefighters", get(list_firefighters))
        .route("/firefighters/{id}", get(get_firefighter))
        .route("/teams", get(list_teams))
        .route("/beacons", get(list_beacons))
        .route("/beacons/{id}", get(get_beacon))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}", delete(dismiss_alert))
        .route("/selection", get(get_selection))
        .route("/selection/firefighter", put(select_firefighter))
        .route("/selection/beacon", put(select_beacon))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.state))
}

// GET /status (barre d'état)
async fn get_status(State(app): State<AppState>) -> Json<StatusView> {
    Json(app.state.lock().status())
}

// GET /firefighters?search=&team=&sort=
async fn list_firefighters(
    State(app): State<AppState>,
    Query(filters): Query<ViewFilters>,
) -> Json<Vec<FirefighterView>> {
    let st = app.state.lock();
    Json(projector::recompute(&st.store, &st.ledger, &filters, OffsetDateTime::now_utc()))
}

#[derive(Debug, Deserialize)]
struct DetailParams {
    #[serde(default)]
    notices: NoticeFilter,
}

// GET /firefighters/{id}?notices=all|warning|critical
async fn get_firefighter(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<Json<FirefighterDetail>, StatusCode> {
    let st = app.state.lock();
    projector::firefighter_detail(&st.store, &st.ledger, &id, params.notices, OffsetDateTime::now_utc())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_teams(State(app): State<AppState>) -> Json<Vec<String>> {
    Json(projector::teams(&app.state.lock().store))
}

async fn list_beacons(State(app): State<AppState>) -> Json<Vec<BeaconSnapshot>> {
    Json(app.state.lock().store.beacons().to_vec())
}

async fn get_beacon(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BeaconSnapshot>, StatusCode> {
    let st = app.state.lock();
    st.store.beacon(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

// GET /alerts (plus récente en tête)
async fn list_alerts(State(app): State<AppState>) -> Json<Vec<AlertView>> {
    Json(projector::alert_views(&app.state.lock().ledger, OffsetDateTime::now_utc()))
}

// DELETE /alerts/{id} (acquittement opérateur)
async fn dismiss_alert(State(app): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if app.state.lock().ledger.dismiss(&id) {
        tracing::info!(alert = %id, "alerte acquittée");
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    #[serde(default)]
    id: Option<String>,
}

async fn get_selection(State(app): State<AppState>) -> Json<SelectionView> {
    Json(app.state.lock().selection.view())
}

async fn select_firefighter(State(app): State<AppState>, Json(body): Json<SelectBody>) -> Json<SelectionView> {
    let mut st = app.state.lock();
    st.selection.select_firefighter(body.id);
    Json(st.selection.view())
}

async fn select_beacon(State(app): State<AppState>, Json(body): Json<SelectBody>) -> Json<SelectionView> {
    let mut st = app.state.lock();
    st.selection.select_beacon(body.id);
    Json(st.selection.view())
}
