// src/handlers/multi_truck.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedOperator,
    models::loading_sheet::SubmissionReceipt,
    services::{dispatch_service::SessionView, vehicle_aggregator::Action},
};

// =============================================================================
//  SESSÃO MULTI-CAMINHÃO
// =============================================================================

// POST /api/multi-truck/sessions
#[utoipa::path(
    post,
    path = "/api/multi-truck/sessions",
    tag = "Multi-Truck",
    responses(
        (status = 201, description = "Sessão aberta com os indents disponíveis", body = SessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn open_session(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state
        .dispatch_service
        .open_session(Utc::now().date_naive(), &operator.0)
        .await?;

    tracing::info!(operator = %operator.0, session_id = %view.session_id, "Sessão aberta pelo operador");
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/multi-truck/sessions/{id}
#[utoipa::path(
    get,
    path = "/api/multi-truck/sessions/{id}",
    tag = "Multi-Truck",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 200, description = "Estado atual da sessão", body = SessionView),
        (status = 403, description = "Sessão de outro operador"),
        (status = 404, description = "Sessão não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.session(id, &operator.0).await?))
}

// DELETE /api/multi-truck/sessions/{id}
#[utoipa::path(
    delete,
    path = "/api/multi-truck/sessions/{id}",
    tag = "Multi-Truck",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 204, description = "Sessão encerrada"),
        (status = 404, description = "Sessão não encontrada"),
        (status = 409, description = "Envio em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_session(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.dispatch_service.close_session(id, &operator.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/multi-truck/sessions/{id}/actions
#[utoipa::path(
    post,
    path = "/api/multi-truck/sessions/{id}/actions",
    tag = "Multi-Truck",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    request_body(
        content = serde_json::Value,
        description = "Ação com `type`: selectIndent, setDispatchType, setMagazine, setLoadCase, addSplit, removeSplit, openVehicleDialog, closeVehicleDialog, assignVehicle, removeAssignment"
    ),
    responses(
        (status = 200, description = "Novo estado da sessão", body = SessionView),
        (status = 422, description = "Ação rejeitada; a mensagem diz qual item e qual restrição"),
        (status = 409, description = "Envio em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_action(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
    Json(action): Json<Action>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.apply_action(id, &operator.0, action).await?))
}

// DELETE /api/multi-truck/sessions/{id}/assignments/{index}
#[utoipa::path(
    delete,
    path = "/api/multi-truck/sessions/{id}/assignments/{index}",
    tag = "Multi-Truck",
    params(
        ("id" = Uuid, Path, description = "ID da sessão"),
        ("index" = usize, Path, description = "Posição do caminhão na lista")
    ),
    responses(
        (status = 200, description = "Caminhão removido e ledger devolvido", body = SessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_assignment(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.remove_assignment(id, &operator.0, index).await?))
}

// POST /api/multi-truck/sessions/{id}/save
#[utoipa::path(
    post,
    path = "/api/multi-truck/sessions/{id}/save",
    tag = "Multi-Truck",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 201, description = "Todas as folhas gravadas", body = SubmissionReceipt),
        (status = 409, description = "Outro envio desta sessão está em andamento"),
        (status = 502, description = "O serviço recusou o envio; a sessão foi preservada")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_all(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state.dispatch_service.save_all(id, &operator.0).await?;

    tracing::info!(operator = %operator.0, session_id = %id, "Save All concluído");
    Ok((StatusCode::CREATED, Json(receipt)))
}
