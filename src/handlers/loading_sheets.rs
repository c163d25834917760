// src/handlers/loading_sheets.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedOperator,
    models::loading_sheet::SavedLoadingSheet,
    services::{
        dispatch_service::{EditorSessionView, OpenEditorPayload},
        indent_editor::EditorAction,
    },
};

// =============================================================================
//  EDITOR DE FOLHA (UM CAMINHÃO)
// =============================================================================

// POST /api/loading-sheets/editor
#[utoipa::path(
    post,
    path = "/api/loading-sheets/editor",
    tag = "Loading Sheets",
    request_body = OpenEditorPayload,
    responses(
        (status = 201, description = "Editor aberto para a folha", body = EditorSessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn open_editor(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Json(payload): Json<OpenEditorPayload>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.dispatch_service.open_editor(payload, &operator.0).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/loading-sheets/editor/{id}
#[utoipa::path(
    get,
    path = "/api/loading-sheets/editor/{id}",
    tag = "Loading Sheets",
    params(("id" = Uuid, Path, description = "ID da sessão do editor")),
    responses(
        (status = 200, description = "Folha e editor atuais", body = EditorSessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_editor(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.editor(id, &operator.0).await?))
}

// DELETE /api/loading-sheets/editor/{id}
#[utoipa::path(
    delete,
    path = "/api/loading-sheets/editor/{id}",
    tag = "Loading Sheets",
    params(("id" = Uuid, Path, description = "ID da sessão do editor")),
    responses(
        (status = 204, description = "Editor descartado sem gravar"),
        (status = 404, description = "Sessão não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_editor(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.dispatch_service.close_editor(id, &operator.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/loading-sheets/editor/{id}/actions
#[utoipa::path(
    post,
    path = "/api/loading-sheets/editor/{id}/actions",
    tag = "Loading Sheets",
    params(("id" = Uuid, Path, description = "ID da sessão do editor")),
    request_body(
        content = serde_json::Value,
        description = "Ação com `type`: openIndent, closeEditor, setDispatchType, setMagazine, setLoadCase, setLoadWeight, addSplit, removeSplit, setFifo, toggleBatch, saveChanges"
    ),
    responses(
        (status = 200, description = "Novo estado do editor", body = EditorSessionView),
        (status = 422, description = "Ação rejeitada")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_editor_action(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
    Json(action): Json<EditorAction>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.apply_editor_action(id, &operator.0, action).await?))
}

// POST /api/loading-sheets/editor/{id}/save-changes
#[utoipa::path(
    post,
    path = "/api/loading-sheets/editor/{id}/save-changes",
    tag = "Loading Sheets",
    params(("id" = Uuid, Path, description = "ID da sessão do editor")),
    responses(
        (status = 200, description = "Itens do indent gravados de volta na folha", body = EditorSessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_changes(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.dispatch_service.save_changes(id, &operator.0).await?))
}

// POST /api/loading-sheets/editor/{id}/submit
#[utoipa::path(
    post,
    path = "/api/loading-sheets/editor/{id}/submit",
    tag = "Loading Sheets",
    params(("id" = Uuid, Path, description = "ID da sessão do editor")),
    responses(
        (status = 201, description = "Folha criada ou atualizada", body = SavedLoadingSheet),
        (status = 400, description = "Cabeçalho da folha incompleto")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit(
    State(app_state): State<AppState>,
    operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let saved = app_state.dispatch_service.submit_editor(id, &operator.0).await?;

    tracing::info!(operator = %operator.0, sheet_no = %saved.loading_sheet_no, "Folha enviada pelo operador");
    Ok((StatusCode::CREATED, Json(saved)))
}
