// src/handlers/indents.rs

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        indent::{BatchDetail, BatchQuery, IndentDataQuery, IndentProductRow},
        loading_sheet::CreationData,
    },
};

// GET /api/loading-sheets/creation-data
#[utoipa::path(
    get,
    path = "/api/loading-sheets/creation-data",
    tag = "Indents",
    responses(
        (status = 200, description = "Indents disponíveis e próximo número de folha", body = CreationData)
    ),
    security(("api_jwt" = []))
)]
pub async fn creation_data(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = app_state
        .dispatch_service
        .creation_data(Utc::now().date_naive())
        .await?;

    Ok(Json(data))
}

// POST /api/indents/search
#[utoipa::path(
    post,
    path = "/api/indents/search",
    tag = "Indents",
    request_body = IndentDataQuery,
    responses(
        (status = 200, description = "Linhas de produto do indent", body = Vec<IndentProductRow>),
        (status = 400, description = "Consulta inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn search_indent(
    State(app_state): State<AppState>,
    Json(payload): Json<IndentDataQuery>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let rows = app_state.dispatch_service.search_indent(&payload).await?;
    Ok(Json(rows))
}

// POST /api/indents/batches
#[utoipa::path(
    post,
    path = "/api/indents/batches",
    tag = "Indents",
    request_body = BatchQuery,
    responses(
        (status = 200, description = "Lotes FIFO que cobrem as caixas pedidas", body = Vec<BatchDetail>)
    ),
    security(("api_jwt" = []))
)]
pub async fn batch_details(
    State(app_state): State<AppState>,
    Json(payload): Json<BatchQuery>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let batches = app_state.dispatch_service.batch_details(&payload).await?;
    Ok(Json(batches))
}
