// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::allocation::DispatchType;

// Rejeições do motor de alocação. As mensagens chegam ao usuário como estão,
// então sempre dizem qual item/split e qual restrição.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("No indent is selected.")]
    NoIndentSelected,

    #[error("Indent {0} is not available for selection.")]
    IndentNotAvailable(String),

    #[error("Item {0} is not part of the selected indent.")]
    UnknownItem(String),

    #[error("Split {split} does not exist for item {item}.")]
    UnknownSplit { item: String, split: u32 },

    #[error("{field} ({value}) for {slot} of item {item} must be a non-negative whole number.")]
    InvalidQuantity { field: &'static str, value: Decimal, slot: String, item: String },

    #[error("Load Case ({requested}) for {slot} of item {item} exceeds available remaining cases ({available}).")]
    ExceedsRemaining { slot: String, item: String, requested: i64, available: i64 },

    #[error("Load Weight ({load_wt}) for {slot} of item {item} must be greater than zero.")]
    NonPositiveWeight { load_wt: Decimal, slot: String, item: String },

    #[error("Load Weight ({load_wt}) for {slot} of item {item} is not a whole number of cases of {l1_net_wt} each.")]
    WeightNotWholeCases { load_wt: Decimal, l1_net_wt: Decimal, slot: String, item: String },

    #[error("Load Weight ({load_wt}) for {slot} of item {item} exceeds available remaining weight ({available}).")]
    WeightExceedsRemaining { load_wt: Decimal, available: Decimal, slot: String, item: String },

    #[error("Item {0} has no net weight per case; load weight cannot be converted to cases.")]
    MissingNetWeight(String),

    #[error("No remaining cases left on item {0} to split.")]
    NothingLeftToSplit(String),

    #[error("{dispatch_type} / {magazine} for brand {brand} is already assigned to truck {truck_no} on indent {indent_no}.")]
    DuplicateAcrossVehicles { brand: String, dispatch_type: DispatchType, magazine: String, truck_no: String, indent_no: String },

    #[error("Dispatch type and magazine are required for {slot} of item {item} (Load Case {load_case}).")]
    MissingDispatchDetails { slot: String, item: String, load_case: i64 },

    #[error("{0}")]
    VehicleIncomplete(String),

    #[error("Enter a load case for at least one item of indent {0}.")]
    NothingToAssign(String),

    #[error("Truck {truck_no} is already assigned to indent {indent_no}.")]
    DuplicateTruck { indent_no: String, truck_no: String },

    #[error("Total Load Case ({cumulative}) for item {item} exceeds required cases ({req_case}).")]
    ExceedsRequired { item: String, cumulative: i64, req_case: i64 },

    #[error("Vehicle assignment {0} does not exist.")]
    AssignmentNotFound(usize),

    #[error("There are no vehicle assignments to save.")]
    NoAssignments,

    #[error("FIFO selection applies only to magazine loading (ML) items; item {0} is not ML.")]
    FifoRequiresMagazineLoading(String),

    #[error("Batch {batch} is not part of the FIFO selection of item {item}.")]
    UnknownBatch { item: String, batch: String },

    #[error("Indent {0} is not selected on this loading sheet.")]
    IndentNotOnSheet(String),

    #[error("Invalid loading sheet number: {0}.")]
    InvalidSheetNumber(String),

    #[error("Loading sheet numbers for the month are exhausted after {0}.")]
    SheetNumberExhausted(String),
}

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
// O texto de `Display` é o mesmo que vai no corpo da resposta; os logs ficam em português.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("One or more fields are invalid.")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("Session {0} not found.")]
    SessionNotFound(Uuid),

    #[error("Session {0} belongs to another operator.")]
    SessionForbidden(Uuid),

    #[error("A submission for this session is already in progress.")]
    SubmissionInProgress(Uuid),

    #[error("Invalid or missing bearer token.")]
    InvalidToken,

    #[error("Loading sheet {0} not found.")]
    SheetNotFound(Uuid),

    #[error("Loading sheet number {0} already exists.")]
    SheetNumberTaken(String),

    // Falha do serviço externo; a mensagem do servidor é repassada ao usuário
    #[error("{0}")]
    Gateway(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("An unexpected error occurred.")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("An unexpected error occurred.")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Allocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SessionNotFound(_) | AppError::SheetNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionForbidden(_) => StatusCode::FORBIDDEN,
            AppError::SubmissionInProgress(_) | AppError::SheetNumberTaken(_) => StatusCode::CONFLICT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": self.to_string(),
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::Gateway(message) => {
                tracing::warn!("Falha no serviço de despacho: {}", message);
            }
            AppError::SessionForbidden(id) => {
                tracing::warn!(session_id = %id, "Acesso negado a sessão de outro operador");
            }
            // DatabaseError e InternalServerError viram 500; o log guarda a causa.
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {:?}", self);
            }
            _ => {}
        }

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
