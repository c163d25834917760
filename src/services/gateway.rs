// src/services/gateway.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        allocation::{LoadingSheetNo, VehicleAssignment},
        indent::{BatchDetail, BatchQuery, Indent, IndentDataQuery, IndentProductRow},
        loading_sheet::{LoadingSheetPayload, SubmissionReceipt},
    },
};

/// Serviços externos de que o motor de alocação depende.
/// A implementação de produção fica em `db::PgDispatchGateway`.
#[async_trait]
pub trait DispatchGateway: Send + Sync {
    /// Indents ainda abertos para seleção, já com os itens.
    async fn available_indents(&self) -> Result<Vec<Indent>, AppError>;

    async fn fetch_indent_data(&self, query: &IndentDataQuery) -> Result<Vec<IndentProductRow>, AppError>;

    async fn get_batch_details(&self, query: &BatchQuery) -> Result<Vec<BatchDetail>, AppError>;

    /// Envia todas as folhas multi-caminhão numa única chamada. Tudo ou nada.
    /// Os números são emitidos na gravação; o recibo traz os que ficaram gravados.
    async fn create_multi_truck_loading_sheet(
        &self,
        assignments: &[VehicleAssignment],
    ) -> Result<SubmissionReceipt, AppError>;

    async fn create_loading_sheet(&self, payload: &LoadingSheetPayload) -> Result<Uuid, AppError>;

    async fn update_loading_sheet(&self, id: Uuid, payload: &LoadingSheetPayload) -> Result<Uuid, AppError>;

    /// Último número de folha emitido, se houver.
    async fn last_loading_sheet_no(&self) -> Result<Option<LoadingSheetNo>, AppError>;
}
