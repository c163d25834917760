// src/db/pg_gateway.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        loading_sheet_repo::{SheetHeader, SheetItemRecord},
        IndentRepository, LoadingSheetRepository,
    },
    models::{
        allocation::{renumber, LoadingSheetNo, VehicleAssignment},
        indent::{BatchDetail, BatchQuery, Indent, IndentDataQuery, IndentProductRow},
        loading_sheet::{LoadingSheetPayload, SubmissionReceipt},
    },
    services::gateway::DispatchGateway,
};

/// `DispatchGateway` sobre o Postgres. Cada envio roda numa única transação.
#[derive(Clone)]
pub struct PgDispatchGateway {
    pool: PgPool,
    indent_repo: IndentRepository,
    sheet_repo: LoadingSheetRepository,
}

impl PgDispatchGateway {
    pub fn new(pool: PgPool) -> Self {
        Self {
            indent_repo: IndentRepository::new(pool.clone()),
            sheet_repo: LoadingSheetRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl DispatchGateway for PgDispatchGateway {
    async fn available_indents(&self) -> Result<Vec<Indent>, AppError> {
        self.indent_repo.open_indents().await
    }

    async fn fetch_indent_data(&self, query: &IndentDataQuery) -> Result<Vec<IndentProductRow>, AppError> {
        self.indent_repo.product_rows(query.disp_date, &query.indent_no).await
    }

    /// Lotes mais antigos primeiro, até cobrir `reqCase` caixas.
    async fn get_batch_details(&self, query: &BatchQuery) -> Result<Vec<BatchDetail>, AppError> {
        let in_stock = self.indent_repo.batches_in_stock(&query.bid, &query.size_code).await?;
        Ok(fifo_cover(in_stock, query.req_case))
    }

    /// Os números mostrados na sessão são prévia: aqui, sob o lock de numeração,
    /// cada folha recebe o número seguinte ao último gravado.
    async fn create_multi_truck_loading_sheet(
        &self,
        assignments: &[VehicleAssignment],
    ) -> Result<SubmissionReceipt, AppError> {
        let sheet_date = Utc::now().date_naive();
        let mut tx = self.pool.begin().await?;

        self.sheet_repo.lock_numbering(&mut *tx).await?;
        let last = parse_sheet_no(self.sheet_repo.last_loading_sheet_no(&mut *tx).await?)?;
        let stamped = renumber(assignments, last, sheet_date)?;

        for va in &stamped {
            let sheet_id = Uuid::new_v4();
            let header = SheetHeader::for_assignment(va, sheet_date);
            self.sheet_repo.insert_sheet(&mut *tx, sheet_id, &header).await?;

            for item in &va.items {
                self.sheet_repo
                    .insert_item(&mut *tx, sheet_id, &SheetItemRecord::from(item))
                    .await?;
            }
        }

        let mut indent_nos: Vec<String> = stamped.iter().map(|va| va.indent_no.clone()).collect();
        indent_nos.sort();
        indent_nos.dedup();
        let closed = self.indent_repo.close_fully_loaded(&mut *tx, &indent_nos).await?;

        tx.commit().await?;

        let receipt = SubmissionReceipt::for_assignments(&stamped);
        tracing::info!(
            sheets = stamped.len(),
            closed_indents = closed,
            first_sheet_no = ?receipt.loading_sheet_nos.first().map(ToString::to_string),
            "Folhas multi-caminhão gravadas"
        );
        Ok(receipt)
    }

    async fn create_loading_sheet(&self, payload: &LoadingSheetPayload) -> Result<Uuid, AppError> {
        let sheet_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        self.sheet_repo
            .insert_sheet(&mut *tx, sheet_id, &SheetHeader::from(payload))
            .await?;
        for row in &payload.indent_info_view_models {
            self.sheet_repo
                .insert_item(&mut *tx, sheet_id, &SheetItemRecord::from(row))
                .await?;
        }

        tx.commit().await?;
        Ok(sheet_id)
    }

    /// Substitui cabeçalho e itens de uma folha existente.
    async fn update_loading_sheet(&self, id: Uuid, payload: &LoadingSheetPayload) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        if !self.sheet_repo.update_sheet(&mut *tx, id, &SheetHeader::from(payload)).await? {
            return Err(AppError::SheetNotFound(id));
        }
        self.sheet_repo.delete_items(&mut *tx, id).await?;
        for row in &payload.indent_info_view_models {
            self.sheet_repo
                .insert_item(&mut *tx, id, &SheetItemRecord::from(row))
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn last_loading_sheet_no(&self) -> Result<Option<LoadingSheetNo>, AppError> {
        let last = self.sheet_repo.last_loading_sheet_no(self.sheet_repo.pool()).await?;
        parse_sheet_no(last)
    }
}

fn parse_sheet_no(raw: Option<String>) -> Result<Option<LoadingSheetNo>, AppError> {
    match raw {
        Some(raw) => Ok(Some(raw.parse()?)),
        None => Ok(None),
    }
}

fn fifo_cover(in_stock: Vec<BatchDetail>, req_case: i64) -> Vec<BatchDetail> {
    let mut covered = 0;
    let mut picked = Vec::new();
    for batch in in_stock {
        if covered >= req_case {
            break;
        }
        covered += batch.distinct_count;
        picked.push(batch);
    }
    picked
}
