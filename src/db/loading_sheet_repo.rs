// src/db/loading_sheet_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        allocation::{AssignedItem, DispatchType, VehicleAssignment},
        loading_sheet::{LoadingSheetPayload, SheetItem},
    },
};

// --- Registros gravados ---
#[derive(Debug, Clone)]
pub struct SheetHeader {
    pub loading_sheet_no: String,
    pub sheet_date: NaiveDate,
    pub truck_no: String,
    pub transporter_name: String,
    pub license_no: String,
    pub validity: Option<NaiveDate>,
}

impl SheetHeader {
    pub fn for_assignment(va: &VehicleAssignment, sheet_date: NaiveDate) -> Self {
        Self {
            loading_sheet_no: va.loading_sheet_no.to_string(),
            sheet_date,
            truck_no: va.truck_no.clone(),
            transporter_name: va.transporter_name.clone(),
            license_no: va.license_no.clone(),
            validity: va.validity,
        }
    }
}

impl From<&LoadingSheetPayload> for SheetHeader {
    fn from(payload: &LoadingSheetPayload) -> Self {
        Self {
            loading_sheet_no: payload.loading_sheet_no.to_string(),
            sheet_date: payload.date,
            truck_no: payload.truck_no.clone(),
            transporter_name: payload.transporter_name.clone(),
            license_no: payload.license_no.clone(),
            validity: payload.validity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetItemRecord {
    pub indent_no: String,
    pub item_key: String,
    pub bname: String,
    pub psize: String,
    pub dispatch_type: Option<DispatchType>,
    pub magazine: Option<String>,
    pub load_case: i64,
    pub load_wt: Decimal,
    pub batches: Option<serde_json::Value>,
}

impl From<&AssignedItem> for SheetItemRecord {
    fn from(item: &AssignedItem) -> Self {
        Self {
            indent_no: item.indent_no.clone(),
            item_key: item.id.clone(),
            bname: item.bname.clone(),
            psize: item.psize.clone(),
            dispatch_type: Some(item.dispatch_type),
            magazine: Some(item.magazine.clone()),
            load_case: item.load_case,
            load_wt: item.load_wt,
            batches: None,
        }
    }
}

impl From<&SheetItem> for SheetItemRecord {
    fn from(row: &SheetItem) -> Self {
        Self {
            indent_no: row.indent_no.clone(),
            item_key: row.item.key().0,
            bname: row.item.bname.clone(),
            psize: row.item.psize.clone(),
            dispatch_type: row.dispatch_type,
            magazine: row.magazine.clone(),
            load_case: row.load_case,
            load_wt: row.load_wt,
            batches: row.batches.as_ref().and_then(|b| serde_json::to_value(b).ok()),
        }
    }
}

// Chave do advisory lock que protege a numeração das folhas
const SHEET_NUMBERING_LOCK: i64 = 0x5348_4545_54;

#[derive(Clone)]
pub struct LoadingSheetRepository {
    pool: PgPool,
}

impl LoadingSheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Maior número de folha já gravado. O formato zero-padded ordena como texto.
    pub async fn last_loading_sheet_no<'e, E>(&self, executor: E) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let last = sqlx::query_scalar::<_, String>(
            "SELECT loading_sheet_no FROM loading_sheets ORDER BY loading_sheet_no DESC LIMIT 1",
        )
            .fetch_optional(executor)
            .await?;
        Ok(last)
    }

    /// Serializa a emissão de números até o fim da transação corrente.
    pub async fn lock_numbering<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SHEET_NUMBERING_LOCK)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_sheet<'e, E>(&self, executor: E, id: Uuid, header: &SheetHeader) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO loading_sheets (
                id, loading_sheet_no, sheet_date, truck_no, transporter_name, license_no, validity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(id)
            .bind(&header.loading_sheet_no)
            .bind(header.sheet_date)
            .bind(&header.truck_no)
            .bind(&header.transporter_name)
            .bind(&header.license_no)
            .bind(header.validity)
            .execute(executor)
            .await
            .map_err(|e| sheet_number_conflict(e, &header.loading_sheet_no))?;

        Ok(())
    }

    /// Atualiza o cabeçalho. Devolve `false` quando a folha não existe.
    pub async fn update_sheet<'e, E>(&self, executor: E, id: Uuid, header: &SheetHeader) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE loading_sheets
            SET loading_sheet_no = $2, sheet_date = $3, truck_no = $4,
                transporter_name = $5, license_no = $6, validity = $7
            WHERE id = $1
            "#,
        )
            .bind(id)
            .bind(&header.loading_sheet_no)
            .bind(header.sheet_date)
            .bind(&header.truck_no)
            .bind(&header.transporter_name)
            .bind(&header.license_no)
            .bind(header.validity)
            .execute(executor)
            .await
            .map_err(|e| sheet_number_conflict(e, &header.loading_sheet_no))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_item<'e, E>(&self, executor: E, sheet_id: Uuid, item: &SheetItemRecord) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO loading_sheet_items (
                loading_sheet_id, indent_no, item_key, bname, psize,
                dispatch_type, magazine, load_case, load_wt, batches
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
            .bind(sheet_id)
            .bind(&item.indent_no)
            .bind(&item.item_key)
            .bind(&item.bname)
            .bind(&item.psize)
            .bind(item.dispatch_type.map(DispatchType::code))
            .bind(&item.magazine)
            .bind(item.load_case)
            .bind(item.load_wt)
            .bind(&item.batches)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn delete_items<'e, E>(&self, executor: E, sheet_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM loading_sheet_items WHERE loading_sheet_id = $1")
            .bind(sheet_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

// Número de folha repetido vira conflito; o resto segue como erro de banco
fn sheet_number_conflict(e: sqlx::Error, loading_sheet_no: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some("loading_sheets_loading_sheet_no_key") {
            return AppError::SheetNumberTaken(loading_sheet_no.to_string());
        }
    }
    e.into()
}
