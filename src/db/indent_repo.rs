// src/db/indent_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::indent::{BatchDetail, Indent, IndentHeader, IndentItem, IndentProductRow},
};

// Linha de item com o número do indent, para agrupar depois
#[derive(Debug, FromRow)]
struct IndentItemRow {
    indent_no: String,
    #[sqlx(flatten)]
    item: IndentItem,
}

#[derive(Clone)]
pub struct IndentRepository {
    pool: PgPool,
}

impl IndentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura (usa a pool principal)
    // ---

    /// Indents abertos com os itens. `remCase` desconta o que folhas já salvas carregaram.
    pub async fn open_indents(&self) -> Result<Vec<Indent>, AppError> {
        let headers = sqlx::query_as::<_, IndentHeader>(
            r#"
            SELECT indent_no, indent_dt, peso_dt, cust_name, con_name, con_no
            FROM indents
            WHERE status = 'OPEN'
            ORDER BY indent_dt ASC, indent_no ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let indent_nos: Vec<String> = headers.iter().map(|h| h.indent_no.clone()).collect();
        let rows = sqlx::query_as::<_, IndentItemRow>(
            r#"
            SELECT
                ii.indent_no,
                ii.id, ii.bname, ii.psize, ii.bid, ii.class, ii.div,
                ii.l1_net_wt, ii.unit, ii.size_code, ii.ptype, ii.ptype_code,
                ii.req_case, ii.req_wt,
                GREATEST(ii.req_case - COALESCE(loaded.total, 0), 0)::BIGINT AS rem_case,
                0::BIGINT AS load_case
            FROM indent_items ii
            LEFT JOIN (
                SELECT item_key, SUM(load_case)::BIGINT AS total
                FROM loading_sheet_items
                GROUP BY item_key
            ) loaded ON loaded.item_key = ii.id
            WHERE ii.indent_no = ANY($1)
            ORDER BY ii.indent_no, ii.position, ii.id
            "#,
        )
            .bind(&indent_nos)
            .fetch_all(&self.pool)
            .await?;

        let indents = headers
            .into_iter()
            .map(|header| {
                let indent_items = rows
                    .iter()
                    .filter(|row| row.indent_no == header.indent_no)
                    .map(|row| row.item.clone())
                    .collect();
                Indent {
                    indent_no: header.indent_no,
                    indent_dt: header.indent_dt,
                    peso_dt: header.peso_dt,
                    cust_name: header.cust_name,
                    con_name: header.con_name,
                    con_no: header.con_no,
                    indent_items,
                }
            })
            .collect();

        Ok(indents)
    }

    /// Linhas de produto agregadas por marca para um indent numa data de despacho.
    pub async fn product_rows(&self, disp_date: NaiveDate, indent_no: &str) -> Result<Vec<IndentProductRow>, AppError> {
        let rows = sqlx::query_as::<_, IndentProductRow>(
            r#"
            SELECT
                ii.bname AS brand_name,
                SUM(ii.req_wt) AS quantity,
                ii.unit,
                ii.class AS str_class,
                SUM(ii.req_case)::BIGINT AS count,
                ii.indent_no
            FROM indent_items ii
            JOIN indents d ON d.indent_no = ii.indent_no
            WHERE d.indent_no = $1 AND d.disp_date = $2
            GROUP BY ii.indent_no, ii.bname, ii.unit, ii.class
            ORDER BY ii.bname
            "#,
        )
            .bind(indent_no)
            .bind(disp_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Lotes com caixas ainda não despachadas, do mais antigo para o mais novo.
    pub async fn batches_in_stock(&self, bid: &str, size_code: &str) -> Result<Vec<BatchDetail>, AppError> {
        let batches = sqlx::query_as::<_, BatchDetail>(
            r#"
            SELECT batch, COUNT(DISTINCT case_no)::BIGINT AS distinct_count
            FROM stock_cases
            WHERE bid = $1 AND size_code = $2 AND NOT dispatched
            GROUP BY batch
            ORDER BY MIN(mfg_dt) ASC, batch ASC
            "#,
        )
            .bind(bid)
            .bind(size_code)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    // ---
    // Escrita (recebe o executor da transação)
    // ---

    /// Fecha os indents cujos itens já foram totalmente carregados.
    pub async fn close_fully_loaded<'e, E>(&self, executor: E, indent_nos: &[String]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE indents d
            SET status = 'DISPATCHED'
            WHERE d.indent_no = ANY($1)
              AND NOT EXISTS (
                SELECT 1
                FROM indent_items ii
                WHERE ii.indent_no = d.indent_no
                  AND ii.req_case > COALESCE(
                      (SELECT SUM(lsi.load_case) FROM loading_sheet_items lsi WHERE lsi.item_key = ii.id),
                      0
                  )
              )
            "#,
        )
            .bind(indent_nos)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
