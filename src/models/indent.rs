// src/models/indent.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use sqlx::FromRow;
use validator::Validate;

// --- 1. Linha de produto de um indent ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndentItem {
    #[serde(default)]
    pub id: Option<String>,
    pub bname: String,
    pub psize: String,
    pub bid: String,
    pub class: String,
    pub div: String,
    pub l1_net_wt: Decimal,
    pub unit: String,
    #[serde(default)]
    pub size_code: String,
    #[serde(default)]
    pub ptype: String,
    #[serde(default)]
    pub ptype_code: String,

    // Quantidade exigida: imutável durante a vida do indent
    pub req_case: i64,
    pub req_wt: Decimal,

    #[serde(default, alias = "remcase")]
    pub rem_case: i64,
    #[serde(default, rename = "loadcase")]
    pub load_case: i64,
}

impl IndentItem {
    /// Chave estável do item. O composto `bname-psize` só existe para indents antigos sem `id`.
    pub fn key(&self) -> ItemKey {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => ItemKey(id.to_string()),
            _ => ItemKey(format!("{}-{}", self.bname, self.psize)),
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.bname, self.psize)
    }

    /// Caixas já gravadas em folhas anteriores (reqCase - remCase).
    pub fn saved_load(&self) -> i64 {
        let req_case = self.req_case.max(0);
        req_case - self.rem_case.clamp(0, req_case)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ItemKey(pub String);

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- 2. Indent disponível para seleção ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Indent {
    pub indent_no: String,
    pub indent_dt: DateTime<Utc>,
    pub peso_dt: Option<DateTime<Utc>>,
    pub cust_name: String,
    pub con_name: Option<String>,
    pub con_no: Option<String>,
    pub indent_items: Vec<IndentItem>,
}

// Cabeçalho do indent, como vem da tabela `indents`
#[derive(Debug, Clone, FromRow)]
pub struct IndentHeader {
    pub indent_no: String,
    pub indent_dt: DateTime<Utc>,
    pub peso_dt: Option<DateTime<Utc>>,
    pub cust_name: String,
    pub con_name: Option<String>,
    pub con_no: Option<String>,
}

// --- 3. Busca de linhas de produto (fetchIndentData) ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndentDataQuery {
    pub disp_date: NaiveDate,
    #[validate(length(min = 1, message = "indentNo is required."))]
    #[schema(example = "IND-2024-0042")]
    pub indent_no: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndentProductRow {
    pub brand_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub str_class: String,
    pub count: i64,
    pub indent_no: String,
}

// --- 4. Lotes para seleção FIFO (getBatchDetails) ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    #[validate(length(min = 1, message = "bid is required."))]
    pub bid: String,
    #[validate(length(min = 1, message = "sizeCode is required."))]
    pub size_code: String,
    #[validate(range(min = 1, message = "reqCase must be positive."))]
    pub req_case: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    pub batch: String,
    pub distinct_count: i64,
}
