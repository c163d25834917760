// src/models/loading_sheet.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::allocation::{DispatchType, LoadingSheetNo, VehicleAssignment};
use super::indent::{Indent, IndentItem};

// Seleção de lote para itens com política FIFO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSelection {
    pub batch: String,
    pub is_fifo: bool,
}

// --- Linha de item dentro de um indent selecionado (folha de um caminhão) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetItem {
    #[serde(flatten)]
    pub item: IndentItem,
    pub indent_no: String,
    pub indent_dt: DateTime<Utc>,
    pub dispatch_type: Option<DispatchType>,
    pub magazine: Option<String>,
    pub load_case: i64,
    pub load_wt: Decimal,
    pub rem_wt: Decimal,
    #[serde(default)]
    pub batches: Option<Vec<BatchSelection>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedIndent {
    pub indent_no: String,
    pub indent_dt: DateTime<Utc>,
    pub cust_name: String,
    pub indent_items: Vec<SheetItem>,
}

impl SelectedIndent {
    /// Indent recém-selecionado: nada carregado ainda, tudo restante.
    pub fn from_indent(indent: &Indent) -> Self {
        let indent_items = indent
            .indent_items
            .iter()
            .map(|item| SheetItem {
                item: item.clone(),
                indent_no: indent.indent_no.clone(),
                indent_dt: indent.indent_dt,
                dispatch_type: None,
                magazine: None,
                load_case: 0,
                load_wt: Decimal::ZERO,
                rem_wt: Decimal::from(item.rem_case) * item.l1_net_wt,
                batches: None,
            })
            .collect();

        Self {
            indent_no: indent.indent_no.clone(),
            indent_dt: indent.indent_dt,
            cust_name: indent.cust_name.clone(),
            indent_items,
        }
    }
}

// --- Folha de carregamento de um único caminhão ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadingSheet {
    // Presente apenas quando a folha já existe (update)
    #[serde(default)]
    pub id: Option<Uuid>,
    pub date: NaiveDate,
    pub loading_sheet_no: LoadingSheetNo,
    #[validate(length(min = 1, message = "Truck number is required."))]
    pub truck_no: String,
    #[validate(length(min = 1, message = "Transporter is required."))]
    pub transporter_name: String,
    #[serde(default)]
    pub license_no: String,
    pub validity: Option<NaiveDate>,
    #[serde(default)]
    pub indents: Vec<SelectedIndent>,
}

/// Corpo enviado para createLoadingSheet / updateLoadingSheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadingSheetPayload {
    pub id: Option<Uuid>,
    pub date: NaiveDate,
    pub loading_sheet_no: LoadingSheetNo,
    pub truck_no: String,
    pub transporter_name: String,
    pub license_no: String,
    pub validity: Option<NaiveDate>,
    pub indent_info_view_models: Vec<SheetItem>,
}

impl From<&LoadingSheet> for LoadingSheetPayload {
    fn from(sheet: &LoadingSheet) -> Self {
        Self {
            id: sheet.id,
            date: sheet.date,
            loading_sheet_no: sheet.loading_sheet_no,
            truck_no: sheet.truck_no.clone(),
            transporter_name: sheet.transporter_name.clone(),
            license_no: sheet.license_no.clone(),
            validity: sheet.validity,
            indent_info_view_models: sheet
                .indents
                .iter()
                .flat_map(|indent| indent.indent_items.iter().cloned())
                .collect(),
        }
    }
}

// --- Dados para a tela de criação (getCreateLoadingData) ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreationData {
    pub next_loading_sheet_no: LoadingSheetNo,
    pub available_indents_for_selection: Vec<Indent>,
}

// Resposta do envio em lote das folhas multi-caminhão
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub loading_sheet_nos: Vec<LoadingSheetNo>,
}

impl SubmissionReceipt {
    pub fn for_assignments(assignments: &[VehicleAssignment]) -> Self {
        Self {
            loading_sheet_nos: assignments.iter().map(|va| va.loading_sheet_no).collect(),
        }
    }
}

// Resposta de create/update de uma folha de um caminhão
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedLoadingSheet {
    pub id: Uuid,
    pub loading_sheet_no: LoadingSheetNo,
}
