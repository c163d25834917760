// src/models/allocation.rs

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AllocationError;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum DispatchType {
    #[serde(rename = "DD")]
    DirectDispatch,
    #[serde(rename = "ML")]
    MagazineLoading,
}

impl DispatchType {
    pub fn code(self) -> &'static str {
        match self {
            DispatchType::DirectDispatch => "DD",
            DispatchType::MagazineLoading => "ML",
        }
    }
}

impl std::fmt::Display for DispatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// --- Alocação (principal ou split) ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub dispatch_type: Option<DispatchType>,
    pub magazine: Option<String>,
    pub load_case: i64,
    pub load_wt: Decimal,
}

impl Allocation {
    /// O par (dispatchType, magazine), quando os dois já foram escolhidos.
    pub fn combination(&self) -> Option<(DispatchType, &str)> {
        match (self.dispatch_type, self.magazine.as_deref()) {
            (Some(dt), Some(mag)) if !mag.is_empty() => Some((dt, mag)),
            _ => None,
        }
    }
}

/// Identificador estável de um split. A ordem exibida ao usuário é derivada da posição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SplitId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitAllocation {
    pub id: SplitId,
    #[serde(flatten)]
    pub allocation: Allocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "kind", content = "splitId")]
pub enum Slot {
    #[default]
    Main,
    Split(SplitId),
}

// --- Avisos transitórios ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

// --- Formulário do veículo ---
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleForm {
    #[validate(length(min = 1, message = "Transporter is required."))]
    #[schema(example = "Acme Logistics")]
    pub transporter_name: String,
    #[validate(length(min = 1, message = "Truck number is required."))]
    #[schema(example = "MH12AB1234")]
    pub truck_no: String,
    #[serde(default)]
    pub license_no: String,
    pub validity: Option<NaiveDate>,
}

// --- Item atribuído a um caminhão (contexto completo para envio) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedItem {
    pub id: String,
    pub bid: String,
    pub bname: String,
    pub psize: String,
    pub class: String,
    pub div: String,
    pub dispatch_type: DispatchType,
    pub magazine: String,
    pub indent_no: String,
    pub indent_dt: DateTime<Utc>,
    pub l1_net_wt: Decimal,
    pub load_wt: Decimal,
    pub load_case: i64,
    pub rem_wt: Decimal,
    pub rem_case: i64,
    pub req_case: i64,
    pub req_wt: Decimal,
    pub size_code: String,
    pub unit: String,
    pub ptype: String,
    pub ptype_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleAssignment {
    pub indent_no: String,
    pub loading_sheet_no: LoadingSheetNo,
    pub transporter_name: String,
    pub truck_no: String,
    pub license_no: String,
    pub validity: Option<NaiveDate>,
    pub items: Vec<AssignedItem>,
}

// --- Número da folha de carregamento: SHEET<yyyy><MM><nnnn> ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadingSheetNo {
    pub year: i32,
    pub month: u32,
    pub counter: u32,
}

const SHEET_PREFIX: &str = "SHEET";
const MAX_COUNTER: u32 = 9999;

impl LoadingSheetNo {
    /// Primeiro número do mês da data informada.
    pub fn first_of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month(), counter: 1 }
    }

    pub fn next(self) -> Result<Self, AllocationError> {
        if self.counter >= MAX_COUNTER {
            return Err(AllocationError::SheetNumberExhausted(self.to_string()));
        }
        Ok(Self { counter: self.counter + 1, ..self })
    }

    /// Próximo número a partir do último emitido. Um último número de outro mês reinicia o contador.
    pub fn following(last: Option<Self>, today: NaiveDate) -> Result<Self, AllocationError> {
        let first = Self::first_of(today);
        match last {
            Some(prev) if prev.year == first.year && prev.month == first.month => prev.next(),
            _ => Ok(first),
        }
    }
}

/// Números definitivos de um lote de folhas, emitidos na hora da gravação depois do
/// último número salvo. A numeração mostrada durante a sessão é só uma prévia.
pub fn renumber(
    assignments: &[VehicleAssignment],
    last: Option<LoadingSheetNo>,
    today: NaiveDate,
) -> Result<Vec<VehicleAssignment>, AllocationError> {
    let mut last = last;
    let mut stamped = Vec::with_capacity(assignments.len());
    for va in assignments {
        let no = LoadingSheetNo::following(last, today)?;
        stamped.push(VehicleAssignment { loading_sheet_no: no, ..va.clone() });
        last = Some(no);
    }
    Ok(stamped)
}

impl std::fmt::Display for LoadingSheetNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:04}{:02}{:04}", SHEET_PREFIX, self.year, self.month, self.counter)
    }
}

impl std::str::FromStr for LoadingSheetNo {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AllocationError::InvalidSheetNumber(s.to_string());

        let digits = s.strip_prefix(SHEET_PREFIX).ok_or_else(invalid)?;
        if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year = digits[0..4].parse().map_err(|_| invalid())?;
        let month: u32 = digits[4..6].parse().map_err(|_| invalid())?;
        let counter = digits[6..10].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self { year, month, counter })
    }
}

impl Serialize for LoadingSheetNo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LoadingSheetNo {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// Na documentação o número aparece como texto, igual ao JSON
impl utoipa::PartialSchema for LoadingSheetNo {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        utoipa::openapi::ObjectBuilder::new()
            .schema_type(utoipa::openapi::schema::Type::String)
            .examples([serde_json::json!("SHEET2024070001")])
            .into()
    }
}

impl ToSchema for LoadingSheetNo {}
