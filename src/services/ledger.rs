// src/services/ledger.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::{
    common::error::AllocationError,
    models::{
        allocation::VehicleAssignment,
        indent::{IndentItem, ItemKey},
    },
};

// Saldo de um item do indent: quanto foi exigido, carregado e o que resta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub req_case: i64,
    #[serde(rename = "loadcase")]
    pub load_case: i64,
    #[serde(rename = "remcase")]
    pub rem_case: i64,
}

impl LedgerEntry {
    /// O que folhas já salvas carregaram conta como carregado desde o início.
    fn seeded(item: &IndentItem) -> Self {
        let req_case = item.req_case.max(0);
        let load_case = item.saved_load();
        Self { req_case, load_case, rem_case: req_case - load_case }
    }

    pub fn is_balanced(&self) -> bool {
        self.load_case + self.rem_case == self.req_case
    }
}

/// Fonte única de verdade de "quanto do item X ainda falta alocar".
/// Toda mutação devolve um novo ledger; o original fica intacto quando há erro.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    entries: BTreeMap<ItemKey, LedgerEntry>,
    // "bname psize" de cada item, para as mensagens de rejeição
    #[serde(skip)]
    labels: BTreeMap<ItemKey, String>,
}

impl Ledger {
    pub fn load_indent(items: &[IndentItem]) -> Self {
        let entries = items
            .iter()
            .map(|item| (item.key(), LedgerEntry::seeded(item)))
            .collect();
        let labels = items.iter().map(|item| (item.key(), item.label())).collect();
        Self { entries, labels }
    }

    pub fn entry(&self, key: &ItemKey) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ItemKey, &LedgerEntry)> {
        self.entries.iter()
    }

    pub fn remaining(&self, key: &ItemKey) -> Result<i64, AllocationError> {
        self.entries
            .get(key)
            .map(|entry| entry.rem_case)
            .ok_or_else(|| AllocationError::UnknownItem(key.to_string()))
    }

    pub fn is_fully_allocated(&self) -> bool {
        !self.entries.is_empty() && self.entries.values().all(|entry| entry.rem_case == 0)
    }

    /// Baixa as quantidades de um caminhão. Tudo ou nada: a soma por item não pode passar do restante.
    pub fn commit(&self, assignment: &VehicleAssignment) -> Result<Self, AllocationError> {
        let mut next = self.clone();

        for (key, (row_label, total)) in per_item_totals(assignment) {
            let label = next.labels.get(&key).cloned().unwrap_or(row_label);
            let entry = next
                .entries
                .get_mut(&key)
                .ok_or_else(|| AllocationError::UnknownItem(label.clone()))?;

            if total > entry.rem_case {
                return Err(AllocationError::ExceedsRemaining {
                    slot: format!("truck {}", assignment.truck_no),
                    item: label,
                    requested: total,
                    available: entry.rem_case,
                });
            }

            entry.rem_case -= total;
            entry.load_case += total;
        }

        Ok(next)
    }

    /// Inverso de `commit`, limitado a [0, reqCase].
    pub fn rollback(&self, assignment: &VehicleAssignment) -> Self {
        let mut next = self.clone();

        for (key, (_, total)) in per_item_totals(assignment) {
            if let Some(entry) = next.entries.get_mut(&key) {
                let load_case = (entry.load_case - total).clamp(0, entry.req_case);
                entry.load_case = load_case;
                entry.rem_case = entry.req_case - load_case;
            }
        }

        next
    }
}

fn per_item_totals(assignment: &VehicleAssignment) -> BTreeMap<ItemKey, (String, i64)> {
    let mut totals: BTreeMap<ItemKey, (String, i64)> = BTreeMap::new();
    for item in &assignment.items {
        let slot = totals
            .entry(ItemKey(item.id.clone()))
            .or_insert_with(|| (format!("{} {}", item.bname, item.psize), 0));
        slot.1 += item.load_case;
    }
    totals
}

// ---
// Conversão de quantidades digitadas
// ---

/// Caixas precisam ser inteiras e não negativas.
pub fn whole_cases(value: Decimal) -> Option<i64> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    if !value.fract().is_zero() {
        return None;
    }
    value.trunc().to_i64()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightRejection {
    NonPositive,
    MissingNetWeight,
    NotWholeCases,
}

/// loadCase = loadWt / l1NetWt, aceito só quando o resultado é um número inteiro de caixas.
pub fn cases_from_weight(load_wt: Decimal, l1_net_wt: Decimal) -> Result<i64, WeightRejection> {
    if load_wt <= Decimal::ZERO {
        return Err(WeightRejection::NonPositive);
    }
    if l1_net_wt <= Decimal::ZERO {
        return Err(WeightRejection::MissingNetWeight);
    }

    let cases = load_wt
        .checked_div(l1_net_wt)
        .ok_or(WeightRejection::NotWholeCases)?;

    whole_cases(cases).ok_or(WeightRejection::NotWholeCases)
}
