// src/services/vehicle_aggregator.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AllocationError,
    models::{
        allocation::{
            AssignedItem, DispatchType, LoadingSheetNo, Notice, Slot, SplitId, VehicleAssignment, VehicleForm,
        },
        indent::{Indent, ItemKey},
    },
    services::{
        assignment_builder::{AssignmentDraft, Edit, ItemDraftView},
        ledger::Ledger,
    },
};

// --- Ações do usuário sobre uma sessão multi-caminhão ---
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    SelectIndent { indent_no: String },
    SetDispatchType {
        item_id: ItemKey,
        #[serde(default)]
        slot: Slot,
        dispatch_type: DispatchType,
        checked: bool,
    },
    SetMagazine {
        item_id: ItemKey,
        #[serde(default)]
        slot: Slot,
        magazine: Option<String>,
    },
    SetLoadCase {
        item_id: ItemKey,
        #[serde(default)]
        slot: Slot,
        load_case: Decimal,
    },
    AddSplit { item_id: ItemKey },
    RemoveSplit { item_id: ItemKey, split_id: SplitId },
    OpenVehicleDialog,
    CloseVehicleDialog,
    AssignVehicle { vehicle: VehicleForm },
    RemoveAssignment { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Unselected,
    Selected,
    AssigningVehicle,
    AllItemsAllocated,
    Saved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AllocationState,
    pub notices: Vec<Notice>,
}

impl Transition {
    fn quiet(state: AllocationState) -> Self {
        Self { state, notices: Vec::new() }
    }
}

/// Estado completo de alocação de uma sessão. Toda ação gera um estado novo.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationState {
    available_indents: Vec<Indent>,
    selected: Option<Indent>,
    ledger: Ledger,
    draft: AssignmentDraft,
    assignments: Vec<VehicleAssignment>,
    loading_sheet_no: LoadingSheetNo,
    vehicle_dialog_open: bool,
    saved: bool,
}

impl AllocationState {
    pub fn new(available_indents: Vec<Indent>, loading_sheet_no: LoadingSheetNo) -> Self {
        Self {
            available_indents,
            selected: None,
            ledger: Ledger::default(),
            draft: AssignmentDraft::default(),
            assignments: Vec::new(),
            loading_sheet_no,
            vehicle_dialog_open: false,
            saved: false,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn draft(&self) -> &AssignmentDraft {
        &self.draft
    }

    pub fn assignments(&self) -> &[VehicleAssignment] {
        &self.assignments
    }

    pub fn loading_sheet_no(&self) -> LoadingSheetNo {
        self.loading_sheet_no
    }

    pub fn selected(&self) -> Option<&Indent> {
        self.selected.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match &self.selected {
            None if self.saved => Phase::Saved,
            None => Phase::Unselected,
            Some(_) if self.vehicle_dialog_open => Phase::AssigningVehicle,
            Some(_) if self.ledger.is_fully_allocated() => Phase::AllItemsAllocated,
            Some(_) => Phase::Selected,
        }
    }

    pub fn reduce(&self, action: Action) -> Result<Transition, AllocationError> {
        match action {
            Action::SelectIndent { indent_no } => self.select_indent(&indent_no).map(Transition::quiet),
            Action::SetDispatchType { item_id, slot, dispatch_type, checked } => {
                let edit = self.draft.set_dispatch_type(&item_id, slot, dispatch_type, checked)?;
                Ok(self.with_edit(edit))
            }
            Action::SetMagazine { item_id, slot, magazine } => {
                let edit = self.draft.set_magazine(&item_id, slot, magazine)?;
                Ok(self.with_edit(edit))
            }
            Action::SetLoadCase { item_id, slot, load_case } => {
                let draft = self.draft.set_load_case(&item_id, slot, load_case)?;
                Ok(Transition::quiet(Self { draft, ..self.clone() }))
            }
            Action::AddSplit { item_id } => {
                let (draft, _) = self.draft.add_split(&item_id)?;
                Ok(Transition::quiet(Self { draft, ..self.clone() }))
            }
            Action::RemoveSplit { item_id, split_id } => {
                let draft = self.draft.remove_split(&item_id, split_id)?;
                Ok(Transition::quiet(Self { draft, ..self.clone() }))
            }
            Action::OpenVehicleDialog => {
                let indent = self.selected.as_ref().ok_or(AllocationError::NoIndentSelected)?;
                if !self.draft.has_load() {
                    return Err(AllocationError::NothingToAssign(indent.indent_no.clone()));
                }
                Ok(Transition::quiet(Self { vehicle_dialog_open: true, ..self.clone() }))
            }
            Action::CloseVehicleDialog => Ok(Transition::quiet(Self { vehicle_dialog_open: false, ..self.clone() })),
            Action::AssignVehicle { vehicle } => self.assign_vehicle(&vehicle),
            Action::RemoveAssignment { index } => self.remove_assignment(index),
        }
    }

    /// Estado a guardar depois de uma ação rejeitada: o ledger nunca muda, e uma quantidade
    /// inválida volta ao último valor válido (0).
    pub fn after_rejection(&self, action: &Action) -> Self {
        match action {
            Action::SetLoadCase { item_id, slot, .. } => Self {
                draft: self.draft.reset_quantity(item_id, *slot),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }

    fn with_edit(&self, edit: Edit) -> Transition {
        Transition {
            state: Self { draft: edit.draft, ..self.clone() },
            notices: edit.notices,
        }
    }

    // ---
    // Seleção do indent
    // ---

    fn select_indent(&self, indent_no: &str) -> Result<Self, AllocationError> {
        let indent = self
            .available_indents
            .iter()
            .find(|indent| indent.indent_no == indent_no)
            .cloned()
            .ok_or_else(|| AllocationError::IndentNotAvailable(indent_no.to_string()))?;

        // Caminhões ainda não salvos deste indent continuam valendo no ledger
        let mut ledger = Ledger::load_indent(&indent.indent_items);
        for va in self.assignments.iter().filter(|va| va.indent_no == indent.indent_no) {
            ledger = ledger.commit(va)?;
        }

        let draft = fresh_draft(&indent, &ledger);
        Ok(Self {
            selected: Some(indent),
            ledger,
            draft,
            vehicle_dialog_open: false,
            saved: false,
            ..self.clone()
        })
    }

    // ---
    // Atribuição do veículo
    // ---

    fn assign_vehicle(&self, vehicle: &VehicleForm) -> Result<Transition, AllocationError> {
        let indent = self.selected.as_ref().ok_or(AllocationError::NoIndentSelected)?;

        // 1. Transportadora e caminhão obrigatórios; alguma carga no rascunho
        if let Err(errors) = vehicle.validate() {
            return Err(AllocationError::VehicleIncomplete(first_message(&errors)));
        }
        if !self.draft.has_load() {
            return Err(AllocationError::NothingToAssign(indent.indent_no.clone()));
        }

        // 2. O mesmo caminhão não pode aparecer duas vezes no mesmo indent
        let truck_no = vehicle.truck_no.trim();
        if self
            .assignments
            .iter()
            .any(|va| va.indent_no == indent.indent_no && va.truck_no == truck_no)
        {
            return Err(AllocationError::DuplicateTruck {
                indent_no: indent.indent_no.clone(),
                truck_no: truck_no.to_string(),
            });
        }

        // 3. Cada alocação com carga precisa de tipo + magazine e não pode passar do exigido
        let items = self.collect_items(indent)?;

        let assignment = VehicleAssignment {
            indent_no: indent.indent_no.clone(),
            loading_sheet_no: self.loading_sheet_no,
            transporter_name: vehicle.transporter_name.trim().to_string(),
            truck_no: truck_no.to_string(),
            license_no: vehicle.license_no.trim().to_string(),
            validity: vehicle.validity,
            items,
        };

        // 4. (marca, tipo, magazine) não se repete entre caminhões do mesmo indent
        self.check_cross_vehicle_duplicates(&assignment)?;

        // 5. Commit no ledger, próximo número de folha, rascunho limpo
        let ledger = self.ledger.commit(&assignment)?;
        let loading_sheet_no = self.loading_sheet_no.next()?;

        let notice = Notice::info(format!(
            "Truck {} assigned to indent {} on loading sheet {}.",
            assignment.truck_no, assignment.indent_no, assignment.loading_sheet_no
        ));

        let mut assignments = self.assignments.clone();
        assignments.push(assignment);

        let draft = fresh_draft(indent, &ledger);
        Ok(Transition {
            state: Self {
                ledger,
                draft,
                assignments,
                loading_sheet_no,
                vehicle_dialog_open: false,
                ..self.clone()
            },
            notices: vec![notice],
        })
    }

    fn collect_items(&self, indent: &Indent) -> Result<Vec<AssignedItem>, AllocationError> {
        let mut items = Vec::new();

        for item in &indent.indent_items {
            let key = item.key();
            let draft = self.draft.item(&key)?;

            let this_session: i64 = self
                .assignments
                .iter()
                .filter(|va| va.indent_no == indent.indent_no)
                .flat_map(|va| va.items.iter())
                .filter(|assigned| assigned.id == key.0)
                .map(|assigned| assigned.load_case)
                .sum();
            // Folhas salvas em sessões anteriores também contam
            let already_loaded = item.saved_load() + this_session;
            let this_vehicle = draft.allocated();
            if already_loaded + this_vehicle > item.req_case {
                return Err(AllocationError::ExceedsRequired {
                    item: item.label(),
                    cumulative: already_loaded + this_vehicle,
                    req_case: item.req_case,
                });
            }

            let rem_case = (item.req_case - already_loaded - this_vehicle).max(0);

            for (slot, alloc) in draft.slots().filter(|(_, a)| a.load_case > 0) {
                let (dispatch_type, magazine) =
                    alloc.combination().ok_or_else(|| AllocationError::MissingDispatchDetails {
                        slot: draft.slot_label(slot),
                        item: item.label(),
                        load_case: alloc.load_case,
                    })?;

                items.push(AssignedItem {
                    id: key.0.clone(),
                    bid: item.bid.clone(),
                    bname: item.bname.clone(),
                    psize: item.psize.clone(),
                    class: item.class.clone(),
                    div: item.div.clone(),
                    dispatch_type,
                    magazine: magazine.to_string(),
                    indent_no: indent.indent_no.clone(),
                    indent_dt: indent.indent_dt,
                    l1_net_wt: item.l1_net_wt,
                    load_wt: Decimal::from(alloc.load_case) * item.l1_net_wt,
                    load_case: alloc.load_case,
                    rem_wt: Decimal::from(rem_case) * item.l1_net_wt,
                    rem_case,
                    req_case: item.req_case,
                    req_wt: item.req_wt,
                    size_code: item.size_code.clone(),
                    unit: item.unit.clone(),
                    ptype: item.ptype.clone(),
                    ptype_code: item.ptype_code.clone(),
                });
            }
        }

        Ok(items)
    }

    fn check_cross_vehicle_duplicates(&self, assignment: &VehicleAssignment) -> Result<(), AllocationError> {
        let mut seen: BTreeMap<(String, DispatchType, String), String> = BTreeMap::new();

        let existing = self
            .assignments
            .iter()
            .filter(|va| va.indent_no == assignment.indent_no)
            .chain(std::iter::once(assignment));

        for va in existing {
            for item in &va.items {
                let triple = (item.bname.clone(), item.dispatch_type, item.magazine.clone());
                if let Some(truck_no) = seen.get(&triple) {
                    return Err(AllocationError::DuplicateAcrossVehicles {
                        brand: item.bname.clone(),
                        dispatch_type: item.dispatch_type,
                        magazine: item.magazine.clone(),
                        truck_no: truck_no.clone(),
                        indent_no: assignment.indent_no.clone(),
                    });
                }
                seen.insert(triple, va.truck_no.clone());
            }
        }

        Ok(())
    }

    // ---
    // Remoção
    // ---

    fn remove_assignment(&self, index: usize) -> Result<Transition, AllocationError> {
        let removed = self
            .assignments
            .get(index)
            .cloned()
            .ok_or(AllocationError::AssignmentNotFound(index))?;

        let mut assignments = self.assignments.clone();
        assignments.remove(index);
        let without = Self { assignments, ..self.clone() };

        let same_indent = self
            .selected
            .as_ref()
            .is_some_and(|indent| indent.indent_no == removed.indent_no);

        // O seletor volta para o indent do caminhão removido
        let state = if same_indent {
            let ledger = self.ledger.rollback(&removed);
            let draft = self.selected.as_ref().map(|indent| fresh_draft(indent, &ledger)).unwrap_or_default();
            Self { ledger, draft, vehicle_dialog_open: false, ..without }
        } else {
            without.select_indent(&removed.indent_no)?
        };

        let notice = Notice::info(format!(
            "Truck {} removed from indent {}.",
            removed.truck_no, removed.indent_no
        ));
        Ok(Transition { state, notices: vec![notice] })
    }

    // ---
    // Envio
    // ---

    /// Lista a enviar em "Save All". Alocação parcial é permitida.
    pub fn submission(&self) -> Result<Vec<VehicleAssignment>, AllocationError> {
        if self.assignments.is_empty() {
            return Err(AllocationError::NoAssignments);
        }
        Ok(self.assignments.clone())
    }

    /// Estado depois de um envio bem-sucedido: tudo limpo, numeração seguindo
    /// o que foi de fato gravado.
    pub fn cleared(&self, next_loading_sheet_no: LoadingSheetNo) -> Self {
        Self {
            saved: true,
            ..Self::new(self.available_indents.clone(), next_loading_sheet_no)
        }
    }

    pub fn view(&self) -> AllocationView {
        let ledger = match &self.selected {
            Some(indent) => indent
                .indent_items
                .iter()
                .filter_map(|item| {
                    let key = item.key();
                    self.ledger.entry(&key).map(|entry| LedgerRow {
                        item_id: key.clone(),
                        bname: item.bname.clone(),
                        psize: item.psize.clone(),
                        req_case: entry.req_case,
                        load_case: entry.load_case,
                        rem_case: entry.rem_case,
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        AllocationView {
            phase: self.phase(),
            selected_indent_no: self.selected.as_ref().map(|i| i.indent_no.clone()),
            loading_sheet_no: self.loading_sheet_no,
            all_items_allocated: self.ledger.is_fully_allocated(),
            can_save: !self.assignments.is_empty(),
            ledger,
            items: self.draft.view(),
            assignments: self.assignments.clone(),
        }
    }
}

fn fresh_draft(indent: &Indent, ledger: &Ledger) -> AssignmentDraft {
    AssignmentDraft::new(&indent.indent_items, |item| ledger.remaining(&item.key()).unwrap_or(0))
}

fn first_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Vehicle details are incomplete.".to_string())
}

// --- Visão serializável ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub item_id: ItemKey,
    pub bname: String,
    pub psize: String,
    pub req_case: i64,
    #[serde(rename = "loadcase")]
    pub load_case: i64,
    #[serde(rename = "remcase")]
    pub rem_case: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    pub phase: Phase,
    pub selected_indent_no: Option<String>,
    pub loading_sheet_no: LoadingSheetNo,
    pub all_items_allocated: bool,
    pub can_save: bool,
    pub ledger: Vec<LedgerRow>,
    pub items: Vec<ItemDraftView>,
    pub assignments: Vec<VehicleAssignment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{indent, indent_item};
    use DispatchType::{DirectDispatch as DD, MagazineLoading as ML};

    fn key(id: &str) -> ItemKey {
        ItemKey(id.to_string())
    }

    fn sheet_no() -> LoadingSheetNo {
        "SHEET2024070001".parse().unwrap()
    }

    fn state() -> AllocationState {
        let items = vec![
            indent_item("1", "ABC", "25MM", 100),
            indent_item("2", "ABC", "32MM", 40),
        ];
        let state = AllocationState::new(vec![indent("IND-1", items)], sheet_no());
        state.reduce(Action::SelectIndent { indent_no: "IND-1".into() }).unwrap().state
    }

    fn apply(state: AllocationState, action: Action) -> AllocationState {
        state.reduce(action).unwrap().state
    }

    fn load(state: AllocationState, id: &str, dt: DispatchType, mag: &str, cases: i64) -> AllocationState {
        let state = apply(state, Action::SetDispatchType { item_id: key(id), slot: Slot::Main, dispatch_type: dt, checked: true });
        let state = apply(state, Action::SetMagazine { item_id: key(id), slot: Slot::Main, magazine: Some(mag.into()) });
        apply(state, Action::SetLoadCase { item_id: key(id), slot: Slot::Main, load_case: Decimal::from(cases) })
    }

    fn truck(no: &str) -> VehicleForm {
        VehicleForm {
            transporter_name: "Acme Logistics".into(),
            truck_no: no.into(),
            license_no: "LIC-9".into(),
            validity: None,
        }
    }

    fn assign(state: &AllocationState, no: &str) -> Result<Transition, AllocationError> {
        state.reduce(Action::AssignVehicle { vehicle: truck(no) })
    }

    fn entry(state: &AllocationState, id: &str) -> (i64, i64) {
        let e = state.ledger().entry(&key(id)).unwrap();
        (e.load_case, e.rem_case)
    }

    fn assert_conserved(state: &AllocationState) {
        assert!(state.ledger().entries().all(|(_, e)| e.is_balanced()));
    }

    #[test]
    fn selecting_an_indent_seeds_the_ledger() {
        let state = state();
        assert_eq!(state.phase(), Phase::Selected);
        assert_eq!(entry(&state, "1"), (0, 100));
        assert_eq!(state.draft().items().len(), 2);
    }

    #[test]
    fn cases_saved_by_earlier_sessions_are_not_offered_again() {
        let mut item = indent_item("1", "ABC", "25MM", 30);
        item.rem_case = 5;
        let state = AllocationState::new(vec![indent("IND-1", vec![item])], sheet_no());
        let state = apply(state, Action::SelectIndent { indent_no: "IND-1".into() });
        assert_eq!(entry(&state, "1"), (25, 5));
        assert_eq!(state.draft().item(&key("1")).unwrap().available(), 5);

        let err = state
            .reduce(Action::SetLoadCase { item_id: key("1"), slot: Slot::Main, load_case: Decimal::from(30) })
            .unwrap_err();
        assert!(matches!(err, AllocationError::ExceedsRemaining { requested: 30, available: 5, .. }));

        let state = load(state, "1", DD, "M1", 5);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        assert_eq!(entry(&state, "1"), (30, 0));
        assert_eq!(state.assignments()[0].items[0].rem_case, 0);
        assert_eq!(state.phase(), Phase::AllItemsAllocated);
    }

    #[test]
    fn unknown_indent_is_rejected() {
        let state = state();
        assert_eq!(
            state.reduce(Action::SelectIndent { indent_no: "NOPE".into() }).unwrap_err(),
            AllocationError::IndentNotAvailable("NOPE".into())
        );
    }

    #[test]
    fn sequential_vehicles_consume_the_item_then_reject_more() {
        let state = load(state(), "1", DD, "M1", 40);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        assert_eq!(entry(&state, "1"), (40, 60));
        assert_conserved(&state);

        let state = load(state, "1", ML, "M2", 60);
        let state = assign(&state, "TRUCK-2").unwrap().state;
        assert_eq!(entry(&state, "1"), (100, 0));
        assert_conserved(&state);

        // Nada resta: qualquer carga positiva é rejeitada já na edição
        let err = state
            .reduce(Action::SetLoadCase { item_id: key("1"), slot: Slot::Main, load_case: Decimal::ONE })
            .unwrap_err();
        assert!(matches!(err, AllocationError::ExceedsRemaining { requested: 1, available: 0, .. }));
    }

    #[test]
    fn sheet_number_advances_by_one_per_vehicle() {
        let state = load(state(), "1", DD, "M1", 10);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        let state = load(state, "1", ML, "M2", 10);
        let state = assign(&state, "TRUCK-2").unwrap().state;

        let numbers: Vec<String> = state.assignments().iter().map(|va| va.loading_sheet_no.to_string()).collect();
        assert_eq!(numbers, vec!["SHEET2024070001", "SHEET2024070002"]);
        assert_eq!(state.loading_sheet_no().to_string(), "SHEET2024070003");
    }

    #[test]
    fn same_truck_twice_on_an_indent_is_rejected_without_mutation() {
        let state = load(state(), "1", DD, "M1", 10);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        let state = load(state, "1", ML, "M2", 10);

        let err = assign(&state, "TRUCK-1").unwrap_err();
        assert_eq!(err, AllocationError::DuplicateTruck { indent_no: "IND-1".into(), truck_no: "TRUCK-1".into() });
        assert_eq!(entry(&state, "1"), (10, 90));
    }

    #[test]
    fn same_brand_combination_across_vehicles_is_rejected() {
        let state = load(state(), "1", DD, "M1", 10);
        let state = assign(&state, "TRUCK-1").unwrap().state;

        let state = load(state, "2", DD, "M1", 5);
        let err = assign(&state, "TRUCK-2").unwrap_err();
        assert_eq!(
            err,
            AllocationError::DuplicateAcrossVehicles {
                brand: "ABC".into(),
                dispatch_type: DD,
                magazine: "M1".into(),
                truck_no: "TRUCK-1".into(),
                indent_no: "IND-1".into(),
            }
        );
        assert_eq!(entry(&state, "2"), (0, 40));
    }

    #[test]
    fn load_without_dispatch_details_is_rejected() {
        let state = apply(state(), Action::SetLoadCase { item_id: key("2"), slot: Slot::Main, load_case: Decimal::from(4) });
        let err = assign(&state, "TRUCK-1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dispatch type and magazine are required for main allocation of item ABC 32MM (Load Case 4)."
        );
    }

    #[test]
    fn vehicle_form_requires_transporter_and_truck() {
        let state = load(state(), "1", DD, "M1", 10);
        let mut form = truck("");
        form.transporter_name = "Acme".into();
        let err = state.reduce(Action::AssignVehicle { vehicle: form }).unwrap_err();
        assert_eq!(err, AllocationError::VehicleIncomplete("Truck number is required.".into()));
    }

    #[test]
    fn empty_draft_cannot_be_assigned() {
        assert_eq!(assign(&state(), "TRUCK-1").unwrap_err(), AllocationError::NothingToAssign("IND-1".into()));
    }

    #[test]
    fn assigned_items_carry_splits_as_separate_rows() {
        let state = load(state(), "1", DD, "M1", 10);
        let state = apply(state, Action::AddSplit { item_id: key("1") });
        let split = state.draft().item(&key("1")).unwrap().splits[0].id;
        let state = apply(state, Action::SetDispatchType { item_id: key("1"), slot: Slot::Split(split), dispatch_type: ML, checked: true });
        let state = apply(state, Action::SetMagazine { item_id: key("1"), slot: Slot::Split(split), magazine: Some("M7".into()) });
        let state = apply(state, Action::SetLoadCase { item_id: key("1"), slot: Slot::Split(split), load_case: Decimal::from(6) });

        let state = assign(&state, "TRUCK-1").unwrap().state;
        let va = &state.assignments()[0];
        assert_eq!(va.items.len(), 2);
        assert_eq!(va.items[1].magazine, "M7");
        assert_eq!(va.items[1].load_wt, Decimal::from(150));
        assert_eq!(va.items[0].rem_case, 84);
        assert_eq!(entry(&state, "1"), (16, 84));
    }

    #[test]
    fn removing_a_vehicle_rolls_back_the_ledger() {
        let state = load(state(), "1", DD, "M1", 40);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        let state = load(state, "1", ML, "M2", 60);
        let state = assign(&state, "TRUCK-2").unwrap().state;
        assert_eq!(entry(&state, "1"), (100, 0));

        let transition = state.reduce(Action::RemoveAssignment { index: 1 }).unwrap();
        let state = transition.state;
        assert_eq!(entry(&state, "1"), (40, 60));
        assert_eq!(state.assignments().len(), 1);
        assert_eq!(state.selected().map(|i| i.indent_no.as_str()), Some("IND-1"));
        assert_eq!(state.draft().item(&key("1")).unwrap().available(), 60);
        assert_eq!(transition.notices.len(), 1);
    }

    #[test]
    fn removing_an_unknown_assignment_is_rejected() {
        assert_eq!(
            state().reduce(Action::RemoveAssignment { index: 3 }).unwrap_err(),
            AllocationError::AssignmentNotFound(3)
        );
    }

    #[test]
    fn reselecting_the_indent_replays_pending_vehicles() {
        let state = load(state(), "1", DD, "M1", 25);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        let state = apply(state, Action::SelectIndent { indent_no: "IND-1".into() });
        assert_eq!(entry(&state, "1"), (25, 75));
    }

    #[test]
    fn rejected_load_case_resets_the_field_but_not_the_ledger() {
        let state = load(state(), "2", DD, "M3", 10);
        let action = Action::SetLoadCase { item_id: key("2"), slot: Slot::Main, load_case: Decimal::from(41) };

        assert!(state.reduce(action.clone()).is_err());
        let after = state.after_rejection(&action);
        assert_eq!(after.draft().item(&key("2")).unwrap().main.load_case, 0);
        assert_eq!(after.ledger(), state.ledger());
    }

    #[test]
    fn phase_follows_the_lifecycle() {
        let state = load(state(), "2", DD, "M3", 40);
        let state = apply(state, Action::OpenVehicleDialog);
        assert_eq!(state.phase(), Phase::AssigningVehicle);

        let state = assign(&state, "TRUCK-1").unwrap().state;
        assert_eq!(state.phase(), Phase::Selected);

        let state = load(state, "1", ML, "M4", 100);
        let state = assign(&state, "TRUCK-2").unwrap().state;
        assert_eq!(state.phase(), Phase::AllItemsAllocated);

        let cleared = state.cleared(state.loading_sheet_no());
        assert_eq!(cleared.phase(), Phase::Saved);
        assert!(cleared.assignments().is_empty());
        assert_eq!(cleared.loading_sheet_no(), state.loading_sheet_no());
    }

    #[test]
    fn partial_allocation_can_still_be_submitted() {
        let state = load(state(), "1", DD, "M1", 5);
        let state = assign(&state, "TRUCK-1").unwrap().state;
        assert_eq!(state.submission().unwrap().len(), 1);
        assert_eq!(AllocationState::new(Vec::new(), sheet_no()).submission().unwrap_err(), AllocationError::NoAssignments);
    }

    #[test]
    fn actions_deserialize_from_camel_case_json() {
        let action: Action = serde_json::from_value(serde_json::json!({
            "type": "setLoadCase",
            "itemId": "7",
            "slot": { "kind": "split", "splitId": 2 },
            "loadCase": 12
        }))
        .unwrap();
        assert!(matches!(
            action,
            Action::SetLoadCase { slot: Slot::Split(SplitId(2)), .. }
        ));

        let action: Action = serde_json::from_value(serde_json::json!({
            "type": "setMagazine", "itemId": "7", "magazine": "M1"
        }))
        .unwrap();
        assert!(matches!(action, Action::SetMagazine { slot: Slot::Main, .. }));
    }
}
