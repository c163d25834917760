// src/services/indent_editor.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    common::error::AllocationError,
    models::{
        allocation::{Allocation, DispatchType, Notice, Slot, SplitAllocation, SplitId},
        indent::{BatchDetail, BatchQuery, Indent, ItemKey},
        loading_sheet::{BatchSelection, LoadingSheet, SelectedIndent, SheetItem},
    },
    services::assignment_builder::{AssignmentDraft, Edit, ItemDraft, ItemDraftView},
};

// --- Ações do editor de um único caminhão ---
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorAction {
    OpenIndent { indent_no: String },
    CloseEditor,
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
    SetLoadWeight {
        item_id: ItemKey,
        #[serde(default)]
        slot: Slot,
        load_wt: Decimal,
    },
    AddSplit { item_id: ItemKey },
    RemoveSplit { item_id: ItemKey, split_id: SplitId },
    SetFifo {
        item_id: ItemKey,
        is_fifo: bool,
        // Preenchido pelo serviço com o resultado de getBatchDetails
        #[serde(skip)]
        batches: Vec<BatchDetail>,
    },
    ToggleBatch { item_id: ItemKey, batch: String, selected: bool },
    SaveChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FifoBatch {
    pub batch: String,
    pub distinct_count: i64,
    pub selected: bool,
}

/// Edição dos itens de um indent selecionado na folha.
#[derive(Debug, Clone, PartialEq)]
pub struct IndentEditor {
    indent_no: String,
    rows: Vec<SheetItem>,
    draft: AssignmentDraft,
    // Ausente = não-FIFO
    fifo: BTreeMap<ItemKey, Vec<FifoBatch>>,
}

impl IndentEditor {
    /// Reconstrói principal + splits a partir das linhas achatadas do indent.
    pub fn open(sheet: &LoadingSheet, indent_no: &str) -> Result<Self, AllocationError> {
        let selected = sheet
            .indents
            .iter()
            .find(|indent| indent.indent_no == indent_no)
            .ok_or_else(|| AllocationError::IndentNotOnSheet(indent_no.to_string()))?;

        let mut rows: Vec<SheetItem> = Vec::new();
        let mut drafts: Vec<ItemDraft> = Vec::new();
        let mut fifo = BTreeMap::new();
        let mut next_split = 0;

        for row in &selected.indent_items {
            let key = row.item.key();
            let allocation = Allocation {
                dispatch_type: row.dispatch_type,
                magazine: row.magazine.clone(),
                load_case: row.load_case,
                load_wt: row.load_wt,
            };

            match drafts.iter_mut().find(|d| d.key == key) {
                Some(draft) => {
                    draft.available_cases += row.load_case;
                    draft.splits.push(SplitAllocation { id: SplitId(next_split), allocation });
                    next_split += 1;
                }
                None => {
                    // O restante gravado já desconta o que esta folha carrega
                    let mut draft = ItemDraft::new(&row.item, row.item.rem_case + row.load_case);
                    draft.main = allocation;
                    drafts.push(draft);
                    rows.push(row.clone());

                    if let Some(batches) = &row.batches {
                        let restored = batches
                            .iter()
                            .map(|b| FifoBatch { batch: b.batch.clone(), distinct_count: 0, selected: true })
                            .collect();
                        fifo.insert(key, restored);
                    }
                }
            }
        }

        Ok(Self {
            indent_no: indent_no.to_string(),
            rows,
            draft: AssignmentDraft::from_drafts(drafts),
            fifo,
        })
    }

    pub fn indent_no(&self) -> &str {
        &self.indent_no
    }

    pub fn draft(&self) -> &AssignmentDraft {
        &self.draft
    }

    fn with_draft(&self, draft: AssignmentDraft) -> Self {
        Self { draft, ..self.clone() }
    }

    fn row(&self, key: &ItemKey) -> Result<&SheetItem, AllocationError> {
        self.rows
            .iter()
            .find(|row| &row.item.key() == key)
            .ok_or_else(|| AllocationError::UnknownItem(key.to_string()))
    }

    /// FIFO só vale para itens com carregamento em magazine.
    pub fn batch_query(&self, key: &ItemKey) -> Result<BatchQuery, AllocationError> {
        let row = self.row(key)?;
        let draft = self.draft.item(key)?;
        if draft.main.dispatch_type != Some(DispatchType::MagazineLoading) {
            return Err(AllocationError::FifoRequiresMagazineLoading(row.item.label()));
        }
        Ok(BatchQuery {
            bid: row.item.bid.clone(),
            size_code: row.item.size_code.clone(),
            req_case: row.item.req_case,
        })
    }

    pub fn set_fifo(&self, key: &ItemKey, batches: Option<Vec<BatchDetail>>) -> Result<Self, AllocationError> {
        let mut fifo = self.fifo.clone();
        match batches {
            Some(batches) => {
                self.batch_query(key)?;
                let selection = batches
                    .into_iter()
                    .map(|b| FifoBatch { batch: b.batch, distinct_count: b.distinct_count, selected: true })
                    .collect();
                fifo.insert(key.clone(), selection);
            }
            None => {
                self.row(key)?;
                fifo.remove(key);
            }
        }
        Ok(Self { fifo, ..self.clone() })
    }

    pub fn toggle_batch(&self, key: &ItemKey, batch: &str, selected: bool) -> Result<Self, AllocationError> {
        let label = self.row(key)?.item.label();
        let mut fifo = self.fifo.clone();
        let entry = fifo
            .get_mut(key)
            .and_then(|batches| batches.iter_mut().find(|b| b.batch == batch))
            .ok_or_else(|| AllocationError::UnknownBatch { item: label, batch: batch.to_string() })?;
        entry.selected = selected;
        Ok(Self { fifo, ..self.clone() })
    }

    /// Achata principal + splits de volta em `indentItems[]` e grava no indent da folha.
    pub fn write_back(&self, sheet: &LoadingSheet) -> Result<LoadingSheet, AllocationError> {
        let mut indent_items = Vec::new();

        for row in &self.rows {
            let key = row.item.key();
            let draft = self.draft.item(&key)?;
            let remaining = (draft.available_cases - draft.allocated()).max(0);

            let batches = match (draft.main.dispatch_type, self.fifo.get(&key)) {
                (Some(DispatchType::MagazineLoading), Some(selection)) => Some(
                    selection
                        .iter()
                        .filter(|b| b.selected)
                        .map(|b| BatchSelection { batch: b.batch.clone(), is_fifo: true })
                        .collect(),
                ),
                _ => None,
            };

            for (slot, alloc) in draft.slots() {
                let mut item = row.item.clone();
                item.rem_case = remaining;

                indent_items.push(SheetItem {
                    item,
                    indent_no: row.indent_no.clone(),
                    indent_dt: row.indent_dt,
                    dispatch_type: alloc.dispatch_type,
                    magazine: alloc.magazine.clone(),
                    load_case: alloc.load_case,
                    load_wt: alloc.load_wt,
                    rem_wt: Decimal::from(remaining) * row.item.l1_net_wt,
                    batches: if slot == Slot::Main { batches.clone() } else { None },
                });
            }
        }

        let mut next = sheet.clone();
        let target = next
            .indents
            .iter_mut()
            .find(|indent| indent.indent_no == self.indent_no)
            .ok_or_else(|| AllocationError::IndentNotOnSheet(self.indent_no.clone()))?;
        target.indent_items = indent_items;
        Ok(next)
    }

    pub fn view(&self) -> EditorView {
        EditorView {
            indent_no: self.indent_no.clone(),
            items: self.draft.view(),
            fifo: self.fifo.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

// --- Estado de uma folha de um caminhão em edição ---
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTruckState {
    sheet: LoadingSheet,
    editor: Option<IndentEditor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorTransition {
    pub state: SingleTruckState,
    pub notices: Vec<Notice>,
}

impl SingleTruckState {
    pub fn new(sheet: LoadingSheet) -> Self {
        Self { sheet, editor: None }
    }

    /// Acrescenta indents disponíveis à folha (os já presentes são mantidos).
    pub fn with_indents(mut self, indents: &[Indent]) -> Self {
        for indent in indents {
            if !self.sheet.indents.iter().any(|s| s.indent_no == indent.indent_no) {
                self.sheet.indents.push(SelectedIndent::from_indent(indent));
            }
        }
        self
    }

    pub fn sheet(&self) -> &LoadingSheet {
        &self.sheet
    }

    pub fn editor(&self) -> Option<&IndentEditor> {
        self.editor.as_ref()
    }

    fn open_editor(&self) -> Result<&IndentEditor, AllocationError> {
        self.editor.as_ref().ok_or(AllocationError::NoIndentSelected)
    }

    fn with_editor(&self, editor: IndentEditor) -> Self {
        Self { editor: Some(editor), ..self.clone() }
    }

    fn quiet(state: Self) -> EditorTransition {
        EditorTransition { state, notices: Vec::new() }
    }

    fn edited(&self, editor: &IndentEditor, edit: Edit) -> EditorTransition {
        EditorTransition {
            state: self.with_editor(editor.with_draft(edit.draft)),
            notices: edit.notices,
        }
    }

    pub fn reduce(&self, action: EditorAction) -> Result<EditorTransition, AllocationError> {
        match action {
            EditorAction::OpenIndent { indent_no } => {
                let editor = IndentEditor::open(&self.sheet, &indent_no)?;
                Ok(Self::quiet(self.with_editor(editor)))
            }
            EditorAction::CloseEditor => Ok(Self::quiet(Self { editor: None, ..self.clone() })),
            EditorAction::SetDispatchType { item_id, slot, dispatch_type, checked } => {
                let editor = self.open_editor()?;
                let edit = editor.draft.set_dispatch_type(&item_id, slot, dispatch_type, checked)?;
                Ok(self.edited(editor, edit))
            }
            EditorAction::SetMagazine { item_id, slot, magazine } => {
                let editor = self.open_editor()?;
                let edit = editor.draft.set_magazine(&item_id, slot, magazine)?;
                Ok(self.edited(editor, edit))
            }
            EditorAction::SetLoadCase { item_id, slot, load_case } => {
                let editor = self.open_editor()?;
                let draft = editor.draft.set_load_case(&item_id, slot, load_case)?;
                Ok(Self::quiet(self.with_editor(editor.with_draft(draft))))
            }
            EditorAction::SetLoadWeight { item_id, slot, load_wt } => {
                let editor = self.open_editor()?;
                let draft = editor.draft.set_load_weight(&item_id, slot, load_wt)?;
                Ok(Self::quiet(self.with_editor(editor.with_draft(draft))))
            }
            EditorAction::AddSplit { item_id } => {
                let editor = self.open_editor()?;
                let (draft, _) = editor.draft.add_split(&item_id)?;
                Ok(Self::quiet(self.with_editor(editor.with_draft(draft))))
            }
            EditorAction::RemoveSplit { item_id, split_id } => {
                let editor = self.open_editor()?;
                let draft = editor.draft.remove_split(&item_id, split_id)?;
                Ok(Self::quiet(self.with_editor(editor.with_draft(draft))))
            }
            EditorAction::SetFifo { item_id, is_fifo, batches } => {
                let editor = self.open_editor()?;
                let next = editor.set_fifo(&item_id, is_fifo.then_some(batches))?;
                Ok(Self::quiet(self.with_editor(next)))
            }
            EditorAction::ToggleBatch { item_id, batch, selected } => {
                let editor = self.open_editor()?;
                let next = editor.toggle_batch(&item_id, &batch, selected)?;
                Ok(Self::quiet(self.with_editor(next)))
            }
            EditorAction::SaveChanges => {
                let editor = self.open_editor()?;
                let sheet = editor.write_back(&self.sheet)?;
                let notice = Notice::info(format!("Changes saved for indent {}.", editor.indent_no));
                Ok(EditorTransition {
                    state: Self { sheet, editor: None },
                    notices: vec![notice],
                })
            }
        }
    }

    /// Uma quantidade rejeitada volta a 0/0 no slot editado.
    pub fn after_rejection(&self, action: &EditorAction) -> Self {
        let target = match action {
            EditorAction::SetLoadCase { item_id, slot, .. } | EditorAction::SetLoadWeight { item_id, slot, .. } => {
                Some((item_id, *slot))
            }
            _ => None,
        };

        match (target, &self.editor) {
            (Some((key, slot)), Some(editor)) => {
                self.with_editor(editor.with_draft(editor.draft.reset_quantity(key, slot)))
            }
            _ => self.clone(),
        }
    }

    pub fn view(&self) -> SingleTruckView {
        SingleTruckView {
            sheet: self.sheet.clone(),
            editor: self.editor.as_ref().map(IndentEditor::view),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub indent_no: String,
    pub items: Vec<ItemDraftView>,
    pub fifo: BTreeMap<ItemKey, Vec<FifoBatch>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleTruckView {
    pub sheet: LoadingSheet,
    pub editor: Option<EditorView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loading_sheet::LoadingSheetPayload;
    use crate::services::test_support::{indent, indent_item, sheet};
    use DispatchType::{DirectDispatch as DD, MagazineLoading as ML};

    fn key(id: &str) -> ItemKey {
        ItemKey(id.to_string())
    }

    fn state() -> SingleTruckState {
        let items = vec![indent_item("1", "ABC", "25MM", 20), indent_item("2", "XYZ", "32MM", 8)];
        let state = SingleTruckState::new(sheet()).with_indents(&[indent("IND-7", items)]);
        state.reduce(EditorAction::OpenIndent { indent_no: "IND-7".into() }).unwrap().state
    }

    fn apply(state: SingleTruckState, action: EditorAction) -> SingleTruckState {
        state.reduce(action).unwrap().state
    }

    fn set_type(state: SingleTruckState, id: &str, slot: Slot, dt: DispatchType) -> SingleTruckState {
        apply(state, EditorAction::SetDispatchType { item_id: key(id), slot, dispatch_type: dt, checked: true })
    }

    fn set_mag(state: SingleTruckState, id: &str, slot: Slot, mag: &str) -> SingleTruckState {
        apply(state, EditorAction::SetMagazine { item_id: key(id), slot, magazine: Some(mag.into()) })
    }

    fn set_wt(state: SingleTruckState, id: &str, slot: Slot, wt: i64) -> SingleTruckState {
        apply(state, EditorAction::SetLoadWeight { item_id: key(id), slot, load_wt: Decimal::from(wt) })
    }

    fn batch(name: &str, count: i64) -> BatchDetail {
        BatchDetail { batch: name.into(), distinct_count: count }
    }

    #[test]
    fn weight_entry_drives_the_case_count() {
        let state = set_wt(state(), "1", Slot::Main, 250);
        let main = &state.editor().unwrap().draft().item(&key("1")).unwrap().main;
        assert_eq!(main.load_case, 10);
    }

    #[test]
    fn rejected_weight_resets_to_zero() {
        let state = set_wt(state(), "2", Slot::Main, 100);
        let action = EditorAction::SetLoadWeight { item_id: key("2"), slot: Slot::Main, load_wt: Decimal::from(110) };

        let err = state.reduce(action.clone()).unwrap_err();
        assert!(matches!(err, AllocationError::WeightNotWholeCases { .. }));

        let after = state.after_rejection(&action);
        let main = &after.editor().unwrap().draft().item(&key("2")).unwrap().main;
        assert_eq!((main.load_case, main.load_wt), (0, Decimal::ZERO));
    }

    #[test]
    fn splits_merge_like_the_multi_truck_flow() {
        let state = set_type(state(), "1", Slot::Main, DD);
        let state = set_mag(state, "1", Slot::Main, "M1");
        let state = set_wt(state, "1", Slot::Main, 100);
        let state = apply(state, EditorAction::AddSplit { item_id: key("1") });
        let split = state.editor().unwrap().draft().item(&key("1")).unwrap().splits[0].id;
        let state = set_type(state, "1", Slot::Split(split), DD);
        let state = set_wt(state, "1", Slot::Split(split), 50);

        let transition = state
            .reduce(EditorAction::SetMagazine { item_id: key("1"), slot: Slot::Split(split), magazine: Some("M1".into()) })
            .unwrap();
        let item = transition.state.editor().unwrap().draft().item(&key("1")).unwrap().clone();
        assert_eq!((item.main.load_case, item.main.load_wt), (6, Decimal::from(150)));
        assert!(item.splits.is_empty());
        assert_eq!(transition.notices.len(), 1);
    }

    #[test]
    fn fifo_requires_magazine_loading() {
        let state = set_type(state(), "1", Slot::Main, DD);
        let err = state
            .reduce(EditorAction::SetFifo { item_id: key("1"), is_fifo: true, batches: vec![batch("B1", 3)] })
            .unwrap_err();
        assert_eq!(err, AllocationError::FifoRequiresMagazineLoading("ABC 25MM".into()));
    }

    #[test]
    fn save_changes_writes_flattened_rows_with_selected_batches() {
        let state = set_type(state(), "1", Slot::Main, ML);
        let state = set_mag(state, "1", Slot::Main, "MAG-A");
        let state = set_wt(state, "1", Slot::Main, 250);
        let state = apply(
            state,
            EditorAction::SetFifo { item_id: key("1"), is_fifo: true, batches: vec![batch("B1", 4), batch("B2", 6)] },
        );
        let state = apply(state, EditorAction::ToggleBatch { item_id: key("1"), batch: "B1".into(), selected: false });
        let state = apply(state, EditorAction::AddSplit { item_id: key("1") });
        let split = state.editor().unwrap().draft().item(&key("1")).unwrap().splits[0].id;
        let state = set_type(state, "1", Slot::Split(split), DD);
        let state = set_mag(state, "1", Slot::Split(split), "MAG-B");
        let state = set_wt(state, "1", Slot::Split(split), 75);

        let saved = apply(state, EditorAction::SaveChanges);
        assert!(saved.editor().is_none());

        let rows = &saved.sheet().indents[0].indent_items;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].load_case, 10);
        assert_eq!(rows[0].batches, Some(vec![BatchSelection { batch: "B2".into(), is_fifo: true }]));
        assert_eq!(rows[1].magazine.as_deref(), Some("MAG-B"));
        assert_eq!(rows[1].load_case, 3);
        assert_eq!(rows[1].batches, None);
        assert_eq!(rows[0].item.rem_case, 7);
        assert_eq!(rows[2].batches, None);

        let payload = LoadingSheetPayload::from(saved.sheet());
        assert_eq!(payload.indent_info_view_models.len(), 3);
    }

    #[test]
    fn reopening_restores_splits_and_availability() {
        let state = set_type(state(), "2", Slot::Main, DD);
        let state = set_mag(state, "2", Slot::Main, "M1");
        let state = set_wt(state, "2", Slot::Main, 100);
        let state = apply(state, EditorAction::AddSplit { item_id: key("2") });
        let split = state.editor().unwrap().draft().item(&key("2")).unwrap().splits[0].id;
        let state = set_wt(state, "2", Slot::Split(split), 50);
        let state = apply(state, EditorAction::SaveChanges);

        let reopened = apply(state, EditorAction::OpenIndent { indent_no: "IND-7".into() });
        let item = reopened.editor().unwrap().draft().item(&key("2")).unwrap().clone();
        assert_eq!(item.main.load_case, 4);
        assert_eq!(item.splits.len(), 1);
        assert_eq!(item.splits[0].allocation.load_case, 2);
        assert_eq!(item.available_cases, 8);
        assert_eq!(item.available(), 2);
    }

    #[test]
    fn non_fifo_items_carry_no_batches() {
        let state = set_type(state(), "1", Slot::Main, ML);
        let state = apply(state, EditorAction::SetFifo { item_id: key("1"), is_fifo: true, batches: vec![batch("B1", 1)] });
        let state = apply(state, EditorAction::SetFifo { item_id: key("1"), is_fifo: false, batches: Vec::new() });
        let saved = apply(state, EditorAction::SaveChanges);
        assert_eq!(saved.sheet().indents[0].indent_items[0].batches, None);
    }

    #[test]
    fn editing_without_an_open_indent_is_rejected() {
        let state = SingleTruckState::new(sheet());
        assert_eq!(
            state.reduce(EditorAction::AddSplit { item_id: key("1") }).unwrap_err(),
            AllocationError::NoIndentSelected
        );
        assert_eq!(
            state.reduce(EditorAction::OpenIndent { indent_no: "IND-X".into() }).unwrap_err(),
            AllocationError::IndentNotOnSheet("IND-X".into())
        );
    }
}
