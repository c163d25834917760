// src/services/assignment_builder.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AllocationError,
    models::{
        allocation::{Allocation, DispatchType, Notice, Slot, SplitAllocation, SplitId},
        indent::{IndentItem, ItemKey},
    },
    services::ledger::{cases_from_weight, whole_cases, WeightRejection},
};

// --- Rascunho de um item: alocação principal + splits ---
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub key: ItemKey,
    pub bname: String,
    pub psize: String,
    pub l1_net_wt: Decimal,
    // Caixas que este rascunho pode distribuir entre principal e splits
    pub available_cases: i64,
    pub main: Allocation,
    pub splits: Vec<SplitAllocation>,
}

impl ItemDraft {
    pub fn new(item: &IndentItem, available_cases: i64) -> Self {
        Self {
            key: item.key(),
            bname: item.bname.clone(),
            psize: item.psize.clone(),
            l1_net_wt: item.l1_net_wt,
            available_cases: available_cases.max(0),
            main: Allocation::default(),
            splits: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.bname, self.psize)
    }

    /// Posição exibida (1-based) de um split.
    pub fn ordinal(&self, id: SplitId) -> Option<usize> {
        self.splits.iter().position(|s| s.id == id).map(|idx| idx + 1)
    }

    pub fn slot_label(&self, slot: Slot) -> String {
        match slot {
            Slot::Main => "main allocation".to_string(),
            Slot::Split(id) => match self.ordinal(id) {
                Some(ordinal) => format!("split {ordinal}"),
                None => format!("split #{}", id.0),
            },
        }
    }

    pub fn slot(&self, slot: Slot) -> Result<&Allocation, AllocationError> {
        match slot {
            Slot::Main => Ok(&self.main),
            Slot::Split(id) => self
                .splits
                .iter()
                .find(|s| s.id == id)
                .map(|s| &s.allocation)
                .ok_or_else(|| self.unknown_split(id)),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Result<&mut Allocation, AllocationError> {
        match slot {
            Slot::Main => Ok(&mut self.main),
            Slot::Split(id) => {
                let err = self.unknown_split(id);
                self.splits
                    .iter_mut()
                    .find(|s| s.id == id)
                    .map(|s| &mut s.allocation)
                    .ok_or(err)
            }
        }
    }

    fn unknown_split(&self, id: SplitId) -> AllocationError {
        AllocationError::UnknownSplit { item: self.label(), split: id.0 }
    }

    /// Principal seguido dos splits, na ordem exibida.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, &Allocation)> {
        std::iter::once((Slot::Main, &self.main))
            .chain(self.splits.iter().map(|s| (Slot::Split(s.id), &s.allocation)))
    }

    pub fn allocated(&self) -> i64 {
        self.slots().map(|(_, a)| a.load_case).sum()
    }

    fn allocated_except(&self, slot: Slot) -> i64 {
        self.slots().filter(|(s, _)| *s != slot).map(|(_, a)| a.load_case).sum()
    }

    fn allocated_wt_except(&self, slot: Slot) -> Decimal {
        self.slots().filter(|(s, _)| *s != slot).map(|(_, a)| a.load_wt).sum()
    }

    /// remaining(item) menos o que já está distribuído no rascunho. Nunca negativo.
    pub fn available(&self) -> i64 {
        (self.available_cases - self.allocated()).max(0)
    }
}

// --- Resultado de uma edição ---
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub draft: AssignmentDraft,
    pub notices: Vec<Notice>,
}

impl Edit {
    fn quiet(draft: AssignmentDraft) -> Self {
        Self { draft, notices: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Accepted,
    MergeInto { item: ItemKey, slot: Slot },
    Rejected(AllocationError),
}

/// Verificação única de duplicidade (brand, dispatchType, magazine), usada por toda edição.
/// Qualquer slot da mesma marca com o mesmo par absorve o slot editado: primeiro o próprio
/// item, depois os outros tamanhos da marca na ordem do indent.
pub fn resolve_assignment(
    draft: &AssignmentDraft,
    key: &ItemKey,
    slot: Slot,
    dispatch_type: DispatchType,
    magazine: &str,
) -> Result<Resolution, AllocationError> {
    let item = draft.item(key)?;
    let edited = item.slot(slot)?;

    let same_item = item
        .slots()
        .filter(|(s, _)| *s != slot)
        .find(|(_, a)| a.combination() == Some((dispatch_type, magazine)));
    if let Some((target, _)) = same_item {
        return Ok(Resolution::MergeInto { item: key.clone(), slot: target });
    }

    let other_item = draft
        .items
        .iter()
        .filter(|other| other.key != item.key && other.bname == item.bname)
        .find_map(|other| {
            other
                .slots()
                .find(|(_, a)| a.combination() == Some((dispatch_type, magazine)))
                .map(|(target, _)| (other, target))
        });
    let Some((other, target)) = other_item else {
        return Ok(Resolution::Accepted);
    };

    // As caixas passam para o outro tamanho, que precisa ter saldo para elas
    let room = (other.available_cases - other.allocated_except(target)).max(0);
    let combined = other.slot(target)?.load_case + edited.load_case;
    if combined > room {
        return Ok(Resolution::Rejected(AllocationError::ExceedsRemaining {
            slot: other.slot_label(target),
            item: other.label(),
            requested: combined,
            available: room,
        }));
    }

    Ok(Resolution::MergeInto { item: other.key.clone(), slot: target })
}

// --- Rascunho de atribuição de um indent ---
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentDraft {
    items: Vec<ItemDraft>,
    next_split: u32,
}

impl AssignmentDraft {
    pub fn new<F>(items: &[IndentItem], available: F) -> Self
    where
        F: Fn(&IndentItem) -> i64,
    {
        Self::from_drafts(items.iter().map(|item| ItemDraft::new(item, available(item))).collect())
    }

    pub fn from_drafts(items: Vec<ItemDraft>) -> Self {
        let next_split = items
            .iter()
            .flat_map(|item| item.splits.iter().map(|s| s.id.0 + 1))
            .max()
            .unwrap_or(0);
        Self { items, next_split }
    }

    pub fn items(&self) -> &[ItemDraft] {
        &self.items
    }

    pub fn item(&self, key: &ItemKey) -> Result<&ItemDraft, AllocationError> {
        self.items
            .iter()
            .find(|item| &item.key == key)
            .ok_or_else(|| AllocationError::UnknownItem(key.to_string()))
    }

    fn item_mut(&mut self, key: &ItemKey) -> Result<&mut ItemDraft, AllocationError> {
        self.items
            .iter_mut()
            .find(|item| &item.key == key)
            .ok_or_else(|| AllocationError::UnknownItem(key.to_string()))
    }

    pub fn has_load(&self) -> bool {
        self.items.iter().any(|item| item.allocated() > 0)
    }

    // ---
    // Operações
    // ---

    /// DD e ML são exclusivos. Trocar de tipo limpa o magazine; desmarcar também.
    pub fn set_dispatch_type(
        &self,
        key: &ItemKey,
        slot: Slot,
        dispatch_type: DispatchType,
        checked: bool,
    ) -> Result<Edit, AllocationError> {
        let mut next = self.clone();
        let alloc = next.item_mut(key)?.slot_mut(slot)?;

        match (checked, alloc.dispatch_type) {
            (true, Some(current)) if current == dispatch_type => return Ok(Edit::quiet(next)),
            (true, Some(_)) => {
                alloc.dispatch_type = Some(dispatch_type);
                alloc.magazine = None;
                return Ok(Edit::quiet(next));
            }
            (true, None) => alloc.dispatch_type = Some(dispatch_type),
            (false, Some(current)) if current == dispatch_type => {
                alloc.dispatch_type = None;
                alloc.magazine = None;
                return Ok(Edit::quiet(next));
            }
            (false, _) => return Ok(Edit::quiet(next)),
        }

        // O tipo foi escolhido depois do magazine: o par ficou completo agora
        next.settle(key, slot)
    }

    pub fn set_magazine(&self, key: &ItemKey, slot: Slot, magazine: Option<String>) -> Result<Edit, AllocationError> {
        let mut next = self.clone();
        let alloc = next.item_mut(key)?.slot_mut(slot)?;
        alloc.magazine = magazine.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());

        next.settle(key, slot)
    }

    pub fn set_load_case(&self, key: &ItemKey, slot: Slot, value: Decimal) -> Result<Self, AllocationError> {
        let mut next = self.clone();
        let item = next.item_mut(key)?;
        let slot_label = item.slot_label(slot);
        item.slot(slot)?;

        let load_case = whole_cases(value).ok_or_else(|| AllocationError::InvalidQuantity {
            field: "Load Case",
            value,
            slot: slot_label.clone(),
            item: item.label(),
        })?;

        let available = (item.available_cases - item.allocated_except(slot)).max(0);
        if load_case > available {
            return Err(AllocationError::ExceedsRemaining {
                slot: slot_label,
                item: item.label(),
                requested: load_case,
                available,
            });
        }

        let l1_net_wt = item.l1_net_wt;
        let alloc = item.slot_mut(slot)?;
        alloc.load_case = load_case;
        alloc.load_wt = Decimal::from(load_case) * l1_net_wt;
        Ok(next)
    }

    /// Entrada por peso: loadCase = loadWt / l1NetWt.
    pub fn set_load_weight(&self, key: &ItemKey, slot: Slot, load_wt: Decimal) -> Result<Self, AllocationError> {
        let mut next = self.clone();
        let item = next.item_mut(key)?;
        let slot_label = item.slot_label(slot);
        item.slot(slot)?;

        let available_wt = Decimal::from(item.available_cases) * item.l1_net_wt - item.allocated_wt_except(slot);
        if load_wt > Decimal::ZERO && load_wt > available_wt {
            return Err(AllocationError::WeightExceedsRemaining {
                load_wt,
                available: available_wt.max(Decimal::ZERO),
                slot: slot_label,
                item: item.label(),
            });
        }

        let load_case = cases_from_weight(load_wt, item.l1_net_wt).map_err(|rejection| match rejection {
            WeightRejection::NonPositive => AllocationError::NonPositiveWeight {
                load_wt,
                slot: slot_label.clone(),
                item: item.label(),
            },
            WeightRejection::MissingNetWeight => AllocationError::MissingNetWeight(item.label()),
            WeightRejection::NotWholeCases => AllocationError::WeightNotWholeCases {
                load_wt,
                l1_net_wt: item.l1_net_wt,
                slot: slot_label.clone(),
                item: item.label(),
            },
        })?;

        let alloc = item.slot_mut(slot)?;
        alloc.load_case = load_case;
        alloc.load_wt = load_wt;
        Ok(next)
    }

    pub fn add_split(&self, key: &ItemKey) -> Result<(Self, SplitId), AllocationError> {
        let mut next = self.clone();
        let id = SplitId(next.next_split);
        next.next_split += 1;

        let item = next.item_mut(key)?;
        if item.available() <= 0 {
            return Err(AllocationError::NothingLeftToSplit(item.label()));
        }
        item.splits.push(SplitAllocation { id, allocation: Allocation::default() });

        Ok((next, id))
    }

    pub fn remove_split(&self, key: &ItemKey, split: SplitId) -> Result<Self, AllocationError> {
        let mut next = self.clone();
        let item = next.item_mut(key)?;
        let position = item
            .splits
            .iter()
            .position(|s| s.id == split)
            .ok_or_else(|| item.unknown_split(split))?;
        item.splits.remove(position);
        Ok(next)
    }

    /// Depois de uma entrada de quantidade rejeitada: volta o campo ao último valor válido (0).
    pub fn reset_quantity(&self, key: &ItemKey, slot: Slot) -> Self {
        let mut next = self.clone();
        if let Ok(alloc) = next.item_mut(key).and_then(|item| item.slot_mut(slot)) {
            alloc.load_case = 0;
            alloc.load_wt = Decimal::ZERO;
        }
        next
    }

    // Aplica a resolução de duplicidade ao slot recém-editado.
    fn settle(self, key: &ItemKey, slot: Slot) -> Result<Edit, AllocationError> {
        let combination = self
            .item(key)?
            .slot(slot)?
            .combination()
            .map(|(dt, mag)| (dt, mag.to_string()));
        let Some((dispatch_type, magazine)) = combination else {
            return Ok(Edit::quiet(self));
        };

        match resolve_assignment(&self, key, slot, dispatch_type, &magazine)? {
            Resolution::Accepted => Ok(Edit::quiet(self)),
            Resolution::Rejected(err) => Err(err),
            Resolution::MergeInto { item, slot: target } if &item == key => self.merge(key, slot, target),
            Resolution::MergeInto { item, slot: target } => self.merge_across(key, slot, &item, target),
        }
    }

    // O slot editado de um tamanho vai para o slot de outro tamanho da mesma marca.
    // Um split absorvido some; um principal absorvido volta a ficar vazio.
    fn merge_across(mut self, key: &ItemKey, edited: Slot, target_key: &ItemKey, target: Slot) -> Result<Edit, AllocationError> {
        let source = self.item_mut(key)?;
        let source_label = format!("{} of item {}", capitalize(&source.slot_label(edited)), source.label());
        let absorbed = match edited {
            Slot::Main => std::mem::take(&mut source.main),
            Slot::Split(id) => {
                let position = source
                    .splits
                    .iter()
                    .position(|s| s.id == id)
                    .ok_or_else(|| source.unknown_split(id))?;
                source.splits.remove(position).allocation
            }
        };

        let target_item = self.item_mut(target_key)?;
        let target_label = format!("{} of item {}", target_item.slot_label(target), target_item.label());
        let l1_net_wt = target_item.l1_net_wt;
        let alloc = target_item.slot_mut(target)?;
        alloc.load_case += absorbed.load_case;
        alloc.load_wt += Decimal::from(absorbed.load_case) * l1_net_wt;
        let load_case = alloc.load_case;

        let combination = absorbed
            .combination()
            .map(|(dt, mag)| format!(" ({dt} / {mag})"))
            .unwrap_or_default();
        let message = format!(
            "{source_label} merged into {target_label}{combination}; Load Case is now {load_case}."
        );

        Ok(Edit { draft: self, notices: vec![Notice::info(message)] })
    }

    fn merge(mut self, key: &ItemKey, edited: Slot, target: Slot) -> Result<Edit, AllocationError> {
        // O principal nunca é removido: se foi ele o editado, o split encontrado é absorvido
        let (survivor, absorbed) = match (edited, target) {
            (Slot::Main, Slot::Split(id)) => (Slot::Main, id),
            (Slot::Split(id), survivor) => (survivor, id),
            (Slot::Main, Slot::Main) => return Ok(Edit::quiet(self)),
        };

        let item = self.item_mut(key)?;
        let absorbed_label = item.slot_label(Slot::Split(absorbed));
        let survivor_label = item.slot_label(survivor);

        let position = item
            .splits
            .iter()
            .position(|s| s.id == absorbed)
            .ok_or_else(|| item.unknown_split(absorbed))?;
        let removed = item.splits.remove(position).allocation;

        let item_label = item.label();
        let alloc = item.slot_mut(survivor)?;
        alloc.load_case += removed.load_case;
        alloc.load_wt += removed.load_wt;
        let load_case = alloc.load_case;

        let combination = removed
            .combination()
            .map(|(dt, mag)| format!(" ({dt} / {mag})"))
            .unwrap_or_default();
        let message = format!(
            "{} of item {} merged into {}{}; Load Case is now {}.",
            capitalize(&absorbed_label),
            item_label,
            survivor_label,
            combination,
            load_case,
        );

        Ok(Edit { draft: self, notices: vec![Notice::info(message)] })
    }

    pub fn view(&self) -> Vec<ItemDraftView> {
        self.items.iter().map(ItemDraftView::from).collect()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// --- Visões serializáveis ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SplitView {
    pub id: SplitId,
    pub ordinal: usize,
    #[serde(flatten)]
    pub allocation: Allocation,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraftView {
    pub item_id: ItemKey,
    pub bname: String,
    pub psize: String,
    pub available: i64,
    pub can_add_split: bool,
    pub main: Allocation,
    pub splits: Vec<SplitView>,
}

impl From<&ItemDraft> for ItemDraftView {
    fn from(item: &ItemDraft) -> Self {
        Self {
            item_id: item.key.clone(),
            bname: item.bname.clone(),
            psize: item.psize.clone(),
            available: item.available(),
            can_add_split: item.available() > 0,
            main: item.main.clone(),
            splits: item
                .splits
                .iter()
                .enumerate()
                .map(|(idx, s)| SplitView { id: s.id, ordinal: idx + 1, allocation: s.allocation.clone() })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::allocation::NoticeLevel;
    use crate::services::test_support::indent_item;
    use DispatchType::{DirectDispatch as DD, MagazineLoading as ML};

    fn key(id: &str) -> ItemKey {
        ItemKey(id.to_string())
    }

    fn draft() -> AssignmentDraft {
        let items = vec![
            indent_item("1", "ABC", "25MM", 100),
            indent_item("2", "ABC", "32MM", 50),
            indent_item("3", "XYZ", "25MM", 10),
        ];
        AssignmentDraft::new(&items, |item| item.req_case)
    }

    fn configure(draft: AssignmentDraft, id: &str, slot: Slot, dt: DispatchType, mag: &str, cases: i64) -> Edit {
        let draft = draft.set_dispatch_type(&key(id), slot, dt, true).unwrap().draft;
        let draft = draft.set_load_case(&key(id), slot, Decimal::from(cases)).unwrap();
        draft.set_magazine(&key(id), slot, Some(mag.to_string())).unwrap()
    }

    #[test]
    fn dispatch_types_are_exclusive_and_switching_clears_magazine() {
        let edit = configure(draft(), "1", Slot::Main, DD, "M1", 5);
        let next = edit.draft.set_dispatch_type(&key("1"), Slot::Main, ML, true).unwrap().draft;

        let main = &next.item(&key("1")).unwrap().main;
        assert_eq!(main.dispatch_type, Some(ML));
        assert_eq!(main.magazine, None);
    }

    #[test]
    fn unchecking_clears_type_and_magazine() {
        let edit = configure(draft(), "1", Slot::Main, DD, "M1", 5);
        let next = edit.draft.set_dispatch_type(&key("1"), Slot::Main, DD, false).unwrap().draft;

        let main = &next.item(&key("1")).unwrap().main;
        assert_eq!(main.combination(), None);
        assert_eq!(main.dispatch_type, None);
        assert_eq!(main.load_case, 5);
    }

    #[test]
    fn split_matching_main_merges_into_main() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 10).draft;
        let (draft, split) = draft.add_split(&key("1")).unwrap();
        let edit = configure(draft, "1", Slot::Split(split), DD, "M1", 5);

        let item = edit.draft.item(&key("1")).unwrap();
        assert_eq!(item.main.load_case, 15);
        assert!(item.splits.is_empty());
        assert_eq!(edit.notices.len(), 1);
        assert_eq!(edit.notices[0].level, NoticeLevel::Info);
        assert_eq!(
            edit.notices[0].message,
            "Split 1 of item ABC 25MM merged into main allocation (DD / M1); Load Case is now 15."
        );
    }

    #[test]
    fn merge_result_does_not_depend_on_field_order() {
        // Magazine escolhido antes do tipo, e o split configurado antes do principal
        let (draft, split) = draft().add_split(&key("1")).unwrap();
        let draft = draft.set_load_case(&key("1"), Slot::Split(split), Decimal::from(5)).unwrap();
        let draft = draft.set_magazine(&key("1"), Slot::Split(split), Some("M1".into())).unwrap().draft;
        let draft = draft.set_dispatch_type(&key("1"), Slot::Split(split), DD, true).unwrap().draft;
        let draft = draft.set_load_case(&key("1"), Slot::Main, Decimal::from(10)).unwrap();
        let draft = draft.set_magazine(&key("1"), Slot::Main, Some("M1".into())).unwrap().draft;
        let edit = draft.set_dispatch_type(&key("1"), Slot::Main, DD, true).unwrap();

        let item = edit.draft.item(&key("1")).unwrap();
        let combos: Vec<_> = item.slots().filter_map(|(_, a)| a.combination()).collect();
        assert_eq!(combos, vec![(DD, "M1")]);
        assert_eq!(item.main.load_case, 15);
        assert!(item.splits.is_empty());
        assert_eq!(edit.notices.len(), 1);
    }

    #[test]
    fn split_matching_another_split_merges_and_renumbers() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 10).draft;
        let (draft, first) = draft.add_split(&key("1")).unwrap();
        let draft = configure(draft, "1", Slot::Split(first), ML, "M2", 20).draft;
        let (draft, second) = draft.add_split(&key("1")).unwrap();
        let draft = configure(draft, "1", Slot::Split(second), ML, "M3", 7).draft;
        let (draft, third) = draft.add_split(&key("1")).unwrap();
        let edit = configure(draft, "1", Slot::Split(third), ML, "M2", 3);

        let item = edit.draft.item(&key("1")).unwrap();
        assert_eq!(item.splits.len(), 2);
        assert_eq!(item.slot(Slot::Split(first)).unwrap().load_case, 23);
        assert_eq!(item.ordinal(second), Some(2));
        assert!(edit.notices[0].message.starts_with("Split 3 of item ABC 25MM merged into split 1"));
    }

    #[test]
    fn same_brand_on_another_size_merges_into_that_size() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 10).draft;
        let edit = configure(draft, "2", Slot::Main, DD, "M1", 4);

        let first = edit.draft.item(&key("1")).unwrap();
        assert_eq!(first.main.load_case, 14);
        assert_eq!(first.main.load_wt, Decimal::from(350));

        let second = edit.draft.item(&key("2")).unwrap();
        assert_eq!(second.main, Allocation::default());
        assert_eq!(edit.notices.len(), 1);
        assert_eq!(
            edit.notices[0].message,
            "Main allocation of item ABC 32MM merged into main allocation of item ABC 25MM (DD / M1); Load Case is now 14."
        );
    }

    #[test]
    fn split_of_another_size_is_removed_after_merging() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 10).draft;
        let (draft, split) = draft.add_split(&key("2")).unwrap();
        let edit = configure(draft, "2", Slot::Split(split), DD, "M1", 6);

        assert!(edit.draft.item(&key("2")).unwrap().splits.is_empty());
        assert_eq!(edit.draft.item(&key("1")).unwrap().main.load_case, 16);
        assert!(edit.notices[0].message.starts_with("Split 1 of item ABC 32MM merged into main allocation of item ABC 25MM"));
    }

    #[test]
    fn merge_into_another_size_needs_room_there() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 95).draft;
        let draft = draft.set_load_case(&key("2"), Slot::Main, Decimal::from(8)).unwrap();
        let draft = draft.set_dispatch_type(&key("2"), Slot::Main, DD, true).unwrap().draft;

        let err = draft.set_magazine(&key("2"), Slot::Main, Some("M1".into())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Load Case (103) for main allocation of item ABC 25MM exceeds available remaining cases (100)."
        );
    }

    #[test]
    fn other_brands_may_share_a_magazine() {
        let draft = configure(draft(), "1", Slot::Main, DD, "M1", 10).draft;
        let edit = configure(draft, "3", Slot::Main, DD, "M1", 10);
        assert!(edit.notices.is_empty());
        assert_eq!(edit.draft.item(&key("3")).unwrap().main.combination(), Some((DD, "M1")));
    }

    #[test]
    fn load_case_cannot_exceed_what_the_other_slots_leave() {
        let draft = configure(draft(), "3", Slot::Main, DD, "M1", 8).draft;
        let (draft, split) = draft.add_split(&key("3")).unwrap();

        let err = draft.set_load_case(&key("3"), Slot::Split(split), Decimal::from(3)).unwrap_err();
        assert_eq!(err.to_string(), "Load Case (3) for split 1 of item XYZ 25MM exceeds available remaining cases (2).");
    }

    #[test]
    fn load_case_must_be_whole_and_non_negative() {
        assert!(matches!(
            draft().set_load_case(&key("1"), Slot::Main, Decimal::new(15, 1)),
            Err(AllocationError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            draft().set_load_case(&key("1"), Slot::Main, Decimal::from(-2)),
            Err(AllocationError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn add_split_is_disabled_when_nothing_remains() {
        let draft = configure(draft(), "3", Slot::Main, DD, "M1", 10).draft;
        assert_eq!(
            draft.add_split(&key("3")).unwrap_err(),
            AllocationError::NothingLeftToSplit("XYZ 25MM".into())
        );
    }

    #[test]
    fn split_ids_stay_stable_after_removal() {
        let (draft, first) = draft().add_split(&key("1")).unwrap();
        let (draft, second) = draft.add_split(&key("1")).unwrap();
        let draft = draft.remove_split(&key("1"), first).unwrap();

        let item = draft.item(&key("1")).unwrap();
        assert_eq!(item.ordinal(second), Some(1));
        assert!(draft.remove_split(&key("1"), first).is_err());

        let (draft, third) = draft.add_split(&key("1")).unwrap();
        assert_ne!(third, first);
        assert_eq!(draft.item(&key("1")).unwrap().ordinal(third), Some(2));
    }

    #[test]
    fn weight_entry_converts_to_cases() {
        // indent_item usa 25 por caixa
        let draft = draft().set_load_weight(&key("3"), Slot::Main, Decimal::from(125)).unwrap();
        let main = &draft.item(&key("3")).unwrap().main;
        assert_eq!((main.load_case, main.load_wt), (5, Decimal::from(125)));
    }

    #[test]
    fn weight_entry_rejects_partial_cases_and_overweight() {
        assert!(matches!(
            draft().set_load_weight(&key("3"), Slot::Main, Decimal::from(130)),
            Err(AllocationError::WeightNotWholeCases { .. })
        ));
        assert!(matches!(
            draft().set_load_weight(&key("3"), Slot::Main, Decimal::from(275)),
            Err(AllocationError::WeightExceedsRemaining { .. })
        ));
        assert!(matches!(
            draft().set_load_weight(&key("3"), Slot::Main, Decimal::ZERO),
            Err(AllocationError::NonPositiveWeight { .. })
        ));
    }

    #[test]
    fn reset_quantity_zeroes_the_slot() {
        let draft = draft().set_load_case(&key("1"), Slot::Main, Decimal::from(9)).unwrap();
        let reset = draft.reset_quantity(&key("1"), Slot::Main);
        let main = &reset.item(&key("1")).unwrap().main;
        assert_eq!((main.load_case, main.load_wt), (0, Decimal::ZERO));
    }
}
