use crate::canvas::editor::{hovered_entity, selected_entities, CanvasEditor};
use crate::events::{EventBus, InteractionEvent, Topic};
use crate::model::movable::props;
use crate::model::value::EntityId;
use crate::store::access;
use crate::store::EntityStore;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub written: usize,
    pub selection_changes: usize,
}

/// Mirrors the editor's selection and hover into every movable.
///
/// Each pass recomputes the flags of all movables from scratch, so the
/// result only depends on the editor state at the time of the pass. Only
/// flags that differ from the stored value are written.
#[derive(Debug, Default)]
pub struct SelectionReconciler {
    last_selected: RefCell<BTreeSet<EntityId>>,
}

impl SelectionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one pass. `live` is checked after every store call and before
    /// every write or publish; once it returns `false` the pass stops and
    /// the remembered selection is left untouched.
    pub async fn reconcile(
        &self,
        store: &dyn EntityStore,
        editor: &dyn CanvasEditor,
        bus: &EventBus,
        live: &dyn Fn() -> bool,
    ) -> ReconcileReport {
        let selected: BTreeSet<EntityId> = selected_entities(editor).into_iter().collect();
        let hovered = hovered_entity(editor);
        let movables = access::movable_ids(store).await;

        let mut report = ReconcileReport {
            scanned: movables.len(),
            ..ReconcileReport::default()
        };
        let mut now_selected = BTreeSet::new();
        for id in &movables {
            if !live() {
                return stale(report);
            }
            let Some(handle) = access::resolve(store, id).await else {
                continue;
            };
            let is_selected = selected.contains(id);
            let is_hovered = hovered.as_deref() == Some(id.as_str());
            if is_selected {
                now_selected.insert(id.clone());
            }

            let stored_selected = access::read_bool(store, &handle, props::SELECTED).await;
            if !live() {
                return stale(report);
            }
            if stored_selected != is_selected
                && access::write(store, &handle, props::SELECTED, is_selected.into()).await
            {
                report.written += 1;
            }

            let stored_hovered = access::read_bool(store, &handle, props::HOVERED).await;
            if !live() {
                return stale(report);
            }
            if stored_hovered != is_hovered
                && access::write(store, &handle, props::HOVERED, is_hovered.into()).await
            {
                report.written += 1;
            }
        }
        if !live() {
            return stale(report);
        }

        let flipped: Vec<EntityId> = {
            let mut last = self.last_selected.borrow_mut();
            let flipped = last
                .symmetric_difference(&now_selected)
                .cloned()
                .collect();
            *last = now_selected;
            flipped
        };
        for id in &flipped {
            bus.publish(Topic::SelectionChanged, &InteractionEvent::new(id.as_str()));
        }
        report.selection_changes = flipped.len();

        debug!(
            "event=selection_reconcile module=canvas status=ok scanned={} written={} changed={}",
            report.scanned, report.written, report.selection_changes
        );
        report
    }

    /// Forgets the previous selection, e.g. on unmount.
    pub fn reset(&self) {
        self.last_selected.borrow_mut().clear();
    }
}

fn stale(report: ReconcileReport) -> ReconcileReport {
    debug!(
        "event=selection_reconcile module=canvas status=skip reason=stale written={}",
        report.written
    );
    report
}
