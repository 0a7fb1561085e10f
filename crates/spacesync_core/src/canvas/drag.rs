use crate::canvas::editor::{selected_entities, CanvasEditor};
use crate::model::value::EntityId;
use std::cell::RefCell;

/// Edge detected between two observations of the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTransition {
    Started(Vec<EntityId>),
    /// Carries the ids recorded when the drag started.
    Ended(Vec<EntityId>),
}

/// Detects drag start/end edges from sampled editor state.
///
/// A start fires on the first observation where the editor drags with a
/// non-empty selection. A rectangle-select drag therefore fires as soon as
/// the rectangle catches a shape; that false positive is accepted.
#[derive(Debug, Default)]
pub struct DragDetector {
    active: RefCell<Option<Vec<EntityId>>>,
}

impl DragDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, editor: &dyn CanvasEditor) -> Option<DragTransition> {
        let dragging = editor.is_dragging();
        let mut active = self.active.borrow_mut();
        match (active.is_some(), dragging) {
            (false, true) => {
                let selected = selected_entities(editor);
                if selected.is_empty() {
                    return None;
                }
                *active = Some(selected.clone());
                Some(DragTransition::Started(selected))
            }
            (true, false) => active.take().map(DragTransition::Ended),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Ids recorded at drag start, empty when idle.
    pub fn dragged(&self) -> Vec<EntityId> {
        self.active.borrow().clone().unwrap_or_default()
    }

    /// Forgets an in-progress drag without emitting its end.
    pub fn reset(&self) -> Vec<EntityId> {
        self.active.borrow_mut().take().unwrap_or_default()
    }
}
