use crate::model::movable::{Movable, MovableKind, MovablePayload};
use crate::scene::graph::NodeSpec;
use std::collections::BTreeMap;
use std::rc::Rc;

pub type RendererFactory = Rc<dyn Fn(&Movable) -> NodeSpec>;

/// Maps each movable kind to the factory building its scene node.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    factories: BTreeMap<MovableKind, RendererFactory>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a renderer for every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in MovableKind::ALL {
            registry.register(kind, Rc::new(default_node));
        }
        registry
    }

    /// Installs `factory` for `kind`, returning the one it replaces.
    pub fn register(&mut self, kind: MovableKind, factory: RendererFactory) -> Option<RendererFactory> {
        self.factories.insert(kind, factory)
    }

    pub fn unregister(&mut self, kind: MovableKind) -> bool {
        self.factories.remove(&kind).is_some()
    }

    pub fn supports(&self, kind: MovableKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Node spec for `movable`; `None` when its kind has no renderer.
    pub fn render(&self, movable: &Movable) -> Option<NodeSpec> {
        self.factories
            .get(&movable.kind())
            .map(|factory| factory(movable))
    }
}

fn default_node(movable: &Movable) -> NodeSpec {
    match &movable.payload {
        MovablePayload::Note { text } => NodeSpec {
            template: "note",
            label: Some(text.clone()),
            source: None,
        },
        MovablePayload::Image { url } => NodeSpec {
            template: "image",
            label: None,
            source: Some(url.clone()),
        },
        MovablePayload::Model { url } => NodeSpec {
            template: "model",
            label: None,
            source: Some(url.clone()),
        },
        MovablePayload::Trashcan => NodeSpec {
            template: "trashcan",
            label: None,
            source: None,
        },
        MovablePayload::ScreenShare { client_id } => NodeSpec {
            template: "screen_share",
            label: None,
            source: client_id.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::RendererRegistry;
    use crate::model::movable::{Movable, MovableKind, MovablePayload};
    use crate::scene::graph::NodeSpec;
    use std::rc::Rc;

    fn note(text: &str) -> Movable {
        Movable {
            id: "n1".to_string(),
            payload: MovablePayload::Note {
                text: text.to_string(),
            },
            position: None,
            rotation: None,
            selected: false,
            hovered: false,
            being_dragged: false,
            space: None,
        }
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry = RendererRegistry::with_defaults();
        assert!(MovableKind::ALL.into_iter().all(|kind| registry.supports(kind)));
        let spec = registry.render(&note("hello")).expect("note renders");
        assert_eq!(spec.template, "note");
        assert_eq!(spec.label.as_deref(), Some("hello"));
    }

    #[test]
    fn unregistered_kind_renders_nothing() {
        let mut registry = RendererRegistry::with_defaults();
        assert!(registry.unregister(MovableKind::Note));
        assert_eq!(registry.render(&note("x")), None);
    }

    #[test]
    fn registration_replaces_factory() {
        let mut registry = RendererRegistry::with_defaults();
        let previous = registry.register(
            MovableKind::Note,
            Rc::new(|_: &Movable| NodeSpec {
                template: "sticky",
                label: None,
                source: None,
            }),
        );
        assert!(previous.is_some());
        assert_eq!(
            registry.render(&note("x")).map(|spec| spec.template),
            Some("sticky")
        );
    }
}
