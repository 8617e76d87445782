// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selection state of the 3D view
//!
//! The controller is the only owner of the selection set. It swaps shared
//! materials on product nodes to show highlight, and talks to other views
//! only through the [`EventBus`].

use crate::{
    Component, ComponentId, EventBus, MaterialKind, MaterialPalette, NodeKey, SceneEvent,
    SceneGraph, Subscription, ViewId,
};
use ifc_scene_model::GlobalId;

/// Name under which the controller subscribes to the bus
pub const VIEW_NAME: &str = "3d";

/// Keyboard modifiers held during a pick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    /// Command on macOS
    pub super_key: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Default::default()
        }
    }

    /// Whether the pick adds to / removes from the selection
    pub fn is_additive(&self) -> bool {
        self.ctrl || self.super_key
    }
}

pub struct SelectionController {
    bus: EventBus,
    subscription: Subscription,
    selected: Vec<GlobalId>,
}

impl SelectionController {
    pub fn new(bus: &EventBus) -> Self {
        Self {
            bus: bus.clone(),
            subscription: bus.subscribe(VIEW_NAME),
            selected: Vec::new(),
        }
    }

    pub fn view_id(&self) -> ViewId {
        self.subscription.id()
    }

    /// Selected ids in selection order
    pub fn selected(&self) -> &[GlobalId] {
        &self.selected
    }

    pub fn is_selected(&self, id: &GlobalId) -> bool {
        self.selected.contains(id)
    }

    /// Route a pick: Ctrl/Super toggles, a plain click selects exclusively
    pub fn pick(&mut self, graph: &mut SceneGraph, id: &GlobalId, modifiers: Modifiers) -> Vec<SceneEvent> {
        if modifiers.is_additive() {
            self.toggle(graph, id)
        } else {
            self.select_exclusive(graph, id)
        }
    }

    /// Make `id` the only selected entity
    ///
    /// Emits one deselect per dropped id, then the select. Unknown ids are
    /// ignored.
    pub fn select_exclusive(&mut self, graph: &mut SceneGraph, id: &GlobalId) -> Vec<SceneEvent> {
        let Some(node) = graph.find_product(id) else {
            log::debug!("Ignoring selection of unknown {}", id);
            return Vec::new();
        };

        let mut events = Vec::new();
        let already_selected = self.is_selected(id);
        for previous in std::mem::take(&mut self.selected) {
            if &previous == id {
                continue;
            }
            if let Some(key) = graph.find_product(&previous) {
                set_highlight(graph, key, false);
            }
            events.push(SceneEvent::Deselect(previous));
        }

        self.selected.push(id.clone());
        if !already_selected {
            set_highlight(graph, node, true);
            events.push(SceneEvent::Select(id.clone()));
        }

        self.bus.publish_all(self.view_id(), events.iter().cloned());
        events
    }

    /// Add `id` if absent, remove it if present
    pub fn toggle(&mut self, graph: &mut SceneGraph, id: &GlobalId) -> Vec<SceneEvent> {
        let Some(node) = graph.find_product(id) else {
            return Vec::new();
        };

        let event = if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
            set_highlight(graph, node, false);
            SceneEvent::Deselect(id.clone())
        } else {
            self.selected.push(id.clone());
            set_highlight(graph, node, true);
            SceneEvent::Select(id.clone())
        };

        self.bus.publish(self.view_id(), event.clone());
        vec![event]
    }

    /// Apply an event from another view without re-emitting it
    ///
    /// Returns whether the selection changed. An event that matches the
    /// current state is a no-op.
    pub fn receive(&mut self, graph: &mut SceneGraph, event: &SceneEvent) -> bool {
        match event {
            SceneEvent::Select(id) => {
                if self.is_selected(id) {
                    return false;
                }
                let Some(node) = graph.find_product(id) else {
                    return false;
                };
                self.selected.push(id.clone());
                set_highlight(graph, node, true);
                true
            }
            SceneEvent::Deselect(id) => {
                let Some(pos) = self.selected.iter().position(|s| s == id) else {
                    return false;
                };
                self.selected.remove(pos);
                if let Some(node) = graph.find_product(id) {
                    set_highlight(graph, node, false);
                }
                true
            }
            SceneEvent::Update(_) => false,
        }
    }

    /// Apply everything other views published since the last sync
    pub fn sync(&mut self, graph: &mut SceneGraph) -> usize {
        self.subscription
            .drain()
            .iter()
            .filter(|event| self.receive(graph, event))
            .count()
    }

    /// Drop the selection without emitting, e.g. when files close
    pub fn clear(&mut self, graph: &mut SceneGraph) {
        for id in std::mem::take(&mut self.selected) {
            if let Some(node) = graph.find_product(&id) {
                set_highlight(graph, node, false);
            }
        }
    }

    /// Drop ids whose nodes are gone and re-highlight the rest
    ///
    /// Used after a reload, which rebuilds nodes with their normal material.
    /// Each dropped id is published as a deselect.
    pub fn forget(&mut self, graph: &mut SceneGraph) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        self.selected.retain(|id| match graph.find_product(id) {
            Some(node) => {
                set_highlight(graph, node, true);
                true
            }
            None => {
                events.push(SceneEvent::Deselect(id.clone()));
                false
            }
        });
        self.bus.publish_all(self.view_id(), events.iter().cloned());
        events
    }
}

fn material(kind: MaterialKind) -> Component {
    Component::Material(MaterialPalette::global().get(kind))
}

/// Swap materials on the representation children of a product node
///
/// Wireframe children are never highlighted; they trade the wireframe
/// material for the normal one while selected.
fn set_highlight(graph: &mut SceneGraph, product: NodeKey, on: bool) {
    let children = graph.children(product).to_vec();
    for child in children {
        let Some(node) = graph.get_mut(child) else {
            continue;
        };
        let resting = if node.is_wireframe() {
            MaterialKind::Wireframe
        } else if node.is_transparent() {
            MaterialKind::Transparent
        } else {
            MaterialKind::Normal
        };
        let active = if node.is_wireframe() {
            MaterialKind::Normal
        } else {
            MaterialKind::Highlight
        };
        let (from, to) = if on { (resting, active) } else { (active, resting) };
        node.remove_component(ComponentId::Material(from));
        node.add_component(material(to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    /// Product node with a mesh child and a wireframe child
    fn product(graph: &mut SceneGraph, gid: &str, transparent: bool) -> NodeKey {
        let p = graph.spawn(graph.root(), gid).unwrap();
        graph.set_tag(p, tags::GLOBAL_ID, gid).unwrap();
        let mesh = graph.spawn(p, "Mesh").unwrap();
        let kind = if transparent {
            graph.set_tag(mesh, tags::IS_TRANSPARENT, true).unwrap();
            MaterialKind::Transparent
        } else {
            MaterialKind::Normal
        };
        graph.add_component(mesh, material(kind)).unwrap();
        let line = graph.spawn(p, "Line").unwrap();
        graph.set_tag(line, tags::IS_WIREFRAME, true).unwrap();
        graph.add_component(line, material(MaterialKind::Wireframe)).unwrap();
        p
    }

    fn kinds(graph: &SceneGraph, product: NodeKey) -> Vec<MaterialKind> {
        graph
            .children(product)
            .iter()
            .map(|&c| graph.get(c).unwrap().material().unwrap().kind)
            .collect()
    }

    fn gid(s: &str) -> GlobalId {
        GlobalId::from(s)
    }

    fn setup() -> (SceneGraph, EventBus, SelectionController, NodeKey, NodeKey) {
        let mut graph = SceneGraph::new("Root");
        let a = product(&mut graph, "A", false);
        let b = product(&mut graph, "B", true);
        let bus = EventBus::new();
        let controller = SelectionController::new(&bus);
        (graph, bus, controller, a, b)
    }

    #[test]
    fn test_exclusive_then_exclusive() {
        let (mut graph, _bus, mut sel, a, b) = setup();
        assert_eq!(sel.select_exclusive(&mut graph, &gid("A")), vec![SceneEvent::Select(gid("A"))]);
        let events = sel.select_exclusive(&mut graph, &gid("B"));
        assert_eq!(
            events,
            vec![SceneEvent::Deselect(gid("A")), SceneEvent::Select(gid("B"))]
        );
        assert_eq!(sel.selected(), &[gid("B")]);
        assert_eq!(kinds(&graph, a), vec![MaterialKind::Normal, MaterialKind::Wireframe]);
        assert_eq!(kinds(&graph, b), vec![MaterialKind::Highlight, MaterialKind::Normal]);
    }

    #[test]
    fn test_toggle_twice_is_balanced() {
        let (mut graph, _bus, mut sel, a, _) = setup();
        let first = sel.toggle(&mut graph, &gid("A"));
        let second = sel.toggle(&mut graph, &gid("A"));
        assert_eq!(first, vec![SceneEvent::Select(gid("A"))]);
        assert_eq!(second, vec![SceneEvent::Deselect(gid("A"))]);
        assert!(sel.selected().is_empty());
        assert_eq!(kinds(&graph, a), vec![MaterialKind::Normal, MaterialKind::Wireframe]);
    }

    #[test]
    fn test_toggle_adds_to_selection() {
        let (mut graph, _bus, mut sel, _, _) = setup();
        sel.pick(&mut graph, &gid("A"), Modifiers::default());
        sel.pick(&mut graph, &gid("B"), Modifiers::ctrl());
        assert_eq!(sel.selected(), &[gid("A"), gid("B")]);
    }

    #[test]
    fn test_transparent_restored_on_deselect() {
        let (mut graph, _bus, mut sel, _, b) = setup();
        sel.toggle(&mut graph, &gid("B"));
        sel.toggle(&mut graph, &gid("B"));
        assert_eq!(kinds(&graph, b), vec![MaterialKind::Transparent, MaterialKind::Wireframe]);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let (mut graph, bus, mut sel, _, _) = setup();
        let other = bus.subscribe("tree");
        assert!(sel.select_exclusive(&mut graph, &gid("missing")).is_empty());
        assert!(sel.toggle(&mut graph, &gid("missing")).is_empty());
        assert!(!sel.receive(&mut graph, &SceneEvent::Select(gid("missing"))));
        assert!(other.drain().is_empty());
    }

    #[test]
    fn test_events_reach_other_views() {
        let (mut graph, bus, mut sel, _, _) = setup();
        let tree = bus.subscribe("tree");
        sel.select_exclusive(&mut graph, &gid("A"));
        sel.select_exclusive(&mut graph, &gid("B"));
        assert_eq!(
            tree.drain(),
            vec![
                SceneEvent::Select(gid("A")),
                SceneEvent::Deselect(gid("A")),
                SceneEvent::Select(gid("B")),
            ]
        );
    }

    #[test]
    fn test_external_select_is_not_re_emitted() {
        let (mut graph, bus, mut sel, a, _) = setup();
        let tree = bus.subscribe("tree");
        bus.publish(tree.id(), SceneEvent::Select(gid("A")));
        assert_eq!(sel.sync(&mut graph), 1);
        assert!(sel.is_selected(&gid("A")));
        assert_eq!(kinds(&graph, a)[0], MaterialKind::Highlight);

        // Already selected locally: nothing changes, nothing is published
        bus.publish(tree.id(), SceneEvent::Select(gid("A")));
        assert_eq!(sel.sync(&mut graph), 0);
        assert!(tree.drain().is_empty());
    }

    #[test]
    fn test_external_deselect() {
        let (mut graph, _bus, mut sel, a, _) = setup();
        sel.select_exclusive(&mut graph, &gid("A"));
        assert!(sel.receive(&mut graph, &SceneEvent::Deselect(gid("A"))));
        assert!(!sel.receive(&mut graph, &SceneEvent::Deselect(gid("A"))));
        assert_eq!(kinds(&graph, a)[0], MaterialKind::Normal);
    }

    #[test]
    fn test_exclusive_reselect_keeps_highlight() {
        let (mut graph, _bus, mut sel, a, _) = setup();
        sel.select_exclusive(&mut graph, &gid("A"));
        assert!(sel.select_exclusive(&mut graph, &gid("A")).is_empty());
        assert_eq!(kinds(&graph, a), vec![MaterialKind::Highlight, MaterialKind::Normal]);
    }

    #[test]
    fn test_clear_and_forget() {
        let (mut graph, bus, mut sel, a, b) = setup();
        let tree = bus.subscribe("tree");
        sel.toggle(&mut graph, &gid("A"));
        sel.toggle(&mut graph, &gid("B"));
        tree.drain();

        graph.remove(b).unwrap();
        assert_eq!(sel.forget(&mut graph), vec![SceneEvent::Deselect(gid("B"))]);
        assert_eq!(sel.selected(), &[gid("A")]);
        assert_eq!(tree.drain(), vec![SceneEvent::Deselect(gid("B"))]);
        assert!(sel.forget(&mut graph).is_empty());

        sel.clear(&mut graph);
        assert!(sel.selected().is_empty());
        assert_eq!(kinds(&graph, a)[0], MaterialKind::Normal);
    }
}
