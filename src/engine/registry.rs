//! Instance Registry - Arena of committed nodes.
//!
//! Every node that has been rendered owns one slot in the arena. The slot
//! holds the committed side of the node: its DOM reference, logical parent,
//! children and per-kind runtime state (mixins, component handle, frame
//! state). Instances refer to each other by [`InstanceId`], never by pointer.
//!
//! - Free index pool for O(1) slot reuse
//! - Generation counter per slot, so an id held across a flush (scheduler
//!   batch, update callback) goes stale instead of aliasing a new instance

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::DomNode;
use crate::engine::abort::AbortController;
use crate::engine::component::Component;
use crate::engine::node::Node;
use crate::mixin::MixinRuntime;
use crate::props::ControlledReflection;
use crate::types::{DiffFlags, Namespace, Props};

// =============================================================================
// Ids
// =============================================================================

/// Generational handle to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

// =============================================================================
// Instances
// =============================================================================

/// The committed side of a node.
pub struct Instance {
    /// The node this instance last rendered (the diff baseline).
    pub node: Node,
    /// Logical parent. `None` for the root and for detached persisted nodes.
    pub parent: Option<InstanceId>,
    /// DOM parent this instance's DOM lives in.
    pub dom_parent: DomNode,
    /// Namespace context the instance was created in.
    pub namespace: Namespace,
    pub kind: InstanceKind,
    /// Bookkeeping for the child-list diff in progress. Cleared afterwards.
    pub flags: DiffFlags,
}

pub enum InstanceKind {
    Text(DomNode),
    Host(HostInstance),
    Fragment(Vec<InstanceId>),
    Component(ComponentInstance),
    Frame(FrameInstance),
}

pub struct HostInstance {
    pub dom: DomNode,
    /// The element's own namespace.
    pub namespace: Namespace,
    /// Props as last written to the DOM (after mixin composition).
    pub applied: Props,
    pub children: Vec<InstanceId>,
    pub mixins: Option<Rc<MixinRuntime>>,
    pub controlled: Option<ControlledReflection>,
    /// Lives in `document.head` instead of its logical DOM parent.
    pub hoisted: bool,
    /// This is the `<head>` host mapped onto the document's own head.
    pub document_head: bool,
    /// Removal token while a deferred removal is pending.
    pub persisted: Option<u64>,
}

pub struct ComponentInstance {
    /// Shared so a render can run without holding the arena borrow.
    pub handle: Rc<RefCell<Box<dyn Component>>>,
    pub child: Option<InstanceId>,
}

pub struct FrameInstance {
    pub start: DomNode,
    pub end: DomNode,
    /// Resolution token. Bumped on every new resolution and on removal; a
    /// settled resolution only applies if its token is still current.
    pub token: u64,
    pub controller: Option<AbortController>,
    pub resolved: bool,
    /// Fallback or resolved content.
    pub child: Option<InstanceId>,
    /// Unadopted server DOM between the markers, claimed by the first
    /// resolution.
    pub pending_hydration: bool,
}

impl Instance {
    pub fn new(
        node: Node,
        parent: Option<InstanceId>,
        dom_parent: DomNode,
        namespace: Namespace,
        kind: InstanceKind,
    ) -> Self {
        Self {
            node,
            parent,
            dom_parent,
            namespace,
            kind,
            flags: DiffFlags::NONE,
        }
    }

    pub fn as_host(&self) -> Option<&HostInstance> {
        match &self.kind {
            InstanceKind::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut HostInstance> {
        match &mut self.kind {
            InstanceKind::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&FrameInstance> {
        match &self.kind {
            InstanceKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_frame_mut(&mut self) -> Option<&mut FrameInstance> {
        match &mut self.kind {
            InstanceKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Logical children, in order.
    pub fn children(&self) -> Vec<InstanceId> {
        match &self.kind {
            InstanceKind::Text(_) => Vec::new(),
            InstanceKind::Host(host) => host.children.clone(),
            InstanceKind::Fragment(children) => children.clone(),
            InstanceKind::Component(component) => component.child.into_iter().collect(),
            InstanceKind::Frame(frame) => frame.child.into_iter().collect(),
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, InstanceKind::Component(_))
    }
}

// =============================================================================
// Arena
// =============================================================================

struct Slot {
    generation: u32,
    instance: Option<Instance>,
}

/// Arena of committed instances for one root.
pub struct Tree {
    slots: Vec<Slot>,
    /// Pool of freed slot indices for reuse.
    free: Vec<u32>,
    live: usize,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store an instance, reusing a freed slot if there is one.
    pub fn allocate(&mut self, instance: Instance) -> InstanceId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.instance = Some(instance);
            return InstanceId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            instance: Some(instance),
        });
        InstanceId { index, generation: 0 }
    }

    /// Take an instance out of the arena. The id (and every copy of it) goes
    /// stale.
    pub fn release(&mut self, id: InstanceId) -> Option<Instance> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let instance = slot.instance.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(instance)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.instance.as_ref())
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.instance.as_mut())
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Nearest ancestor (exclusive) that is a component.
    pub fn owning_component(&self, id: InstanceId) -> Option<InstanceId> {
        let mut current = self.get(id)?.parent;
        while let Some(ancestor) = current {
            let instance = self.get(ancestor)?;
            if instance.is_component() {
                return Some(ancestor);
            }
            current = instance.parent;
        }
        None
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<InstanceId> for Tree {
    type Output = Instance;

    fn index(&self, id: InstanceId) -> &Instance {
        self.get(id)
            .unwrap_or_else(|| panic!("stale instance id {id:?}"))
    }
}

impl std::ops::IndexMut<InstanceId> for Tree {
    fn index_mut(&mut self, id: InstanceId) -> &mut Instance {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("stale instance id {id:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::engine::node::text;

    fn text_instance(doc: &Document, value: &str) -> Instance {
        let dom = doc.create_text_node(value);
        Instance::new(text(value), None, doc.body(), Namespace::Html, InstanceKind::Text(dom))
    }

    #[test]
    fn test_allocate_and_get() {
        let doc = Document::new();
        let mut tree = Tree::new();
        let a = tree.allocate(text_instance(&doc, "a"));
        let b = tree.allocate(text_instance(&doc, "b"));

        assert_ne!(a, b);
        assert_eq!(tree.len(), 2);
        assert!(tree.contains(a));
        assert!(matches!(tree[b].kind, InstanceKind::Text(_)));
    }

    #[test]
    fn test_release_and_reuse() {
        let doc = Document::new();
        let mut tree = Tree::new();
        let a = tree.allocate(text_instance(&doc, "a"));
        assert!(tree.release(a).is_some());
        assert!(!tree.contains(a));

        // Slot is reused with a new generation; the old id stays stale.
        let b = tree.allocate(text_instance(&doc, "b"));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(tree.get(a).is_none());
        assert!(tree.release(a).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_owning_component_skips_hosts() {
        use crate::engine::component::ComponentType;
        use crate::engine::node::{component, h};

        let doc = Document::new();
        let mut tree = Tree::new();
        let ty = ComponentType::stateless("C", |_| text("x"));
        let comp = tree.allocate(Instance::new(
            component(&ty, Props::new()),
            None,
            doc.body(),
            Namespace::Html,
            InstanceKind::Component(ComponentInstance {
                handle: Rc::new(RefCell::new(ty.create())),
                child: None,
            }),
        ));
        let div = tree.allocate(Instance::new(
            h("div").build(),
            Some(comp),
            doc.body(),
            Namespace::Html,
            InstanceKind::Fragment(Vec::new()),
        ));
        let leaf = tree.allocate(Instance::new(
            text("t"),
            Some(div),
            doc.body(),
            Namespace::Html,
            InstanceKind::Text(doc.create_text_node("t")),
        ));

        assert_eq!(tree.owning_component(leaf), Some(comp));
        assert_eq!(tree.owning_component(comp), None);
    }
}
