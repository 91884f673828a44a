//! Host scene seam.
//!
//! The engine never owns scene objects. Adapters implement [`Scene`] over the
//! host's object model; [`SceneGraph`] is a small in-memory implementation used
//! by tests, benches and headless embedding.

use hashbrown::HashMap;

use crate::error::AnimError;
use crate::fragment::Transform;
use crate::ids::{EntityId, IdAllocator};
use crate::Result;

/// Read/write access to host objects by stable id.
pub trait Scene {
    /// Resolve an identity (object name) to a live entity.
    fn find(&self, name: &str) -> Option<EntityId>;
    fn name(&self, id: EntityId) -> Option<&str>;
    fn is_alive(&self, id: EntityId) -> bool;
    /// Text body for text objects, `None` otherwise.
    fn text(&self, id: EntityId) -> Option<&str>;
    fn transform(&self, id: EntityId) -> Option<Transform>;
    fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<()>;
}

#[derive(Clone, Debug)]
struct Node {
    name: String,
    text: Option<String>,
    transform: Transform,
}

/// In-memory scene keyed by [`EntityId`].
#[derive(Debug, Default)]
pub struct SceneGraph {
    ids: IdAllocator,
    nodes: HashMap<EntityId, Node>,
    by_name: HashMap<String, EntityId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. A name already in use is rebound to the new entity.
    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        self.insert(name.into(), None, transform)
    }

    pub fn spawn_text(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
        transform: Transform,
    ) -> EntityId {
        self.insert(name.into(), Some(text.into()), transform)
    }

    fn insert(&mut self, name: String, text: Option<String>, transform: Transform) -> EntityId {
        let id = self.ids.alloc_entity();
        self.by_name.insert(name.clone(), id);
        self.nodes.insert(
            id,
            Node {
                name,
                text,
                transform,
            },
        );
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        match self.nodes.remove(&id) {
            Some(node) => {
                if self.by_name.get(&node.name) == Some(&id) {
                    self.by_name.remove(&node.name);
                }
                true
            }
            None => false,
        }
    }

    pub fn set_text(&mut self, id: EntityId, text: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(AnimError::EntityDead { id })?;
        node.text = Some(text.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Scene for SceneGraph {
    fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    fn name(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    fn is_alive(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn text(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.text.as_deref())
    }

    fn transform(&self, id: EntityId) -> Option<Transform> {
        self.nodes.get(&id).map(|n| n.transform)
    }

    fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(AnimError::EntityDead { id })?;
        node.transform = transform;
        Ok(())
    }
}
