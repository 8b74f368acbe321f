#![forbid(unsafe_code)]

//! Component descriptors indexed by id.
//!
//! The store never creates or destroys descriptors on its own; the host
//! instantiates components on the canvas and registers them here.

use std::any::Any;
use std::fmt;
use std::rc::Weak;

use ahash::AHashMap;

use crate::error::TreeError;
use crate::id::ComponentId;

/// Runtime descriptor of one canvas component.
///
/// `P` is the display payload (element kind plus current props). The core
/// never inspects it.
pub struct ComponentDescriptor<P> {
    id: ComponentId,
    payload: P,
    accepts_child: bool,
    /// Back-reference owned by the renderer. Held weakly.
    renderer: Option<Weak<dyn Any>>,
}

impl<P> ComponentDescriptor<P> {
    /// A component that can hold children.
    #[must_use]
    pub fn container(id: impl Into<ComponentId>, payload: P) -> Self {
        Self::new(id, payload, true)
    }

    /// A component that never holds children.
    #[must_use]
    pub fn leaf(id: impl Into<ComponentId>, payload: P) -> Self {
        Self::new(id, payload, false)
    }

    #[must_use]
    pub fn new(id: impl Into<ComponentId>, payload: P, accepts_child: bool) -> Self {
        Self {
            id: id.into(),
            payload,
            accepts_child,
            renderer: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    #[inline]
    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Consume the descriptor, keeping only its payload.
    #[must_use]
    pub fn into_payload(self) -> P {
        self.payload
    }

    #[inline]
    #[must_use]
    pub fn accepts_child(&self) -> bool {
        self.accepts_child
    }

    /// The renderer back-reference, if the renderer is still alive.
    #[must_use]
    pub fn renderer(&self) -> Option<std::rc::Rc<dyn Any>> {
        self.renderer.as_ref()?.upgrade()
    }

    /// Attach the renderer back-reference. The store keeps only a weak handle.
    pub fn set_renderer(&mut self, renderer: Weak<dyn Any>) {
        self.renderer = Some(renderer);
    }
}

impl<P: fmt::Debug> fmt::Debug for ComponentDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("accepts_child", &self.accepts_child)
            .field("renderer_attached", &self.renderer().is_some())
            .finish()
    }
}

/// Mapping from component id to descriptor.
pub struct ComponentStore<P> {
    components: AHashMap<ComponentId, ComponentDescriptor<P>>,
}

impl<P> Default for ComponentStore<P> {
    fn default() -> Self {
        Self {
            components: AHashMap::new(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for ComponentStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("len", &self.components.len())
            .finish()
    }
}

impl<P> ComponentStore<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a descriptor. Fails if the id is already taken.
    pub fn insert(&mut self, descriptor: ComponentDescriptor<P>) -> Result<(), TreeError> {
        if self.components.contains_key(descriptor.id()) {
            return Err(TreeError::DuplicateId {
                id: descriptor.id().clone(),
            });
        }
        self.components.insert(descriptor.id().clone(), descriptor);
        Ok(())
    }

    /// Drop a descriptor from the index, handing it back to the host.
    pub fn remove(&mut self, id: &ComponentId) -> Result<ComponentDescriptor<P>, TreeError> {
        self.components
            .remove(id)
            .ok_or_else(|| TreeError::NotFound { id: id.clone() })
    }

    pub fn get(&self, id: &ComponentId) -> Result<&ComponentDescriptor<P>, TreeError> {
        self.components
            .get(id)
            .ok_or_else(|| TreeError::NotFound { id: id.clone() })
    }

    pub fn get_mut(&mut self, id: &ComponentId) -> Result<&mut ComponentDescriptor<P>, TreeError> {
        self.components
            .get_mut(id)
            .ok_or_else(|| TreeError::NotFound { id: id.clone() })
    }

    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.components.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
