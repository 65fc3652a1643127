//! Resource identity and per-frame usage tracking.

use std::sync::Arc;

use ember_core::arena::{Idx, List, ListArena};

use super::pass::PassHandle;

/// What kind of object a [`ResourceKey`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A GPU texture.
    Texture,
    /// A GPU buffer.
    Buffer,
    /// A symbolic resource with no GPU object, used only to order passes.
    Scope,
}

/// Identity of an externally owned GPU resource.
///
/// Keys compare by identity only: two keys are equal when they name the same
/// object, never because two objects have equal contents. Keys built from an
/// `Arc` use its address, so the `Arc` must stay alive for the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    kind: ResourceKind,
    id: u64,
}

impl ResourceKey {
    /// Key for a texture owned through an `Arc`.
    pub fn texture<T: ?Sized>(texture: &Arc<T>) -> Self {
        Self::from_raw(ResourceKind::Texture, Arc::as_ptr(texture).cast::<()>() as usize as u64)
    }

    /// Key for a buffer owned through an `Arc`.
    pub fn buffer<T: ?Sized>(buffer: &Arc<T>) -> Self {
        Self::from_raw(ResourceKind::Buffer, Arc::as_ptr(buffer).cast::<()>() as usize as u64)
    }

    /// Key for a symbolic ordering scope.
    pub const fn scope(id: u64) -> Self {
        Self::from_raw(ResourceKind::Scope, id)
    }

    /// Key from a raw backend handle value.
    pub const fn from_raw(kind: ResourceKind, id: u64) -> Self {
        Self { kind, id }
    }

    /// Kind of the referenced object.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Raw identity value.
    pub fn raw(&self) -> u64 {
        self.id
    }
}

/// Handle to a [`Resource`] tracked by a render graph.
///
/// Only valid for the frame that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub(crate) Idx<Resource>);

impl ResourceHandle {
    /// Position of the resource in first-reference order.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

static_assertions::assert_impl_all!(ResourceKey: Copy, Send, Sync);
static_assertions::assert_impl_all!(ResourceHandle: Copy, Send, Sync);

/// Passes that write, read, or read-write one resource during a frame.
///
/// Lists keep declaration order and are never de-duplicated: a pass that
/// declares the same resource twice appears twice.
#[derive(Debug)]
pub struct Resource {
    key: ResourceKey,
    writers: List<PassHandle>,
    readers: List<PassHandle>,
    read_writers: List<PassHandle>,
    is_output: bool,
    last_writer: Option<PassHandle>,
    read_since_write: bool,
}

impl Resource {
    pub(crate) fn new(key: ResourceKey) -> Self {
        Self {
            key,
            writers: List::new(),
            readers: List::new(),
            read_writers: List::new(),
            is_output: false,
            last_writer: None,
            read_since_write: false,
        }
    }

    /// Identity of the tracked object.
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Check if the resource was declared as a frame output.
    pub fn is_output(&self) -> bool {
        self.is_output
    }

    pub(crate) fn mark_output(&mut self) -> bool {
        !std::mem::replace(&mut self.is_output, true)
    }

    pub(crate) fn add_writer(&mut self, links: &mut ListArena<PassHandle>, pass: PassHandle) {
        links.push(&mut self.writers, pass);
    }

    pub(crate) fn add_reader(&mut self, links: &mut ListArena<PassHandle>, pass: PassHandle) {
        links.push(&mut self.readers, pass);
    }

    pub(crate) fn add_read_writer(&mut self, links: &mut ListArena<PassHandle>, pass: PassHandle) {
        links.push(&mut self.read_writers, pass);
    }

    pub(crate) fn writers(&self) -> &List<PassHandle> {
        &self.writers
    }

    pub(crate) fn read_writers(&self) -> &List<PassHandle> {
        &self.read_writers
    }

    /// Record a read for write-hazard tracking.
    pub(crate) fn note_read(&mut self) {
        self.read_since_write = true;
    }

    /// Record a write and return the previous writer if nobody read in between.
    pub(crate) fn note_write(&mut self, pass: PassHandle) -> Option<PassHandle> {
        let hazard = match self.last_writer {
            Some(previous) if previous != pass && !self.read_since_write => Some(previous),
            _ => None,
        };
        self.last_writer = Some(pass);
        self.read_since_write = false;
        hazard
    }
}

/// Read-only view of a [`Resource`] together with its pass lists.
#[derive(Clone, Copy)]
pub struct ResourceView<'g> {
    pub(crate) resource: &'g Resource,
    pub(crate) links: &'g ListArena<PassHandle>,
}

impl<'g> ResourceView<'g> {
    /// Identity of the tracked object.
    pub fn key(&self) -> ResourceKey {
        self.resource.key
    }

    /// Check if the resource was declared as a frame output.
    pub fn is_output(&self) -> bool {
        self.resource.is_output
    }

    /// Passes that only write the resource, in declaration order.
    pub fn writers(&self) -> impl Iterator<Item = PassHandle> + 'g {
        self.links.iter(&self.resource.writers).copied()
    }

    /// Passes that only read the resource, in declaration order.
    pub fn readers(&self) -> impl Iterator<Item = PassHandle> + 'g {
        self.links.iter(&self.resource.readers).copied()
    }

    /// Passes that both read and write the resource, in declaration order.
    pub fn read_writers(&self) -> impl Iterator<Item = PassHandle> + 'g {
        self.links.iter(&self.resource.read_writers).copied()
    }

    /// Passes that must precede any reader: writers, then read-writers.
    pub fn producers(&self) -> impl Iterator<Item = PassHandle> + 'g {
        self.writers().chain(self.read_writers())
    }
}

impl std::fmt::Debug for ResourceView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceView")
            .field("key", &self.resource.key)
            .field("writers", &self.resource.writers.len())
            .field("readers", &self.resource.readers.len())
            .field("read_writers", &self.resource.read_writers.len())
            .field("is_output", &self.resource.is_output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pass::{Pass, PassKind};
    use ember_core::arena::Arena;

    fn pass_handles(count: usize) -> (Arena<Pass>, Vec<PassHandle>) {
        let mut passes = Arena::new();
        let handles = (0..count)
            .map(|i| PassHandle(passes.alloc(Pass::new(PassKind::Graphics, format!("pass_{i}").into()))))
            .collect();
        (passes, handles)
    }

    #[test]
    fn test_key_identity_from_arc() {
        let a = Arc::new(0u32);
        let b = Arc::new(0u32);

        assert_eq!(ResourceKey::texture(&a), ResourceKey::texture(&a.clone()));
        assert_ne!(ResourceKey::texture(&a), ResourceKey::texture(&b));
        assert_ne!(ResourceKey::texture(&a), ResourceKey::buffer(&a));
    }

    #[test]
    fn test_raw_and_scope_keys() {
        let key = ResourceKey::from_raw(ResourceKind::Buffer, 42);
        assert_eq!(key.kind(), ResourceKind::Buffer);
        assert_eq!(key.raw(), 42);
        assert_eq!(ResourceKey::scope(1).kind(), ResourceKind::Scope);
        assert_ne!(ResourceKey::scope(1), ResourceKey::from_raw(ResourceKind::Texture, 1));
    }

    #[test]
    fn test_usage_lists_keep_order_and_duplicates() {
        let (_scratch, passes) = pass_handles(3);
        let mut links = ListArena::new();
        let mut resource = Resource::new(ResourceKey::scope(0));

        resource.add_writer(&mut links, passes[0]);
        resource.add_reader(&mut links, passes[1]);
        resource.add_writer(&mut links, passes[2]);
        resource.add_writer(&mut links, passes[2]);
        resource.add_read_writer(&mut links, passes[1]);

        let view = ResourceView {
            resource: &resource,
            links: &links,
        };
        assert_eq!(view.writers().collect::<Vec<_>>(), vec![passes[0], passes[2], passes[2]]);
        assert_eq!(view.readers().collect::<Vec<_>>(), vec![passes[1]]);
        assert_eq!(view.read_writers().collect::<Vec<_>>(), vec![passes[1]]);
        assert_eq!(
            view.producers().collect::<Vec<_>>(),
            vec![passes[0], passes[2], passes[2], passes[1]]
        );
    }

    #[test]
    fn test_write_hazard_tracking() {
        let (_scratch, passes) = pass_handles(3);
        let mut resource = Resource::new(ResourceKey::scope(0));

        assert_eq!(resource.note_write(passes[0]), None);
        // Second writer with no read in between
        assert_eq!(resource.note_write(passes[1]), Some(passes[0]));

        resource.note_read();
        assert_eq!(resource.note_write(passes[2]), None);

        // Same pass writing twice is not a hazard
        assert_eq!(resource.note_write(passes[2]), None);
    }

    #[test]
    fn test_mark_output_once() {
        let mut resource = Resource::new(ResourceKey::scope(0));
        assert!(resource.mark_output());
        assert!(!resource.mark_output());
        assert!(resource.is_output());
    }
}
