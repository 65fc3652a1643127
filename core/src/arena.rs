//! Frame-scoped bump storage.
//!
//! Everything in this module follows the same lifecycle: values are appended
//! while a frame is being built, nothing is ever freed individually, and the
//! owner of the frame calls [`FrameReset::reset`] once per frame. Resetting
//! drops the contents but keeps the allocation, so a steady-state frame does
//! not touch the global allocator at all.
//!
//! Indices handed out by an arena carry the generation they were allocated
//! in. After a reset the generation advances and every old index resolves to
//! `None` instead of aliasing a value from the new frame.
//!
//! # Example
//!
//! ```
//! use ember_core::arena::{Arena, FrameReset, List, ListArena};
//!
//! let mut values = Arena::new();
//! let mut links = ListArena::new();
//!
//! let a = values.alloc("albedo");
//! let mut list = List::new();
//! links.push(&mut list, 1u32);
//! links.push(&mut list, 2u32);
//!
//! assert_eq!(values.get(a), Some(&"albedo"));
//! assert_eq!(links.iter(&list).copied().collect::<Vec<_>>(), vec![1, 2]);
//!
//! values.reset();
//! links.reset();
//! assert_eq!(values.get(a), None);
//! assert_eq!(links.iter(&list).count(), 0);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Storage that is cleared once per frame by its owner.
///
/// Implementations must keep their allocated capacity on reset.
pub trait FrameReset {
    /// Drop all values of the current frame and start a new generation.
    fn reset(&mut self);
}

const NONE: u32 = u32::MAX;

// ============================================================================
// Idx
// ============================================================================

/// Generation-checked index into an [`Arena<T>`].
pub struct Idx<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Position of the value inside its arena.
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the arena at allocation time.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Idx<T> {}

impl<T> Hash for Idx<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({}@{})", self.index, self.generation)
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Typed bump arena.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    generation: u32,
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
        }
    }

    /// Create an empty arena with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            generation: 0,
        }
    }

    /// Append a value and return its index.
    pub fn alloc(&mut self, value: T) -> Idx<T> {
        let index = self.items.len() as u32;
        debug_assert!(index != NONE, "arena index space exhausted");
        self.items.push(value);
        Idx::new(index, self.generation)
    }

    /// Resolve an index allocated in the current generation.
    pub fn get(&self, idx: Idx<T>) -> Option<&T> {
        if idx.generation != self.generation {
            return None;
        }
        self.items.get(idx.index())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, idx: Idx<T>) -> Option<&mut T> {
        if idx.generation != self.generation {
            return None;
        }
        self.items.get_mut(idx.index())
    }

    /// Check whether `idx` still refers to a live value.
    pub fn contains(&self, idx: Idx<T>) -> bool {
        idx.generation == self.generation && idx.index() < self.items.len()
    }

    /// Iterate over all values of the current generation in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> + '_ {
        let generation = self.generation;
        self.items
            .iter()
            .enumerate()
            .map(move |(i, value)| (Idx::new(i as u32, generation), value))
    }

    /// Number of values allocated this generation.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing has been allocated this generation.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Retained capacity.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Current generation.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameReset for Arena<T> {
    fn reset(&mut self) {
        self.items.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

// ============================================================================
// ListArena
// ============================================================================

#[derive(Debug)]
struct Link<T> {
    value: T,
    next: u32,
}

/// Head of an ordered, append-only list stored in a [`ListArena<T>`].
///
/// A `List` is a few words of bookkeeping embedded in some other frame object;
/// the elements themselves live in the shared arena.
pub struct List<T> {
    head: u32,
    tail: u32,
    len: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> List<T> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            head: NONE,
            tail: NONE,
            len: 0,
            generation: 0,
            _marker: PhantomData,
        }
    }

    /// Number of elements pushed so far.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Check if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start a cursor at the first element.
    ///
    /// Unlike [`ListArena::iter`], a cursor does not borrow the arena between
    /// steps, so the arena can be mutated while walking.
    pub fn cursor(&self) -> Cursor<T> {
        Cursor {
            at: self.head,
            generation: self.generation,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for List<T> {}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("len", &self.len).finish()
    }
}

/// Detached position inside a [`List<T>`].
pub struct Cursor<T> {
    at: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

/// Shared backing store for many small ordered lists.
///
/// Each element costs one slot in a single `Vec`; lists are singly linked
/// through that storage and never allocate on their own.
#[derive(Debug)]
pub struct ListArena<T> {
    links: Vec<Link<T>>,
    generation: u32,
}

impl<T> ListArena<T> {
    /// Create an empty list arena.
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            generation: 0,
        }
    }

    /// Create an empty list arena with room for `capacity` elements in total.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            generation: 0,
        }
    }

    /// Append `value` to the end of `list`.
    ///
    /// A non-empty list left over from an earlier generation is treated as
    /// empty and restarted.
    pub fn push(&mut self, list: &mut List<T>, value: T) {
        if !list.is_empty() && list.generation != self.generation {
            log::warn!("list from frame generation {} reused after reset", list.generation);
            *list = List::new();
        }

        let index = self.links.len() as u32;
        debug_assert!(index != NONE, "list arena index space exhausted");
        self.links.push(Link { value, next: NONE });

        if list.is_empty() {
            list.head = index;
            list.generation = self.generation;
        } else {
            self.links[list.tail as usize].next = index;
        }
        list.tail = index;
        list.len += 1;
    }

    /// Iterate over `list` in insertion order.
    pub fn iter<'s>(&'s self, list: &List<T>) -> ListIter<'s, T> {
        let at = if list.generation == self.generation {
            list.head
        } else {
            NONE
        };
        ListIter { arena: self, at }
    }

    /// Check whether `list` contains `value`.
    pub fn contains(&self, list: &List<T>, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter(list).any(|v| v == value)
    }

    /// Total number of elements across all lists.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if no list holds any element.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Retained capacity.
    pub fn capacity(&self) -> usize {
        self.links.capacity()
    }

    /// Current generation.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T: Copy> ListArena<T> {
    /// Advance `cursor` and return the element it was on.
    pub fn next(&self, cursor: &mut Cursor<T>) -> Option<T> {
        if cursor.at == NONE || cursor.generation != self.generation {
            return None;
        }
        let link = self.links.get(cursor.at as usize)?;
        cursor.at = link.next;
        Some(link.value)
    }
}

impl<T> Default for ListArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameReset for ListArena<T> {
    fn reset(&mut self) {
        self.links.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Borrowing iterator over a [`List<T>`].
pub struct ListIter<'s, T> {
    arena: &'s ListArena<T>,
    at: u32,
}

impl<'s, T> Iterator for ListIter<'s, T> {
    type Item = &'s T;

    fn next(&mut self) -> Option<&'s T> {
        if self.at == NONE {
            return None;
        }
        let link = self.arena.links.get(self.at as usize)?;
        self.at = link.next;
        Some(&link.value)
    }
}
