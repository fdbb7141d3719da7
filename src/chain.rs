//! Chain: singly linked bucket chains threaded through a node arena.
//!
//! A `Chain` is only a head link and a length. Its nodes live in an
//! [`Arena`] shared by every chain of one table, so a node can move from
//! one chain to another (as a resize does) by rewriting links alone,
//! without freeing or reallocating the item it carries.
//!
//! Every method that takes an arena must be given the arena the chain's
//! nodes were allocated in.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Arena key of a single chain node.
    pub(crate) struct NodeKey;
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) item: T,
    next: Option<NodeKey>,
}

pub(crate) type Arena<T> = SlotMap<NodeKey, Node<T>>;

/// A position inside a chain, as produced by a [`Cursor`].
///
/// Valid until the chain it came from is next mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Position {
    prev: Option<NodeKey>,
    node: NodeKey,
}

impl Position {
    pub(crate) fn item<T>(self, arena: &Arena<T>) -> &T {
        &arena[self.node].item
    }

    pub(crate) fn item_mut<T>(self, arena: &mut Arena<T>) -> &mut T {
        &mut arena[self.node].item
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Chain {
    head: Option<NodeKey>,
    len: usize,
}

impl Chain {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Allocates a node for `item` and links it at the front.
    pub(crate) fn push_front<T>(&mut self, arena: &mut Arena<T>, item: T) -> NodeKey {
        let node = arena.insert(Node { item, next: None });
        self.link_front(arena, node);
        node
    }

    /// Unlinks and frees the front node, returning its item.
    pub(crate) fn pop_front<T>(&mut self, arena: &mut Arena<T>) -> Option<T> {
        let node = self.unlink_front(arena)?;
        arena.remove(node).map(|n| n.item)
    }

    /// Links an allocated node that belongs to no chain at the front.
    pub(crate) fn link_front<T>(&mut self, arena: &mut Arena<T>, node: NodeKey) {
        arena[node].next = self.head;
        self.head = Some(node);
        self.len += 1;
    }

    /// Detaches the front node without freeing it.
    pub(crate) fn unlink_front<T>(&mut self, arena: &mut Arena<T>) -> Option<NodeKey> {
        let node = self.head?;
        self.head = arena[node].next.take();
        self.len -= 1;
        Some(node)
    }

    pub(crate) fn cursor<'a, T>(&self, arena: &'a Arena<T>) -> Cursor<'a, T> {
        Cursor {
            arena,
            prev: None,
            current: self.head,
        }
    }

    /// Position of the first item, in chain order, that satisfies `pred`.
    pub(crate) fn find<T>(
        &self,
        arena: &Arena<T>,
        mut pred: impl FnMut(&T) -> bool,
    ) -> Option<Position> {
        let mut cursor = self.cursor(arena);
        while let Some(item) = cursor.current() {
            if pred(item) {
                return cursor.position();
            }
            cursor.advance();
        }
        None
    }

    /// Unlinks and frees the node at `pos`, returning its item.
    pub(crate) fn remove_at<T>(&mut self, arena: &mut Arena<T>, pos: Position) -> Option<T> {
        let node = arena.remove(pos.node)?;
        match pos.prev {
            Some(prev) => arena[prev].next = node.next,
            None => self.head = node.next,
        }
        self.len -= 1;
        Some(node.item)
    }

    /// Pops every node front to back, handing each item to `cleanup`.
    pub(crate) fn clear<T>(&mut self, arena: &mut Arena<T>, mut cleanup: impl FnMut(T)) {
        while let Some(item) = self.pop_front(arena) {
            cleanup(item);
        }
    }
}

/// Forward cursor over one chain.
pub(crate) struct Cursor<'a, T> {
    arena: &'a Arena<T>,
    prev: Option<NodeKey>,
    current: Option<NodeKey>,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn current(&self) -> Option<&'a T> {
        let arena = self.arena;
        self.current.and_then(|k| arena.get(k)).map(|n| &n.item)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.current.is_none()
    }

    /// Steps to the next node; returns whether the cursor is still on one.
    pub(crate) fn advance(&mut self) -> bool {
        if let Some(k) = self.current {
            self.prev = Some(k);
            self.current = self.arena.get(k).and_then(|n| n.next);
        }
        self.current.is_some()
    }

    pub(crate) fn position(&self) -> Option<Position> {
        self.current.map(|node| Position {
            prev: self.prev,
            node,
        })
    }
}
