//! chained-hashmap: a single-threaded map from byte-string keys to
//! caller-supplied values, built on separately chained buckets with
//! growth by full rehash.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the table's own invariants (bucket index coherent with the
//!   live bucket count, stored length equal to the chain contents, every
//!   entry rehashed exactly once on growth) in one small, checkable place.
//! - Layers:
//!   - `chain`: singly linked chains whose nodes live in one per-table
//!     `SlotMap` arena. Chains know nothing about keys or hashing.
//!   - `ChainedHashMap<V, S>`: owns the bucket array, the node arena, the
//!     length and the optional value destructor; all hashing happens here.
//!   - `Cursor` / `Iter`: read-only walks over a borrowed table.
//!
//! Constraints
//! - Single-threaded: the destructor is a `Box<dyn FnMut(V)>`, so the map
//!   is `!Send`/`!Sync` unless wrapped by the caller.
//! - Keys are byte strings (`AsRef<[u8]>`), copied into the table on insert.
//! - Unique keys: inserting a present key replaces its value in place.
//! - Bucket count starts at `DEFAULT_CAPACITY` (or the builder's value),
//!   grows by `GROWTH_FACTOR`, and never shrinks.
//!
//! Bucket index and growth
//! - The bucket index is a private method reading the live bucket count;
//!   nothing outside the table ever computes an index.
//! - Before a NEW key is linked, if `(len + 1) / capacity >= 0.7` the bucket
//!   array is replaced by one `GROWTH_FACTOR` times larger and every node
//!   is unlinked from its old chain and relinked into its new one. Nodes
//!   stay in the arena throughout, so growth never drops, duplicates or
//!   destroys an entry, and its only allocation is the new array.
//! - The load check uses integer ratios, never truncating division.
//!
//! Ownership of values
//! - `remove` hands the value back; the destructor never sees it.
//! - A replacing `insert`, `clear`, `destroy` and `Drop` pass each value
//!   they discard to the destructor exactly once (or drop it normally when
//!   no destructor is configured).
//!
//! Failure semantics
//! - The bucket array and key copies are allocated with `try_reserve_exact`,
//!   and the node arena reserves its slot with `SlotMap::try_reserve`
//!   before anything is linked; failures surface as
//!   `Error::AllocationFailure` and leave the table as it was.
//! - `clear` keeps `len` in step with every unlinked entry, so a panicking
//!   destructor leaves the count consistent with the chains. Missing keys are `None`, never an error, so storing a
//!   `None`-like value stays unambiguous.
//!
//! Iteration
//! - Order is ascending bucket index, newest first inside a bucket. It is
//!   not stable across growth.
//! - A `Cursor` holds a shared borrow of its table, so mutating the table
//!   while a cursor is alive does not compile.

mod chain;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod cursor;
pub mod error;
pub mod hash;

// Public surface
pub use chained_hash_map::{
    Builder, ChainedHashMap, Destructor, DEFAULT_CAPACITY, GROWTH_FACTOR,
};
pub use cursor::{Cursor, Iter};
pub use error::Error;
pub use hash::{BuildAdditiveHasher, BuildDjb2Hasher};
