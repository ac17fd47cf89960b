//! Grow-on-demand object pools.
//!
//! An [`ObjectPool`] owns every instance of one record type (entity records,
//! or one component type) in a slot vector. Consumers hold [`PoolHandle`]s —
//! indices into the slot vector — instead of references, which keeps the
//! per-entity component maps plain data.
//!
//! Two flavours exist:
//!
//! - **recycling** — released slots are reset and pushed onto a free list;
//!   an empty free list grows by `ceil(size * 0.2) + 1` fresh slots.
//! - **transient** — every acquire allocates a fresh slot and released slots
//!   are abandoned (overwritten with a clean record so their resources drop,
//!   but never reused). Used for record types that cannot be reset.

use serde::Serialize;

/// An index into an [`ObjectPool`]'s slot vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(pub u32);

impl PoolHandle {
    /// Returns the raw slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Occupancy counters for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total slots ever allocated.
    pub size: usize,
    /// Slots currently handed out.
    pub used: usize,
    /// Slots not handed out (free-listed, or abandoned for transient pools).
    pub free: usize,
}

/// A typed slot pool with a free list.
///
/// Construction takes the record type's factory and reset behaviour as plain
/// function pointers, so the pool itself carries no trait bounds.
pub struct ObjectPool<T> {
    slots: Vec<T>,
    free_list: Vec<PoolHandle>,
    used: usize,
    recycle: bool,
    create: fn() -> T,
    reset: fn(&mut T),
}

impl<T> ObjectPool<T> {
    /// Creates a recycling pool: released slots are reset and reused.
    #[must_use]
    pub fn recycling(create: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            used: 0,
            recycle: true,
            create,
            reset,
        }
    }

    /// Creates a transient pool: every acquire allocates, released slots are
    /// abandoned.
    #[must_use]
    pub fn transient(create: fn() -> T) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            used: 0,
            recycle: false,
            create,
            reset: |_| {},
        }
    }

    /// Pre-grows a recycling pool so the first `reserve` acquires never
    /// allocate. No effect on transient pools.
    #[must_use]
    pub fn with_reserve(mut self, reserve: usize) -> Self {
        if self.recycle {
            while self.free_list.len() < reserve {
                self.grow();
            }
        }
        self
    }

    /// Hands out a clean slot, growing the pool if the free list is empty.
    pub fn acquire(&mut self) -> PoolHandle {
        self.used += 1;
        if !self.recycle {
            let handle = PoolHandle(self.slots.len() as u32);
            self.slots.push((self.create)());
            return handle;
        }
        if self.free_list.is_empty() {
            self.grow();
        }
        self.free_list.pop().expect("pool grew but free list is empty")
    }

    /// Returns a slot to the pool.
    ///
    /// Recycling pools reset the slot and free-list it. Transient pools
    /// overwrite the slot with a clean record (dropping whatever it held)
    /// and abandon it.
    pub fn release(&mut self, handle: PoolHandle) {
        self.used = self.used.saturating_sub(1);
        if self.recycle {
            (self.reset)(&mut self.slots[handle.index()]);
            self.free_list.push(handle);
        } else {
            self.slots[handle.index()] = (self.create)();
        }
    }

    /// Returns a reference to the record in `handle`'s slot.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots.get(handle.index())
    }

    /// Returns a mutable reference to the record in `handle`'s slot.
    #[must_use]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots.get_mut(handle.index())
    }

    /// Total slots ever allocated.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently handed out.
    #[must_use]
    pub fn total_used(&self) -> usize {
        self.used
    }

    /// Slots available (or, for transient pools, abandoned).
    #[must_use]
    pub fn total_free(&self) -> usize {
        if self.recycle {
            self.free_list.len()
        } else {
            self.slots.len() - self.used
        }
    }

    /// Returns `true` if released slots are reused.
    #[must_use]
    pub fn is_recycling(&self) -> bool {
        self.recycle
    }

    /// Occupancy counters snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.total_size(),
            used: self.total_used(),
            free: self.total_free(),
        }
    }

    /// Grows the slot vector by `ceil(size * 0.2) + 1` clean records, all
    /// free-listed.
    fn grow(&mut self) {
        let grow_by = self.slots.len().div_ceil(5) + 1;
        for _ in 0..grow_by {
            let handle = PoolHandle(self.slots.len() as u32);
            self.slots.push((self.create)());
            self.free_list.push(handle);
        }
    }
}
