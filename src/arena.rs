//! A pre-sized scratch pool for detector state.
//!
//! The reference takes a caller-owned memory pool to every `init` call so
//! that an embedded host can account for (or statically reserve) all of the
//! pitch core's memory up front. `Arena` gives that contract a concrete,
//! testable shape without inventing unsafe bump-pointer allocation: it is a
//! plain accounting wrapper that hands out `Vec`s built with
//! `Vec::with_capacity`, tracking how much of its declared budget has been
//! drawn down. Exhausting the budget panics at construction time, never
//! inside a `tick`.

/// A fixed-budget scratch pool. Detector constructors that take `&mut Arena`
/// draw their backing buffers from it; nothing is allocated afterwards.
pub struct Arena {
    budget_bytes: usize,
    used_bytes: usize,
}

impl Arena {
    /// Creates an arena with a budget of `budget_bytes`.
    pub fn new(budget_bytes: usize) -> Self {
        Arena {
            budget_bytes,
            used_bytes: 0,
        }
    }

    /// Bytes remaining in the budget.
    pub fn remaining(&self) -> usize {
        self.budget_bytes.saturating_sub(self.used_bytes)
    }

    /// Draws a zero-filled `Vec<T>` of `len` elements from the arena.
    ///
    /// Panics if the allocation would exceed the arena's budget.
    pub fn alloc_vec<T: Default + Clone>(&mut self, len: usize) -> Vec<T> {
        let bytes = len * std::mem::size_of::<T>();
        assert!(
            bytes <= self.remaining(),
            "arena exhausted: requested {bytes} bytes, {} remaining",
            self.remaining()
        );
        self.used_bytes += bytes;
        vec![T::default(); len]
    }
}
