//! Concrete types driven through shims generated at build time.
//!
//! `build.rs` runs every definition under `specs/` through
//! `shimgen_codegen::generate` and the modules below include the results.
//! Each concrete type only implements the generated `*Impl` trait; the
//! handles, tables and factories all come from the generator.

pub mod counter {
    include!(concat!(env!("OUT_DIR"), "/counter.rs"));
}

pub mod list {
    include!(concat!(env!("OUT_DIR"), "/list.rs"));
}

pub mod allocator {
    include!(concat!(env!("OUT_DIR"), "/allocator.rs"));
}

use allocator::mem::AllocatorImpl;
use counter::CounterImpl;
use list::ListImpl;

// ── Counters ─────────────────────────────────────────────────────────────────

/// Plain counter. Leaves `limit` to the generated default.
#[derive(Debug, Default)]
pub struct Tally {
    pub n: i32,
}

impl CounterImpl for Tally {
    fn get(&self) -> i32 {
        self.n
    }

    fn inc(&mut self) {
        self.n += 1;
    }

    fn add(&mut self, n: i32) {
        self.n += n;
    }
}

/// Counter that saturates at `max`.
#[derive(Debug)]
pub struct Capped {
    pub n: i32,
    pub max: i32,
}

impl Capped {
    pub fn new(max: i32) -> Self {
        Self { n: 0, max }
    }
}

impl CounterImpl for Capped {
    fn get(&self) -> i32 {
        self.n
    }

    fn inc(&mut self) {
        self.add(1);
    }

    fn add(&mut self, n: i32) {
        self.n = self.n.saturating_add(n).min(self.max);
    }

    fn limit(&self) -> i32 {
        self.max
    }
}

// ── Lists ────────────────────────────────────────────────────────────────────

/// Inline storage with a fixed capacity.
#[derive(Debug)]
pub struct FixedVec<T, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> FixedVec<T, N> {
    pub fn new() -> Self {
        Self {
            items: [T::default(); N],
            len: 0,
        }
    }

    /// Append `value`, handing it back when full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        match self.items.get_mut(self.len) {
            Some(slot) => {
                *slot = value;
                self.len += 1;
                Ok(())
            }
            None => Err(value),
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for FixedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> ListImpl<T> for FixedVec<T, N> {
    fn at(&mut self, idx: i32) -> &mut T {
        &mut self.items[..self.len][idx as usize]
    }

    fn len(&self) -> i32 {
        self.len as i32
    }
}

/// Heap-backed list.
#[derive(Debug, Default)]
pub struct HeapArr<T> {
    items: Vec<T>,
}

impl<T> From<Vec<T>> for HeapArr<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> ListImpl<T> for HeapArr<T> {
    fn at(&mut self, idx: i32) -> &mut T {
        &mut self.items[idx as usize]
    }

    fn len(&self) -> i32 {
        self.items.len() as i32
    }
}

// ── Allocators ───────────────────────────────────────────────────────────────

/// Hands out consecutive slices of one owned buffer. `free` is a no-op and
/// `free_all` rewinds. Does not override `realloc`.
#[derive(Debug)]
pub struct BumpAllocator {
    buf: Vec<u8>,
    used: usize,
}

impl BumpAllocator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            used: 0,
        }
    }
}

impl AllocatorImpl for BumpAllocator {
    fn alloc(&mut self, nbytes: usize) -> *mut u8 {
        let end = match self.used.checked_add(nbytes) {
            Some(end) if end <= self.buf.len() => end,
            _ => return std::ptr::null_mut(),
        };
        let ptr = self.buf[self.used..end].as_mut_ptr();
        self.used = end;
        ptr
    }

    fn free(&mut self, _p: *mut u8) {}

    fn free_all(&mut self) {
        self.used = 0;
    }

    fn has_address(&self, p: *const u8) -> bool {
        self.buf.as_ptr_range().contains(&p)
    }

    fn used(&self) -> usize {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capped_saturates() {
        let mut c = Capped::new(3);
        c.add(10);
        assert_eq!(c.get(), 3);
    }

    #[test]
    fn fixed_vec_rejects_overflow() {
        let mut v = FixedVec::<u8, 2>::new();
        assert_eq!(v.push(1), Ok(()));
        assert_eq!(v.push(2), Ok(()));
        assert_eq!(v.push(3), Err(3));
        assert_eq!(ListImpl::len(&v), 2);
    }

    #[test]
    fn bump_exhaustion_returns_null() {
        let mut a = BumpAllocator::with_capacity(8);
        assert!(!a.alloc(8).is_null());
        assert!(a.alloc(1).is_null());
        a.free_all();
        assert_eq!(a.used(), 0);
    }
}
