// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reference-counted pool of synthetic temporaries (spec §4.3, §3
//! "Temporary"). A temporary holds a sub-expression's value across
//! statement boundaries so that evaluation order survives reordering of
//! "bind operand" and "emit call" steps.

use std::fmt;

/// A synthetic local `$n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(u32);

impl Temp {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Parses `"$3"` back into `Temp(3)`. Any other shape (a user identifier,
/// `__RESULT`, `__ERROR`, ...) is not a temp name.
pub fn parse_temp_name(name: &str) -> Option<Temp> {
    name.strip_prefix('$')
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(Temp)
}

/// Lifecycle: allocated fresh (counter 0 -> 1) or recycled from the free
/// list (also 0 -> 1); bumped on each additional reuse; released back to
/// the free list once the counter drops to 0.
#[derive(Debug, Default)]
pub struct TempPool {
    refcounts: Vec<u32>,
    free: Vec<Temp>,
}

impl TempPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh temp, or recycles one from the free list.
    pub fn alloc(&mut self) -> Temp {
        if let Some(temp) = self.free.pop() {
            self.refcounts[temp.index() as usize] = 1;
            temp
        } else {
            let temp = Temp(self.refcounts.len() as u32);
            self.refcounts.push(1);
            temp
        }
    }

    /// An identifier already denotes a live temp: bump its refcount instead
    /// of allocating a new one.
    pub fn bump(&mut self, temp: Temp) {
        self.refcounts[temp.index() as usize] += 1;
    }

    /// Releases one reference; returns the temp to the free list once its
    /// refcount reaches zero.
    pub fn release(&mut self, temp: Temp) {
        let count = &mut self.refcounts[temp.index() as usize];
        debug_assert!(*count > 0, "releasing a temp with no outstanding references");
        *count -= 1;
        if *count == 0 {
            self.free.push(temp);
        }
    }

    /// True if `temp` currently has at least one outstanding reference —
    /// i.e. it is a name a caller may still legally use.
    pub fn is_live(&self, temp: Temp) -> bool {
        (temp.index() as usize) < self.refcounts.len()
            && self.refcounts[temp.index() as usize] > 0
    }

    /// Number of currently-locked (live) temporaries — `varCounter -
    /// freeVars.len()` in spec terms. Used by `Context` to check the
    /// balanced-temps invariant (spec §5) at statement-handler boundaries.
    pub fn locked(&self) -> usize {
        self.refcounts.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_allocation_starts_at_refcount_one() {
        let mut pool = TempPool::new();
        let t = pool.alloc();
        assert_eq!(t.to_string(), "$0");
        assert!(pool.is_live(t));
        assert_eq!(pool.locked(), 1);
    }

    #[test]
    fn release_to_zero_frees_and_next_alloc_recycles() {
        let mut pool = TempPool::new();
        let t0 = pool.alloc();
        pool.release(t0);
        assert!(!pool.is_live(t0));
        assert_eq!(pool.locked(), 0);

        let t1 = pool.alloc();
        assert_eq!(t0, t1, "freed temp name must be reused immediately");
        assert!(pool.is_live(t1));
    }

    #[test]
    fn bump_requires_multiple_releases() {
        let mut pool = TempPool::new();
        let t = pool.alloc();
        pool.bump(t);
        pool.release(t);
        assert!(pool.is_live(t), "still referenced once more");
        pool.release(t);
        assert!(!pool.is_live(t));
    }

    #[test]
    fn parse_temp_name_rejects_user_identifiers() {
        assert_eq!(parse_temp_name("$12"), Some(Temp(12)));
        assert_eq!(parse_temp_name("__ERROR"), None);
        assert_eq!(parse_temp_name("foo"), None);
    }
}
