// regcache.rs - Compiled-pattern cache.
// Fixed number of slots keyed by (pattern text, flags), evicted in
// insertion order through a ring cursor.

use std::rc::Rc;

use tracing::debug;

use crate::error::RegexError;
use crate::regint::{Program, RegexFlags, DEFAULT_PARSE_DEPTH_LIMIT};
use crate::regparse::compile_with_depth_limit;

const CACHE_TARGET: &str = "ecma_regexp::regcache";

/// Ring-buffer cache of compiled programs.
///
/// A capacity of zero disables caching: lookups always miss and inserts are
/// dropped.
#[derive(Debug, Default)]
pub struct PatternCache {
    slots: Vec<Option<Rc<Program>>>,
    next: usize,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        PatternCache {
            slots: vec![None; capacity],
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn lookup(&self, pattern: &str, flags: RegexFlags) -> Option<Rc<Program>> {
        self.slots
            .iter()
            .flatten()
            .find(|p| p.flags() == flags && p.pattern() == pattern)
            .cloned()
    }

    /// Store `program` in the slot under the cursor, evicting its occupant.
    pub fn insert(&mut self, program: Rc<Program>) {
        let capacity = self.slots.len();
        if capacity == 0 {
            return;
        }
        if let Some(old) = self.slots[self.next].replace(program) {
            debug!(
                target: CACHE_TARGET,
                pattern = old.pattern(),
                flags = %old.flag_string(),
                "evicted"
            );
        }
        self.next = (self.next + 1) % capacity;
    }

    /// Return the cached program for (pattern, flags), compiling and
    /// inserting it on a miss. Compile errors are not cached.
    pub fn get_or_compile(
        &mut self,
        pattern: &str,
        flags: RegexFlags,
        parse_depth_limit: u32,
    ) -> Result<Rc<Program>, RegexError> {
        if let Some(program) = self.lookup(pattern, flags) {
            debug!(target: CACHE_TARGET, pattern, flags = %flags.to_flag_string(), "hit");
            return Ok(program);
        }
        debug!(target: CACHE_TARGET, pattern, flags = %flags.to_flag_string(), "miss");
        let program = Rc::new(compile_with_depth_limit(pattern, flags, parse_depth_limit)?);
        self.insert(Rc::clone(&program));
        Ok(program)
    }

    /// Like `get_or_compile` with the default nesting limit.
    pub fn get(&mut self, pattern: &str, flags: RegexFlags) -> Result<Rc<Program>, RegexError> {
        self.get_or_compile(pattern, flags, DEFAULT_PARSE_DEPTH_LIMIT)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_returns_same_program() {
        let mut cache = PatternCache::new(4);
        let a = cache.get("a+b", RegexFlags::GLOBAL).unwrap();
        let b = cache.get("a+b", RegexFlags::GLOBAL).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn flags_are_part_of_the_key() {
        let mut cache = PatternCache::new(4);
        let a = cache.get("a", RegexFlags::empty()).unwrap();
        let b = cache.get("a", RegexFlags::IGNORE_CASE).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn eviction_is_fifo() {
        let mut cache = PatternCache::new(2);
        let first = cache.get("1", RegexFlags::empty()).unwrap();
        cache.get("2", RegexFlags::empty()).unwrap();
        // a hit does not refresh the entry
        cache.get("1", RegexFlags::empty()).unwrap();
        cache.get("3", RegexFlags::empty()).unwrap();
        assert!(cache.lookup("1", RegexFlags::empty()).is_none());
        assert!(cache.lookup("2", RegexFlags::empty()).is_some());
        assert!(cache.lookup("3", RegexFlags::empty()).is_some());
        // evicted programs stay alive while referenced
        assert_eq!(first.pattern(), "1");
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = PatternCache::new(0);
        let a = cache.get("a", RegexFlags::empty()).unwrap();
        let b = cache.get("a", RegexFlags::empty()).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = PatternCache::new(2);
        assert!(cache.get("(", RegexFlags::empty()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_all_slots() {
        let mut cache = PatternCache::new(2);
        cache.get("a", RegexFlags::empty()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }
}
