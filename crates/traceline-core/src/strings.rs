//! Process-wide string interning with detectable collisions.
//!
//! Tag keys repeat constantly, so they travel as 32-bit aliases instead of
//! literals. The alias is the FNV-1a 32 hash of the string; the collector
//! rebuilds the reverse mapping from broadcast PDUs. A hash collision between
//! two distinct strings is a hard error here — never silently resolved by
//! overwriting — and the caller recovers by inlining the literal string.

use std::collections::HashMap;

use crate::error::HashCollision;
use crate::hash::fnv1a_32;
use crate::wire::StringTableEntry;

#[derive(Debug, Default)]
pub struct StringTable {
    strings_by_alias: HashMap<u32, String>,
    aliases_by_string: HashMap<String, u32>,
    /// Aliases interned since the last `save_to`, in interning order.
    fresh: Vec<u32>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `string` and return its alias.
    ///
    /// Stable for the process lifetime: the same input always yields the
    /// same alias. Fails if the hash is already bound to a different string.
    pub fn get_alias(&mut self, string: &str) -> Result<u32, HashCollision> {
        if let Some(alias) = self.aliases_by_string.get(string) {
            return Ok(*alias);
        }

        let alias = fnv1a_32(string.as_bytes());
        if let Some(existing) = self.strings_by_alias.get(&alias) {
            return Err(HashCollision {
                alias,
                new: string.to_string(),
                existing: existing.clone(),
            });
        }

        self.strings_by_alias.insert(alias, string.to_string());
        self.aliases_by_string.insert(string.to_string(), alias);
        self.fresh.push(alias);
        Ok(alias)
    }

    /// Whether entries have been interned since the last `save_to`.
    pub fn is_dirty(&self) -> bool {
        !self.fresh.is_empty()
    }

    /// Drain the entries accumulated since the last save into `entries`.
    pub fn save_to(&mut self, entries: &mut Vec<StringTableEntry>) {
        for alias in self.fresh.drain(..) {
            let value = self.strings_by_alias[&alias].clone();
            entries.push(StringTableEntry { alias, value });
        }
    }
}
