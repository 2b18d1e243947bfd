//! Open-addressed hash table keyed by interned strings.
//!
//! Used for the string intern set and for global variables. Linear probing
//! over a power-of-two array; deleted slots become tombstones so probe chains
//! stay intact.

use std::rc::Rc;

use crate::bytecode::object::ObjString;
use crate::bytecode::value::Value;

const INITIAL_CAPACITY: usize = 8;
/// Load factor of 3/4, tombstones included.
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

#[derive(Debug, Clone, Default)]
enum Entry {
    #[default]
    Empty,
    Tombstone,
    Occupied {
        key: Rc<ObjString>,
        value: Value,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<Entry>,
    /// Live entries.
    count: usize,
    tombstones: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Insert or overwrite. Returns `true` if the key was not present before.
    pub fn insert(&mut self, key: Rc<ObjString>, value: Value) -> bool {
        if (self.count + self.tombstones + 1) * MAX_LOAD_DEN > self.capacity() * MAX_LOAD_NUM {
            self.grow();
        }

        let index = find_slot(&self.entries, &key);
        let is_new = match self.entries[index] {
            Entry::Empty => true,
            Entry::Tombstone => {
                self.tombstones -= 1;
                true
            }
            Entry::Occupied { .. } => false,
        };
        if is_new {
            self.count += 1;
        }

        self.entries[index] = Entry::Occupied { key, value };
        is_new
    }

    /// Remove a key, leaving a tombstone. Returns `true` if it was present.
    pub fn remove(&mut self, key: &Rc<ObjString>) -> bool {
        if self.count == 0 {
            return false;
        }

        let index = find_slot(&self.entries, key);
        if !matches!(self.entries[index], Entry::Occupied { .. }) {
            return false;
        }

        self.entries[index] = Entry::Tombstone;
        self.count -= 1;
        self.tombstones += 1;
        true
    }

    pub fn find(&self, key: &Rc<ObjString>) -> Option<&Value> {
        if self.count == 0 {
            return None;
        }

        match &self.entries[find_slot(&self.entries, key)] {
            Entry::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Look a key up by its contents rather than its identity. This is the
    /// interning lookup, done before a new string is allocated.
    pub fn find_key_by_content(&self, chars: &str, hash: u32) -> Option<Rc<ObjString>> {
        if self.count == 0 {
            return None;
        }

        let mask = self.capacity() - 1;
        let mut index = hash as usize & mask;
        loop {
            match &self.entries[index] {
                Entry::Empty => return None,
                Entry::Tombstone => {}
                Entry::Occupied { key, .. } => {
                    if key.hash() == hash && key.as_str() == chars {
                        return Some(Rc::clone(key));
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Insert every live entry of `self` into `dst`.
    pub fn copy_into(&self, dst: &mut Table) {
        for (key, value) in self.iter() {
            dst.insert(Rc::clone(key), value.clone());
        }
    }

    /// Live entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<ObjString>, &Value)> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Occupied { key, value } => Some((key, value)),
            _ => None,
        })
    }

    fn grow(&mut self) {
        let capacity = if self.capacity() < INITIAL_CAPACITY {
            INITIAL_CAPACITY
        } else {
            self.capacity() * 2
        };

        let old = std::mem::replace(&mut self.entries, vec![Entry::Empty; capacity]);
        self.tombstones = 0;
        for entry in old {
            if let Entry::Occupied { key, value } = entry {
                let index = find_slot(&self.entries, &key);
                self.entries[index] = Entry::Occupied { key, value };
            }
        }
    }
}

/// Slot holding `key`, or the slot it should be inserted into: the first
/// tombstone seen on the probe chain, else the empty slot that ended it.
/// The load factor guarantees an empty slot exists.
fn find_slot(entries: &[Entry], key: &Rc<ObjString>) -> usize {
    let mask = entries.len() - 1;
    let mut index = key.hash() as usize & mask;
    let mut tombstone = None;

    loop {
        match &entries[index] {
            Entry::Empty => return tombstone.unwrap_or(index),
            Entry::Tombstone => {
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            }
            Entry::Occupied { key: existing, .. } => {
                if Rc::ptr_eq(existing, key) {
                    return index;
                }
            }
        }
        index = (index + 1) & mask;
    }
}
