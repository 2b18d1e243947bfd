//! Heap objects and the heap that owns them.

use std::fmt;
use std::rc::Rc;

use crate::bytecode::table::Table;
use crate::bytecode::value::Value;

/// FNV-1a over the string's bytes.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in chars.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// An immutable string with its hash computed once at construction.
#[derive(Debug)]
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    #[cfg(test)]
    pub(crate) fn new(chars: &str) -> Self {
        Self::with_hash(chars, hash_string(chars))
    }

    fn with_hash(chars: &str, hash: u32) -> Self {
        Self {
            chars: chars.into(),
            hash,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Display for ObjString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chars)
    }
}

/// A handle to a heap-allocated object.
#[derive(Debug, Clone)]
pub enum Object {
    String(Rc<ObjString>),
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Interned, so identity is content equality.
            (Object::String(a), Object::String(b)) => Rc::ptr_eq(a, b),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(s) => write!(f, "{}", s),
        }
    }
}

/// Owns every object the VM allocates, plus the string intern set.
/// Everything is released together when the heap is dropped.
#[derive(Debug, Default)]
pub struct Heap {
    strings: Table,
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical string with these contents, allocating it on first use.
    pub fn intern(&mut self, chars: &str) -> Rc<ObjString> {
        let hash = hash_string(chars);
        if let Some(existing) = self.strings.find_key_by_content(chars, hash) {
            return existing;
        }

        let string = Rc::new(ObjString::with_hash(chars, hash));
        self.objects.push(Object::String(Rc::clone(&string)));
        self.strings.insert(Rc::clone(&string), Value::Null);
        string
    }

    /// Concatenate two strings, interning the result.
    pub fn concat(&mut self, a: &ObjString, b: &ObjString) -> Rc<ObjString> {
        let mut chars = String::with_capacity(a.len() + b.len());
        chars.push_str(a.as_str());
        chars.push_str(b.as_str());
        self.intern(&chars)
    }

    /// Number of objects allocated over the heap's lifetime.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn strings(&self) -> &Table {
        &self.strings
    }
}
