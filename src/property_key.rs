//! Property keys: strings, symbols, and non-enumerable internal slots.
//!
//! `String`/`Symbol` mirror the teacher's `core/property_key.rs` exactly;
//! `Internal` is added because the kernel needs a few bookkeeping slots
//! (constructor markers, home objects) that must never surface to
//! `Object.keys`/`for-in`.

use gc_arena::{Collect, Gc};
use std::fmt;

use crate::value::SymbolData;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Collect)]
#[collect(require_static)]
pub enum InternalSlot {
    IsConstructor,
    NativeCtor,
    HomeObject,
    BoundThis,
    IsError,
    SuperConstructor,
    PromiseState,
    PromiseValue,
}

#[derive(Clone, Collect)]
#[collect(no_drop)]
pub enum PropertyKey<'gc> {
    String(String),
    Symbol(Gc<'gc, SymbolData>),
    Internal(InternalSlot),
}

impl<'gc> PartialEq for PropertyKey<'gc> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyKey::String(a), PropertyKey::String(b)) => a == b,
            (PropertyKey::Symbol(a), PropertyKey::Symbol(b)) => Gc::ptr_eq(*a, *b),
            (PropertyKey::Internal(a), PropertyKey::Internal(b)) => a == b,
            _ => false,
        }
    }
}
impl<'gc> Eq for PropertyKey<'gc> {}

impl<'gc> std::hash::Hash for PropertyKey<'gc> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            PropertyKey::String(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            PropertyKey::Symbol(s) => {
                1u8.hash(state);
                (Gc::as_ptr(*s) as usize).hash(state);
            }
            PropertyKey::Internal(slot) => {
                2u8.hash(state);
                slot.hash(state);
            }
        }
    }
}

impl<'gc> fmt::Display for PropertyKey<'gc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "Symbol({})", s.description.as_deref().unwrap_or("")),
            PropertyKey::Internal(slot) => write!(f, "@@{slot:?}"),
        }
    }
}

impl<'gc> From<&str> for PropertyKey<'gc> {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl<'gc> From<String> for PropertyKey<'gc> {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}
