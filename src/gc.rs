//! Arena wiring. Grounded on the teacher's `core/mod.rs` (`JsArena`,
//! `JsRoot`) — a single `gc_arena::Arena` rooted at the global environment
//! plus the well-known-symbols table.

use gc_arena::{Collect, Gc, Rootable, lock::RefLock};
use std::collections::HashMap;

use crate::environment::EnvPtr;
use crate::value::SymbolData;

#[derive(Collect)]
#[collect(no_drop)]
pub struct JsRoot<'gc> {
    pub global_env: EnvPtr<'gc>,
    #[collect(require_static)]
    pub well_known_symbols: HashMap<&'static str, Gc<'gc, SymbolData>>,
}

pub type JsArena = gc_arena::Arena<Rootable![JsRoot<'_>]>;

pub fn new_symbol<'gc>(mc: &gc_arena::Mutation<'gc>, description: Option<&str>) -> Gc<'gc, SymbolData> {
    Gc::new(mc, SymbolData { description: description.map(str::to_string) })
}

#[allow(unused)]
pub(crate) type RefLockEnv<'gc> = RefLock<crate::environment::Environment<'gc>>;
