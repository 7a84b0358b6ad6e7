//! Interned identifier atoms.
//!
//! `Symbol` backs both AST tag heads (`Program`, `If`, `Call`, ...) and
//! variable names. Interning gives pointer-identical `Symbol`s for equal
//! text, which the evaluator relies on for O(1) tag dispatch instead of
//! string comparison.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Eq)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn intern(text: &str) -> Symbol {
        INTERNER.with(|table| {
            let mut table = table.borrow_mut();
            if let Some(existing) = table.get(text) {
                return Symbol(existing.clone());
            }
            let rc: Rc<str> = Rc::from(text);
            table.insert(rc.clone(), rc.clone());
            Symbol(rc)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

thread_local! {
    static INTERNER: RefCell<HashMap<Rc<str>, Rc<str>>> = RefCell::new(HashMap::new());
}

// Reserved tag symbols, interned once and reused as AST node heads. Kept as
// a macro so adding a new form is a one-line change, mirroring the way the
// teacher enumerates its `StatementKind`/`Expr` variants in one place.
macro_rules! reserved_tags {
    ($($const_name:ident => $text:literal),* $(,)?) => {
        $(
            pub fn $const_name() -> Symbol {
                thread_local! {
                    static CACHED: Symbol = Symbol::intern($text);
                }
                CACHED.with(|s| s.clone())
            }
        )*
    };
}

pub mod tags {
    use super::Symbol;

    reserved_tags! {
        program => "Program",
        block => "Block",
        var_decl => "VarDecl",
        let_decl => "LetDecl",
        const_decl => "ConstDecl",
        function => "Function",
        arrow => "Arrow",
        async_function => "Async",
        generator_function => "Generator",
        r#if => "If",
        r#for => "For",
        for_in => "ForIn",
        for_of => "ForOf",
        r#while => "While",
        do_while => "DoWhile",
        r#break => "Break",
        r#continue => "Continue",
        r#return => "Return",
        r#throw => "Throw",
        r#try => "Try",
        switch => "Switch",
        case => "Case",
        default => "Default",
        class => "Class",
        method => "Method",
        getter => "Getter",
        setter => "Setter",
        call => "Call",
        new => "New",
        member => "Member",
        index => "Index",
        optional_member => "OptionalMember",
        ident => "Ident",
        literal => "Literal",
        template => "Template",
        array_lit => "ArrayLit",
        object_lit => "ObjectLit",
        spread => "Spread",
        assign => "Assign",
        binary => "Binary",
        logical => "Logical",
        unary => "Unary",
        update => "Update",
        conditional => "Conditional",
        sequence => "Sequence",
        this => "This",
        super_ => "Super",
        yield_ => "Yield",
        yield_star => "YieldStar",
        await_ => "Await",
        param_list => "Params",
        rest => "Rest",
        default_param => "DefaultParam",
        destructure_array => "DestructureArray",
        destructure_object => "DestructureObject",
        label => "Label",
        with => "With",
        regexp => "RegExp",
        empty => "Empty",
    }
}
