//! Property descriptors: value/writable/enumerable/configurable, plus
//! accessor (getter/setter) descriptors. Shape follows the teacher's
//! `core/descriptor.rs`.

use gc_arena::{Collect, Gc, lock::RefLock};

use crate::value::Value;

#[derive(Collect)]
#[collect(no_drop)]
pub struct DataDescriptor<'gc> {
    pub value: Gc<'gc, RefLock<Value<'gc>>>,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Collect)]
#[collect(no_drop)]
pub struct AccessorDescriptor<'gc> {
    pub getter: Option<Value<'gc>>,
    pub setter: Option<Value<'gc>>,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Collect)]
#[collect(no_drop)]
pub enum PropertyDescriptor<'gc> {
    Data(DataDescriptor<'gc>),
    Accessor(AccessorDescriptor<'gc>),
}

impl<'gc> PropertyDescriptor<'gc> {
    pub fn data(mc: &gc_arena::Mutation<'gc>, value: Value<'gc>, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor::Data(DataDescriptor {
            value: Gc::new(mc, RefLock::new(value)),
            writable,
            enumerable,
            configurable,
        })
    }

    pub fn enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data(d) => d.enumerable,
            PropertyDescriptor::Accessor(a) => a.enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data(d) => d.configurable,
            PropertyDescriptor::Accessor(a) => a.configurable,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor(_))
    }
}
