//! Host interface: the only coupling between the kernel and an embedding
//! standard library. A host registers globals through `Callable`-backed
//! native functions and, for exotic objects, a `PropertyAccessor`
//! implementation; the kernel never assumes more about the outside world
//! than these two traits describe.

use gc_arena::Mutation;

use crate::js_error::JsResult;
use crate::property_key::PropertyKey;
use crate::value::Value;

pub trait Callable<'gc> {
    fn invoke(&self, mc: &Mutation<'gc>, this: Value<'gc>, args: &[Value<'gc>]) -> JsResult<'gc, Value<'gc>>;
}

pub trait PropertyAccessor<'gc> {
    fn try_get_property(&self, mc: &Mutation<'gc>, key: &PropertyKey<'gc>) -> JsResult<'gc, Option<Value<'gc>>>;
    fn set_property(&self, mc: &Mutation<'gc>, key: PropertyKey<'gc>, value: Value<'gc>) -> JsResult<'gc, ()>;
    fn get_own_property_descriptor(&self, mc: &Mutation<'gc>, key: &PropertyKey<'gc>) -> JsResult<'gc, Option<crate::value::Value<'gc>>>;
}
