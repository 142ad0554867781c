//! Host code exposed to scripts.

use std::any::Any;
use std::rc::Rc;

use crate::error::Result;
use crate::runtime::Runtime;
use crate::value::{PropNameId, Value};

/// An object whose property access is implemented by the host.
///
/// Every method has a default, so an implementor overrides only what it
/// serves. Returning `Err(JsiError::Js(..))` throws the carried value into the
/// calling script; any other error is absorbed by the runtime.
///
/// # Examples
///
/// ```
/// use host_api::{HostObject, PropNameId, Result, Runtime, Value};
///
/// struct Answer;
///
/// impl HostObject for Answer {
///     fn get(&self, rt: &dyn Runtime, name: &PropNameId) -> Result<Value> {
///         Ok(if name.utf8(rt)? == "answer" { Value::from(42) } else { Value::undefined() })
///     }
/// }
/// ```
pub trait HostObject: 'static {
    /// Reads property `name`. Defaults to `undefined`.
    fn get(&self, _rt: &dyn Runtime, _name: &PropNameId) -> Result<Value> {
        Ok(Value::Undefined)
    }

    /// Writes property `name`. Defaults to ignoring the write.
    fn set(&self, _rt: &dyn Runtime, _name: &PropNameId, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Lists the enumerable property names, in enumeration order.
    fn get_property_names(&self, _rt: &dyn Runtime) -> Vec<PropNameId> {
        Vec::new()
    }
}

/// A host closure callable from scripts as `(this, args) -> value`.
pub type HostFunction = Rc<dyn Fn(&dyn Runtime, &Value, &[Value]) -> Result<Value>>;

/// Opaque host state attached to an object.
pub type NativeState = Rc<dyn Any>;
