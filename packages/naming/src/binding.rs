//! Bound values: what a path segment resolves to.

use std::fmt;
use std::sync::Arc;

use crate::directory::NamingDirectory;
use crate::error::NamingError;
use crate::value::Value;

/// Signature of a callback binding.
///
/// Invoked at lookup time with the arguments captured at bind time
/// concatenated with the caller-supplied arguments, in that order.
pub type Callback = Arc<dyn Fn(&[Value]) -> Result<Value, NamingError> + Send + Sync>;

/// What a path segment is bound to.
///
/// Each segment maps to exactly one bound value; resolution is a single
/// match on this union instead of runtime type inspection.
#[derive(Clone)]
pub enum BoundValue {
    /// An opaque value, returned verbatim.
    Direct(Value),
    /// A callback invoked at lookup time; its result is returned in place
    /// of a stored value.
    Callback {
        callback: Callback,
        bound_args: Vec<Value>,
    },
    /// A nested directory; lookups recurse into it.
    Directory(NamingDirectory),
}

impl BoundValue {
    /// Whether this binding can be bound through.
    pub fn is_directory(&self) -> bool {
        matches!(self, BoundValue::Directory(_))
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Direct(value) => f.debug_tuple("Direct").field(value).finish(),
            BoundValue::Callback { bound_args, .. } => f
                .debug_struct("Callback")
                .field("bound_args", bound_args)
                .finish(),
            BoundValue::Directory(directory) => {
                f.debug_tuple("Directory").field(directory).finish()
            }
        }
    }
}
