//! Type system shared by the binder and optimizer.

mod value;

pub use value::{CustomTypeId, DataType, Value};
