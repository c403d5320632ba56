//! Path-addressed patch language
//!
//! - `set(path, value)`: overwrite a field or array element
//! - `append(path, value)`: push onto an array field
//! - `unset(path)`: reset a field to empty, drop a map key, or remove one element
//!
//! Paths are resolved through the document's field registry. Operations are
//! applied to the JSON view of a document so a failed operation can simply be
//! discarded along with the working copy.

mod coerce;
mod errors;
mod executor;
mod operation;
mod path;

pub use coerce::{coerce, infer_scalar, json_type_name};
pub use errors::{PatchError, PatchResult};
pub use executor::PatchExecutor;
pub use operation::{OpKind, PatchOp};
pub use path::{PatchPath, Segment, Slot};
