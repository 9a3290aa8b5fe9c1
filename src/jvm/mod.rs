//! Read, edit, and write JVM class files
//!
//! The [`class_file`] module is a faithful model of the binary format: parsing a class then
//! serializing it again gives back the same bytes. Method bodies are left as opaque `Code`
//! attributes there; [`code`] decodes one into an editable instruction stream in which branch
//! targets, exception ranges, and debug tables refer to instructions instead of byte offsets, then
//! lays it back out.

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
