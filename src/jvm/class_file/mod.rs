//! Binary class file format
//!
//! Everything here is a fairly direct mirror of the structures in [chapter 4 of the JVM
//! specification][0]. Each structure can be read with [`Parse`] and written back out with
//! [`Serialize`], and the two are exact inverses for well-formed input.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod parse;
mod serialize;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use parse::*;
pub use serialize::*;
pub use version::*;
