//! Method bodies
//!
//! A `Code` attribute is decoded into a [`Code`]: an [`InstructionStream`] plus the exception
//! table and debug attributes, all pointing at instructions through [`InsnId`] handles rather
//! than byte offsets. After editing, [`Code::encode`] lays the instructions out again (switch
//! padding included), re-derives `max_stack` and `max_locals`, and rewrites every offset.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.3

mod analysis;
mod code;
mod instruction;
mod stream;

pub use code::*;
pub use instruction::*;
pub use stream::*;
