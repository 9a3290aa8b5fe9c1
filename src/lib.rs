//! Record which JVM methods a program actually enters
//!
//! Class files are rewritten (either at load time through [`hook::ClassFileTransformer`] or ahead
//! of time through [`offline`]) so that every eligible method starts by reporting its identifier
//! to a static recorder method. [`recorder`] holds the deduplicating sink those reports end up in.

pub mod agent;
pub mod config;
pub mod hook;
pub mod jvm;
pub mod offline;
pub mod policy;
pub mod recorder;
pub mod rewrite;
pub mod util;
