//! Instrument class files on disk, ahead of time
//!
//! The same rewriting as the agent does at class loading, but applied to a tree of `.class` files
//! (eg. a compiled `target/classes`) and written out to a separate directory. Everything that is
//! not a class file is copied over unchanged.

use crate::jvm::class_file::ClassFile;
use crate::jvm::Error;
use crate::rewrite::MethodRewriter;
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What happened to the files of an offline run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Class files with at least one instrumented method
    pub rewritten: usize,

    /// Class files written out as they were
    pub unchanged: usize,

    /// Other files copied over
    pub copied: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} classes rewritten, {} unchanged, {} other files copied",
            self.rewritten, self.unchanged, self.copied
        )
    }
}

/// Instrument a single class file or every file under a directory
///
/// A directory's layout is reproduced under `output_dir`; a single file is written directly
/// into `output_dir`.
pub fn instrument_path(
    rewriter: &MethodRewriter,
    input: &Path,
    output_dir: &Path,
) -> Result<Summary, Error> {
    let files: Vec<(PathBuf, PathBuf)> = if input.is_file() {
        let file_name = input
            .file_name()
            .ok_or_else(|| Error::IoError(not_found(input)))?;
        vec![(input.to_path_buf(), output_dir.join(file_name))]
    } else {
        let mut files = vec![];
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.map_err(|err| Error::IoError(err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
            files.push((entry.path().to_path_buf(), output_dir.join(relative)));
        }
        files
    };

    let mut summary = Summary::default();
    for (source, destination) in files {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if !is_class_file(&source) {
            debug!("Copying '{}'", source.display());
            fs::copy(&source, &destination)?;
            summary.copied += 1;
            continue;
        }

        let bytes = fs::read(&source)?;
        match instrument_class(rewriter, &bytes) {
            Some(rewritten) => {
                debug!("Writing rewritten '{}'", destination.display());
                fs::write(&destination, rewritten)?;
                summary.rewritten += 1;
            }
            None => {
                fs::write(&destination, &bytes)?;
                summary.unchanged += 1;
            }
        }
    }

    Ok(summary)
}

/// Rewrite one class file, taking its name from its own `this_class`
pub fn instrument_class(rewriter: &MethodRewriter, class_bytes: &[u8]) -> Option<Vec<u8>> {
    match ClassFile::from_bytes(class_bytes) {
        Ok(class) => rewriter.transform_class(class),
        Err(err) => {
            warn!("Unreadable class file: {}", err);
            None
        }
    }
}

fn is_class_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "class")
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no file name in '{}'", path.display()),
    )
}
