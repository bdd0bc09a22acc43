use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;

/// One rendered output file, with a path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path:     PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new<P: Into<PathBuf>>(path: P, contents: String) -> GeneratedFile {
        GeneratedFile { path: path.into(), contents }
    }
}

/// Writes every file under `out_dir`, creating directories as needed.
pub fn write_files(out_dir: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let target = out_dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.contents)?;
        info!("wrote {}", target.display());
    }
    Ok(())
}
