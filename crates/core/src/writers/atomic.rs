//! Write-to-temp then rename-into-place

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{EtlError, EtlResult};

/// Write `target` atomically
///
/// `fill` writes the content into a temp file created next to `target`
/// (same filesystem). The file is flushed, fsynced and renamed onto
/// `target`. If anything fails the temp file is removed when its handle is
/// dropped, so no partial file is ever visible at `target`.
pub fn write_atomic<F>(target: &Path, fill: F) -> EtlResult<()>
where
    F: FnOnce(&mut dyn Write) -> EtlResult<()>,
{
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| EtlError::io_with_path(dir, "creating output directory", e))?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| EtlError::Config(format!("not a file path: {}", target.display())))?;
    let prefix = format!(".{file_name}.");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| EtlError::io_with_path(dir, "creating temp file", e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer)?;
        writer
            .flush()
            .map_err(|e| EtlError::io_with_path(target, "flushing temp file", e))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| EtlError::io_with_path(target, "syncing temp file", e))?;

    tmp.persist(target)
        .map_err(|e| EtlError::io_with_path(target, "renaming temp file into place", e.error))?;

    Ok(())
}
