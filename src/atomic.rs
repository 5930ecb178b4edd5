//! Atomic file writes.
//!
//! Derivatives and sideloaded sources are written to a hidden temp file in the
//! destination directory and renamed over the final path. Two processes racing
//! on the same derivative both write complete files; the last rename wins and
//! no reader ever sees a half-written image.

use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write `path` through `write`, replacing it atomically on success.
///
/// On error the temp file is removed and `path` is left untouched.
pub fn write_atomic<E, F>(path: &Path, write: F) -> Result<(), E>
where
    E: From<io::Error>,
    F: FnOnce(&mut dyn Write) -> Result<(), E>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".imgderiv-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| E::from(e.error))?;
    Ok(())
}
