//! License activation and evaluation-mode state.
//!
//! The activation check is consulted once at process start. A missing or
//! unreadable license file degrades the engine into evaluation mode — saved
//! documents receive a forced evaluation overlay — rather than failing.

use log::{info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static LICENSED: AtomicBool = AtomicBool::new(false);

/// Process-wide license handle.
///
/// # Examples
///
/// ```no_run
/// use filigree::License;
///
/// if License::set_license("license.lic").is_err() {
///     eprintln!("running in evaluation mode");
/// }
/// ```
pub struct License;

impl License {
    /// Apply a license file.
    ///
    /// Returns an error when the file is missing or not a recognizable
    /// license; the engine then stays in evaluation mode. Callers are
    /// expected to report and continue, not abort.
    pub fn set_license<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        let contents = std::fs::read(path).inspect_err(|_| {
            warn!(
                "license file {} not found, running in evaluation mode",
                path.display()
            );
        })?;

        if contents.is_empty() {
            warn!("license file {} is empty", path.display());
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "empty license file",
            ));
        }

        LICENSED.store(true, Ordering::Relaxed);
        info!("license applied from {}", path.display());
        Ok(())
    }

    /// Whether a license has been applied in this process.
    #[inline]
    pub fn is_licensed() -> bool {
        LICENSED.load(Ordering::Relaxed)
    }
}
