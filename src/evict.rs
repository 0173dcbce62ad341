//! Page-cache drop for a single file.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

/// Releases the cached pages backing a file.
pub trait CacheEvictor: Send + Sync {
    fn evict(&self, path: &Path) -> io::Result<()>;
}

/// Opens the file read-only and advises the kernel its pages are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FadviseEvictor;

impl CacheEvictor for FadviseEvictor {
    fn evict(&self, path: &Path) -> io::Result<()> {
        let file = File::open(path)?;
        // SAFETY: the descriptor stays open for the duration of the call.
        let rc = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(())
    }
}
