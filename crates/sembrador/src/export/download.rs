use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::info;

use super::csv::CsvPayload;

/// Destination able to hand a rendered export to the user. Each export stages the
/// payload behind a handle, triggers delivery, and then releases the handle.
pub trait DownloadTarget {
    type Handle;

    fn create_handle(&self, payload: &CsvPayload) -> Result<Self::Handle, DownloadError>;
    fn trigger(&self, handle: &Self::Handle, filename: &str) -> Result<(), DownloadError>;
    fn release(&self, handle: Self::Handle);
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid download file name '{0}'")]
    InvalidFilename(String),
    #[error("download handle {0} is no longer staged")]
    StaleHandle(u64),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Render and deliver a CSV export. The handle is released whether or not the
/// delivery succeeded.
pub fn export_csv<T, H, C>(
    target: &T,
    filename: &str,
    headers: &[H],
    rows: &[Vec<C>],
) -> Result<(), DownloadError>
where
    T: DownloadTarget + ?Sized,
    H: AsRef<str>,
    C: AsRef<str>,
{
    let payload = CsvPayload::render(headers, rows);
    let handle = target.create_handle(&payload)?;
    let delivered = target.trigger(&handle, filename);
    target.release(handle);
    delivered
}

/// Writes exports into a directory, one file per download.
#[derive(Debug)]
pub struct FileDownloadTarget {
    directory: PathBuf,
    staged: Mutex<HashMap<u64, Vec<u8>>>,
    next_handle: AtomicU64,
}

impl FileDownloadTarget {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            staged: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of payloads currently staged and not yet released.
    pub fn staged_count(&self) -> usize {
        self.staged().len()
    }

    fn destination(&self, filename: &str) -> Result<PathBuf, DownloadError> {
        let path = Path::new(filename);
        match path.file_name() {
            Some(name) if path.components().count() == 1 => Ok(self.directory.join(name)),
            _ => Err(DownloadError::InvalidFilename(filename.to_string())),
        }
    }

    fn staged(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Vec<u8>>> {
        self.staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to a payload staged by [`FileDownloadTarget`].
#[derive(Debug, PartialEq, Eq)]
pub struct StagedDownload(u64);

impl DownloadTarget for FileDownloadTarget {
    type Handle = StagedDownload;

    fn create_handle(&self, payload: &CsvPayload) -> Result<Self::Handle, DownloadError> {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.staged().insert(id, payload.as_bytes().to_vec());
        Ok(StagedDownload(id))
    }

    fn trigger(&self, handle: &Self::Handle, filename: &str) -> Result<(), DownloadError> {
        let destination = self.destination(filename)?;
        let staged = self.staged();
        let bytes = staged
            .get(&handle.0)
            .ok_or(DownloadError::StaleHandle(handle.0))?;
        fs::create_dir_all(&self.directory)?;
        fs::write(&destination, bytes)?;
        info!(path = %destination.display(), bytes = bytes.len(), "export written");
        Ok(())
    }

    fn release(&self, handle: Self::Handle) {
        self.staged().remove(&handle.0);
    }
}
