//! Local staging area for uploads in flight.
//!
//! A [`StagedFile`] owns exactly one temporary file. It is removed either by an
//! explicit [`StagedFile::release`] or, if the owner never got that far (error
//! path, dropped request future), when the handle is dropped.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const UPLOAD_PREFIX: &str = "tubely-upload";
const STAGED_SUFFIX: &str = ".mp4";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to create staged file: {0}")]
    Create(#[source] io::Error),

    #[error("failed to read upload stream: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write staged file: {0}")]
    Write(#[source] io::Error),
}

/// Allocates temporary files under a single directory.
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Staging store rooted at the system temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `reader` into a new staged file, failing once more than `size_limit`
    /// bytes arrive. Never writes more than `size_limit` bytes to disk.
    ///
    /// The returned file is positioned at offset zero.
    #[tracing::instrument(skip(self, reader), fields(staging.dir = %self.dir.display()))]
    pub async fn stage<R>(&self, reader: R, size_limit: u64) -> Result<StagedFile, StagingError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut staged = self.create(UPLOAD_PREFIX)?;

        let copied = match staged.handle() {
            Some(file) => copy_limited(reader, file, size_limit).await,
            None => Err(StagingError::Write(already_released())),
        };

        let result = match copied {
            Ok(size) => staged.rewind().await.map(|_| size).map_err(StagingError::Write),
            Err(e) => Err(e),
        };

        match result {
            Ok(size_bytes) => {
                tracing::debug!(
                    path = %staged.path().display(),
                    size_bytes,
                    "Upload staged"
                );
                Ok(staged)
            }
            Err(e) => {
                if let Err(release_err) = staged.release().await {
                    tracing::warn!(
                        error = %release_err,
                        path = %staged.path().display(),
                        "Failed to remove partially staged upload"
                    );
                }
                Err(e)
            }
        }
    }

    /// Create an empty staged file for a tool that writes its own output.
    pub async fn allocate(&self, prefix: &str) -> Result<StagedFile, StagingError> {
        self.create(prefix)
    }

    fn create(&self, prefix: &str) -> Result<StagedFile, StagingError> {
        let named = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(STAGED_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(StagingError::Create)?;
        // Deletion is tracked by StagedFile from here on.
        let (file, path) = named.keep().map_err(|e| StagingError::Create(e.error))?;

        Ok(StagedFile {
            path,
            file: Some(File::from_std(file)),
            released: false,
        })
    }
}

async fn copy_limited<R>(reader: R, file: &mut File, size_limit: u64) -> Result<u64, StagingError>
where
    R: AsyncRead + Unpin + Send,
{
    // One byte past the limit is enough to know the upload is too large.
    let mut limited = reader.take(size_limit.saturating_add(1));
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;

    loop {
        let n = limited.read(&mut buf).await.map_err(StagingError::Read)?;
        if n == 0 {
            break;
        }
        if written + n as u64 > size_limit {
            return Err(StagingError::PayloadTooLarge { limit: size_limit });
        }
        file.write_all(&buf[..n]).await.map_err(StagingError::Write)?;
        written += n as u64;
    }

    file.flush().await.map_err(StagingError::Write)?;
    Ok(written)
}

fn already_released() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "staged file already released")
}

/// Ownership handle for one temporary file on local disk.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: Option<File>,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn handle(&mut self) -> Option<&mut File> {
        self.file.as_mut()
    }

    /// Reset the read position to the start of the file and return the handle.
    pub async fn rewind(&mut self) -> io::Result<&mut File> {
        if self.released {
            return Err(already_released());
        }
        let file = match self.file.take() {
            Some(file) => file,
            None => File::open(&self.path).await?,
        };
        let file = self.file.insert(file);
        file.seek(SeekFrom::Start(0)).await?;
        Ok(file)
    }

    /// Replace the handle with a fresh one, for files rewritten by another process.
    pub async fn reopen(&mut self) -> io::Result<()> {
        if self.released {
            return Err(already_released());
        }
        self.file = None;
        self.file = Some(File::open(&self.path).await?);
        Ok(())
    }

    pub async fn len(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Close the handle and delete the backing file.
    ///
    /// Safe to call repeatedly; a file that is already gone counts as released.
    /// On failure the file stays owned and is retried on drop.
    pub async fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.file = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.released = true;
        tracing::trace!(path = %self.path.display(), "Staged file released");
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.file = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to remove staged file on drop"
                );
            }
        }
    }
}
