//! Size-bounded append-only file with numbered generations.
//!
//! Before every write the sink re-reads the live file's size from disk. When
//! the incoming line would take a non-empty file to `max_file_size` or
//! beyond, a rotation is armed and the handle closed; closing runs the
//! rename chain, and the write reopens the original name.
//!
//! Several processes appending to the same file each decide to rotate on
//! their own, and the rename chain is not atomic across processes. Lines do
//! not interleave (one `write_all` on an `O_APPEND` handle), but rotation
//! may happen more than once per threshold crossing. Use one writer per file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use beatlog_core::{LogError, LogResult, RotationError, RotationPolicy, Sink};
use tracing::{debug, warn};

pub struct RotatingFileSink {
    path: PathBuf,
    policy: Option<RotationPolicy>,
    file: Option<File>,
    pending_rotation: bool,
}

impl RotatingFileSink {
    /// A file sink that rotates according to `policy`.
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> LogResult<Self> {
        policy.validate()?;
        Self::open(path.into(), Some(policy))
    }

    /// A plain append-only file sink that never rotates.
    pub fn unbounded(path: impl Into<PathBuf>) -> LogResult<Self> {
        Self::open(path.into(), None)
    }

    fn open(path: PathBuf, policy: Option<RotationPolicy>) -> LogResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(LogError::invalid_configuration("log file path is empty"));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LogError::io(parent, e))?;
        }
        Ok(Self {
            path,
            policy,
            file: None,
            pending_rotation: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> Option<&RotationPolicy> {
        self.policy.as_ref()
    }

    pub fn is_rotation_pending(&self) -> bool {
        self.pending_rotation
    }

    /// Arm a rotation to run on the next `close` or `reset`.
    pub fn request_rotation(&mut self) {
        if self.policy.is_some() {
            self.pending_rotation = true;
        }
    }

    /// Close the handle and shift the generation chain by one. Stops at the
    /// first failed rename; the pending flag is cleared either way.
    pub fn rotate(&mut self) -> Result<(), RotationError> {
        self.file = None;
        self.pending_rotation = false;
        let Some(policy) = self.policy else {
            return Ok(());
        };

        for i in (1..policy.max_generations).rev() {
            let from = policy.generation_path(&self.path, i);
            if from.exists() {
                let to = policy.generation_path(&self.path, i + 1);
                rename(from, to)?;
            }
        }

        if self.path.exists() {
            rename(self.path.clone(), policy.generation_path(&self.path, 1))?;
        }

        debug!(path = %self.path.display(), "Rotated log file");
        Ok(())
    }

    fn rotate_or_warn(&mut self) {
        if let Err(e) = self.rotate() {
            warn!(
                path = %self.path.display(),
                from = %e.from.display(),
                to = %e.to.display(),
                error = %e.source,
                "Log rotation failed, continuing on the live file"
            );
        }
    }

    fn needs_rotation(&self, incoming: u64) -> bool {
        let Some(policy) = &self.policy else {
            return false;
        };
        let current = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        current > 0 && current + incoming >= policy.max_file_size
    }

    fn handle(&mut self) -> LogResult<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| LogError::io(&self.path, e))?,
        };
        Ok(self.file.insert(file))
    }
}

fn rename(from: PathBuf, to: PathBuf) -> Result<(), RotationError> {
    fs::rename(&from, &to).map_err(|source| RotationError { from, to, source })
}

impl Sink for RotatingFileSink {
    fn write(&mut self, line: &[u8]) -> Result<(), LogError> {
        if self.needs_rotation(line.len() as u64) {
            self.pending_rotation = true;
            self.rotate_or_warn();
        }

        let file = self.handle()?;
        if let Err(e) = file.write_all(line) {
            // Reopen on the next write.
            self.file = None;
            return Err(LogError::io(&self.path, e));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        match self.file.as_mut() {
            Some(file) => file.flush().map_err(|e| LogError::io(&self.path, e)),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), LogError> {
        self.flush()?;
        self.file = None;
        if self.pending_rotation {
            self.rotate()?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), LogError> {
        if self.pending_rotation {
            self.close()
        } else {
            self.flush()
        }
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "Failed to close log file");
        }
    }
}
