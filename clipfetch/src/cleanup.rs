use std::io;
use std::path::{Path, PathBuf};

/// Scoped ownership of a job's temporary files.
///
/// Every file in `dir` named `<stem>` or `<stem>.*` belongs to the job, which
/// covers per-format downloads, `.part` files and merge intermediates. They
/// are removed when the guard is dropped unless the job was finished first.
#[derive(Debug)]
pub struct TempArtifact {
    dir: PathBuf,
    stem: String,
    finished: bool
}

impl TempArtifact {
    pub fn acquire(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        let artifact = Self {
            dir: dir.into(),
            stem: stem.into(),
            finished: false
        };
        tracing::debug!(dir = %artifact.dir.display(), stem = %artifact.stem, "acquired temp artifact");
        artifact
    }

    /// `<dir>/<stem>.<ext>`
    pub fn path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", self.stem))
    }

    /// Output template for the transfer tool, one file per format id.
    pub fn template(&self) -> PathBuf {
        self.path("%(format_id)s.%(ext)s")
    }

    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.owns_name(name))
    }

    /// Moves `artifact` to `final_path`, then releases the remaining temp
    /// files.
    pub async fn promote(self, artifact: &Path, final_path: &Path) -> io::Result<PathBuf> {
        tokio::fs::rename(artifact, final_path).await?;
        tracing::debug!(from = %artifact.display(), to = %final_path.display(), "promoted artifact");
        self.finish();
        Ok(final_path.to_path_buf())
    }

    /// Removes the temp files once the final artifact is in place.
    pub fn finish(mut self) {
        self.cleanup();
        self.finished = true;
    }

    /// Removes every file the job owns and returns how many were removed.
    /// Missing files and a missing directory are not errors.
    pub fn cleanup(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!("Failed to list {} for cleanup: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(|name| self.owns_name(name)) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", entry.path().display(), e)
            }
        }
        removed
    }

    fn owns_name(&self, name: &str) -> bool {
        name == self.stem
            || name
                .strip_prefix(self.stem.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let removed = self.cleanup();
        if removed > 0 {
            tracing::info!("Removed {} temporary file(s) for {}", removed, self.stem);
        }
    }
}
