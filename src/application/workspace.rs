//! Per-job temp file allocation and guaranteed cleanup.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

/// Allocates per-job input/output paths under one working directory. Jobs
/// never collide: the job id is embedded in every filename.
#[derive(Clone, Debug)]
pub struct TempWorkspace {
    root: PathBuf,
}

/// The two paths owned by one job. Unlinked at job end regardless of outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TempWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the working directory if needed and hand out the job's paths.
    pub async fn allocate(&self, job_id: Uuid) -> io::Result<JobPaths> {
        fs::create_dir_all(&self.root).await?;
        Ok(JobPaths {
            input: self.root.join(format!("input_{job_id}.mp4")),
            output: self.root.join(format!("circle_{job_id}.mp4")),
        })
    }

    /// Remove both job files. Never fails: this runs as the last step of
    /// every job, including paths where the files were never created.
    /// Removal failures are logged and swallowed.
    pub async fn cleanup(&self, paths: &JobPaths) {
        for path in [&paths.input, &paths.output] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to remove temp file");
                }
            }
        }
    }
}

/// True when `path` exists and holds at least one byte. A zero-length file
/// is never a usable input or artifact.
pub async fn is_nonempty_file(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}
