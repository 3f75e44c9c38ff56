use crate::domain::transcode::ProcessOutcome;
use async_trait::async_trait;
use std::io;
use std::path::Path;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait TranscodePort: Send + Sync {
    /// Run the external tool over `input`, producing `output`. Every expected
    /// process outcome is a value; `Err` is reserved for faults outside the
    /// tool contract, such as I/O errors while supervising the child.
    async fn run(&self, input: &Path, output: &Path) -> io::Result<ProcessOutcome>;
}
