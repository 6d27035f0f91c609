//! 7-Zip-based extraction tool implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::ExtractorError;
use super::types::ExtractionTool;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// 7-Zip invoked as an external process: `7z x <archive> -o<dest> -y`.
///
/// The `x` command preserves directory structure inside the archive and
/// `-y` answers every prompt with yes, so re-extraction over an existing
/// destination overwrites silently.
pub struct SevenZipTool {
    path: PathBuf,
    timeout_secs: u64,
}

impl SevenZipTool {
    /// Creates a tool handle over the executable at `path`. A zero
    /// `timeout_secs` disables the timeout.
    pub fn new(path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            path: path.into(),
            timeout_secs,
        }
    }

    fn build_command(&self, archive: &Path, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg("x")
            .arg(archive)
            .arg(format!("-o{}", dest.display()))
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }

    async fn run(&self, archive: &Path, dest: &Path) -> Result<(), ExtractorError> {
        debug!(
            "Running {} x {} -o{} -y",
            self.path.display(),
            archive.display(),
            dest.display()
        );

        let child = self
            .build_command(archive, dest)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractorError::ToolNotFound {
                        path: self.path.clone(),
                    }
                } else {
                    ExtractorError::Io(e)
                }
            })?;

        let wait = child.wait_with_output();
        let output = if self.timeout_secs == 0 {
            wait.await?
        } else {
            match timeout(Duration::from_secs(self.timeout_secs), wait).await {
                Ok(result) => result?,
                // Dropping the wait future kills the child via kill_on_drop.
                Err(_) => {
                    return Err(ExtractorError::Timeout {
                        timeout_secs: self.timeout_secs,
                    })
                }
            }
        };

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.stdout.is_empty() {
                if !combined.is_empty() {
                    combined.push('\n');
                }
                combined.push_str(&String::from_utf8_lossy(&output.stdout));
            }
            return Err(ExtractorError::ToolFailed {
                code: output.status.code(),
                output: combined,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ExtractionTool for SevenZipTool {
    fn name(&self) -> &str {
        "7z"
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractorError> {
        self.run(archive, dest).await
    }
}
