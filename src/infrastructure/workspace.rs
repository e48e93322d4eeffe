use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::modules::transcode::model::{Container, OutputMode};

/// Hands out the on-disk locations a single request works with.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    mode: OutputMode,
}

impl Workspace {
    pub fn new(root: PathBuf, mode: OutputMode) -> Self {
        Self { root, mode }
    }

    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn allocate(&self, container: Container) -> Ticket {
        let id = Uuid::new_v4();
        let input = self.root.join(format!("{}.upload", id.simple()));
        let (output, shared_output) = match self.mode {
            OutputMode::Isolated => (
                self.root
                    .join(format!("{}.{}", id.simple(), container.extension())),
                false,
            ),
            OutputMode::Shared => (
                self.root.join(format!("output.{}", container.extension())),
                true,
            ),
        };

        Ticket {
            id,
            input,
            output,
            shared_output,
        }
    }
}

/// Owns the input and output paths of one request and deletes them when dropped.
/// A shared output file outlives every ticket.
#[derive(Debug)]
pub struct Ticket {
    id: Uuid,
    input: PathBuf,
    output: PathBuf,
    shared_output: bool,
}

impl Ticket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        // Runs on a runtime worker when the response body is dropped. Two unlinks are
        // short enough to do inline, and the files are gone once drop returns.
        let _ = std::fs::remove_file(&self.input);
        if !self.shared_output {
            let _ = std::fs::remove_file(&self.output);
        }
        debug!("Released ticket {}", self.id);
    }
}
