//! Compiler backends

use super::standard_json::{StandardJsonInput, StandardJsonOutput};
use async_trait::async_trait;
use reactgen_core::{Error, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Anything that answers a standard JSON compile request
#[async_trait]
pub trait CompilerBackend: Send + Sync {
    async fn compile(&self, input: &StandardJsonInput) -> Result<StandardJsonOutput>;
}

/// `solc --standard-json` run as a child process
#[derive(Debug, Clone)]
pub struct SolcBackend {
    solc_path: String,
}

impl SolcBackend {
    pub fn new<S: Into<String>>(solc_path: S) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }

    pub fn solc_path(&self) -> &str {
        &self.solc_path
    }
}

#[async_trait]
impl CompilerBackend for SolcBackend {
    async fn compile(&self, input: &StandardJsonInput) -> Result<StandardJsonOutput> {
        let request = serde_json::to_vec(input)?;

        let mut child = Command::new(&self.solc_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::external(format!("Failed to start {}: {}", self.solc_path, e)))?;

        debug!(solc = %self.solc_path, bytes = request.len(), "Sending compile request");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::external("solc stdin was not captured"))?;
        stdin
            .write_all(&request)
            .await
            .map_err(|e| Error::external(format!("Failed to write compile request: {}", e)))?;
        // Closing stdin lets solc start compiling
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::external(format!("Failed to wait for {}: {}", self.solc_path, e)))?;

        if !output.status.success() {
            return Err(Error::external(format!(
                "{} exited with {}: {}",
                self.solc_path,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::external(format!("Unreadable compiler output: {}", e)))
    }
}
