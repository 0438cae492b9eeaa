//! Ollama Local Model Runner (last-resort tier)
//!
//! Runs a locally hosted model as an out-of-process command:
//! `ollama run <model> <prompt>`. Stdout is the full reply.
//!
//! # Failure handling
//! - Launch failure, non-zero exit and timeout are typed errors
//! - On timeout the child is killed and reaped before returning
//! - Empty stdout is `Ok("")`, which never parses as a reply
//!
//! # Installation
//! ```bash
//! curl -fsSL https://ollama.com/install.sh | sh
//! ollama pull mistral
//! ```

use crate::types::{CompletionProvider, ProviderError, ResolutionSource};
use async_trait::async_trait;
use leadx_common::config::LocalModelConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Local model command runner
#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: String,
    args: Vec<String>,
    model: String,
    timeout: Duration,
}

impl OllamaCli {
    /// Create runner for `model` with the default command and 30 s budget
    pub fn new(model: impl Into<String>) -> Self {
        let defaults = LocalModelConfig::default();
        Self {
            program: defaults.program,
            args: defaults.args,
            model: model.into(),
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }

    pub fn from_config(config: &LocalModelConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Replace the program and the arguments that precede `<model> <prompt>`
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(
            program = %self.program,
            model = %self.model,
            prompt_length = prompt.len(),
            "Running local model"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.model)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let waited = tokio::time::timeout(self.timeout, async {
            tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait())
        })
        .await;

        let (out, err, status) = match waited {
            Ok(result) => result,
            Err(_) => {
                // kill() also waits, so the child is reaped here
                if let Err(e) = child.kill().await {
                    warn!(program = %self.program, error = %e, "Failed to kill timed-out local model");
                }
                return Err(ProviderError::Timeout(self.timeout.as_secs()));
            }
        };

        let status = status.map_err(|e| ProviderError::Exit {
            status: "unknown".to_string(),
            stderr: e.to_string(),
        })?;

        if !status.success() {
            return Err(ProviderError::Exit {
                status: status.to_string(),
                stderr: err.trim().to_string(),
            });
        }

        Ok(out.trim().to_string())
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        debug!(error = %e, "Local model pipe read failed");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl CompletionProvider for OllamaCli {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn source(&self) -> ResolutionSource {
        ResolutionSource::Ollama
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.run(prompt).await
    }
}
