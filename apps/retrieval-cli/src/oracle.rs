use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;

use retrieval_core::config::OracleConfig;
use retrieval_core::{Error, Result, TextOracle};

/// Runs an external program per prompt: the prompt goes to its stdin, the
/// completion is whatever it prints on stdout. Works with any local or
/// hosted model that has a command-line client.
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runtime: Runtime,
}

impl CommandOracle {
    pub fn new(argv: &[String], timeout: Duration) -> anyhow::Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| anyhow::anyhow!("oracle.command must not be empty"))?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { program: program.clone(), args: args.to_vec(), timeout, runtime })
    }

    async fn run(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Oracle(format!("failed to start `{}`: {e}", self.program)))?;

        let mut stdin = child.stdin.take().ok_or_else(|| Error::Oracle("oracle stdin unavailable".into()))?;
        let prompt = prompt.to_owned();
        // written concurrently so a chatty child cannot block on a full stdout pipe
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(prompt.as_bytes()).await;
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Oracle(format!("`{}` timed out after {:?}", self.program, self.timeout)))?
            .map_err(|e| Error::Oracle(format!("`{}` failed: {e}", self.program)))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Oracle(format!("`{}` exited with {}: {}", self.program, output.status, stderr.trim())));
        }
        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if answer.is_empty() {
            return Err(Error::Oracle(format!("`{}` returned no output", self.program)));
        }
        Ok(answer)
    }
}

impl TextOracle for CommandOracle {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.runtime.block_on(self.run(prompt))
    }
}

/// The configured oracle, if any.
pub fn build_oracle(config: &OracleConfig) -> anyhow::Result<Option<Arc<dyn TextOracle>>> {
    match config.command.as_deref() {
        None | Some([]) => Ok(None),
        Some(argv) => {
            let oracle = CommandOracle::new(argv, Duration::from_secs(config.timeout_secs))?;
            tracing::info!(program = %argv[0], timeout_secs = config.timeout_secs, "oracle configured");
            Ok(Some(Arc::new(oracle)))
        }
    }
}
