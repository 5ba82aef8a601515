use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::events::TaskEvent;
use crate::registry::TaskRegistry;

const MODULE_NAME: &str = "user_code";

/// Run one pynguin generation task to completion. Spawned from the submit
/// handler; the handler never awaits it. Exactly one `Result` or `Error`
/// event is enqueued, and the completion flag is flipped on every exit
/// path, after the last send attempt.
pub async fn run_generation(
    task_id: String,
    code: String,
    config: Arc<Config>,
    registry: TaskRegistry,
    tx: mpsc::Sender<TaskEvent>,
) {
    tracing::info!("Task {} started", task_id);

    match generate(&code, &config, &tx).await {
        Ok(()) => tracing::info!("Task {} completed", task_id),
        Err(message) => {
            tracing::error!("Task {} failed: {}", task_id, message);
            let _ = tx.send(TaskEvent::Error { message }).await;
        }
    }

    registry.mark_done(&task_id);
}

async fn generate(
    code: &str,
    config: &Config,
    tx: &mpsc::Sender<TaskEvent>,
) -> Result<(), String> {
    let project_dir = tempfile::tempdir()
        .map_err(|e| format!("Failed to create working directory: {}", e))?;
    let code_file = project_dir.path().join(format!("{}.py", MODULE_NAME));
    let output_dir = project_dir.path().join("tests");

    tokio::fs::write(&code_file, code)
        .await
        .map_err(|e| format!("Failed to write source file: {}", e))?;
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|e| format!("Failed to create output directory: {}", e))?;

    let mut child = Command::new(&config.pynguin_bin)
        .arg("--project-path")
        .arg(project_dir.path())
        .arg("--output-path")
        .arg(&output_dir)
        .arg("--module-name")
        .arg(MODULE_NAME)
        .arg("-v")
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYNGUIN_DANGER_AWARE", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", config.pynguin_bin, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "Failed to capture tool stdout".to_string())?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| "Failed to capture tool stderr".to_string())?;

    // Forward both output streams line by line. A failed send means the
    // task entry was evicted before anyone streamed it; stop forwarding.
    let stderr_tx = tx.clone();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stderr_tx.send(TaskEvent::Log { line }).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(TaskEvent::Log { line }).await.is_err() {
            break;
        }
    }

    let _ = stderr_task.await;

    // The artifact, not the exit code, decides the outcome.
    child
        .wait()
        .await
        .map_err(|e| format!("Failed to wait for tool: {}", e))?;

    let test_file = output_dir.join(format!("test_{}.py", MODULE_NAME));
    if !test_file.exists() {
        return Err("Test file not generated".to_string());
    }

    let test_code = tokio::fs::read_to_string(&test_file)
        .await
        .map_err(|e| format!("Failed to read generated tests: {}", e))?;

    tx.send(TaskEvent::Result { test_code })
        .await
        .map_err(|_| "No reader left for the result event".to_string())?;

    Ok(())
}
