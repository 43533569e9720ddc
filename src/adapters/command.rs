use crate::domain::ports::{CommandOutcome, CommandRunner};
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// 以子行程執行指令，stdout / stderr 直接繼承到終端機
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String], work_dir: &Path) -> Result<CommandOutcome> {
        tracing::debug!("🔧 Spawning `{} {}` in {}", program, args.join(" "), work_dir.display());

        let status = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .status()
            .await
            .map_err(|e| MonitorError::CommandError {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exit_codes_are_reported() {
        let runner = SystemCommandRunner;
        let dir = std::env::temp_dir();

        let ok = runner.run("true", &[], &dir).await.unwrap();
        assert_eq!(ok, CommandOutcome { success: true, code: Some(0) });

        let failed = runner
            .run("sh", &["-c".to_string(), "exit 3".to_string()], &dir)
            .await
            .unwrap();
        assert_eq!(failed, CommandOutcome { success: false, code: Some(3) });
    }

    #[tokio::test]
    async fn test_missing_program_is_command_error() {
        let result = SystemCommandRunner
            .run("definitely-not-a-real-program-xyz", &[], &std::env::temp_dir())
            .await;
        assert!(matches!(result, Err(MonitorError::CommandError { .. })));
    }
}
