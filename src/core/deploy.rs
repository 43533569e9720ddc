use crate::config::{DeployConfig, DeployStep};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{MonitorError, Result};

/// 依序執行部署步驟，第一個失敗的步驟即中止，後續步驟不會執行
pub async fn run_deploy(config: &DeployConfig, runner: &dyn CommandRunner) -> Result<Vec<DeployStep>> {
    let steps = config.steps();
    let total = steps.len();
    let mut completed = Vec::with_capacity(total);

    tracing::info!("🚀 Deploying in {}", config.work_dir.display());

    for (index, step) in steps.into_iter().enumerate() {
        tracing::info!("▶️ [{}/{}] {}", index + 1, total, step.command_line());

        let outcome = runner.run(&step.program, &step.args, &config.work_dir).await?;
        if !outcome.success {
            tracing::error!(
                "❌ [{}/{}] {} failed (exit code {:?})",
                index + 1,
                total,
                step.name,
                outcome.code
            );
            return Err(MonitorError::StepFailed {
                step: step.name,
                code: outcome.code.unwrap_or(1),
            });
        }

        tracing::info!("✅ [{}/{}] {} done", index + 1, total, step.name);
        completed.push(step);
    }

    tracing::info!("🎉 Deployment finished");
    Ok(completed)
}
