use clap::Parser;
use signal_monitor::adapters::SystemCommandRunner;
use signal_monitor::config::cli::DeployArgs;
use signal_monitor::core::deploy::run_deploy;
use signal_monitor::utils::{logger, validation::Validate};
use signal_monitor::DeployConfig;

#[tokio::main]
async fn main() {
    let args = DeployArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    let config = DeployConfig::new(&args.work_dir, args.compose_file.clone());
    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.dry_run {
        println!("🔍 Deployment plan for {}:", config.work_dir.display());
        for (index, step) in config.steps().iter().enumerate() {
            println!("  {}. {}", index + 1, step.command_line());
        }
        return;
    }

    match run_deploy(&config, &SystemCommandRunner).await {
        Ok(steps) => {
            println!("✅ Deployment completed ({} steps)", steps.len());
        }
        Err(e) => {
            tracing::error!("❌ Deployment failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
