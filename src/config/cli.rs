use clap::Parser;

/// `signal-monitor` 命令列參數
#[derive(Debug, Clone, Parser)]
#[command(name = "signal-monitor")]
#[command(about = "Crypto market signal monitor with DingTalk alerts")]
pub struct MonitorArgs {
    /// Path to TOML configuration file (defaults: monitor.toml, config/monitor.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process CPU / memory after every scan cycle
    #[arg(long)]
    pub monitor: bool,

    /// Run one scan cycle (and the daily report when enabled) then exit
    #[arg(long)]
    pub once: bool,

    /// Print the configuration summary without touching the exchange
    #[arg(long)]
    pub dry_run: bool,
}

/// `deploy` 命令列參數
#[derive(Debug, Clone, Parser)]
#[command(name = "deploy")]
#[command(about = "git pull, rebuild the compose stack and prune dangling images")]
pub struct DeployArgs {
    /// Directory containing the compose file and the git checkout
    #[arg(long, default_value = ".")]
    pub work_dir: String,

    /// Compose file passed to `docker compose -f`
    #[arg(long)]
    pub compose_file: Option<String>,

    /// Print the steps without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// `export-code` 命令列參數
#[derive(Debug, Clone, Parser)]
#[command(name = "export-code")]
#[command(about = "Bundle project sources into a single text file")]
pub struct ExportArgs {
    /// Project root to scan (defaults to the current directory)
    #[arg(long)]
    pub root: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
