use anyhow::Context;
use clap::Parser;
use signal_monitor::config::cli::ExportArgs;
use signal_monitor::utils::code_export::export_project;
use signal_monitor::utils::logger;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args = ExportArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    let root = match args.root {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("project root {} is not accessible", root.display()))?;

    let summary = export_project(&root)
        .with_context(|| format!("failed to export {}", root.display()))?;

    println!("✅ 成功！共处理了 {} 个文件。", summary.file_count);
    println!("   所有代码已整合到文件 '{}' 中。", summary.output_path.display());
    println!("\n下一步：请检查并删除任何敏感信息（如密码、API密钥等）后再分享。");

    Ok(())
}
