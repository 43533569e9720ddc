use crate::utils::error::{MonitorError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXCLUDE_DIRS: &[&str] = &[
    ".git", "target", "node_modules", "venv", "__pycache__", "dist", "build", ".vscode", ".idea",
    "env", "bin", "lib", "obj",
];

pub const EXCLUDE_FILES: &[&str] = &[
    "Cargo.lock", "package-lock.json", "yarn.lock", ".env", ".DS_Store", "Thumbs.db",
];

pub const EXCLUDE_EXTENSIONS: &[&str] = &[
    "log", "tmp", "swp", "bak", "zip", "rar", "7z",
    // 媒體
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "mp4", "mov", "avi", "mp3", "wav",
    // 文件與資料
    "pdf", "doc", "docx", "xls", "xlsx", "db", "sqlite3",
    // 編譯產物
    "pyc", "o", "so", "dll", "exe", "class", "rlib",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    pub file_count: usize,
}

/// 輸出檔位於專案目錄的上一層：`<parent>/<project>_code_for_ai.txt`
pub fn output_path_for(root: &Path) -> Result<(String, PathBuf)> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| MonitorError::InvalidConfigValueError {
            field: "root".to_string(),
            value: root.display().to_string(),
            reason: "project root has no directory name".to_string(),
        })?;
    let parent = root.parent().unwrap_or(root);
    let output = parent.join(format!("{}_code_for_ai.txt", project_name));
    Ok((project_name, output))
}

fn is_excluded_file(path: &Path, output_name: &str) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name == output_name || EXCLUDE_FILES.contains(&&*name) {
        return true;
    }
    path.extension()
        .map(|ext| EXCLUDE_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}

/// 依名稱排序遞迴收集要輸出的檔案；不進入符號連結的目錄
pub fn collect_files(root: &Path, output_name: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<(PathBuf, fs::FileType)> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_type().ok().map(|kind| (entry.path(), kind)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, kind) in entries {
        if kind.is_dir() {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if !EXCLUDE_DIRS.contains(&&*name) {
                files.extend(collect_files(&path, output_name)?);
            }
        } else if kind.is_symlink() && path.is_dir() {
            tracing::debug!("↪️ Skipping linked directory {}", path.display());
        } else if (kind.is_file() || kind.is_symlink()) && !is_excluded_file(&path, output_name) {
            files.push(path);
        }
    }

    Ok(files)
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_content(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content.trim().to_string(),
        Err(e) => format!("--- [无法读取文件: {}] ---", e),
    }
}

pub fn export_project(root: &Path) -> Result<ExportSummary> {
    let (project_name, output_path) = output_path_for(root)?;
    let output_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::info!("▶️ Scanning project '{}' at {}", project_name, root.display());
    tracing::info!("   Output: {}", output_path.display());

    let files = collect_files(root, &output_name)?;
    let mut out = fs::File::create(&output_path)?;
    writeln!(out, "# 項目 '{}' 的代碼合集\n", project_name)?;

    for path in &files {
        let banner = "=".repeat(35);
        writeln!(out, "{}  📄 {}  {}\n", banner, relative_display(root, path), banner)?;
        writeln!(out, "```")?;
        writeln!(out, "{}", file_content(path))?;
        writeln!(out, "```\n\n")?;
        tracing::debug!("📄 {}", path.display());
    }

    tracing::info!("✅ Exported {} files", files.len());
    Ok(ExportSummary {
        output_path,
        file_count: files.len(),
    })
}
