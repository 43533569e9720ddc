use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use std::path::PathBuf;

/// 部署流程中的一個外部指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployStep {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl DeployStep {
    fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub work_dir: PathBuf,
    pub compose_file: Option<String>,
}

impl DeployConfig {
    pub fn new(work_dir: impl Into<PathBuf>, compose_file: Option<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            compose_file,
        }
    }

    /// git pull → docker compose up → docker image prune，順序固定
    pub fn steps(&self) -> Vec<DeployStep> {
        let mut compose_args: Vec<&str> = vec!["compose"];
        if let Some(file) = &self.compose_file {
            compose_args.extend(["-f", file.as_str()]);
        }
        compose_args.extend(["up", "--build", "-d", "--remove-orphans"]);

        vec![
            DeployStep::new("git pull", "git", &["pull"]),
            DeployStep::new("docker compose up", "docker", &compose_args),
            DeployStep::new("docker image prune", "docker", &["image", "prune", "-f"]),
        ]
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        validate_path("work_dir", &self.work_dir.to_string_lossy())?;
        if let Some(file) = &self.compose_file {
            validate_path("compose_file", file)?;
        }
        Ok(())
    }
}
