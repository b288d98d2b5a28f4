//! Canonical paths within `.ai/` for a project root.

use std::path::{Path, PathBuf};

pub const AI_DIR: &str = ".ai";

#[derive(Debug, Clone)]
pub struct AiPaths {
    pub root: PathBuf,
    pub ai_dir: PathBuf,
    pub plan_path: PathBuf,
    pub config_path: PathBuf,
    pub attempts_dir: PathBuf,
}

impl AiPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let ai_dir = root.join(AI_DIR);
        Self {
            root: root.clone(),
            ai_dir: ai_dir.clone(),
            plan_path: ai_dir.join("plan.json"),
            config_path: ai_dir.join("config.toml"),
            attempts_dir: ai_dir.join("attempts"),
        }
    }

    /// Resolve `path` against the project root unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
