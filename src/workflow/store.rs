//! Directory of workflow definition files.
//!
//! Each workflow lives in `<dir>/<name>.yaml` (or `.yml`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{BdevError, Result};

use super::definition::Workflow;

/// Recognized definition file suffixes, in lookup order.
const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Loads, lists, saves and deletes workflow definitions in one directory.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    dir: PathBuf,
}

impl WorkflowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all definition files, sorted, without extension.
    ///
    /// A missing directory simply means there are no workflows yet.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_definition = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !is_definition {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load and parse the workflow called `name`.
    pub fn load(&self, name: &str) -> Result<Workflow> {
        let path = self
            .find(name)
            .ok_or_else(|| BdevError::WorkflowNotFound(name.to_string()))?;

        let contents =
            fs::read_to_string(&path).map_err(|_| BdevError::WorkflowNotFound(name.to_string()))?;

        let mut workflow: Workflow = serde_yaml::from_str(&contents)
            .map_err(|e| BdevError::InvalidWorkflow(format!("{}: {e}", path.display())))?;

        if workflow.name.is_empty() {
            workflow.name = name.to_string();
        }

        tracing::debug!(path = %path.display(), steps = workflow.steps.len(), "loaded workflow");
        Ok(workflow)
    }

    /// Write `workflow` to `<dir>/<name>.yaml`, creating the directory.
    pub fn save(&self, workflow: &Workflow) -> Result<()> {
        if workflow.name.trim().is_empty() {
            return Err(BdevError::InvalidWorkflow(
                "cannot save a workflow without a name".into(),
            ));
        }

        let yaml = serde_yaml::to_string(workflow)
            .map_err(|e| BdevError::SerializationError(format!("workflow: {e}")))?;

        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(&workflow.name, EXTENSIONS[0]), yaml)?;
        Ok(())
    }

    /// Remove the definition file for `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self
            .find(name)
            .ok_or_else(|| BdevError::WorkflowNotFound(name.to_string()))?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// The first existing `<name>.yaml` / `<name>.yml`.
    fn find(&self, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.path_for(name, ext))
            .find(|path| path.is_file())
    }

    fn path_for(&self, name: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ext}"))
    }
}
