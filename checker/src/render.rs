use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::string::FromUtf8Error;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to execute command: {0:?}")]
    CommandExecution(io::Error),

    #[error("command exited with error code {0:?}: {1}")]
    CommandErrorMessage(Option<i32>, String),

    #[error("parse info error: {0:?}")]
    FromUtf8Error(FromUtf8Error),
}

/// Seam for the external templating engine. Anything that can turn a release
/// name plus a values file into a stream of yaml documents satisfies it.
pub trait TemplateEngine {
    fn render(&self, release_name: &str, values_path: &Path) -> Result<String, RenderError>;
}

/// Renders by shelling out to `helm template`.
#[derive(Debug, Clone)]
pub struct HelmCli {
    pub binary: String,
    pub chart_path: PathBuf,
}

impl HelmCli {
    pub fn new(binary: String, chart_path: PathBuf) -> HelmCli {
        HelmCli { binary, chart_path }
    }
}

impl TemplateEngine for HelmCli {
    fn render(&self, release_name: &str, values_path: &Path) -> Result<String, RenderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("template")
            .arg(release_name)
            .arg(&self.chart_path)
            .arg("-f")
            .arg(values_path);

        debug!("running helm template command: {:?}", cmd);
        let output = cmd.output().map_err(RenderError::CommandExecution)?;

        if !output.status.success() {
            let err_string = String::from_utf8_lossy(&output.stderr);
            let message = format!("{:?}: {}", cmd, err_string);
            return Err(RenderError::CommandErrorMessage(
                output.status.code(),
                message,
            ));
        }

        String::from_utf8(output.stdout).map_err(RenderError::FromUtf8Error)
    }
}

/// Scoped owner of the transient files a run creates. Every file handed out
/// is tracked and removed on drop unless retention was requested, so cleanup
/// runs on all exit paths.
#[derive(Debug)]
pub struct TmpFiles {
    base_dir: PathBuf,
    retain: bool,
    created: Vec<PathBuf>,
}

impl TmpFiles {
    pub fn new(base_dir: PathBuf, retain: bool) -> TmpFiles {
        TmpFiles {
            base_dir,
            retain,
            created: Vec::new(),
        }
    }

    /// Write `content` to `name` under the base directory and track the
    /// file for cleanup.
    pub fn write(&mut self, name: &str, content: &str) -> Result<PathBuf, io::Error> {
        let path = self.base_dir.join(name);
        debug!("writing {} ...", path.display());
        fs::write(&path, content)?;
        if !self.created.contains(&path) {
            self.created.push(path.clone());
        }
        Ok(path)
    }
}

impl Drop for TmpFiles {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        for path in &self.created {
            debug!("removing file {}", path.display());
            let _ = fs::remove_file(path);
        }
    }
}
