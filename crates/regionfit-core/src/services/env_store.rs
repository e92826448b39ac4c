//! Persistence of the accepted region
//!
//! Writes `KEY="value"` into a dotenv-style environment file, replacing an
//! existing assignment of the same key and leaving every other line alone.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default key the accepted region is stored under
pub const DEFAULT_ENV_KEY: &str = "AZURE_LOCATION";

/// A dotenv-style file the accepted region is written into
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `key` to `value`, creating the file if needed
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() || key.contains(['=', ' ', '\n']) {
            return Err(Error::validation(format!("invalid environment key '{}'", key)));
        }

        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let assignment = format!("{}=\"{}\"", key, value.replace('"', "\\\""));
        let mut replaced = false;
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| {
                if line_key(line) == Some(key) {
                    replaced = true;
                    assignment.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();
        if !replaced {
            lines.push(assignment);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(&self.path, content)?;

        log::info!("Wrote {} to {:?}", key, self.path);
        Ok(())
    }

    /// Read back the value of `key`, without surrounding quotes
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(content.lines().find(|l| line_key(l) == Some(key)).and_then(|line| {
            line.split_once('=').map(|(_, v)| {
                let v = v.trim();
                v.strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(v)
                    .replace("\\\"", "\"")
            })
        }))
    }
}

/// Key of an assignment line, ignoring comments and an `export ` prefix
fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    line.split_once('=').map(|(k, _)| k.trim())
}
