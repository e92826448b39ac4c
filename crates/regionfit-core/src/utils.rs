//! Utility functions for regionfit-core

use std::path::PathBuf;
use std::process::Command;

/// Creates a Command for an external tool without flashing a console window.
///
/// The quota provider shells out to the cloud management CLI once per probe.
/// On Windows each of those would otherwise pop up a CMD window, so the
/// command gets the CREATE_NO_WINDOW flag there.
///
/// # Example
/// ```ignore
/// use regionfit_core::utils::create_command;
///
/// let output = create_command("az")
///     .args(["account", "show"])
///     .output();
/// ```
pub fn create_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        // CREATE_NO_WINDOW = 0x08000000
        cmd.creation_flags(0x08000000);
    }

    cmd
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// Falls back to the raw string when expansion fails (e.g. an unset
/// variable), so the later file operation reports the real problem.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::debug!("Could not expand path {}: {}", raw, e);
            PathBuf::from(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_command_keeps_program() {
        let cmd = create_command("az");
        assert!(format!("{:?}", cmd).contains("az"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/tmp/regionfit.env"), PathBuf::from("/tmp/regionfit.env"));
    }

    #[test]
    fn test_expand_path_unset_variable_falls_back() {
        let raw = "$REGIONFIT_SURELY_UNSET_VAR/x.env";
        assert_eq!(expand_path(raw), PathBuf::from(raw));
    }
}
