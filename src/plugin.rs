//! Plugin Execution
//!
//! A plugin is a managed source file executed as a supervised child process.
//! The generation root is exposed through the `ETCGEN_ROOT` environment
//! variable and the plugin's logical name through `ETCGEN_PLUGIN`; the
//! plugin performs its own file writes under the root and is not constrained
//! in what it produces. Failures are isolated per plugin: the engine logs
//! and swallows them so a broken plugin never blocks its siblings.

use crate::error::PluginError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Environment variable carrying the root output directory.
pub const ENV_ROOT: &str = "ETCGEN_ROOT";
/// Environment variable carrying the plugin's logical name.
pub const ENV_PLUGIN: &str = "ETCGEN_PLUGIN";

/// Run a plugin source file to completion.
///
/// The file must be executable. A spawn failure is a load failure; a
/// non-zero exit status is a runtime failure carrying the plugin's stderr.
pub fn run_plugin(source: &Path, logical_name: &str, root: &Path) -> Result<(), PluginError> {
    debug!(plugin = %logical_name, source = %source.display(), "running plugin");
    let output = Command::new(source)
        .env(ENV_ROOT, root)
        .env(ENV_PLUGIN, logical_name)
        .current_dir(root)
        .output()?;

    if !output.status.success() {
        return Err(PluginError::Runtime {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
