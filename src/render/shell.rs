//! Shell-pipeline renderer for `sh` sources.

use crate::error::RenderError;
use crate::render::{decode_output, Renderer};
use std::path::Path;
use std::process::Command;

/// Runs the source file through `/bin/sh` and captures its stdout as the
/// rendered text. The source does not need to be executable.
#[derive(Default)]
pub struct ShellRenderer;

impl ShellRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for ShellRenderer {
    fn render(&self, source: &Path) -> Result<String, RenderError> {
        let output = Command::new("/bin/sh").arg(source).output()?;
        decode_output(output)
    }
}
