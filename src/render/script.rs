//! Script-execution renderer for `script` sources.

use crate::error::RenderError;
use crate::render::{decode_output, Renderer};
use std::path::Path;
use std::process::Command;

/// Executes the source file as a program and captures its stdout as the
/// rendered text. The file must be executable; a non-zero exit status or
/// non-UTF-8 output is a render failure.
#[derive(Default)]
pub struct ScriptRenderer;

impl ScriptRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for ScriptRenderer {
    fn render(&self, source: &Path) -> Result<String, RenderError> {
        let output = Command::new(source).output()?;
        decode_output(output)
    }
}
