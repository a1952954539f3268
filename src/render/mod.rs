//! Renderer Registry
//!
//! Maps a file extension to a rendering backend. A renderer turns one
//! template source file into UTF-8 output text, or fails; the registry is a
//! pure, stateless lookup built once at startup.

use crate::error::RenderError;
use std::collections::BTreeMap;
use std::path::Path;

mod script;
mod shell;
mod template;

pub use script::ScriptRenderer;
pub use shell::ShellRenderer;
pub use template::TemplateRenderer;

/// A rendering backend: given a source path, produce output text, or fail.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &Path) -> Result<String, RenderError>;
}

/// Extension → backend lookup table.
pub struct RendererRegistry {
    renderers: BTreeMap<String, Box<dyn Renderer>>,
}

impl RendererRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            renderers: BTreeMap::new(),
        }
    }

    /// Register a backend for an extension (without the leading dot).
    pub fn register(&mut self, extension: impl Into<String>, renderer: Box<dyn Renderer>) {
        self.renderers.insert(extension.into(), renderer);
    }

    /// Extensions with a registered backend, in stable order.
    ///
    /// Feeds the managed-file scan: only files with a known renderer are
    /// indexed.
    pub fn known_extensions(&self) -> Vec<String> {
        self.renderers.keys().cloned().collect()
    }

    /// Render a source file with the backend selected by its extension.
    pub fn render(&self, source: &Path) -> Result<String, RenderError> {
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let renderer =
            self.renderers
                .get(&extension)
                .ok_or_else(|| RenderError::UnknownRenderer {
                    extension: extension.clone(),
                })?;
        renderer.render(source)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry of built-in renderers.
///
/// `vars` is the variable table available to `${name}` interpolation in
/// `tmpl` sources.
pub fn builtin_registry(vars: std::collections::BTreeMap<String, String>) -> RendererRegistry {
    let mut registry = RendererRegistry::new();
    registry.register("tmpl", Box::new(TemplateRenderer::new(vars)));
    registry.register("script", Box::new(ScriptRenderer::new()));
    registry.register("sh", Box::new(ShellRenderer::new()));
    registry
}

/// Decode captured process output as UTF-8 rendered text.
pub(crate) fn decode_output(output: std::process::Output) -> Result<String, RenderError> {
    if !output.status.success() {
        return Err(RenderError::CommandFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    String::from_utf8(output.stdout).map_err(|_| RenderError::NonUtf8Output)
}
