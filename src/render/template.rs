//! Variable-interpolation template renderer for `tmpl` sources.

use crate::error::RenderError;
use crate::render::Renderer;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Renders `${name}` placeholders against a fixed variable table.
///
/// The variable table comes from the daemon configuration; an undefined
/// variable is a render failure, not an empty substitution, so a typo in a
/// template shows up as a diagnostic placeholder in the generated output.
pub struct TemplateRenderer {
    vars: BTreeMap<String, String>,
    placeholder: Regex,
}

impl TemplateRenderer {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars,
            placeholder: Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("static pattern"),
        }
    }

    fn interpolate(&self, input: &str) -> Result<String, RenderError> {
        let mut output = String::with_capacity(input.len());
        let mut last_end = 0;
        for caps in self.placeholder.captures_iter(input) {
            let whole = caps.get(0).expect("capture 0 always present");
            let name = &caps[1];
            let value = self
                .vars
                .get(name)
                .ok_or_else(|| RenderError::Template(format!("undefined variable `{}`", name)))?;
            output.push_str(&input[last_end..whole.start()]);
            output.push_str(value);
            last_end = whole.end();
        }
        output.push_str(&input[last_end..]);
        Ok(output)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, source: &Path) -> Result<String, RenderError> {
        let input = std::fs::read_to_string(source)?;
        self.interpolate(&input)
    }
}
