//! Generation Engine
//!
//! Resolves a logical name (file, plugin, or group) and executes it: files
//! are rendered and written under the root directory, plugins run as
//! supervised child processes, groups expand their ordered dependency list.
//!
//! Failure policy: file and plugin failures are leaf-artifact breakage and
//! are logged and contained, with a failed render replaced by a diagnostic
//! placeholder so downstream consumers see an obviously-broken artifact
//! rather than a stale one. An unresolvable group name is a caller error and
//! is the one failure that propagates.

use crate::error::GenerationError;
use crate::events::{EventBus, FILE_GENERATED};
use crate::groups::{DependencyKind, GroupStore};
use crate::index::IndexHandle;
use crate::plugin::run_plugin;
use crate::render::RendererRegistry;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Process-wide state for generation: the root output directory, the
/// current managed-file index, the renderer registry, and the group table.
/// Lives for the process lifetime; only a rescan mutates it, by swapping
/// the index snapshot.
pub struct GenerationContext {
    pub root: PathBuf,
    pub plugin_dirs: Vec<PathBuf>,
    pub index: IndexHandle,
    pub registry: RendererRegistry,
    pub groups: Arc<dyn GroupStore>,
    pub events: EventBus,
}

/// Executes generation requests against a [`GenerationContext`].
#[derive(Clone)]
pub struct Engine {
    ctx: Arc<GenerationContext>,
}

impl Engine {
    pub fn new(ctx: Arc<GenerationContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<GenerationContext> {
        &self.ctx
    }

    /// Render one managed file and write it to `root/<logical name>`.
    ///
    /// An unknown logical name is not an error: callers may probe
    /// speculatively, so the request is dropped with a debug log. A source
    /// that vanished since the scan is likewise skipped without touching any
    /// existing output. A renderer failure is written out as a diagnostic
    /// placeholder; a write failure aborts this file only.
    pub fn generate_file(&self, logical_name: &str) {
        let index = self.ctx.index.load();
        let Some(managed) = index.get(logical_name) else {
            debug!(name = %logical_name, "not a managed file, skipping");
            return;
        };
        if !managed.source_path.exists() {
            debug!(
                name = %logical_name,
                source = %managed.source_path.display(),
                "source vanished since scan, skipping"
            );
            return;
        }

        let text = match self.ctx.registry.render(&managed.source_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(name = %logical_name, error = %err, "cannot generate file");
                format!("# FILE GENERATION FAILED: {}\n", err)
            }
        };

        let target = self.ctx.root.join(logical_name);
        if let Err(err) = std::fs::write(&target, &text) {
            error!(
                name = %logical_name,
                target = %target.display(),
                error = %err,
                "failed to write generated file"
            );
            return;
        }

        let absolute = dunce::canonicalize(&target).unwrap_or(target);
        self.ctx.events.emit_best_effort(
            FILE_GENERATED,
            json!({ "filename": absolute.to_string_lossy() }),
        );
    }

    /// Run one managed plugin. Load and runtime failures are logged with
    /// the plugin's name and swallowed; a broken plugin must not block its
    /// siblings.
    pub fn generate_plugin(&self, logical_name: &str) {
        let index = self.ctx.index.load();
        let Some(managed) = index.get(logical_name) else {
            debug!(name = %logical_name, "not a managed plugin, skipping");
            return;
        };
        if let Err(err) = run_plugin(&managed.source_path, logical_name, &self.ctx.root) {
            error!(plugin = %logical_name, error = %err, "cannot run plugin");
        }
    }

    /// Generate every dependency of a group, in list order.
    ///
    /// An unknown group name is fatal to the request. A cyclic group
    /// reference fails fast instead of recursing unboundedly.
    pub fn generate_group(&self, name: &str) -> Result<(), GenerationError> {
        let mut in_progress = HashSet::new();
        self.generate_group_inner(name, &mut in_progress)
    }

    fn generate_group_inner(
        &self,
        name: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<(), GenerationError> {
        if !in_progress.insert(name.to_string()) {
            return Err(GenerationError::CyclicDependency(name.to_string()));
        }

        let group = self
            .ctx
            .groups
            .get(name)?
            .ok_or_else(|| GenerationError::GroupNotFound(name.to_string()))?;

        for dependency in &group.dependencies {
            match dependency.kind {
                DependencyKind::File => self.generate_file(&dependency.target),
                DependencyKind::Plugin => self.generate_plugin(&dependency.target),
                DependencyKind::Group => {
                    self.generate_group_inner(&dependency.target, in_progress)?
                }
            }
        }

        in_progress.remove(name);
        Ok(())
    }

    /// Generate every known group, independently: one group's failure is
    /// logged and does not stop the rest of the batch.
    pub fn generate_all(&self) {
        let names = match self.ctx.groups.names() {
            Ok(names) => names,
            Err(err) => {
                error!(error = %err, "cannot list groups");
                return;
            }
        };
        for name in names {
            if let Err(err) = self.generate_group(&name) {
                error!(group = %name, error = %err, "cannot generate group");
            }
        }
    }
}
