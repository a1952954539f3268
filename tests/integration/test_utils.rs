//! Shared test utilities for integration tests
//!
//! Builds a whole daemon fixture (plugin directories, output root, group
//! table, built-in renderers) on temporary directories, so each test can
//! exercise the service façade end-to-end.

use etcgen::engine::{Engine, GenerationContext};
use etcgen::events::{EventBus, EventEnvelope};
use etcgen::groups::{Dependency, Group, TomlGroupStore};
use etcgen::index::{FileIndex, IndexHandle};
use etcgen::render::builtin_registry;
use etcgen::service::ServiceFacade;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tempfile::TempDir;

pub struct DaemonFixture {
    pub plugin_dirs: Vec<TempDir>,
    root_dir: TempDir,
    pub facade: ServiceFacade,
    pub events: Receiver<EventEnvelope>,
}

impl DaemonFixture {
    /// Build a fixture with `dir_count` empty plugin directories and the
    /// given group table. Write sources with [`write_source`] /
    /// [`write_executable`], then call `rescan()` to index them.
    pub fn new(dir_count: usize, groups: Vec<Group>) -> Self {
        Self::with_vars(dir_count, groups, &[])
    }

    pub fn with_vars(dir_count: usize, groups: Vec<Group>, vars: &[(&str, &str)]) -> Self {
        let plugin_dirs: Vec<TempDir> = (0..dir_count).map(|_| TempDir::new().unwrap()).collect();
        let root_dir = TempDir::new().unwrap();
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let registry = builtin_registry(vars);
        let (events, receiver) = EventBus::new_pair();
        let ctx = Arc::new(GenerationContext {
            root: root_dir.path().to_path_buf(),
            plugin_dirs: plugin_dirs.iter().map(|d| d.path().to_path_buf()).collect(),
            index: IndexHandle::new(FileIndex::default()),
            registry,
            groups: Arc::new(TomlGroupStore::from_groups(groups)),
            events,
        });
        Self {
            plugin_dirs,
            root_dir,
            facade: ServiceFacade::new(Engine::new(ctx)),
            events: receiver,
        }
    }

    pub fn rescan(&self) {
        self.facade.rescan();
    }

    pub fn output(&self, logical_name: &str) -> PathBuf {
        self.root_dir.path().join(logical_name)
    }

    pub fn read_output(&self, logical_name: &str) -> String {
        std::fs::read_to_string(self.output(logical_name)).unwrap()
    }

    /// Drain the event bus, returning the announced absolute filenames in
    /// emission order.
    pub fn generated_filenames(&self) -> Vec<String> {
        self.events
            .try_iter()
            .map(|e| e.data["filename"].as_str().unwrap().to_string())
            .collect()
    }
}

pub fn group(name: &str, deps: &[&str]) -> Group {
    Group {
        name: name.to_string(),
        dependencies: deps.iter().map(|d| Dependency::parse(d).unwrap()).collect(),
    }
}

pub fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

#[cfg(unix)]
pub fn write_executable(dir: &Path, name: &str, contents: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_source(dir, name, contents);
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
