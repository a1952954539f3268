//! Group Table
//!
//! A group is a named, ordered list of file/plugin/group dependencies that
//! together define one unit of configuration regeneration. The table itself
//! is an external collaborator behind the [`GroupStore`] seam; the bundled
//! implementation reads a TOML file and validates every dependency spec
//! eagerly at load time.

use crate::error::GenerationError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Kind of a single group dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    File,
    Plugin,
    Group,
}

/// One entry of a group's ordered dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub target: String,
}

impl Dependency {
    /// Parse a `"kind:ref"` spec string.
    ///
    /// A missing or unknown kind prefix, or an empty target, is a
    /// configuration error and fails eagerly.
    pub fn parse(spec: &str) -> Result<Self, GenerationError> {
        let (kind, target) = spec
            .split_once(':')
            .ok_or_else(|| GenerationError::InvalidDependencySpec(spec.to_string()))?;
        if target.is_empty() {
            return Err(GenerationError::InvalidDependencySpec(spec.to_string()));
        }
        let kind = match kind {
            "file" => DependencyKind::File,
            "plugin" => DependencyKind::Plugin,
            "group" => DependencyKind::Group,
            _ => return Err(GenerationError::InvalidDependencySpec(spec.to_string())),
        };
        Ok(Self {
            kind,
            target: target.to_string(),
        })
    }
}

/// A named, ordered unit of configuration regeneration.
///
/// Dependency order is generation order: later entries may rely on earlier
/// ones having been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub dependencies: Vec<Dependency>,
}

/// Read-only lookup table of groups, keyed by name.
pub trait GroupStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<Group>, GenerationError>;

    /// All group names, in table order.
    fn names(&self) -> Result<Vec<String>, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct RawGroupsFile {
    #[serde(default)]
    group: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Group table backed by a TOML file, loaded and validated once at startup.
pub struct TomlGroupStore {
    groups: Vec<Group>,
}

impl TomlGroupStore {
    /// Load the groups file, parsing and validating every dependency spec.
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GenerationError::Store(format!("cannot read {}: {}", path.display(), e)))?;
        let parsed: RawGroupsFile = toml::from_str(&raw)
            .map_err(|e| GenerationError::Store(format!("cannot parse {}: {}", path.display(), e)))?;

        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(parsed.group.len());
        for raw_group in parsed.group {
            if !seen.insert(raw_group.name.clone()) {
                return Err(GenerationError::Store(format!(
                    "duplicate group name `{}`",
                    raw_group.name
                )));
            }
            let dependencies = raw_group
                .dependencies
                .iter()
                .map(|spec| Dependency::parse(spec))
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(Group {
                name: raw_group.name,
                dependencies,
            });
        }
        Ok(Self { groups })
    }

    /// Build a store from already-validated groups.
    pub fn from_groups(groups: Vec<Group>) -> Self {
        Self { groups }
    }
}

impl GroupStore for TomlGroupStore {
    fn get(&self, name: &str) -> Result<Option<Group>, GenerationError> {
        Ok(self.groups.iter().find(|g| g.name == name).cloned())
    }

    fn names(&self) -> Result<Vec<String>, GenerationError> {
        Ok(self.groups.iter().map(|g| g.name.clone()).collect())
    }
}
