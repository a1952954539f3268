//! Service Façade
//!
//! The RPC-reachable surface of the daemon: triggers full regeneration,
//! regeneration of one file/plugin/group, rescans the plugin directories,
//! and reports the managed-file index. All mutating calls run synchronously
//! on the dispatching thread before the reply is sent; there is no queuing
//! of generation requests.

use crate::engine::Engine;
use crate::error::GenerationError;
use crate::index::FileIndex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Service name for generation operations.
pub const GENERATION_SERVICE: &str = "etcgen.generation";
/// Service name for daemon management operations.
pub const MANAGEMENT_SERVICE: &str = "etcgen.management";

/// All services registered with the control plane, re-registered after
/// every successful (re)connection.
pub const SERVICE_NAMES: [&str; 2] = [GENERATION_SERVICE, MANAGEMENT_SERVICE];

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("missing or invalid argument `{0}`")]
    BadArgument(&'static str),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Operations exposed to the control plane.
pub struct ServiceFacade {
    engine: Engine,
}

impl ServiceFacade {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Rebuild the managed-file index from the configured plugin
    /// directories and atomically swap it in.
    pub fn rescan(&self) {
        let ctx = self.engine.context();
        let index = FileIndex::scan(&ctx.plugin_dirs, &ctx.registry.known_extensions());
        info!(files = index.len(), "rescan complete");
        ctx.index.replace(index);
    }

    pub fn generate_all(&self) {
        self.engine.generate_all();
    }

    pub fn generate_file(&self, name: &str) {
        self.engine.generate_file(name);
    }

    pub fn generate_plugin(&self, name: &str) {
        self.engine.generate_plugin(name);
    }

    pub fn generate_group(&self, name: &str) -> Result<(), GenerationError> {
        self.engine.generate_group(name)
    }

    pub fn list_managed_files(&self) -> BTreeMap<String, PathBuf> {
        self.engine.context().index.load().listing()
    }

    pub fn list_groups(&self) -> Result<Vec<String>, GenerationError> {
        self.engine.context().groups.names()
    }
}

/// Maps inbound `service.method` calls with JSON arguments onto the façade
/// and encodes the results for the session reply.
pub struct Dispatcher {
    facade: ServiceFacade,
}

impl Dispatcher {
    pub fn new(facade: ServiceFacade) -> Self {
        Self { facade }
    }

    pub fn facade(&self) -> &ServiceFacade {
        &self.facade
    }

    pub fn dispatch(&self, method: &str, args: &Value) -> Result<Value, DispatchError> {
        match method {
            "etcgen.generation.generate_all" => {
                self.facade.generate_all();
                Ok(Value::Null)
            }
            "etcgen.generation.generate_file" => {
                self.facade.generate_file(name_arg(args)?);
                Ok(Value::Null)
            }
            "etcgen.generation.generate_plugin" => {
                self.facade.generate_plugin(name_arg(args)?);
                Ok(Value::Null)
            }
            "etcgen.generation.generate_group" => {
                self.facade.generate_group(name_arg(args)?)?;
                Ok(Value::Null)
            }
            "etcgen.generation.list_managed_files" => {
                let listing: BTreeMap<String, String> = self
                    .facade
                    .list_managed_files()
                    .into_iter()
                    .map(|(name, path)| (name, path.to_string_lossy().into_owned()))
                    .collect();
                Ok(json!(listing))
            }
            "etcgen.generation.list_groups" => Ok(json!(self.facade.list_groups()?)),
            "etcgen.management.rescan" => {
                self.facade.rescan();
                Ok(Value::Null)
            }
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }
}

fn name_arg(args: &Value) -> Result<&str, DispatchError> {
    args.get("name")
        .and_then(Value::as_str)
        .ok_or(DispatchError::BadArgument("name"))
}
