//! etcgend Daemon Binary
//!
//! Configuration-generation daemon. Scans the configured plugin
//! directories, connects to the control plane, runs an initial full
//! generation, then serves regeneration requests until shut down.

use anyhow::Context;
use clap::Parser;
use etcgen::config::EtcgenConfig;
use etcgen::engine::{Engine, GenerationContext};
use etcgen::events::EventBus;
use etcgen::groups::TomlGroupStore;
use etcgen::index::{FileIndex, IndexHandle};
use etcgen::logging::init_logging;
use etcgen::render::builtin_registry;
use etcgen::service::{Dispatcher, ServiceFacade};
use etcgen::supervisor::{ShutdownFlag, Supervisor};
use etcgen::transport::UnixTransport;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "etcgend", about = "Configuration generation daemon")]
struct Cli {
    /// Daemon config file
    #[arg(short, long, default_value = "/usr/local/etc/etcgen.toml")]
    config: PathBuf,

    /// Root directory generated files are written under
    root: PathBuf,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("etcgend: {:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = EtcgenConfig::load(&cli.config)
        .with_context(|| format!("cannot load config {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging).context("cannot initialize logging")?;

    if !cli.root.is_dir() {
        anyhow::bail!("root directory {} does not exist", cli.root.display());
    }

    info!(root = %cli.root.display(), "etcgend starting");

    let registry = builtin_registry(config.vars.clone());
    let index = FileIndex::scan(&config.daemon.plugin_dirs, &registry.known_extensions());
    info!(files = index.len(), "initial scan complete");

    let groups = TomlGroupStore::load(&config.daemon.groups_file).with_context(|| {
        format!(
            "cannot load group table {}",
            config.daemon.groups_file.display()
        )
    })?;

    let (events, receiver) = EventBus::new_pair();
    let ctx = Arc::new(GenerationContext {
        root: cli.root,
        plugin_dirs: config.daemon.plugin_dirs.clone(),
        index: IndexHandle::new(index),
        registry,
        groups: Arc::new(groups),
        events,
    });

    let dispatcher = Dispatcher::new(ServiceFacade::new(Engine::new(ctx)));
    let transport = UnixTransport::new(config.daemon.socket.clone());
    let mut supervisor = Supervisor::new(
        Box::new(transport),
        dispatcher,
        receiver,
        ShutdownFlag::new(),
    )
    .with_ready_file(config.daemon.ready_file.clone());

    supervisor.run();
    Ok(())
}
