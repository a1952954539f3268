//! etcgen: Configuration Generation Daemon
//!
//! A long-running daemon that discovers template sources under configured
//! plugin directories, resolves named groups of dependencies, renders each
//! dependency into a concrete configuration file under a root directory, and
//! keeps a persistent, auto-reconnecting session to a central control plane.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod groups;
pub mod index;
pub mod logging;
pub mod plugin;
pub mod render;
pub mod service;
pub mod supervisor;
pub mod transport;
