//! # kaito-cli
//!
//! `kubectl kaito` plugin for Kaito AI workspaces.
//!
//! Provides commands for:
//! - Interactive chat with a deployed model
//! - Inference endpoint lookup
//! - Workspace status
//!
//! # Architecture
//!
//! Commands read the Workspace custom resource and its Service through a
//! [`cluster::ClusterClient`], gate on readiness, resolve an endpoint the
//! CLI can actually reach, and then talk to the model's OpenAI-compatible
//! API over plain HTTP.
//!
//! ```text
//! ┌────────────┐   kube API    ┌──────────────────────┐
//! │            │──────────────►│ Workspace / Service  │
//! │  kaito-cli │               └──────────────────────┘
//! │            │   HTTP/JSON   ┌──────────────────────┐
//! │            │──────────────►│ /v1/chat/completions │
//! └────────────┘               └──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod cluster;
pub mod commands;
pub mod endpoint;
pub mod error;
pub mod inference;
pub mod output;
pub mod params;
pub mod readiness;
pub mod session;
pub mod workspace;

pub use cli::{Cli, Commands, Format};
pub use cluster::{ClusterClient, KubeClusterClient};
pub use endpoint::{AccessClass, Endpoint, EndpointResolver, NetworkProbe};
pub use error::CliError;
pub use inference::{ChatBackend, InferenceClient};
pub use output::OutputFormat;
pub use params::GenerationParams;
pub use session::ChatSession;
