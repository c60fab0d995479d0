//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cluster::KubeSettings;
use crate::params::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

/// kubectl-kaito - manage and talk to Kaito AI workspaces.
#[derive(Parser, Debug, Clone)]
#[command(name = "kubectl-kaito", bin_name = "kubectl kaito")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the kubeconfig file.
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv). Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Cluster connection settings from the global flags.
    #[must_use]
    pub fn kube_settings(&self) -> KubeSettings {
        KubeSettings {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Output format for `get-endpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum EndpointFormat {
    /// Bare base URL.
    #[default]
    Url,
    /// JSON object with workspace metadata.
    Json,
}

impl From<EndpointFormat> for Format {
    fn from(format: EndpointFormat) -> Self {
        match format {
            EndpointFormat::Url => Self::Table,
            EndpointFormat::Json => Self::Json,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Interactive chat with a deployed model.
    ///
    /// Finds a reachable endpoint for the workspace (cluster DNS or a local
    /// port-forward) and starts a prompt. Input can also be piped in.
    Chat(ChatArgs),

    /// Print the inference endpoint of a workspace.
    GetEndpoint(GetEndpointArgs),

    /// Show workspace status.
    Status(StatusArgs),

    /// Show version information.
    Version(VersionArgs),
}

/// Workspace selection shared by `chat` and `get-endpoint`.
#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Name of the workspace.
    #[arg(long, required = true)]
    pub workspace_name: String,

    /// Kubernetes namespace. Defaults to the kubeconfig context namespace.
    #[arg(short, long, env = "KAITO_NAMESPACE")]
    pub namespace: Option<String>,

    /// Local port to probe for a port-forward (repeatable). Defaults to 8080, 8000, 3000, 5000.
    #[arg(long = "local-port", value_name = "PORT")]
    pub local_ports: Vec<u16>,
}

/// Arguments for `chat`.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Workspace to chat with.
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// System prompt for the conversation.
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Temperature for response generation (0.0-2.0).
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, allow_negative_numbers = true)]
    pub temperature: f64,

    /// Maximum tokens in a response.
    #[arg(long, default_value_t = i64::from(DEFAULT_MAX_TOKENS), allow_negative_numbers = true)]
    pub max_tokens: i64,

    /// Top-p (nucleus sampling) parameter (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_TOP_P, allow_negative_numbers = true)]
    pub top_p: f64,
}

/// Arguments for `get-endpoint`.
#[derive(Args, Debug, Clone)]
pub struct GetEndpointArgs {
    /// Workspace to look up.
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = EndpointFormat::Url)]
    pub format: EndpointFormat,

    /// Prefer the external load balancer address when there is one.
    #[arg(long)]
    pub external: bool,
}

/// Arguments for `status`.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Workspace as `name` or `workspace/name`. Lists workspaces when omitted.
    pub workspace: Option<String>,

    /// Kubernetes namespace. Defaults to the kubeconfig context namespace.
    #[arg(short, long, env = "KAITO_NAMESPACE")]
    pub namespace: Option<String>,

    /// List workspaces in all namespaces.
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

/// Arguments for `version`.
#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// Print only the version number.
    #[arg(long)]
    pub short: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults() {
        let cli = Cli::parse_from(["kubectl-kaito", "chat", "--workspace-name", "llama"]);
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.workspace.workspace_name, "llama");
        assert_eq!(args.workspace.namespace, None);
        assert!(args.workspace.local_ports.is_empty());
        assert!((args.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(args.max_tokens, 1024);
        assert!((args.top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(args.system_prompt, None);
    }

    #[test]
    fn chat_accepts_negative_values_for_validation() {
        let cli = Cli::parse_from([
            "kubectl-kaito",
            "chat",
            "--workspace-name",
            "llama",
            "--temperature",
            "-1",
            "--max-tokens",
            "-5",
        ]);
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert!((args.temperature + 1.0).abs() < f64::EPSILON);
        assert_eq!(args.max_tokens, -5);
    }

    #[test]
    fn chat_requires_workspace_name() {
        assert!(Cli::try_parse_from(["kubectl-kaito", "chat"]).is_err());
    }

    #[test]
    fn get_endpoint_flags() {
        let cli = Cli::parse_from([
            "kubectl-kaito",
            "get-endpoint",
            "--workspace-name",
            "llama",
            "-n",
            "ml",
            "--format",
            "json",
            "--external",
            "--local-port",
            "9000",
            "--local-port",
            "9001",
        ]);
        let Commands::GetEndpoint(args) = cli.command else {
            panic!("expected get-endpoint");
        };
        assert_eq!(args.workspace.namespace.as_deref(), Some("ml"));
        assert_eq!(args.format, EndpointFormat::Json);
        assert!(args.external);
        assert_eq!(args.workspace.local_ports, vec![9000, 9001]);
    }

    #[test]
    fn get_endpoint_rejects_unknown_format() {
        let result = Cli::try_parse_from([
            "kubectl-kaito",
            "get-endpoint",
            "--workspace-name",
            "llama",
            "--format",
            "yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "kubectl-kaito",
            "status",
            "--kubeconfig",
            "/tmp/kc",
            "--context",
            "aks",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let settings = cli.kube_settings();
        assert_eq!(settings.kubeconfig, Some(PathBuf::from("/tmp/kc")));
        assert_eq!(settings.context.as_deref(), Some("aks"));
    }

    #[test]
    fn status_positional_and_all_namespaces() {
        let cli = Cli::parse_from(["kubectl-kaito", "status", "workspace/llama", "-A"]);
        let Commands::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.workspace.as_deref(), Some("workspace/llama"));
        assert!(args.all_namespaces);
        assert_eq!(args.format, Format::Table);
    }

    #[test]
    fn endpoint_format_maps_to_output_format() {
        assert_eq!(Format::from(EndpointFormat::Url), Format::Table);
        assert_eq!(Format::from(EndpointFormat::Json), Format::Json);
    }
}
