//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use endorse_application::{
    CallRequest, ChannelConfigRequest, ChannelJoinRequest, DeployRequest,
};
use endorse_domain::VersionGranularity;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output format for operation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// The raw `{success, message, output}` object
    Json,
}

/// CLI arguments for endorse
#[derive(Parser, Debug)]
#[command(name = "endorse")]
#[command(author, version, about = "Deploy and call units on a multi-organization ledger")]
#[command(long_about = r#"
endorse coordinates changes to a replicated ledger operated by several
organizations.

A deploy computes the next version from what the primary organization has
installed, installs it on every organization's peers (retrying each
organization a bounded number of times), then instantiates or upgrades it
once on the channel. Submits and evaluates send a call to the endorsing
peers and only accept results the peers agree on.

Configuration files are loaded from (in priority order):
1. ENDORSE_* environment variables
2. --config <path>     Explicit config file
3. ./endorse.toml      Project-level config
4. ~/.config/endorse/config.toml   Global config

Example:
  endorse deploy kv --channel main
  endorse submit kv put color blue --channel main
  endorse evaluate kv get color --channel main
  endorse call query '{"unit":"kv","channel":"main","function":"ping"}'
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the next version everywhere, then instantiate or upgrade it
    Deploy(DeployArgs),

    /// Endorse a call, then commit it through the ordering service
    #[command(alias = "invoke")]
    Submit(CallArgs),

    /// Evaluate a read-only call without committing
    #[command(alias = "query")]
    Evaluate(CallArgs),

    /// Show the latest installed version of a unit
    LatestVersion {
        unit: String,
        /// Organization to ask (defaults to the primary organization)
        #[arg(long = "org", value_name = "ORG")]
        organization: Option<String>,
    },

    /// List the units installed on an organization's peers
    Installed {
        #[arg(long = "org", value_name = "ORG")]
        organization: Option<String>,
    },

    /// Channel administration
    #[command(subcommand)]
    Channel(ChannelCommand),

    /// Run an operation by name with a JSON request body
    Call {
        /// Operation name (deploy, submit, evaluate, latest-version, installed,
        /// channel-create, channel-update, channel-join, install, invoke, query)
        operation: String,
        /// JSON request body; `@path` reads it from a file
        body: Option<String>,
    },

    /// Show configuration file locations and the effective configuration
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Unit to deploy, as named under [contracts]
    pub unit: String,

    /// Arguments for the init function
    pub args: Vec<String>,

    #[arg(short, long)]
    pub channel: String,

    /// Organizations to install on (repeatable, defaults to all)
    #[arg(long = "org", value_name = "ORG")]
    pub organizations: Vec<String>,

    /// Function run on instantiate or upgrade
    #[arg(long, default_value = "init")]
    pub function: String,

    /// Version component to bump on upgrade (major, minor, revision)
    #[arg(short, long)]
    pub granularity: Option<VersionGranularity>,

    /// Private data as KEY=VALUE (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub transient: Vec<(String, String)>,

    /// Pre-built package to install instead of packaging the code location
    #[arg(long, value_name = "PATH")]
    pub package: Option<PathBuf>,
}

impl DeployArgs {
    /// Request body for the controller; the package is attached by the caller.
    pub fn to_request(&self) -> DeployRequest {
        DeployRequest {
            unit: self.unit.clone(),
            channel: self.channel.clone(),
            organizations: self.organizations.clone(),
            function: self.function.clone(),
            args: self.args.iter().map(|a| parse_call_arg(a)).collect(),
            granularity: self.granularity,
            transient: self.transient.iter().cloned().collect(),
            package: None,
        }
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Target unit
    pub unit: String,

    /// Function to call
    pub function: String,

    /// Call arguments; JSON objects and arrays are passed as JSON
    pub args: Vec<String>,

    #[arg(short, long)]
    pub channel: String,

    /// Organization whose client sends the call
    #[arg(long = "org", value_name = "ORG")]
    pub organization: Option<String>,

    /// Private data as KEY=VALUE (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub transient: Vec<(String, String)>,

    /// Send the call to one peer instead of the usual targets
    #[arg(long)]
    pub single_peer: bool,
}

impl CallArgs {
    pub fn to_request(&self) -> CallRequest {
        CallRequest {
            unit: self.unit.clone(),
            channel: self.channel.clone(),
            function: self.function.clone(),
            args: self.args.iter().map(|a| parse_call_arg(a)).collect(),
            transient: self.transient.iter().cloned().collect::<BTreeMap<_, _>>(),
            organization: self.organization.clone(),
            single_peer: self.single_peer,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ChannelCommand {
    /// Create a channel from a configuration envelope
    Create(ChannelConfigArgs),
    /// Update a channel's configuration
    Update(ChannelConfigArgs),
    /// Join an organization's peers to a channel
    Join {
        channel: String,
        #[arg(long = "org", value_name = "ORG")]
        organization: Option<String>,
    },
}

impl ChannelCommand {
    pub fn join_request(channel: &str, organization: Option<&str>) -> ChannelJoinRequest {
        ChannelJoinRequest {
            channel: channel.to_string(),
            organization: organization.map(str::to_string),
        }
    }
}

#[derive(Args, Debug)]
pub struct ChannelConfigArgs {
    pub channel: String,

    /// File holding the configuration envelope
    #[arg(short, long, value_name = "PATH")]
    pub envelope: PathBuf,

    /// Organization that signs first and submits the request
    #[arg(long = "org", value_name = "ORG")]
    pub organization: Option<String>,
}

impl ChannelConfigArgs {
    /// Request body with the envelope contents already read.
    pub fn to_request(&self, envelope: String) -> ChannelConfigRequest {
        ChannelConfigRequest {
            channel: self.channel.clone(),
            envelope,
            organization: self.organization.clone(),
        }
    }
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Command-line call argument: JSON objects and arrays stay structured,
/// everything else is passed through as a string.
pub fn parse_call_arg(arg: &str) -> Value {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(arg) {
            return value;
        }
    }
    Value::String(arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("secret=a=b").unwrap(),
            ("secret".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_call_arg() {
        assert_eq!(parse_call_arg("blue"), json!("blue"));
        assert_eq!(parse_call_arg("42"), json!("42"));
        assert_eq!(parse_call_arg(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_call_arg("[1,2]"), json!([1, 2]));
        assert_eq!(parse_call_arg("{broken"), json!("{broken"));
    }

    #[test]
    fn test_parse_submit_command() {
        let cli = Cli::try_parse_from([
            "endorse",
            "submit",
            "kv",
            "put",
            "color",
            "blue",
            "--channel",
            "main",
            "--transient",
            "k=v",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Submit(call) = cli.command else {
            panic!("expected submit");
        };
        let request = call.to_request();
        assert_eq!(request.function, "put");
        assert_eq!(request.args, vec![json!("color"), json!("blue")]);
        assert_eq!(request.transient["k"], "v");
        assert!(!request.single_peer);
    }

    #[test]
    fn test_invoke_and_query_aliases() {
        let cli =
            Cli::try_parse_from(["endorse", "invoke", "kv", "ping", "-c", "main"]).unwrap();
        assert!(matches!(cli.command, Command::Submit(_)));
        let cli = Cli::try_parse_from(["endorse", "query", "kv", "ping", "-c", "main"]).unwrap();
        assert!(matches!(cli.command, Command::Evaluate(_)));
    }

    #[test]
    fn test_parse_deploy_command() {
        let cli = Cli::try_parse_from([
            "endorse", "deploy", "kv", "a", "1", "-c", "main", "--org", "org1", "--org",
            "org2", "-g", "major",
        ])
        .unwrap();
        let Command::Deploy(deploy) = cli.command else {
            panic!("expected deploy");
        };
        let request = deploy.to_request();
        assert_eq!(request.organizations, vec!["org1", "org2"]);
        assert_eq!(request.granularity, Some(VersionGranularity::Major));
        assert_eq!(request.function, "init");
        assert_eq!(request.args.len(), 2);
    }

    #[test]
    fn test_parse_channel_commands() {
        let cli = Cli::try_parse_from([
            "endorse", "channel", "create", "main", "--envelope", "main.json",
        ])
        .unwrap();
        let Command::Channel(ChannelCommand::Create(args)) = cli.command else {
            panic!("expected channel create");
        };
        let request = args.to_request("{}".to_string());
        assert_eq!(request.channel, "main");
        assert_eq!(request.organization, None);

        let cli =
            Cli::try_parse_from(["endorse", "channel", "join", "main", "--org", "org2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Channel(ChannelCommand::Join { .. })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["endorse", "installed", "--output", "json", "-q"]).unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.quiet);
    }
}
