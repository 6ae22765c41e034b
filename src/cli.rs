use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "anosunu")]
#[command(version)]
#[command(about = "Terminal client for the Anosunu anonymous social network")]
pub struct Args {
    /// Path to a TOML config file (defaults to $ANOSUNU_CONFIG, then ~/.config/anosunu/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        pseudo: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// List topics
    Topics,
    /// Finish onboarding by choosing topics
    Onboard {
        #[arg(required = true)]
        topic_ids: Vec<u64>,
    },
    /// List posts of the feed
    Posts {
        #[arg(long)]
        topic: Option<u64>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Publish an anonymous post
    Post {
        content: String,
        #[arg(long)]
        topic: Option<u64>,
    },
    /// Show the comments of a post
    Comments { post_id: u64 },
    /// Comment on a post
    Comment { post_id: u64, content: String },
    /// Like or unlike a post
    Like { post_id: u64 },
    /// List black room types and subscriptions
    RoomTypes,
    /// Subscribe to a black room type (may require a payment)
    Subscribe { type_id: u64 },
    /// Create a private black room (may require a payment)
    CreateRoom {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "2")]
        min: u32,
        #[arg(long, default_value = "10")]
        max: u32,
        /// Lifetime in minutes
        #[arg(long, default_value = "60")]
        duration: u32,
    },
    /// List the black rooms you belong to
    MyRooms,
    /// Join a black room with its 6-character access code
    Join {
        code: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Moderation dashboards
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Users {
        #[command(subcommand)]
        action: Option<UserAction>,
    },
    Posts {
        #[command(subcommand)]
        action: Option<ModerationAction>,
    },
    Topics {
        #[command(subcommand)]
        action: Option<TopicAction>,
    },
    Payments {
        #[command(subcommand)]
        action: Option<PaymentAction>,
    },
    Moderators {
        #[command(subcommand)]
        action: Option<ModeratorAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Block { id: u64 },
    Unblock { id: u64 },
    Delete { id: u64 },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve { id: u64 },
    Reject { id: u64 },
    Delete { id: u64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TopicAction {
    Create { name: String },
    Delete { id: u64 },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Approve { id: u64 },
    Reject { id: u64 },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeratorAction {
    Approve { id: u64 },
    Reject { id: u64 },
    Revoke { id: u64 },
}

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "anosunu=debug"
    } else {
        "anosunu=info"
    }
}
