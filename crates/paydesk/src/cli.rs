//! Clap derive structures for the `paydesk` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use paydesk_core::StatusFilter;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// paydesk -- operator console for the mobile-money payments backend
#[derive(Debug, Parser)]
#[command(
    name = "paydesk",
    version,
    about = "Operate the paydesk payments backend from the command line",
    long_about = "Browse and edit countries, networks, phone numbers, and transactions,\n\
        and watch USSD agent devices come online in real time.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "PAYDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, env = "PAYDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer access token (overrides profile and keyring)
    #[arg(long, env = "PAYDESK_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PAYDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PAYDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PAYDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage countries
    Countries(CountriesArgs),

    /// Manage mobile networks (operators)
    #[command(alias = "net")]
    Networks(NetworksArgs),

    /// Browse registered phone numbers
    #[command(alias = "phone-numbers")]
    Numbers(NumbersArgs),

    /// Browse and watch USSD agent devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect and correct transactions
    #[command(alias = "tx")]
    Transactions(TransactionsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Client-side filter and sort arguments shared by every list command.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Status filter: all, active (online), inactive (offline)
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,

    /// Sort by this field (descending unless --asc)
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort ascending
    #[arg(long, requires = "sort")]
    pub asc: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COUNTRIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CountriesArgs {
    #[command(subcommand)]
    pub command: CountriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CountriesCommand {
    /// List countries
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one country
    Get {
        /// Country ID
        id: String,
    },

    /// Create a country
    Create(CountryFields),

    /// Update a country (unset flags keep their current value)
    Update {
        /// Country ID
        id: String,

        #[command(flatten)]
        fields: CountryFields,
    },
}

#[derive(Debug, Args)]
pub struct CountryFields {
    /// Display name
    #[arg(long)]
    pub nom: Option<String>,

    /// Country code (e.g. SN)
    #[arg(long)]
    pub code: Option<String>,

    /// Whether the country is active
    #[arg(long, action = clap::ArgAction::Set)]
    pub active: Option<bool>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NETWORKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NetworksArgs {
    #[command(subcommand)]
    pub command: NetworksCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetworksCommand {
    /// List networks
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only networks of this country (ID)
        #[arg(long)]
        country: Option<String>,
    },

    /// Show one network
    Get {
        /// Network ID
        id: String,
    },

    /// Create a network
    Create(NetworkFields),

    /// Update a network (unset flags keep their current value)
    Update {
        /// Network ID
        id: String,

        #[command(flatten)]
        fields: NetworkFields,
    },
}

#[derive(Debug, Args)]
pub struct NetworkFields {
    /// Display name
    #[arg(long)]
    pub nom: Option<String>,

    /// Network code
    #[arg(long)]
    pub code: Option<String>,

    /// Country ID the network belongs to
    #[arg(long)]
    pub country: Option<String>,

    /// Whether the network is active
    #[arg(long, action = clap::ArgAction::Set)]
    pub active: Option<bool>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PHONE NUMBERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NumbersArgs {
    #[command(subcommand)]
    pub command: NumbersCommand,
}

#[derive(Debug, Subcommand)]
pub enum NumbersCommand {
    /// List phone numbers
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only numbers on this network (ID)
        #[arg(long)]
        network: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices with their last known status
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show every field of one device
    Get {
        /// Device ID
        device: String,
    },

    /// Follow device status live until Ctrl-C
    Watch {
        #[command(flatten)]
        list: ListArgs,

        /// Also re-fetch the whole list every N seconds
        #[arg(long, value_name = "SECS")]
        refresh_every: Option<u64>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TRANSACTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TransactionsArgs {
    #[command(subcommand)]
    pub command: TransactionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TransactionsCommand {
    /// Show a transaction, its editable fields, and its log
    Get {
        /// Transaction UID
        uid: String,
    },

    /// Correct the editable fields of a transaction
    Update {
        /// Transaction UID
        uid: String,

        #[arg(long)]
        recipient_name: Option<String>,

        #[arg(long)]
        objet: Option<String>,

        #[arg(long)]
        external_transaction_id: Option<String>,

        #[arg(long)]
        raw_sms: Option<String>,

        #[arg(long)]
        processed_by_phone: Option<String>,
    },

    /// Show the processing log of a transaction
    Logs {
        /// Transaction UID
        uid: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets redacted)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (api_url, realtime_url, token_env, ca_cert, insecure, timeout, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an access token for the active profile in the system keyring
    SetToken,

    /// Remove the active profile's access token from the system keyring
    ClearToken,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
