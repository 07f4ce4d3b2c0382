use clap::{ArgAction, Parser, Subcommand};
use dockhand::config::ConfigOverrides;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Control containerized game servers from Discord slash commands")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Guild to register commands in
    #[arg(long = "guild-id", env = "DOCKHAND_GUILD_ID", global = true)]
    pub guild_id: Option<String>,

    /// Bot access token
    #[arg(long, env = "DOCKHAND_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Base container filter (comma-separated key=value pairs)
    #[arg(short, long, env = "DOCKHAND_FILTER", global = true)]
    pub filter: Option<String>,

    /// Remove registered commands on shutdown
    #[arg(long, env = "DOCKHAND_REMOVE_COMMANDS", action = ArgAction::Set, global = true)]
    pub remove_commands: Option<bool>,

    /// Hours without activity before a server is stopped
    #[arg(long, env = "DOCKHAND_AUTO_STOP_HOURS", global = true)]
    pub auto_stop_hours: Option<u32>,

    /// Seconds to wait for in-flight commands on shutdown
    #[arg(long, global = true)]
    pub shutdown_grace_secs: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to Discord and serve commands (default)
    Run,

    /// List the containers the bot would manage
    Ps {
        /// Extra filter merged onto the base filter
        #[arg(long = "with")]
        with: Option<String>,

        /// Maximum number of containers to show
        #[arg(short, long, default_value_t = 0)]
        limit: i64,
    },

    /// Print the slash command registration payload
    Schema,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            guild_id: self.guild_id.clone(),
            token: self.token.clone(),
            filter: self.filter.clone(),
            remove_commands: self.remove_commands,
            shutdown_grace_secs: self.shutdown_grace_secs,
            auto_stop_hours: self.auto_stop_hours,
        }
    }
}
