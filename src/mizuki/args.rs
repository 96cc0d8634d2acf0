use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "mizuki")]
#[command(version)]
#[command(about = "edit layered game-account automation profiles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Folder holding the stored profiles
    #[arg(long, global = true, env = "MIZUKI_STORE")]
    pub store: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the reserved profiles and every account (default if no command)
    List {
        /// Only the account headers, without their settings
        #[arg(short, long)]
        brief: bool,
    },

    /// Show one profile in the editor
    Show {
        /// Profile id, base, override, or account number
        profile: String,

        /// Only the fields that differ from the base profile
        #[arg(short, long)]
        lite: bool,

        /// Print the effective settings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new account
    Add,

    /// Set a field value
    Set {
        /// Profile id, base, override, or account number
        profile: String,
        /// Field key (see `mizuki fields`)
        field: String,
        /// New value; on/off for toggles
        value: String,
    },

    /// Turn a field's override flag on or off
    Override {
        /// Profile id, base, override, or account number
        profile: String,
        /// Field key (see `mizuki fields`)
        field: String,
        /// on or off
        state: String,
    },

    /// Choose the entries of a choice field by index
    Pick {
        /// Profile id, base, override, or account number
        profile: String,
        /// Choice field key
        field: String,
        /// Indices of the chosen entries
        indices: Vec<usize>,
    },

    /// Set an account's login, prompting for the password
    Login {
        /// Profile id or account number
        profile: String,

        /// Account name
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Switch an account between the two servers
    Server {
        /// Profile id or account number
        profile: String,
    },

    /// Ask for an account's credentials to be verified
    Verify {
        /// Profile id or account number
        profile: String,
    },

    /// Replace all profiles with the contents of a JSON file
    Import {
        file: String,
    },

    /// Write all profiles to a JSON file
    Export {
        file: String,
    },

    /// List every field with its kind and default
    Fields,

    /// Explain how settings combine and how jobs are scheduled
    Guide,
}
