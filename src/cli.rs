//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bootkit",
    about = "Personal machine bootstrap: OAuth token care, prebuilt binary installs, mk variables",
    version
)]
pub struct Args {
    /// Print more detailed logging messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interactive consent flow and store the credential
    Token {
        /// JSON file holding the OAuth client id and secret
        #[arg(long, default_value = "client_info.json")]
        client_id_file: PathBuf,
    },

    /// Download prebuilt artifacts into the target path
    Install {
        /// Artifact names to install
        #[arg(required = true)]
        targets: Vec<String>,

        /// Install binaries here
        #[arg(long, default_value = "/usr/local/bin")]
        target_path: PathBuf,

        /// Object store base hosting the artifacts
        #[arg(long, default_value = bootkit::install::DEFAULT_BASE_URL)]
        base_url: String,
    },

    /// Print mk vars
    Vars {
        /// Install path the vars point at
        #[arg(long, default_value = "/usr/local/bin")]
        target_path: PathBuf,
    },

    /// Generate archive dependency lines for tool source trees
    Bindeps {
        /// Archive root the dependency targets live under
        #[arg(long, default_value = "bindeps")]
        archive: String,

        /// Source tree paths
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
