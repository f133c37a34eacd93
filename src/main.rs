mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use bootkit::credentials::default_store;
use bootkit::oauth::{ClientIdentity, ProviderConfig, StdinCodeSource, TokenLifecycle};
use cli::{Args, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "bootkit=debug"
    } else {
        "bootkit=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    debug!("bootkit was executed");

    match args.command {
        Commands::Token { client_id_file } => {
            let identity = ClientIdentity::from_file(&client_id_file)?;
            let lifecycle =
                TokenLifecycle::new(ProviderConfig::google_storage(), default_store()?)?;
            lifecycle.bootstrap(identity, &mut StdinCodeSource).await?;
        }
        Commands::Install {
            targets,
            target_path,
            base_url,
        } => {
            let lifecycle =
                TokenLifecycle::new(ProviderConfig::google_storage(), default_store()?)?;
            bootkit::install::install_targets(&lifecycle, &target_path, &base_url, &targets)
                .await?;
        }
        Commands::Vars { target_path } => {
            for (name, value) in bootkit::mkvars::mk_vars(&target_path) {
                println!("{} = {}", name, value);
            }
        }
        Commands::Bindeps { archive, paths } => {
            let deps = bootkit::bindeps::bin_deps(&archive, &paths)?;
            print!("{}", deps.render());
        }
    }

    Ok(())
}
