//! songscan CLI binary entry point.

use clap::Parser;
use songscan::cli::{auth, session, AuthCommands, Cli, Commands};
use songscan::config::SongscanConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("songscan=info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SongscanConfig::from_env();

    let result = match cli.command {
        Commands::Classify(args) => {
            session::handle_classify(&args.text);
            Ok(())
        }
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Status => auth::handle_status(&config).await,
            AuthCommands::LoginUrl => auth::handle_login_url(&config),
            AuthCommands::Capture(args) => auth::handle_capture(&config, &args.redirect_url).await,
            AuthCommands::Refresh => auth::handle_refresh(&config).await,
            AuthCommands::Logout => auth::handle_logout(&config),
        },
        Commands::Play(args) => session::handle_play(&config, &args.link, &args.device).await,
        Commands::Session(args) => session::handle_session(&config, args.device, args.policy).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
