//! CLI entry point for songscan.

pub mod auth;
pub mod session;

use clap::{Parser, Subcommand};

use crate::playback::TriggerPolicy;

/// songscan CLI
#[derive(Parser, Debug)]
#[command(name = "songscan", version, about = "Scan a track link, play it on a device")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify decoded QR text
    Classify(ClassifyArgs),
    /// Credential management
    Auth(AuthArgs),
    /// Play a track link on a device once
    Play(PlayArgs),
    /// Run an interactive session driven by stdin
    Session(SessionArgs),
}

#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Decoded text
    pub text: String,
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Show the stored credential
    Status,
    /// Print the provider login link
    LoginUrl,
    /// Store the code from a login redirect and exchange it
    Capture(CaptureArgs),
    /// Refresh the access token now
    Refresh,
    /// Remove the stored credential
    Logout,
}

#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Full redirect URL, including `?code=`
    pub redirect_url: String,
}

#[derive(Parser, Debug)]
pub struct PlayArgs {
    /// Track link, e.g. https://open.spotify.com/track/<id>
    pub link: String,

    /// Target device id
    #[arg(short, long)]
    pub device: String,
}

#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Treat this device as ready from the start
    #[arg(short, long)]
    pub device: Option<String>,

    /// When play commands fire (eager, explicit)
    #[arg(short, long)]
    pub policy: Option<TriggerPolicy>,
}
