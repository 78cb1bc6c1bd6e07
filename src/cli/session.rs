//! CLI handlers for classification, one-shot play, and interactive sessions.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::auth::token_manager;
use crate::auth::login::authorize_url;
use crate::config::SongscanConfig;
use crate::device::{DeviceEvent, DeviceHandshake, DeviceId};
use crate::playback::{PlaybackClient, PlaybackCommands, TriggerPolicy};
use crate::scan::{classify, ScanFailure, ScanOutcome};
use crate::session::{Orchestrator, SessionHandle};

const SESSION_HELP: &str = "commands: scan | <decoded text> | fail <msg> | retry | again | home | play | reset | ready <id> | offline | quit";

/// Handle `songscan classify <TEXT>`.
pub fn handle_classify(text: &str) {
    match classify(text) {
        ScanOutcome::Track(track) => println!("{}", track.uri()),
        ScanOutcome::Unrecognized => println!("unrecognized"),
    }
}

/// Handle `songscan play <LINK> --device <ID>`.
pub async fn handle_play(
    config: &SongscanConfig,
    link: &str,
    device: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let ScanOutcome::Track(track) = classify(link) else {
        eprintln!("❌ Not a track link: {link}");
        std::process::exit(1);
    };
    let (_, manager) = token_manager(config);
    let credential = manager.ensure_valid_credential().await?;
    manager.cancel_pending_refresh();

    let client = PlaybackClient::new().with_base_url(&config.api_base_url);
    client
        .issue_play(&track, &DeviceId::from(device), &credential)
        .await?;
    println!("▶️  Playing {track}");
    Ok(())
}

/// Handle `songscan session`.
pub async fn handle_session(
    config: &SongscanConfig,
    device: Option<String>,
    policy: Option<TriggerPolicy>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, manager) = token_manager(config);
    if let Err(err) = manager.ensure_valid_credential().await {
        eprintln!("⚠️  Not logged in ({err}); play commands will fail.");
        if let Ok(url) = authorize_url(config) {
            eprintln!("🔗 Log in at: {url}");
        }
    }

    let handshake = DeviceHandshake::new(config.player_config());
    if let Some(id) = device {
        handshake.apply(&DeviceEvent::Ready {
            device_id: id.into(),
        });
    }

    let playback = PlaybackClient::new().with_base_url(&config.api_base_url);
    let policy = policy.unwrap_or(config.trigger_policy);
    let orchestrator = Orchestrator::new(
        Arc::new(manager.clone()),
        Arc::new(playback),
        handshake.subscribe(),
    )
    .with_policy(policy);
    let session = SessionHandle::spawn(orchestrator);

    let mut states = session.watch_state();
    let mut notices = session.subscribe_notices();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *states.borrow_and_update();
                    println!("→ {state}");
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => println!("⚠️  {notice}"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        }
    });

    println!("🎵 Session started ({policy} play). {SESSION_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => continue,
            "quit" | "exit" => break,
            "scan" => session.request_scan().await?,
            "fail" => session.scan_failed(ScanFailure::soft(rest)).await?,
            "retry" => session.retry().await?,
            "again" => session.scan_again().await?,
            "home" => session.dismiss().await?,
            "play" => session.tap_play().await?,
            "reset" => session.reset().await?,
            "ready" if !rest.is_empty() => handshake.apply(&DeviceEvent::Ready {
                device_id: rest.trim().into(),
            }),
            "offline" => {
                if let Some(id) = handshake.handle().device_id {
                    handshake.apply(&DeviceEvent::NotReady { device_id: id });
                }
            }
            "help" => println!("{SESSION_HELP}"),
            _ => session.decoded(line).await?,
        }
    }

    session.shutdown().await?;
    handshake.close();
    manager.cancel_pending_refresh();
    printer.abort();
    Ok(())
}
