//! CLI auth command handlers.

use std::sync::Arc;

use crate::auth::login::{authorize_url, capture_authorization_code};
use crate::auth::{
    AuthError, CredentialStore, FileCredentialStore, HttpTokenService, TokenLifecycleManager,
};
use crate::config::SongscanConfig;

pub(crate) fn token_manager(
    config: &SongscanConfig,
) -> (Arc<FileCredentialStore>, TokenLifecycleManager) {
    let store = Arc::new(FileCredentialStore::new(config.store_config()));
    let service = HttpTokenService::new(&config.token_service_url)
        .with_redirect_uri(&config.redirect_uri);
    let manager = TokenLifecycleManager::new(store.clone(), Arc::new(service));
    (store, manager)
}

/// Handle `songscan auth status`.
pub async fn handle_status(config: &SongscanConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = token_manager(config);

    println!("🔐 Authentication Status\n");
    println!("  Store: {}", store.path().display());
    match store.load_credential()? {
        Some(credential) if !credential.is_stale() => println!(
            "  Token: ✅ valid until {}",
            credential.expires_at.format("%Y-%m-%d %H:%M:%S")
        ),
        Some(_) => println!("  Token: ⚠️  expired (refreshed on next use)"),
        None => println!("  Token: ❌ not logged in"),
    }
    if store.authorization_code()?.is_some() {
        println!("  Code:  ⏳ authorization code waiting for exchange");
    }

    println!("\n📌 Environment Variables:");
    for var in ["SPOTIFY_CLIENT_ID", "SONGSCAN_TOKEN_SERVICE_URL"] {
        let status = if std::env::var(var).is_ok() {
            "✅ Set"
        } else {
            "❌ Not set"
        };
        println!("  {var}: {status}");
    }
    Ok(())
}

/// Handle `songscan auth login-url`.
pub fn handle_login_url(config: &SongscanConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    println!("🔗 Visit: {}", authorize_url(config)?);
    println!("📋 Then run: songscan auth capture '<redirect url>'");
    Ok(())
}

/// Handle `songscan auth capture <REDIRECT_URL>`.
pub async fn handle_capture(
    config: &SongscanConfig,
    redirect_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, manager) = token_manager(config);
    if capture_authorization_code(store.as_ref(), redirect_url)?.is_none() {
        eprintln!("❌ Redirect URL carries no authorization code");
        std::process::exit(1);
    }
    let credential = manager.ensure_valid_credential().await?;
    manager.cancel_pending_refresh();
    println!(
        "✅ Logged in (token valid until {})",
        credential.expires_at.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

/// Handle `songscan auth refresh`.
pub async fn handle_refresh(config: &SongscanConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (_, manager) = token_manager(config);
    match manager.refresh_now().await {
        Ok(credential) => {
            manager.cancel_pending_refresh();
            println!(
                "✅ Token refreshed (valid until {})",
                credential.expires_at.format("%Y-%m-%d %H:%M:%S")
            );
            Ok(())
        }
        Err(AuthError::RefreshRejected { status }) => {
            eprintln!(
                "❌ Refresh rejected ({status}); log in again with `songscan auth login-url`"
            );
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

/// Handle `songscan auth logout`.
pub fn handle_logout(config: &SongscanConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (_, manager) = token_manager(config);
    manager.logout()?;
    println!("✅ Logged out");
    Ok(())
}
