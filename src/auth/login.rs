//! Login affordance: the provider authorize link and capture of the code the
//! provider redirects back with.

use reqwest::Url;

use super::error::AuthError;
use super::store::CredentialStore;
use crate::config::SongscanConfig;
use crate::error::SongscanError;

/// Scopes needed to drive an in-app playback device.
pub const SCOPES: &[&str] = &[
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-modify-playback-state",
];

/// Build the provider authorize URL shown behind the login button.
pub fn authorize_url(config: &SongscanConfig) -> Result<Url, SongscanError> {
    let mut url = Url::parse(&format!(
        "{}/authorize",
        config.accounts_base_url.trim_end_matches('/')
    ))
    .map_err(|e| SongscanError::Configuration(format!("invalid accounts url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &SCOPES.join(" "))
        .append_pair("redirect_uri", &config.redirect_uri);
    Ok(url)
}

/// Store the `code` carried by a login redirect so the next credential check
/// exchanges it.
///
/// Returns the captured code, or `None` when the redirect carries no code
/// (for example when the user denied access).
pub fn capture_authorization_code(
    store: &dyn CredentialStore,
    redirect_url: &str,
) -> Result<Option<String>, AuthError> {
    let url = Url::parse(redirect_url)
        .map_err(|e| AuthError::InvalidResponse(format!("invalid redirect url: {e}")))?;
    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => tracing::warn!(error = %value, "login redirect reported an error"),
            _ => {}
        }
    }
    if let Some(code) = &code {
        store.save_authorization_code(code)?;
        tracing::info!("authorization code captured");
    }
    Ok(code)
}
