//! OAuth provider configuration.

use std::fmt;
use std::str::FromStr;

use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;

/// Identity providers a user can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::GitHub => "github",
            Provider::Google => "google",
        }
    }

    fn auth_url(&self) -> &'static str {
        match self {
            Provider::GitHub => "https://github.com/login/oauth/authorize",
            Provider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    fn token_url(&self) -> &'static str {
        match self {
            Provider::GitHub => "https://github.com/login/oauth/access_token",
            Provider::Google => "https://oauth2.googleapis.com/token",
        }
    }

    pub fn scopes(&self) -> &'static [&'static str] {
        match self {
            Provider::GitHub => &["user:email", "read:user"],
            Provider::Google => &["openid", "email", "profile"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Provider::GitHub),
            "google" => Ok(Provider::Google),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// OAuth provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
}

impl OAuthConfig {
    /// Build the config for `provider`, failing when its credentials are not set.
    pub fn for_provider(provider: Provider, settings: &AuthSettings) -> Result<Self, String> {
        let (client_id, client_secret) = match provider {
            Provider::GitHub => (&settings.github_client_id, &settings.github_client_secret),
            Provider::Google => (&settings.google_client_id, &settings.google_client_secret),
        };
        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            return Err(format!("{} sign-in is not configured", provider));
        };

        let redirect_uri = format!(
            "{}/auth/{}/callback",
            settings.redirect_base.trim_end_matches('/'),
            provider
        );

        Ok(Self {
            client_id: ClientId::new(client_id.clone()),
            client_secret: ClientSecret::new(client_secret.clone()),
            auth_url: AuthUrl::new(provider.auth_url().to_string()).map_err(|e| e.to_string())?,
            token_url: TokenUrl::new(provider.token_url().to_string())
                .map_err(|e| e.to_string())?,
            redirect_url: RedirectUrl::new(redirect_uri).map_err(|e| e.to_string())?,
        })
    }
}
