//! # OAuth 2.0 sign-in with PKCE
//!
//! [`OAuthClient`] drives the Authorization Code flow for every supported [`Provider`].
//!
//! 1. **[`authorize`](OAuthClient::authorize)** builds the authorization URL with the
//!    provider's scopes, a random CSRF state and a PKCE challenge. The state and
//!    verifier come back as a [`PendingLogin`], which the route keeps in the session.
//! 2. **[`exchange_code`](OAuthClient::exchange_code)** swaps the code and verifier for
//!    an access token and fetches the profile:
//!    - GitHub: `api.github.com/user`, falling back to `/user/emails` for the primary
//!      verified address when the profile hides it;
//!    - Google: `googleapis.com/oauth2/v2/userinfo`.
//!
//! The result is a [`NewUser`] ready to be upserted on `(provider, provider_id)`.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::{OAuthConfig, Provider};
use crate::config::AuthSettings;
use crate::models::NewUser;

const USER_AGENT: &str = "MindWell";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// A started login, kept in the session until the provider calls back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingLogin {
    pub provider: Provider,
    pub url: String,
    pub state: String,
    pub verifier: String,
}

pub struct OAuthClient {
    provider: Provider,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(provider: Provider, settings: &AuthSettings) -> Result<Self, String> {
        let config = OAuthConfig::for_provider(provider, settings)?;
        Ok(Self { provider, config })
    }

    fn create_client(&self) -> ConfiguredClient {
        BasicClient::new(self.config.client_id.clone())
            .set_client_secret(self.config.client_secret.clone())
            .set_auth_uri(self.config.auth_url.clone())
            .set_token_uri(self.config.token_url.clone())
            .set_redirect_uri(self.config.redirect_url.clone())
    }

    /// Generate the authorization URL with PKCE.
    pub fn authorize(&self) -> PendingLogin {
        let client = self.create_client();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in self.provider.scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (auth_url, csrf_state) = request.set_pkce_challenge(pkce_challenge).url();

        PendingLogin {
            provider: self.provider,
            url: auth_url.to_string(),
            state: csrf_state.secret().clone(),
            verifier: pkce_verifier.secret().clone(),
        }
    }

    /// Exchange an authorization code for a token and fetch the user's profile.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<NewUser, String> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| e.to_string())?;

        let token_result = self
            .create_client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| format!("Token exchange failed: {}", e))?;

        let access_token = token_result.access_token().secret();

        match self.provider {
            Provider::GitHub => fetch_github_profile(access_token).await,
            Provider::Google => fetch_google_profile(access_token).await,
        }
    }
}

async fn fetch_github_profile(access_token: &str) -> Result<NewUser, String> {
    let api_client = Client::new();

    let github_user: GitHubUser = api_client
        .get("https://api.github.com/user")
        .bearer_auth(access_token)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    let email = match github_user.email {
        Some(email) => email,
        None => {
            let emails: Vec<GitHubEmail> = api_client
                .get("https://api.github.com/user/emails")
                .bearer_auth(access_token)
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .map_err(|e| e.to_string())?
                .json()
                .await
                .map_err(|e| e.to_string())?;

            emails
                .into_iter()
                .find(|e| e.primary && e.verified)
                .map(|e| e.email)
                .ok_or("No verified primary email found")?
        }
    };

    Ok(NewUser {
        email,
        name: github_user.name.or(Some(github_user.login)),
        avatar_url: github_user.avatar_url,
        provider: Provider::GitHub.as_str().to_string(),
        provider_id: github_user.id.to_string(),
        password_hash: None,
    })
}

async fn fetch_google_profile(access_token: &str) -> Result<NewUser, String> {
    let google_user: GoogleUser = Client::new()
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    Ok(NewUser {
        email: google_user.email,
        name: google_user.name,
        avatar_url: google_user.picture,
        provider: Provider::Google.as_str().to_string(),
        provider_id: google_user.id,
        password_hash: None,
    })
}
