//! Session lifecycle: sign-in, restore and sign-out

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use log::{debug, error, info, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tokio::sync::watch;

use crate::config::{AuthConfig, AuthIntent};
use crate::error::{AuthError, TokenExchangeError};
use crate::session::{decode_session, Session, TokenBundle, TokenResponse};
use crate::storage::TokenStorage;

/// Owner of the token bundle and the current [`Session`].
///
/// Both are mutated only through this type. Other components get a read-only
/// [`SessionHandle`] from [`SessionManager::handle`].
pub struct SessionManager {
    config: AuthConfig,
    http_client: Client,
    storage: Arc<dyn TokenStorage>,
    bundle: Arc<RwLock<Option<TokenBundle>>>,
    session: Arc<watch::Sender<Option<Session>>>,
    commit: Mutex<()>,
}

impl SessionManager {
    pub fn new(config: AuthConfig, storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_http_client(config, storage, Client::new())
    }

    pub fn with_http_client(
        config: AuthConfig,
        storage: Arc<dyn TokenStorage>,
        http_client: Client,
    ) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            config,
            http_client,
            storage,
            bundle: Arc::new(RwLock::new(None)),
            session: Arc::new(session),
            commit: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// URL of the hosted login or signup page. The caller performs the navigation.
    pub fn authorization_url(&self, intent: AuthIntent) -> String {
        self.config.authorization_url(intent)
    }

    /// Exchange an authorization code for a token bundle and commit it.
    ///
    /// Issues exactly one request to the token endpoint. The bundle is written
    /// to storage, then the cached bundle and the published session are
    /// replaced together under one commit, so the bearer token always belongs
    /// to the current session. If the identity token cannot be decoded the
    /// manager is signed out in memory; [`SessionManager::handle_callback`]
    /// also removes such a bundle from storage.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenBundle, TokenExchangeError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id()),
            ("redirect_uri", self.config.redirect_uri()),
        ];

        let mut request = self
            .http_client
            .post(self.config.token_url())
            .form(&params);

        if let Some(secret) = self.config.client_secret() {
            let credentials = STANDARD.encode(format!("{}:{}", self.config.client_id(), secret));
            request = request.header(AUTHORIZATION, format!("Basic {}", credentials));
        }

        debug!("Exchanging authorization code at {}", self.config.token_url());
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Token exchange rejected with status {}", status);
            return Err(TokenExchangeError::NonSuccessStatus { status, body });
        }

        let body = response.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenExchangeError::MalformedResponse(e.to_string()))?;
        let bundle = token_response.into_bundle(Utc::now())?;

        self.commit_bundle(&bundle)?;
        Ok(bundle)
    }

    /// Decode the identity token of `bundle`. See [`decode_session`].
    pub fn decode_session(&self, bundle: &TokenBundle) -> Result<Session, AuthError> {
        decode_session(bundle)
    }

    /// Complete a login from the callback: exchange, decode, then publish.
    ///
    /// A bundle that cannot be decoded is removed from storage again and the
    /// manager ends up signed out.
    pub async fn handle_callback(&self, code: &str) -> Result<Session, AuthError> {
        let bundle = self.exchange_code(code).await?;

        match decode_session(&bundle) {
            Ok(session) => {
                info!("Signed in as {} ({:?}, brand {})", session.email, session.role, session.brand);
                Ok(session)
            }
            Err(e) => {
                warn!("Discarding token bundle that failed to decode: {}", e);
                self.discard_persisted();
                self.clear();
                Err(e)
            }
        }
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Never performs network I/O. Anything unreadable, undecodable or expired
    /// is removed from storage and the manager stays signed out.
    pub fn restore_session(&self) -> Option<Session> {
        match self.load_persisted() {
            Ok(Some((bundle, session))) => {
                self.install(bundle, session.clone());
                info!("Restored session for {}", session.email);
                Some(session)
            }
            Ok(None) => {
                debug!("No persisted token bundle");
                self.clear();
                None
            }
            Err(e) => {
                warn!("Discarding persisted token bundle: {}", e);
                self.discard_persisted();
                self.clear();
                None
            }
        }
    }

    /// Sign out locally and return the provider logout URL to navigate to.
    ///
    /// The in-memory session is always cleared and the URL always returned. A
    /// persisted bundle that cannot be removed is logged; the next
    /// [`SessionManager::restore_session`] would pick it up again.
    pub fn logout(&self) -> String {
        let removed = {
            let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
            let removed = self.storage.remove(self.config.storage_key());
            *self.bundle.write().unwrap_or_else(PoisonError::into_inner) = None;
            self.session.send_replace(None);
            removed
        };
        info!("Signed out");

        if let Err(e) = removed {
            error!("Failed to remove persisted token bundle: {}", e);
        }
        self.config.logout_url()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Receiver notified on every login, restore and logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.handle().bearer_token()
    }

    /// Read-only view of the session state for other components.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            bundle: Arc::clone(&self.bundle),
            session: Arc::clone(&self.session),
        }
    }

    fn load_persisted(&self) -> Result<Option<(TokenBundle, Session)>, AuthError> {
        let Some(raw) = self.storage.load(self.config.storage_key())? else {
            return Ok(None);
        };

        let bundle: TokenBundle = serde_json::from_str(&raw)
            .map_err(|e| AuthError::DecodeFailure(format!("invalid persisted bundle: {}", e)))?;
        if bundle.is_expired_at(Utc::now()) {
            return Err(AuthError::DecodeFailure("persisted bundle has expired".into()));
        }

        let session = decode_session(&bundle)?;
        Ok(Some((bundle, session)))
    }

    fn commit_bundle(&self, bundle: &TokenBundle) -> Result<(), TokenExchangeError> {
        let serialized = serde_json::to_string(bundle)
            .map_err(|e| TokenExchangeError::MalformedResponse(e.to_string()))?;
        let session = decode_session(bundle).ok();

        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.store(self.config.storage_key(), &serialized)?;
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) =
            session.as_ref().map(|_| bundle.clone());
        self.session.send_replace(session);
        Ok(())
    }

    fn install(&self, bundle: TokenBundle, session: Session) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) = Some(bundle);
        self.session.send_replace(Some(session));
    }

    fn clear(&self) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.session.send_replace(None);
    }

    fn discard_persisted(&self) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.storage.remove(self.config.storage_key()) {
            error!("Failed to remove persisted token bundle: {}", e);
        }
    }
}

/// Cheap, cloneable, read-only view of a [`SessionManager`]'s state.
#[derive(Clone)]
pub struct SessionHandle {
    bundle: Arc<RwLock<Option<TokenBundle>>>,
    session: Arc<watch::Sender<Option<Session>>>,
}

impl SessionHandle {
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Bearer credential of the current bundle, `None` when signed out.
    pub fn bearer_token(&self) -> Option<String> {
        self.bundle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|b| b.bearer().to_string())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}
