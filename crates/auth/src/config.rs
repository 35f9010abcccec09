/// Scopes requested from the identity provider unless overridden.
pub const DEFAULT_SCOPES: [&str; 3] = ["email", "openid", "profile"];

/// Storage key the token bundle is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "fmcg-tokens";

/// Which hosted page the user is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIntent {
    Login,
    Signup,
}

impl AuthIntent {
    fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Signup => "/signup",
        }
    }
}

/// Identity-provider settings.
///
/// Required fields are constructor parameters; everything else has a default
/// and can be overridden by chaining:
///
/// ```
/// use packsight_auth::AuthConfig;
///
/// let config = AuthConfig::new(
///     "https://auth.example.com",
///     "my-client-id",
///     "https://app.example.com/callback",
/// )
/// .with_client_secret(Some("s3cret".to_string()))
/// .with_logout_uri("https://app.example.com/");
/// assert_eq!(config.client_id(), "my-client-id");
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    domain: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    logout_uri: String,
    scopes: Vec<String>,
    storage_key: String,
}

impl AuthConfig {
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let domain: String = domain.into();
        let redirect_uri: String = redirect_uri.into();
        Self {
            domain: domain.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: None,
            logout_uri: redirect_uri.clone(),
            redirect_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Set the client secret. When present the token exchange sends HTTP Basic credentials.
    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret.filter(|s| !s.is_empty());
        self
    }

    /// Set the application URI the provider returns to after logout.
    pub fn with_logout_uri(mut self, uri: impl Into<String>) -> Self {
        self.logout_uri = uri.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn logout_uri(&self) -> &str {
        &self.logout_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Hosted login or signup page for the authorization-code flow.
    pub fn authorization_url(&self, intent: AuthIntent) -> String {
        let scope = self
            .scopes
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("+");

        format!(
            "{}{}?client_id={}&response_type=code&scope={}&redirect_uri={}",
            self.domain,
            intent.path(),
            urlencoding::encode(&self.client_id),
            scope,
            urlencoding::encode(&self.redirect_uri)
        )
    }

    /// Hosted logout page; clears the provider-side session.
    pub fn logout_url(&self) -> String {
        format!(
            "{}/logout?client_id={}&logout_uri={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.logout_uri)
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.domain)
    }
}
