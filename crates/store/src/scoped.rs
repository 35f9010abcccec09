use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use packsight_auth::{ensure_brand_access, AuthError, Session, SessionHandle};

use crate::client::DetectionStore;
use crate::error::StoreError;
use crate::types::{AggregateStats, DetectionEvent};

/// A [`DetectionStore`] that only serves brands the current session may see.
///
/// The check happens before delegating, so a refused read issues no request.
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn DetectionStore>,
    session: SessionHandle,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn DetectionStore>, session: SessionHandle) -> Self {
        Self { inner, session }
    }

    fn current_session(&self) -> Result<Session, StoreError> {
        self.session
            .session()
            .ok_or(StoreError::Auth(AuthError::MissingToken))
    }

    fn check(session: &Session, brand: Option<&str>) -> Result<(), StoreError> {
        ensure_brand_access(session, brand).map_err(|denied| {
            debug!("Refusing read by {}: {}", session.email, denied);
            StoreError::from(denied)
        })
    }

    fn authorize(&self, brand: Option<&str>) -> Result<(), StoreError> {
        let session = self.current_session()?;
        Self::check(&session, brand)
    }

    /// Aggregate stats for whatever the session is allowed to see.
    pub async fn own_stats(&self) -> Result<AggregateStats, StoreError> {
        let session = self.authorize_own()?;
        self.inner.aggregate_stats(session.brand_scope()).await
    }

    /// The latest `limit` events the session is allowed to see.
    pub async fn own_recent_records(&self, limit: usize) -> Result<Vec<DetectionEvent>, StoreError> {
        let session = self.authorize_own()?;
        self.inner.recent_records(session.brand_scope(), limit).await
    }

    fn authorize_own(&self) -> Result<Session, StoreError> {
        let session = self.current_session()?;
        Self::check(&session, session.brand_scope())?;
        Ok(session)
    }
}

#[async_trait]
impl DetectionStore for ScopedStore {
    async fn scan(&self, brand: Option<&str>) -> Result<Vec<DetectionEvent>, StoreError> {
        self.authorize(brand)?;
        self.inner.scan(brand).await
    }

    async fn aggregate_stats(&self, brand: Option<&str>) -> Result<AggregateStats, StoreError> {
        self.authorize(brand)?;
        self.inner.aggregate_stats(brand).await
    }

    async fn recent_records(
        &self,
        brand: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DetectionEvent>, StoreError> {
        self.authorize(brand)?;
        self.inner.recent_records(brand, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use packsight_auth::{
        AuthConfig, IdTokenClaims, MemoryStorage, Role, SessionManager, TokenBundle, TokenStorage,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads and remembers the last brand asked for.
    #[derive(Default)]
    struct Recorder {
        reads: AtomicUsize,
        last_brand: std::sync::Mutex<Option<Option<String>>>,
    }

    impl Recorder {
        fn record(&self, brand: Option<&str>) {
            self.reads.fetch_add(1, Ordering::SeqCst);
            *self.last_brand.lock().unwrap() = Some(brand.map(str::to_string));
        }
    }

    #[async_trait]
    impl DetectionStore for Recorder {
        async fn scan(&self, brand: Option<&str>) -> Result<Vec<DetectionEvent>, StoreError> {
            self.record(brand);
            Ok(Vec::new())
        }

        async fn aggregate_stats(&self, brand: Option<&str>) -> Result<AggregateStats, StoreError> {
            self.record(brand);
            Ok(AggregateStats {
                total_detections: 0,
                avg_confidence: 0.0,
                recent_activity: 0,
                top_materials: Vec::new(),
                timestamp: None,
                brand: brand.map(str::to_string),
            })
        }

        async fn recent_records(
            &self,
            brand: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<DetectionEvent>, StoreError> {
            self.record(brand);
            Ok(Vec::new())
        }
    }

    fn manager_for(session: Option<Session>) -> SessionManager {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(session) = &session {
            let token = encode(
                &Header::default(),
                &IdTokenClaims::from_session(session),
                &EncodingKey::from_secret(b"k"),
            )
            .unwrap();
            let bundle = TokenBundle::new(token, Utc::now());
            storage
                .store("fmcg-tokens", &serde_json::to_string(&bundle).unwrap())
                .unwrap();
        }
        let manager = SessionManager::new(
            AuthConfig::new("https://auth.example.com", "client", "https://app.example.com/cb"),
            storage,
        );
        manager.restore_session();
        manager
    }

    fn session(role: Role, brand: &str) -> Session {
        Session {
            id: "u".into(),
            email: "someone@example.com".into(),
            brand: brand.into(),
            role,
        }
    }

    #[test]
    fn test_own_reads_use_brand_scope() {
        let recorder = Arc::new(Recorder::default());
        let manager = manager_for(Some(session(Role::Brand, "Pepsi")));
        let scoped = ScopedStore::new(recorder.clone(), manager.handle());

        tokio_test::block_on(scoped.own_stats()).unwrap();
        assert_eq!(
            *recorder.last_brand.lock().unwrap(),
            Some(Some("Pepsi".to_string()))
        );

        let admin = manager_for(Some(session(Role::Admin, "Platform Admin")));
        let scoped = ScopedStore::new(recorder.clone(), admin.handle());
        tokio_test::block_on(scoped.own_recent_records(5)).unwrap();
        assert_eq!(*recorder.last_brand.lock().unwrap(), Some(None));
        assert_eq!(recorder.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_refused_reads_never_reach_inner_store() {
        let recorder = Arc::new(Recorder::default());
        let manager = manager_for(Some(session(Role::Brand, "Pepsi")));
        let scoped = ScopedStore::new(recorder.clone(), manager.handle());

        assert!(tokio_test::block_on(scoped.scan(Some("Coca-Cola"))).is_err());
        assert!(tokio_test::block_on(scoped.recent_records(None, 10)).is_err());

        let signed_out = manager_for(None);
        let scoped = ScopedStore::new(recorder.clone(), signed_out.handle());
        assert!(matches!(
            tokio_test::block_on(scoped.own_stats()),
            Err(StoreError::Auth(AuthError::MissingToken))
        ));
        assert_eq!(recorder.reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_brand_names_match_exactly() {
        let recorder = Arc::new(Recorder::default());
        let manager = manager_for(Some(session(Role::Brand, "Pepsi")));
        let scoped = ScopedStore::new(recorder.clone(), manager.handle());

        assert!(tokio_test::block_on(scoped.aggregate_stats(Some("pepsi"))).is_err());
        assert!(tokio_test::block_on(scoped.aggregate_stats(Some("Pepsi"))).is_ok());
    }
}
