//! Cookie-addressed sessions.

use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite as CookieSameSite, time::Duration as CookieDuration},
};
use uuid::Uuid;

use super::session_store::{SessionRecord, SessionResult, SharedSessionStore};
use crate::config::{SameSite, SessionConfig};

/// Binds session records to the session cookie.
pub struct SessionManager {
    store: SharedSessionStore,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(store: SharedSessionStore, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A fresh, unsaved record with the default lifetime.
    pub fn new_record(&self) -> SessionRecord {
        SessionRecord::new(self.config.duration_secs)
    }

    fn session_id(&self, cookies: &Cookies) -> Option<Uuid> {
        cookies
            .get(&self.config.cookie_name)
            .and_then(|c| c.value().parse::<Uuid>().ok())
    }

    /// The caller's live session, if any.
    pub async fn load(&self, cookies: &Cookies) -> SessionResult<Option<SessionRecord>> {
        match self.session_id(cookies) {
            Some(id) => self.store.load(id).await,
            None => Ok(None),
        }
    }

    /// Persist the record and (re)issue its cookie.
    pub async fn save(&self, cookies: &Cookies, record: &SessionRecord) -> SessionResult<()> {
        self.store.save(record).await?;
        cookies.add(self.build_cookie(record));
        Ok(())
    }

    /// Issue a new id for an existing record, dropping the old one.
    /// Called on login so a pre-login session id never becomes authenticated.
    pub async fn rotate(&self, record: &mut SessionRecord) -> SessionResult<()> {
        self.store.delete(record.id).await?;
        record.id = Uuid::new_v4();
        Ok(())
    }

    /// Delete the caller's session and expire the cookie.
    pub async fn destroy(&self, cookies: &Cookies) -> SessionResult<()> {
        if let Some(id) = self.session_id(cookies) {
            self.store.delete(id).await?;
        }
        cookies.add(self.build_removal_cookie());
        Ok(())
    }

    fn same_site(&self) -> CookieSameSite {
        match self.config.same_site {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        }
    }

    fn build_cookie(&self, record: &SessionRecord) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), record.id.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.config.secure)
            .same_site(self.same_site())
            .max_age(CookieDuration::seconds(record.max_age_secs as i64))
            .build()
    }

    fn build_removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.config.secure)
            .same_site(self.same_site())
            .max_age(CookieDuration::ZERO)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    use super::*;
    use crate::auth::session_store::{MemorySessionStore, SessionStore};

    fn manager() -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), SessionConfig::default());
        (manager, store)
    }

    /// The cookie jar a handler would see for a request with this `Cookie` header.
    async fn cookie_jar(cookie_header: Option<&str>) -> Cookies {
        let slot: Arc<Mutex<Option<Cookies>>> = Arc::default();
        let captured = slot.clone();
        let app = Router::new()
            .route(
                "/",
                get(move |cookies: Cookies| async move {
                    *captured.lock().unwrap() = Some(cookies);
                }),
            )
            .layer(CookieManagerLayer::new());

        let mut request = Request::builder().uri("/");
        if let Some(value) = cookie_header {
            request = request.header(axum::http::header::COOKIE, value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        slot.lock().unwrap().take().unwrap()
    }

    #[tokio::test]
    async fn test_save_sets_cookie_and_load_reads_it() {
        let (manager, _) = manager();
        let cookies = cookie_jar(None).await;
        let record = manager.new_record();

        manager.save(&cookies, &record).await.unwrap();

        let cookie = cookies.get("readgate_session").unwrap();
        assert_eq!(cookie.value(), record.id.to_string());
        assert_eq!(cookie.http_only(), Some(true));

        let loaded = manager.load(&cookies).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
    }

    #[tokio::test]
    async fn test_incoming_cookie_is_resolved() {
        let (manager, store) = manager();
        let record = manager.new_record();
        store.save(&record).await.unwrap();

        let cookies = cookie_jar(Some(&format!("readgate_session={}", record.id))).await;
        let loaded = manager.load(&cookies).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
    }

    #[tokio::test]
    async fn test_garbage_cookie_is_no_session() {
        let (manager, _) = manager();
        let cookies = cookie_jar(Some("readgate_session=not-a-uuid")).await;

        assert!(manager.load(&cookies).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_drops_old_id() {
        let (manager, store) = manager();
        let cookies = cookie_jar(None).await;
        let mut record = manager.new_record();
        manager.save(&cookies, &record).await.unwrap();
        let old_id = record.id;

        manager.rotate(&mut record).await.unwrap();
        manager.save(&cookies, &record).await.unwrap();

        assert_ne!(record.id, old_id);
        assert!(store.load(old_id).await.unwrap().is_none());
        assert!(store.load(record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_destroy_removes_record() {
        let (manager, store) = manager();
        let record = manager.new_record();
        store.save(&record).await.unwrap();
        let cookies = cookie_jar(Some(&format!("readgate_session={}", record.id))).await;

        manager.destroy(&cookies).await.unwrap();

        assert!(store.load(record.id).await.unwrap().is_none());
    }
}
