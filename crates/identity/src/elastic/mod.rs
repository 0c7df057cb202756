//! Elasticsearch-backed user store.
//!
//! [`ElasticUserStore`] implements every capability trait in [`crate::store`]
//! against a single Elasticsearch index. Each operation is one store
//! round-trip:
//!
//! - create/update → `PUT {index}/_doc/{id}` (`op_type=create` for create),
//! - delete → `DELETE {index}/_doc/{id}`,
//! - point lookup → `GET {index}/_doc/{id}`,
//! - name/email/login lookups → `term` filter searches,
//! - enumeration → `match_all` with a fixed size ceiling.
//!
//! Every write passes `refresh=true` so the change is visible to the next
//! read before the call returns.
//!
//! The index is provisioned lazily on first use through a single-flight
//! guard: concurrent first callers await the same provisioning future, and a
//! store that has provisioned once never issues a second create request. Use
//! [`ElasticUserStore::connect`] to provision eagerly at construction.
//!
//! # Example
//!
//! ```ignore
//! use elastic_identity::{ElasticUserStore, ElasticUser, StoreConfig, UserStore};
//!
//! let store = ElasticUserStore::connect(StoreConfig::new("http://localhost:9200")).await?;
//! store.create(&ElasticUser::new("Alice")).await?;
//! let alice = store.find_by_name("ALICE").await?;
//! assert!(alice.is_some());
//! ```

pub mod query;
mod schema;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::params::{OpType, Refresh};
use elasticsearch::{DeleteParts, Elasticsearch, GetParts, IndexParts, SearchParts};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::config::{ElasticAuth, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::store::{
    UserClaimStore, UserEmailStore, UserLoginStore, UserPasswordStore, UserPhoneStore,
    UserRoleStore, UserSecurityStampStore, UserStore, UserTwoFactorStore,
};
use crate::trace::{TraceObserver, TraceSlot};
use crate::user::{Claim, ElasticUser, ExternalLogin, UserEmail, UserPhone, normalize_user_name};

/// Elasticsearch-backed identity user store.
///
/// Cheap to share by reference across tasks; the only mutable state is the
/// one-shot provisioning guard and the trace-observer slot.
pub struct ElasticUserStore {
    client: Elasticsearch,
    config: StoreConfig,
    base_url: String,
    init: OnceCell<()>,
    trace: TraceSlot,
}

impl Debug for ElasticUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticUserStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ElasticUserStore {
    /// Creates a store with lazy index provisioning.
    ///
    /// This validates the configuration and builds the HTTP client but does
    /// not connect; the index is ensured on the first operation.
    ///
    /// # Errors
    ///
    /// * [`StoreError::InvalidName`] — index or entity name outside `[a-z0-9_-]+`
    /// * [`StoreError::Connection`] — unparseable endpoint or transport build failure
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let client = Self::build_client(&config)?;
        let base_url = config.endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config,
            base_url,
            init: OnceCell::new(),
            trace: TraceSlot::default(),
        })
    }

    /// Creates a store and provisions the index eagerly.
    ///
    /// With `force_recreate` set, an existing index is deleted and rebuilt
    /// before this returns.
    pub async fn connect(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config)?;
        store.ensure_ready().await?;
        Ok(store)
    }

    /// Builds the Elasticsearch client from configuration.
    fn build_client(config: &StoreConfig) -> StoreResult<Elasticsearch> {
        let url: elasticsearch::http::Url =
            config.endpoint.parse().map_err(|e| StoreError::Connection {
                endpoint: config.endpoint.clone(),
                message: format!("invalid URL: {e}"),
            })?;

        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticAuth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
            };
        }

        let transport = builder.build().map_err(|e| StoreError::Connection {
            endpoint: config.endpoint.clone(),
            message: format!("failed to build transport: {e}"),
        })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the Elasticsearch client.
    pub(crate) fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Ensures the index has been provisioned.
    ///
    /// Exactly-once per store instance: concurrent first callers await the
    /// same provisioning outcome instead of issuing duplicate create
    /// requests. A failed attempt is retried by the next caller.
    pub async fn ensure_ready(&self) -> StoreResult<()> {
        self.init
            .get_or_try_init(|| schema::ensure_index(self))
            .await?;
        Ok(())
    }

    /// Attaches a trace observer, replacing any previous one.
    pub fn attach_observer(&self, observer: Arc<dyn TraceObserver>) {
        self.trace.attach(observer);
    }

    /// Detaches the current trace observer, if any.
    pub fn detach_observer(&self) {
        self.trace.detach();
    }

    /// Serializes a request body for tracing, only when an observer is
    /// attached.
    pub(crate) fn trace_payload(&self, body: &Value) -> Option<String> {
        if self.trace.is_active() {
            Some(body.to_string())
        } else {
            None
        }
    }

    /// Reads a response to completion, emits a trace event, and returns
    /// `(status, raw body)`.
    pub(crate) async fn finish(
        &self,
        operation: &'static str,
        url: String,
        request: Option<String>,
        response: Response,
    ) -> StoreResult<(u16, String)> {
        let status = response.status_code().as_u16();
        let body = response.text().await?;
        self.trace.emit(operation, url, request, &body);
        Ok((status, body))
    }

    pub(crate) fn index_url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.config.index_name, suffix)
    }

    fn doc_url(&self, id: &str, query_string: &str) -> String {
        format!(
            "{}/{}/_doc/{}{}",
            self.base_url, self.config.index_name, id, query_string
        )
    }

    /// Writes a user document, with create-only or upsert semantics.
    async fn index_user(
        &self,
        operation: &'static str,
        user: &ElasticUser,
        create: bool,
    ) -> StoreResult<()> {
        if user.id().is_empty() {
            return Err(StoreError::InvalidArgument("user name"));
        }
        self.ensure_ready().await?;

        let id = user.id();
        let doc = serde_json::to_value(user)?;
        let request = self.trace_payload(&doc);

        let call = self
            .client
            .index(IndexParts::IndexId(&self.config.index_name, id))
            .refresh(Refresh::True);
        let call = if create {
            call.op_type(OpType::Create)
        } else {
            call
        };
        let response = call.body(doc).send().await?;

        let query_string = if create {
            "?op_type=create&refresh=true"
        } else {
            "?refresh=true"
        };
        let url = self.doc_url(id, query_string);
        let (status, body) = self.finish(operation, url, request, response).await?;

        if create && status == 409 {
            return Err(StoreError::AlreadyExists {
                user_name: id.to_string(),
            });
        }
        if !success(status) {
            return Err(StoreError::Request { status, body });
        }

        tracing::debug!(user = %user.id(), operation, "indexed user document");
        Ok(())
    }

    /// Runs a search and decodes every hit.
    async fn search(&self, operation: &'static str, body: Value) -> StoreResult<Vec<ElasticUser>> {
        self.ensure_ready().await?;

        let request = self.trace_payload(&body);
        let response = self
            .client
            .search(SearchParts::Index(&[&self.config.index_name]))
            .body(body)
            .send()
            .await?;

        let url = self.index_url("/_search");
        let (status, body) = self.finish(operation, url, request, response).await?;
        if !success(status) {
            return Err(StoreError::Request { status, body });
        }

        let parsed: Value = serde_json::from_str(&body)?;
        let hits = parsed["hits"]["hits"].as_array().cloned().unwrap_or_default();

        let mut users = Vec::with_capacity(hits.len());
        for hit in &hits {
            if let Some(source) = hit.get("_source") {
                users.push(serde_json::from_value(source.clone())?);
            }
        }
        Ok(users)
    }

    /// Runs a search and returns the first hit, if any.
    async fn search_first(
        &self,
        operation: &'static str,
        body: Value,
    ) -> StoreResult<Option<ElasticUser>> {
        Ok(self.search(operation, body).await?.into_iter().next())
    }
}

fn success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl UserStore for ElasticUserStore {
    async fn create(&self, user: &ElasticUser) -> StoreResult<()> {
        self.index_user("create", user, true).await
    }

    async fn update(&self, user: &ElasticUser) -> StoreResult<()> {
        self.index_user("update", user, false).await
    }

    async fn delete(&self, user: &ElasticUser) -> StoreResult<()> {
        if user.id().is_empty() {
            return Err(StoreError::InvalidArgument("user name"));
        }
        self.ensure_ready().await?;

        let id = user.id();
        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.config.index_name, id))
            .refresh(Refresh::True)
            .send()
            .await?;

        let url = self.doc_url(id, "?refresh=true");
        let (status, body) = self.finish("delete", url, None, response).await?;

        // Deleting a document that does not exist is not an error.
        if !success(status) && status != 404 {
            return Err(StoreError::Request { status, body });
        }

        tracing::debug!(user = %id, "deleted user document");
        Ok(())
    }

    async fn find_by_id(&self, user_id: &str) -> StoreResult<Option<ElasticUser>> {
        let id = normalize_user_name(user_id);
        if id.is_empty() {
            return Ok(None);
        }
        self.ensure_ready().await?;

        let response = self
            .client
            .get(GetParts::IndexId(&self.config.index_name, &id))
            .send()
            .await?;

        let url = self.doc_url(&id, "");
        let (status, body) = self.finish("find_by_id", url, None, response).await?;

        // A 404 point lookup means the user does not exist; never an error.
        if status == 404 {
            return Ok(None);
        }
        if !success(status) {
            return Err(StoreError::Request { status, body });
        }

        let document: Value = serde_json::from_str(&body)?;
        match document.get("_source") {
            Some(source) => Ok(Some(serde_json::from_value(source.clone())?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, user_name: &str) -> StoreResult<Option<ElasticUser>> {
        let term = normalize_user_name(user_name);
        if term.is_empty() {
            return Ok(None);
        }
        self.search_first("find_by_name", query::by_user_name(&term))
            .await
    }

    async fn all(&self) -> StoreResult<Vec<ElasticUser>> {
        self.search("all", query::all_users()).await
    }
}

#[async_trait]
impl UserLoginStore for ElasticUserStore {
    async fn add_login(&self, user: &mut ElasticUser, login: ExternalLogin) -> StoreResult<()> {
        user.add_login(login);
        Ok(())
    }

    async fn remove_login(&self, user: &mut ElasticUser, login: &ExternalLogin) -> StoreResult<()> {
        user.remove_login(login);
        Ok(())
    }

    async fn logins(&self, user: &ElasticUser) -> StoreResult<Vec<ExternalLogin>> {
        Ok(user.logins().to_vec())
    }

    async fn find_by_login(&self, login: &ExternalLogin) -> StoreResult<Option<ElasticUser>> {
        if login.login_provider.is_empty() && login.provider_key.is_empty() {
            return Ok(None);
        }
        self.search_first(
            "find_by_login",
            query::by_login(&login.login_provider, &login.provider_key),
        )
        .await
    }
}

#[async_trait]
impl UserClaimStore for ElasticUserStore {
    async fn claims(&self, user: &ElasticUser) -> StoreResult<Vec<Claim>> {
        Ok(user.claims().iter().cloned().collect())
    }

    async fn add_claim(&self, user: &mut ElasticUser, claim: Claim) -> StoreResult<()> {
        user.add_claim(claim);
        Ok(())
    }

    async fn remove_claim(&self, user: &mut ElasticUser, claim: &Claim) -> StoreResult<()> {
        user.remove_claim(claim);
        Ok(())
    }
}

#[async_trait]
impl UserRoleStore for ElasticUserStore {
    async fn add_to_role(&self, user: &mut ElasticUser, role: &str) -> StoreResult<()> {
        user.add_role(role);
        Ok(())
    }

    async fn remove_from_role(&self, user: &mut ElasticUser, role: &str) -> StoreResult<()> {
        user.remove_role(role);
        Ok(())
    }

    async fn roles(&self, user: &ElasticUser) -> StoreResult<Vec<String>> {
        Ok(user.roles().iter().cloned().collect())
    }

    async fn is_in_role(&self, user: &ElasticUser, role: &str) -> StoreResult<bool> {
        Ok(user.has_role(role))
    }
}

#[async_trait]
impl UserPasswordStore for ElasticUserStore {
    async fn set_password_hash(
        &self,
        user: &mut ElasticUser,
        password_hash: Option<String>,
    ) -> StoreResult<()> {
        user.set_password_hash(password_hash);
        Ok(())
    }

    async fn password_hash(&self, user: &ElasticUser) -> StoreResult<Option<String>> {
        Ok(user.password_hash().map(String::from))
    }

    async fn has_password(&self, user: &ElasticUser) -> StoreResult<bool> {
        Ok(user.password_hash().is_some())
    }
}

#[async_trait]
impl UserSecurityStampStore for ElasticUserStore {
    async fn set_security_stamp(
        &self,
        user: &mut ElasticUser,
        stamp: Option<String>,
    ) -> StoreResult<()> {
        user.set_security_stamp(stamp);
        Ok(())
    }

    async fn security_stamp(&self, user: &ElasticUser) -> StoreResult<Option<String>> {
        Ok(user.security_stamp().map(String::from))
    }
}

#[async_trait]
impl UserEmailStore for ElasticUserStore {
    async fn set_email(&self, user: &mut ElasticUser, email: Option<UserEmail>) -> StoreResult<()> {
        user.set_email(email);
        Ok(())
    }

    async fn email(&self, user: &ElasticUser) -> StoreResult<Option<UserEmail>> {
        Ok(user.email().cloned())
    }

    async fn set_email_confirmed(
        &self,
        user: &mut ElasticUser,
        confirmed: bool,
    ) -> StoreResult<()> {
        user.set_email_confirmed(confirmed)
    }

    async fn is_email_confirmed(&self, user: &ElasticUser) -> StoreResult<bool> {
        Ok(user.email().is_some_and(|email| email.is_confirmed))
    }

    async fn find_by_email(&self, address: &str) -> StoreResult<Option<ElasticUser>> {
        if address.is_empty() {
            return Ok(None);
        }
        self.search_first("find_by_email", query::by_email(address))
            .await
    }
}

#[async_trait]
impl UserPhoneStore for ElasticUserStore {
    async fn set_phone(&self, user: &mut ElasticUser, phone: Option<UserPhone>) -> StoreResult<()> {
        user.set_phone(phone);
        Ok(())
    }

    async fn phone(&self, user: &ElasticUser) -> StoreResult<Option<UserPhone>> {
        Ok(user.phone().cloned())
    }

    async fn set_phone_confirmed(
        &self,
        user: &mut ElasticUser,
        confirmed: bool,
    ) -> StoreResult<()> {
        user.set_phone_confirmed(confirmed)
    }

    async fn is_phone_confirmed(&self, user: &ElasticUser) -> StoreResult<bool> {
        Ok(user.phone().is_some_and(|phone| phone.is_confirmed))
    }
}

#[async_trait]
impl UserTwoFactorStore for ElasticUserStore {
    async fn set_two_factor_enabled(
        &self,
        user: &mut ElasticUser,
        enabled: bool,
    ) -> StoreResult<()> {
        user.set_two_factor_enabled(enabled);
        Ok(())
    }

    async fn two_factor_enabled(&self, user: &ElasticUser) -> StoreResult<bool> {
        Ok(user.two_factor_enabled())
    }
}
