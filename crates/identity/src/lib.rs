//! Elasticsearch Identity Store
//!
//! This crate persists identity user records (credentials, claims, roles,
//! external logins, contact channels) in an Elasticsearch index and exposes
//! them through narrow, framework-friendly store traits. An authentication
//! framework can create, locate, update and delete accounts without knowing
//! anything about the storage technology.
//!
//! # Architecture
//!
//! - [`user`] — the [`ElasticUser`](user::ElasticUser) document model and
//!   user-name normalization
//! - [`store`] — the capability traits ([`UserStore`](store::UserStore) and
//!   its companions) a consuming framework programs against
//! - [`elastic`] — the Elasticsearch implementation: schema provisioning,
//!   query construction and the operation translations
//! - [`config`] — construction-time configuration
//! - [`trace`] — an optional per-request diagnostics hook
//! - [`error`] — the error taxonomy
//!
//! # Semantics in brief
//!
//! User names are folded to invariant lowercase at every write and lookup, so
//! exact-match queries never miss on case. The normalized name is also the
//! document `_id`: one document per canonical user name, enforced by the
//! store. Every write requests an immediate index refresh, trading write
//! throughput for read-your-writes behavior — callers routinely create and
//! then immediately look up.
//!
//! Missing users are `Ok(None)`, never errors. A create that collides with an
//! existing document fails with
//! [`StoreError::AlreadyExists`](error::StoreError::AlreadyExists), distinct
//! from storage failures, so callers can react differently to "taken" vs.
//! "unavailable".
//!
//! # Quick Start
//!
//! ```no_run
//! use elastic_identity::{ElasticUser, ElasticUserStore, StoreConfig, UserStore};
//!
//! # async fn example() -> elastic_identity::StoreResult<()> {
//! // Connect and provision the index on startup
//! let store = ElasticUserStore::connect(StoreConfig::new("http://localhost:9200")).await?;
//!
//! // Build a user in memory, then make it durable
//! let mut user = ElasticUser::new("Alice");
//! user.set_password_hash(Some("hashed".to_string()));
//! user.add_role("admin");
//! store.create(&user).await?;
//!
//! // Lookups are case-insensitive
//! let found = store.find_by_name("ALICE").await?;
//! assert_eq!(found.map(|u| u.id().to_string()), Some("alice".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod elastic;
pub mod error;
pub mod store;
pub mod trace;
pub mod user;

pub use config::{ElasticAuth, StoreConfig};
pub use elastic::ElasticUserStore;
pub use error::{StoreError, StoreResult};
pub use store::{
    UserClaimStore, UserEmailStore, UserLoginStore, UserPasswordStore, UserPhoneStore,
    UserRoleStore, UserSecurityStampStore, UserStore, UserTwoFactorStore,
};
pub use trace::{TraceEvent, TraceObserver};
pub use user::{Claim, ElasticUser, ExternalLogin, UserEmail, UserPhone, normalize_user_name};
