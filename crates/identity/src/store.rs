//! Capability traits for identity user stores.
//!
//! The operation surface is split into narrow capability traits that a store
//! implements simultaneously, so a consuming framework can depend on exactly
//! the slice it needs (passwords only, external logins only, …). The traits
//! form a flat hierarchy over [`UserStore`]:
//!
//! ```text
//! UserStore
//!     ├── UserLoginStore
//!     ├── UserClaimStore
//!     ├── UserRoleStore
//!     ├── UserPasswordStore
//!     ├── UserSecurityStampStore
//!     ├── UserEmailStore
//!     ├── UserPhoneStore
//!     └── UserTwoFactorStore
//! ```
//!
//! Mutator methods edit the in-memory [`ElasticUser`] only and complete
//! immediately with a fresh success value; durability always requires a
//! subsequent [`UserStore::update`] call. Lookup methods round-trip to the
//! store on every call — nothing is cached between calls.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::user::{Claim, ElasticUser, ExternalLogin, UserEmail, UserPhone};

/// Core CRUD and lookup operations for identity users.
///
/// # Write visibility
///
/// Every mutating operation forces the write to be visible to subsequent
/// reads before it returns, so a `create` followed by a `find_by_name`
/// observes the new document. This trades write throughput for
/// read-your-writes consistency.
///
/// # Absence vs. failure
///
/// Lookups return `Ok(None)` for missing users; errors are reserved for
/// invalid arguments and storage failures.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user with create-only semantics.
    ///
    /// # Errors
    ///
    /// * [`StoreError::InvalidArgument`] — the user has an empty user name
    /// * [`StoreError::AlreadyExists`] — a document with the same id exists
    ///
    /// [`StoreError::InvalidArgument`]: crate::error::StoreError::InvalidArgument
    /// [`StoreError::AlreadyExists`]: crate::error::StoreError::AlreadyExists
    async fn create(&self, user: &ElasticUser) -> StoreResult<()>;

    /// Persists a user with upsert semantics, overwriting any existing
    /// document with the same id.
    async fn update(&self, user: &ElasticUser) -> StoreResult<()>;

    /// Deletes the user's document. Deleting a user that was never persisted
    /// is not an error.
    async fn delete(&self, user: &ElasticUser) -> StoreResult<()>;

    /// Point lookup by document key. The id is normalized before the lookup.
    async fn find_by_id(&self, user_id: &str) -> StoreResult<Option<ElasticUser>>;

    /// Exact-match lookup on the user name. The name is normalized before
    /// the query, so lookups are case-insensitive.
    async fn find_by_name(&self, user_name: &str) -> StoreResult<Option<ElasticUser>>;

    /// Returns every stored user.
    ///
    /// Backed by a single unpaginated query with a large fixed size ceiling;
    /// intended for small and test datasets, not production-scale
    /// enumeration.
    async fn all(&self) -> StoreResult<Vec<ElasticUser>>;
}

/// External login management and login-based lookup.
#[async_trait]
pub trait UserLoginStore: UserStore {
    /// Adds an external login to the in-memory user. Adding an
    /// already-present `(provider, key)` pair is a no-op.
    async fn add_login(&self, user: &mut ElasticUser, login: ExternalLogin) -> StoreResult<()>;

    /// Removes every login matching the `(provider, key)` pair from the
    /// in-memory user.
    async fn remove_login(&self, user: &mut ElasticUser, login: &ExternalLogin) -> StoreResult<()>;

    /// The user's external logins.
    async fn logins(&self, user: &ElasticUser) -> StoreResult<Vec<ExternalLogin>>;

    /// Finds the user owning the given login. Both provider and key must
    /// match on the same login entry.
    async fn find_by_login(&self, login: &ExternalLogin) -> StoreResult<Option<ElasticUser>>;
}

/// Claim management.
#[async_trait]
pub trait UserClaimStore: UserStore {
    /// The user's claims.
    async fn claims(&self, user: &ElasticUser) -> StoreResult<Vec<Claim>>;

    /// Adds a claim to the in-memory user; a no-op when an equal claim is
    /// already present.
    async fn add_claim(&self, user: &mut ElasticUser, claim: Claim) -> StoreResult<()>;

    /// Removes a claim from the in-memory user; a no-op when absent.
    async fn remove_claim(&self, user: &mut ElasticUser, claim: &Claim) -> StoreResult<()>;
}

/// Role management.
#[async_trait]
pub trait UserRoleStore: UserStore {
    /// Adds the user to a role; a no-op when already a member.
    async fn add_to_role(&self, user: &mut ElasticUser, role: &str) -> StoreResult<()>;

    /// Removes the user from a role; a no-op when not a member.
    async fn remove_from_role(&self, user: &mut ElasticUser, role: &str) -> StoreResult<()>;

    /// The roles the user belongs to.
    async fn roles(&self, user: &ElasticUser) -> StoreResult<Vec<String>>;

    /// Whether the user is in the given role.
    async fn is_in_role(&self, user: &ElasticUser, role: &str) -> StoreResult<bool>;
}

/// Password hash storage. The hash is opaque to the store.
#[async_trait]
pub trait UserPasswordStore: UserStore {
    /// Sets or clears the password hash on the in-memory user.
    async fn set_password_hash(
        &self,
        user: &mut ElasticUser,
        password_hash: Option<String>,
    ) -> StoreResult<()>;

    /// The user's password hash, if any.
    async fn password_hash(&self, user: &ElasticUser) -> StoreResult<Option<String>>;

    /// Whether the user has a password hash.
    async fn has_password(&self, user: &ElasticUser) -> StoreResult<bool>;
}

/// Security stamp storage. The stamp is opaque to the store.
#[async_trait]
pub trait UserSecurityStampStore: UserStore {
    /// Sets or clears the security stamp on the in-memory user.
    async fn set_security_stamp(
        &self,
        user: &mut ElasticUser,
        stamp: Option<String>,
    ) -> StoreResult<()>;

    /// The user's security stamp, if any.
    async fn security_stamp(&self, user: &ElasticUser) -> StoreResult<Option<String>>;
}

/// Email channel management and email-based lookup.
#[async_trait]
pub trait UserEmailStore: UserStore {
    /// Sets or clears the email channel on the in-memory user.
    async fn set_email(&self, user: &mut ElasticUser, email: Option<UserEmail>) -> StoreResult<()>;

    /// The user's email channel, if any.
    async fn email(&self, user: &ElasticUser) -> StoreResult<Option<UserEmail>>;

    /// Sets the email confirmation flag.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingContactChannel`] when no email is set.
    ///
    /// [`StoreError::MissingContactChannel`]: crate::error::StoreError::MissingContactChannel
    async fn set_email_confirmed(&self, user: &mut ElasticUser, confirmed: bool)
    -> StoreResult<()>;

    /// Whether the user's email is confirmed. `false` when no email is set.
    async fn is_email_confirmed(&self, user: &ElasticUser) -> StoreResult<bool>;

    /// Exact-match lookup on the stored email address.
    async fn find_by_email(&self, address: &str) -> StoreResult<Option<ElasticUser>>;
}

/// Phone channel management.
#[async_trait]
pub trait UserPhoneStore: UserStore {
    /// Sets or clears the phone channel on the in-memory user.
    async fn set_phone(&self, user: &mut ElasticUser, phone: Option<UserPhone>) -> StoreResult<()>;

    /// The user's phone channel, if any.
    async fn phone(&self, user: &ElasticUser) -> StoreResult<Option<UserPhone>>;

    /// Sets the phone confirmation flag.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingContactChannel`] when no phone is set.
    ///
    /// [`StoreError::MissingContactChannel`]: crate::error::StoreError::MissingContactChannel
    async fn set_phone_confirmed(&self, user: &mut ElasticUser, confirmed: bool)
    -> StoreResult<()>;

    /// Whether the user's phone is confirmed. `false` when no phone is set.
    async fn is_phone_confirmed(&self, user: &ElasticUser) -> StoreResult<bool>;
}

/// Two-factor flag storage.
#[async_trait]
pub trait UserTwoFactorStore: UserStore {
    /// Enables or disables two-factor authentication on the in-memory user.
    async fn set_two_factor_enabled(&self, user: &mut ElasticUser, enabled: bool)
    -> StoreResult<()>;

    /// Whether two-factor authentication is enabled.
    async fn two_factor_enabled(&self, user: &ElasticUser) -> StoreResult<bool>;
}
