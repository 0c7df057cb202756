//! The user document model.
//!
//! [`ElasticUser`] is the aggregate stored per account. Its serialized form is
//! the exact document shape persisted to Elasticsearch:
//!
//! ```json
//! {
//!   "userName": "alice",
//!   "passwordHash": "...",
//!   "securityStamp": "...",
//!   "twoFactorAuthenticationEnabled": false,
//!   "email": { "address": "alice@example.com", "isConfirmed": true },
//!   "phone": { "number": "555 123 1234", "isConfirmed": false },
//!   "roles": ["admin"],
//!   "claims": [{ "type": "scope", "value": "read" }],
//!   "logins": [{ "loginProvider": "google", "providerKey": "abc123" }]
//! }
//! ```
//!
//! The document `_id` is the normalized `userName`, so there is exactly one
//! document per canonical user name.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Normalizes a user name into its canonical lookup form.
///
/// `term` queries compare exact post-analysis tokens, so both the stored
/// `userName` and every query term are folded to invariant lowercase. This is
/// what keeps `find_by_name("ALICE")` and `find_by_name("alice")` equivalent.
pub fn normalize_user_name(user_name: &str) -> String {
    user_name.to_lowercase()
}

/// A claim attached to a user, value-equal on the `(type, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type (e.g., `"scope"`).
    #[serde(rename = "type")]
    pub claim_type: String,
    /// The claim value.
    pub value: String,
}

impl Claim {
    /// Creates a claim from its type and value.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    /// Splits the claim back into its `(type, value)` pair.
    pub fn into_pair(self) -> (String, String) {
        (self.claim_type, self.value)
    }
}

impl From<(String, String)> for Claim {
    fn from((claim_type, value): (String, String)) -> Self {
        Self { claim_type, value }
    }
}

impl From<Claim> for (String, String) {
    fn from(claim: Claim) -> Self {
        claim.into_pair()
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.value)
    }
}

/// An external login, identified by the `(provider, key)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLogin {
    /// The external provider name (e.g., `"google"`).
    pub login_provider: String,
    /// The user's key at that provider.
    pub provider_key: String,
}

impl ExternalLogin {
    /// Creates a login from its provider and key.
    pub fn new(login_provider: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            login_provider: login_provider.into(),
            provider_key: provider_key.into(),
        }
    }
}

/// An email contact channel with its confirmation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEmail {
    /// The email address.
    pub address: String,
    /// Whether the address has been confirmed.
    #[serde(default)]
    pub is_confirmed: bool,
}

impl UserEmail {
    /// Creates an unconfirmed email channel.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_confirmed: false,
        }
    }

    /// The channel value (the address).
    pub fn value(&self) -> &str {
        &self.address
    }
}

/// A phone contact channel with its confirmation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPhone {
    /// The phone number.
    pub number: String,
    /// Whether the number has been confirmed.
    #[serde(default)]
    pub is_confirmed: bool,
}

impl UserPhone {
    /// Creates an unconfirmed phone channel.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            is_confirmed: false,
        }
    }

    /// The channel value (the number).
    pub fn value(&self) -> &str {
        &self.number
    }
}

/// A stored identity user.
///
/// Constructed purely in memory; nothing is durable until the record is passed
/// to a create or update operation on the store. The user name is normalized
/// on every write — re-setting it re-normalizes — and doubles as the document
/// key, so it can never go stale relative to the id.
///
/// Claims and roles have set semantics: adding a present member or removing an
/// absent one is a no-op. `BTreeSet` keeps the serialized document stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticUser {
    user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    security_stamp: Option<String>,
    #[serde(default)]
    two_factor_authentication_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<UserEmail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<UserPhone>,
    #[serde(default)]
    roles: BTreeSet<String>,
    #[serde(default)]
    claims: BTreeSet<Claim>,
    #[serde(default)]
    logins: Vec<ExternalLogin>,
}

impl ElasticUser {
    /// Creates a user with the given (normalized) user name.
    pub fn new(user_name: &str) -> Self {
        Self {
            user_name: normalize_user_name(user_name),
            ..Self::default()
        }
    }

    /// The canonical identifier. Same value as [`ElasticUser::user_name`];
    /// also used as the document key.
    pub fn id(&self) -> &str {
        &self.user_name
    }

    /// The normalized user name.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Replaces the user name, normalizing the new value.
    pub fn set_user_name(&mut self, user_name: &str) {
        self.user_name = normalize_user_name(user_name);
    }

    /// The opaque password hash, if one is set.
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Sets or clears the password hash. The store does not interpret it.
    pub fn set_password_hash(&mut self, password_hash: Option<String>) {
        self.password_hash = password_hash;
    }

    /// The opaque security stamp, if one is set.
    pub fn security_stamp(&self) -> Option<&str> {
        self.security_stamp.as_deref()
    }

    /// Sets or clears the security stamp.
    pub fn set_security_stamp(&mut self, security_stamp: Option<String>) {
        self.security_stamp = security_stamp;
    }

    /// Whether two-factor authentication is enabled.
    pub fn two_factor_enabled(&self) -> bool {
        self.two_factor_authentication_enabled
    }

    /// Enables or disables two-factor authentication.
    pub fn set_two_factor_enabled(&mut self, enabled: bool) {
        self.two_factor_authentication_enabled = enabled;
    }

    /// The email channel, if one is set.
    pub fn email(&self) -> Option<&UserEmail> {
        self.email.as_ref()
    }

    /// Sets or clears the email channel.
    pub fn set_email(&mut self, email: Option<UserEmail>) {
        self.email = email;
    }

    /// Sets the email confirmation flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingContactChannel`] when no email is set.
    pub fn set_email_confirmed(&mut self, confirmed: bool) -> StoreResult<()> {
        match self.email.as_mut() {
            Some(email) => {
                email.is_confirmed = confirmed;
                Ok(())
            }
            None => Err(StoreError::MissingContactChannel { channel: "email" }),
        }
    }

    /// The phone channel, if one is set.
    pub fn phone(&self) -> Option<&UserPhone> {
        self.phone.as_ref()
    }

    /// Sets or clears the phone channel.
    pub fn set_phone(&mut self, phone: Option<UserPhone>) {
        self.phone = phone;
    }

    /// Sets the phone confirmation flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingContactChannel`] when no phone is set.
    pub fn set_phone_confirmed(&mut self, confirmed: bool) -> StoreResult<()> {
        match self.phone.as_mut() {
            Some(phone) => {
                phone.is_confirmed = confirmed;
                Ok(())
            }
            None => Err(StoreError::MissingContactChannel { channel: "phone" }),
        }
    }

    /// The roles the user belongs to.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Adds a role. Returns `false` when the role was already present.
    pub fn add_role(&mut self, role: &str) -> bool {
        self.roles.insert(role.to_string())
    }

    /// Removes a role. Returns `false` when the role was not present.
    pub fn remove_role(&mut self, role: &str) -> bool {
        self.roles.remove(role)
    }

    /// Whether the user is in the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// The claims attached to the user.
    pub fn claims(&self) -> &BTreeSet<Claim> {
        &self.claims
    }

    /// Adds a claim. Returns `false` when an equal claim was already present.
    pub fn add_claim(&mut self, claim: Claim) -> bool {
        self.claims.insert(claim)
    }

    /// Removes a claim. Returns `false` when no equal claim was present.
    pub fn remove_claim(&mut self, claim: &Claim) -> bool {
        self.claims.remove(claim)
    }

    /// The external logins, in insertion order.
    pub fn logins(&self) -> &[ExternalLogin] {
        &self.logins
    }

    /// Adds an external login. Adding an already-present `(provider, key)`
    /// pair is a no-op; returns `false` in that case.
    pub fn add_login(&mut self, login: ExternalLogin) -> bool {
        if self.logins.contains(&login) {
            return false;
        }
        self.logins.push(login);
        true
    }

    /// Removes every login matching the `(provider, key)` pair.
    pub fn remove_login(&mut self, login: &ExternalLogin) {
        self.logins.retain(|l| l != login);
    }
}

impl fmt::Display for ElasticUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_name)
    }
}
