//! Query DSL builders for user lookups.
//!
//! All lookups are exact-match `term` clauses composed in filter context.
//! Term queries are not analyzed, so callers must pass user names already
//! normalized; the stored `userName` tokens are lowercased by the index-time
//! analyzer.

use serde_json::{Value, json};

/// Size ceiling for the unpaginated "all users" query.
pub const ALL_USERS_SIZE: usize = 1_000_000;

/// Exact-match query on the normalized `userName` field.
pub fn by_user_name(user_name: &str) -> Value {
    first_match(json!({ "term": { "userName": user_name } }))
}

/// Exact-match query on the embedded email address.
pub fn by_email(address: &str) -> Value {
    first_match(json!({ "term": { "email.address": address } }))
}

/// Query for a `(provider, key)` login pair.
///
/// `logins` is mapped as `nested`, so both terms must match on the same
/// login entry rather than across different entries of the array.
pub fn by_login(login_provider: &str, provider_key: &str) -> Value {
    first_match(json!({
        "nested": {
            "path": "logins",
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "logins.loginProvider": login_provider } },
                        { "term": { "logins.providerKey": provider_key } }
                    ]
                }
            }
        }
    }))
}

/// Match-all query used by the unbounded enumeration, capped at
/// [`ALL_USERS_SIZE`].
pub fn all_users() -> Value {
    json!({
        "query": { "match_all": {} },
        "size": ALL_USERS_SIZE,
    })
}

fn first_match(clause: Value) -> Value {
    json!({
        "query": {
            "bool": {
                "filter": [clause]
            }
        },
        "size": 1,
    })
}
