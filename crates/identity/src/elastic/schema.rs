//! Index schema and provisioning.
//!
//! The mapping makes every lookup field an exact-match (`keyword`) field,
//! with one exception: `userName` is analyzed with a custom
//! `lowercase_keyword` analyzer (keyword tokenizer + lowercase filter) that
//! turns the whole field into a single case-insensitive token. Together with
//! lookup-side normalization this is what makes user name queries
//! case-insensitive while staying plain `term` filters.
//!
//! `logins` is mapped as `nested` so provider and key must co-occur in the
//! same login entry when queried.

use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use serde_json::{Value, json};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

use super::ElasticUserStore;

/// Builds the index body (settings + mappings) for the user index.
///
/// Typeless Elasticsearch has no mapping types and no `_id` path mapping, so
/// the configured entity name is recorded as `_meta.entity` and the document
/// `_id` is set explicitly to the normalized user name on every write.
pub(crate) fn index_body(config: &StoreConfig) -> Value {
    json!({
        "settings": {
            "analysis": {
                "analyzer": {
                    "lowercase_keyword": {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": ["lowercase"]
                    }
                }
            }
        },
        "mappings": {
            "_meta": { "entity": config.entity_name },
            "properties": {
                "userName": { "type": "text", "analyzer": "lowercase_keyword" },
                "passwordHash": { "type": "keyword" },
                "securityStamp": { "type": "keyword" },
                "twoFactorAuthenticationEnabled": { "type": "boolean" },
                "roles": { "type": "keyword" },
                "claims": {
                    "properties": {
                        "type": { "type": "keyword" },
                        "value": { "type": "keyword" }
                    }
                },
                "logins": {
                    "type": "nested",
                    "properties": {
                        "loginProvider": { "type": "keyword" },
                        "providerKey": { "type": "keyword" }
                    }
                },
                "email": {
                    "properties": {
                        "address": { "type": "keyword" },
                        "isConfirmed": { "type": "boolean" }
                    }
                },
                "phone": {
                    "properties": {
                        "number": { "type": "keyword" },
                        "isConfirmed": { "type": "boolean" }
                    }
                }
            }
        }
    })
}

/// Ensures the user index exists with the expected mapping.
///
/// With `force_recreate` the index is deleted first (ignoring absence).
/// When the index already exists this is a no-op — no second create request
/// is issued.
pub(crate) async fn ensure_index(store: &ElasticUserStore) -> StoreResult<()> {
    let config = store.config();
    let index = config.index_name.as_str();

    if config.force_recreate {
        delete_index(store).await?;
    }

    let response = store
        .client()
        .indices()
        .exists(IndicesExistsParts::Index(&[index]))
        .send()
        .await?;
    let (status, _body) = store
        .finish("index_exists", store.index_url(""), None, response)
        .await?;

    if status_is_success(status) {
        tracing::debug!(index, "user index already exists");
        return Ok(());
    }

    let body = index_body(config);
    let request = store.trace_payload(&body);
    let response = store
        .client()
        .indices()
        .create(IndicesCreateParts::Index(index))
        .body(body)
        .send()
        .await?;
    let (status, body) = store
        .finish("create_index", store.index_url(""), request, response)
        .await?;

    if !status_is_success(status) {
        // Another instance won a concurrent first-use race; the index exists.
        if body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        return Err(StoreError::Provisioning {
            index: index.to_string(),
            status,
            body,
        });
    }

    tracing::info!(index, entity = %config.entity_name, "created user index");
    Ok(())
}

/// Deletes the user index, ignoring absence.
pub(crate) async fn delete_index(store: &ElasticUserStore) -> StoreResult<()> {
    let index = store.config().index_name.as_str();

    let response = store
        .client()
        .indices()
        .delete(IndicesDeleteParts::Index(&[index]))
        .send()
        .await?;
    let (status, body) = store
        .finish("delete_index", store.index_url(""), None, response)
        .await?;

    if !status_is_success(status) && !body.contains("index_not_found_exception") {
        return Err(StoreError::Provisioning {
            index: index.to_string(),
            status,
            body,
        });
    }

    tracing::debug!(index, "deleted user index");
    Ok(())
}

fn status_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
