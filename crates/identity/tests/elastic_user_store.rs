//! Elasticsearch user store integration tests.
//!
//! Tests that require a running Elasticsearch instance use testcontainers to
//! spin up a real ES instance in Docker; the container is shared across the
//! whole test binary and each test gets its own uniquely named index.
//!
//! Run with: `cargo test -p elastic-identity -- es_integration`
//!
//! Skip if no Docker: `cargo test -p elastic-identity -- --skip es_integration`

use elastic_identity::{ElasticUserStore, StoreConfig, StoreError, UserStore};

// ============================================================================
// Offline tests (no ES instance required)
// ============================================================================

#[test]
fn test_store_builds_without_cluster() {
    // Client construction never connects.
    let store = ElasticUserStore::new(StoreConfig::new("http://localhost:9200"));
    assert!(store.is_ok());
}

#[test]
fn test_store_rejects_uppercase_index_name() {
    let config = StoreConfig {
        index_name: "Users".to_string(),
        ..StoreConfig::default()
    };
    assert!(matches!(
        ElasticUserStore::new(config),
        Err(StoreError::InvalidName { .. })
    ));
}

#[test]
fn test_store_is_object_safe_per_capability() {
    // A consuming framework depends on trait objects of exactly the
    // capability slice it needs.
    fn assert_traits(store: ElasticUserStore) {
        let _: Box<dyn UserStore> = Box::new(store);
    }
    let store = ElasticUserStore::new(StoreConfig::default()).unwrap();
    assert_traits(store);
}

// ============================================================================
// Integration tests (requires Docker for testcontainers)
// ============================================================================

mod es_integration {
    use std::sync::Arc;

    use elastic_identity::{
        Claim, ElasticUser, ElasticUserStore, ExternalLogin, StoreConfig, StoreError, TraceEvent,
        TraceObserver, UserEmail, UserEmailStore, UserLoginStore, UserPhone, UserStore,
    };

    use elasticsearch::Elasticsearch;
    use elasticsearch::http::transport::Transport;
    use elasticsearch::indices::IndicesExistsParts;
    use testcontainers::ImageExt;
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::elastic_search::ElasticSearch;
    use tokio::sync::OnceCell;

    /// Shared Elasticsearch container reused across all tests in this module.
    struct SharedEs {
        endpoint: String,
        /// Kept alive for the duration of the test binary; dropped at process exit.
        _container: testcontainers::ContainerAsync<ElasticSearch>,
    }

    static SHARED_ES: OnceCell<SharedEs> = OnceCell::const_new();

    async fn shared_es() -> &'static SharedEs {
        SHARED_ES
            .get_or_init(|| async {
                let container = ElasticSearch::default()
                    .with_env_var("ES_JAVA_OPTS", "-Xms256m -Xmx256m")
                    .with_startup_timeout(std::time::Duration::from_secs(120))
                    .start()
                    .await
                    .expect("Failed to start Elasticsearch container");

                let port = container
                    .get_host_port_ipv4(9200)
                    .await
                    .expect("Failed to get host port");

                let host = container.get_host().await.expect("Failed to get host");

                SharedEs {
                    endpoint: format!("http://{host}:{port}"),
                    _container: container,
                }
            })
            .await
    }

    /// A unique, charset-valid index name per test, so tests are fully
    /// isolated without needing separate containers.
    fn unique_index(prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
    }

    async fn store_for_index(index: &str) -> ElasticUserStore {
        let es = shared_es().await;
        let config = StoreConfig {
            index_name: index.to_string(),
            ..StoreConfig::new(&es.endpoint)
        };
        ElasticUserStore::connect(config)
            .await
            .expect("Failed to connect user store")
    }

    async fn create_store() -> ElasticUserStore {
        store_for_index(&unique_index("users")).await
    }

    /// Raw client for asserting on index/document state from the outside.
    async fn raw_client() -> Elasticsearch {
        let es = shared_es().await;
        let transport = Transport::single_node(&es.endpoint).expect("Failed to build transport");
        Elasticsearch::new(transport)
    }

    fn sample_user(user_name: &str) -> ElasticUser {
        let mut user = ElasticUser::new(user_name);
        user.set_password_hash(Some("hash-1".to_string()));
        user.set_security_stamp(Some("stamp-1".to_string()));
        user.set_email(Some(UserEmail {
            address: "hello@world.com".to_string(),
            is_confirmed: false,
        }));
        user.set_phone(Some(UserPhone {
            number: "555 123 1234".to_string(),
            is_confirmed: true,
        }));
        user.add_role("admin");
        user.add_claim(Claim::new("scope", "read"));
        user.add_login(ExternalLogin::new("google", "abc123"));
        user
    }

    // ========================================================================
    // Provisioning
    // ========================================================================

    #[tokio::test]
    async fn es_integration_connect_creates_index() {
        let index = unique_index("hello");
        let client = raw_client().await;

        let exists = client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index]))
            .send()
            .await
            .unwrap();
        assert_eq!(exists.status_code().as_u16(), 404, "index must not pre-exist");

        store_for_index(&index).await;

        let exists = client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index]))
            .send()
            .await
            .unwrap();
        assert!(exists.status_code().is_success(), "index must exist after connect");
    }

    #[tokio::test]
    async fn es_integration_provisioning_is_idempotent() {
        let index = unique_index("users");
        let store = store_for_index(&index).await;
        store.create(&sample_user("alice")).await.unwrap();

        // A second store against the same index must leave existing data
        // untouched (no recreate, no second create request).
        let second = store_for_index(&index).await;
        let found = second.find_by_name("alice").await.unwrap();
        assert!(found.is_some(), "existing user must survive re-provisioning");
    }

    #[tokio::test]
    async fn es_integration_force_recreate_wipes_index() {
        let index = unique_index("users");
        let store = store_for_index(&index).await;
        store.create(&sample_user("alice")).await.unwrap();

        let es = shared_es().await;
        let config = StoreConfig {
            index_name: index.clone(),
            force_recreate: true,
            ..StoreConfig::new(&es.endpoint)
        };
        let recreated = ElasticUserStore::connect(config).await.unwrap();

        let found = recreated.find_by_name("alice").await.unwrap();
        assert!(found.is_none(), "force_recreate must destroy existing users");
    }

    #[tokio::test]
    async fn es_integration_lazy_store_provisions_on_first_use() {
        let es = shared_es().await;
        let index = unique_index("lazy");
        let config = StoreConfig {
            index_name: index.clone(),
            ..StoreConfig::new(&es.endpoint)
        };

        // `new` must not touch the cluster; the first operation provisions.
        let store = ElasticUserStore::new(config).unwrap();
        let found = store.find_by_name("nobody").await.unwrap();
        assert!(found.is_none());

        let client = raw_client().await;
        let exists = client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index]))
            .send()
            .await
            .unwrap();
        assert!(exists.status_code().is_success());
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    #[tokio::test]
    async fn es_integration_create_and_find_by_name() {
        let store = create_store().await;
        let user = sample_user("icanhasjonas");

        store.create(&user).await.unwrap();

        let found = store.find_by_name("icanhasjonas").await.unwrap();
        assert_eq!(found, Some(user), "round-trip must preserve every field");
    }

    #[tokio::test]
    async fn es_integration_find_by_name_is_case_insensitive() {
        let store = create_store().await;
        let mut user = ElasticUser::new("alice");
        user.set_password_hash(Some("h1".to_string()));
        store.create(&user).await.unwrap();

        let found = store.find_by_name("ALICE").await.unwrap();
        let found = found.expect("mixed-case lookup must hit");
        assert_eq!(found.id(), "alice");
        assert_eq!(found.password_hash(), Some("h1"));
    }

    #[tokio::test]
    async fn es_integration_find_by_id() {
        let store = create_store().await;
        let user = ElasticUser::new("IcanHasJonas");
        store.create(&user).await.unwrap();

        let found = store.find_by_id(user.id()).await.unwrap();
        assert_eq!(found.as_ref().map(ElasticUser::id), Some(user.id()));

        // The id is normalized before the point lookup too.
        let found = store.find_by_id("ICANHASJONAS").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn es_integration_missing_user_is_none() {
        let store = create_store().await;

        // A 404 from the point lookup must surface as None, not an error.
        let user = store.find_by_id("missing").await.unwrap();
        assert!(user.is_none());

        let user = store.find_by_name("missing").await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn es_integration_create_existing_user_conflicts() {
        let store = create_store().await;
        let user = ElasticUser::new("alice");
        store.create(&user).await.unwrap();

        let result = store.create(&user).await;
        assert!(
            matches!(result, Err(StoreError::AlreadyExists { ref user_name }) if user_name == "alice"),
            "create-only write must report the conflict distinctly, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn es_integration_update_overwrites() {
        let store = create_store().await;
        let user = ElasticUser::new("alice");
        store.create(&user).await.unwrap();

        let mut user = store.find_by_id("alice").await.unwrap().unwrap();
        user.add_role("hello");
        user.set_password_hash(Some("h2".to_string()));
        store.update(&user).await.unwrap();

        let found = store.find_by_id("alice").await.unwrap().unwrap();
        assert!(found.has_role("hello"));
        assert_eq!(found.password_hash(), Some("h2"));
    }

    #[tokio::test]
    async fn es_integration_update_creates_when_missing() {
        let store = create_store().await;

        // Upsert semantics: update of a never-created user persists it.
        store.update(&ElasticUser::new("bob")).await.unwrap();
        assert!(store.find_by_name("bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn es_integration_delete_user() {
        let store = create_store().await;
        let user = ElasticUser::new("alice");
        store.create(&user).await.unwrap();

        store.delete(&user).await.unwrap();

        let found = store.find_by_name("alice").await.unwrap();
        assert!(found.is_none(), "deleted user must be absent, not an error");
    }

    #[tokio::test]
    async fn es_integration_delete_missing_user_is_ok() {
        let store = create_store().await;
        let result = store.delete(&ElasticUser::new("never-created")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn es_integration_document_key_is_normalized_user_name() {
        let index = unique_index("keys");
        let store = store_for_index(&index).await;
        store.create(&ElasticUser::new("ElonMusk")).await.unwrap();

        let client = raw_client().await;
        let response = client
            .get(elasticsearch::GetParts::IndexId(&index, "elonmusk"))
            .send()
            .await
            .unwrap();
        assert!(response.status_code().is_success());

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["_source"]["userName"], "elonmusk");
    }

    // ========================================================================
    // Secondary lookups
    // ========================================================================

    #[tokio::test]
    async fn es_integration_find_by_email() {
        let store = create_store().await;
        let mut user = ElasticUser::new("alice");
        user.set_email(Some(UserEmail::new("hello@world.com")));
        store.create(&user).await.unwrap();

        let found = store.find_by_email("hello@world.com").await.unwrap();
        assert_eq!(found.as_ref().map(ElasticUser::id), Some("alice"));

        let found = store.find_by_email("other@world.com").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn es_integration_find_by_login() {
        let store = create_store().await;
        let mut user = ElasticUser::new("alice");
        user.add_login(ExternalLogin::new("google", "abc123"));
        store.create(&user).await.unwrap();

        let found = store
            .find_by_login(&ExternalLogin::new("google", "abc123"))
            .await
            .unwrap();
        assert_eq!(found.as_ref().map(ElasticUser::id), Some("alice"));

        let found = store
            .find_by_login(&ExternalLogin::new("github", "abc123"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn es_integration_find_by_login_does_not_cross_match() {
        let store = create_store().await;
        let mut user = ElasticUser::new("alice");
        user.add_login(ExternalLogin::new("google", "key-1"));
        user.add_login(ExternalLogin::new("github", "key-2"));
        store.create(&user).await.unwrap();

        // Provider from one entry, key from another: must not match.
        let found = store
            .find_by_login(&ExternalLogin::new("google", "key-2"))
            .await
            .unwrap();
        assert!(found.is_none(), "provider and key must match the same login entry");
    }

    #[tokio::test]
    async fn es_integration_all_users() {
        let store = create_store().await;
        for name in ["alice", "bob", "carol"] {
            store.create(&ElasticUser::new(name)).await.unwrap();
        }

        let mut names: Vec<String> = store
            .all()
            .await
            .unwrap()
            .iter()
            .map(|u| u.id().to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    // ========================================================================
    // Collections round-trip
    // ========================================================================

    #[tokio::test]
    async fn es_integration_claims_and_roles_survive_roundtrip() {
        let store = create_store().await;
        let mut user = ElasticUser::new("alice");
        user.add_claim(Claim::new("scope", "read"));
        user.add_claim(Claim::new("scope", "write"));
        user.add_role("admin");
        user.add_role("operator");
        store.create(&user).await.unwrap();

        let found = store.find_by_id("alice").await.unwrap().unwrap();
        assert_eq!(found.claims().len(), 2);
        assert!(found.claims().contains(&Claim::new("scope", "read")));
        assert!(found.has_role("admin"));
        assert!(found.has_role("operator"));
    }

    // ========================================================================
    // Trace hook
    // ========================================================================

    #[derive(Default)]
    struct Recorder {
        events: parking_lot::Mutex<Vec<TraceEvent>>,
    }

    impl TraceObserver for Recorder {
        fn trace(&self, event: &TraceEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[tokio::test]
    async fn es_integration_trace_observer_sees_every_round_trip() {
        let store = create_store().await;
        let recorder = Arc::new(Recorder::default());
        store.attach_observer(recorder.clone());

        store.create(&ElasticUser::new("alice")).await.unwrap();
        store.find_by_name("alice").await.unwrap();

        let events = recorder.events.lock();
        let operations: Vec<&str> = events.iter().map(|e| e.operation).collect();
        assert!(operations.contains(&"create"), "got: {operations:?}");
        assert!(operations.contains(&"find_by_name"), "got: {operations:?}");

        let create = events.iter().find(|e| e.operation == "create").unwrap();
        assert!(create.url.contains("/_doc/alice"));
        assert!(create.url.contains("op_type=create"));
        assert!(create.request.as_deref().unwrap_or("").contains("alice"));
        assert!(create.response.contains("created"));

        let search = events.iter().find(|e| e.operation == "find_by_name").unwrap();
        assert!(search.url.ends_with("/_search"));
        assert!(search.request.as_deref().unwrap_or("").contains("userName"));
        assert!(!search.response.is_empty());
    }

    #[tokio::test]
    async fn es_integration_detached_observer_sees_nothing() {
        let store = create_store().await;
        let recorder = Arc::new(Recorder::default());
        store.attach_observer(recorder.clone());
        store.detach_observer();

        store.create(&ElasticUser::new("alice")).await.unwrap();
        assert!(recorder.events.lock().is_empty());
    }
}
