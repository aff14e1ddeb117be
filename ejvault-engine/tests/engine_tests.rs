use ejvault_crypto::FingerprintParams;
use ejvault_engine::{Document, Engine, EngineConfig, EngineError};
use ejvault_storage::{DuckDbStorage, MemoryStorage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const PUBLIC: &str = "15838c2f3260185ad2a8e1298bd507479ff2470b9e9c1fd89e0fdfefe2959f56";
const PRIVATE: &str = "37124bcf00c2d9fd87ddd596162d99c004460fd47130f2d653e45f85a0681cf0";
const OTHER_PUBLIC: &str = "f642c289deec898806d0482db64d468387b55adbbe8d278adf44f652ebd6eb0f";
const OTHER_PRIVATE: &str = "0fc1860a58f54e356d2f03174df064400c99d261695ddd78df9d2c00fcb42173";

/// "ohai" boxed for `PUBLIC`.
const OHAI: &str = "EJ[1:sdseJpJ3BpP9PO5Qs8IB4urmmYil46edSTek8SjgVGA=:zl7mkBzL4g2d0PE3hPucmfbDjf3aDK7K:iryi3H7wRGWvUI8kjfWLtP3sFiw=]";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ejvault_engine=debug"))
        .with_test_writer()
        .try_init();
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("not a mapping: {other}"),
    }
}

fn fixture_document() -> Document {
    doc(json!({
        "_public_key": PUBLIC,
        "asecret": OHAI,
        "_bsecret": "orly",
        "anumber": 1
    }))
}

async fn engine_with_fixture_key() -> Engine {
    init_tracing();
    let engine = Engine::new(Arc::new(MemoryStorage::new()), EngineConfig::test());
    engine.put_key(PUBLIC, PRIVATE).await.unwrap();
    engine
}

// ── Store and read ───────────────────────────────────────────────

#[tokio::test]
async fn store_then_read_sanitized_copy() {
    let engine = engine_with_fixture_key().await;
    let stored = engine
        .put_document("itsasecret", fixture_document())
        .await
        .unwrap();
    assert_eq!(stored, fixture_document());

    let sanitized = engine.read_decrypted("itsasecret").await.unwrap().unwrap();
    assert_eq!(
        Value::Object(sanitized.clone()),
        json!({"asecret": "ohai", "bsecret": "orly", "anumber": 1})
    );
    assert!(sanitized.keys().all(|k| !k.starts_with('_')));

    let encrypted = engine.read("itsasecret").await.unwrap().unwrap();
    assert_eq!(encrypted, fixture_document());
}

#[tokio::test]
async fn raw_json_input_is_accepted() {
    let engine = engine_with_fixture_key().await;
    let raw = serde_json::to_string(&fixture_document()).unwrap();
    engine.put_document("raw", raw).await.unwrap();
    assert!(engine.exists("raw").await.unwrap());
}

#[tokio::test]
async fn list_after_one_write() {
    let engine = engine_with_fixture_key().await;
    engine
        .put_document("itsasecret", fixture_document())
        .await
        .unwrap();

    assert_eq!(
        engine.list("").await.unwrap(),
        vec!["itsasecret", "itsasecret/", "keys/"]
    );
    assert_eq!(engine.list("itsasecret/").await.unwrap(), vec!["decrypted"]);
}

#[tokio::test]
async fn delete_removes_both_copies() {
    let engine = engine_with_fixture_key().await;
    engine.put_document("app", fixture_document()).await.unwrap();
    engine.delete("app").await.unwrap();

    assert!(engine.read("app").await.unwrap().is_none());
    assert!(engine.read_decrypted("app").await.unwrap().is_none());
    assert!(!engine.exists("app").await.unwrap());
    assert!(matches!(
        engine.read_required("app").await,
        Err(EngineError::NotFound { path }) if path == "app"
    ));

    engine.delete("app").await.unwrap();
}

#[tokio::test]
async fn unknown_recipient_writes_nothing() {
    init_tracing();
    let engine = Engine::new(Arc::new(MemoryStorage::new()), EngineConfig::test());

    let err = engine
        .put_document("app", fixture_document())
        .await
        .unwrap_err();
    match err {
        EngineError::UnknownRecipient {
            public_key,
            context,
        } => {
            assert_eq!(public_key, PUBLIC);
            assert_eq!(context, "app");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(engine.list("").await.unwrap().is_empty());
}

#[tokio::test]
async fn tampered_box_fails_decryption() {
    let engine = engine_with_fixture_key().await;
    let mut document = fixture_document();
    document.insert("asecret".into(), json!(OHAI.replace(":iryi", ":jryi")));

    assert!(matches!(
        engine.put_document("app", document).await,
        Err(EngineError::DecryptionFailed(_))
    ));
    assert!(!engine.exists("app").await.unwrap());
}

#[tokio::test]
async fn unencrypted_secret_fails_decryption() {
    let engine = engine_with_fixture_key().await;
    let document = doc(json!({"_public_key": PUBLIC, "password": "plain"}));
    assert!(matches!(
        engine.decrypt(document).await,
        Err(EngineError::DecryptionFailed(_))
    ));
}

#[tokio::test]
async fn rejects_bad_inputs() {
    let engine = engine_with_fixture_key().await;

    assert!(matches!(
        engine.put_document("app", "[1, 2]").await,
        Err(EngineError::InvalidInputFormat(_))
    ));
    assert!(matches!(
        engine.put_document("app", doc(json!({"a": OHAI}))).await,
        Err(EngineError::InvalidInputFormat(_))
    ));
    for path in ["", "keys/abc", "app/decrypted"] {
        assert!(matches!(
            engine.put_document(path, fixture_document()).await,
            Err(EngineError::InvalidInputFormat(_))
        ));
    }
}

#[tokio::test]
async fn keyring_entries_are_not_documents() {
    let engine = engine_with_fixture_key().await;
    let key_path = format!("keys/{PUBLIC}");

    assert!(matches!(
        engine.read(&key_path).await,
        Err(EngineError::InvalidInputFormat(_))
    ));
    assert!(matches!(
        engine.exists(&key_path).await,
        Err(EngineError::InvalidInputFormat(_))
    ));
}

#[tokio::test]
async fn marker_collision_is_rejected() {
    let engine = engine_with_fixture_key().await;
    let mut document = fixture_document();
    document.insert("bsecret".into(), json!(OHAI));

    assert!(matches!(
        engine.put_document("app", document).await,
        Err(EngineError::InvalidInputFormat(_))
    ));
    assert!(!engine.exists("app").await.unwrap());
}

#[tokio::test]
async fn stateless_decrypt_keeps_reserved_fields() {
    let engine = engine_with_fixture_key().await;
    let decrypted = engine.decrypt(fixture_document()).await.unwrap();
    assert_eq!(
        Value::Object(decrypted),
        json!({
            "_public_key": PUBLIC,
            "asecret": "ohai",
            "_bsecret": "orly",
            "anumber": 1
        })
    );
    assert_eq!(engine.list("").await.unwrap(), vec!["keys/"]);
}

// ── Rotation and copy ────────────────────────────────────────────

#[tokio::test]
async fn rotate_moves_document_to_new_key() {
    let engine = engine_with_fixture_key().await;
    let original = engine.decrypt(fixture_document()).await.unwrap();

    let rotation = engine.rotate(fixture_document()).await.unwrap();
    assert_eq!(rotation.old_public_key, PUBLIC);
    assert_ne!(rotation.new_public_key, PUBLIC);
    assert_eq!(
        rotation.document["_public_key"],
        json!(rotation.new_public_key)
    );
    assert_ne!(rotation.document["asecret"], json!(OHAI));

    let keys = engine.list_keys("").await.unwrap();
    assert!(keys.contains(&rotation.new_public_key));

    let mut rotated = engine.decrypt(rotation.document.clone()).await.unwrap();
    rotated.insert("_public_key".into(), json!(PUBLIC));
    assert_eq!(rotated, original);

    // The rotated document itself is never persisted.
    assert_eq!(engine.list("").await.unwrap(), vec!["keys/"]);
}

#[tokio::test]
async fn rotation_serializes_for_the_host() {
    let engine = engine_with_fixture_key().await;
    let rotation = engine.rotate(fixture_document()).await.unwrap();
    let value = serde_json::to_value(&rotation).unwrap();
    assert_eq!(value["old_public_key"], json!(PUBLIC));
    assert!(value["document"].is_object());
}

#[tokio::test]
async fn copy_reencrypts_for_existing_key() {
    let engine = engine_with_fixture_key().await;
    engine.put_key(OTHER_PUBLIC, OTHER_PRIVATE).await.unwrap();

    let copied = engine
        .copy(fixture_document(), OTHER_PUBLIC)
        .await
        .unwrap();
    assert_eq!(copied["_public_key"], json!(OTHER_PUBLIC));

    engine.delete_key(PUBLIC).await.unwrap();
    let decrypted = engine.decrypt(copied).await.unwrap();
    assert_eq!(decrypted["asecret"], json!("ohai"));
    assert_eq!(decrypted["_bsecret"], json!("orly"));
}

#[tokio::test]
async fn copy_to_unknown_key_fails_without_creating_keys() {
    let engine = engine_with_fixture_key().await;
    let err = engine
        .copy(fixture_document(), OTHER_PUBLIC)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownRecipient { ref public_key, .. } if public_key == OTHER_PUBLIC
    ));
    assert_eq!(engine.list_keys("").await.unwrap(), vec![PUBLIC.to_string()]);
}

// ── Keys and salt ────────────────────────────────────────────────

#[tokio::test]
async fn put_key_rejects_mismatched_pair() {
    let engine = engine_with_fixture_key().await;
    assert!(matches!(
        engine.put_key(OTHER_PUBLIC, PRIVATE).await,
        Err(EngineError::InvalidInputFormat(_))
    ));
    assert_eq!(engine.list_keys("").await.unwrap(), vec![PUBLIC.to_string()]);
}

#[tokio::test]
async fn create_keypair_persists_private_half() {
    let engine = engine_with_fixture_key().await;
    let public = engine.create_keypair().await.unwrap();
    assert_eq!(public.len(), 64);

    let private = engine.get_key(&public).await.unwrap().unwrap();
    let derived = ejvault_crypto::Keypair::from_private_hex(&private).unwrap();
    assert_eq!(derived.public(), public);
}

#[tokio::test]
async fn identity_uses_stored_salt() {
    let engine = engine_with_fixture_key().await;
    assert_eq!(
        engine.identity("a").await.unwrap(),
        "b2d48a097badb1a2320576f1ee1a8af172aa002a4063e26e9cfa97e1b2939d54"
    );

    engine.set_identity_salt(b"pepper").await.unwrap();
    assert_eq!(
        engine.identity("a").await.unwrap(),
        "4849da92293ea1f929be84c80d4c4df61e9ee7154aa60f7bf9da40ba13b2f8f9"
    );
    assert_eq!(engine.list_keys("").await.unwrap(), vec![PUBLIC.to_string()]);

    engine.delete_identity_salt().await.unwrap();
    assert_eq!(engine.identity_salt().await.unwrap(), b"ejson".to_vec());
}

#[tokio::test]
async fn configured_salt_sources() {
    init_tracing();
    let storage = Arc::new(MemoryStorage::new());

    let explicit = Engine::new(
        storage.clone(),
        EngineConfig::test().with_identity_salt("pepper"),
    );
    assert_eq!(
        explicit.identity("a").await.unwrap(),
        "4849da92293ea1f929be84c80d4c4df61e9ee7154aa60f7bf9da40ba13b2f8f9"
    );

    let stored = Engine::new(storage.clone(), EngineConfig::test());
    stored.set_identity_salt(b"pepper").await.unwrap();

    let mut config = EngineConfig::test();
    config.identity_salt = ejvault_engine::SaltSource::UseDefault;
    let default = Engine::new(storage, config);
    assert_eq!(
        default.identity("a").await.unwrap(),
        "b2d48a097badb1a2320576f1ee1a8af172aa002a4063e26e9cfa97e1b2939d54"
    );
}

#[tokio::test]
async fn identity_with_production_cost() {
    init_tracing();
    let engine = Engine::new(Arc::new(MemoryStorage::new()), EngineConfig::default());
    assert_eq!(
        engine.identity("a").await.unwrap(),
        "fcc648ebfb10143d55ccf1a80eb40071f94e86f4650b51d4c52cf26eba6474cc"
    );
}

#[tokio::test]
async fn invalid_fingerprint_cost_surfaces_as_hashing_failure() {
    init_tracing();
    let config = EngineConfig {
        fingerprint: FingerprintParams {
            log_n: 0,
            r: 0,
            p: 0,
            len: 0,
        },
        ..EngineConfig::test()
    };
    let engine = Engine::new(Arc::new(MemoryStorage::new()), config);
    engine.put_key(PUBLIC, PRIVATE).await.unwrap();

    assert!(matches!(
        engine.analyse(fixture_document()).await,
        Err(EngineError::HashingFailure(_))
    ));
    assert!(matches!(
        engine.identity("a").await,
        Err(EngineError::HashingFailure(_))
    ));
}

// ── Persistence ──────────────────────────────────────────────────

#[tokio::test]
async fn duckdb_backed_engine_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ejvault.duckdb");

    {
        let storage = Arc::new(DuckDbStorage::open(&db_path).unwrap());
        let engine = Engine::new(storage, EngineConfig::test());
        engine.put_key(PUBLIC, PRIVATE).await.unwrap();
        engine.put_document("app", fixture_document()).await.unwrap();
    }

    let storage = Arc::new(DuckDbStorage::open(&db_path).unwrap());
    let engine = Engine::new(storage, EngineConfig::test());
    let sanitized = engine.read_decrypted("app").await.unwrap().unwrap();
    assert_eq!(sanitized["asecret"], json!("ohai"));
    assert_eq!(
        engine.list("").await.unwrap(),
        vec!["app", "app/", "keys/"]
    );
}
