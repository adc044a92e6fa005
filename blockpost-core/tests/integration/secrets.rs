use crate::fixtures::*;
use blockpost_core::foundation::OperatorError;
use blockpost_core::infrastructure::keys::{EnvSecretStore, FileSecretStore, OperatorIdentity};

fn env_store(key: &str, value: String) -> EnvSecretStore {
    EnvSecretStore::from_vars(vec![(key.to_string(), value)])
}

#[tokio::test]
async fn identity_loads_from_every_env_encoding() {
    let hex_body = DEV_PRIVATE_KEY.trim_start_matches("0x");
    for value in [DEV_PRIVATE_KEY.to_string(), hex_body.to_string(), format!("hex:{}", hex_body)] {
        let store = env_store("BLOCKPOST_SECRET__operator__private_key", value);
        let identity = OperatorIdentity::load(&store).await.expect("identity");
        assert_eq!(identity.address(), DEV_ADDRESS);
    }

    let legacy = env_store("PRIVATE_KEY", DEV_PRIVATE_KEY.to_string());
    assert_eq!(OperatorIdentity::load(&legacy).await.expect("legacy identity").address(), DEV_ADDRESS);
}

#[tokio::test]
async fn missing_or_garbage_keys_are_fatal() {
    let empty = EnvSecretStore::from_vars(Vec::new());
    let err = OperatorIdentity::load(&empty).await.expect_err("missing");
    assert!(matches!(err, OperatorError::SecretNotFound { .. }));
    assert!(err.is_fatal());

    let garbage = env_store("BLOCKPOST_SECRET__operator__private_key", "not a key".to_string());
    let err = OperatorIdentity::load(&garbage).await.expect_err("garbage");
    assert!(err.is_fatal(), "{}", err);
}

#[cfg(target_family = "unix")]
#[tokio::test]
async fn key_file_must_be_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("operator.key");
    std::fs::write(&path, format!("{}\n", DEV_PRIVATE_KEY)).expect("write key");

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");
    let err = FileSecretStore::open(&path).await.err().expect("world readable key file");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("insecure key file permissions"), "{}", err);

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).expect("chmod");
    let store = FileSecretStore::open(&path).await.expect("owner-only key file");
    assert_eq!(store.path(), path.as_path());
    assert_eq!(OperatorIdentity::load(&store).await.expect("identity").address(), DEV_ADDRESS);
}
