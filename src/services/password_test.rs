use super::*;

/// Minimal parameters keep these tests fast; production uses `new(12)`.
fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_memory(8, 1).unwrap()
}

#[test]
fn hash_produces_argon2id_phc_string() {
    let hash = fast_hasher().hash("correct horse").unwrap();
    assert!(hash.starts_with("$argon2id$v=19$"), "unexpected hash format: {hash}");
}

#[test]
fn hash_records_configured_cost() {
    let hasher = PasswordHasher::with_memory(8, 3).unwrap();
    let hash = hasher.hash("pw").unwrap();
    assert!(hash.contains("t=3"), "cost missing from {hash}");
    assert_eq!(hasher.cost(), 3);
}

#[test]
fn hash_is_salted() {
    let hasher = fast_hasher();
    let a = hasher.hash("same password").unwrap();
    let b = hasher.hash("same password").unwrap();
    assert_ne!(a, b);
}

#[test]
fn verify_accepts_matching_password() {
    let hasher = fast_hasher();
    let hash = hasher.hash("hunter22").unwrap();
    assert!(hasher.verify("hunter22", &hash).unwrap());
}

#[test]
fn verify_rejects_wrong_password() {
    let hasher = fast_hasher();
    let hash = hasher.hash("hunter22").unwrap();
    assert!(!hasher.verify("hunter23", &hash).unwrap());
}

#[test]
fn verify_uses_parameters_from_stored_hash() {
    let strong = PasswordHasher::with_memory(16, 2).unwrap();
    let hash = strong.hash("pw").unwrap();
    assert!(fast_hasher().verify("pw", &hash).unwrap());
}

#[test]
fn verify_malformed_hash_is_error() {
    let err = fast_hasher().verify("pw", "not-a-phc-string").unwrap_err();
    assert!(matches!(err, HashError::Malformed(_)));
}

#[test]
fn zero_cost_is_rejected() {
    assert!(matches!(PasswordHasher::new(0), Err(HashError::Params(_))));
}

#[test]
fn default_cost_is_accepted() {
    assert_eq!(PasswordHasher::new(12).unwrap().cost(), 12);
}

#[tokio::test]
async fn blocking_wrappers_round_trip() {
    let hasher = fast_hasher();
    let hash = hasher.hash_blocking("async pw").await.unwrap();
    assert!(hasher.verify_blocking("async pw", &hash).await.unwrap());
    assert!(!hasher.verify_blocking("other", &hash).await.unwrap());
}
