use super::*;

#[test]
fn test_config_defaults() {
    let config = Config::new("test-store");
    assert_eq!(config.name, "test-store");
    assert_eq!(config.coarse_bucket_bytes(), Config::DEFAULT_BUCKET_BYTES);
    assert_eq!(
        config.coarse_bucket_entries(),
        Config::DEFAULT_BUCKET_ENTRIES
    );
}

#[test]
fn test_config_builder_overrides() {
    let mut config = Config::new("small");
    config.set_coarse_bucket_bytes(1024).set_coarse_bucket_entries(64);
    assert_eq!(config.coarse_bucket_bytes(), 1024);
    assert_eq!(config.coarse_bucket_entries(), 64);
}
