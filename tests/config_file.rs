//! Configuration file loading

use matquery::config::Config;
use matquery::filters::FilterKey;
use matquery::ranking::IdentityKey;
use std::io::Write;

#[test]
fn test_load_partial_config_with_registry_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[search]
deadline_ms = 5000
max_backends = 2

[ranking]
identity_key = "source_id"

[[databases]]
id = "local"
name = "Local catalog"
supported_filters = ["formula", "elements"]
material_types = ["crystal", "mof"]
priority = 1
"#
    )
    .unwrap();

    let config = Config::load(Some(file.path().to_path_buf())).unwrap();
    assert_eq!(config.llm.provider, "openai");
    assert_eq!(config.llm.api_key_env, "LLM_API_KEY");
    assert_eq!(config.search.deadline_ms, 5000);
    assert_eq!(config.search.max_relaxation_steps, 3);
    assert_eq!(config.search.max_backends, Some(2));
    assert_eq!(config.ranking.identity_key, IdentityKey::SourceId);

    let registry = config.registry().unwrap();
    assert_eq!(registry.ids(), vec!["local"]);
    assert!(registry.get("local").unwrap().supports(FilterKey::Elements));
}

#[test]
fn test_duplicate_database_ids_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[databases]]
id = "dup"
name = "A"
supported_filters = ["formula"]
material_types = ["crystal"]
priority = 1

[[databases]]
id = "dup"
name = "B"
supported_filters = ["formula"]
material_types = ["crystal"]
priority = 2
"#
    )
    .unwrap();

    assert!(Config::load(Some(file.path().to_path_buf())).is_err());
}

#[test]
fn test_save_round_trip_omits_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.llm.api_key = Some("sk-secret".to_string());
    config.search.deadline_ms = 1234;
    config.save(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(!written.contains("sk-secret"));

    let loaded = Config::load(Some(path)).unwrap();
    assert_eq!(loaded.search.deadline_ms, 1234);
    assert_eq!(loaded.databases.len(), 4);
    assert!(loaded.llm.api_key.is_none());
}
