use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use pofo_httpd::config::Config;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert!(cfg.server.backlog >= 5);
    assert_eq!(cfg.idle_timeout(), Duration::from_secs(60));
    assert_eq!(cfg.static_files.index_file, "index.htm");
    assert!(cfg.static_files.directory_listing);
    cfg.validate().unwrap();
}

#[test]
fn test_config_custom_address_from_env() {
    let mut cfg = Config::default();
    cfg.apply_overrides(env(&[("LISTEN", "0.0.0.0:3000")]));

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.listen_addr().unwrap().port(), 3000);
}

#[test]
fn test_config_doc_root_from_env() {
    let mut cfg = Config::default();
    cfg.apply_overrides(env(&[("DOC_ROOT", "/srv/www")]));

    assert_eq!(cfg.static_files.root, PathBuf::from("/srv/www"));
}

#[test]
fn test_config_no_overrides_keeps_values() {
    let mut cfg = Config::default();
    cfg.apply_overrides(env(&[]));

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.static_files.root, PathBuf::from("www"));
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml(
        r#"
server:
  listen_addr: "192.168.7.2:80"
  backlog: 16
  idle_timeout_secs: 30
static_files:
  root: "/pofo/www"
  directory_listing: false
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "192.168.7.2:80");
    assert_eq!(cfg.server.backlog, 16);
    assert_eq!(cfg.idle_timeout(), Duration::from_secs(30));
    // Unset fields keep their defaults.
    assert_eq!(cfg.server.max_request_bytes, 4096);
    assert_eq!(cfg.static_files.index_file, "index.htm");

    let options = cfg.resolve_options();
    assert!(!options.directory_listing);
    assert_eq!(options.index_file, "index.htm");
}

#[test]
fn test_config_empty_yaml_is_default() {
    let cfg = Config::from_yaml("   \n").unwrap();
    assert_eq!(cfg.server.backlog, Config::default().server.backlog);
}

#[test]
fn test_config_unknown_field_rejected() {
    assert!(Config::from_yaml("server:\n  listen: \"0.0.0.0:80\"\n").is_err());
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pofo.yaml");
    std::fs::write(&file, "static_files:\n  chunk_size: 64\n").unwrap();

    let cfg = Config::from_file(&file).unwrap();
    assert_eq!(cfg.static_files.chunk_size, 64);

    assert!(Config::from_file(&dir.path().join("missing.yaml")).is_err());
}

#[test]
fn test_config_validation() {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "not an address".to_string();
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.backlog = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.idle_timeout_secs = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.static_files.chunk_size = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.static_files.index_file = "docs/index.htm".to_string();
    assert!(cfg.validate().is_err());
}
