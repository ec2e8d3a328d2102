#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde::Deserialize;
use silo_host::config::{self, LogFormat};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
app:
  name: "billing"
jobs:
  workerz: 4 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
app:
  name: "billing"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.app.name, "billing");
    assert_eq!(cfg.jobs.workers, 4);
    assert_eq!(cfg.jobs.max_attempts, 1);
    assert_eq!(cfg.logging.format, LogFormat::Pretty);
    assert!(cfg.ops.enabled);
}

#[test]
fn rejects_out_of_range_values() {
    let bad = r#"
version: 1
app:
  name: "billing"
jobs:
  workers: 0
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("jobs.workers"));

    let bad_version = r#"
version: 2
app:
  name: "billing"
"#;
    assert!(config::load_from_str(bad_version).is_err());
}

#[test]
fn named_sections_bind_to_types() {
    #[derive(Debug, Deserialize)]
    struct MailerOptions {
        host: String,
        port: u16,
    }

    let src = r#"
version: 1
app:
  name: "billing"
logging:
  format: json
sections:
  mailer:
    host: "smtp.local"
    port: 2525
"#;
    let cfg = config::load_from_str(src).expect("must parse");
    assert_eq!(cfg.logging.format, LogFormat::Json);

    let mailer: MailerOptions = cfg.section("mailer").expect("section binds");
    assert_eq!(mailer.host, "smtp.local");
    assert_eq!(mailer.port, 2525);

    let missing = cfg.section::<MailerOptions>("queue").expect_err("must fail");
    assert!(missing.to_string().contains("queue"));
}

#[test]
fn path_precedence_is_arg_then_env_then_default() {
    let p = config::resolve_path(Some("a.yaml".into()), Some("b.yaml".into()));
    assert_eq!(p, std::path::PathBuf::from("a.yaml"));

    let p = config::resolve_path(None, Some("b.yaml".into()));
    assert_eq!(p, std::path::PathBuf::from("b.yaml"));

    let p = config::resolve_path(None, Some("  ".into()));
    assert_eq!(p, std::path::PathBuf::from(config::DEFAULT_PATH));
}

#[test]
fn file_errors_name_the_file() {
    let missing = std::env::temp_dir().join("silo-missing-config.yaml");
    let err = config::load_from_file(&missing).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
    assert!(err.to_string().contains("silo-missing-config.yaml"));

    let bad = std::env::temp_dir().join(format!("silo-bad-config-{}.yaml", std::process::id()));
    std::fs::write(&bad, "version: 1\napp:\n  name: \"\"\n").unwrap();
    let err = config::load_from_file(&bad).expect_err("must fail");
    std::fs::remove_file(&bad).unwrap();
    assert!(err.to_string().contains(bad.file_name().unwrap().to_str().unwrap()));
}
