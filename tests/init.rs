use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prchurn"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "prchurn init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".prchurn.toml");
    assert!(config_path.exists(), ".prchurn.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[history]"));
    assert!(content.contains("[filter]"));

    let config: prchurn_core::ChurnConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.history.window_days, 90);
    assert_eq!(config.history.branch, "main");
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".prchurn.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prchurn"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".prchurn.toml")).unwrap();
    assert_eq!(content, "# existing");
}
