use std::fs;

use actions_content::{ContentFactory, PrototypeRegistry};
use actions_core::{ActionsConfig, PrototypeId, PrototypeOracle};

fn write(dir: &std::path::Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_a_full_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config.toml",
        "cooldown_sweep_interval_ms = 2500\ndefault_container_capacity = 4\n",
    );
    write(
        dir.path(),
        "actions/a_innate.ron",
        r#"(prototypes: [(id: "Scream", presentation: (sound: Some("/audio/scream.ogg")))])"#,
    );
    write(
        dir.path(),
        "actions/b_spells.ron",
        r#"(prototypes: [(id: "Blink", use_delay_secs: Some(2.0), event: Some("blink"))])"#,
    );
    write(dir.path(), "actions/notes.txt", "ignored");
    write(
        dir.path(),
        "items.ron",
        r#"(items: [(name: "Hat", provides: (slots: "HEAD", prototypes: ["Blink"]))])"#,
    );

    let factory = ContentFactory::new(dir.path());
    let config = factory.load_config().unwrap();
    assert_eq!(config.cooldown_sweep_interval_ms, 2500);
    assert_eq!(config.default_container_capacity, Some(4));
    assert_eq!(
        config.cooldown_expiry_grace_ms,
        ActionsConfig::DEFAULT_EXPIRY_GRACE_MS
    );

    let registry = factory.load_prototypes().unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.prototype(&PrototypeId::from("Scream")).is_some());

    let kits = factory.load_item_kits(&registry).unwrap();
    assert_eq!(kits.get("Hat").unwrap().provides.prototypes.len(), 1);
}

#[test]
fn optional_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "actions/only.ron", r#"(prototypes: [(id: "Wave")])"#);

    let factory = ContentFactory::new(dir.path());
    assert_eq!(factory.load_config().unwrap(), ActionsConfig::default());
    let registry = factory.load_prototypes().unwrap();
    assert!(factory.load_item_kits(&registry).unwrap().items.is_empty());
}

#[test]
fn duplicate_ids_across_files_fail() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ron", r#"(prototypes: [(id: "Blink")])"#);
    write(dir.path(), "b.ron", r#"(prototypes: [(id: "Blink")])"#);

    let err = PrototypeRegistry::load_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn kits_naming_unknown_prototypes_fail() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "actions/a.ron", r#"(prototypes: [(id: "Blink")])"#);
    write(
        dir.path(),
        "items.ron",
        r#"(items: [(name: "Hat", provides: (slots: "HEAD", prototypes: ["Teleport"]))])"#,
    );

    let factory = ContentFactory::new(dir.path());
    let registry = factory.load_prototypes().unwrap();
    assert!(factory.load_item_kits(&registry).is_err());
}
