//! Tests for preset loading and seeding.

use runtime::PresetStore;
use std::fs;

#[test]
fn seeds_the_bundled_default_on_first_run() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("presets");
    let store = PresetStore::new(&dir);

    let presets = store.load_all().unwrap();
    assert_eq!(presets.len(), 1);
    assert!(presets[0].keywords.iter().any(|k| k == "assistant"));
    assert!(dir.join("assistant.md").exists());
}

#[test]
fn default_preset_resolves() {
    let tmp = tempfile::tempdir().unwrap();
    let store = PresetStore::new(tmp.path().join("presets"));

    let preset = store.default_preset().unwrap();
    assert!(!preset.system_prompt.is_empty());
    assert_eq!(preset.system_prompts().len(), 1);
}

#[test]
fn unknown_keyword_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let store = PresetStore::new(tmp.path().join("presets"));

    let err = store.get("no-such-preset").unwrap_err();
    assert!(err.to_string().contains("no-such-preset"));
}

#[test]
fn lookups_observe_disk_edits_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("presets");
    let store = PresetStore::new(&dir);
    store.load_all().unwrap();

    // Drop a new preset in after the first load; no restart, no rebuild.
    fs::write(
        dir.join("poet.md"),
        "---\nkeywords: [poet]\n---\n\nYou are a poet.\n",
    )
    .unwrap();

    let preset = store.get("poet").unwrap();
    assert_eq!(preset.system_prompt, "You are a poet.");
    assert_eq!(store.list().unwrap().len(), 2);
}
