use std::fs;

use clap::Parser;

use mizuki::args::Cli;
use mizuki::editor::{set_field, set_override};
use mizuki::execute;
use mizuki::resolve::{effective_settings, Role};
use mizuki::store::{decode, Preferences, PrefsFile, ProfileStore, DEFAULT_PROFILE_COUNT, PREFS_KEY};

#[test]
fn edits_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let mut store = ProfileStore::restore(PrefsFile::in_folder(dir.path()));
        store.add_account().unwrap();
        set_override(&mut store, "5", "priority", true).unwrap();
        set_field(&mut store, "5", "priority", "77").unwrap();
        store.list()[6].id.clone()
    };

    let store = ProfileStore::restore(PrefsFile::in_folder(dir.path()));
    assert_eq!(store.list().len(), DEFAULT_PROFILE_COUNT + 1);
    let account = store.get(&id).unwrap();
    let eff = effective_settings(Role::Account, account, &store.base(), &store.override_profile());
    assert_eq!(eff.priority, "77");
}

#[test]
fn corrupt_preferences_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let mut prefs = PrefsFile::in_folder(dir.path());
    prefs.put(PREFS_KEY, "[{\"priority\": 1}]").unwrap();
    let store = ProfileStore::restore(prefs);
    assert_eq!(store.list().len(), DEFAULT_PROFILE_COUNT);
    assert_eq!(store.list()[0].id, "before");
}

#[test]
fn file_export_then_import_keeps_the_list() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mizuki.json");
    let mut store = ProfileStore::restore(PrefsFile::in_folder(dir.path().join("a")));
    set_field(&mut store, "base", "crontab_start", "01:00").unwrap();
    assert!(store.export_file(&out));

    let mut other = ProfileStore::restore(PrefsFile::in_folder(dir.path().join("b")));
    assert!(other.import_file(&out).unwrap());
    assert_eq!(other.list(), store.list());

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{\"not\": \"a list\"}").unwrap();
    assert!(!other.import_file(&garbage).unwrap());
    assert!(!other.import_file(dir.path().join("missing.json")).unwrap());
    assert_eq!(other.list(), store.list());
}

#[test]
fn cli_commands_drive_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("store");
    let folder_arg = folder.to_str().unwrap();
    let run = |args: &[&str]| {
        let mut argv = vec!["mizuki", "--yes", "--store", folder_arg];
        argv.extend_from_slice(args);
        execute(Cli::parse_from(argv))
    };

    run(&["add"]).unwrap();
    run(&["override", "override", "job_mail", "on"]).unwrap();
    run(&["set", "override", "job_mail", "off"]).unwrap();
    run(&["pick", "1", "forbid_weekday", "5", "6"]).unwrap_err();
    run(&["override", "1", "forbid_weekday", "on"]).unwrap();
    run(&["pick", "1", "forbid_weekday", "6", "5"]).unwrap();
    run(&["server", "1"]).unwrap();
    assert!(run(&["set", "1", "job_mail", "on"]).is_err());
    assert!(run(&["server", "base"]).is_err());
    run(&["list"]).unwrap();
    run(&["show", "1", "--json"]).unwrap();

    let prefs = PrefsFile::in_folder(&folder);
    let stored = decode(&prefs.get(PREFS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), DEFAULT_PROFILE_COUNT + 1);
    assert!(stored[1].settings.job_mail_override);
    assert!(!stored[1].settings.job_mail);
    assert_eq!(stored[2].settings.forbid_weekday, "5 6");
    assert_eq!(stored[2].server, "B服");
}
