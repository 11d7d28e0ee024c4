use fracture_core::db::open_db_in_memory;
use fracture_core::{
    SettingsError, SettingsRepository, SettingsService, SqliteSettingsRepository,
};
use serde_json::json;

#[test]
fn fresh_project_loads_empty_settings() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
    assert!(repo.load().unwrap().is_empty());
}

#[test]
fn save_updates_single_row_in_place() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();

    let mut settings = repo.load().unwrap();
    settings.insert("theme".to_string(), json!("dark"));
    repo.save(&settings).unwrap();
    settings.insert("theme".to_string(), json!("light"));
    repo.save(&settings).unwrap();

    let loaded = repo.load().unwrap();
    assert_eq!(loaded.get("theme"), Some(&json!("light")));
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM settings;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn save_recreates_row_when_missing() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("DELETE FROM settings;", []).unwrap();
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
    assert!(repo.load().unwrap().is_empty());

    let mut settings = repo.load().unwrap();
    settings.insert("k".to_string(), json!(1));
    repo.save(&settings).unwrap();
    assert_eq!(repo.load().unwrap().get("k"), Some(&json!(1)));
}

#[test]
fn corrupt_payload_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("UPDATE settings SET data = '[]';", []).unwrap();
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();

    let err = repo.load().unwrap_err();
    assert!(err.to_string().contains("JSON object"));
}

#[test]
fn scan_locations_are_conformed_and_deduplicated() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteSettingsRepository::try_new(&conn).unwrap());

    service.add_scan_location(r"C:\projects\show").unwrap();
    service.add_scan_location("C:/projects/show").unwrap();
    service.add_scan_location("/mnt/library").unwrap();
    assert_eq!(
        service.scan_locations().unwrap(),
        vec!["C:/projects/show", "/mnt/library"]
    );

    service.remove_scan_location(r"C:\projects\show").unwrap();
    service.remove_scan_location("/not/stored").unwrap();
    assert_eq!(service.scan_locations().unwrap(), vec!["/mnt/library"]);
}

#[test]
fn skip_regexes_must_compile() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteSettingsRepository::try_new(&conn).unwrap());

    service.add_skip_regex(r"\.git/").unwrap();
    let err = service.add_skip_regex("(unclosed").unwrap_err();
    assert!(matches!(err, SettingsError::InvalidPattern { .. }));
    assert_eq!(service.skip_regexes().unwrap(), vec![r"\.git/"]);

    service.remove_skip_regex(r"\.git/").unwrap();
    assert!(service.skip_regexes().unwrap().is_empty());
}

#[test]
fn typed_lists_share_the_payload_with_other_keys() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
    let mut settings = repo.load().unwrap();
    settings.insert("theme".to_string(), json!("dark"));
    repo.save(&settings).unwrap();

    let service = SettingsService::new(SqliteSettingsRepository::try_new(&conn).unwrap());
    service.add_scan_location("/mnt/library").unwrap();
    service.add_skip_regex(r"\.bak$").unwrap();

    let raw = service.load().unwrap();
    assert_eq!(raw.get("theme"), Some(&json!("dark")));
    assert_eq!(raw.get("scan_locations"), Some(&json!(["/mnt/library"])));
    assert_eq!(raw.get("skip_regex"), Some(&json!([r"\.bak$"])));
}
