use jaap_core::backup::{export_all, export_profile, validate};
use jaap_core::db::open_db_in_memory;
use jaap_core::repo::blob_repo::BlobStore;
use jaap_core::{
    BackupDocument, BackupError, CalendarDate, DayCounts, FixedClock, HistoryArchive,
    HistoryEntry, ProfileCatalog, ProfileSnapshot, ProgressService, ServiceError,
    SettingsOverride, SqliteBlobStore, Streak, UserConfirmation,
};
use std::collections::BTreeMap;

fn day(value: &str) -> CalendarDate {
    CalendarDate::parse(value).unwrap()
}

fn sample_snapshot() -> ProfileSnapshot {
    ProfileSnapshot {
        counts: Some(DayCounts {
            bead_count: 17,
            round_count: 2,
            last_visit_date: day("2024-02-02"),
            target_reached_today: true,
        }),
        history: Some(HistoryArchive::from_entries([
            HistoryEntry::new(day("2024-01-30"), 4),
            HistoryEntry::new(day("2024-02-01"), 1),
        ])),
        streak: Some(Streak::first_day(day("2024-02-02"))),
        settings: None,
    }
}

#[test]
fn single_profile_export_validates_back_to_same_state() {
    let catalog = ProfileCatalog::builtin();
    let om = catalog.get("om").unwrap();
    let snapshot = sample_snapshot();

    let bytes = export_profile(om, &snapshot).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("\"backupId\""));
    assert!(text.contains("\"lastVisitDate\": \"2024-02-02\""));

    assert_eq!(
        validate(&bytes).unwrap(),
        BackupDocument::SingleProfile(snapshot)
    );
}

#[test]
fn namespaced_export_validates_back_to_same_state() {
    let catalog = ProfileCatalog::builtin();
    let om = catalog.get("om").unwrap();
    let sat = catalog.get("sat").unwrap();
    let om_snapshot = sample_snapshot();
    let sat_snapshot = ProfileSnapshot {
        settings: Some(SettingsOverride {
            beads_per_round: Some(27),
            daily_goal: None,
        }),
        ..ProfileSnapshot::default()
    };

    let bytes = export_all([(om, &om_snapshot), (sat, &sat_snapshot)]).unwrap();
    let expected = BTreeMap::from([
        ("om".to_string(), om_snapshot),
        ("sat".to_string(), sat_snapshot),
    ]);
    assert_eq!(
        validate(&bytes).unwrap(),
        BackupDocument::MultiProfileBlob(expected)
    );
}

#[test]
fn whole_storage_dump_with_string_values_is_accepted() {
    let raw = r#"{
        "om_counts": "{\"beadCount\":1,\"roundCount\":0,\"lastVisitDate\":\"2024-01-01\",\"targetReachedToday\":false}",
        "om_history": "[{\"date\":\"2023-12-31\",\"rounds\":2}]",
        "theme": "dark"
    }"#;

    let BackupDocument::MultiProfileBlob(blob) = validate(raw.as_bytes()).unwrap() else {
        panic!("expected namespaced blob");
    };
    let om = &blob["om"];
    assert_eq!(om.counts.as_ref().unwrap().bead_count, 1);
    assert_eq!(om.history.as_ref().unwrap().len(), 1);
    assert!(om.streak.is_none());
}

#[test]
fn non_object_and_unrelated_documents_are_unrecognized() {
    for input in [
        "[1,2,3]",
        "42",
        "\"counts\"",
        "not json",
        "{}",
        r#"{"theme":"dark"}"#,
        r#"{"counts":null}"#,
        r#"{"counts":null,"history":null,"streak":null}"#,
        r#"{"counts":null,"settings":{"beadsPerRound":27}}"#,
        r#"{"om_counts":null,"om_settings":{"beadsPerRound":27}}"#,
    ] {
        assert_eq!(
            validate(input.as_bytes()),
            Err(BackupError::UnrecognizedFormat),
            "input: {input}"
        );
    }
}

#[test]
fn structurally_invalid_field_is_rejected_with_its_name() {
    let raw = r#"{"counts":{"beadCount":"many"},"history":[],"streak":{"count":0,"lastDate":null}}"#;
    match validate(raw.as_bytes()) {
        Err(BackupError::InvalidField { field, .. }) => assert_eq!(field, "counts"),
        other => panic!("unexpected result: {other:?}"),
    }

    let raw = r#"{"om_history":[{"date":"2024-13-45","rounds":1}]}"#;
    match validate(raw.as_bytes()) {
        Err(BackupError::InvalidField { field, .. }) => assert_eq!(field, "om_history"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn rejected_import_leaves_stored_state_untouched() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-02-02"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    service.increment(&mut session).unwrap();

    let keys_before = blobs.keys().unwrap();
    let counts_before = blobs.get("om_counts").unwrap();

    let err = service
        .import_backup(&mut session, b"[1,2,3]", UserConfirmation::granted())
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Backup(BackupError::UnrecognizedFormat)
    ));
    assert_eq!(blobs.keys().unwrap(), keys_before);
    assert_eq!(blobs.get("om_counts").unwrap(), counts_before);
    assert_eq!(session.counts().bead_count, 1);
}

#[test]
fn null_only_import_keeps_todays_progress() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-02-02"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..5 {
        service.increment(&mut session).unwrap();
    }
    let counts_before = blobs.get("om_counts").unwrap();

    let err = service
        .import_backup(&mut session, br#"{"counts":null}"#, UserConfirmation::granted())
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Backup(BackupError::UnrecognizedFormat)
    ));
    assert_eq!(blobs.get("om_counts").unwrap(), counts_before);
    assert_eq!(session.counts().bead_count, 5);
}
