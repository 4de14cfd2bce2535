use jaap_core::db::open_db_in_memory;
use jaap_core::model::settings::DailyGoalOverride;
use jaap_core::repo::blob_repo::BlobStore;
use jaap_core::{
    BackupDocument, CalendarDate, FixedClock, GoalKind, HistoryEditError, HistoryEntry,
    ProfileCatalog, ProfileError, ProgressService, ServiceError, SettingsOverride,
    SqliteBlobStore, Streak, UserConfirmation,
};

fn day(value: &str) -> CalendarDate {
    CalendarDate::parse(value).unwrap()
}

#[test]
fn switching_profiles_swaps_state_and_keeps_each_isolated() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);

    let mut session = service.activate("om").unwrap();
    for _ in 0..3 {
        service.increment(&mut session).unwrap();
    }

    service.switch_profile(&mut session, "sat").unwrap();
    assert_eq!(session.profile().id().as_str(), "sat");
    assert_eq!(session.counts().bead_count, 0);
    assert_eq!(session.settings().daily_goal.kind, GoalKind::Beads);
    service.increment(&mut session).unwrap();

    service.switch_profile(&mut session, "om").unwrap();
    assert_eq!(session.counts().bead_count, 3);
}

#[test]
fn switching_to_unknown_profile_keeps_current_session() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);

    let mut session = service.activate("om").unwrap();
    let err = service.switch_profile(&mut session, "ghost").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Profile(ProfileError::UnknownProfile(_))
    ));
    assert_eq!(session.profile().id().as_str(), "om");
    assert!(session.gate().allows(session.profile().id()));
}

#[test]
fn reset_today_clears_counts_but_keeps_streak() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);

    let mut session = service.activate("om").unwrap();
    for _ in 0..110 {
        service.increment(&mut session).unwrap();
    }
    assert!(session.counts().target_reached_today);

    service
        .reset_today(&mut session, UserConfirmation::granted())
        .unwrap();

    assert_eq!(session.counts().bead_count, 0);
    assert_eq!(session.counts().round_count, 0);
    assert!(!session.counts().target_reached_today);
    assert_eq!(session.streak(), Streak::first_day(day("2024-07-01")));

    let reloaded = service.activate("om").unwrap();
    assert_eq!(reloaded.counts(), session.counts());
}

#[test]
fn confirmation_flag_maps_to_token() {
    assert!(UserConfirmation::from_flag(false).is_none());
    assert_eq!(
        UserConfirmation::from_flag(true),
        Some(UserConfirmation::granted())
    );
}

#[test]
fn history_edit_keeps_dates_unique_and_descending() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    blobs
        .put(
            "om_history",
            r#"[{"date":"2024-06-28","rounds":2},{"date":"2024-06-30","rounds":1}]"#,
        )
        .unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();

    assert_eq!(session.history().entries()[0].date, day("2024-06-30"));

    let err = service
        .edit_history(
            &mut session,
            day("2024-06-28"),
            HistoryEntry::new(day("2024-06-30"), 5),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::History(HistoryEditError::DateTaken(_))
    ));

    let err = service
        .edit_history(
            &mut session,
            day("2024-06-28"),
            HistoryEntry::new(day("2024-07-01"), 5),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::HistoryDateNotPast(_)));

    service
        .edit_history(
            &mut session,
            day("2024-06-28"),
            HistoryEntry::new(day("2024-06-29"), 6),
        )
        .unwrap();
    let dates: Vec<CalendarDate> = session
        .history()
        .entries()
        .iter()
        .map(|entry| entry.date)
        .collect();
    assert_eq!(dates, vec![day("2024-06-30"), day("2024-06-29")]);

    let removed = service
        .remove_history(&mut session, day("2024-06-30"))
        .unwrap();
    assert_eq!(removed.rounds, 1);
    let reloaded = service.activate("om").unwrap();
    assert_eq!(
        reloaded.history().entries(),
        &[HistoryEntry::new(day("2024-06-29"), 6)]
    );
}

#[test]
fn history_remove_after_midnight_archives_yesterday_first() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    blobs
        .put("om_history", r#"[{"date":"2024-06-30","rounds":1}]"#)
        .unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..108 {
        service.increment(&mut session).unwrap();
    }

    clock.advance_days(1);
    service
        .remove_history(&mut session, day("2024-06-30"))
        .unwrap();

    assert_eq!(session.counts().last_visit_date, day("2024-07-02"));
    assert_eq!(session.counts().round_count, 0);
    let reloaded = service.activate("om").unwrap();
    assert_eq!(
        reloaded.history().entries(),
        &[HistoryEntry::new(day("2024-07-01"), 1)]
    );
}

#[test]
fn settings_update_persists_override_and_rewraps_counts() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..60 {
        service.increment(&mut session).unwrap();
    }

    let settings = service
        .update_settings(
            &mut session,
            SettingsOverride {
                beads_per_round: Some(27),
                daily_goal: Some(DailyGoalOverride {
                    kind: None,
                    value: Some(3),
                }),
            },
        )
        .unwrap();

    assert_eq!(settings.beads_per_round, 27);
    assert_eq!(settings.daily_goal.kind, GoalKind::Rounds);
    assert_eq!(session.counts().round_count, 2);
    assert_eq!(session.counts().bead_count, 6);
    assert_eq!(service.lifetime_beads(&session), 60);

    let reloaded = service.activate("om").unwrap();
    assert_eq!(reloaded.settings(), settings);

    service
        .update_settings(&mut session, SettingsOverride::default())
        .unwrap();
    assert!(blobs.get("om_settings").unwrap().is_none());
    assert_eq!(session.settings(), session.profile().defaults());
}

#[test]
fn lifetime_beads_and_reports_include_history() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    blobs
        .put("sat_history", r#"[{"date":"2024-06-30","rounds":10}]"#)
        .unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("sat").unwrap();
    for _ in 0..5 {
        service.increment(&mut session).unwrap();
    }

    assert_eq!(service.lifetime_beads(&session), 1085);

    let report = service.report(&session);
    assert_eq!(report.total_beads, 1085);
    assert_eq!(report.total_rounds, 10);
    assert_eq!(report.history[0].beads, 1080);

    let all = service.report_all().unwrap();
    assert_eq!(all.len(), 2);
    let sat = all.iter().find(|r| r.profile_id == "sat").unwrap();
    assert_eq!(sat.total_beads, 1085);
}

#[test]
fn export_then_restore_reinstates_profile_state() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..108 {
        service.increment(&mut session).unwrap();
    }
    let backup = service.export_profile(&session).unwrap();
    let saved_counts = session.counts().clone();

    service
        .reset_today(&mut session, UserConfirmation::granted())
        .unwrap();
    service
        .import_backup(&mut session, &backup, UserConfirmation::granted())
        .unwrap();

    assert_eq!(session.counts(), &saved_counts);
    assert_eq!(session.streak(), Streak::first_day(day("2024-07-01")));
}

#[test]
fn restoring_yesterdays_backup_archives_it_on_reload() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..216 {
        service.increment(&mut session).unwrap();
    }
    let backup = service.export_profile(&session).unwrap();

    clock.advance_days(1);
    let mut today = service.activate("om").unwrap();
    let report = service
        .import_backup(&mut today, &backup, UserConfirmation::granted())
        .unwrap();

    assert_eq!(report.restored.len(), 1);
    assert_eq!(today.counts().round_count, 0);
    assert_eq!(
        today.history().entries(),
        &[HistoryEntry::new(day("2024-07-01"), 2)]
    );
    assert_eq!(today.streak().count(), 1);
}

#[test]
fn namespaced_restore_overwrites_every_known_profile() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);

    let mut session = service.activate("sat").unwrap();
    for _ in 0..4 {
        service.increment(&mut session).unwrap();
    }
    service.switch_profile(&mut session, "om").unwrap();
    service.increment(&mut session).unwrap();
    let backup = service.export_all(&session).unwrap();

    service
        .reset_today(&mut session, UserConfirmation::granted())
        .unwrap();
    let mut sat = service.activate("sat").unwrap();
    service
        .reset_today(&mut sat, UserConfirmation::granted())
        .unwrap();

    let document = jaap_core::backup::validate(&backup).unwrap();
    assert!(matches!(document, BackupDocument::MultiProfileBlob(_)));
    let report = service
        .restore(&mut session, document, UserConfirmation::granted())
        .unwrap();

    assert_eq!(report.restored.len(), 2);
    assert!(report.skipped_prefixes.is_empty());
    assert_eq!(session.counts().bead_count, 1);
    assert_eq!(service.activate("sat").unwrap().counts().bead_count, 4);
}

#[test]
fn namespaced_restore_with_only_unknown_prefixes_fails_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let clock = FixedClock::new(day("2024-07-01"));
    let service = ProgressService::new(ProfileCatalog::builtin(), &blobs, &clock);
    let mut session = service.activate("om").unwrap();
    for _ in 0..3 {
        service.increment(&mut session).unwrap();
    }
    let keys_before = blobs.keys().unwrap();

    let raw = br#"{"gayatri_counts":{"beadCount":9,"roundCount":0,"lastVisitDate":"2024-07-01","targetReachedToday":false}}"#;
    let err = service
        .import_backup(&mut session, raw, UserConfirmation::granted())
        .unwrap_err();

    match err {
        ServiceError::NoMatchingProfiles(prefixes) => {
            assert_eq!(prefixes, vec!["gayatri".to_string()])
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(blobs.keys().unwrap(), keys_before);
    assert_eq!(session.counts().bead_count, 3);
}
