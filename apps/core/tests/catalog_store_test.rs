use appshelf_core::catalog_store;
use appshelf_core::model::{ApplicationRecord, Category};

fn seeded() -> rusqlite::Connection {
    let db = catalog_store::open_memory().unwrap();
    catalog_store::insert_record(&db, &ApplicationRecord::new("cam", "Camera").with_usage(5, Some(100))).unwrap();
    catalog_store::insert_record(&db, &ApplicationRecord::new("calc", "Calculator").with_usage(1, Some(50))).unwrap();
    catalog_store::insert_record(&db, &ApplicationRecord::new("cal", "Calendar").favorite()).unwrap();
    db
}

#[test]
fn inserts_and_reads_record() {
    let db = catalog_store::open_memory().unwrap();
    let mut record = ApplicationRecord::new("org.example.music", "Music")
        .with_secondary_name("Player")
        .with_usage(3, Some(1_700_000_000));
    record.category = Category::Audio;
    record.version_label = "4.1".into();
    record.version_ordinal = 41;

    catalog_store::insert_record(&db, &record).unwrap();
    let got = catalog_store::get_record(&db, "org.example.music").unwrap().unwrap();

    assert_eq!(got, record);
    assert!(catalog_store::get_record(&db, "missing").unwrap().is_none());
}

#[test]
fn persists_records_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("catalog.sqlite3");

    {
        let db = catalog_store::open_file(&db_path).unwrap();
        catalog_store::insert_record(&db, &ApplicationRecord::new("persist-1", "Report").with_usage(7, Some(1_800_000_000)))
            .unwrap();
    }

    let reopened = catalog_store::open_file(&db_path).unwrap();
    let got = catalog_store::get_record(&reopened, "persist-1").unwrap().unwrap();

    assert_eq!(got.display_name, "Report");
    assert_eq!(got.launch_count, 7);
    assert_eq!(got.last_launched_at, Some(1_800_000_000));
}

#[test]
fn upsert_refreshes_identity_and_keeps_statistics() {
    let db = seeded();
    let mut renamed = ApplicationRecord::new("cam", "Camera 2");
    renamed.version_ordinal = 9;

    let inserted = catalog_store::upsert_records(&db, &[renamed, ApplicationRecord::new("new", "New App")]).unwrap();

    assert_eq!(inserted, 1);
    let cam = catalog_store::get_record(&db, "cam").unwrap().unwrap();
    assert_eq!(cam.display_name, "Camera 2");
    assert_eq!(cam.version_ordinal, 9);
    assert_eq!(cam.launch_count, 5);
    assert_eq!(cam.last_launched_at, Some(100));

    let fresh = catalog_store::get_record(&db, "new").unwrap().unwrap();
    assert_eq!(fresh.launch_count, 0);
    assert_eq!(fresh.last_launched_at, None);
    assert!(!fresh.is_favorite);
}

#[test]
fn record_launch_increments_and_stamps() {
    let db = seeded();

    assert!(catalog_store::record_launch(&db, "calc", 999).unwrap());
    assert!(catalog_store::record_launch(&db, "calc", 1_000).unwrap());
    assert!(!catalog_store::record_launch(&db, "ghost", 1_000).unwrap());

    let calc = catalog_store::get_record(&db, "calc").unwrap().unwrap();
    assert_eq!(calc.launch_count, 3);
    assert_eq!(calc.last_launched_at, Some(1_000));
}

#[test]
fn toggle_favorite_flips_and_ignores_unknown_ids() {
    let db = seeded();

    assert_eq!(catalog_store::toggle_favorite(&db, "cam").unwrap(), Some(true));
    assert_eq!(catalog_store::toggle_favorite(&db, "cam").unwrap(), Some(false));
    assert_eq!(catalog_store::toggle_favorite(&db, "ghost").unwrap(), None);
    assert_eq!(catalog_store::count(&db).unwrap(), 3);

    assert!(catalog_store::set_favorite(&db, "calc", true).unwrap());
    let favorites: Vec<String> = catalog_store::list_favorites(&db)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(favorites, vec!["calc", "cal"]);
}

#[test]
fn most_used_is_ordered_and_capped() {
    let db = catalog_store::open_memory().unwrap();
    for i in 0..15u32 {
        catalog_store::insert_record(&db, &ApplicationRecord::new(&format!("app-{i:02}"), &format!("App {i:02}")).with_usage(i, None))
            .unwrap();
    }

    let most_used = catalog_store::list_most_used(&db, 50).unwrap();

    assert_eq!(most_used.len(), catalog_store::MOST_USED_LIMIT);
    assert_eq!(most_used[0].id, "app-14");
    assert!(most_used.iter().all(|record| record.launch_count > 0));
    assert!(most_used.windows(2).all(|pair| pair[0].launch_count >= pair[1].launch_count));
}

#[test]
fn delete_helpers_remove_records() {
    let db = seeded();

    assert!(catalog_store::delete_record(&db, "cam").unwrap());
    assert!(!catalog_store::delete_record(&db, "cam").unwrap());

    let keep = ["cal".to_string()].into_iter().collect();
    assert_eq!(catalog_store::delete_missing(&db, &keep).unwrap(), 1);
    assert_eq!(catalog_store::ids(&db).unwrap(), keep);
}

#[test]
fn retention_sweep_only_removes_unused_stale_records() {
    let db = catalog_store::open_memory().unwrap();
    let now = 100 * 86_400;
    let stale = now - 31 * 86_400;
    let recent = now - 2 * 86_400;

    let mut unused_stale = ApplicationRecord::new("unused-stale", "Unused Stale");
    unused_stale.updated_at = stale;
    let mut unused_recent = ApplicationRecord::new("unused-recent", "Unused Recent");
    unused_recent.updated_at = recent;
    let mut launched_stale = ApplicationRecord::new("launched-stale", "Launched Stale").with_usage(1, Some(stale));
    launched_stale.updated_at = stale;
    let mut favorite_stale = ApplicationRecord::new("favorite-stale", "Favorite Stale").favorite();
    favorite_stale.updated_at = stale;

    for record in [&unused_stale, &unused_recent, &launched_stale, &favorite_stale] {
        catalog_store::insert_record(&db, record).unwrap();
    }

    let removed = catalog_store::sweep_retention(&db, now, 30 * 86_400).unwrap();

    assert_eq!(removed, 1);
    assert!(catalog_store::get_record(&db, "unused-stale").unwrap().is_none());
    assert_eq!(catalog_store::count(&db).unwrap(), 3);
}
