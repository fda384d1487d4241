//! Integration tests for `race_checklist` against the `SQLite` store.

use race_checklist::board::{Board, RefreshOutcome};
use race_checklist::checklist::{Actor, Category, ChecklistManager, Direction, StatusUpdate};
use race_checklist::config::BoardConfig;
use race_checklist::storage::SqliteDocumentStore;
use race_checklist::testing::FixedClock;
use race_checklist::{Error, VERSION};
use tempfile::TempDir;

fn open(dir: &TempDir) -> ChecklistManager<SqliteDocumentStore> {
    let store = SqliteDocumentStore::with_path(dir.path().join("board.sqlite3")).unwrap();
    ChecklistManager::with_clock(store, chrono_tz::US::Pacific, Box::new(FixedClock::race_morning()))
}

fn titles(m: &ChecklistManager<SqliteDocumentStore>, category: &str) -> Vec<String> {
    m.tasks_by_category(category).unwrap().into_iter().map(|t| t.title).collect()
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[test]
fn test_fresh_board_shows_defaults() {
    let dir = TempDir::new().unwrap();
    let m = open(&dir);
    let names: Vec<_> = m.list_categories().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Transportation", "Course & Traffic", "Vendors", "Finish Line"]);
}

#[test]
fn test_race_morning_walkthrough() {
    let dir = TempDir::new().unwrap();
    let m = open(&dir);
    let admin = Actor::admin();
    let viewer = Actor::viewer();

    m.add_category(&admin, "Medical").unwrap();
    let tent = m.add_task(&admin, "Medical", "Set up aid tent").unwrap();
    let kits = m.add_task(&admin, "Medical", "Stock first aid kits").unwrap();
    m.add_task(&admin, "Medical", "Brief EMTs").unwrap();

    assert!(m.move_task(&admin, &kits.id, "Medical", kits.sort_order, Direction::Up).unwrap());
    assert_eq!(titles(&m, "Medical"), vec!["Stock first aid kits", "Set up aid tent", "Brief EMTs"]);

    m.set_task_completion(&viewer, &tent.id, true).unwrap();
    assert!(matches!(
        m.set_task_completion(&viewer, &tent.id, false),
        Err(Error::CompletionLocked(_))
    ));

    m.set_category_status(&admin, "Medical", StatusUpdate::status(false).with_note("EMTs en route"))
        .unwrap();
    m.set_category_status(&admin, "Medical", StatusUpdate::status(true)).unwrap();
    let status = m.get_category_status("Medical").unwrap();
    assert!(status.completed);
    assert_eq!(status.note, "EMTs en route");
    assert_eq!(status.note_timestamp, "06:05 AM");

    let outcome = Board::new(&m).refresh(&viewer);
    let RefreshOutcome::Rendered(snapshot) = outcome else {
        panic!("expected a rendered board");
    };
    let medical = snapshot.category("Medical").unwrap();
    assert_eq!(medical.label, "GO");
    assert!(medical.tasks.iter().find(|t| t.id == tent.id).unwrap().locked);
}

#[test]
fn test_state_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let task_id = {
        let m = open(&dir);
        m.save_categories(
            &Actor::admin(),
            vec![Category::new("Finish Line", 5), Category::new("Vendors", 9)],
        )
        .unwrap();
        m.add_task(&Actor::admin(), "Finish Line", "Hang banner").unwrap().id
    };

    let m = open(&dir);
    assert_eq!(
        m.list_categories().unwrap(),
        vec![Category::new("Finish Line", 0), Category::new("Vendors", 1)]
    );
    assert_eq!(m.tasks().get(&task_id).unwrap().unwrap().title, "Hang banner");
}

#[test]
fn test_rename_then_delete_orphans_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let m = open(&dir);
    let admin = Actor::admin();
    m.add_task(&admin, "Vendors", "Ice").unwrap();
    m.add_task(&admin, "Vendors", "Tents").unwrap();

    let report = m.rename_category(&admin, "Vendors", "Food & Water").unwrap();
    assert_eq!(report.retagged_tasks, 2);
    assert_eq!(titles(&m, "Food & Water"), vec!["Ice", "Tents"]);

    assert!(m.delete_category(&admin, "Food & Water").unwrap());
    assert_eq!(m.orphaned_tasks().unwrap().len(), 2);

    let admin_view = Board::new(&m).refresh(&admin);
    assert_eq!(admin_view.snapshot().unwrap().orphaned.len(), 2);
    let viewer_view = Board::new(&m).refresh(&Actor::viewer());
    assert!(viewer_view.snapshot().unwrap().orphaned.is_empty());
}

#[test]
fn test_max_plus_one_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let m = open(&dir);
    let admin = Actor::admin();
    let a = m.add_task(&admin, "Vendors", "A").unwrap();
    m.add_task(&admin, "Vendors", "B").unwrap();
    m.delete_task(&admin, &a.id).unwrap();

    let c = m.add_task(&admin, "Vendors", "C").unwrap();
    assert_eq!(c.sort_order, 2);
    assert_eq!(m.renumber_tasks(&admin, "Vendors").unwrap(), 2);
    let orders: Vec<_> =
        m.tasks_by_category("Vendors").unwrap().into_iter().map(|t| t.sort_order).collect();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn test_unreadable_database_halts_board() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.sqlite3");
    let m = open(&dir);
    m.add_task(&Actor::admin(), "Vendors", "Ice").unwrap();

    std::fs::write(&path, vec![b'x'; 4096]).unwrap();
    let outcome = Board::new(&m).refresh(&Actor::viewer());
    assert!(outcome.is_halted(), "got {outcome:?}");
}

#[test]
fn test_config_drives_manager_timezone() {
    let dir = TempDir::new().unwrap();
    let config = BoardConfig { timezone: "Europe/London".to_string(), ..Default::default() };
    config.save_to(dir.path()).unwrap();

    let loaded = BoardConfig::load_or_default(dir.path()).unwrap();
    let store = SqliteDocumentStore::with_path(dir.path().join("board.sqlite3")).unwrap();
    assert!(ChecklistManager::from_config(store, &loaded).is_ok());

    let bad = BoardConfig { timezone: "Mars/Olympus".to_string(), ..Default::default() };
    let store = SqliteDocumentStore::with_path(dir.path().join("board.sqlite3")).unwrap();
    assert!(ChecklistManager::from_config(store, &bad).is_err());
}

#[test]
fn test_two_managers_on_one_file_both_land() {
    let dir = TempDir::new().unwrap();
    let setup = open(&dir);
    let ice = setup.add_task(&Actor::admin(), "Vendors", "Ice").unwrap();

    let viewer_side = open(&dir);
    let admin_side = open(&dir);
    viewer_side.set_task_completion(&Actor::viewer(), &ice.id, true).unwrap();
    let update = StatusUpdate::status(true).with_note("Stocked");
    admin_side.set_category_status(&Actor::admin(), "Vendors", update).unwrap();

    let outcome = Board::new(&setup).refresh(&Actor::viewer());
    let RefreshOutcome::Rendered(snapshot) = outcome else {
        panic!("expected a rendered board");
    };
    let vendors = snapshot.category("Vendors").unwrap();
    assert_eq!(vendors.label, "GO");
    assert_eq!(vendors.status.note, "Stocked");
    assert!(vendors.tasks[0].completed);
    assert!(vendors.tasks[0].locked);
}

#[test]
fn test_concurrent_viewer_and_admin_writes_all_succeed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.sqlite3");
    let setup = open(&dir);
    let ids: Vec<String> = (0..4)
        .map(|i| setup.add_task(&Actor::admin(), "Vendors", &format!("Task {i}")).unwrap().id)
        .collect();

    let viewer_path = path.clone();
    let viewer_ids = ids.clone();
    let viewer = std::thread::spawn(move || {
        let store = SqliteDocumentStore::with_path(&viewer_path).unwrap();
        let m = ChecklistManager::with_clock(
            store,
            chrono_tz::US::Pacific,
            Box::new(FixedClock::race_morning()),
        );
        viewer_ids
            .iter()
            .map(|id| m.set_task_completion(&Actor::viewer(), id, true).map(|_| ()))
            .collect::<Vec<_>>()
    });
    let admin = std::thread::spawn(move || {
        let store = SqliteDocumentStore::with_path(&path).unwrap();
        let m = ChecklistManager::with_clock(
            store,
            chrono_tz::US::Pacific,
            Box::new(FixedClock::race_morning()),
        );
        (0..10)
            .map(|i| {
                let update = StatusUpdate::status(i % 2 == 1).with_note(format!("check {i}"));
                m.set_category_status(&Actor::admin(), "Vendors", update).map(|_| ())
            })
            .collect::<Vec<_>>()
    });

    for result in viewer.join().unwrap().into_iter().chain(admin.join().unwrap()) {
        result.unwrap();
    }

    let outcome = Board::new(&setup).refresh(&Actor::viewer());
    let vendors = outcome.snapshot().unwrap().category("Vendors").unwrap().clone();
    assert!(vendors.tasks.iter().all(|t| t.completed));
    assert_eq!(vendors.label, "GO");
    assert_eq!(vendors.status.note, "check 9");
}
