use polyledger::orm::{apply_migration_files, auto_migrate, Db};
use polyledger::settings::Settings;
use std::sync::Arc;

#[tokio::test]
async fn test_db_basic_crud() {
    use sqlx::FromRow;

    // 1. Create a minimal struct that matches the DB row
    #[derive(Debug, FromRow, PartialEq, Eq)]
    struct Person {
        name: String,
    }

    // 2. Connect and setup schema
    let db = Db::connect(&Settings::default().database_url).await.unwrap();
    db.execute("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    db.execute("INSERT INTO person (name) VALUES ('Alice')")
        .await
        .unwrap();

    // 3. Fetch rows (using sqlx::FromRow)
    let people: Vec<Person> = db.fetch_all("SELECT name FROM person").await.unwrap();

    // 4. Extract names and assert
    let names: Vec<String> = people.into_iter().map(|person| person.name).collect();
    assert_eq!(names, vec!["Alice"]);
}

#[tokio::test]
async fn test_auto_migrate_creates_model_tables() {
    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    auto_migrate(db.clone()).await.unwrap();

    let tables: Vec<(String,)> = db
        .fetch_all("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .await
        .unwrap();
    let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

    assert!(names.contains(&"transactions"));
    assert!(names.contains(&"orders"));
    assert!(names.contains(&"accounts"));
    assert!(names.contains(&"__polyledger_migrations"));
}

#[tokio::test]
async fn test_auto_migrate_is_idempotent() {
    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    auto_migrate(db.clone()).await.unwrap();
    // Second run must detect no changes rather than fail on existing tables.
    auto_migrate(db.clone()).await.unwrap();

    let meta: Vec<(String,)> = db
        .fetch_all("SELECT table_name FROM __polyledger_migrations WHERE table_name IS NOT NULL")
        .await
        .unwrap();
    // One meta row per model, not one per run.
    assert_eq!(meta.len(), 3);
}

#[tokio::test]
async fn test_migrate_creates_owner_index() {
    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    auto_migrate(db.clone()).await.unwrap();

    let indexes: Vec<(String,)> = db
        .fetch_all("SELECT name FROM sqlite_master WHERE type = 'index'")
        .await
        .unwrap();
    assert!(indexes
        .iter()
        .any(|(n,)| n == "idx_transactions_owner"));
}

#[tokio::test]
async fn test_migrate_adds_new_columns_to_existing_table() {
    use polyledger::orm::Model;

    // First schema revision of the same table
    struct GadgetV1;

    impl Model for GadgetV1 {
        fn table_name() -> &'static str {
            "gadgets"
        }

        fn create_table_sql() -> String {
            "CREATE TABLE gadgets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )"
            .to_string()
        }

        fn columns() -> Vec<(String, String)> {
            vec![("name".into(), "TEXT".into())]
        }
    }

    // Second revision declares an extra column
    struct GadgetV2;

    impl Model for GadgetV2 {
        fn table_name() -> &'static str {
            "gadgets"
        }

        fn create_table_sql() -> String {
            "CREATE TABLE gadgets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                color TEXT
            )"
            .to_string()
        }

        fn columns() -> Vec<(String, String)> {
            vec![
                ("name".into(), "TEXT".into()),
                ("color".into(), "TEXT".into()),
            ]
        }
    }

    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    GadgetV1::migrate(db.clone()).await.unwrap();
    GadgetV2::migrate(db.clone()).await.unwrap();

    let cols: Vec<(String,)> = db
        .fetch_all("SELECT name FROM pragma_table_info('gadgets')")
        .await
        .unwrap();
    let names: Vec<&str> = cols.iter().map(|(n,)| n.as_str()).collect();
    assert!(names.contains(&"name"));
    assert!(names.contains(&"color"));

    // The added column is usable straight away
    db.execute("INSERT INTO gadgets (name, color) VALUES ('dial', 'red')")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_apply_migration_files_runs_once_per_file() {
    use std::fs;

    let dir = "test_migrations_orm";
    fs::create_dir_all(dir).unwrap();
    fs::write(
        format!("{}/0001_create_widgets.sql", dir),
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT)",
    )
    .unwrap();

    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    apply_migration_files(db.clone(), dir).await.unwrap();
    // A second pass must skip the already-applied file instead of failing
    // on the existing table.
    apply_migration_files(db.clone(), dir).await.unwrap();

    let applied: Vec<(String,)> = db
        .fetch_all("SELECT filename FROM __polyledger_migrations")
        .await
        .unwrap();
    assert_eq!(applied, vec![("0001_create_widgets.sql".to_string(),)]);

    db.execute("INSERT INTO widgets (name) VALUES ('bolt')")
        .await
        .unwrap();

    fs::remove_dir_all(dir).unwrap();
}
