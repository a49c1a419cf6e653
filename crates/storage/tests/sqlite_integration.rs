use codify_core::model::LessonId;
use sqlx::Row;
use storage::Storage;
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!(
        "sqlite:file:{name}?mode=memory&cache=shared"
    ))
    .await
    .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_initialize_is_idempotent() {
    let repo = connect("memdb_idempotent").await;
    let intro = LessonId::new("intro");
    repo.mark_complete(&intro).await.unwrap();

    repo.initialize().await.unwrap();
    repo.initialize().await.unwrap();

    let progress = repo.load_progress().await.unwrap();
    assert_eq!(progress.get(&intro), Some(true));

    let versions = sqlx::query("SELECT version FROM schema_migrations")
        .fetch_all(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].get::<i64, _>("version"), 1);
}

#[tokio::test]
async fn sqlite_mark_complete_then_load() {
    let repo = connect("memdb_mark_complete").await;
    let functions = LessonId::new("functions");
    repo.mark_complete(&functions).await.unwrap();
    repo.mark_complete(&functions).await.unwrap();

    let progress = repo.load_progress().await.unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress.is_complete(&functions));
    assert!(!progress.is_complete(&LessonId::new("intro")));
}

#[tokio::test]
async fn sqlite_reset_all_empties_the_table() {
    let repo = connect("memdb_reset").await;
    repo.reset_all().await.unwrap();
    for id in ["intro", "variables", "control_flow"] {
        repo.mark_complete(&LessonId::new(id)).await.unwrap();
    }
    repo.reset_all().await.unwrap();
    assert!(repo.load_progress().await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_rows_with_null_completion_read_as_incomplete() {
    let repo = connect("memdb_null_completed").await;
    sqlx::query("INSERT INTO progress (lesson_id) VALUES ('variables')")
        .execute(repo.pool())
        .await
        .unwrap();
    let progress = repo.load_progress().await.unwrap();
    assert_eq!(progress.get(&LessonId::new("variables")), Some(false));
}

#[tokio::test]
async fn sqlite_initialize_recreates_a_dropped_table() {
    let repo = connect("memdb_dropped").await;
    sqlx::query("DROP TABLE progress")
        .execute(repo.pool())
        .await
        .unwrap();
    assert!(repo.load_progress().await.is_err());

    repo.initialize().await.unwrap();
    assert!(repo.load_progress().await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_sqlite_wires_the_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let intro = LessonId::new("intro");
    storage.progress.mark_complete(&intro).await.unwrap();
    assert!(storage.progress.load_progress().await.unwrap().is_complete(&intro));
}
