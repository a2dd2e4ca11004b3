use storage::documents::{decode_history, decode_progress, encode_history, encode_progress};
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteStore;
use training_core::catalog::ModuleCatalog;
use training_core::model::{
    EngineSettings, ModuleId, ProgressRecord, QuizAttempt, RiskAssessmentEntry, RiskHistory,
};
use training_core::rules;
use training_core::time::fixed_now;

#[tokio::test]
async fn sqlite_set_overwrites_and_remove_clears() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_basic?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    assert_eq!(store.get("missing").await.unwrap(), None);

    store.set("k", "first").await.unwrap();
    store.set("k", "second").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));

    store.remove("k").await.unwrap();
    store.remove("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("first migrate");
    store.migrate().await.expect("second migrate");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn progress_and_history_documents_survive_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_docs?mode=memory&cache=shared")
        .await
        .expect("storage");
    let settings = EngineSettings::default();
    let now = fixed_now();

    let mut record = ProgressRecord::new();
    for id in 1..=3 {
        record.complete_module(ModuleId::new(id), Some(10), now);
    }
    record.record_quiz_attempt(QuizAttempt::new(9, 10, now, settings.pass_percent()).unwrap());
    record.touch(now);
    rules::check_achievements(&mut record, &settings);

    let mut history = RiskHistory::new(settings.history_capacity());
    history.push(RiskAssessmentEntry::assess("Payroll", "Ransomware", 4, 5, now).unwrap());

    let keys = settings.keys();
    storage
        .kv
        .set(&keys.progress, &encode_progress(&record).unwrap())
        .await
        .unwrap();
    storage
        .kv
        .set(&keys.risk_history, &encode_history(&history).unwrap())
        .await
        .unwrap();

    let raw = storage.kv.get(&keys.progress).await.unwrap().expect("progress");
    let decoded = decode_progress(&raw, &settings, &ModuleCatalog::default(), now);
    assert!(decoded.is_clean(), "{:?}", decoded.issues);
    assert_eq!(decoded.record, record);

    let raw = storage.kv.get(&keys.risk_history).await.unwrap().expect("history");
    let decoded = decode_history(&raw, settings.history_capacity());
    assert!(decoded.issues.is_empty());
    assert_eq!(decoded.history, history);
}
