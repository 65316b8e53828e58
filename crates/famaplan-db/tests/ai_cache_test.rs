//! Integration tests for the `ai_cache` queries.

use serde_json::json;

use famaplan_db::queries::ai_cache;
use famaplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn missing_key_returns_none() {
    let (pool, db_name) = create_test_db().await;

    let entry = ai_cache::get_entry(&pool, "nada").await.unwrap();
    assert!(entry.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn put_then_get() {
    let (pool, db_name) = create_test_db().await;

    let payload = json!({ "swot": { "pontosFortes": ["a"] } });
    ai_cache::put_entry(&pool, "cafe_em_lisboa", &payload)
        .await
        .unwrap();

    let entry = ai_cache::get_entry(&pool, "cafe_em_lisboa")
        .await
        .unwrap()
        .expect("entry should exist");
    assert_eq!(entry.summary_key, "cafe_em_lisboa");
    assert_eq!(entry.generated_data.0, payload);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn put_overwrites_single_entry_per_key() {
    let (pool, db_name) = create_test_db().await;

    ai_cache::put_entry(&pool, "k", &json!({ "v": 1 })).await.unwrap();
    ai_cache::put_entry(&pool, "k", &json!({ "v": 2 })).await.unwrap();

    let entry = ai_cache::get_entry(&pool, "k").await.unwrap().unwrap();
    assert_eq!(entry.generated_data.0, json!({ "v": 2 }));
    assert_eq!(ai_cache::count_entries(&pool).await.unwrap(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}
