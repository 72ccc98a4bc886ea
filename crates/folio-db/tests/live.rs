//! Live tests for the Postgres counter store using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated database from the sqlx test
//! harness. Run with `DATABASE_URL` set and `--ignored`.

use folio_db::PgCounterStore;
use folio_engagement::CounterStore;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn incr_and_decr_floor(pool: sqlx::PgPool) {
    let store = PgCounterStore::new(pool);
    assert_eq!(store.get("likes:a").await.unwrap(), None);
    assert_eq!(store.incr("likes:a").await.unwrap(), 1);
    assert_eq!(store.incr("likes:a").await.unwrap(), 2);
    assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 1);
    assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 0);
    assert_eq!(store.decr_floor_zero("likes:a").await.unwrap(), 0);
    assert_eq!(store.decr_floor_zero("likes:new").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mget_keeps_request_order(pool: sqlx::PgPool) {
    let store = PgCounterStore::new(pool);
    store.set("views:b", 5).await.unwrap();
    store.set("views:a", 3).await.unwrap();
    let values = store
        .mget(&["views:a".into(), "views:missing".into(), "views:b".into()])
        .await
        .unwrap();
    assert_eq!(values, vec![Some(3), None, Some(5)]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sorted_set_ranges(pool: sqlx::PgPool) {
    let store = PgCounterStore::new(pool);
    for (score, member) in [(10.0, "a"), (20.0, "b"), (30.0, "c")] {
        store.zadd("views:history:p", score, member).await.unwrap();
    }
    assert_eq!(
        store
            .zcount("views:history:p", 15.0, f64::INFINITY)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        store
            .zremrangebyscore("views:history:p", f64::NEG_INFINITY, 10.0)
            .await
            .unwrap(),
        1
    );
    let members = store
        .zrange_by_score("views:history:p", f64::NEG_INFINITY, f64::INFINITY)
        .await
        .unwrap();
    assert_eq!(
        members,
        vec![("b".to_string(), 20.0), ("c".to_string(), 30.0)]
    );
    assert_eq!(
        store.keys_with_prefix("views:history:").await.unwrap(),
        vec!["views:history:p".to_string()]
    );
    store.ping().await.unwrap();
}
