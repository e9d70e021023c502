use nantimmo_core::traits::ListingStore;
use nantimmo_db::ListingRepository;

use crate::integration::common::{date, listing, setup_test_db};

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let (pool, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    repo.ensure_schema().await.unwrap();
    repo.ensure_schema().await.unwrap();

    repo.health_check().await.unwrap();
}

#[tokio::test]
async fn ensure_schema_upgrades_legacy_table() {
    let (pool, _container) = setup_test_db().await;

    sqlx::query("DROP TABLE properties").execute(&pool).await.unwrap();
    sqlx::query(
        r#"CREATE TABLE properties (
            id SERIAL PRIMARY KEY,
            site TEXT,
            title TEXT,
            price TEXT,
            price_numeric INTEGER,
            description TEXT,
            url TEXT,
            image_url TEXT,
            scraped_date TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let repo = ListingRepository::new(pool);
    repo.ensure_schema().await.unwrap();
    repo.ensure_schema().await.unwrap();

    // "345 000 € soit 4 200 €/m²" concatenates past i32::MAX.
    let mut wide_price = listing(Some("wide.jpg"), date(9));
    wide_price.price_numeric = Some(3_450_004_200);

    repo.insert_listings(&[listing(Some("legacy.jpg"), date(10)), wide_price])
        .await
        .unwrap();
    let stored = repo.list_listings().await.unwrap();

    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].listing.square_meters, Some(45));
    assert_eq!(stored[0].listing.price_numeric, Some(345_000));
    assert_eq!(stored[1].listing.image_url.as_deref(), Some("wide.jpg"));
    assert_eq!(stored[1].listing.price_numeric, Some(3_450_004_200));
}

#[tokio::test]
async fn insert_and_read_back() {
    let (pool, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    let written = repo
        .insert_listings(&[listing(Some("a.jpg"), date(10)), listing(None, date(10))])
        .await
        .unwrap();
    assert_eq!(written, 2);

    let stored = repo.list_listings().await.unwrap();
    assert_eq!(stored.len(), 2);

    let first = stored
        .iter()
        .find(|s| s.listing.image_url.as_deref() == Some("a.jpg"))
        .expect("Should find the listing");
    assert_eq!(first.listing, listing(Some("a.jpg"), date(10)));
    assert!(first.id > 0);
    assert!(first.created_at.is_some());
}

#[tokio::test]
async fn known_image_urls_skips_nulls() {
    let (pool, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    repo.insert_listings(&[
        listing(Some("a.jpg"), date(10)),
        listing(Some("b.jpg"), date(11)),
        listing(None, date(11)),
    ])
    .await
    .unwrap();

    let known = repo.known_image_urls().await.unwrap();

    assert_eq!(known.len(), 2);
    assert!(known.contains("a.jpg"));
    assert!(known.contains("b.jpg"));
}

#[tokio::test]
async fn list_orders_by_date_then_id_descending() {
    let (pool, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    repo.insert_listings(&[
        listing(Some("old-1.jpg"), date(9)),
        listing(Some("new-1.jpg"), date(12)),
    ])
    .await
    .unwrap();
    repo.insert_listings(&[
        listing(Some("old-2.jpg"), date(9)),
        listing(Some("new-2.jpg"), date(12)),
    ])
    .await
    .unwrap();

    let stored = repo.list_listings().await.unwrap();
    let images: Vec<_> = stored
        .iter()
        .map(|s| s.listing.image_url.as_deref().unwrap())
        .collect();

    assert_eq!(images, vec!["new-2.jpg", "new-1.jpg", "old-2.jpg", "old-1.jpg"]);
}

#[tokio::test]
async fn large_batch_is_chunked() {
    let (pool, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    let batch: Vec<_> = (0..8_000)
        .map(|i| listing(Some(&format!("img-{i}.jpg")), date(10)))
        .collect();

    let written = repo.insert_listings(&batch).await.unwrap();

    assert_eq!(written, 8_000);
    assert_eq!(repo.known_image_urls().await.unwrap().len(), 8_000);
}

#[tokio::test]
async fn trait_object_round_trip() {
    let (pool, _container) = setup_test_db().await;
    let store = ListingRepository::new(pool);

    async fn write_via_trait<S: ListingStore>(store: &S) -> u64 {
        store
            .insert_listings(&[listing(Some("t.jpg"), date(10))])
            .await
            .unwrap()
    }

    assert_eq!(write_via_trait(&store).await, 1);
    assert_eq!(ListingStore::list_listings(&store).await.unwrap().len(), 1);
}
