// Integration tests for Lume Discovery

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use lume_discovery::core::DiscoveryService;
use lume_discovery::models::{NewPhoto, User, UserParams};
use lume_discovery::services::{EntityStore, EntityWriter, InMemoryStore};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn create_test_user(id: i32, gender: &str, dob: NaiveDate, minutes_ago: i64, days_old: i64) -> User {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    User {
        id,
        username: format!("user{}", id),
        known_as: format!("User {}", id),
        gender: gender.to_string(),
        date_of_birth: dob,
        created: now - Duration::days(days_old),
        last_active: now - Duration::minutes(minutes_ago),
        city: None,
        country: None,
        photos: vec![],
        likers: vec![],
        likees: vec![],
    }
}

/// Thirty users: odd ids female, even ids male, ages spread over 18..=47
async fn create_test_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for id in 1..=30 {
        let gender = if id % 2 == 1 { "female" } else { "male" };
        let age = 17 + id as i32;
        let dob = NaiveDate::from_ymd_opt(2026 - age, 3, 1).unwrap();
        store
            .insert_user(create_test_user(id, gender, dob, id as i64, (31 - id) as i64))
            .await
            .unwrap();
    }
    store
}

fn ids(users: &[User]) -> Vec<i32> {
    users.iter().map(|u| u.id).collect()
}

#[tokio::test]
async fn test_integration_end_to_end_discovery() {
    let store = create_test_store().await;
    let service = DiscoveryService::new(store.clone());

    let mut params = UserParams::for_user(1);
    params.gender = Some("female".to_string());
    params.min_age = 20;
    params.max_age = 30;
    params.page_size = Some(3);

    let page = service.discover_users_on(&params, today()).await.unwrap();

    // Odd ids aged 20..=30 (ids 3..=13), excluding the requester
    assert_eq!(page.total_count, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(ids(&page.items), vec![3, 5, 7]);

    for user in &page.items {
        assert_eq!(user.gender, "female");
        let age = user.age_on(today());
        assert!((20..=30).contains(&age), "age {} out of range", age);
    }

    params.page_number = 2;
    let page = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(ids(&page.items), vec![9, 11, 13]);
}

#[tokio::test]
async fn test_order_by_created() {
    let service = DiscoveryService::new(create_test_store().await);

    let mut params = UserParams::for_user(30);
    params.order_by = Some("created".to_string());
    params.page_size = Some(3);

    let page = service.discover_users_on(&params, today()).await.unwrap();
    // Higher ids were created more recently
    assert_eq!(ids(&page.items), vec![29, 28, 27]);

    params.order_by = Some("nonsense".to_string());
    let unknown = service.discover_users_on(&params, today()).await.unwrap();
    params.order_by = None;
    let default = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(ids(&unknown.items), ids(&default.items));
    assert_eq!(ids(&default.items), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_likers_and_likees() {
    let store = create_test_store().await;
    store.add_like(4, 1).await.unwrap();
    store.add_like(6, 1).await.unwrap();
    store.add_like(1, 6).await.unwrap();
    store.add_like(1, 9).await.unwrap();
    let service = DiscoveryService::new(store);

    let mut params = UserParams::for_user(1);
    params.likers = true;
    let page = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(ids(&page.items), vec![4, 6]);

    let mut params = UserParams::for_user(1);
    params.likees = true;
    let page = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(ids(&page.items), vec![6, 9]);

    // Both flags: mutual likes only. The legacy behaviour returned likers here.
    let mut params = UserParams::for_user(1);
    params.likers = true;
    params.likees = true;
    let page = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(ids(&page.items), vec![6]);
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let service = DiscoveryService::new(create_test_store().await);

    let mut params = UserParams::for_user(2);
    params.max_age = 40;
    params.page_number = 2;
    params.page_size = Some(4);

    let first = service.discover_users_on(&params, today()).await.unwrap();
    let second = service.discover_users_on(&params, today()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_out_of_range_page() {
    let service = DiscoveryService::new(create_test_store().await);

    let mut params = UserParams::for_user(1);
    params.page_number = 10;
    params.page_size = Some(10);

    let page = service.discover_users_on(&params, today()).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 29);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn test_listed_users_carry_photos() {
    let store = create_test_store().await;
    store
        .add_photo(NewPhoto {
            user_id: 2,
            url: "https://cdn.example/2.jpg".to_string(),
            description: Some("beach".to_string()),
        })
        .await
        .unwrap();
    let service = DiscoveryService::new(store.clone());

    let page = service
        .discover_users_on(&UserParams::for_user(1), today())
        .await
        .unwrap();
    let listed = page.items.iter().find(|u| u.id == 2).unwrap();
    assert_eq!(listed.main_photo().map(|p| p.url.as_str()), Some("https://cdn.example/2.jpg"));

    let main = store.find_main_photo(2).await.unwrap().unwrap();
    assert!(main.is_main);
}
