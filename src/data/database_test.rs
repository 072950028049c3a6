//! Database tests

use super::*;
use crate::error::AppError;
use crate::forgefed::{NodeInfo, SourceSoftware};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn host(fqdn: &str) -> FederationHost {
    FederationHost::new(NodeInfo::new(SourceSoftware::Forgejo), fqdn).unwrap()
}

#[tokio::test]
async fn test_database_connection() {
    let (db, _temp_dir) = create_test_db().await;
    assert_eq!(db.count_federation_hosts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_and_find_federation_host() {
    let (db, _temp_dir) = create_test_db().await;

    let created = db.create_federation_host(&host("forge.example")).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.node_info.software_name, "forgejo");
    assert_eq!(created.latest_activity, None);

    let found = db
        .find_federation_host_by_fqdn("Forge.Example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);

    let by_id = db.get_federation_host(created.id).await.unwrap();
    assert_eq!(by_id.host_fqdn, "forge.example");
}

#[tokio::test]
async fn test_find_unknown_host_returns_none() {
    let (db, _temp_dir) = create_test_db().await;
    assert!(
        db.find_federation_host_by_fqdn("nowhere.example")
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        db.get_federation_host(42).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_create_twice_returns_existing_row() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.create_federation_host(&host("forge.example")).await.unwrap();
    let second = db.create_federation_host(&host("forge.example")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(db.count_federation_hosts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_create_yields_single_row() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.create_federation_host(&host("race.example")).await })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(db.count_federation_hosts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_latest_activity() {
    let (db, _temp_dir) = create_test_db().await;
    let mut stored = db.create_federation_host(&host("forge.example")).await.unwrap();

    let activity = Utc::now() - Duration::minutes(1);
    stored.latest_activity = Some(activity);
    db.update_federation_host(&stored).await.unwrap();

    let reread = db.get_federation_host(stored.id).await.unwrap();
    assert_eq!(
        reread.latest_activity.map(|t| t.timestamp_millis()),
        Some(activity.timestamp_millis())
    );
}

#[tokio::test]
async fn test_invalid_hosts_are_never_written() {
    let (db, _temp_dir) = create_test_db().await;

    let mut invalid = host("forge.example");
    invalid.host_fqdn = "Forge.Example".to_string();
    assert!(matches!(
        db.create_federation_host(&invalid).await,
        Err(AppError::NotValid(_))
    ));

    let mut stored = db.create_federation_host(&host("forge.example")).await.unwrap();
    stored.latest_activity = Some(Utc::now() + Duration::hours(1));
    assert!(matches!(
        db.update_federation_host(&stored).await,
        Err(AppError::NotValid(_))
    ));
}

#[tokio::test]
async fn test_invalid_persisted_row_is_rejected_on_read() {
    let (db, _temp_dir) = create_test_db().await;
    let stored = db.create_federation_host(&host("forge.example")).await.unwrap();

    db.overwrite_software_name_for_test(stored.id, "mastodon")
        .await
        .unwrap();

    assert!(matches!(
        db.find_federation_host_by_fqdn("forge.example").await,
        Err(AppError::NotValid(_))
    ));
}

#[tokio::test]
async fn test_instance_actor_keys_inserted_once() {
    let (db, _temp_dir) = create_test_db().await;
    assert!(db.get_instance_actor_keys().await.unwrap().is_none());

    let keys = InstanceActorKeys {
        private_key_pem: "private".to_string(),
        public_key_pem: "public".to_string(),
        created_at: Utc::now(),
    };
    assert!(db.insert_instance_actor_keys_if_empty(&keys).await.unwrap());

    let other = InstanceActorKeys {
        private_key_pem: "other".to_string(),
        ..keys.clone()
    };
    assert!(!db.insert_instance_actor_keys_if_empty(&other).await.unwrap());

    let stored = db.get_instance_actor_keys().await.unwrap().unwrap();
    assert_eq!(stored.private_key_pem, "private");
}
