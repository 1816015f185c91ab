use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};

use giardino::care;
use giardino::db::{MemoryStore, RecordStore, Repository};
use giardino::models::{Category, NewCareEvent, NewPlant, PlantUpdate};
use giardino::{App, AppError, Config, PlantDraft};

async fn sqlite_app(dir: &tempfile::TempDir) -> App {
    App::new(&Config::in_dir(dir.path())).await.unwrap()
}

fn memory_app(dir: &tempfile::TempDir) -> App {
    App::with_store(Arc::new(MemoryStore::new()), &Config::in_dir(dir.path()))
}

async fn both_backends(dir: &tempfile::TempDir) -> Vec<(&'static str, Arc<dyn RecordStore>)> {
    let db_path = dir.path().join("records.db");
    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>),
        (
            "sqlite",
            Arc::new(Repository::new(&db_path.to_string_lossy()).await.unwrap())
                as Arc<dyn RecordStore>,
        ),
    ]
}

fn ficus() -> PlantDraft {
    PlantDraft {
        name: "Ficus".to_string(),
        category: Category::Indoor,
        care_frequency_days: Some(3),
        image_ref: None,
        notes: None,
    }
}

async fn ficus_scenario(app: &App) {
    app.auth().sign_up("alice@example.com", "secret1").await.unwrap();
    let plant = app.add_plant(ficus()).await.unwrap();

    let now = Utc::now();
    assert!(app.plants_at(now).await.unwrap()[0].status.is_due);

    app.log_care(plant.id, None, None).await.unwrap();
    let now = Utc::now();
    assert!(!app.plants_at(now).await.unwrap()[0].status.is_due);
    assert!(!app.plants_at(now + Duration::days(2)).await.unwrap()[0].status.is_due);
    assert!(app.plants_at(now + Duration::days(3)).await.unwrap()[0].status.is_due);
}

#[tokio::test]
async fn test_ficus_due_cycle_sqlite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = sqlite_app(&dir).await;
    ficus_scenario(&app).await;
    app.close().await.unwrap();
}

#[tokio::test]
async fn test_ficus_due_cycle_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    ficus_scenario(&memory_app(&dir)).await;
}

#[tokio::test]
async fn test_duplicate_account_keeps_first_digest() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (backend, store) in both_backends(&dir).await {
        store.create_account("a@x.com", "d1").await.unwrap();
        let err = assert_err!(store.create_account("a@x.com", "d2").await);
        assert!(matches!(err, AppError::EmailTaken), "{}", backend);

        let account = store.find_account_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(account.password_hash, "d1", "{}", backend);
    }
}

#[tokio::test]
async fn test_delete_plant_cascades() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (backend, store) in both_backends(&dir).await {
        let owner = store.create_account("a@x.com", "d").await.unwrap();
        let keep = store
            .create_plant(NewPlant {
                owner_id: owner.id,
                name: "Basilico".to_string(),
                category: Category::Aromatiche,
                care_frequency_days: 1,
                image_ref: None,
                notes: None,
            })
            .await
            .unwrap();
        let doomed = store
            .create_plant(NewPlant {
                owner_id: owner.id,
                name: "Rosa".to_string(),
                category: Category::Fiorite,
                care_frequency_days: 4,
                image_ref: None,
                notes: None,
            })
            .await
            .unwrap();
        for plant_id in [keep.id, doomed.id, doomed.id] {
            store
                .create_care_event(NewCareEvent {
                    plant_id,
                    care_type: "water".to_string(),
                    care_date: Utc::now(),
                    notes: None,
                })
                .await
                .unwrap();
        }

        store.delete_plant(doomed.id).await.unwrap();

        let remaining = store.list_plants_by_owner(owner.id).await.unwrap();
        assert_eq!(remaining, vec![keep.clone()], "{}", backend);
        assert!(store.list_care_events_by_plant(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.list_care_events_by_plant(keep.id).await.unwrap().len(), 1);
        assert_eq!(store.get_plant(doomed.id).await.unwrap(), None);

        // Deleting again is a no-op.
        assert_ok!(store.delete_plant(doomed.id).await);
    }
}

#[tokio::test]
async fn test_update_plant_merges_and_advances_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (backend, store) in both_backends(&dir).await {
        let owner = store.create_account("a@x.com", "d").await.unwrap();
        let plant = store
            .create_plant(NewPlant {
                owner_id: owner.id,
                name: "Monstera".to_string(),
                category: Category::Indoor,
                care_frequency_days: 7,
                image_ref: Some("data:image/png;base64,AAAA".to_string()),
                notes: Some("Repot in spring".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(plant.created_at, plant.updated_at);

        let first = store
            .update_plant(
                plant.id,
                PlantUpdate {
                    name: Some("Monstera deliciosa".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = store
            .update_plant(
                plant.id,
                PlantUpdate {
                    care_frequency_days: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(first.updated_at > plant.updated_at, "{}", backend);
        assert!(second.updated_at > first.updated_at, "{}", backend);
        assert_eq!(second.name, "Monstera deliciosa");
        assert_eq!(second.care_frequency_days, 5);
        assert_eq!(second.image_ref, plant.image_ref);
        assert_eq!(second.notes, plant.notes);
        assert_eq!(second.created_at, plant.created_at);
        assert_eq!(store.get_plant(plant.id).await.unwrap(), Some(second));
    }
}

#[tokio::test]
async fn test_missing_references_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (backend, store) in both_backends(&dir).await {
        let missing = uuid::Uuid::new_v4();

        let err = assert_err!(store.update_plant(missing, PlantUpdate::default()).await);
        assert!(matches!(err, AppError::NotFound { kind: "Plant", .. }), "{}", backend);

        let err = assert_err!(
            store
                .create_care_event(NewCareEvent {
                    plant_id: missing,
                    care_type: "water".to_string(),
                    care_date: Utc::now(),
                    notes: None,
                })
                .await
        );
        assert!(matches!(err, AppError::NotFound { kind: "Plant", .. }), "{}", backend);

        let err = assert_err!(
            store
                .create_plant(NewPlant {
                    owner_id: missing,
                    name: "Ficus".to_string(),
                    category: Category::Indoor,
                    care_frequency_days: 3,
                    image_ref: None,
                    notes: None,
                })
                .await
        );
        assert!(matches!(err, AppError::NotFound { kind: "Account", .. }), "{}", backend);
    }
}

#[tokio::test]
async fn test_invalid_frequency_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = memory_app(&dir);
    app.auth().sign_up("alice@example.com", "secret1").await.unwrap();

    let mut draft = ficus();
    draft.care_frequency_days = Some(0);
    assert!(matches!(app.add_plant(draft).await, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_session_and_records_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let plant_id = {
        let app = sqlite_app(&dir).await;
        app.auth().sign_up("alice@example.com", "secret1").await.unwrap();
        let plant = app.add_plant(ficus()).await.unwrap();
        app.log_care(plant.id, Some("fertilize".to_string()), None)
            .await
            .unwrap();
        app.close().await.unwrap();
        plant.id
    };

    let app = sqlite_app(&dir).await;
    let account = app.current_account().expect("still signed in");
    assert_eq!(account.email, "alice@example.com");

    let detail = app.plant_detail(plant_id).await.unwrap();
    assert_eq!(detail.care_log.len(), 1);
    assert_eq!(detail.care_log[0].care_type, "fertilize");
    assert_eq!(
        care::last_care_date(&detail.care_log),
        Some(detail.care_log[0].care_date)
    );

    app.auth().sign_out().unwrap();
    assert!(app.current_account().is_none());
    assert!(matches!(app.plants().await, Err(AppError::NotSignedIn)));
}

#[tokio::test]
async fn test_sign_in_errors_are_indistinguishable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = sqlite_app(&dir).await;
    app.auth().sign_up("alice@example.com", "secret1").await.unwrap();
    app.auth().sign_out().unwrap();

    let wrong = assert_err!(app.auth().sign_in("alice@example.com", "nope").await);
    let unknown = assert_err!(app.auth().sign_in("carol@example.com", "secret1").await);
    assert_eq!(format!("{:?}", wrong), format!("{:?}", unknown));
    assert!(app.current_account().is_none());
}
