mod test_harness;

use std::sync::Arc;

use test_harness::*;
use turnkeeper::candidate::{AssignmentType, CandidateId, QueueType};
use turnkeeper::clock::TokioClock;
use turnkeeper::persistence::{
    JsonFilePersistence, PersistencePort, ACTIVE_FILE, COOLDOWNS_FILE, CORRUPT_SUFFIX, EXCEPTIONS_FILE,
    QUEUE_FILE,
};
use turnkeeper::service::RotationService;

fn file_service(dir: &std::path::Path) -> RotationService {
    let mut config = test_config().with_data_dir(dir);
    config.storage.ephemeral = false;
    RotationService::new(
        config,
        Arc::new(RecordingNotifier::default()),
        Arc::new(JsonFilePersistence::new(dir)),
        Arc::new(TokioClock::new(base_time())),
    )
}

#[tokio::test]
async fn test_missing_directory_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::new(dir.path().join("never-created"));
    let snapshot = persistence.load().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert!(snapshot.cooldowns.is_empty());
    assert!(snapshot.active.is_empty());
    assert!(snapshot.exceptions.is_empty());
}

#[tokio::test]
async fn test_mutations_write_all_four_documents() {
    let dir = tempfile::tempdir().unwrap();
    let service = file_service(dir.path());

    service
        .join(candidate(1), veteran(), QueueType::Beginner, "first")
        .await
        .unwrap();
    service
        .join(candidate(2), veteran(), QueueType::Pickup, "")
        .await
        .unwrap();
    service.start(CandidateId(2)).await.unwrap();
    service
        .grant_tenure_exception(&admin(), candidate(3))
        .await
        .unwrap();

    for name in [QUEUE_FILE, COOLDOWNS_FILE, ACTIVE_FILE, EXCEPTIONS_FILE] {
        assert!(dir.path().join(name).exists(), "{} should be written", name);
    }

    let raw = std::fs::read_to_string(dir.path().join(QUEUE_FILE)).unwrap();
    let queue: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(queue["1"]["notes"], "first");
    assert_eq!(queue["1"]["position"], 1);
    assert!(queue.get("2").is_none());

    let snapshot = JsonFilePersistence::new(dir.path()).load().await.unwrap();
    assert_eq!(
        snapshot.active[&CandidateId(2)].assignment_type,
        AssignmentType::Pickup
    );
    assert_eq!(snapshot.cooldowns.len(), 2);
    assert_eq!(snapshot.exceptions[&CandidateId(3)].granted_by.id, admin().id);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = file_service(dir.path());
        for id in 1..=3 {
            service
                .join(candidate(id), veteran(), QueueType::Any, "")
                .await
                .unwrap();
        }
        service
            .set_position(&admin(), CandidateId(3), 1)
            .await
            .unwrap();
    }

    let restarted = file_service(dir.path());
    restarted.restore().await.unwrap();
    let view = restarted.queue_view().await;
    let order: Vec<u64> = view.partitions[0]
        .entries
        .iter()
        .map(|e| e.id().0)
        .collect();
    assert_eq!(order, vec![3, 1, 2]);
    assert!(restarted
        .check_cooldown(CandidateId(1))
        .await
        .cooldown_until
        .is_none());
}

#[tokio::test]
async fn test_corrupt_document_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(QUEUE_FILE), "{ not json").unwrap();
    std::fs::write(dir.path().join(ACTIVE_FILE), "{}").unwrap();

    let snapshot = JsonFilePersistence::new(dir.path()).load().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert!(snapshot.active.is_empty());

    let aside = dir.path().join(format!("{}{}", QUEUE_FILE, CORRUPT_SUFFIX));
    assert_eq!(std::fs::read_to_string(aside).unwrap(), "{ not json");
    assert!(!dir.path().join(QUEUE_FILE).exists());
    assert!(dir.path().join(ACTIVE_FILE).exists());
}

#[tokio::test]
async fn test_explicit_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config().with_data_dir(dir.path());
    config.storage.ephemeral = false;
    config.storage.persist_on_mutation = false;
    let persistence = Arc::new(JsonFilePersistence::new(dir.path()));
    let service = RotationService::new(
        config,
        Arc::new(RecordingNotifier::default()),
        persistence.clone(),
        Arc::new(TokioClock::new(base_time())),
    );

    service
        .join(candidate(1), veteran(), QueueType::Pickup, "")
        .await
        .unwrap();
    assert!(!dir.path().join(QUEUE_FILE).exists());

    service.save().await.unwrap();
    assert_eq!(persistence.load().await.unwrap().queue.len(), 1);

    service.leave(CandidateId(1)).await.unwrap();
    assert_eq!(service.status().await.queued, 0);
    service.load().await.unwrap();
    assert_eq!(service.status().await.queued, 1);
}
