use chrono::{Duration, TimeZone, Utc};

use turnkeeper::candidate::{AssignmentType, CandidateId, CandidateRef, QueueType};
use turnkeeper::config::{ServiceConfig, TimingConfig};
use turnkeeper::scheduler::{
    evaluate, expire, ActiveAssignmentTracker, Expiry, Mode, Partition, QueueEntry, QueueStore,
    RotationSettings,
};
use turnkeeper::state::RotaState;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 20, 0, 0).unwrap()
}

fn player(id: u64) -> CandidateRef {
    CandidateRef::new(id, format!("player{}", id))
}

fn running_state(merged: bool) -> RotaState {
    RotaState::new(RotationSettings::from_config(
        &ServiceConfig::default().running(true).merged(merged),
    ))
}

fn assert_dense(queue: &QueueStore) {
    let positions: Vec<u32> = queue.entries().iter().map(|e| e.position).collect();
    let expected: Vec<u32> = (1..=queue.len() as u32).collect();
    assert_eq!(positions, expected);
}

#[test]
fn test_positions_stay_dense_across_mixed_operations() {
    let mut queue = QueueStore::new();
    for id in 1..=8 {
        queue
            .insert(QueueEntry::new(player(id), QueueType::Any, ""))
            .unwrap();
        assert_dense(&queue);
    }

    let moves: [(u64, i64); 6] = [(8, 1), (1, 8), (4, 3), (5, 100), (2, 2), (6, 1)];
    for (id, slot) in moves {
        let rank = queue.set_position(CandidateId(id), slot).unwrap();
        assert_dense(&queue);
        let expected = slot.min(queue.len() as i64) as u32;
        assert_eq!(rank, expected);
        assert_eq!(queue.get(CandidateId(id)).unwrap().position, expected);
    }

    for id in [3, 8, 5] {
        queue.remove(CandidateId(id)).unwrap();
        assert_dense(&queue);
    }
    assert_eq!(queue.len(), 5);
}

#[test]
fn test_set_position_keeps_relative_order_of_others() {
    let mut queue = QueueStore::new();
    for id in 1..=5 {
        queue
            .insert(QueueEntry::new(player(id), QueueType::Pickup, ""))
            .unwrap();
    }
    queue.set_position(CandidateId(2), 4).unwrap();
    let order: Vec<u64> = queue.entries().iter().map(|e| e.id().0).collect();
    assert_eq!(order, vec![1, 3, 4, 2, 5]);
}

#[test]
fn test_occupancy_ignores_extra_in_any_order() {
    let mut tracker = ActiveAssignmentTracker::new();
    tracker.assign(player(1), AssignmentType::Extra).unwrap();
    tracker.assign(player(2), AssignmentType::Extra).unwrap();
    assert!(!tracker.is_occupied());
    assert!(!tracker.is_active(CandidateId(1)));

    tracker.assign(player(3), AssignmentType::Any).unwrap();
    assert!(tracker.is_occupied());
    assert!(tracker.is_active(CandidateId(1)));

    tracker.release(CandidateId(3)).unwrap();
    assert!(!tracker.is_occupied());
    tracker.release(CandidateId(1)).unwrap();
    tracker.release(CandidateId(2)).unwrap();
    assert!(!tracker.is_occupied());
    assert!(tracker.is_empty());
}

#[test]
fn test_candidate_never_both_queued_and_active() {
    let timing = TimingConfig::default();
    let mut state = running_state(true);
    let veteran = now() - Duration::days(30);
    state
        .join(&player(1), veteran, QueueType::Any, "", &timing, now())
        .unwrap();
    state.promote(CandidateId(1), &timing, now()).unwrap();

    assert!(state.join(&player(1), veteran, QueueType::Any, "", &timing, now()).is_err());
    assert!(state.add_player(player(1), QueueType::Beginner, None).is_err());
    assert!(!state.queue.contains(CandidateId(1)));
    assert!(state.active.contains(CandidateId(1)));
}

#[test]
fn test_any_assignment_blocks_both_split_partitions() {
    let timing = TimingConfig::default();
    let mut state = running_state(false);
    state.add_player(player(1), QueueType::Any, None).unwrap();
    state.add_player(player(2), QueueType::Beginner, None).unwrap();
    state.add_player(player(3), QueueType::Pickup, None).unwrap();

    let assignment = state.promote(CandidateId(1), &timing, now()).unwrap();
    assert_eq!(assignment.assignment_type, AssignmentType::Any);
    assert!(evaluate(&mut state, &timing, now()).is_empty());
}

#[test]
fn test_any_promoted_from_invitation_takes_partition_type() {
    let timing = TimingConfig::default();
    let mut state = running_state(false);
    state.add_player(player(1), QueueType::Any, None).unwrap();

    let offers = evaluate(&mut state, &timing, now());
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].invitation.partition, Partition::Beginner);
    assert_eq!(
        state.queue.get(CandidateId(1)).unwrap().queue_type,
        QueueType::Beginner
    );

    let assignment = state.promote(CandidateId(1), &timing, now()).unwrap();
    assert_eq!(assignment.assignment_type, AssignmentType::Beginner);
}

#[test]
fn test_pickup_may_invite_while_beginner_waits() {
    let timing = TimingConfig::default();
    let mut state = running_state(false);
    state.add_player(player(1), QueueType::Beginner, None).unwrap();

    let first = evaluate(&mut state, &timing, now());
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].invitation.partition, Partition::Beginner);

    state.add_player(player(2), QueueType::Pickup, None).unwrap();
    let second = evaluate(&mut state, &timing, now());
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].invitation.partition, Partition::Pickup);
    assert_eq!(state.pending.len(), 2);
}

#[test]
fn test_skip_then_next_candidate_is_offered() {
    let timing = TimingConfig::default();
    let mut state = running_state(true);
    state.add_player(player(1), QueueType::Pickup, None).unwrap();
    state.add_player(player(2), QueueType::Beginner, None).unwrap();

    let invitation = evaluate(&mut state, &timing, now()).remove(0).invitation;
    let deadline = invitation.deadline;
    let expiry = expire(&mut state, &invitation, &timing, deadline);
    assert!(matches!(expiry, Expiry::Skipped { .. }));
    assert_eq!(
        state.cooldowns.cooldown_until(CandidateId(1), deadline),
        Some(deadline + Duration::seconds(3600))
    );

    let next = evaluate(&mut state, &timing, deadline);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].invitation.candidate.id, CandidateId(2));
    assert_eq!(
        state.queue.get(CandidateId(2)).unwrap().queue_type,
        QueueType::Pickup
    );
}

#[test]
fn test_merge_back_waits_for_split_invitations() {
    let timing = TimingConfig::default();
    let mut state = running_state(false);
    state.add_player(player(1), QueueType::Beginner, None).unwrap();
    state.add_player(player(2), QueueType::Pickup, None).unwrap();
    let offers = evaluate(&mut state, &timing, now());
    assert_eq!(offers.len(), 2);

    state.settings.set_mode(Mode::Merged);
    assert!(evaluate(&mut state, &timing, now()).is_empty());

    for offer in &offers {
        let expiry = expire(&mut state, &offer.invitation, &timing, offer.invitation.deadline);
        assert!(matches!(expiry, Expiry::Abandoned(_)));
    }
    let merged = evaluate(&mut state, &timing, now());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].invitation.partition, Partition::Merged);
    assert_eq!(merged[0].invitation.candidate.id, CandidateId(1));
}
