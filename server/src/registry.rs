//! Session registry for the relay server
//!
//! This module owns the authoritative roster of connected participants:
//! - Participant lifecycle (connect, rename, disconnect, idle timeout)
//! - Display name normalization and placeholder generation
//! - Last-known vehicle transforms for late-joiner snapshots
//! - Per-player jump statistics
//!
//! The registry never touches the network; the relay loop feeds it
//! decoded messages and acts on what it returns.

use log::info;
use rand::Rng;
use shared::{ParticipantId, ParticipantInfo, PlayerStats, Transform};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::utils::generate_color;

/// One connected participant and everything the session knows about them.
#[derive(Debug)]
pub struct Participant {
    /// Unique session identifier assigned at accept time
    pub id: ParticipantId,
    /// Current display name, never empty
    pub name: String,
    /// Display color handed out from the palette at connect time
    pub color: String,
    /// Most recent published vehicle transform
    pub transform: Transform,
    /// Jump statistics accumulated over the connection's lifetime
    pub stats: PlayerStats,
    /// Last time any message arrived from this participant
    pub last_seen: Instant,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color,
            transform: Transform::default(),
            stats: PlayerStats::default(),
            last_seen: Instant::now(),
        }
    }

    /// Returns true if no messages have arrived from this participant
    /// within the given duration.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// The wire-format view of this participant.
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            transform: self.transform,
            stats: self.stats,
        }
    }
}

/// Authoritative store of everyone currently in the session
///
/// Ids are assigned by the accept loop and each one is registered here
/// before any message from that connection is processed, so every other
/// operation can treat an unknown id as a stale or hostile sender and
/// drop it.
pub struct SessionRegistry {
    participants: HashMap<ParticipantId, Participant>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
        }
    }

    /// Registers a new connection under the given id
    ///
    /// The participant starts with a generated placeholder name and a
    /// palette color keyed off the id. Returns the wire-format view so
    /// the caller can announce the arrival.
    pub fn connect(&mut self, id: ParticipantId) -> ParticipantInfo {
        let name = placeholder_name();
        let participant = Participant::new(id, name, generate_color(id));
        info!("Participant {} connected as {}", id, participant.name);
        let snapshot = participant.info();
        self.participants.insert(id, participant);
        snapshot
    }

    /// Removes a participant from the session
    ///
    /// Returns true if the participant was present, false if they were
    /// already gone. Both the reader task closing and the idle sweep end
    /// up here, so a second call for the same id must be a no-op.
    pub fn disconnect(&mut self, id: ParticipantId) -> bool {
        if let Some(participant) = self.participants.remove(&id) {
            info!("Participant {} ({}) disconnected", id, participant.name);
            true
        } else {
            false
        }
    }

    /// Applies a rename request and returns the name that actually took
    /// effect
    ///
    /// The proposed name is trimmed; an empty result is replaced with a
    /// fresh placeholder rather than rejected. Returns None for ids not
    /// in the session.
    pub fn set_name(&mut self, id: ParticipantId, proposed: &str) -> Option<String> {
        let participant = self.participants.get_mut(&id)?;
        participant.last_seen = Instant::now();

        let trimmed = proposed.trim();
        let final_name = if trimmed.is_empty() {
            placeholder_name()
        } else {
            trimmed.to_string()
        };
        participant.name = final_name.clone();
        Some(final_name)
    }

    /// Stores a published transform, refreshing the liveness clock.
    /// Returns false for unknown ids so the caller can drop the update.
    pub fn apply_transform(&mut self, id: ParticipantId, transform: Transform) -> bool {
        if let Some(participant) = self.participants.get_mut(&id) {
            participant.last_seen = Instant::now();
            participant.transform = transform;
            true
        } else {
            false
        }
    }

    /// Folds a reported jump into the participant's stats and returns
    /// the updated values, or None for unknown ids.
    pub fn record_jump(
        &mut self,
        id: ParticipantId,
        height: f32,
        airtime: f32,
    ) -> Option<PlayerStats> {
        let participant = self.participants.get_mut(&id)?;
        participant.last_seen = Instant::now();
        participant.stats.apply_jump(height, airtime);
        Some(participant.stats)
    }

    pub fn name_of(&self, id: ParticipantId) -> Option<String> {
        self.participants.get(&id).map(|p| p.name.clone())
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Everyone currently in the session except the given id, for the
    /// snapshot sent to a newly accepted connection.
    pub fn snapshot_for(&self, exclude: ParticipantId) -> Vec<ParticipantInfo> {
        self.participants
            .values()
            .filter(|p| p.id != exclude)
            .map(|p| p.info())
            .collect()
    }

    /// Checks for and removes idle participants
    ///
    /// Removes everyone whose last message is older than the timeout and
    /// returns their ids so the relay loop can announce the departures
    /// and drop the write handles.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ParticipantId> {
        let timed_out: Vec<ParticipantId> = self
            .participants
            .iter()
            .filter(|(_, p)| p.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            self.disconnect(*id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder_name() -> String {
    format!("Player_{}", rand::thread_rng().gen_range(100..1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec3;

    #[test]
    fn test_connect_assigns_placeholder_and_color() {
        let mut registry = SessionRegistry::new();
        let info = registry.connect(1);

        assert_eq!(info.id, 1);
        assert!(info.name.starts_with("Player_"));
        assert!(!info.color.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        assert!(registry.disconnect(1));
        assert!(!registry.disconnect(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_name_trims_and_applies() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        let final_name = registry.set_name(1, "  Dakar  ").unwrap();
        assert_eq!(final_name, "Dakar");
        assert_eq!(registry.name_of(1).as_deref(), Some("Dakar"));
    }

    #[test]
    fn test_set_name_replaces_empty_with_placeholder() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        let final_name = registry.set_name(1, "   ").unwrap();
        assert!(final_name.starts_with("Player_"));
    }

    #[test]
    fn test_set_name_unknown_id() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.set_name(42, "Ghost"), None);
    }

    #[test]
    fn test_apply_transform_unknown_id_is_dropped() {
        let mut registry = SessionRegistry::new();
        assert!(!registry.apply_transform(42, Transform::default()));
    }

    #[test]
    fn test_apply_transform_stores_latest() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        let t = Transform::at(Vec3::new(5.0, 0.0, -3.0));
        assert!(registry.apply_transform(1, t));
        assert_eq!(registry.get(1).unwrap().transform.position.x, 5.0);
    }

    #[test]
    fn test_record_jump_accumulates_stats() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        registry.record_jump(1, 6.0, 0.9).unwrap();
        let stats = registry.record_jump(1, 4.0, 1.1).unwrap();

        assert_eq!(stats.highest_jump, 6.0);
        assert_eq!(stats.total_jumps, 2);
        assert_eq!(stats.last_airtime, 1.1);
        assert_eq!(registry.record_jump(42, 1.0, 0.5), None);
    }

    #[test]
    fn test_snapshot_excludes_requested_id() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);
        registry.connect(2);
        registry.connect(3);

        let snapshot = registry.snapshot_for(2);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|p| p.id != 2));
    }

    #[test]
    fn test_check_timeouts_removes_idle_participants() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);
        registry.connect(2);

        registry
            .participants
            .get_mut(&1)
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(60);

        let evicted = registry.check_timeouts(Duration::from_secs(30));
        assert_eq!(evicted, vec![1]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(2).is_some());
    }

    #[test]
    fn test_fresh_participant_is_not_timed_out() {
        let mut registry = SessionRegistry::new();
        registry.connect(1);

        let evicted = registry.check_timeouts(Duration::from_secs(30));
        assert!(evicted.is_empty());
    }
}
