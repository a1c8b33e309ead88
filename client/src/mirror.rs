//! Remote participant mirrors and their display-time smoothing

use shared::{ParticipantId, ParticipantInfo, Transform, Vec3};
use shared::{MIRROR_APPROACH_FRACTION, MIRROR_SNAP_EPSILON};
use std::collections::HashMap;

/// Client-side stand-in for one remote participant
///
/// The mirror holds the latest transform the server relayed and a
/// displayed position that chases it. Each render tick closes a fixed
/// fraction of the remaining gap, which smooths the 50ms update cadence
/// into continuous motion; orientation is taken from the target
/// directly since it reads fine without easing.
#[derive(Debug)]
pub struct RemoteMirror {
    pub id: ParticipantId,
    name: String,
    color: String,
    displayed: Vec3,
    target: Transform,
}

impl RemoteMirror {
    /// Materializes a mirror exactly at its target, so participants from
    /// a snapshot appear in place instead of gliding in from the origin.
    pub fn new(id: ParticipantId, name: String, color: String, transform: Transform) -> Self {
        Self {
            id,
            name,
            color,
            displayed: transform.position,
            target: transform,
        }
    }

    pub fn from_info(info: ParticipantInfo) -> Self {
        Self::new(info.id, info.name, info.color, info.transform)
    }

    pub fn set_target(&mut self, transform: Transform) {
        self.target = transform;
    }

    /// Advances the displayed position one render tick toward the target.
    pub fn tick(&mut self) {
        self.displayed = self
            .displayed
            .lerp(&self.target.position, MIRROR_APPROACH_FRACTION);
        if self.displayed.distance(&self.target.position) <= MIRROR_SNAP_EPSILON {
            self.displayed = self.target.position;
        }
    }

    pub fn displayed_position(&self) -> Vec3 {
        self.displayed
    }

    pub fn target_position(&self) -> Vec3 {
        self.target.position
    }

    pub fn orientation(&self) -> shared::Quat {
        self.target.orientation
    }

    /// Velocity from the latest delta, for speedometer-style displays.
    pub fn velocity(&self) -> Vec3 {
        self.target.velocity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// All remote mirrors, keyed by participant id. The local player is
/// never in here; the client filters its own id out before dispatch.
#[derive(Debug, Default)]
pub struct MirrorSet {
    mirrors: HashMap<ParticipantId, RemoteMirror>,
}

impl MirrorSet {
    pub fn new() -> Self {
        Self {
            mirrors: HashMap::new(),
        }
    }

    /// Replaces the whole set from a session snapshot.
    pub fn apply_snapshot(&mut self, participants: Vec<ParticipantInfo>) {
        self.mirrors = participants
            .into_iter()
            .map(|info| (info.id, RemoteMirror::from_info(info)))
            .collect();
    }

    pub fn on_joined(&mut self, participant: ParticipantInfo) {
        match self.mirrors.get_mut(&participant.id) {
            Some(mirror) => {
                // Already materialized from an early movement delta;
                // keep the smoothing state and take the richer fields.
                mirror.set_name(participant.name);
                mirror.color = participant.color;
                mirror.set_target(participant.transform);
            }
            None => {
                self.mirrors
                    .insert(participant.id, RemoteMirror::from_info(participant));
            }
        }
    }

    /// Applies a movement delta, materializing the mirror if the join
    /// announcement has not arrived yet.
    pub fn on_moved(&mut self, id: ParticipantId, name: String, transform: Transform) {
        match self.mirrors.get_mut(&id) {
            Some(mirror) => {
                mirror.set_name(name);
                mirror.set_target(transform);
            }
            None => {
                self.mirrors
                    .insert(id, RemoteMirror::new(id, name, String::new(), transform));
            }
        }
    }

    /// Swaps the display label, returning the previous name so the
    /// caller can announce the change. None means no mirror exists for
    /// the id; callers treat that as a stale broadcast and ignore it.
    pub fn on_name_changed(&mut self, id: ParticipantId, name: &str) -> Option<String> {
        let mirror = self.mirrors.get_mut(&id)?;
        let old = std::mem::replace(&mut mirror.name, name.to_string());
        Some(old)
    }

    /// Removes a departed participant, returning its display name so
    /// the caller can announce who left.
    pub fn on_left(&mut self, id: ParticipantId) -> Option<String> {
        self.mirrors.remove(&id).map(|m| m.name)
    }

    /// Advances every mirror one render tick.
    pub fn tick(&mut self) {
        for mirror in self.mirrors.values_mut() {
            mirror.tick();
        }
    }

    pub fn get(&self, id: ParticipantId) -> Option<&RemoteMirror> {
        self.mirrors.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteMirror> {
        self.mirrors.values()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerStats;

    fn info(id: ParticipantId, name: &str, position: Vec3) -> ParticipantInfo {
        ParticipantInfo {
            id,
            name: name.to_string(),
            color: "teal".to_string(),
            transform: Transform::at(position),
            stats: PlayerStats::default(),
        }
    }

    #[test]
    fn test_snapshot_materializes_in_place() {
        let mut set = MirrorSet::new();
        set.apply_snapshot(vec![info(1, "Dakar", Vec3::new(40.0, 0.0, -7.0))]);

        let mirror = set.get(1).unwrap();
        assert_eq!(mirror.displayed_position(), Vec3::new(40.0, 0.0, -7.0));
        assert_eq!(mirror.name(), "Dakar");
    }

    #[test]
    fn test_tick_strictly_shrinks_the_gap() {
        let mut mirror = RemoteMirror::new(
            1,
            "Dakar".to_string(),
            "teal".to_string(),
            Transform::at(Vec3::ZERO),
        );
        mirror.set_target(Transform::at(Vec3::new(10.0, 0.0, 0.0)));

        let mut last = mirror.displayed_position().distance(&mirror.target_position());
        for _ in 0..20 {
            mirror.tick();
            let gap = mirror.displayed_position().distance(&mirror.target_position());
            assert!(gap < last);
            last = gap;
        }
    }

    #[test]
    fn test_tick_snaps_inside_epsilon() {
        let mut mirror = RemoteMirror::new(
            1,
            "Dakar".to_string(),
            "teal".to_string(),
            Transform::at(Vec3::ZERO),
        );
        mirror.set_target(Transform::at(Vec3::new(0.03, 0.0, 0.0)));

        for _ in 0..30 {
            mirror.tick();
        }
        assert_eq!(mirror.displayed_position(), Vec3::new(0.03, 0.0, 0.0));
    }

    #[test]
    fn test_movement_from_unknown_id_materializes_a_mirror() {
        let mut set = MirrorSet::new();
        set.on_moved(
            5,
            "Baja".to_string(),
            Transform::at(Vec3::new(1.0, 0.0, 1.0)),
        );

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(5).unwrap().displayed_position(), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_joined_after_early_movement_keeps_smoothing_state() {
        let mut set = MirrorSet::new();
        set.on_moved(5, "Baja".to_string(), Transform::at(Vec3::ZERO));
        set.on_moved(5, "Baja".to_string(), Transform::at(Vec3::new(10.0, 0.0, 0.0)));
        set.tick();
        let partway = set.get(5).unwrap().displayed_position();

        set.on_joined(info(5, "Baja", Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(set.get(5).unwrap().displayed_position(), partway);
        assert_eq!(set.get(5).unwrap().color(), "teal");
    }

    #[test]
    fn test_name_change_applies_only_to_known_mirrors() {
        let mut set = MirrorSet::new();
        set.apply_snapshot(vec![info(1, "Dakar", Vec3::ZERO)]);

        assert_eq!(set.on_name_changed(1, "RJ_4_America").as_deref(), Some("Dakar"));
        assert_eq!(set.get(1).unwrap().name(), "RJ_4_America");
        assert_eq!(set.on_name_changed(99, "Ghost"), None);
    }

    #[test]
    fn test_departure_removes_the_mirror() {
        let mut set = MirrorSet::new();
        set.apply_snapshot(vec![info(1, "Dakar", Vec3::ZERO), info(2, "Baja", Vec3::ZERO)]);

        assert_eq!(set.on_left(1).as_deref(), Some("Dakar"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.on_left(1), None);
    }
}
