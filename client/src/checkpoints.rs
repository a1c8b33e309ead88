//! Checkpoint progression, lap timing and track layout loading

use log::{info, warn};
use shared::track::{
    checkpoint_positions_from_json, default_checkpoint_positions, CHECKPOINT_COUNT,
};
use shared::{Vec3, CHECKPOINT_CAPTURE_RADIUS, CHECKPOINT_RELEASE_RADIUS};
use std::path::Path;

/// Things the progression machine wants surfaced to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum LapEvent {
    CheckpointPassed { index: usize },
    LapStarted,
    LapFinished { lap_ms: u64, best: bool },
}

#[derive(Debug)]
struct Checkpoint {
    position: Vec3,
    passed: bool,
}

/// Cyclic checkpoint progression and lap clock for the local vehicle
///
/// Exactly one checkpoint is armed at a time; the others are inert until
/// the progression reaches them. A captured checkpoint stays latched
/// until the vehicle leaves the larger release radius, so idling on a
/// gate line cannot fire it twice. Crossing checkpoint 0 starts the lap
/// clock the first time and closes a lap every time after.
pub struct CheckpointTracker {
    checkpoints: Vec<Checkpoint>,
    active: usize,
    lap_started: bool,
    lap_start_ms: u64,
    last_lap_ms: Option<u64>,
    best_lap_ms: Option<u64>,
}

impl CheckpointTracker {
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            checkpoints: positions
                .into_iter()
                .map(|position| Checkpoint {
                    position,
                    passed: false,
                })
                .collect(),
            active: 0,
            lap_started: false,
            lap_start_ms: 0,
            last_lap_ms: None,
            best_lap_ms: None,
        }
    }

    /// Replaces the whole layout, restarting progression and the lap
    /// clock. Used when a different track configuration loads.
    pub fn reload(&mut self, positions: Vec<Vec3>) {
        *self = Self::new(positions);
    }

    /// Runs one published position through the progression machine.
    pub fn observe(&mut self, position: &Vec3, now_ms: u64) -> Vec<LapEvent> {
        let mut events = Vec::new();
        if self.checkpoints.is_empty() {
            return events;
        }

        // Re-arm every latched checkpoint the vehicle has left behind.
        for checkpoint in &mut self.checkpoints {
            if checkpoint.passed
                && position.distance(&checkpoint.position) > CHECKPOINT_RELEASE_RADIUS
            {
                checkpoint.passed = false;
            }
        }

        let index = self.active;
        let gate = &mut self.checkpoints[index];
        if !gate.passed && position.distance(&gate.position) <= CHECKPOINT_CAPTURE_RADIUS {
            gate.passed = true;
            events.push(LapEvent::CheckpointPassed { index });

            if index == 0 {
                if self.lap_started {
                    let lap_ms = now_ms.saturating_sub(self.lap_start_ms);
                    let best = self.best_lap_ms.map_or(true, |current| lap_ms < current);
                    if best {
                        self.best_lap_ms = Some(lap_ms);
                    }
                    self.last_lap_ms = Some(lap_ms);
                    self.lap_start_ms = now_ms;
                    events.push(LapEvent::LapFinished { lap_ms, best });
                } else {
                    self.lap_started = true;
                    self.lap_start_ms = now_ms;
                    events.push(LapEvent::LapStarted);
                }
            }

            self.active = (index + 1) % self.checkpoints.len();
        }

        events
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn lap_started(&self) -> bool {
        self.lap_started
    }

    pub fn last_lap_ms(&self) -> Option<u64> {
        self.last_lap_ms
    }

    pub fn best_lap_ms(&self) -> Option<u64> {
        self.best_lap_ms
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn checkpoint_position(&self, index: usize) -> Option<Vec3> {
        self.checkpoints.get(index).map(|c| c.position)
    }

    /// Moves one checkpoint. The editor is the only caller; the gate
    /// keeps its latched flag and re-arms by distance like any other.
    pub fn set_checkpoint_position(&mut self, index: usize, position: Vec3) -> bool {
        if let Some(checkpoint) = self.checkpoints.get_mut(index) {
            checkpoint.position = position;
            true
        } else {
            false
        }
    }

    /// Index of the closest checkpoint within the given radius of a
    /// point, for the editor's grab.
    pub fn nearest_index(&self, position: &Vec3, max_radius: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, checkpoint) in self.checkpoints.iter().enumerate() {
            let distance = position.distance(&checkpoint.position);
            if distance <= max_radius && best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.checkpoints.iter().map(|c| c.position).collect()
    }
}

/// Loads checkpoint positions from a saved layout file, falling back to
/// the built-in ring when the file is missing or does not fit the track.
pub fn load_checkpoint_positions(path: Option<&Path>) -> Vec<Vec3> {
    let path = match path {
        Some(path) => path,
        None => {
            info!("Using the built-in checkpoint layout");
            return default_checkpoint_positions();
        }
    };

    match std::fs::read_to_string(path) {
        Ok(json) => match checkpoint_positions_from_json(&json, CHECKPOINT_COUNT) {
            Ok(positions) => {
                info!("Loaded checkpoint layout from {}", path.display());
                positions
            }
            Err(e) => {
                warn!("Ignoring layout {}: {}", path.display(), e);
                default_checkpoint_positions()
            }
        },
        Err(e) => {
            warn!("Could not read layout {}: {}", path.display(), e);
            default_checkpoint_positions()
        }
    }
}
