//! Common ground between the relay server and the game client: the wire
//! protocol, 3D math, track geometry, and the tuning constants both ends
//! must agree on.

pub mod math;
pub mod protocol;
pub mod track;

pub use math::{Quat, Transform, Vec3};
pub use protocol::{
    read_message, write_message, AirtimeBest, LandmarkBest, Message, ParticipantId,
    ParticipantInfo, PlayerStats, RecordsSnapshot, MAX_FRAME_BYTES,
};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Cadence of local transform publishes; also serves as the liveness
// signal the server's idle sweep watches for.
pub const TRANSFORM_PUBLISH_INTERVAL_MS: u64 = 50;

pub const MIRROR_APPROACH_FRACTION: f32 = 0.2;
pub const MIRROR_SNAP_EPSILON: f32 = 0.01;

// Capture must stay strictly smaller than release so a vehicle parked
// on the boundary cannot re-trigger the same gate.
pub const CHECKPOINT_CAPTURE_RADIUS: f32 = 12.0;
pub const CHECKPOINT_RELEASE_RADIUS: f32 = 18.0;

pub const AIRBORNE_MIN_HEIGHT: f32 = 1.5;
pub const AIRBORNE_MIN_SPEED: f32 = 8.0;

pub const JUMP_REPORT_MIN_HEIGHT: f32 = 2.0;
pub const JUMP_REPORT_MIN_AIRTIME_MS: u64 = 400;

pub const LANDMARK_ATTRIBUTION_RADIUS: f32 = 60.0;

pub const EDITOR_IDENTITY: &str = "RJ_4_America";
pub const EDIT_GRAB_RADIUS: f32 = 8.0;

pub const IDLE_TIMEOUT_SECS: u64 = 30;
pub const IDLE_SWEEP_INTERVAL_MS: u64 = 1000;

// Get current timestamp in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
