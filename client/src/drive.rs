//! Built-in transform sources: a scripted demo drive and a spectator

use crate::publisher::TransformSource;
use shared::track::TRACK_RADIUS;
use shared::{Quat, Transform, Vec3, TRANSFORM_PUBLISH_INTERVAL_MS};
use std::f32::consts::TAU;

const DRIVE_SPEED: f32 = 20.0;
const SAMPLE_SECONDS: f32 = TRANSFORM_PUBLISH_INTERVAL_MS as f32 / 1000.0;
const HOP_SAMPLES: u32 = 12;
const HOP_PEAK: f32 = 6.0;
/// Just past the start line, so a few grounded samples precede the hop.
const HOP_TRIGGER_ANGLE: f32 = 0.05;

/// Drives the default ring at a steady pace and hops once per lap off
/// the ramp by the start line. Each sample advances one publish tick.
pub struct ScriptedDrive {
    angle: f32,
    hop_remaining: u32,
    hop_armed: bool,
    laps_remaining: Option<u32>,
}

impl ScriptedDrive {
    pub fn new() -> Self {
        Self {
            angle: 0.0,
            hop_remaining: 0,
            hop_armed: true,
            laps_remaining: None,
        }
    }

    /// Parks the vehicle after the given number of laps. Used by soak
    /// runs that should go quiet instead of circling forever.
    pub fn with_lap_limit(laps: u32) -> Self {
        Self {
            laps_remaining: Some(laps),
            ..Self::new()
        }
    }
}

impl Default for ScriptedDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformSource for ScriptedDrive {
    fn sample(&mut self) -> Option<Transform> {
        if self.laps_remaining == Some(0) {
            return None;
        }

        if self.hop_armed && self.angle >= HOP_TRIGGER_ANGLE {
            self.hop_armed = false;
            self.hop_remaining = HOP_SAMPLES;
        }

        let altitude = if self.hop_remaining > 0 {
            let t = 1.0 - self.hop_remaining as f32 / HOP_SAMPLES as f32;
            self.hop_remaining -= 1;
            HOP_PEAK * 4.0 * t * (1.0 - t)
        } else {
            0.0
        };

        let position = Vec3::new(
            TRACK_RADIUS * self.angle.cos(),
            altitude,
            TRACK_RADIUS * self.angle.sin(),
        );
        let tangent = Vec3::new(-self.angle.sin(), 0.0, self.angle.cos());
        let transform = Transform {
            position,
            orientation: Quat::from_yaw(tangent.x.atan2(tangent.z)),
            velocity: tangent.scale(DRIVE_SPEED),
        };

        self.angle += DRIVE_SPEED * SAMPLE_SECONDS / TRACK_RADIUS;
        if self.angle >= TAU {
            self.angle -= TAU;
            self.hop_armed = true;
            if let Some(laps) = &mut self.laps_remaining {
                *laps -= 1;
            }
        }

        Some(transform)
    }
}

/// Spectator source: joins the session without a vehicle.
pub struct NoVehicle;

impl TransformSource for NoVehicle {
    fn sample(&mut self) -> Option<Transform> {
        None
    }
}
