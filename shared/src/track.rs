//! Track geometry shared by both ends: the default checkpoint ring,
//! the named jump landmarks, and the JSON layout format produced by
//! the in-game track editor.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

pub const DEFAULT_TRACK_ID: &str = "canyon_loop";

///Checkpoints the default track expects; a loaded layout must match.
pub const CHECKPOINT_COUNT: usize = 8;

pub const TRACK_RADIUS: f32 = 100.0;

///A named ramp on the track. Jumps taking off near one are credited
///against its height record.
#[derive(Debug, Clone)]
pub struct Landmark {
    pub id: String,
    pub position: Vec3,
}

impl Landmark {
    pub fn new(id: &str, position: Vec3) -> Self {
        Landmark {
            id: id.to_string(),
            position,
        }
    }
}

///The built-in checkpoint ring, evenly spaced around the circuit.
pub fn default_checkpoint_positions() -> Vec<Vec3> {
    (0..CHECKPOINT_COUNT)
        .map(|i| {
            let angle = i as f32 / CHECKPOINT_COUNT as f32 * std::f32::consts::TAU;
            Vec3::new(TRACK_RADIUS * angle.cos(), 0.0, TRACK_RADIUS * angle.sin())
        })
        .collect()
}

///Ramps on the default track.
pub fn default_landmarks() -> Vec<Landmark> {
    vec![
        Landmark::new("red", Vec3::new(TRACK_RADIUS, 0.0, 0.0)),
        Landmark::new("blue", Vec3::new(-TRACK_RADIUS, 0.0, 0.0)),
        Landmark::new("gold", Vec3::new(0.0, 0.0, -TRACK_RADIUS - 40.0)),
    ]
}

///Saved checkpoint layout, as written by the track editor and read back
///at track-load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackConfig {
    pub track_id: String,
    pub config_name: String,
    pub date: String,
    pub positions: Vec<Vec3>,
}

///Parses a saved layout and checks it against the track's checkpoint
///count. Callers fall back to the built-in ring on any error.
pub fn checkpoint_positions_from_json(
    json: &str,
    expected: usize,
) -> Result<Vec<Vec3>, Box<dyn std::error::Error>> {
    let config: TrackConfig = serde_json::from_str(json)?;
    if config.positions.len() != expected {
        return Err(format!(
            "layout '{}' has {} checkpoint positions, track needs {}",
            config.config_name,
            config.positions.len(),
            expected
        )
        .into());
    }
    Ok(config.positions)
}
