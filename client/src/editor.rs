//! Track editing: identity gate, checkpoint dragging and layout upload
//!
//! Editing is reserved for one designated identity. The gate recomputes
//! authorization on every rename, force-exits edit mode when the name
//! moves away from the designated one, and refuses to enter edit mode
//! for anyone else. Saving uploads the current checkpoint layout to an
//! optional HTTP endpoint; a failed upload never interrupts the race.

use crate::checkpoints::CheckpointTracker;
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use shared::track::DEFAULT_TRACK_ID;
use shared::{Transform, Vec3, EDITOR_IDENTITY, EDIT_GRAB_RADIUS};
use std::time::Duration;

/// Vehicles slower than this are parked; a parked vehicle holds gates
/// in place instead of dragging them.
const EDIT_DRAG_MIN_SPEED: f32 = 1.0;

const SAVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcomes of editor actions, surfaced to the player as notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Denied,
    Entered,
    Exited,
    Revoked,
    Saved { config_name: String },
    SaveFailed { reason: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePayload<'a> {
    track_id: &'a str,
    config_name: &'a str,
    date: String,
    positions: &'a [Vec3],
    holder: &'a str,
}

/// Authorization gate and editing state for the local player.
pub struct EditorGate {
    authorized: bool,
    edit_mode: bool,
    persist_url: Option<String>,
    http: reqwest::Client,
}

impl EditorGate {
    pub fn new(persist_url: Option<String>) -> Self {
        Self {
            authorized: false,
            edit_mode: false,
            persist_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn in_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Re-evaluates authorization against the confirmed display name.
    /// Losing authorization mid-edit force-exits edit mode.
    pub fn on_name_changed(&mut self, name: &str) -> Option<EditorEvent> {
        self.authorized = name == EDITOR_IDENTITY;
        if !self.authorized && self.edit_mode {
            self.edit_mode = false;
            warn!("Editing authorization revoked, leaving edit mode");
            return Some(EditorEvent::Revoked);
        }
        None
    }

    pub fn toggle_edit_mode(&mut self) -> EditorEvent {
        if !self.authorized {
            return EditorEvent::Denied;
        }
        self.edit_mode = !self.edit_mode;
        if self.edit_mode {
            info!("Entered track edit mode");
            EditorEvent::Entered
        } else {
            info!("Left track edit mode");
            EditorEvent::Exited
        }
    }

    /// Drags the nearest grabbable checkpoint along with a moving
    /// vehicle. Gates stay on the ground plane regardless of the
    /// vehicle's height.
    pub fn drag_checkpoint(
        &self,
        tracker: &mut CheckpointTracker,
        transform: &Transform,
    ) -> Option<usize> {
        if !self.edit_mode || transform.horizontal_speed() <= EDIT_DRAG_MIN_SPEED {
            return None;
        }
        let index = tracker.nearest_index(&transform.position, EDIT_GRAB_RADIUS)?;
        let mut position = transform.position;
        position.y = 0.0;
        tracker.set_checkpoint_position(index, position);
        Some(index)
    }

    /// Uploads the given layout as the track's default configuration.
    /// Requires edit mode; failures are reported, never propagated.
    pub async fn save_as_default(&self, config_name: &str, positions: &[Vec3]) -> EditorEvent {
        if !self.edit_mode {
            return EditorEvent::Denied;
        }
        let url = match &self.persist_url {
            Some(url) => url,
            None => {
                return EditorEvent::SaveFailed {
                    reason: "no persistence endpoint configured".to_string(),
                }
            }
        };

        let payload = SavePayload {
            track_id: DEFAULT_TRACK_ID,
            config_name,
            date: Utc::now().to_rfc3339(),
            positions,
            holder: EDITOR_IDENTITY,
        };

        let response = self
            .http
            .post(url)
            .json(&payload)
            .timeout(SAVE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("Saved track layout '{}'", config_name);
                EditorEvent::Saved {
                    config_name: config_name.to_string(),
                }
            }
            Ok(response) => {
                warn!("Layout upload rejected: {}", response.status());
                EditorEvent::SaveFailed {
                    reason: format!("endpoint returned {}", response.status()),
                }
            }
            Err(e) => {
                warn!("Layout upload failed: {}", e);
                EditorEvent::SaveFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
