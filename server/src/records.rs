//! Session-wide jump records
//!
//! Tracks the best jump height over each named landmark plus the single
//! longest airtime anyone has managed. Records only ever move upward:
//! a report must strictly beat the standing value to take a record, so
//! replaying the same report or trading equal values never flaps the
//! holder.

use shared::{AirtimeBest, LandmarkBest, ParticipantId, RecordsSnapshot};
use std::collections::HashMap;

#[derive(Debug)]
struct LandmarkEntry {
    best: f32,
    holder: Option<(ParticipantId, String)>,
}

/// What a single jump report changed, so the relay loop knows which
/// announcements to fan out.
#[derive(Debug, Default, PartialEq)]
pub struct JumpOutcome {
    /// Landmark id and the new best height, when a landmark record fell
    pub landmark_record: Option<(String, f32)>,
    /// New best airtime, when the session record fell
    pub airtime_record: Option<f32>,
}

/// In-memory record table for one server run. The set of landmarks is
/// fixed at construction; reports naming anything else are ignored.
pub struct RecordTracker {
    landmarks: HashMap<String, LandmarkEntry>,
    best_airtime: f32,
    airtime_holder: Option<(ParticipantId, String)>,
}

impl RecordTracker {
    pub fn new<I>(landmark_ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let landmarks = landmark_ids
            .into_iter()
            .map(|id| {
                (
                    id,
                    LandmarkEntry {
                        best: 0.0,
                        holder: None,
                    },
                )
            })
            .collect();
        Self {
            landmarks,
            best_airtime: 0.0,
            airtime_holder: None,
        }
    }

    /// Runs one jump report through both record tables
    ///
    /// The landmark step only applies when the report names a landmark
    /// this track knows; an unknown or missing landmark never blocks the
    /// airtime step. Ties leave the standing holder in place.
    pub fn report_jump(
        &mut self,
        reporter: ParticipantId,
        reporter_name: &str,
        height: f32,
        airtime: f32,
        landmark: Option<&str>,
    ) -> JumpOutcome {
        let mut outcome = JumpOutcome::default();

        if let Some(landmark_id) = landmark {
            if let Some(entry) = self.landmarks.get_mut(landmark_id) {
                if height > entry.best {
                    entry.best = height;
                    entry.holder = Some((reporter, reporter_name.to_string()));
                    outcome.landmark_record = Some((landmark_id.to_string(), height));
                }
            }
        }

        if airtime > self.best_airtime {
            self.best_airtime = airtime;
            self.airtime_holder = Some((reporter, reporter_name.to_string()));
            outcome.airtime_record = Some(airtime);
        }

        outcome
    }

    /// Current records in wire form, for the snapshot sent to new
    /// connections. Landmarks nobody has claimed are omitted.
    pub fn snapshot(&self) -> RecordsSnapshot {
        let mut landmarks: Vec<LandmarkBest> = self
            .landmarks
            .iter()
            .filter_map(|(id, entry)| {
                entry.holder.as_ref().map(|(holder, holder_name)| LandmarkBest {
                    landmark: id.clone(),
                    height: entry.best,
                    holder: *holder,
                    holder_name: holder_name.clone(),
                })
            })
            .collect();
        landmarks.sort_by(|a, b| a.landmark.cmp(&b.landmark));

        let airtime = self
            .airtime_holder
            .as_ref()
            .map(|(holder, holder_name)| AirtimeBest {
                airtime: self.best_airtime,
                holder: *holder,
                holder_name: holder_name.clone(),
            });

        RecordsSnapshot { landmarks, airtime }
    }

    pub fn landmark_best(&self, landmark: &str) -> Option<f32> {
        self.landmarks
            .get(landmark)
            .and_then(|e| e.holder.as_ref().map(|_| e.best))
    }

    pub fn best_airtime(&self) -> Option<f32> {
        self.airtime_holder.as_ref().map(|_| self.best_airtime)
    }
}
