//! Local vehicle sampling and jump detection
//!
//! The publisher sits between the vehicle (whatever provides transforms)
//! and the network loop. Each publish tick it samples the vehicle once,
//! hands the transform back for sending, and runs the sample through an
//! airborne state machine. Jumps are measured from the last grounded
//! height, so a vehicle cresting a plateau does not bank the plateau's
//! altitude as jump height.

use shared::track::Landmark;
use shared::{
    Transform, Vec3, AIRBORNE_MIN_HEIGHT, AIRBORNE_MIN_SPEED, JUMP_REPORT_MIN_AIRTIME_MS,
    JUMP_REPORT_MIN_HEIGHT, LANDMARK_ATTRIBUTION_RADIUS,
};

/// Where the local vehicle's transform comes from each publish tick.
/// Returning None means no vehicle is available right now and nothing
/// should be published.
pub trait TransformSource {
    fn sample(&mut self) -> Option<Transform>;
}

/// A completed jump that cleared both reporting thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedJump {
    /// Peak height above the takeoff surface, rounded to whole units
    pub height: f32,
    /// Seconds spent airborne
    pub airtime: f32,
    /// Landmark the takeoff happened near, if any
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum AirState {
    Grounded,
    Airborne {
        takeoff_ms: u64,
        ground_height: f32,
        max_height: f32,
        landmark: Option<String>,
    },
}

pub struct LocalPublisher {
    source: Box<dyn TransformSource + Send>,
    landmarks: Vec<Landmark>,
    state: AirState,
    last_ground_height: f32,
}

impl LocalPublisher {
    pub fn new(source: Box<dyn TransformSource + Send>, landmarks: Vec<Landmark>) -> Self {
        Self {
            source,
            landmarks,
            state: AirState::Grounded,
            last_ground_height: 0.0,
        }
    }

    /// Samples the vehicle once. Returns the transform to publish and,
    /// on the sample that lands a qualifying jump, the jump to report.
    pub fn poll(&mut self, now_ms: u64) -> (Option<Transform>, Option<DetectedJump>) {
        let transform = match self.source.sample() {
            Some(transform) => transform,
            None => return (None, None),
        };
        let jump = self.observe(&transform, now_ms);
        (Some(transform), jump)
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self.state, AirState::Airborne { .. })
    }

    /// Advances the airborne state machine by one sample
    ///
    /// Airborne means clearing the height floor while carrying real
    /// horizontal speed; a vehicle crawling up a hill never enters the
    /// state no matter how high it gets. Landmark attribution is decided
    /// once, at the takeoff sample.
    fn observe(&mut self, transform: &Transform, now_ms: u64) -> Option<DetectedJump> {
        let airborne_now = transform.position.y > AIRBORNE_MIN_HEIGHT
            && transform.horizontal_speed() > AIRBORNE_MIN_SPEED;

        let previous = std::mem::replace(&mut self.state, AirState::Grounded);
        match previous {
            AirState::Grounded => {
                if airborne_now {
                    self.state = AirState::Airborne {
                        takeoff_ms: now_ms,
                        ground_height: self.last_ground_height,
                        max_height: transform.position.y,
                        landmark: self.nearest_landmark(&transform.position),
                    };
                } else {
                    self.last_ground_height = transform.position.y;
                }
                None
            }

            AirState::Airborne {
                takeoff_ms,
                ground_height,
                mut max_height,
                landmark,
            } => {
                if transform.position.y > max_height {
                    max_height = transform.position.y;
                }

                if airborne_now {
                    self.state = AirState::Airborne {
                        takeoff_ms,
                        ground_height,
                        max_height,
                        landmark,
                    };
                    return None;
                }

                // Landed. The state machine is already back on the ground;
                // decide whether the jump was worth reporting.
                self.last_ground_height = transform.position.y;

                let airtime_ms = now_ms.saturating_sub(takeoff_ms);
                let height = (max_height - ground_height).round().max(0.0);

                if height >= JUMP_REPORT_MIN_HEIGHT && airtime_ms > JUMP_REPORT_MIN_AIRTIME_MS {
                    Some(DetectedJump {
                        height,
                        airtime: airtime_ms as f32 / 1000.0,
                        landmark,
                    })
                } else {
                    None
                }
            }
        }
    }

    fn nearest_landmark(&self, position: &Vec3) -> Option<String> {
        let mut best: Option<(&Landmark, f32)> = None;
        for landmark in &self.landmarks {
            let distance = position.horizontal_distance(&landmark.position);
            if distance <= LANDMARK_ATTRIBUTION_RADIUS
                && best.map_or(true, |(_, best_distance)| distance < best_distance)
            {
                best = Some((landmark, distance));
            }
        }
        best.map(|(landmark, _)| landmark.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedSource {
        samples: std::vec::IntoIter<Option<Transform>>,
    }

    impl ScriptedSource {
        fn new(samples: Vec<Option<Transform>>) -> Self {
            Self {
                samples: samples.into_iter(),
            }
        }
    }

    impl TransformSource for ScriptedSource {
        fn sample(&mut self) -> Option<Transform> {
            self.samples.next().flatten()
        }
    }

    fn moving(x: f32, y: f32, z: f32, speed: f32) -> Transform {
        let mut t = Transform::at(Vec3::new(x, y, z));
        t.velocity = Vec3::new(speed, 0.0, 0.0);
        t
    }

    fn red_ramp() -> Vec<Landmark> {
        vec![Landmark::new("red", Vec3::new(100.0, 0.0, 0.0))]
    }

    fn publisher(samples: Vec<Option<Transform>>) -> LocalPublisher {
        LocalPublisher::new(Box::new(ScriptedSource::new(samples)), red_ramp())
    }

    #[test]
    fn test_clean_jump_is_reported_with_landmark() {
        let mut p = publisher(vec![
            Some(moving(95.0, 0.0, 0.0, 12.0)),
            Some(moving(96.0, 3.0, 0.0, 12.0)),
            Some(moving(97.0, 6.0, 0.0, 12.0)),
            Some(moving(98.0, 0.5, 0.0, 12.0)),
        ]);

        assert_eq!(p.poll(1000).1, None);
        assert_eq!(p.poll(1050).1, None);
        assert!(p.is_airborne());
        assert_eq!(p.poll(1100).1, None);

        let (transform, jump) = p.poll(1700);
        assert!(transform.is_some());
        let jump = jump.unwrap();
        assert_eq!(jump.height, 6.0);
        assert_eq!(jump.landmark.as_deref(), Some("red"));
        assert!((jump.airtime - 0.65).abs() < 1e-6);
        assert!(!p.is_airborne());
    }

    #[test]
    fn test_plateau_height_does_not_count_as_jump() {
        // Parked on a plateau at y=10, then a 1.4 unit hop off it. The
        // hop is measured against the plateau, not sea level, so it
        // rounds to 1 and falls under the height threshold.
        let mut p = publisher(vec![
            Some(moving(0.0, 10.0, 0.0, 1.0)),
            Some(moving(1.0, 11.4, 0.0, 12.0)),
            Some(moving(2.0, 10.0, 0.0, 1.0)),
        ]);

        p.poll(1000);
        p.poll(1100);
        assert!(p.is_airborne());
        let (_, jump) = p.poll(1600);
        assert_eq!(jump, None);
    }

    #[test]
    fn test_slow_climb_never_goes_airborne() {
        let mut p = publisher(vec![
            Some(moving(0.0, 0.0, 0.0, 3.0)),
            Some(moving(1.0, 5.0, 0.0, 3.0)),
            Some(moving(2.0, 0.0, 0.0, 3.0)),
        ]);

        assert_eq!(p.poll(1000).1, None);
        assert_eq!(p.poll(2000).1, None);
        assert!(!p.is_airborne());
        assert_eq!(p.poll(3000).1, None);
    }

    #[test]
    fn test_short_airtime_is_filtered() {
        let mut p = publisher(vec![
            Some(moving(95.0, 0.0, 0.0, 12.0)),
            Some(moving(96.0, 4.0, 0.0, 12.0)),
            Some(moving(97.0, 0.0, 0.0, 12.0)),
        ]);

        p.poll(1000);
        p.poll(1050);
        let (_, jump) = p.poll(1300);
        assert_eq!(jump, None);
    }

    #[test]
    fn test_jump_far_from_landmarks_reports_without_attribution() {
        let mut p = publisher(vec![
            Some(moving(0.0, 0.0, 0.0, 12.0)),
            Some(moving(1.0, 5.0, 0.0, 12.0)),
            Some(moving(2.0, 0.0, 0.0, 12.0)),
        ]);

        p.poll(1000);
        p.poll(1050);
        let jump = p.poll(1600).1.unwrap();
        assert_eq!(jump.landmark, None);
        assert_eq!(jump.height, 5.0);
    }

    #[test]
    fn test_no_vehicle_publishes_nothing() {
        let mut p = publisher(vec![None, None]);
        assert_eq!(p.poll(1000), (None, None));
        assert_eq!(p.poll(1050), (None, None));
    }
}
