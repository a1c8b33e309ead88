//! Performance benchmarks for critical session systems

use shared::{Message, Quat, Transform, Vec3};
use std::time::Instant;

fn transform_at(x: f32, z: f32) -> Transform {
    Transform {
        position: Vec3::new(x, 0.0, z),
        orientation: Quat::IDENTITY,
        velocity: Vec3::new(20.0, 0.0, 0.0),
    }
}

/// Benchmarks transform overwrites across a full session
#[test]
fn benchmark_transform_application() {
    use server::registry::SessionRegistry;

    let mut registry = SessionRegistry::new();
    for id in 1..=32 {
        registry.connect(id);
    }

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let id = (i % 32) + 1;
        registry.apply_transform(id as u32, transform_at(i as f32, -(i as f32)));
    }

    let duration = start.elapsed();
    println!(
        "Transform application: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second for 100k overwrites
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot assembly for a joining participant
#[test]
fn benchmark_snapshot_assembly() {
    use server::registry::SessionRegistry;

    let mut registry = SessionRegistry::new();
    for id in 1..=64 {
        registry.connect(id);
        registry.apply_transform(id, transform_at(id as f32 * 3.0, 0.0));
    }

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let snapshot = registry.snapshot_for(1);
        assert_eq!(snapshot.len(), 63);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot assembly: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks jump reporting against the record tables
#[test]
fn benchmark_jump_reporting() {
    use server::records::RecordTracker;

    let landmarks = ["red", "blue", "gold"];
    let mut records = RecordTracker::new(landmarks.iter().map(|l| l.to_string()));

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let landmark = landmarks[i % landmarks.len()];
        let height = (i % 50) as f32;
        let airtime = (i % 30) as f32 / 10.0;
        let _ = records.report_jump(1, "Bencher", height, airtime, Some(landmark));
    }

    let duration = start.elapsed();
    println!(
        "Jump reporting: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks message serialization for a populated snapshot
#[test]
fn benchmark_snapshot_serialization() {
    use bincode::{deserialize, serialize};
    use shared::{ParticipantInfo, PlayerStats, RecordsSnapshot};

    let participants: Vec<ParticipantInfo> = (1..=32)
        .map(|id| ParticipantInfo {
            id,
            name: format!("Racer_{}", id),
            color: "#42a5f5".to_string(),
            transform: transform_at(id as f32 * 5.0, 10.0),
            stats: PlayerStats::default(),
        })
        .collect();

    let message = Message::Snapshot {
        self_id: 33,
        participants,
        records: RecordsSnapshot::default(),
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&message).unwrap();
        let _deserialized: Message = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should handle 10k roundtrips in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks mirror smoothing across a busy session
#[test]
fn benchmark_mirror_smoothing() {
    use client::mirror::MirrorSet;

    let mut mirrors = MirrorSet::new();
    for id in 1..=64 {
        mirrors.on_moved(id, format!("Racer_{}", id), transform_at(0.0, 0.0));
    }

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        if i % 20 == 0 {
            // Fresh targets so the eases never all converge.
            for id in 1..=64 {
                mirrors.on_moved(id, format!("Racer_{}", id), transform_at(i as f32, id as f32));
            }
        }
        mirrors.tick();
    }

    let duration = start.elapsed();
    println!(
        "Mirror smoothing: {} ticks × {} mirrors in {:?} ({:.2} μs/tick)",
        iterations,
        64,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks checkpoint progression over a long drive
#[test]
fn benchmark_checkpoint_progression() {
    use client::checkpoints::CheckpointTracker;
    use shared::track::{default_checkpoint_positions, TRACK_RADIUS};

    let mut tracker = CheckpointTracker::new(default_checkpoint_positions());

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let angle = i as f32 * 0.01;
        let position = Vec3::new(TRACK_RADIUS * angle.cos(), 0.0, TRACK_RADIUS * angle.sin());
        let _ = tracker.observe(&position, i as u64 * 50);
    }

    let duration = start.elapsed();
    println!(
        "Checkpoint progression: {} observations in {:?} ({:.2} ns/obs)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Stress tests record churn with many competing reporters
#[test]
fn stress_test_record_churn() {
    use server::records::RecordTracker;

    let landmarks = ["red", "blue", "gold"];
    let mut records = RecordTracker::new(landmarks.iter().map(|l| l.to_string()));

    let start = Instant::now();

    for i in 0..1000u32 {
        let reporter = (i % 16) + 1;
        let landmark = landmarks[(i % 3) as usize];
        records.report_jump(
            reporter,
            &format!("Racer_{}", reporter),
            i as f32,
            i as f32 / 100.0,
            Some(landmark),
        );
    }

    // Strictly increasing heights: the last reporter per landmark holds it.
    assert_eq!(records.landmark_best("red"), Some(999.0));
    assert_eq!(records.landmark_best("blue"), Some(997.0));
    assert_eq!(records.landmark_best("gold"), Some(998.0));

    let duration = start.elapsed();
    println!("Record churn: 1000 reports in {:?}", duration);

    // Should complete in under 100ms
    assert!(duration.as_millis() < 100);
}
