use chrono::{TimeDelta, Utc};
use odam_rs::tracker::{MatchStrategy, TrackerKind};
use odam_rs::{Detection, TrackStore, TrackerConfig};

fn config(kind: TrackerKind, strategy: MatchStrategy) -> TrackerConfig {
    TrackerConfig {
        kind,
        strategy,
        ..Default::default()
    }
}

#[test]
fn test_static_scene_keeps_ids() {
    for kind in [TrackerKind::Simple, TrackerKind::Kalman] {
        for strategy in [MatchStrategy::Greedy, MatchStrategy::Optimal] {
            let mut store = TrackStore::new(config(kind, strategy));
            let dets = vec![
                Detection::from_ltrb(100, 100, 200, 200, "car"),
                Detection::from_ltrb(300, 100, 360, 220, "person"),
            ];
            let t0 = Utc::now();

            let first = store.match_detections(&dets, t0);
            assert_eq!(first.created.len(), 2);

            for i in 1..6 {
                let report = store.match_detections(&dets, t0 + TimeDelta::milliseconds(40 * i));
                // No movement: every entity matched, nothing created
                assert!(report.created.is_empty(), "{kind:?}/{strategy:?}");
                assert_eq!(report.matched.len(), 2);
            }
            let mut ids: Vec<u64> = store.iter().map(|e| e.id()).collect();
            ids.sort_unstable();
            let mut created = first.created.clone();
            created.sort_unstable();
            assert_eq!(ids, created);
        }
    }
}

#[test]
fn test_repeated_detection_grows_one_track() {
    let mut store = TrackStore::new(TrackerConfig {
        max_points_in_track: 100,
        ..Default::default()
    });
    let det = Detection::from_ltrb(10, 10, 50, 50, "car");
    let t0 = Utc::now();
    let id = store.match_detections(&[det.clone()], t0).created[0];

    for i in 1..20 {
        store.match_detections(&[det.clone()], t0 + TimeDelta::milliseconds(40 * i));
        assert_eq!(store.len(), 1);
        let entity = store.get(id).unwrap();
        assert_eq!(entity.history().len(), i as usize + 1);
    }
}

#[test]
fn test_moving_object_keeps_id() {
    let mut store = TrackStore::new(config(TrackerKind::Kalman, MatchStrategy::Greedy));
    let t0 = Utc::now();

    let created = store.match_detections(&[Detection::from_ltrb(100, 100, 160, 200, "car")], t0);
    let id = created.created[0];

    for i in 1..10 {
        let dx = 6 * i;
        let det = Detection::from_ltrb(100 + dx, 100, 160 + dx, 200, "car");
        let report = store.match_detections(&[det], t0 + TimeDelta::milliseconds(40 * i as i64));
        assert_eq!(report.matched, vec![id]);
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn test_history_is_bounded() {
    let mut store = TrackStore::new(TrackerConfig {
        max_points_in_track: 3,
        ..Default::default()
    });
    let t0 = Utc::now();
    for i in 0..8 {
        let det = Detection::from_ltrb(10, 10 + 2 * i, 50, 50 + 2 * i, "car");
        store.match_detections(&[det], t0 + TimeDelta::milliseconds(40 * i as i64));
    }
    let entity = store.iter().next().unwrap();
    assert_eq!(entity.history().len(), 3);
    assert_eq!(entity.last_point(), Some(entity.rect().center()));
}

#[test]
fn test_eviction_after_max_no_match() {
    let mut store = TrackStore::new(TrackerConfig::default());
    let limit = store.config().max_no_match;
    let t0 = Utc::now();
    store.match_detections(&[Detection::from_ltrb(10, 10, 50, 50, "car")], t0);

    for _ in 0..limit {
        let report = store.match_detections(&[], t0);
        assert!(report.evicted.is_empty());
    }
    assert_eq!(store.len(), 1);

    let report = store.match_detections(&[], t0);
    assert_eq!(report.evicted.len(), 1);
    assert!(store.is_empty());
}

#[test]
fn test_ids_are_unique() {
    let mut store = TrackStore::new(TrackerConfig {
        max_no_match: 0,
        ..Default::default()
    });
    let t0 = Utc::now();
    let report = store.match_detections(
        &[
            Detection::from_ltrb(0, 0, 20, 20, "car"),
            Detection::from_ltrb(100, 0, 120, 20, "car"),
        ],
        t0,
    );
    assert_ne!(report.created[0], report.created[1]);

    store.match_detections(&[], t0);
    assert!(store.is_empty());

    // Same place again after eviction: a fresh id
    let again = store.match_detections(&[Detection::from_ltrb(0, 0, 20, 20, "car")], t0);
    assert!(!report.created.contains(&again.created[0]));
}

#[test]
fn test_disjoint_boxes_never_match() {
    for strategy in [MatchStrategy::Greedy, MatchStrategy::Optimal] {
        let mut store = TrackStore::new(TrackerConfig {
            min_iou: 0.0,
            strategy,
            ..Default::default()
        });
        let t0 = Utc::now();
        store.match_detections(&[Detection::from_ltrb(0, 0, 20, 20, "car")], t0);
        let report = store.match_detections(&[Detection::from_ltrb(400, 400, 420, 420, "car")], t0);
        assert!(report.matched.is_empty(), "{strategy:?}");
        assert_eq!(report.created.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
