//! Integration tests for the DemoProvider

use frr_adapters::DemoProvider;
use frr_core::provider::{RaceDataProvider, RACE_SESSION};
use frr_core::race;
use frr_core::replay::Replay;
use frr_core::status::{current_status, TrackCondition};
use frr_core::time::TimeOfDay;

fn demo_session(provider: &DemoProvider) -> frr_core::Session {
    provider
        .race_data(2024, "Demo", RACE_SESSION)
        .expect("demo race should load")
}

#[test]
fn test_demo_provider_identity() {
    let provider = DemoProvider::new();
    assert_eq!(provider.key(), "demo");
    assert_eq!(provider.name(), "Demo Race");
}

#[test]
fn test_demo_provider_lists_one_race() {
    let races = DemoProvider::new().list_races().unwrap();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].gp, "Demo");
    assert_eq!(races[0].name, "Demo Grand Prix");
}

#[test]
fn test_demo_provider_rejects_unknown_race() {
    let provider = DemoProvider::new();
    assert!(provider.race_data(2024, "Monaco", RACE_SESSION).is_err());
    assert!(provider.track_outline(2024, "Monaco").is_err());
}

#[test]
fn test_demo_gp_is_case_insensitive() {
    let provider = DemoProvider::with_laps(2);
    assert!(provider.race_data(2024, "demo", RACE_SESSION).is_ok());
}

#[test]
fn test_demo_session_is_deterministic() {
    let provider = DemoProvider::with_laps(3);
    let a = demo_session(&provider);
    let b = demo_session(&provider);

    assert_eq!(a.len(), b.len());
    assert_eq!(a.lap_times, b.lap_times);
    assert_eq!(a.telemetry[40].drivers, b.telemetry[40].drivers);
}

#[test]
fn test_demo_session_metadata() {
    let provider = DemoProvider::with_laps(3);
    let session = demo_session(&provider);

    assert_eq!(session.year, Some(2024));
    assert_eq!(session.session.as_deref(), Some("R"));
    assert_eq!(session.total_laps, 3);
    assert_eq!(session.drivers.len(), 6);
    assert_eq!(session.driver_name("1"), "VER");
    assert!(session.track_length.unwrap() > 3_000.0);
}

#[test]
fn test_demo_samples_are_one_second_apart() {
    let session = demo_session(&DemoProvider::with_laps(2));
    let times: Vec<i64> = session
        .telemetry
        .iter()
        .map(|s| TimeOfDay::parse(&s.time).unwrap().whole_seconds())
        .collect();
    assert!(times.windows(2).all(|w| w[1] - w[0] == 1));
}

#[test]
fn test_demo_every_driver_progresses_monotonically() {
    let session = demo_session(&DemoProvider::with_laps(4));

    for driver in session.drivers.keys() {
        let mut last_lap = 0;
        let mut last_distance = -1.0;
        for sample in &session.telemetry {
            let pos = sample.drivers[driver];
            let lap = pos.lap.unwrap();
            let distance = pos.distance.unwrap();
            assert!(lap >= last_lap, "lap went backwards for {}", driver);
            assert!(distance >= last_distance, "distance went backwards for {}", driver);
            last_lap = lap;
            last_distance = distance;
        }
        assert_eq!(last_lap, 4);
    }
}

#[test]
fn test_demo_pit_lap_has_no_recorded_time() {
    let session = demo_session(&DemoProvider::new());

    let hamilton = &session.lap_times["44"];
    assert!(!hamilton.contains_key(&5));
    assert!(hamilton.contains_key(&4));
    assert!(hamilton.contains_key(&6));

    // the last completed lap scan steps over the pit lap
    assert_eq!(
        race::last_completed_lap(&session, "44", 5).map(|(lap, _)| lap),
        Some(4)
    );
    assert_eq!(session.lap_times["1"].len(), 12);
}

#[test]
fn test_demo_has_safety_car_period() {
    let session = demo_session(&DemoProvider::new());
    let deployed = session
        .track_status
        .iter()
        .find(|e| e.message.as_deref() == Some("SCDeployed"))
        .expect("safety car event");

    let at = TimeOfDay::parse(&deployed.time).unwrap().as_secs_f64();
    assert_eq!(current_status(&session, at + 1.0).condition, TrackCondition::SafetyCar);
    assert!(!session.race_control_messages.is_empty());
}

#[test]
fn test_demo_outline_is_normalized() {
    let provider = DemoProvider::new();
    let outline = provider.track_outline(2024, "Demo").unwrap();

    assert_eq!(outline.path.len(), 240);
    for p in &outline.path {
        assert!(p.x.abs() <= 0.5 + 1e-9 && p.y.abs() <= 0.5 + 1e-9);
    }
    assert!(outline.center.is_some());
    assert!(outline.scale.unwrap() > 0.0);
    assert!(outline.bounds.is_some());

    let sectors = outline.sectors.unwrap();
    assert!(sectors.sector2_start > 0.0);
    assert!(sectors.sector2_start < sectors.sector3_start);
    assert!(sectors.sector3_start < sectors.track_length);
    assert!((sectors.track_length - provider.track_length()).abs() < 1e-9);
}

#[test]
fn test_demo_raw_coordinates_share_outline_normalization() {
    let provider = DemoProvider::with_laps(2);
    let session = demo_session(&provider);
    let outline = provider.track_outline(2024, "Demo").unwrap();
    let center = outline.center.unwrap();
    let scale = outline.scale.unwrap();

    for sample in session.telemetry.iter().step_by(7) {
        for pos in sample.drivers.values() {
            let nx = -(pos.x.unwrap() - center.x) / scale;
            let ny = (pos.y.unwrap() - center.y) / scale;
            // outline is resampled, so allow a little slack at the extremes
            assert!(nx.abs() < 0.52 && ny.abs() < 0.52);
        }
    }
}

#[test]
fn test_demo_session_replays() {
    let provider = DemoProvider::with_laps(3);
    let mut replay = Replay::new();
    replay
        .load(
            demo_session(&provider),
            provider.track_outline(2024, "Demo").unwrap(),
        )
        .unwrap();

    replay.seek(50.0);
    let frame = replay.frame().unwrap();
    assert_eq!(frame.track.len(), 6);
    assert_eq!(frame.circular.len(), 6);
    assert_eq!(frame.leaderboard.len(), 6);
    assert!(frame.fastest_lap.is_some());

    let layout = replay.track_layout().unwrap();
    assert_eq!(layout.path.len(), 240);
    assert_eq!(layout.sectors.len(), 2);
    assert!(layout.circular.is_some());
}
