//! Property tests for the sync listener and power state machine

use proptest::prelude::*;

use weatherface_core::{
    engine::{HIGH_KEY, ICON_KEY, LOW_KEY},
    AssetError, AssetRef, AssetSink, ChangeRecord, Config, FieldValue, Icon, LatestAsset,
    SyncEvents, TimerMode, VisibilityEvents, WatchFace,
};

#[derive(Default)]
struct Requests(Vec<AssetRef>);

impl AssetSink for Requests {
    fn request(&mut self, asset: AssetRef) {
        self.0.push(asset);
    }
}

fn record(path: &str, high: f64, low: f64, asset: Option<u32>) -> ChangeRecord {
    let mut record = ChangeRecord::new(path).unwrap();
    record.insert(HIGH_KEY, FieldValue::Double(high)).unwrap();
    record.insert(LOW_KEY, FieldValue::Double(low)).unwrap();
    if let Some(id) = asset {
        record.insert(ICON_KEY, FieldValue::Asset(AssetRef(id))).unwrap();
    }
    record
}

fn face() -> WatchFace {
    let mut face = WatchFace::new(Config::default());
    face.on_visibility_changed(true);
    face
}

proptest! {
    #[test]
    fn other_paths_leave_state_unchanged(
        path in "/[A-Za-z]{1,12}",
        high in -100.0f64..100.0,
        low in -100.0f64..100.0,
        asset in proptest::option::of(any::<u32>()),
    ) {
        prop_assume!(path != "/CONFIG");
        let mut face = face();
        let before = face.state().clone();
        let mut assets = Requests::default();

        let applied = face.on_data_changed(&[record(&path, high, low, asset)], &mut assets);

        prop_assert_eq!(applied, 0);
        prop_assert_eq!(face.state(), &before);
        prop_assert!(assets.0.is_empty());
    }

    #[test]
    fn config_values_are_truncated(high in -1000.0f64..1000.0, low in -1000.0f64..1000.0) {
        let mut face = face();
        face.on_data_changed(&[record("/CONFIG", high, low, None)], &mut Requests::default());

        prop_assert_eq!(face.state().high.as_str(), (high as i32).to_string());
        prop_assert_eq!(face.state().low.as_str(), (low as i32).to_string());
    }

    #[test]
    fn applying_twice_is_idempotent(
        high in -1000.0f64..1000.0,
        low in -1000.0f64..1000.0,
        asset in proptest::option::of(any::<u32>()),
    ) {
        let update = record("/CONFIG", high, low, asset);

        let mut once = face();
        once.on_data_changed(&[update.clone()], &mut Requests::default());
        let mut twice = face();
        twice.on_data_changed(&[update.clone()], &mut Requests::default());
        twice.on_data_changed(&[update], &mut Requests::default());

        prop_assert_eq!(once.state(), twice.state());
    }

    #[test]
    fn failed_resolution_keeps_icon(which in 0usize..6) {
        let errors = [
            AssetError::Timeout,
            AssetError::ConnectionFailed,
            AssetError::UnknownAsset,
            AssetError::EmptyStream,
            AssetError::Decode,
            AssetError::TooLarge,
        ];
        let mut face = face();
        let icon = Icon::decode(&[1, 0, 1, 0, 0x07, 0xe0]).unwrap();
        prop_assert!(face.on_icon_resolved(Ok(icon.clone())));

        prop_assert!(!face.on_icon_resolved(Err(errors[which])));
        prop_assert_eq!(face.state().weather_icon.as_ref(), Some(&icon));
    }

    #[test]
    fn newest_asset_request_is_pending(
        ids in proptest::collection::vec(any::<u32>(), 1..16),
    ) {
        let mut face = face();
        let mut pending = LatestAsset::new();
        for (i, id) in ids.iter().enumerate() {
            face.on_data_changed(&[record("/CONFIG", i as f64, 0.0, Some(*id))], &mut pending);
        }

        let last = ids.len() - 1;
        prop_assert_eq!(face.state().high.as_str(), last.to_string());
        prop_assert_eq!(pending.take(), ids.last().copied().map(AssetRef));
    }

    #[test]
    fn second_timer_never_runs_hidden_or_ambient(
        toggles in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..32),
    ) {
        let mut face = WatchFace::new(Config::default());
        for (is_visibility, value) in toggles {
            let timer = if is_visibility {
                face.on_visibility_changed(value)
            } else {
                face.on_ambient_mode_changed(value)
            };
            let interactive = !face.state().ambient && face.power().is_visible();
            prop_assert_eq!(timer == TimerMode::Interactive, interactive);
        }
    }
}

#[test]
fn scenario_config_then_other_path() {
    let mut face = face();
    let mut assets = Requests::default();

    face.on_data_changed(&[record("/CONFIG", 25.0, 12.0, None)], &mut assets);
    assert_eq!(face.state().high, "25");
    assert_eq!(face.state().low, "12");

    let mut other = ChangeRecord::new("/OTHER").unwrap();
    other.insert(HIGH_KEY, FieldValue::Double(30.0)).unwrap();
    let before = face.state().clone();
    face.on_data_changed(&[other], &mut assets);
    assert_eq!(face.state(), &before);
}

#[test]
fn scenario_wire_record_applied() {
    let mut buf = [0u8; 128];
    let update = record("/CONFIG", 19.0, 4.0, Some(11));
    let len = update.to_slice(&mut buf).unwrap().len();

    let decoded = ChangeRecord::from_bytes(&buf[..len]).unwrap();
    let mut face = face();
    let mut assets = Requests::default();
    face.on_data_changed(&[decoded], &mut assets);

    assert_eq!(face.state().high, "19");
    assert_eq!(assets.0, vec![AssetRef(11)]);
}
