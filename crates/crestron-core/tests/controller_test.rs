#![allow(clippy::unwrap_used)]
// End-to-end tests for `Controller` over an in-memory processor.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use common::{Call, FailKind, FakeApi};
use crestron_core::{
    BridgeConfig, Command, CompositeId, Controller, CoreError, DeviceCategory, DeviceState,
    PollOutcome, PollState, Subtype,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> BridgeConfig {
    BridgeConfig::new("cws.local", SecretString::from("secret-token".to_string()))
}

fn house() -> Arc<FakeApi> {
    let api = FakeApi::new();
    api.set_rooms(Ok(vec![common::room(1, "Kitchen"), common::room(2, "Hall")]));
    api.set_devices(Ok(vec![
        common::dimmer(5, "Pendant", 1, 0),
        common::shade(12, "Blind", 1, 1000),
        common::scene(30, "Movie Night", 2),
    ]));
    api.set_sensors(Ok(vec![common::door(12, "Front Door", 2, "Closed")]));
    api.set_thermostats(Ok(vec![common::heat_pump(3, "Thermostat", 2)]));
    Arc::new(api)
}

fn controller(api: &Arc<FakeApi>) -> Controller<FakeApi> {
    Controller::with_api(config(), Arc::clone(api))
}

fn position(controller: &Controller<FakeApi>, id: &CompositeId) -> u16 {
    match controller.get(id).unwrap().state {
        DeviceState::Shade { position } => position,
        ref other => panic!("expected shade state, got {other:?}"),
    }
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn device_and_sensor_with_same_raw_id_coexist() {
    let api = house();
    let ctrl = controller(&api);

    let report = ctrl.refresh().await.unwrap();
    assert_eq!(report.outcome, PollOutcome::Fresh);
    assert_eq!(report.device_count, 5);

    let blind = ctrl.get(&CompositeId::device(12)).unwrap();
    let door = ctrl.get(&CompositeId::sensor(12)).unwrap();
    assert_eq!(blind.subtype, Subtype::Shade);
    assert_eq!(blind.full_name, "Kitchen Blind");
    assert_eq!(door.subtype, Subtype::DoorSensor);
    assert_eq!(door.full_name, "Hall Front Door");
}

#[tokio::test]
async fn failed_collection_keeps_its_previous_devices() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    api.set_sensors(Err(FailKind::Timeout));
    api.set_devices(Ok(vec![
        common::dimmer(5, "Pendant", 1, 65535),
        common::shade(12, "Blind", 1, 1000),
        common::scene(30, "Movie Night", 2),
    ]));
    let report = ctrl.refresh().await.unwrap();

    assert_eq!(report.outcome, PollOutcome::Partial);
    assert_eq!(report.failures.len(), 1);
    assert!(ctrl.get(&CompositeId::sensor(12)).is_ok());
    assert_eq!(
        ctrl.get(&CompositeId::device(5)).unwrap().state,
        DeviceState::Light {
            on: true,
            level: 65535
        }
    );

    let status = ctrl.current_status();
    assert_eq!(status.state, PollState::Idle);
    assert!(status.stale);
    assert!(status.last_error.is_some());
}

#[tokio::test]
async fn total_failure_keeps_snapshot_and_flags_auth() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    let before = ctrl.snapshot();

    api.fail_session(Some(FailKind::Auth));
    let report = ctrl.refresh().await.unwrap();

    assert_eq!(report.outcome, PollOutcome::Failed);
    assert!(report.changes.is_empty());
    assert!(Arc::ptr_eq(&before, &ctrl.snapshot()));

    let status = ctrl.current_status();
    assert_eq!(status.state, PollState::Failed);
    assert!(status.stale);
    assert!(status.needs_attention);
    assert_eq!(status.consecutive_failures, 1);

    api.fail_session(None);
    let report = ctrl.refresh().await.unwrap();
    assert_eq!(report.outcome, PollOutcome::Fresh);
    let status = ctrl.current_status();
    assert!(!status.stale);
    assert!(!status.needs_attention);
    assert_eq!(status.consecutive_failures, 0);
}

#[tokio::test]
async fn every_collection_failing_is_a_failed_poll() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    api.set_devices(Err(FailKind::Remote));
    api.set_sensors(Err(FailKind::Timeout));
    api.set_thermostats(Err(FailKind::Timeout));
    let report = ctrl.refresh().await.unwrap();

    assert_eq!(report.outcome, PollOutcome::Failed);
    assert_eq!(ctrl.snapshot().len(), 5);
    assert!(!ctrl.current_status().needs_attention);
}

#[tokio::test]
async fn identical_polls_report_no_changes() {
    let api = house();
    let ctrl = controller(&api);

    let first = ctrl.refresh().await.unwrap();
    assert_eq!(first.changes.added.len(), 5);

    let second = ctrl.refresh().await.unwrap();
    assert!(second.changes.is_empty(), "unexpected changes: {:?}", second.changes);
}

#[tokio::test]
async fn room_failure_reuses_previous_names() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    api.set_rooms(Err(FailKind::Timeout));
    let report = ctrl.refresh().await.unwrap();

    assert_eq!(report.outcome, PollOutcome::Partial);
    assert_eq!(
        ctrl.get(&CompositeId::device(5)).unwrap().full_name,
        "Kitchen Pendant"
    );
}

#[tokio::test]
async fn disabled_thermostats_are_not_fetched() {
    let api = house();
    let mut config = config();
    config.enabled_categories.remove(&DeviceCategory::Thermostat);
    let ctrl = Controller::with_api(config, Arc::clone(&api));

    ctrl.refresh().await.unwrap();

    assert_eq!(api.thermostat_fetches.load(Ordering::SeqCst), 0);
    assert!(ctrl.get(&CompositeId::thermostat(3)).is_err());
    assert!(ctrl.get_by_type(Subtype::Thermostat).is_empty());
}

#[tokio::test]
async fn next_poll_overwrites_optimistic_state() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    ctrl.send_command(&CompositeId::device(5), Command::TurnOn { transition: None })
        .await
        .unwrap();
    let lamp = ctrl.get(&CompositeId::device(5)).unwrap();
    assert!(lamp.is_cooling_down());

    // The processor has not caught up yet; its answer still wins.
    ctrl.refresh().await.unwrap();
    let lamp = ctrl.get(&CompositeId::device(5)).unwrap();
    assert_eq!(lamp.state, DeviceState::Light { on: false, level: 0 });
    assert!(!lamp.is_cooling_down());
}

#[tokio::test]
async fn start_fails_on_rejected_token() {
    let api = house();
    api.fail_session(Some(FailKind::Auth));
    let ctrl = controller(&api);

    let err = ctrl.start().await.unwrap_err();
    assert!(matches!(err, CoreError::Authentication { .. }));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn poll_in_flight_makes_another_poll_a_no_op() {
    let api = house();
    let gate = api.hold_devices();
    let ctrl = controller(&api);

    let first = tokio::spawn({
        let ctrl = ctrl.clone();
        async move { ctrl.refresh().await }
    });
    while api.device_fetches.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert!(ctrl.refresh().await.is_none());

    gate.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.outcome, PollOutcome::Fresh);
    assert_eq!(api.device_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(ctrl.current_status().state, PollState::Idle);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slider_commands_are_coalesced() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    let blind = CompositeId::device(12);

    for pct in [10, 40, 70] {
        ctrl.send_command(&blind, Command::SetPosition(pct))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Optimistic state tracks the latest value before anything is sent.
    assert_eq!(position(&ctrl, &blind), 45875);
    assert!(api.calls().is_empty());

    ctrl.flush_commands().await.unwrap();
    assert_eq!(
        api.calls(),
        vec![Call::Shade {
            id: 12,
            position: 45875
        }]
    );
    assert_eq!(ctrl.pending_commands(), 0);
}

#[tokio::test]
async fn unsupported_and_unknown_commands_never_reach_the_network() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    let err = ctrl
        .send_command(&CompositeId::device(12), Command::TurnOn { transition: None })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedCommand { .. }));

    let err = ctrl
        .send_command(&CompositeId::sensor(12), Command::Open)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedCommand { .. }));

    let err = ctrl
        .send_command(&CompositeId::device(99), Command::TurnOn { transition: None })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn stop_resends_live_shade_position() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    api.set_shade_position(12, 30000);

    ctrl.send_command(&CompositeId::device(12), Command::Stop)
        .await
        .unwrap();

    assert_eq!(
        api.calls(),
        vec![Call::Shade {
            id: 12,
            position: 30000
        }]
    );
}

#[tokio::test]
async fn stop_falls_back_to_last_known_position() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    ctrl.send_command(&CompositeId::device(12), Command::Stop)
        .await
        .unwrap();

    assert_eq!(
        api.calls(),
        vec![Call::Shade {
            id: 12,
            position: 1000
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn scene_activation_triggers_a_poll() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.start().await.unwrap();
    assert_eq!(api.device_fetches.load(Ordering::SeqCst), 1);

    ctrl.send_command(&CompositeId::device(30), Command::Activate)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(api.calls(), vec![Call::Scene { id: 30 }]);
    assert_eq!(api.device_fetches.load(Ordering::SeqCst), 2);
    ctrl.shutdown().await;
}

#[tokio::test]
async fn setpoint_is_sent_in_tenths_of_a_degree() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    let id = CompositeId::thermostat(3);

    ctrl.send_command(&id, Command::SetSetpoint(22.5))
        .await
        .unwrap();
    ctrl.send_command(&id, Command::SetHvacMode("cool".into()))
        .await
        .unwrap();

    assert_eq!(
        api.calls(),
        vec![
            Call::Setpoint {
                id: 3,
                setpoint_type: "Heat".into(),
                deci: 225
            },
            Call::Mode {
                id: 3,
                mode: "Cool".into()
            },
        ]
    );
    let t = ctrl.get(&id).unwrap().thermostat().cloned().unwrap();
    assert_eq!(t.setpoint, Some(22.5));
    assert_eq!(t.mode, "Cool");
    assert_eq!(t.setpoint_type, "Cool");
}

#[tokio::test]
async fn setpoint_outside_range_is_rejected() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();

    let err = ctrl
        .send_command(&CompositeId::thermostat(3), Command::SetSetpoint(40.0))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidValue { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sliders_on_different_devices_debounce_independently() {
    let api = house();
    api.set_devices(Ok(vec![
        common::shade(12, "Blind", 1, 0),
        common::shade(13, "Drape", 1, 0),
    ]));
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    let blind = CompositeId::device(12);
    let drape = CompositeId::device(13);

    for (id, pct) in [(blind, 10), (drape, 20), (blind, 40), (drape, 80)] {
        ctrl.send_command(&id, Command::SetPosition(pct)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    ctrl.flush_commands().await.unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.contains(&Call::Shade {
        id: 12,
        position: 26214
    }));
    assert!(calls.contains(&Call::Shade {
        id: 13,
        position: 52428
    }));
}

#[tokio::test(start_paused = true)]
async fn rejected_slider_command_surfaces_on_flush() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    api.fail_commands(Some(FailKind::Remote));

    ctrl.send_command(&CompositeId::device(12), Command::SetPosition(50))
        .await
        .unwrap();

    let err = ctrl.flush_commands().await.unwrap_err();
    assert!(matches!(err, CoreError::Remote { status: 500, .. }));
    assert!(api.calls().is_empty());
    assert_eq!(ctrl.pending_commands(), 0);

    // Reported once.
    ctrl.flush_commands().await.unwrap();
}

#[tokio::test]
async fn rejected_discrete_command_fails_the_call() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    api.fail_commands(Some(FailKind::Remote));

    let err = ctrl
        .send_command(&CompositeId::device(12), Command::Open)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Remote { status: 500, .. }));

    api.fail_commands(Some(FailKind::Timeout));
    let err = ctrl
        .send_command(&CompositeId::thermostat(3), Command::SetSetpoint(20.0))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Transport { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dimmer_transitions_reach_the_processor() {
    let api = house();
    let ctrl = controller(&api);
    ctrl.refresh().await.unwrap();
    let lamp = CompositeId::device(5);

    ctrl.send_command(&lamp, Command::TurnOn { transition: Some(4) })
        .await
        .unwrap();
    ctrl.send_command(
        &lamp,
        Command::SetBrightness {
            percent: 50,
            transition: Some(2),
        },
    )
    .await
    .unwrap();
    ctrl.flush_commands().await.unwrap();
    ctrl.send_command(&lamp, Command::TurnOff { transition: None })
        .await
        .unwrap();

    assert_eq!(
        api.calls(),
        vec![
            Call::Light {
                id: 5,
                level: 65535,
                time: 4
            },
            Call::Light {
                id: 5,
                level: 32768,
                time: 2
            },
            Call::Light {
                id: 5,
                level: 0,
                time: 0
            },
        ]
    );
}
