use std::time::Duration;
use ups_devkit::{SnapshotBuilder, TestHarness};
use ups_kernel::{Action, KernelError, Param, PollMode, PowerState, Threshold, ThresholdConfig, VendorType};

fn capacity_crit_20() -> ThresholdConfig {
    ThresholdConfig {
        battery_capacity: Threshold::new(50.0, 20.0),
        ..ThresholdConfig::default()
    }
}

#[test]
fn test_line_power_stays_online() {
    let mut harness = TestHarness::with_defaults();
    let outcome = harness.feed(SnapshotBuilder::online("ups")).unwrap();

    assert!(outcome.evaluated);
    assert_eq!(outcome.current, PowerState::Online);
    assert!(harness.actions().is_empty());
}

#[test]
fn test_healthy_battery_does_not_shut_down() {
    let mut harness = TestHarness::new(capacity_crit_20());
    harness.feed(SnapshotBuilder::on_battery("ups", 5.0).capacity(90.0)).unwrap();

    assert_eq!(harness.power_state(), PowerState::OnBattery);
    assert_eq!(harness.count(Action::Shutdown), 0);
}

#[test]
fn test_critical_capacity_shuts_down_once() {
    let mut harness = TestHarness::new(capacity_crit_20());
    harness.expect_action(Action::Shutdown, 1);

    harness.feed(SnapshotBuilder::on_battery("ups", 5.0).capacity(15.0)).unwrap();
    assert_eq!(harness.power_state(), PowerState::ShuttingDown);

    // still critical on the following cycles
    harness.feed(SnapshotBuilder::on_battery("ups", 5.5).capacity(14.0)).unwrap();
    harness.feed(SnapshotBuilder::on_battery("ups", 6.0).capacity(13.0)).unwrap();

    harness.verify().unwrap();
    assert_eq!(harness.power_state(), PowerState::ShuttingDown);
}

#[test]
fn test_line_power_cancels_shutdown() {
    let mut harness = TestHarness::new(capacity_crit_20());
    harness
        .expect_action(Action::Shutdown, 1)
        .expect_action(Action::CancelShutdown, 1);

    harness.feed(SnapshotBuilder::on_battery("ups", 5.0).capacity(15.0)).unwrap();
    let outcome = harness.feed(SnapshotBuilder::online("ups").capacity(16.0)).unwrap();

    assert_eq!(outcome.actions, vec![Action::CancelShutdown]);
    assert_eq!(outcome.current, PowerState::Online);
    harness.verify().unwrap();
}

#[test]
fn test_long_outage_suspends_once() {
    let mut harness = TestHarness::with_defaults();
    harness.expect_action(Action::Suspend, 1);

    harness.feed(SnapshotBuilder::on_battery("ups", 31.0)).unwrap();
    harness.feed(SnapshotBuilder::on_battery("ups", 32.0)).unwrap();

    harness.verify().unwrap();
    assert!(!harness.state().overload_fault);
    assert_eq!(harness.power_state(), PowerState::Suspended);
}

#[test]
fn test_low_battery_status_shuts_down() {
    let mut harness = TestHarness::with_defaults();
    let outcome = harness
        .feed(SnapshotBuilder::on_battery("ups", 2.0).battery_low())
        .unwrap();
    assert_eq!(outcome.actions, vec![Action::Shutdown]);
}

#[test]
fn test_eaton_depleted_battery_shuts_down() {
    let mut harness = TestHarness::with_defaults();
    let outcome = harness
        .feed(
            SnapshotBuilder::new("ups")
                .with_vendor(VendorType::EatonPw)
                .time_on_battery(2.0)
                .raw(Param::BatteryStatus, "4"),
        )
        .unwrap();
    assert_eq!(outcome.actions, vec![Action::Shutdown]);
}

#[test]
fn test_warning_selects_fault_interval_until_line_power() {
    let mut harness = TestHarness::with_defaults();

    let outcome = harness
        .feed(SnapshotBuilder::on_battery("ups", 3.0).runtime_remaining(8.0))
        .unwrap();
    assert_eq!(outcome.interval_changed, Some(Duration::from_secs(10)));
    assert_eq!(harness.state().poll_mode, PollMode::Fault);

    // recovering above warning on battery keeps the fault interval
    let outcome = harness
        .feed(SnapshotBuilder::on_battery("ups", 3.5).runtime_remaining(20.0))
        .unwrap();
    assert_eq!(outcome.interval_changed, None);
    assert_eq!(harness.state().poll_interval, Duration::from_secs(10));

    let outcome = harness.feed(SnapshotBuilder::online("ups")).unwrap();
    assert_eq!(outcome.interval_changed, Some(Duration::from_secs(30)));
    assert_eq!(harness.state().poll_mode, PollMode::Normal);
}

#[test]
fn test_overload_is_sticky() {
    let mut harness = TestHarness::with_defaults();
    harness
        .expect_action(Action::Suspend, 1)
        .expect_action(Action::Resume, 0);

    let outcome = harness.feed(SnapshotBuilder::online("ups").load(95.0)).unwrap();
    assert!(outcome.overload_raised);

    for _ in 0..3 {
        let outcome = harness.feed(SnapshotBuilder::online("ups").load(20.0)).unwrap();
        assert!(!outcome.overload_raised);
    }

    harness.verify().unwrap();
    assert!(harness.state().overload_fault);
    assert!(harness.state().suspended);
}

#[test]
fn test_repeated_snapshot_is_idempotent() {
    let mut harness = TestHarness::with_defaults();
    let snapshot = SnapshotBuilder::on_battery("ups", 31.0)
        .build(harness.thresholds(), chrono::Utc::now());

    let first = harness.feed_snapshot(&snapshot).unwrap();
    assert_eq!(first.actions, vec![Action::Suspend]);

    let state = *harness.state();
    let second = harness.feed_snapshot(&snapshot).unwrap();
    assert!(second.actions.is_empty());
    assert_eq!(*harness.state(), state);
}

#[test]
fn test_missing_time_on_battery_skips_cycle() {
    let mut harness = TestHarness::with_defaults();
    let outcome = harness
        .feed(SnapshotBuilder::on_battery("ups", 5.0).unresponsive(Param::TimeOnBattery))
        .unwrap();

    assert!(!outcome.evaluated);
    assert_eq!(harness.power_state(), PowerState::Online);
}

#[test]
fn test_older_snapshot_rejected() {
    let mut harness = TestHarness::with_defaults();
    let now = chrono::Utc::now();
    let builder = SnapshotBuilder::online("ups");

    harness.feed_snapshot(&builder.build(harness.thresholds(), now)).unwrap();
    let stale = builder.build(harness.thresholds(), now - chrono::Duration::seconds(30));

    assert!(matches!(
        harness.feed_snapshot(&stale),
        Err(KernelError::OutOfOrderSnapshot { .. })
    ));
}

#[test]
fn test_poll_cycles_survive_clock_step_back() {
    let mut harness = TestHarness::with_defaults();
    harness.expect_action(Action::Shutdown, 1);
    let t0 = chrono::Utc::now();

    harness.feed_cycle_at(SnapshotBuilder::online("ups"), t0);
    let critical = || SnapshotBuilder::on_battery("ups", 5.0).capacity(3.0).battery_low();

    let first = harness.feed_cycle_at(critical(), t0 - chrono::Duration::seconds(60));
    assert!(first.evaluated);
    assert_eq!(first.actions, vec![Action::Shutdown]);

    let second = harness.feed_cycle_at(critical(), t0 - chrono::Duration::seconds(30));
    assert!(second.evaluated);
    assert!(second.actions.is_empty());

    harness.verify().unwrap();
    assert_eq!(harness.power_state(), PowerState::ShuttingDown);
}

#[test]
fn test_full_outage_sequence() {
    let mut harness = TestHarness::with_defaults();

    harness.feed(SnapshotBuilder::online("ups")).unwrap();
    harness.feed(SnapshotBuilder::on_battery("ups", 16.0)).unwrap();
    harness.feed(SnapshotBuilder::on_battery("ups", 31.0)).unwrap();
    harness
        .feed(SnapshotBuilder::on_battery("ups", 35.0).runtime_remaining(4.0))
        .unwrap();
    harness.feed(SnapshotBuilder::online("ups")).unwrap();

    assert_eq!(
        harness.actions(),
        &[
            Action::Suspend,
            Action::Shutdown,
            Action::CancelShutdown,
            Action::Resume
        ]
    );
    assert_eq!(harness.power_state(), PowerState::Online);
}
