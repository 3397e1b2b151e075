use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use ups_daemon::{PollLoop, SnapshotBoard};
use ups_devkit::{init_tracing, MockTransport, RecordingActionSink, RecordingReporter, SnapshotBuilder};
use ups_kernel::{Action, DeviceSpec, Inventory, PowerState, ThresholdConfig};

const PRIMARY: &str = "10.0.0.1";
const SECONDARY: &str = "10.0.0.2";
const LEGACY: &str = "10.0.0.3";

fn spec(address: &str, vendor: &str, daemon: bool) -> DeviceSpec {
    DeviceSpec {
        address: address.to_string(),
        community: "public".to_string(),
        vendor: vendor.to_string(),
        display_name: None,
        daemon,
    }
}

fn inventory() -> Inventory {
    let specs: BTreeMap<String, DeviceSpec> = [
        ("primary".to_string(), spec(PRIMARY, "apc_ap96xx", true)),
        ("secondary".to_string(), spec(SECONDARY, "apc", false)),
        ("legacy".to_string(), spec(LEGACY, "cyberpower", false)),
    ]
    .into_iter()
    .collect();
    Inventory::from_specs(&specs)
}

struct Fixture {
    poll_loop: PollLoop<MockTransport, RecordingActionSink>,
    transport: MockTransport,
    sink: RecordingActionSink,
    reporter: RecordingReporter,
}

fn fixture(sink: RecordingActionSink) -> Fixture {
    init_tracing();
    let transport = MockTransport::new();
    transport.apc_online();
    let reporter = RecordingReporter::new();

    let mut poll_loop = PollLoop::new(
        inventory(),
        ThresholdConfig::default(),
        transport.clone(),
        sink.clone(),
    );
    poll_loop.add_reporter(Arc::new(reporter.clone()));

    Fixture {
        poll_loop,
        transport,
        sink,
        reporter,
    }
}

#[tokio::test]
async fn test_unsupported_vendor_never_polled() {
    let mut f = fixture(RecordingActionSink::new());
    f.poll_loop.startup().await;
    f.poll_loop.run_cycle().await;

    let polled: Vec<&str> = f.poll_loop.polled_devices().collect();
    assert_eq!(polled, vec!["primary", "secondary"]);
    assert_eq!(f.transport.requests_to(LEGACY), 0);
    assert!(f.reporter.reports_for("legacy").is_empty());
    assert!(!f.poll_loop.inventory().get("legacy").unwrap().flags().compatible);
}

#[tokio::test]
async fn test_only_daemon_device_dispatches_actions() {
    let mut f = fixture(RecordingActionSink::new());
    f.transport
        .apply(Some(SECONDARY), &SnapshotBuilder::on_battery("secondary", 31.0));

    let outcomes = f.poll_loop.run_cycle().await;
    let secondary = outcomes.iter().find(|(id, _)| id == "secondary").unwrap();
    assert_eq!(secondary.1.actions, vec![Action::Suspend]);
    assert!(f.sink.actions().is_empty());
    assert_eq!(
        f.poll_loop.state_of("secondary").map(|s| s.power_state()),
        Some(PowerState::Suspended)
    );

    f.transport
        .apply(Some(PRIMARY), &SnapshotBuilder::on_battery("primary", 31.0));
    f.poll_loop.run_cycle().await;
    assert_eq!(f.sink.actions(), vec![Action::Suspend]);
}

#[tokio::test]
async fn test_failed_action_keeps_transition() {
    let mut f = fixture(RecordingActionSink::failing());
    f.transport
        .apply(Some(PRIMARY), &SnapshotBuilder::on_battery("primary", 5.0).battery_low());

    f.poll_loop.run_cycle().await;
    f.poll_loop.run_cycle().await;

    assert_eq!(f.sink.count(Action::Shutdown), 1);
    let state = f.poll_loop.state_of("primary").unwrap();
    assert!(state.shutting_down);
}

#[tokio::test]
async fn test_warning_shortens_active_interval() {
    let mut f = fixture(RecordingActionSink::new());
    assert_eq!(f.poll_loop.active_interval(), Duration::from_secs(30));

    // secondary alone does not drive the interval while a daemon device exists
    f.transport.apply(
        Some(SECONDARY),
        &SnapshotBuilder::on_battery("secondary", 2.0).runtime_remaining(8.0),
    );
    f.poll_loop.run_cycle().await;
    assert_eq!(f.poll_loop.active_interval(), Duration::from_secs(30));

    f.transport.apply(
        Some(PRIMARY),
        &SnapshotBuilder::on_battery("primary", 2.0).runtime_remaining(8.0),
    );
    f.poll_loop.run_cycle().await;
    assert_eq!(f.poll_loop.active_interval(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_dead_device_leaves_state_unchanged() {
    let mut f = fixture(RecordingActionSink::new());
    f.poll_loop.startup().await;
    f.transport.set_dead(PRIMARY, true);

    let outcomes = f.poll_loop.run_cycle().await;
    let primary = outcomes.iter().find(|(id, _)| id == "primary").unwrap();
    assert!(!primary.1.evaluated);

    let reports = f.reporter.reports_for("primary");
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].snapshot.responsive);
    assert_eq!(reports[0].state.power_state(), PowerState::Online);
    assert!(f.sink.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_after_current_cycle() {
    let mut f = fixture(RecordingActionSink::new());
    let board = Arc::new(SnapshotBoard::new());
    f.poll_loop.add_reporter(board.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(65)).await;
        trigger.cancel();
    });

    f.poll_loop.run(cancel).await;

    // cycles at 0s, 30s and 60s
    let reports = f.reporter.reports_for("primary");
    assert_eq!(reports.len(), 3);
    assert!(reports
        .windows(2)
        .all(|pair| pair[0].snapshot.taken_at <= pair[1].snapshot.taken_at));
    assert_eq!(f.reporter.len(), 6);

    let latest = board.latest("primary").unwrap();
    assert_eq!(latest.snapshot, reports[2].snapshot);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_runs_no_cycle() {
    let mut f = fixture(RecordingActionSink::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    f.poll_loop.run(cancel).await;
    assert!(f.reporter.is_empty());
    assert_eq!(f.transport.request_count(), 0);
}
