use ups_devkit::{init_tracing, MockTransport, SnapshotBuilder};
use ups_kernel::inventory::probe;
use ups_kernel::{
    Category, DeviceDescriptor, DeviceSpec, KernelError, Param, Reading, Severity, SnapshotReader,
    ThresholdConfig, VendorType,
};

const ADDRESS: &str = "10.0.0.21";

fn device(vendor: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(
        "rack",
        &DeviceSpec {
            address: ADDRESS.to_string(),
            community: "public".to_string(),
            vendor: vendor.to_string(),
            display_name: None,
            daemon: true,
        },
    )
}

fn oid(param: Param) -> &'static str {
    VendorType::ApcAp96xx
        .dialect()
        .lookup(param)
        .map(|spec| spec.oid)
        .unwrap_or_default()
}

fn requests_for(transport: &MockTransport, param: Param) -> usize {
    transport.requests().iter().filter(|r| r.oid == oid(param)).count()
}

#[tokio::test]
async fn test_dynamic_categories_decode() {
    init_tracing();
    let transport = MockTransport::new();
    transport.apc_online();
    let thresholds = ThresholdConfig::default();
    let mut ups = device("apc_ap96xx");

    let snapshot = SnapshotReader::new(&transport, &thresholds)
        .read_categories(&mut ups, Category::DYNAMIC)
        .await
        .unwrap();

    assert!(snapshot.responsive);
    assert_eq!(snapshot.minutes(Param::TimeOnBattery), Some(0.0));
    assert_eq!(snapshot.minutes(Param::RuntimeRemaining), Some(58.0));
    assert_eq!(snapshot.number(Param::BatteryCapacity), Some(100.0));
    assert_eq!(snapshot.number(Param::OutputLoad), Some(25.0));
    assert_eq!(snapshot.text(Param::BatteryStatus), Some("Normal"));
    assert_eq!(snapshot.critical().count(), 0);
    assert!(snapshot.get(Param::UpsModel).is_none());
    assert!(ups.flags().responsive);
}

#[tokio::test]
async fn test_single_timeout_is_retried() {
    let transport = MockTransport::new();
    transport.apc_online().fail_next(oid(Param::RuntimeRemaining), 1);
    let thresholds = ThresholdConfig::default();
    let mut ups = device("apc_ap96xx");

    let snapshot = SnapshotReader::new(&transport, &thresholds)
        .read_params(&mut ups, &[Param::TimeOnBattery, Param::RuntimeRemaining])
        .await
        .unwrap();

    assert!(snapshot.responsive);
    assert_eq!(snapshot.minutes(Param::RuntimeRemaining), Some(58.0));
    assert_eq!(requests_for(&transport, Param::RuntimeRemaining), 2);
}

#[tokio::test]
async fn test_exhausted_retry_skips_rest_of_cycle() {
    let transport = MockTransport::new();
    transport.apc_online().fail_next(oid(Param::TimeOnBattery), 2);
    let thresholds = ThresholdConfig::default();
    let mut ups = device("apc_ap96xx");

    let snapshot = SnapshotReader::new(&transport, &thresholds)
        .read_params(
            &mut ups,
            &[Param::BatteryStatus, Param::TimeOnBattery, Param::RuntimeRemaining],
        )
        .await
        .unwrap();

    assert!(!snapshot.responsive);
    assert!(matches!(snapshot.readings.get(&Param::BatteryStatus), Some(Reading::Value(_))));
    assert_eq!(snapshot.readings.get(&Param::TimeOnBattery), Some(&Reading::Unresponsive));
    assert_eq!(snapshot.readings.get(&Param::RuntimeRemaining), Some(&Reading::Unresponsive));
    assert_eq!(requests_for(&transport, Param::TimeOnBattery), 2);
    assert_eq!(requests_for(&transport, Param::RuntimeRemaining), 0);
}

#[tokio::test]
async fn test_device_unresponsive_after_two_failed_cycles() {
    let transport = MockTransport::new();
    transport.apc_online();
    let thresholds = ThresholdConfig::default();
    let reader = SnapshotReader::new(&transport, &thresholds);
    let mut ups = device("apc_ap96xx");

    assert!(probe(&mut ups, &transport).await.responsive);

    transport.set_dead(ADDRESS, true);
    reader.read_category(&mut ups, Category::Battery).await.unwrap();
    assert!(ups.flags().responsive);
    reader.read_category(&mut ups, Category::Battery).await.unwrap();
    assert!(!ups.flags().responsive);

    transport.set_dead(ADDRESS, false);
    let snapshot = reader.read_category(&mut ups, Category::Battery).await.unwrap();
    assert!(snapshot.responsive);
    assert!(ups.flags().responsive);
}

#[tokio::test]
async fn test_missing_object_decodes_unknown() {
    let transport = MockTransport::new();
    let thresholds = ThresholdConfig::default();
    let mut ups = device("apc_ap96xx");

    let snapshot = SnapshotReader::new(&transport, &thresholds)
        .read_params(&mut ups, &[Param::EnvTemp])
        .await
        .unwrap();

    assert!(snapshot.responsive);
    let value = snapshot.get(Param::EnvTemp).unwrap();
    assert!(value.is_unknown());
    assert_eq!(value.severity, Severity::Unknown);
}

#[tokio::test]
async fn test_builder_values_round_trip_through_mock() {
    let transport = MockTransport::new();
    let builder = SnapshotBuilder::on_battery("rack", 12.0).capacity(40.0);
    transport.apply(Some(ADDRESS), &builder);
    let thresholds = ThresholdConfig::default();
    let mut ups = device("apc_ap96xx");

    let snapshot = SnapshotReader::new(&transport, &thresholds)
        .read_params(&mut ups, Param::POWER_INPUTS)
        .await
        .unwrap();

    assert_eq!(snapshot.minutes(Param::TimeOnBattery), Some(12.0));
    assert_eq!(snapshot.get(Param::BatteryCapacity).map(|v| v.severity), Some(Severity::Warning));
}

#[tokio::test]
async fn test_unsupported_vendor_rejected() {
    let transport = MockTransport::new();
    let thresholds = ThresholdConfig::default();
    let mut ups = device("cyberpower");

    let result = SnapshotReader::new(&transport, &thresholds)
        .read_category(&mut ups, Category::Battery)
        .await;

    assert!(matches!(result, Err(KernelError::UnsupportedVendorType(_))));
    assert_eq!(transport.request_count(), 0);

    let flags = probe(&mut ups, &transport).await;
    assert!(!flags.compatible);
    assert!(!flags.responsive);
}
