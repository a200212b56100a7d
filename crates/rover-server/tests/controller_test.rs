//! Integration tests for the controller actor.
//!
//! Most tests run on paused tokio time so reconnect and fallback timelines
//! are deterministic; the simulated radio reports connection outcomes
//! through events like the real driver.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use rover_core::{ConfigError, KvStorage, MemoryStorage, OperatingMode};
use rover_server::sim::{SimCamera, SimHardware, SimRadioHandle};
use rover_server::{
    ControllerError, ControllerHandle, FileStorage, RuntimeConfig, SimulatedRover, UdpControl,
};

const MS: Duration = Duration::from_millis(1);

struct Running {
    handle: ControllerHandle,
    radio: SimRadioHandle,
    camera: SimCamera,
    hardware: SimHardware,
    task: JoinHandle<()>,
}

fn start_with(storage: Box<dyn KvStorage>, config: RuntimeConfig) -> Running {
    let SimulatedRover {
        mut controller,
        handle,
        radio,
        camera,
        hardware,
    } = SimulatedRover::new(storage, &config);
    controller.boot().expect("boot failed");
    Running {
        handle,
        radio,
        camera,
        hardware,
        task: controller.spawn(),
    }
}

fn start() -> Running {
    start_with(Box::new(MemoryStorage::new()), RuntimeConfig::default())
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("report is not valid JSON")
}

#[tokio::test(start_paused = true)]
async fn test_control_light_end_to_end() {
    let rover = start();

    let report = rover
        .handle
        .apply(r#"{"control":{"mainLight":true}}"#)
        .await
        .unwrap();

    assert!(rover.hardware.outputs().main_light);
    assert_eq!(json(&report)["control"]["mainLight"], 1);
    assert_eq!(json(&rover.handle.report().await.unwrap())["control"]["mainLight"], 1);
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_network_apply_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let rover = start_with(
        Box::new(FileStorage::open(&path).unwrap()),
        RuntimeConfig::default(),
    );

    let report = rover
        .handle
        .apply(r#"{"network":{"mode":"apsta","sta":{"ssid":"Home","password":"secret123"}}}"#)
        .await
        .unwrap();

    let value = json(&report);
    assert_eq!(value["network"]["mode"], "apsta");
    assert_eq!(value["network"]["sta"]["ssid"], "Home");
    assert_eq!(value["network"]["sta"]["auth"], "wpa2-psk");
    assert!(!report.contains("secret123"));
    assert_eq!(rover.radio.mode(), OperatingMode::ApSta);

    let stored = FileStorage::open(&path).unwrap();
    assert_eq!(stored.get_u32("wifi_mode").unwrap(), OperatingMode::ApSta.as_raw());
    assert_eq!(stored.get_str("sta.ssid").unwrap(), "Home");
    assert_eq!(stored.get_str("sta.psk").unwrap(), "secret123");
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_persisted_settings_survive_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let first = start_with(Box::new(FileStorage::open(&path).unwrap()), RuntimeConfig::default());
    first
        .handle
        .apply(r#"{"network":{"mode":"sta","fallback":0,"sta":{"ssid":"Home","static":true,"ip":"10.0.0.7","mask":8}}}"#)
        .await
        .unwrap();
    first.task.abort();

    let second = start_with(Box::new(FileStorage::open(&path).unwrap()), RuntimeConfig::default());
    let value = json(&second.handle.report().await.unwrap());
    assert_eq!(value["network"]["mode"], "sta");
    assert_eq!(value["network"]["fallback"], 0);
    assert_eq!(value["network"]["sta"]["ip"], "10.0.0.7");
    assert_eq!(value["network"]["sta"]["mask"], 8);
    assert_eq!(value["network"]["sta"]["static"], 1);
    second.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_station_falls_back_to_access_point() {
    let rover = start();
    rover
        .handle
        .apply(r#"{"network":{"mode":"sta","fallback":2000,"sta":{"ssid":"Home"}}}"#)
        .await
        .unwrap();

    sleep(1000 * MS).await;
    assert_eq!(rover.radio.mode(), OperatingMode::Sta);

    sleep(1500 * MS).await;
    assert_eq!(rover.radio.mode(), OperatingMode::ApSta);
    let report = json(&rover.handle.report().await.unwrap());
    assert_eq!(report["network"]["mode"], "apsta");

    // The station keeps retrying next to the access point.
    rover.radio.set_upstream(Some("Home"));
    sleep(5500 * MS).await;
    assert!(rover.radio.is_connected());
    let status = rover.handle.status(false).await.unwrap();
    assert_eq!(status.rssi, Some(-55));
    // Stays engaged until the next network apply.
    assert_eq!(rover.radio.mode(), OperatingMode::ApSta);

    rover.handle.apply(r#"{"network":{"fallback":2000}}"#).await.unwrap();
    assert_eq!(rover.radio.mode(), OperatingMode::Sta);
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_connection_waits_for_control_session() {
    let config = RuntimeConfig {
        sim_upstream: Some("Home".to_string()),
        ..RuntimeConfig::default()
    };
    let rover = start_with(Box::new(MemoryStorage::new()), config);

    rover.handle.control_packet(vec![1, 0, 40, 40]).await.unwrap();
    rover
        .handle
        .apply(r#"{"network":{"mode":"sta","sta":{"ssid":"Home"}}}"#)
        .await
        .unwrap();

    sleep(500 * MS).await;
    assert!(!rover.radio.is_connected());

    // Control timeout (1 s) plus the minimal reconnect delay.
    sleep(700 * MS).await;
    assert!(rover.radio.is_connected());
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_safety_stop_after_control_timeout() {
    let rover = start();
    rover
        .handle
        .control_packet(vec![1, 0b0000_0011, 255, 255])
        .await
        .unwrap();

    sleep(500 * MS).await;
    let outputs = rover.hardware.outputs();
    assert_eq!(outputs.left, 100.0);
    assert!(outputs.main_light && outputs.other_light);

    sleep(700 * MS).await;
    let outputs = rover.hardware.outputs();
    assert_eq!(outputs.left, 0.0);
    assert_eq!(outputs.right, 0.0);
    assert!(outputs.main_light);
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_restart_reboots_device() {
    let rover = start();
    let report = rover
        .handle
        .apply(r#"{"control":{"mainLight":true},"restart":true}"#)
        .await
        .unwrap();
    assert_eq!(json(&report)["control"]["mainLight"], 1);

    sleep(50 * MS).await;
    assert!(rover.handle.status(false).await.unwrap().uptime >= 50 * MS);

    sleep(250 * MS).await;
    let status = rover.handle.status(false).await.unwrap();
    assert!(status.uptime < 250 * MS);
    assert!(!rover.hardware.outputs().main_light);
    rover.task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_apply() {
    let rover = start();
    let result = rover.handle.apply(r#"{"camera":{"framesize":"8K"}}"#).await;
    assert!(matches!(
        result,
        Err(ControllerError::Config(ConfigError::InvalidValue { key: "framesize", .. }))
    ));

    rover
        .handle
        .apply(r#"{"camera":{"pixformat":"RGB565"}}"#)
        .await
        .unwrap();
    assert_eq!(rover.camera.reinit_count(), 1);
    rover.task.abort();
}

#[tokio::test]
async fn test_udp_packets_drive_outputs() {
    let rover = start();
    let udp = UdpControl::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let target = udp.local_addr().unwrap();
    let listener = tokio::spawn(udp.run(rover.handle.clone()));

    let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // Oversized packets are dropped.
    sender.send_to(&[1u8; 20], target).await.unwrap();
    sender.send_to(&[1, 0b0000_0001, 0, 0], target).await.unwrap();

    let lit = tokio::time::timeout(Duration::from_secs(2), async {
        while !rover.hardware.outputs().main_light {
            sleep(10 * MS).await;
        }
    })
    .await;
    assert!(lit.is_ok(), "control packet never applied");
    assert_eq!(rover.hardware.outputs().left, 0.0);

    listener.abort();
    rover.task.abort();
}
