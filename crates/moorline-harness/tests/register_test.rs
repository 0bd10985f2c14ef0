//! Registration and shutdown integration tests.
//!
//! - registration failure is fatal: no hooks installed, no tasks started
//! - partial hook failure rolls back already-installed hooks
//! - the shutdown hook persists the configuration snapshot synchronously

use moorline_core::{Config, WorkspaceConfig};
use moorline_harness::{Fixture, SimHost};
use moorline_host::{HostError, HostStatus};

fn config() -> Config {
    Config {
        workspaces: vec![WorkspaceConfig {
            name: "work".to_string(),
            endpoint: "work.example.test:443".to_string(),
            autoconnect: true,
        }],
        ..Config::default()
    }
}

#[test]
fn successful_registration_installs_hooks_and_records_metadata() {
    let fixture = Fixture::register(config()).unwrap();

    let info = fixture.host.registered().unwrap();
    assert_eq!(info.name, "moorline");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));

    // Two focus signals, one input modifier, the keepalive timer, and the
    // auto-connect routine's grace timer.
    assert_eq!(fixture.host.live_signal_hooks(), 2);
    assert_eq!(fixture.host.live_modifier_hooks(), 1);
    assert_eq!(fixture.host.live_timer_hooks(), 2);
    assert_eq!(fixture.extension.hooks().len(), 4);

    assert_eq!(fixture.extension.host_version(), Some("1.0-sim"));
}

#[test]
fn rejected_registration_installs_nothing() {
    let host = SimHost::new();
    host.reject_registration();

    let err = Fixture::register_with_host(host.clone(), config()).unwrap_err();
    assert!(matches!(err, HostError::Registration { .. }));

    assert!(host.registered().is_none());
    assert_eq!(host.live_signal_hooks(), 0);
    assert_eq!(host.live_modifier_hooks(), 0);
    assert_eq!(host.live_timer_hooks(), 0);
    assert!(host.printed().is_empty());
}

#[test]
fn hook_failure_is_fatal_before_anything_installs() {
    let host = SimHost::new();
    host.reject_hooks();

    let err = Fixture::register_with_host(host.clone(), config()).unwrap_err();
    assert!(matches!(err, HostError::Hook { .. }));

    assert_eq!(host.live_signal_hooks(), 0);
    assert_eq!(host.live_modifier_hooks(), 0);
    assert_eq!(host.live_timer_hooks(), 0);
}

#[test]
fn late_hook_failure_rolls_back_already_installed_hooks() {
    let host = SimHost::new();
    // Signals and the modifier install; the keepalive timer then fails.
    host.reject_timer_hooks();

    let err = Fixture::register_with_host(host.clone(), config()).unwrap_err();
    assert!(matches!(err, HostError::Hook { kind: "timer", .. }));

    assert_eq!(host.live_signal_hooks(), 0);
    assert_eq!(host.live_modifier_hooks(), 0);
    assert_eq!(host.live_timer_hooks(), 0);
}

#[test]
fn shutdown_persists_the_config_snapshot() {
    let fixture = Fixture::register(config()).unwrap();

    assert_eq!(fixture.host.trigger_shutdown(), Some(HostStatus::Ok));

    let persisted = fixture.host.persisted();
    assert_eq!(persisted.len(), 1);
    let decoded: Config = ciborium::from_reader(persisted[0].as_slice()).unwrap();
    assert_eq!(decoded, config());
}

#[test]
fn shutdown_reports_persistence_failure() {
    let fixture = Fixture::register(config()).unwrap();
    fixture.host.reject_persist();

    assert_eq!(fixture.host.trigger_shutdown(), Some(HostStatus::Error));
    assert!(fixture.host.persisted().is_empty());
}

#[test]
fn unregister_removes_installed_hooks() {
    let host = SimHost::new();
    host.set_info("auto_connect", "0");
    let fixture = Fixture::register_with_host(host.clone(), config()).unwrap();

    assert_eq!(host.live_signal_hooks(), 2);
    assert_eq!(host.live_timer_hooks(), 1, "keepalive only; auto-connect is gated off");

    fixture.extension.unregister();
    assert_eq!(host.live_signal_hooks(), 0);
    assert_eq!(host.live_modifier_hooks(), 0);
    assert_eq!(host.live_timer_hooks(), 0);
}
