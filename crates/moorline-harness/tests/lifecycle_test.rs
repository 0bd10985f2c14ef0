//! Connection lifecycle integration tests.
//!
//! Drives the full extension through simulated host ticks:
//! - startup auto-connect (grace period, flag gating, independence)
//! - connect state transitions over scripted transport outcomes
//! - keepalive probing and per-workspace failure recovery

use std::time::Duration;

use moorline_core::{Config, ProbeFailurePolicy, TransportError, WorkspaceConfig, WorkspaceState};
use moorline_harness::{ConnectOutcome, Fixture, SimHost};

fn config(workspaces: &[(&str, bool)]) -> Config {
    Config {
        workspaces: workspaces
            .iter()
            .map(|(name, autoconnect)| WorkspaceConfig {
                name: (*name).to_string(),
                endpoint: format!("{name}.example.test:443"),
                autoconnect: *autoconnect,
            })
            .collect(),
        ..Config::default()
    }
}

fn endpoint(name: &str) -> String {
    format!("{name}.example.test:443")
}

#[test]
fn auto_connect_waits_out_the_startup_grace_period() {
    let fixture = Fixture::register(config(&[("alpha", true)])).unwrap();

    // Just short of the grace period: no attempt yet.
    fixture.host.advance(Duration::from_millis(999));
    assert!(fixture.transport.connect_attempts().is_empty());
    assert_eq!(fixture.extension.lifecycle().state("alpha"), Some(WorkspaceState::Disconnected));

    // Crossing it starts the connect.
    fixture.host.advance(Duration::from_millis(1));
    assert_eq!(fixture.transport.connect_attempts(), [endpoint("alpha")]);
    assert_eq!(fixture.extension.lifecycle().state("alpha"), Some(WorkspaceState::Connected));
}

#[test]
fn auto_connect_respects_per_workspace_preference_and_order() {
    let fixture =
        Fixture::register(config(&[("alpha", true), ("beta", false), ("gamma", true)])).unwrap();

    fixture.host.advance(Duration::from_secs(2));

    // Only autoconnect workspaces, in configured order.
    assert_eq!(fixture.transport.connect_attempts(), [endpoint("alpha"), endpoint("gamma")]);
    let lifecycle = fixture.extension.lifecycle();
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Connected));
    assert_eq!(lifecycle.state("beta"), Some(WorkspaceState::Disconnected));
    assert_eq!(lifecycle.state("gamma"), Some(WorkspaceState::Connected));
}

#[test]
fn auto_connect_disabled_by_host_flag() {
    let host = SimHost::new();
    host.set_info("auto_connect", "0");
    let fixture = Fixture::register_with_host(host, config(&[("alpha", true)])).unwrap();

    fixture.host.advance(Duration::from_secs(10));
    assert!(fixture.transport.connect_attempts().is_empty());
    assert_eq!(fixture.extension.lifecycle().state("alpha"), Some(WorkspaceState::Disconnected));
}

#[test]
fn auto_connect_attempts_are_independent() {
    let fixture = Fixture::register(config(&[("alpha", true), ("gamma", true)])).unwrap();
    fixture.transport.script_connect(
        &endpoint("alpha"),
        ConnectOutcome::Fail {
            latency: Duration::ZERO,
            error: TransportError::Handshake { reason: "bad token".to_string() },
        },
    );

    fixture.host.advance(Duration::from_secs(2));

    // Alpha's failure did not block gamma.
    assert_eq!(fixture.transport.connect_attempts(), [endpoint("alpha"), endpoint("gamma")]);
    let lifecycle = fixture.extension.lifecycle();
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Disconnected));
    assert_eq!(lifecycle.state("gamma"), Some(WorkspaceState::Connected));

    // The failure was reported, not raised as a task failure.
    let printed = fixture.host.printed();
    assert!(printed.iter().any(|line| line.contains("alpha") && line.contains("connect failed")));
    assert!(!printed.iter().any(|line| line.contains("task")));
}

#[test]
fn connect_handshake_latency_is_observable() {
    let fixture = Fixture::register(config(&[("alpha", false)])).unwrap();
    fixture
        .transport
        .script_connect(&endpoint("alpha"), ConnectOutcome::Succeed { latency: Duration::from_millis(50) });

    let lifecycle = fixture.extension.lifecycle().clone();
    lifecycle.spawn_connect("alpha");
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Connecting));

    fixture.host.advance(Duration::from_millis(49));
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Connecting));

    fixture.host.advance(Duration::from_millis(1));
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Connected));
    assert_eq!(lifecycle.last_healthy("alpha"), Some(Duration::from_millis(50)));
}

#[test]
fn failed_connect_reports_and_returns_to_disconnected() {
    let fixture = Fixture::register(config(&[("alpha", false)])).unwrap();
    fixture.transport.script_connect(
        &endpoint("alpha"),
        ConnectOutcome::Fail {
            latency: Duration::from_millis(10),
            error: TransportError::Io { message: "connection refused".to_string() },
        },
    );

    let lifecycle = fixture.extension.lifecycle().clone();
    lifecycle.spawn_connect("alpha");
    fixture.host.advance(Duration::from_millis(10));

    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Disconnected));
    let printed = fixture.host.printed();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].contains("connect failed"));
    assert!(printed[0].contains("connection refused"));
    assert_eq!(fixture.scheduler.live_tasks(), 1, "only the auto-connect routine remains");
}

#[test]
fn connecting_an_unknown_workspace_fails_the_task() {
    let fixture = Fixture::register(config(&[("alpha", false)])).unwrap();

    fixture.extension.lifecycle().spawn_connect("nope");

    let printed = fixture.host.printed();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].contains("failed"));
    assert!(printed[0].contains("workspace nope not found"));
}

#[test]
fn keepalive_probes_every_connected_workspace_once_per_firing() {
    let fixture = Fixture::register(config(&[("alpha", true), ("beta", true)])).unwrap();

    // Connected at t = 1s (grace period), keepalive fires at t = 5s.
    fixture.host.advance(Duration::from_secs(5));
    assert_eq!(fixture.transport.probes(), [endpoint("alpha"), endpoint("beta")]);

    fixture.host.advance(Duration::from_secs(5));
    assert_eq!(fixture.transport.probe_count(&endpoint("alpha")), 2);
    assert_eq!(fixture.transport.probe_count(&endpoint("beta")), 2);

    let lifecycle = fixture.extension.lifecycle();
    assert_eq!(lifecycle.last_healthy("alpha"), Some(Duration::from_secs(10)));
    assert_eq!(lifecycle.last_healthy("beta"), Some(Duration::from_secs(10)));
}

#[test]
fn keepalive_skips_disconnected_workspaces() {
    let fixture = Fixture::register(config(&[("alpha", false)])).unwrap();

    fixture.host.advance(Duration::from_secs(20));
    assert!(fixture.transport.probes().is_empty());
}

#[test]
fn probe_failure_disconnects_one_workspace_and_keeps_probing_the_rest() {
    let fixture = Fixture::register(config(&[("alpha", true), ("beta", true)])).unwrap();
    fixture.transport.fail_next_probe(&endpoint("alpha"), TransportError::Closed);

    // First keepalive round: alpha fails but beta is still probed.
    fixture.host.advance(Duration::from_secs(5));
    assert_eq!(fixture.transport.probes(), [endpoint("alpha"), endpoint("beta")]);

    let lifecycle = fixture.extension.lifecycle();
    assert_eq!(lifecycle.state("alpha"), Some(WorkspaceState::Disconnected));
    assert_eq!(lifecycle.state("beta"), Some(WorkspaceState::Connected));
    assert_eq!(fixture.transport.closed(), [endpoint("alpha")]);

    let printed = fixture.host.printed();
    assert!(printed.iter().any(|line| line.contains("alpha") && line.contains("probe failed")));

    // Next round probes only the survivor.
    fixture.host.advance(Duration::from_secs(5));
    assert_eq!(fixture.transport.probe_count(&endpoint("alpha")), 1);
    assert_eq!(fixture.transport.probe_count(&endpoint("beta")), 2);
}

#[test]
fn probe_failure_with_reconnect_policy_starts_a_fresh_connect() {
    let mut cfg = config(&[("alpha", true)]);
    cfg.probe_failure = ProbeFailurePolicy::Reconnect;
    let fixture = Fixture::register(cfg).unwrap();
    fixture.transport.fail_next_probe(&endpoint("alpha"), TransportError::Closed);

    fixture.host.advance(Duration::from_secs(5));

    // Old socket closed, new connect attempted, workspace back up.
    assert_eq!(fixture.transport.closed(), [endpoint("alpha")]);
    assert_eq!(fixture.transport.connect_attempts().len(), 2);
    assert_eq!(fixture.extension.lifecycle().state("alpha"), Some(WorkspaceState::Connected));
}
