//! Event routing integration tests.
//!
//! - focus-change signals scheduling lazy history fills
//! - synchronous input-prefix composition through the modifier hook

use std::time::Duration;

use moorline_core::{Config, WorkspaceConfig};
use moorline_harness::{Fixture, SimConversation};
use moorline_host::{HostStatus, ViewId};

const INPUT_MODIFIER: &str = "input_text_display_with_cursor";

fn fixture() -> Result<Fixture, moorline_host::HostError> {
    Fixture::register(Config {
        workspaces: vec![WorkspaceConfig {
            name: "work".to_string(),
            endpoint: "work.example.test:443".to_string(),
            autoconnect: false,
        }],
        ..Config::default()
    })
}

fn connect(fixture: &Fixture) {
    // Unscripted connects succeed without latency, so no tick is needed.
    fixture.extension.lifecycle().spawn_connect("work");
}

#[test]
fn focus_change_schedules_history_fill() {
    let fixture = fixture().unwrap();
    let conversation = SimConversation::new("work");
    fixture.conversations.bind(ViewId(1), conversation.clone());

    let statuses = fixture.host.emit_signal("buffer_switch", ViewId(1));
    assert_eq!(statuses, [HostStatus::Ok]);
    assert_eq!(conversation.fills(), 1);

    // Window switches route the same way.
    fixture.host.emit_signal("window_switch", ViewId(1));
    assert_eq!(conversation.fills(), 2);
}

#[test]
fn focus_change_without_bound_conversation_is_handled() {
    let fixture = fixture().unwrap();

    let statuses = fixture.host.emit_signal("buffer_switch", ViewId(9));
    assert_eq!(statuses, [HostStatus::Ok]);
    // Nothing was scheduled beyond the resident auto-connect routine.
    assert_eq!(fixture.scheduler.live_tasks(), 1);
}

#[test]
fn input_prefix_shows_disconnected_then_loading_in_order() {
    let fixture = fixture().unwrap();
    let conversation = SimConversation::new("work");
    conversation.set_loading(true);
    fixture.conversations.bind(ViewId(1), conversation);

    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hello");

    let disconnected = rendered.find("disconnected").unwrap();
    let loading = rendered.find("loading").unwrap();
    let text = rendered.find("hello").unwrap();
    assert!(disconnected < loading && loading < text);
    assert!(rendered.ends_with("hello"), "original text is unchanged at the end");

    insta::assert_snapshot!(
        rendered,
        @"<input_delimiter>[<reset><red>disconnected<reset><input_delimiter>]<reset> <input_delimiter>[<reset><yellow>loading<reset><input_delimiter>]<reset> hello"
    );
}

#[test]
fn input_prefix_omits_disconnected_when_connected() {
    let fixture = fixture().unwrap();
    let conversation = SimConversation::new("work");
    conversation.set_loading(true);
    fixture.conversations.bind(ViewId(1), conversation);
    connect(&fixture);

    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hello");
    assert!(!rendered.contains("disconnected"));

    insta::assert_snapshot!(
        rendered,
        @"<input_delimiter>[<reset><yellow>loading<reset><input_delimiter>]<reset> hello"
    );
}

#[test]
fn input_passes_through_when_connected_and_idle() {
    let fixture = fixture().unwrap();
    let conversation = SimConversation::new("work");
    fixture.conversations.bind(ViewId(1), conversation);
    connect(&fixture);

    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hello");
    assert_eq!(rendered, "hello");
}

#[test]
fn input_passes_through_without_bound_conversation() {
    let fixture = fixture().unwrap();

    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(9), "/quit now");
    assert_eq!(rendered, "/quit now");
}

#[test]
fn prefix_reflects_state_changes_over_time() {
    let fixture = fixture().unwrap();
    let conversation = SimConversation::new("work");
    fixture.conversations.bind(ViewId(1), conversation.clone());

    // Disconnected at first.
    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hi");
    assert!(rendered.contains("disconnected"));

    // Connected: indicator disappears.
    connect(&fixture);
    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hi");
    assert_eq!(rendered, "hi");

    // Keepalive failure brings it back.
    fixture
        .transport
        .fail_next_probe("work.example.test:443", moorline_core::TransportError::Closed);
    fixture.host.advance(Duration::from_secs(5));
    let rendered = fixture.host.apply_modifier(INPUT_MODIFIER, ViewId(1), "hi");
    assert!(rendered.contains("disconnected"));
}
