//! UI automation tests using egui_kittest and AccessKit
//!
//! These render the real widget around a `WidgetController` and drive it
//! through the accessibility tree.

use async_trait::async_trait;
use chatline::audio::NullSink;
use chatline::integration::{ChatlineConfig, WidgetController};
use chatline::remote::{ChatBackend, ChatRequest, ChatResponse};
use chatline::ui::{show_widget, Theme};
use chatline::ChatlineError;
use egui_kittest::kittest::Queryable;
use egui_kittest::Harness;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn ask(&self, request: &ChatRequest) -> chatline::Result<ChatResponse> {
        if request.question == "fail" {
            return Err(ChatlineError::RequestError("HTTP error! status: 500".into()));
        }
        Ok(ChatResponse {
            answer: format!("Echo: {}", request.question),
            ..Default::default()
        })
    }
}

fn controller(open: bool) -> WidgetController {
    let mut controller = WidgetController::new(
        ChatlineConfig::default(),
        Arc::new(EchoBackend),
        None,
        Box::new(NullSink),
    )
    .unwrap();
    if open {
        controller.open();
    }
    controller
}

fn harness(controller: WidgetController) -> Harness<'static, WidgetController> {
    let theme = Theme::dark();
    Harness::builder()
        .with_size(egui::Vec2::new(900.0, 700.0))
        .build_state(
            move |ctx, controller: &mut WidgetController| {
                show_widget(ctx, controller, &theme);
            },
            controller,
        )
}

/// Poll the controller between frames until the pending request resolves
fn wait_for_answer(harness: &mut Harness<'_, WidgetController>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while harness.state().session().phase().is_awaiting() {
        assert!(Instant::now() < deadline, "no answer within 5s");
        std::thread::sleep(Duration::from_millis(10));
        harness.state_mut().poll_events();
        harness.run();
    }
}

fn send(harness: &mut Harness<'_, WidgetController>, text: &str) {
    harness.get_by_label("Message input").focus();
    harness.run();
    harness.get_by_label("Message input").type_text(text);
    harness.run();
    harness.get_by_label("Send message").click();
    harness.run();
}

#[test]
fn test_launcher_opens_widget() {
    let mut harness = harness(controller(false));
    harness.run();

    harness.get_by_label("Open chat").click();
    harness.run();

    assert!(harness.state().is_open());
    let _input = harness.get_by_label("Message input");
}

#[test]
fn test_open_widget_exposes_controls() {
    let mut harness = harness(controller(true));
    harness.run();

    let _input = harness.get_by_label("Message input");
    let _send = harness.get_by_label("Send message");
    let _mic = harness.get_by_label("Start voice input");
    let _clear = harness.get_by_label("Clear conversation");
    let _voice = harness.get_by_label("Enable voice mode");
    let _maximize = harness.get_by_label("Maximize chat");
    let _close = harness.get_by_label("Close chat");
}

#[test]
fn test_type_and_send_message() {
    let mut harness = harness(controller(true));
    harness.run();

    send(&mut harness, "Hello, world!");

    assert_eq!(harness.state().input(), "");
    assert_eq!(harness.state().session().transcript().len(), 1);
    let _user = harness.get_by_label("User message: Hello, world!");
    let _thinking = harness.get_by_label("Thinking...");

    wait_for_answer(&mut harness);
    let _reply = harness.get_by_label("Assistant response: Echo: Hello, world!");
}

#[test]
fn test_cannot_send_empty_message() {
    let mut harness = harness(controller(true));
    harness.run();

    harness.get_by_label("Send message").click();
    harness.run();

    assert!(harness.state().session().transcript().is_empty());
}

#[test]
fn test_failure_shows_banner_and_apology() {
    let mut harness = harness(controller(true));
    harness.run();

    send(&mut harness, "fail");
    wait_for_answer(&mut harness);

    let _banner = harness.get_by_label("Error: Connection failed");
    let _apology = harness.get_by_label(
        "Assistant response: I'm sorry, I'm having trouble connecting right now. Please try again later.",
    );

    harness.get_by_label("Dismiss error").click();
    harness.run();
    assert!(harness.state().session().last_error().is_none());
}

#[test]
fn test_clear_conversation_button() {
    let mut harness = harness(controller(true));
    harness.run();

    send(&mut harness, "remember this");
    wait_for_answer(&mut harness);
    assert_eq!(harness.state().session().transcript().len(), 2);

    harness.get_by_label("Clear conversation").click();
    harness.run();

    assert!(harness.state().session().transcript().is_empty());
    assert!(harness.state().session().history().is_empty());
}

#[test]
fn test_voice_mode_toggle_shows_badge() {
    let mut harness = harness(controller(true));
    harness.run();

    harness.get_by_label("Enable voice mode").click();
    harness.run();

    assert!(harness.state().session().voice_mode_enabled());
    let _badge = harness.get_by_label("Voice Mode");
    let _toggle = harness.get_by_label("Disable voice mode");
}

#[test]
fn test_close_and_reopen_keeps_conversation() {
    let mut harness = harness(controller(true));
    harness.run();

    send(&mut harness, "still here?");
    wait_for_answer(&mut harness);

    harness.get_by_label("Maximize chat").click();
    harness.run();
    assert!(harness.state().is_maximized());

    harness.get_by_label("Close chat").click();
    harness.run();
    assert!(!harness.state().is_open());
    assert!(!harness.state().is_maximized());

    harness.get_by_label("Open chat").click();
    harness.run();
    let _user = harness.get_by_label("User message: still here?");
}
