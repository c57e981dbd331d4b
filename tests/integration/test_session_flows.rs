//! Integration Tests for Session Flows
//!
//! End-to-end user flows through key handling, the controller and the
//! event queue, with a mock interpreter channel.

#[path = "../test_utils/mock_channel.rs"]
mod mock_channel;

use mock_channel::{controller_with, MockChannel, TestController};
use mosaicrepl::channel::{event_queue, EventReceiver, EventSender};
use mosaicrepl::config::{Config, KeyBinding};
use mosaicrepl::controller::{
    Key, KeyChord, KeyMap, Phase, DEFAULT_PROMPT, SESSION_BANNER, STATUS_INCOMPLETE,
};
use mosaicrepl::protocol::{ExecutionResult, StreamKind};
use mosaicrepl::surface::{CursorPosition, OutputTag, SourceBuffer};
use mosaicrepl::ChannelEvent;

fn return_key() -> KeyChord {
    KeyChord::plain(Key::Return)
}

fn execute_key() -> KeyChord {
    KeyChord::ctrl(Key::Return)
}

/// Type `text` at the end of the buffer
fn type_text(ctl: &mut TestController, text: &str) {
    let buffer = ctl.buffer_mut();
    buffer.place_cursor_at_end();
    buffer.insert(text);
}

/// Press Return, inserting a newline when the controller doesn't consume it
fn press_return(ctl: &mut TestController) -> bool {
    let consumed = ctl.handle_key(&return_key());
    if !consumed {
        ctl.buffer_mut().insert("\n");
    }
    consumed
}

fn publish_output(events: &EventSender, text: &str) {
    events.publish(ChannelEvent::Output {
        generation: 1,
        stream: StreamKind::Stdout,
        text: text.to_string(),
    });
}

fn pump(ctl: &mut TestController, receiver: &mut EventReceiver) {
    for event in receiver.drain() {
        ctl.handle_event(event);
    }
}

#[test]
fn test_single_line_executes_on_return() {
    let (events, mut receiver) = event_queue();
    let mut ctl = controller_with(MockChannel::python_like(), "");
    ctl.show_welcome("Welcome\n");

    type_text(&mut ctl, "print(1)");
    assert!(press_return(&mut ctl));
    assert_eq!(ctl.phase(), Phase::Executing);

    publish_output(&events, "1\n");
    events.publish(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::success(),
    });
    pump(&mut ctl, &mut receiver);

    assert_eq!(
        ctl.output().plain_text(),
        format!("Welcome\n{0}print(1)\n1\n{0}", DEFAULT_PROMPT)
    );
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_multi_line_block_needs_explicit_execute() {
    let mut ctl = controller_with(MockChannel::python_like(), "");

    type_text(&mut ctl, "if True:");
    assert!(!press_return(&mut ctl));
    // Silent implicit attempt
    assert_eq!(ctl.status().alert_count(), 0);

    type_text(&mut ctl, "    print(1)");
    // Second line: Return is plain editing, nothing is sent
    assert!(!press_return(&mut ctl));
    assert_eq!(ctl.channel().requests.len(), 1);

    assert!(ctl.handle_key(&execute_key()));
    assert_eq!(ctl.phase(), Phase::Executing);
    assert_eq!(
        ctl.channel().requests.last().unwrap(),
        "if True:\n    print(1)\n"
    );
    assert_eq!(
        ctl.output().plain_text(),
        "if True:\n...     print(1)\n"
    );
}

#[test]
fn test_explicit_execute_of_incomplete_block_warns() {
    let mut ctl = controller_with(MockChannel::python_like(), "for i in range(3):");
    ctl.buffer_mut().place_cursor(CursorPosition::new(0, 3));

    assert!(ctl.handle_key(&execute_key()));

    assert_eq!(ctl.status().current(), Some(STATUS_INCOMPLETE));
    assert!(ctl.buffer().cursor_at_end());
    assert_eq!(ctl.buffer().text(), "for i in range(3):");
}

#[test]
fn test_trailing_space_suppresses_submit() {
    let mut ctl = controller_with(MockChannel::new(), "");
    type_text(&mut ctl, "x = 1 ");

    assert!(!press_return(&mut ctl));
    assert!(ctl.channel().requests.is_empty());
    assert_eq!(ctl.buffer().text(), "x = 1 \n");
}

#[test]
fn test_cursor_inside_line_suppresses_submit() {
    let mut ctl = controller_with(MockChannel::new(), "x = 1");
    ctl.buffer_mut().place_cursor(CursorPosition::new(0, 2));

    assert!(!ctl.handle_key(&return_key()));
    assert!(ctl.channel().requests.is_empty());
}

#[test]
fn test_interactive_input_flow() {
    let mut ctl = controller_with(MockChannel::new(), "");
    type_text(&mut ctl, "a = input(); b = input()");
    assert!(press_return(&mut ctl));

    // First input line must be sent explicitly
    type_text(&mut ctl, "one");
    assert!(!ctl.handle_key(&return_key()));
    assert!(ctl.channel().writes.is_empty());
    assert!(ctl.handle_key(&execute_key()));
    assert!(ctl.session().stdin_forwarded());

    // Later lines go out on Return
    type_text(&mut ctl, "two");
    assert!(press_return(&mut ctl));

    assert_eq!(ctl.channel().written_text(), "one\ntwo\n");
    assert_eq!(ctl.output().text_tagged(OutputTag::Stdin), "onetwo");

    ctl.on_execution_result(ExecutionResult::success());
    assert!(!ctl.session().stdin_forwarded());
}

#[test]
fn test_interrupt_key_flow() {
    let (events, mut receiver) = event_queue();
    let mut ctl = controller_with(MockChannel::new(), "while True: pass");
    let interrupt = KeyChord::ctrl(Key::Char('c'));

    // Idle: refused
    assert!(ctl.handle_key(&interrupt));
    assert_eq!(ctl.channel().interrupts, 0);

    ctl.execute(true);
    assert!(ctl.handle_key(&interrupt));
    assert_eq!(ctl.channel().interrupts, 1);

    events.publish(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::failure("KeyboardInterrupt\n"),
    });
    pump(&mut ctl, &mut receiver);

    assert_eq!(
        ctl.output().text_tagged(OutputTag::Exception),
        "KeyboardInterrupt\n"
    );
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_restart_key_flow() {
    let (events, mut receiver) = event_queue();
    let channel = MockChannel::new().with_events(events.clone());
    let mut ctl = controller_with(channel, "import time; time.sleep(100)");
    ctl.execute(true);
    publish_output(&events, "partial");

    assert!(ctl.handle_key(&KeyChord::ctrl(Key::F(6))));
    // Output of the old instance still queued ahead of the restart
    publish_output(&events, " late");
    pump(&mut ctl, &mut receiver);

    let transcript = ctl.output();
    assert_eq!(transcript.text_tagged(OutputTag::Stdout), "partial");
    assert_eq!(transcript.count_tagged(OutputTag::Message, SESSION_BANNER), 1);
    assert_eq!(ctl.generation(), 2);
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_configured_bindings_and_prompt() {
    let mut config = Config::default();
    config.session.prompt = "py> ".to_string();
    config
        .key_bindings
        .bindings
        .insert("execute".to_string(), KeyBinding::new("Alt+Return"));
    let keymap = KeyMap::from_bindings(&config.key_bindings).unwrap();

    let mut ctl = controller_with(MockChannel::new(), "x = 1")
        .with_prompt(config.session.prompt.clone())
        .with_keymap(keymap);

    assert!(!ctl.handle_key(&execute_key()));
    let alt_return: KeyChord = "Alt+Return".parse().unwrap();
    assert!(ctl.handle_key(&alt_return));
    ctl.on_execution_result(ExecutionResult::success());

    assert!(ctl.output().plain_text().ends_with("py> "));
    assert_eq!(ctl.prompt(), "py> ");
}

#[tokio::test]
async fn test_events_from_reader_thread() {
    let (events, mut receiver) = event_queue();
    let mut ctl = controller_with(MockChannel::new(), "for i in range(3): print(i)");
    ctl.execute(true);

    let reader = std::thread::spawn(move || {
        for i in 0..3 {
            publish_output(&events, &format!("{}\n", i));
        }
        events.publish(ChannelEvent::ExecutionFinished {
            generation: 1,
            result: ExecutionResult::success(),
        });
    });

    while ctl.phase() == Phase::Executing {
        let event = receiver.recv().await.expect("event queue closed");
        ctl.handle_event(event);
    }
    reader.join().unwrap();

    assert_eq!(ctl.output().text_tagged(OutputTag::Stdout), "0\n1\n2\n");
}
