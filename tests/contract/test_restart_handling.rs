//! Contract Tests for Interpreter Restarts
//!
//! A restart forces the session back to idle from any phase, announces a
//! new session, and makes every later event of the old instance inert.

#[path = "../test_utils/mock_channel.rs"]
mod mock_channel;

use mock_channel::{controller_with, MockChannel};
use mosaicrepl::channel::event_queue;
use mosaicrepl::controller::{Phase, DEFAULT_PROMPT, SESSION_BANNER, STATUS_ABANDONED};
use mosaicrepl::error::Error;
use mosaicrepl::protocol::{ExecutionResult, StreamKind};
use mosaicrepl::surface::{OutputTag, SourceBuffer};
use mosaicrepl::ChannelEvent;

#[test]
fn test_double_restart_appends_two_banners() {
    let mut ctl = controller_with(MockChannel::new(), "");

    ctl.on_restart();
    ctl.on_restart();

    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(!ctl.session().stdin_forwarded());
    let transcript = ctl.output();
    assert_eq!(transcript.count_tagged(OutputTag::Message, SESSION_BANNER), 2);
    assert_eq!(transcript.count_tagged(OutputTag::Prompt, DEFAULT_PROMPT), 2);
    assert_eq!(
        transcript.plain_text(),
        format!("{0}{1}{0}{1}", SESSION_BANNER, DEFAULT_PROMPT)
    );
}

#[test]
fn test_restart_while_executing_resets_session() {
    let mut ctl = controller_with(MockChannel::new(), "input()");
    ctl.execute(true);
    ctl.buffer_mut().set_text("x");
    ctl.forward_stdin();

    ctl.handle_event(ChannelEvent::Restarted { generation: 2 });

    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(!ctl.session().stdin_forwarded());
    assert_eq!(ctl.generation(), 2);
    assert_eq!(ctl.output().last().unwrap().text, DEFAULT_PROMPT);
}

#[test]
fn test_restart_command_goes_through_event_queue() {
    let (events, mut receiver) = event_queue();
    let mut ctl = controller_with(MockChannel::new().with_events(events), "print(1)");
    ctl.execute(true);

    assert!(ctl.restart());
    assert_eq!(ctl.channel().kills, 1);
    // Nothing changes until the restart event is delivered
    assert_eq!(ctl.phase(), Phase::Executing);

    for event in receiver.drain() {
        ctl.handle_event(event);
    }
    assert_eq!(ctl.phase(), Phase::Idle);
    assert_eq!(ctl.output().count_tagged(OutputTag::Message, SESSION_BANNER), 1);
}

#[test]
fn test_stale_result_after_restart_is_ignored() {
    let mut ctl = controller_with(MockChannel::new(), "import time; time.sleep(10)");
    ctl.execute(true);
    ctl.handle_event(ChannelEvent::Restarted { generation: 2 });

    // Would panic if it reached the idle session
    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::success(),
    });
    ctl.handle_event(ChannelEvent::Output {
        generation: 1,
        stream: StreamKind::Stdout,
        text: "late".to_string(),
    });

    assert_eq!(ctl.phase(), Phase::Idle);
    assert_eq!(ctl.output().text_tagged(OutputTag::Stdout), "");
    assert_eq!(ctl.output().count_tagged(OutputTag::Prompt, DEFAULT_PROMPT), 1);
}

#[test]
fn test_duplicate_restart_event_is_ignored() {
    let mut ctl = controller_with(MockChannel::new(), "");
    ctl.handle_event(ChannelEvent::Restarted { generation: 2 });
    ctl.handle_event(ChannelEvent::Restarted { generation: 2 });

    assert_eq!(ctl.output().count_tagged(OutputTag::Message, SESSION_BANNER), 1);
}

#[test]
fn test_new_generation_runs_normally() {
    let mut ctl = controller_with(MockChannel::new(), "");
    ctl.handle_event(ChannelEvent::Restarted { generation: 2 });

    ctl.buffer_mut().set_text("print(2)");
    assert!(ctl.execute(true).is_accepted());
    ctl.handle_event(ChannelEvent::Output {
        generation: 2,
        stream: StreamKind::Stdout,
        text: "2\n".to_string(),
    });
    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 2,
        result: ExecutionResult::success(),
    });

    assert_eq!(ctl.output().text_tagged(OutputTag::Stdout), "2\n");
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_request_abandoned_by_restart() {
    let channel = MockChannel::new().with_responses(vec![Err(Error::RequestAbandoned)]);
    let mut ctl = controller_with(channel, "print(1)");

    let outcome = ctl.execute(true);

    assert!(!outcome.is_accepted());
    assert_eq!(ctl.phase(), Phase::Idle);
    assert_eq!(ctl.buffer().text(), "print(1)");
    assert_eq!(ctl.status().current(), Some(STATUS_ABANDONED));
    assert_eq!(ctl.status().alert_count(), 1);
    assert!(ctl.output().is_empty());
}

#[test]
fn test_request_timeout_reported() {
    let timeout = std::time::Duration::from_millis(50);
    let channel = MockChannel::new().with_responses(vec![Err(Error::RequestTimeout { timeout })]);
    let mut ctl = controller_with(channel, "while True: pass");

    assert!(!ctl.execute(true).is_accepted());
    assert!(ctl
        .status()
        .current()
        .unwrap()
        .starts_with("Could not execute command:"));
    assert_eq!(ctl.buffer().text(), "while True: pass");
}

#[test]
fn test_execute_before_restart_event_is_delivered() {
    let (events, mut receiver) = event_queue();
    let mut ctl = controller_with(MockChannel::new().with_events(events), "");
    assert!(ctl.restart());

    // Next command typed before the queued restart is handled
    ctl.buffer_mut().set_text("print(1)");
    assert!(ctl.execute(true).is_accepted());
    assert_eq!(ctl.generation(), 2);
    assert_eq!(ctl.phase(), Phase::Executing);

    for event in receiver.drain() {
        ctl.handle_event(event);
    }
    assert_eq!(ctl.phase(), Phase::Executing);

    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 2,
        result: ExecutionResult::success(),
    });

    assert_eq!(ctl.phase(), Phase::Idle);
    let transcript = ctl.output();
    assert_eq!(transcript.count_tagged(OutputTag::Message, SESSION_BANNER), 1);
    assert_eq!(
        transcript.plain_text(),
        format!("{0}{1}print(1)\n{1}", SESSION_BANNER, DEFAULT_PROMPT)
    );
}
