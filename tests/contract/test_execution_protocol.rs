//! Contract Tests for the Execution Protocol
//!
//! Expected behavior of the controller's execute, forward-input,
//! interrupt and result transitions, observed through the surfaces and
//! the recorded channel calls.

#[path = "../test_utils/mock_channel.rs"]
mod mock_channel;

use mock_channel::{controller_with, MockChannel};
use mosaicrepl::controller::{
    ExecuteOutcome, Phase, DEFAULT_PROMPT, STATUS_INCOMPLETE, STATUS_NOT_EXECUTING,
};
use mosaicrepl::protocol::{ExecutionResult, StreamKind};
use mosaicrepl::surface::{CursorPosition, OutputTag, SourceBuffer};
use mosaicrepl::ChannelEvent;

#[test]
fn test_complete_source_is_accepted() {
    let mut ctl = controller_with(MockChannel::python_like(), "x = 1");

    let outcome = ctl.execute(true);

    assert_eq!(outcome, ExecuteOutcome::Accepted);
    assert!(ctl.buffer().is_empty());
    assert_eq!(ctl.phase(), Phase::Executing);
    assert!(!ctl.session().stdin_forwarded());
    assert_eq!(ctl.channel().requests, vec!["x = 1".to_string()]);
}

#[test]
fn test_echo_is_trimmed_and_tagged_command() {
    let mut ctl = controller_with(MockChannel::new(), "\n  print(1)  \n\n");
    ctl.execute(true);

    let echoed: Vec<_> = ctl.output().segments_tagged(OutputTag::Command).collect();
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0].text, "print(1)\n");
    assert_eq!(echoed[0].tags, vec![OutputTag::Command]);
    // The request still carries the untrimmed source
    assert_eq!(ctl.channel().requests[0], "\n  print(1)  \n\n");
}

#[test]
fn test_incomplete_source_keeps_buffer() {
    let mut ctl = controller_with(MockChannel::python_like(), "if True:");
    ctl.buffer_mut().place_cursor(CursorPosition::new(0, 0));

    let outcome = ctl.execute(true);

    assert_eq!(outcome, ExecuteOutcome::Incomplete);
    assert_eq!(ctl.buffer().text(), "if True:");
    assert!(ctl.buffer().cursor_at_end());
    assert_eq!(ctl.status().current(), Some(STATUS_INCOMPLETE));
    assert_eq!(ctl.status().alert_count(), 1);
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_syntax_error_status_and_cursor() {
    let mut ctl = controller_with(MockChannel::python_like(), "a = 1\nb = = 2\nc = 3");

    let outcome = ctl.execute(true);

    assert!(matches!(outcome, ExecuteOutcome::SyntaxError { line: 1, column: 4, .. }));
    assert_eq!(
        ctl.status().current(),
        Some("Syntax error: invalid syntax (at line 2 col 5)")
    );
    assert_eq!(ctl.buffer().cursor(), CursorPosition::new(1, 4));
    assert_eq!(ctl.buffer().text(), "a = 1\nb = = 2\nc = 3");
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(ctl.output().is_empty());
}

#[test]
fn test_implicit_execute_is_silent() {
    let mut ctl = controller_with(MockChannel::python_like(), "b = = 2");
    ctl.buffer_mut().place_cursor(CursorPosition::new(0, 1));

    ctl.execute(false);

    assert!(ctl.status().messages().is_empty());
    assert_eq!(ctl.status().alert_count(), 0);
    assert_eq!(ctl.buffer().cursor(), CursorPosition::new(0, 1));
}

#[test]
fn test_empty_execute_only_alerts() {
    let mut ctl = controller_with(MockChannel::new(), "");

    assert_eq!(ctl.execute(true), ExecuteOutcome::Empty);
    assert!(!ctl.execute_command());

    assert_eq!(ctl.status().alert_count(), 2);
    assert!(ctl.channel().requests.is_empty());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_interrupt_while_idle_sends_nothing() {
    let mut ctl = controller_with(MockChannel::new(), "x");

    assert!(!ctl.interrupt());

    assert_eq!(ctl.channel().interrupts, 0);
    assert_eq!(ctl.phase(), Phase::Idle);
    assert_eq!(ctl.status().current(), Some(STATUS_NOT_EXECUTING));
    assert_eq!(ctl.status().alert_count(), 1);
}

#[test]
fn test_interrupt_while_executing() {
    let mut ctl = controller_with(MockChannel::new(), "while True: pass");
    ctl.execute(true);

    assert!(ctl.interrupt());
    assert_eq!(ctl.channel().interrupts, 1);
    assert_eq!(ctl.phase(), Phase::Executing);
}

#[test]
#[should_panic(expected = "forward_stdin called while no command is executing")]
fn test_forward_stdin_while_idle_panics() {
    let mut ctl = controller_with(MockChannel::new(), "hello");
    ctl.forward_stdin();
}

#[test]
#[should_panic(expected = "execution result received while no command is executing")]
fn test_result_while_idle_panics() {
    let mut ctl = controller_with(MockChannel::new(), "");
    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::success(),
    });
}

#[test]
fn test_forward_stdin_while_executing() {
    let mut ctl = controller_with(MockChannel::new(), "name = input()");
    ctl.execute(true);
    ctl.buffer_mut().set_text("Ada");

    assert!(ctl.forward_stdin());

    assert_eq!(ctl.channel().written_text(), "Ada\n");
    assert!(ctl.session().stdin_forwarded());
    assert!(ctl.buffer().is_empty());

    let echoed: Vec<_> = ctl.output().segments_tagged(OutputTag::Stdin).collect();
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0].text, "Ada");
    assert_eq!(echoed[0].tags, vec![OutputTag::Command, OutputTag::Stdin]);
    assert!(ctl.output().plain_text().ends_with("Ada\n"));
}

#[test]
fn test_failed_forward_keeps_buffer() {
    let mut channel = MockChannel::new();
    channel.fail_writes = true;
    let mut ctl = controller_with(channel, "input()");
    ctl.execute(true);
    ctl.buffer_mut().set_text("Ada");

    assert!(!ctl.forward_stdin());

    assert_eq!(ctl.buffer().text(), "Ada");
    assert!(!ctl.session().stdin_forwarded());
    assert_eq!(ctl.status().alert_count(), 1);
}

#[test]
fn test_execute_command_forwards_while_executing() {
    let mut ctl = controller_with(MockChannel::new(), "input()");
    assert!(ctl.execute_command());

    ctl.buffer_mut().set_text("42");
    assert!(ctl.execute_command());

    assert_eq!(ctl.channel().requests.len(), 1);
    assert_eq!(ctl.channel().written_text(), "42\n");
}

#[test]
fn test_round_trip_appends_one_prompt() {
    let mut ctl = controller_with(MockChannel::new(), "input()");
    ctl.execute(true);
    ctl.buffer_mut().set_text("x");
    ctl.forward_stdin();

    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::success(),
    });

    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(!ctl.session().stdin_forwarded());
    assert_eq!(ctl.output().count_tagged(OutputTag::Prompt, DEFAULT_PROMPT), 1);
    let last = ctl.output().last().unwrap();
    assert_eq!(last.text, DEFAULT_PROMPT);
    assert_eq!(last.tags, vec![OutputTag::Command, OutputTag::Prompt]);
}

#[test]
fn test_print_scenario() {
    let mut ctl = controller_with(MockChannel::python_like(), "print(1)\n");

    assert!(ctl.execute(true).is_accepted());
    ctl.handle_event(ChannelEvent::Output {
        generation: 1,
        stream: StreamKind::Stdout,
        text: "1\n".to_string(),
    });
    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::success(),
    });

    let transcript = ctl.output();
    assert_eq!(transcript.plain_text(), "print(1)\n1\n>>> ");
    assert_eq!(transcript.text_tagged(OutputTag::Stdout), "1\n");
    assert_eq!(transcript.text_tagged(OutputTag::Exception), "");
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_exception_scenario() {
    let traceback = "Traceback (most recent call last):\n  File \"<pyshell#0>\", line 1, in <module>\nValueError: x\n";
    let mut ctl = controller_with(MockChannel::python_like(), "raise ValueError('x')");

    assert!(ctl.execute(true).is_accepted());
    ctl.handle_event(ChannelEvent::ExecutionFinished {
        generation: 1,
        result: ExecutionResult::failure(traceback),
    });

    let transcript = ctl.output();
    assert_eq!(transcript.text_tagged(OutputTag::Exception), traceback);
    let segments = transcript.segments();
    let exception_index = segments
        .iter()
        .position(|s| s.has_tag(OutputTag::Exception))
        .unwrap();
    assert!(segments[exception_index + 1].has_tag(OutputTag::Prompt));
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[test]
fn test_stderr_chunks_tagged_stderr() {
    let mut ctl = controller_with(MockChannel::new(), "import sys; sys.stderr.write('e')");
    ctl.execute(true);

    ctl.handle_event(ChannelEvent::Output {
        generation: 1,
        stream: StreamKind::Stderr,
        text: "e".to_string(),
    });

    assert_eq!(ctl.output().text_tagged(OutputTag::Stderr), "e");
    assert_eq!(ctl.phase(), Phase::Executing);
}
