//! End-to-end interview runs against the controller

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use interview_gateway::config::{InterviewConfig, MonitoringConfig};
use interview_gateway::interview::script::{
    ANY_QUESTIONS, CLARIFY, CLARIFY_ACK, DAY_CHECK, FALLBACK_QUESTIONS, FAREWELL,
    FEEDBACK_FALLBACK, GREETING, INTRO_REQUEST, INTRO_SHORT_ACK, MOVE_ON, NO_QUESTIONS_ACK,
    QUESTIONS_ACK,
};
use interview_gateway::interview::{Delivery, DropReason, Phase, Probes, Role};
use interview_gateway::monitor::ReportedFocus;
use interview_gateway::transport::EndReason;

use common::{
    ScriptedGenerator, Transcript, controller, controller_with, no_monitoring, play_candidate,
    quick_config, wait_for_question, wait_for_summary,
};

const LONG_ANSWER: &str =
    "I have spent five years selling analytics software to mid-market finance teams.";

#[test]
fn full_interview_asks_every_fallback_question() {
    let (controller, events) = controller(quick_config(), no_monitoring(), Probes::default());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    let mut expected = vec![DAY_CHECK, INTRO_REQUEST];
    expected.extend(FALLBACK_QUESTIONS);
    expected.push(ANY_QUESTIONS);
    assert_eq!(transcript.questions, expected);

    let interruptible: Vec<_> = transcript
        .lines
        .iter()
        .filter(|line| line.interruptible)
        .map(|line| line.text.as_str())
        .collect();
    assert_eq!(interruptible, expected);

    assert_eq!(transcript.lines.first().map(|l| l.text.as_str()), Some(GREETING));
    assert_eq!(transcript.lines.last().map(|l| l.text.as_str()), Some(FAREWELL));
    assert_eq!(transcript.said(QUESTIONS_ACK), 1);
    assert!(transcript.lines.iter().all(|line| line.audio.is_none()));

    let summary = transcript.summary.unwrap();
    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.questions_asked, 7);
    assert!(
        summary
            .conversation_history
            .iter()
            .any(|entry| entry.role == Role::User && entry.content == LONG_ANSWER)
    );

    let status = controller.status();
    assert!(!status.session.active);
    assert_eq!(status.session.phase, Phase::Ended);
}

#[test]
fn short_answers_get_one_clarification_then_move_on() {
    let config = InterviewConfig {
        max_turns: 1,
        ..quick_config()
    };
    let (controller, events) = controller(config, no_monitoring(), Probes::default());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |question| {
        let answer = if question == FALLBACK_QUESTIONS[0] || question == CLARIFY {
            "Not sure"
        } else {
            LONG_ANSWER
        };
        Some(answer.to_string())
    });

    assert_eq!(transcript.said(CLARIFY), 1);
    assert_eq!(transcript.said(MOVE_ON), 1);
    assert_eq!(transcript.said(CLARIFY_ACK), 0);

    let summary = transcript.summary.unwrap();
    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.questions_asked, 1);
    // Neither short reply made it into the history
    assert!(
        summary
            .conversation_history
            .iter()
            .all(|entry| entry.content != "Not sure")
    );
}

#[test]
fn clarified_answer_is_recorded() {
    let config = InterviewConfig {
        max_turns: 1,
        ..quick_config()
    };
    let (controller, events) = controller(config, no_monitoring(), Probes::default());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |question| {
        let answer = if question == FALLBACK_QUESTIONS[0] {
            "Cold calls"
        } else {
            LONG_ANSWER
        };
        Some(answer.to_string())
    });

    assert_eq!(transcript.said(CLARIFY), 1);
    assert_eq!(transcript.said(CLARIFY_ACK), 1);
    assert_eq!(transcript.said(MOVE_ON), 0);
    assert_eq!(transcript.summary.unwrap().questions_asked, 1);
}

#[test]
fn end_releases_a_waiting_interview() {
    let config = InterviewConfig {
        answer_timeout: Duration::from_secs(60),
        ..quick_config()
    };
    let (controller, events) = controller(config, no_monitoring(), Probes::default());
    controller.start().unwrap();
    wait_for_question(&events);
    assert!(controller.session().gate().is_awaiting());

    let started = Instant::now();
    controller.end();
    assert!(started.elapsed() < Duration::from_secs(5));

    let summary = wait_for_summary(&events);
    assert_eq!(summary.reason, EndReason::Cancelled);
    assert!(!controller.session().is_active());

    // Nothing is waiting any more
    assert_eq!(
        controller.submit_answer("hello there everyone").unwrap(),
        Delivery::Dropped(DropReason::NotAwaiting)
    );
}

#[test]
fn reset_then_start_begins_from_scratch() {
    let (controller, events) = controller(quick_config(), no_monitoring(), Probes::default());
    controller.start().unwrap();
    wait_for_question(&events);
    controller.submit_answer(LONG_ANSWER).unwrap();
    wait_for_question(&events);

    controller.reset();
    assert_eq!(wait_for_summary(&events).reason, EndReason::Cancelled);

    let status = controller.status();
    assert!(status.initialized);
    assert!(!status.session.active);
    assert_eq!(status.session.turn_index, 0);
    assert_eq!(status.session.history_len, 0);
    assert_eq!(status.session.phase, Phase::Idle);

    controller.start().unwrap();
    assert!(controller.session().is_active());
    wait_for_question(&events);
    assert_eq!(controller.session().gate().current_question().as_deref(), Some(DAY_CHECK));
    controller.end();
}

/// A controller watching only page focus, with fast polling and no cooldown
fn focus_monitored() -> (
    Arc<ReportedFocus>,
    Arc<interview_gateway::InterviewController>,
    crossbeam_channel::Receiver<interview_gateway::InterviewEvent>,
) {
    let focus = Arc::new(ReportedFocus::new());
    let monitoring = MonitoringConfig {
        enabled: true,
        escalation_threshold: 3,
        focus_interval: Duration::from_millis(10),
        focus_cooldown: Duration::ZERO,
        ..MonitoringConfig::default()
    };
    let config = InterviewConfig {
        answer_timeout: Duration::from_secs(60),
        ..quick_config()
    };
    let probes = Probes {
        presence: None,
        focus: Some(focus.clone()),
    };
    let (controller, events) = controller(config, monitoring, probes);
    (focus, controller, events)
}

/// Leave the page once the first question is up and stay away until terminated
fn leave_until_terminated(
    focus: &ReportedFocus,
    controller: &interview_gateway::InterviewController,
    events: &crossbeam_channel::Receiver<interview_gateway::InterviewEvent>,
) -> Transcript {
    controller.start().unwrap();
    wait_for_question(events);

    // Let the watcher settle on the interview page first
    std::thread::sleep(Duration::from_millis(200));
    focus.report(false);

    play_candidate(controller, events, |_| None)
}

#[test]
fn repeated_focus_loss_terminates_the_interview() {
    let (focus, controller, events) = focus_monitored();

    let transcript = leave_until_terminated(&focus, &controller, &events);

    assert_eq!(transcript.warnings, ["tab_change", "tab_change", "termination"]);
    let summary = transcript.summary.unwrap();
    assert_eq!(summary.reason, EndReason::Terminated);

    let tally = controller.status().session.warnings;
    assert_eq!(tally.total, 3);
    assert!(tally.escalated);
    assert!(!controller.session().is_monitoring());
}

#[test]
fn next_interview_starts_with_focus_on_the_page() {
    let (focus, controller, events) = focus_monitored();
    let first = leave_until_terminated(&focus, &controller, &events);
    assert_eq!(first.summary.unwrap().reason, EndReason::Terminated);
    assert!(!focus.is_focused());

    controller.reset();
    controller.start().unwrap();
    assert!(focus.is_focused());
    wait_for_question(&events);

    // The client reports the page visible again once it reconnects
    std::thread::sleep(Duration::from_millis(200));
    focus.report(true);
    std::thread::sleep(Duration::from_millis(200));
    controller.end();

    let second = play_candidate(&controller, &events, |_| None);
    assert!(second.warnings.is_empty(), "unexpected warnings: {:?}", second.warnings);
    assert_eq!(second.summary.unwrap().reason, EndReason::Cancelled);
    assert_eq!(controller.status().session.warnings.total, 0);
}

#[test]
fn start_twice_is_rejected_while_running() {
    let (controller, events) = controller(quick_config(), no_monitoring(), Probes::default());
    controller.start().unwrap();
    wait_for_question(&events);

    assert!(matches!(
        controller.start(),
        Err(interview_gateway::Error::AlreadyActive)
    ));
    controller.end();
}

#[test]
fn unanswered_question_is_clarified_then_skipped() {
    let config = InterviewConfig {
        max_turns: 1,
        answer_timeout: Duration::from_millis(100),
        ..quick_config()
    };
    let (controller, events) = controller(config, no_monitoring(), Probes::default());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| None);

    assert_eq!(
        transcript.questions,
        [DAY_CHECK, INTRO_REQUEST, FALLBACK_QUESTIONS[0], CLARIFY, ANY_QUESTIONS]
    );
    let position = |text: &str| transcript.lines.iter().position(|line| line.text == text);
    assert!(position(CLARIFY) < position(MOVE_ON));
    assert!(position(MOVE_ON) < position(ANY_QUESTIONS));
    assert_eq!(transcript.said(INTRO_SHORT_ACK), 1);
    assert_eq!(transcript.said(NO_QUESTIONS_ACK), 1);

    let summary = transcript.summary.unwrap();
    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.questions_asked, 1);
    assert!(summary.conversation_history.is_empty());
}

fn one_turn() -> InterviewConfig {
    InterviewConfig {
        max_turns: 1,
        ..quick_config()
    }
}

#[test]
fn generated_question_and_remark_are_spoken() {
    let generator = ScriptedGenerator::new(
        &[Some("  \"How do you forecast your pipeline?\" ")],
        &[Some("Forecast accuracy builds trust with leadership.")],
    );
    let (controller, events) =
        controller_with(one_turn(), no_monitoring(), Probes::default(), generator.clone());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    assert_eq!(transcript.questions[2], "How do you forecast your pipeline?");
    assert_eq!(transcript.said(FALLBACK_QUESTIONS[0]), 0);
    assert_eq!(transcript.said("Forecast accuracy builds trust with leadership."), 1);
    assert_eq!(transcript.said(FEEDBACK_FALLBACK), 0);
    assert_eq!(generator.question_calls(), 1);
    assert_eq!(generator.remark_calls(), 1);

    let history = transcript.summary.unwrap().conversation_history;
    assert!(
        history
            .iter()
            .any(|entry| entry.role == Role::Assistant
                && entry.content == "How do you forecast your pipeline?")
    );
}

#[test]
fn repeated_generated_question_falls_back_to_script() {
    let config = InterviewConfig {
        max_turns: 2,
        ..quick_config()
    };
    let generator = ScriptedGenerator::new(
        &[Some("What is your quota?"), Some("What is your quota?")],
        &[Some("Quotas shape priorities."), Some("Noted, thank you.")],
    );
    let (controller, events) =
        controller_with(config, no_monitoring(), Probes::default(), generator.clone());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    assert_eq!(transcript.questions[2], "What is your quota?");
    assert_eq!(transcript.questions[3], FALLBACK_QUESTIONS[1]);
    assert_eq!(transcript.said("What is your quota?"), 1);
    assert_eq!(generator.question_calls(), 2);
    assert_eq!(transcript.summary.unwrap().questions_asked, 2);
}

#[test]
fn generation_is_retried_the_configured_number_of_times() {
    let config = InterviewConfig {
        generation_attempts: 2,
        ..one_turn()
    };
    let generator = ScriptedGenerator::new(&[], &[]);
    let (controller, events) =
        controller_with(config, no_monitoring(), Probes::default(), generator.clone());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    assert_eq!(generator.question_calls(), 2);
    assert_eq!(generator.remark_calls(), 2);
    assert_eq!(transcript.questions[2], FALLBACK_QUESTIONS[0]);
    assert_eq!(transcript.said(FEEDBACK_FALLBACK), 1);
}

#[test]
fn retry_recovers_after_a_failed_attempt() {
    let generator = ScriptedGenerator::new(
        &[None, Some("Tell me about your best quarter?")],
        &[None, None, Some("Strong quarters come from steady habits.")],
    );
    let (controller, events) =
        controller_with(one_turn(), no_monitoring(), Probes::default(), generator.clone());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    assert_eq!(transcript.questions[2], "Tell me about your best quarter?");
    assert_eq!(transcript.said("Strong quarters come from steady habits."), 1);
    assert_eq!(generator.question_calls(), 2);
    assert_eq!(generator.remark_calls(), 3);
}

#[test]
fn blank_generations_fall_back_to_script() {
    let generator = ScriptedGenerator::new(
        &[Some("   "), Some("\"\""), Some("\u{201c}\u{201d}")],
        &[Some("  "), Some("\"  \""), Some("")],
    );
    let (controller, events) =
        controller_with(one_turn(), no_monitoring(), Probes::default(), generator.clone());
    controller.start().unwrap();

    let transcript = play_candidate(&controller, &events, |_| Some(LONG_ANSWER.to_string()));

    assert_eq!(generator.question_calls(), 3);
    assert_eq!(generator.remark_calls(), 3);
    assert_eq!(transcript.questions[2], FALLBACK_QUESTIONS[0]);
    assert_eq!(transcript.said(FEEDBACK_FALLBACK), 1);
}
