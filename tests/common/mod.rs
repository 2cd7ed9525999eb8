//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use interview_gateway::config::{InterviewConfig, MonitoringConfig};
use interview_gateway::generation::{NoGenerator, TextGenerator};
use interview_gateway::interview::{Collaborators, InterviewController, Probes};
use interview_gateway::transport::{AssistantMessage, InterviewSummary};
use interview_gateway::voice::Silent;
use interview_gateway::{InterviewEvent, Transport};

/// Longest a test waits for any single event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport that forwards every event to the test thread
pub struct ChannelTransport {
    tx: Sender<InterviewEvent>,
}

impl Transport for ChannelTransport {
    fn send(&self, event: InterviewEvent) -> interview_gateway::Result<()> {
        self.tx
            .send(event)
            .map_err(|e| interview_gateway::Error::Transport(e.to_string()))
    }
}

/// A channel transport and the receiving end of its events
#[must_use]
pub fn channel_transport() -> (Arc<ChannelTransport>, Receiver<InterviewEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Arc::new(ChannelTransport { tx }), rx)
}

/// Interview pacing with every pause removed
#[must_use]
pub fn quick_config() -> InterviewConfig {
    InterviewConfig {
        answer_timeout: Duration::from_secs(5),
        turn_pause: Duration::ZERO,
        speak_pause: Duration::ZERO,
        speak_pause_per_word: Duration::ZERO,
        generation_retry_delay: Duration::ZERO,
        join_timeout: Duration::from_secs(3),
        ..InterviewConfig::default()
    }
}

/// Monitoring switched off
#[must_use]
pub fn no_monitoring() -> MonitoringConfig {
    MonitoringConfig {
        enabled: false,
        ..MonitoringConfig::default()
    }
}

/// An initialized controller with silent speech and no generator
#[must_use]
pub fn controller(
    interview: InterviewConfig,
    monitoring: MonitoringConfig,
    probes: Probes,
) -> (Arc<InterviewController>, Receiver<InterviewEvent>) {
    controller_with(interview, monitoring, probes, Arc::new(NoGenerator))
}

/// An initialized controller with silent speech and the given generator
#[must_use]
pub fn controller_with(
    interview: InterviewConfig,
    monitoring: MonitoringConfig,
    probes: Probes,
    generator: Arc<dyn TextGenerator>,
) -> (Arc<InterviewController>, Receiver<InterviewEvent>) {
    let (transport, events) = channel_transport();
    let controller = InterviewController::new(
        interview,
        monitoring,
        Collaborators {
            speech: Arc::new(Silent),
            generator,
            transport,
        },
        probes,
    );
    controller.initialize();
    (Arc::new(controller), events)
}

/// Generator that replays queued replies and counts calls
///
/// Question and feedback prompts draw from separate queues. `None` entries and
/// an empty queue both fail the call.
#[derive(Default)]
pub struct ScriptedGenerator {
    questions: Mutex<VecDeque<Option<String>>>,
    remarks: Mutex<VecDeque<Option<String>>>,
    question_calls: AtomicUsize,
    remark_calls: AtomicUsize,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new(questions: &[Option<&str>], remarks: &[Option<&str>]) -> Arc<Self> {
        fn queue(items: &[Option<&str>]) -> Mutex<VecDeque<Option<String>>> {
            Mutex::new(items.iter().map(|item| item.map(str::to_string)).collect())
        }

        Arc::new(Self {
            questions: queue(questions),
            remarks: queue(remarks),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn question_calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn remark_calls(&self) -> usize {
        self.remark_calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> interview_gateway::Result<String> {
        let (queue, calls) = if prompt.contains("The candidate just said") {
            (&self.remarks, &self.remark_calls)
        } else {
            (&self.questions, &self.question_calls)
        };
        calls.fetch_add(1, Ordering::SeqCst);

        queue
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| interview_gateway::Error::Generation("scripted failure".to_string()))
    }
}

/// What a scripted candidate saw during one interview
#[derive(Debug, Default)]
pub struct Transcript {
    /// Every interviewer line, in order
    pub lines: Vec<AssistantMessage>,
    /// Lines that waited for an answer
    pub questions: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: Option<InterviewSummary>,
}

impl Transcript {
    #[must_use]
    pub fn said(&self, text: &str) -> usize {
        self.lines.iter().filter(|line| line.text == text).count()
    }
}

/// Answer every question with `answer(question)` until the interview completes
///
/// `None` lets the question time out.
pub fn play_candidate(
    controller: &InterviewController,
    events: &Receiver<InterviewEvent>,
    mut answer: impl FnMut(&str) -> Option<String>,
) -> Transcript {
    let mut transcript = Transcript::default();

    loop {
        let event = events
            .recv_timeout(EVENT_TIMEOUT)
            .expect("interview stalled");

        match event {
            InterviewEvent::Message(message) => transcript.lines.push(message),
            InterviewEvent::Waiting { waiting: true, .. } => {
                let question = transcript
                    .lines
                    .last()
                    .map(|line| line.text.clone())
                    .unwrap_or_default();
                if let Some(reply) = answer(&question) {
                    controller.submit_answer(&reply).expect("controller initialized");
                }
                transcript.questions.push(question);
            }
            InterviewEvent::Warning(notice) => transcript.warnings.push(notice.kind),
            InterviewEvent::Complete(summary) => {
                transcript.summary = Some(summary);
                return transcript;
            }
            InterviewEvent::Waiting { .. } | InterviewEvent::Phase(_) => {}
        }
    }
}

/// Block until the sequencer waits for its first answer
pub fn wait_for_question(events: &Receiver<InterviewEvent>) {
    loop {
        let event = events
            .recv_timeout(EVENT_TIMEOUT)
            .expect("no question asked");
        if matches!(event, InterviewEvent::Waiting { waiting: true, .. }) {
            return;
        }
    }
}

/// Drain events until the completion summary arrives
pub fn wait_for_summary(events: &Receiver<InterviewEvent>) -> InterviewSummary {
    loop {
        let event = events
            .recv_timeout(EVENT_TIMEOUT)
            .expect("interview never completed");
        if let InterviewEvent::Complete(summary) = event {
            return summary;
        }
    }
}
