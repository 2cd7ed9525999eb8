//! Fixed interview lines, fallback questions and generation prompts

use std::fmt::Write as _;

use super::session::HistoryEntry;

pub const GREETING: &str =
    "Hello! I'm Gyani, your AI interviewer for this SaaS Sales role. Welcome to the interview!";
pub const DAY_CHECK: &str =
    "Before we dive into the sales questions, how has your day been so far?";
pub const DAY_ACK: &str =
    "That's great to hear! I appreciate you taking the time for this interview.";
pub const INTRO_REQUEST: &str = "To start, could you please introduce yourself and tell me a bit about your background in sales, particularly any experience with SaaS products?";
pub const INTRO_ACK: &str =
    "Thank you for that introduction. It's great to hear about your experience.";
pub const INTRO_SHORT_ACK: &str = "Okay, thank you.";

pub const CLARIFY: &str =
    "I'd love to hear more about your experience. Could you elaborate on that?";
pub const CLARIFY_ACK: &str = "Thank you for sharing that.";
pub const MOVE_ON: &str = "Let me ask you a different question.";
pub const FEEDBACK_FALLBACK: &str = "Thanks for sharing that.";

pub const CONCLUSION: &str =
    "That was a great conversation. Thank you for sharing your insights about SaaS sales.";
pub const ANY_QUESTIONS: &str =
    "Do you have any questions for me about the role, the company, or the next steps?";
pub const QUESTIONS_ACK: &str = "Those are great questions! The hiring team will be in touch with more details on the next steps very soon.";
pub const NO_QUESTIONS_ACK: &str =
    "If you don't have any questions right now, that's perfectly fine.";
pub const FAREWELL: &str = "Thank you so much for your time today. It was a pleasure speaking with you, and I wish you the best of luck!";

pub const TECHNICAL_ISSUE: &str =
    "We've encountered a technical issue. Thank you for your time today!";

/// Ordered fallback questions, one per turn
pub const FALLBACK_QUESTIONS: [&str; 7] = [
    "Can you walk me through your typical sales process when approaching a potential SaaS client?",
    "How do you handle objections when a prospect says your SaaS solution is too expensive?",
    "Describe a challenging SaaS deal you closed. What obstacles did you overcome?",
    "How do you identify and qualify leads for B2B SaaS products?",
    "What strategies do you use to demonstrate ROI to potential SaaS customers?",
    "How do you handle long sales cycles typical in enterprise SaaS sales?",
    "Tell me about a time you lost a significant SaaS deal. What did you learn?",
];

/// Asked once the fallback list is exhausted
pub const GENERIC_QUESTION: &str =
    "What do you think is the most important skill for a successful SaaS salesperson?";

/// Fallback for `turn`, or the generic question past the end of the list
#[must_use]
pub fn fallback_question(turn: usize) -> &'static str {
    FALLBACK_QUESTIONS.get(turn).copied().unwrap_or(GENERIC_QUESTION)
}

/// Number of whitespace-separated words
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Prompt for the next interview question
#[must_use]
pub fn question_prompt(context: &[HistoryEntry]) -> String {
    let mut recent = String::new();
    for entry in context {
        if !recent.is_empty() {
            recent.push(' ');
        }
        recent.push_str(&entry.content);
    }

    let mut prompt = String::from(
        "As a friendly and professional SaaS sales interviewer, ask one engaging question based on this conversation context.\n\
         The question should:\n\
         - Be encouraging and conversational\n\
         - Build on what the candidate has shared about their sales background\n\
         - Test practical SaaS sales knowledge and experience\n\
         - Keep it to one clear question\n\
         - Focus on real-world SaaS sales scenarios\n\
         - Avoid repeating previous questions\n\
         - Be short and concise\n\n",
    );
    let _ = write!(prompt, "Recent conversation: {recent}\n\n");
    prompt.push_str("Generate only the question in a friendly, professional tone.");
    prompt
}

/// Prompt for a short remark on the candidate's answer
#[must_use]
pub fn feedback_prompt(answer: &str) -> String {
    format!(
        "You are a friendly SaaS sales interviewer. The candidate just said:\n\n\
         \"{answer}\"\n\n\
         Respond with one thoughtful follow-up comment. It should:\n\
         - Be relevant to the content\n\
         - Encourage further elaboration or reflection\n\
         - Be very short (1-2 sentences)\n\
         - Avoid generic phrases like \"That's great\"\n\n\
         Say only the comment, nothing else."
    )
}

/// Strip whitespace and wrapping quotes from generated text
#[must_use]
pub fn clean_generated(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim()
        .to_string()
}
