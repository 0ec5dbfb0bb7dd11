//! Prompt construction for the generation backend.
//!
//! Pure string building: given a transcript and an action, produce the exact
//! user prompt. Deterministic, no side effects.

/// The study artifact a pipeline invocation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// One informative paragraph summarizing the transcript
    Summarize,
    /// An engaging introduction that provokes curiosity
    Introduce,
    /// An answer to the carried question, grounded in the transcript
    Answer(String),
    /// Exactly three quiz questions, numbered 1-3
    Quiz,
}

impl ActionKind {
    /// Short label used in logs and rendered output headings.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Summarize => "summary",
            ActionKind::Introduce => "introduction",
            ActionKind::Answer(_) => "answer",
            ActionKind::Quiz => "quiz",
        }
    }
}

/// System role instruction sent with every generation request.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an AI study assistant working from video transcripts. Provide concise, \
informative output that captures the spoken content of the video.
Instructions:
1. Base everything on the transcript; do not invent content.
2. Focus on the spoken content (Text) of the video.";

/// Build the user prompt for the given transcript and action.
pub fn compose(transcript: &str, action: &ActionKind) -> String {
    match action {
        ActionKind::Summarize => format!(
            "Summarize the following transcript in a single informative paragraph. \
Emphasize what a student should take away from it.\n\nTranscript:\n{}",
            transcript
        ),
        ActionKind::Introduce => format!(
            "Write an engaging introduction for the video this transcript came from. \
Make the reader curious to watch it.\n\nTranscript:\n{}",
            transcript
        ),
        ActionKind::Answer(question) => format!(
            "Using the transcript below as grounding context, answer the question in a way \
that is useful for studying.\n\nQuestion: {}\n\nTranscript:\n{}",
            question, transcript
        ),
        ActionKind::Quiz => format!(
            "Write exactly three quiz questions derived from the following transcript, \
numbered 1-3.\n\nTranscript:\n{}",
            transcript
        ),
    }
}
