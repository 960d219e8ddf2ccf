use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type QuizId = String;
pub type QuestionId = String;
pub type SessionId = String;
pub type LobbyId = String;
pub type ParticipantId = String;
pub type OrganizerId = String;

/// Lifecycle status of a quiz. Legacy records without a status are DRAFT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizStatus {
    #[default]
    Draft,
    Waiting,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

/// Scoring and delivery configuration for a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Minimum percentage to pass. 0 means any attempt passes.
    #[serde(default)]
    pub passing_score: f64,
    /// Completed attempts allowed per registered participant. 0 = unlimited.
    #[serde(default)]
    pub max_attempts: u32,
    /// Wall-clock cap for a session; exceeding it at completion means TIMED_OUT.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub randomize_options: bool,
    /// Reveal correct answer + explanation in answer responses.
    #[serde(default)]
    pub show_answers: bool,
    /// Deliver at most this many questions per taker.
    #[serde(default)]
    pub question_pool_size: Option<usize>,
    /// When non-empty, only questions tagged with at least one of these are delivered.
    #[serde(default)]
    pub question_pool_tags: Vec<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            passing_score: 0.0,
            max_attempts: 0,
            duration_minutes: None,
            shuffle_questions: false,
            randomize_options: false,
            show_answers: false,
            question_pool_size: None,
            question_pool_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    /// Short join code, globally unique and immutable once assigned.
    pub code: String,
    pub title: String,
    pub organizer_id: OrganizerId,
    #[serde(default)]
    pub status: QuizStatus,
    pub config: QuizConfig,
    pub is_active: bool,
    /// Earliest moment the quiz may be taken.
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub kind: QuestionKind,
    pub text: String,
    /// Choice texts for multiple-choice; empty otherwise.
    #[serde(default)]
    pub options: Vec<String>,
    /// The correct answer as a value, never a position index.
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub points: u32,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    pub order_index: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
}

/// Ephemeral lobby membership record. Exists only before the quiz starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyParticipant {
    pub id: LobbyId,
    pub quiz_id: QuizId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// Who is taking a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Taker {
    Registered { participant_id: ParticipantId },
    Guest { name: String, token: String },
}

impl Taker {
    pub fn display_name(&self) -> &str {
        match self {
            Taker::Registered { participant_id } => participant_id,
            Taker::Guest { name, .. } => name,
        }
    }
}

/// One taker's attempt at a quiz. Immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub quiz_id: QuizId,
    pub taker: Taker,
    pub score: u32,
    /// Fixed at creation from the delivered question set; later question-bank
    /// edits never change an in-flight session's total.
    pub total_points: u32,
    pub status: SessionStatus,
    /// The exact pool delivered to this taker, in delivery order.
    pub question_ids: Vec<QuestionId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub value: String,
    pub is_correct: bool,
    pub points_earned: u32,
    pub time_spent_seconds: Option<u32>,
}

/// Connection role for WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Participant,
}
