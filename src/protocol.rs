use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a quiz's event scope; subsequent broadcasts for that quiz are
    /// delivered on this connection.
    SubscribeQuiz {
        quiz_id: QuizId,
    },
    /// Leave the current event scope.
    UnsubscribeQuiz,
    JoinLobby {
        name: String,
        code: String,
    },
    LeaveLobby {
        lobby_id: LobbyId,
    },
    ListLobby {
        quiz_id: QuizId,
    },
    QuizStatus {
        quiz_id: QuizId,
    },
    // Organizer-only messages
    StartQuiz {
        quiz_id: QuizId,
        organizer_id: OrganizerId,
    },
    EndQuiz {
        quiz_id: QuizId,
        organizer_id: OrganizerId,
    },
    // Registered taker messages
    StartSession {
        quiz_id: QuizId,
        participant_id: ParticipantId,
    },
    SubmitAnswer {
        session_id: SessionId,
        participant_id: ParticipantId,
        question_id: QuestionId,
        value: String,
        time_spent_seconds: Option<u32>,
    },
    CompleteSession {
        session_id: SessionId,
        participant_id: ParticipantId,
    },
    GetSession {
        session_id: SessionId,
        participant_id: ParticipantId,
    },
    // Anonymous taker messages
    TakeQuiz {
        code: String,
    },
    SubmitGuestAttempt {
        code: String,
        guest_name: String,
        /// Client-generated idempotency token; resubmission replaces.
        client_token: String,
        answers: Vec<GuestAnswerSubmission>,
    },
    GetLeaderboard {
        quiz_id: QuizId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        server_now: String,
    },
    Subscribed {
        quiz_id: QuizId,
    },
    Unsubscribed,
    // Per-quiz broadcast events
    LobbyUpdate {
        quiz_id: QuizId,
        participants: Vec<LobbyParticipant>,
    },
    ParticipantJoined {
        participant: LobbyParticipant,
    },
    ParticipantLeft {
        lobby_id: LobbyId,
    },
    ParticipantRemoved {
        lobby_id: LobbyId,
    },
    QuizStarted {
        quiz_id: QuizId,
        started_at: String,
    },
    QuizEnded {
        quiz_id: QuizId,
    },
    QuizStatusChange {
        quiz_id: QuizId,
        status: QuizStatus,
    },
    LeaderboardUpdate {
        quiz_id: QuizId,
        entries: Vec<LeaderboardEntry>,
    },
    // Request/response payloads
    LobbyJoined {
        lobby_id: LobbyId,
        quiz_id: QuizId,
        quiz_title: String,
    },
    LobbyLeft {
        lobby_id: LobbyId,
    },
    LobbyRoster {
        quiz_id: QuizId,
        participants: Vec<LobbyParticipant>,
    },
    Status {
        quiz_id: QuizId,
        status: QuizStatus,
    },
    SessionStarted {
        session: SessionView,
        questions: Vec<PublicQuestion>,
    },
    AnswerResult {
        is_correct: bool,
        points_earned: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    SessionCompleted {
        session: SessionView,
    },
    SessionState {
        session: SessionView,
        answers: Vec<Answer>,
    },
    QuizQuestions {
        view: TakeQuizView,
    },
    GuestResult {
        result: GuestAttemptResult,
    },
    Leaderboard {
        quiz_id: QuizId,
        entries: Vec<LeaderboardEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Question as delivered to takers: no correct answer, no explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<String>,
    pub points: u32,
    pub time_limit_seconds: Option<u32>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            kind: q.kind,
            text: q.text.clone(),
            options: q.options.clone(),
            points: q.points,
            time_limit_seconds: q.time_limit_seconds,
        }
    }
}

/// Session as exposed to its taker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub quiz_id: QuizId,
    pub score: u32,
    pub total_points: u32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            quiz_id: s.quiz_id.clone(),
            score: s.score,
            total_points: s.total_points,
            status: s.status,
            started_at: s.started_at,
            completed_at: s.completed_at,
            time_spent_seconds: s.time_spent_seconds,
            percentage: s.percentage,
            passed: s.passed,
        }
    }
}

/// The public "take quiz" view for anonymous takers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeQuizView {
    pub quiz_id: QuizId,
    pub title: String,
    pub duration_minutes: Option<u32>,
    pub question_count: usize,
    pub questions: Vec<PublicQuestion>,
}

/// One answer inside an anonymous bulk submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestAnswerSubmission {
    pub question_id: QuestionId,
    pub value: String,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestAttemptResult {
    pub session_id: SessionId,
    pub score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub session_id: SessionId,
    pub display_name: String,
    pub is_guest: bool,
    pub score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub completed_at: Option<DateTime<Utc>>,
}
