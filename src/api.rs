//! HTTP API endpoints.
//!
//! Every broadcast-driving operation is also exposed here as plain
//! request/response, so a client that missed an event can always re-derive
//! the authoritative state with a direct query.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::protocol::{
    GuestAnswerSubmission, GuestAttemptResult, LeaderboardEntry, PublicQuestion, SessionView,
    TakeQuizView,
};
use crate::state::{AppState, NewQuiz};
use crate::types::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/quizzes", post(create_quiz))
        .route("/api/quizzes/{id}/status", get(quiz_status))
        .route("/api/quizzes/{id}/start", post(start_quiz))
        .route("/api/quizzes/{id}/end", post(end_quiz))
        .route("/api/quizzes/{id}/lobby", get(list_lobby))
        .route("/api/quizzes/{id}/leaderboard", get(leaderboard))
        .route("/api/lobby/join", post(join_lobby))
        .route("/api/lobby/{lobby_id}", delete(leave_lobby))
        .route("/api/take/{code}", get(take_quiz))
        .route("/api/take/{code}/submit", post(submit_guest_attempt))
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/answers", post(submit_answer))
        .route("/api/sessions/{id}/complete", post(complete_session))
}

#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    pub title: String,
    pub organizer_id: OrganizerId,
    #[serde(default)]
    pub config: QuizConfig,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub questions: Vec<NewQuestion>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NewQuestion {
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    #[serde(default)]
    pub order_index: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_points() -> u32 {
    1
}

/// Seed a quiz record plus its question bank.
///
/// POST /api/quizzes
async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<Json<Quiz>, QuizError> {
    if req.title.trim().is_empty() {
        return Err(QuizError::Validation("Title must not be empty".to_string()));
    }
    let questions = req
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: String::new(),
            quiz_id: String::new(),
            kind: q.kind,
            text: q.text,
            options: q.options,
            correct_answer: q.correct_answer,
            explanation: q.explanation,
            points: q.points,
            time_limit_seconds: q.time_limit_seconds,
            order_index: q.order_index.unwrap_or(i as u32),
            tags: q.tags,
            is_active: q.is_active,
        })
        .collect();

    let quiz = state
        .create_quiz(
            NewQuiz {
                title: req.title,
                organizer_id: req.organizer_id,
                config: req.config,
                is_active: req.is_active,
                starts_at: req.starts_at,
                expires_at: req.expires_at,
            },
            questions,
        )
        .await;
    Ok(Json(quiz))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    quiz_id: QuizId,
    status: QuizStatus,
}

/// GET /api/quizzes/{id}/status
async fn quiz_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, QuizError> {
    let status = state.quiz_status(&id).await?;
    Ok(Json(StatusResponse {
        quiz_id: id,
        status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct OrganizerAction {
    pub organizer_id: OrganizerId,
}

/// POST /api/quizzes/{id}/start
async fn start_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OrganizerAction>,
) -> Result<Json<Quiz>, QuizError> {
    Ok(Json(state.start_quiz(&id, &req.organizer_id).await?))
}

/// POST /api/quizzes/{id}/end
async fn end_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OrganizerAction>,
) -> Result<Json<Quiz>, QuizError> {
    Ok(Json(state.end_quiz(&id, &req.organizer_id).await?))
}

/// GET /api/quizzes/{id}/lobby
async fn list_lobby(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<LobbyParticipant>> {
    Json(state.lobby_participants(&id).await)
}

/// GET /api/quizzes/{id}/leaderboard
async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<LeaderboardEntry>> {
    Json(state.leaderboard(&id).await)
}

#[derive(Debug, Deserialize)]
pub struct JoinLobbyRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
struct JoinLobbyResponse {
    lobby_id: LobbyId,
    quiz_id: QuizId,
    quiz_title: String,
}

/// POST /api/lobby/join
async fn join_lobby(
    State(state): State<AppState>,
    Json(req): Json<JoinLobbyRequest>,
) -> Result<Json<JoinLobbyResponse>, QuizError> {
    let join = state.join_lobby(&req.name, &req.code).await?;
    Ok(Json(JoinLobbyResponse {
        lobby_id: join.lobby_id,
        quiz_id: join.quiz_id,
        quiz_title: join.quiz_title,
    }))
}

/// DELETE /api/lobby/{lobby_id}
///
/// Removing an unknown lobby id is a success, so client retries are safe.
async fn leave_lobby(State(state): State<AppState>, Path(lobby_id): Path<String>) -> StatusCode {
    state.leave_lobby(&lobby_id).await;
    StatusCode::NO_CONTENT
}

/// GET /api/take/{code}
async fn take_quiz(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TakeQuizView>, QuizError> {
    Ok(Json(state.take_quiz_questions(&code).await?))
}

#[derive(Debug, Deserialize)]
pub struct GuestAttemptRequest {
    pub guest_name: String,
    pub client_token: String,
    pub answers: Vec<GuestAnswerSubmission>,
}

/// POST /api/take/{code}/submit
async fn submit_guest_attempt(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<GuestAttemptRequest>,
) -> Result<Json<GuestAttemptResult>, QuizError> {
    let result = state
        .submit_guest_attempt(&code, &req.guest_name, &req.client_token, &req.answers)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub quiz_id: QuizId,
    pub participant_id: ParticipantId,
}

#[derive(Debug, Serialize)]
struct StartSessionResponse {
    session: SessionView,
    questions: Vec<PublicQuestion>,
}

/// POST /api/sessions
async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let (session, questions) = state
        .start_session(&req.quiz_id, &req.participant_id)
        .await?;
    Ok(Json(StartSessionResponse {
        session: SessionView::from(&session),
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TakerQuery {
    pub participant_id: ParticipantId,
}

#[derive(Debug, Serialize)]
struct SessionStateResponse {
    session: SessionView,
    answers: Vec<Answer>,
}

/// GET /api/sessions/{id}?participant_id=...
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TakerQuery>,
) -> Result<impl IntoResponse, QuizError> {
    let (session, answers) = state.get_session(&id, &query.participant_id).await?;
    Ok(Json(SessionStateResponse {
        session: SessionView::from(&session),
        answers,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub participant_id: ParticipantId,
    pub question_id: QuestionId,
    pub value: String,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    is_correct: bool,
    points_earned: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

/// POST /api/sessions/{id}/answers
async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let outcome = state
        .submit_answer(
            &id,
            &req.participant_id,
            &req.question_id,
            &req.value,
            req.time_spent_seconds,
        )
        .await?;
    Ok(Json(AnswerResponse {
        is_correct: outcome.is_correct,
        points_earned: outcome.points_earned,
        correct_answer: outcome.correct_answer,
        explanation: outcome.explanation,
    }))
}

/// POST /api/sessions/{id}/complete
async fn complete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TakerQuery>,
) -> Result<Json<SessionView>, QuizError> {
    let session = state.complete_session(&id, &req.participant_id).await?;
    Ok(Json(SessionView::from(&session)))
}
