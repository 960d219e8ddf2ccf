//! Participant and guest message handlers
//!
//! Lobby membership, session play, and the anonymous take-quiz path.

use super::handlers::reject;
use crate::protocol::{GuestAnswerSubmission, PublicQuestion, ServerMessage, SessionView};
use crate::state::AppState;

pub async fn handle_quiz_status(state: &AppState, quiz_id: String) -> ServerMessage {
    match state.quiz_status(&quiz_id).await {
        Ok(status) => ServerMessage::Status { quiz_id, status },
        Err(e) => reject(e),
    }
}

pub async fn handle_join_lobby(state: &AppState, name: String, code: String) -> ServerMessage {
    match state.join_lobby(&name, &code).await {
        Ok(join) => ServerMessage::LobbyJoined {
            lobby_id: join.lobby_id,
            quiz_id: join.quiz_id,
            quiz_title: join.quiz_title,
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_leave_lobby(state: &AppState, lobby_id: String) -> ServerMessage {
    // Unknown ids are a no-op: leaving twice must be retry-safe.
    state.leave_lobby(&lobby_id).await;
    ServerMessage::LobbyLeft { lobby_id }
}

pub async fn handle_start_session(
    state: &AppState,
    quiz_id: String,
    participant_id: String,
) -> ServerMessage {
    match state.start_session(&quiz_id, &participant_id).await {
        Ok((session, questions)) => ServerMessage::SessionStarted {
            session: SessionView::from(&session),
            questions: questions.iter().map(PublicQuestion::from).collect(),
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_submit_answer(
    state: &AppState,
    session_id: String,
    participant_id: String,
    question_id: String,
    value: String,
    time_spent_seconds: Option<u32>,
) -> ServerMessage {
    match state
        .submit_answer(
            &session_id,
            &participant_id,
            &question_id,
            &value,
            time_spent_seconds,
        )
        .await
    {
        Ok(outcome) => ServerMessage::AnswerResult {
            is_correct: outcome.is_correct,
            points_earned: outcome.points_earned,
            correct_answer: outcome.correct_answer,
            explanation: outcome.explanation,
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_complete_session(
    state: &AppState,
    session_id: String,
    participant_id: String,
) -> ServerMessage {
    match state.complete_session(&session_id, &participant_id).await {
        Ok(session) => ServerMessage::SessionCompleted {
            session: SessionView::from(&session),
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_get_session(
    state: &AppState,
    session_id: String,
    participant_id: String,
) -> ServerMessage {
    match state.get_session(&session_id, &participant_id).await {
        Ok((session, answers)) => ServerMessage::SessionState {
            session: SessionView::from(&session),
            answers,
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_take_quiz(state: &AppState, code: String) -> ServerMessage {
    match state.take_quiz_questions(&code).await {
        Ok(view) => ServerMessage::QuizQuestions { view },
        Err(e) => reject(e),
    }
}

pub async fn handle_guest_attempt(
    state: &AppState,
    code: String,
    guest_name: String,
    client_token: String,
    answers: Vec<GuestAnswerSubmission>,
) -> ServerMessage {
    match state
        .submit_guest_attempt(&code, &guest_name, &client_token, &answers)
        .await
    {
        Ok(result) => ServerMessage::GuestResult { result },
        Err(e) => reject(e),
    }
}

pub async fn handle_leaderboard(state: &AppState, quiz_id: String) -> ServerMessage {
    let entries = state.leaderboard(&quiz_id).await;
    ServerMessage::Leaderboard { quiz_id, entries }
}
