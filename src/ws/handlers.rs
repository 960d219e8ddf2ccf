//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Connection-role authorization is checked here, then dispatched to the
//! role-specific handler modules. Subscription control messages are handled
//! directly in the socket loop, not here.

use crate::error::QuizError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;

use super::{organizer, participant};

/// Macro to check organizer authorization and return early if unauthorized
macro_rules! check_organizer {
    ($role:expr, $action:expr) => {
        if *$role != Role::Organizer {
            return Some(ServerMessage::Error {
                code: "FORBIDDEN".to_string(),
                msg: format!("Only the organizer can {}", $action),
            });
        }
    };
}

/// Map a domain rejection onto the wire error shape.
pub(super) fn reject(e: QuizError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &AppState,
) -> Option<ServerMessage> {
    match msg {
        // Handled in the socket loop; inert here.
        ClientMessage::SubscribeQuiz { .. } | ClientMessage::UnsubscribeQuiz => None,

        // Anyone may query status or the leaderboard.
        ClientMessage::QuizStatus { quiz_id } => {
            Some(participant::handle_quiz_status(state, quiz_id).await)
        }
        ClientMessage::GetLeaderboard { quiz_id } => {
            Some(participant::handle_leaderboard(state, quiz_id).await)
        }

        // Participant messages
        ClientMessage::JoinLobby { name, code } => {
            Some(participant::handle_join_lobby(state, name, code).await)
        }
        ClientMessage::LeaveLobby { lobby_id } => {
            Some(participant::handle_leave_lobby(state, lobby_id).await)
        }
        ClientMessage::StartSession {
            quiz_id,
            participant_id,
        } => Some(participant::handle_start_session(state, quiz_id, participant_id).await),
        ClientMessage::SubmitAnswer {
            session_id,
            participant_id,
            question_id,
            value,
            time_spent_seconds,
        } => Some(
            participant::handle_submit_answer(
                state,
                session_id,
                participant_id,
                question_id,
                value,
                time_spent_seconds,
            )
            .await,
        ),
        ClientMessage::CompleteSession {
            session_id,
            participant_id,
        } => Some(participant::handle_complete_session(state, session_id, participant_id).await),
        ClientMessage::GetSession {
            session_id,
            participant_id,
        } => Some(participant::handle_get_session(state, session_id, participant_id).await),
        ClientMessage::TakeQuiz { code } => {
            Some(participant::handle_take_quiz(state, code).await)
        }
        ClientMessage::SubmitGuestAttempt {
            code,
            guest_name,
            client_token,
            answers,
        } => Some(
            participant::handle_guest_attempt(state, code, guest_name, client_token, answers)
                .await,
        ),

        // Organizer-only commands (connection role checked before dispatch;
        // ownership is verified against the quiz record inside the state layer)
        ClientMessage::StartQuiz {
            quiz_id,
            organizer_id,
        } => {
            check_organizer!(role, "start a quiz");
            Some(organizer::handle_start_quiz(state, quiz_id, organizer_id).await)
        }
        ClientMessage::EndQuiz {
            quiz_id,
            organizer_id,
        } => {
            check_organizer!(role, "end a quiz");
            Some(organizer::handle_end_quiz(state, quiz_id, organizer_id).await)
        }
        ClientMessage::ListLobby { quiz_id } => {
            check_organizer!(role, "list the lobby");
            Some(organizer::handle_list_lobby(state, quiz_id).await)
        }
    }
}
