//! Organizer message handlers
//!
//! Lifecycle control and lobby oversight. Ownership of the quiz itself is
//! enforced in the state layer against the quiz record's organizer id.

use super::handlers::reject;
use crate::protocol::ServerMessage;
use crate::state::AppState;

pub async fn handle_start_quiz(
    state: &AppState,
    quiz_id: String,
    organizer_id: String,
) -> ServerMessage {
    match state.start_quiz(&quiz_id, &organizer_id).await {
        Ok(quiz) => ServerMessage::Status {
            quiz_id: quiz.id,
            status: quiz.status,
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_end_quiz(
    state: &AppState,
    quiz_id: String,
    organizer_id: String,
) -> ServerMessage {
    match state.end_quiz(&quiz_id, &organizer_id).await {
        Ok(quiz) => ServerMessage::Status {
            quiz_id: quiz.id,
            status: quiz.status,
        },
        Err(e) => reject(e),
    }
}

pub async fn handle_list_lobby(state: &AppState, quiz_id: String) -> ServerMessage {
    let participants = state.lobby_participants(&quiz_id).await;
    ServerMessage::LobbyRoster {
        quiz_id,
        participants,
    }
}
