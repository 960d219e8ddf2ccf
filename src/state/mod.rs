mod lifecycle;
mod lobby;
pub mod pool;
mod quiz;
mod session;

use crate::broadcast::QuizTopics;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use lobby::{Lobby, LobbyJoin};
pub use quiz::NewQuiz;
pub use session::AnswerOutcome;

/// Shared application state.
///
/// The lobby arena for a quiz lives behind its own lock, independent of the
/// quiz record, so membership mutations never race against status writes and
/// mutations to different quizzes do not contend.
#[derive(Clone)]
pub struct AppState {
    pub quizzes: Arc<RwLock<HashMap<QuizId, Quiz>>>,
    pub questions: Arc<RwLock<HashMap<QuizId, Vec<Question>>>>,
    pub lobbies: Arc<RwLock<HashMap<QuizId, Arc<RwLock<Lobby>>>>>,
    /// Maps a lobby entry back to its quiz, so leave() needs only the lobby id.
    pub lobby_index: Arc<RwLock<HashMap<LobbyId, QuizId>>>,
    pub sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    pub answers: Arc<RwLock<HashMap<SessionId, Vec<Answer>>>>,
    /// Guest idempotency tokens: (quiz id, client token) -> session.
    pub guest_tokens: Arc<RwLock<HashMap<(QuizId, String), SessionId>>>,
    pub topics: Arc<QuizTopics>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            quizzes: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(HashMap::new())),
            lobbies: Arc::new(RwLock::new(HashMap::new())),
            lobby_index: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            answers: Arc::new(RwLock::new(HashMap::new())),
            guest_tokens: Arc::new(RwLock::new(HashMap::new())),
            topics: Arc::new(QuizTopics::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
