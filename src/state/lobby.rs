//! Lobby membership.
//!
//! Each quiz gets its own arena of LobbyParticipant records behind its own
//! lock: the outer map is write-locked only to create an arena, so join and
//! leave traffic on different quizzes never contends, and a concurrent
//! status write on the quiz record can never clobber membership.

use super::AppState;
use crate::error::QuizError;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-quiz arena of waiting participants.
#[derive(Debug, Default)]
pub struct Lobby {
    participants: Vec<LobbyParticipant>,
}

impl Lobby {
    fn insert(&mut self, participant: LobbyParticipant) {
        self.participants.push(participant);
    }

    fn remove(&mut self, lobby_id: &str) -> Option<LobbyParticipant> {
        let idx = self.participants.iter().position(|p| p.id == lobby_id)?;
        Some(self.participants.remove(idx))
    }

    /// Snapshot ordered by join time ascending.
    fn snapshot(&self) -> Vec<LobbyParticipant> {
        let mut list = self.participants.clone();
        list.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        list
    }
}

/// What a successful join returns to the joining client.
#[derive(Debug, Clone)]
pub struct LobbyJoin {
    pub lobby_id: LobbyId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
}

impl AppState {
    async fn lobby_arena(&self, quiz_id: &str) -> Arc<RwLock<Lobby>> {
        if let Some(arena) = self.lobbies.read().await.get(quiz_id) {
            return arena.clone();
        }
        let mut lobbies = self.lobbies.write().await;
        lobbies
            .entry(quiz_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Lobby::default())))
            .clone()
    }

    /// Join a quiz's lobby by code.
    ///
    /// Resolves the code, rejects expired quizzes distinctly from unknown
    /// codes, triggers the WAITING transition, and inserts the participant.
    /// The status write and the membership insert are independent idempotent
    /// operations; neither can lose the other under concurrency.
    pub async fn join_lobby(&self, name: &str, code: &str) -> Result<LobbyJoin, QuizError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuizError::Validation(
                "Display name must not be empty".to_string(),
            ));
        }

        let quiz = self.get_quiz_by_code(code).await?;
        if let Some(expires_at) = quiz.expires_at {
            if chrono::Utc::now() > expires_at {
                return Err(QuizError::Expired(format!("Quiz {} has expired", quiz.id)));
            }
        }
        if quiz.status == QuizStatus::InProgress {
            return Err(QuizError::InvalidState(
                "Quiz is already in progress".to_string(),
            ));
        }

        self.mark_waiting_on_join(&quiz.id).await;

        let participant = LobbyParticipant {
            id: ulid::Ulid::new().to_string(),
            quiz_id: quiz.id.clone(),
            display_name: name.to_string(),
            joined_at: chrono::Utc::now(),
        };

        let arena = self.lobby_arena(&quiz.id).await;
        arena.write().await.insert(participant.clone());
        self.lobby_index
            .write()
            .await
            .insert(participant.id.clone(), quiz.id.clone());

        tracing::info!("{} joined lobby of quiz {}", name, quiz.id);
        self.topics
            .publish(
                &quiz.id,
                ServerMessage::ParticipantJoined {
                    participant: participant.clone(),
                },
            )
            .await;
        self.broadcast_lobby_update(&quiz.id).await;

        Ok(LobbyJoin {
            lobby_id: participant.id,
            quiz_id: quiz.id,
            quiz_title: quiz.title,
        })
    }

    /// Read-only roster snapshot, ordered by join time ascending.
    pub async fn lobby_participants(&self, quiz_id: &str) -> Vec<LobbyParticipant> {
        match self.lobbies.read().await.get(quiz_id) {
            Some(arena) => arena.read().await.snapshot(),
            None => Vec::new(),
        }
    }

    /// Remove one participant. Removing an unknown lobby id is a no-op, not an
    /// error, so client retries and double-clicks are safe.
    pub async fn leave_lobby(&self, lobby_id: &str) -> Option<LobbyParticipant> {
        let quiz_id = self.lobby_index.write().await.remove(lobby_id)?;

        let removed = match self.lobbies.read().await.get(&quiz_id) {
            Some(arena) => arena.write().await.remove(lobby_id),
            None => None,
        }?;

        tracing::info!("{} left lobby of quiz {}", removed.display_name, quiz_id);
        // participantLeft is matched by the removed client's own cached lobby
        // id; participantRemoved updates every other roster view.
        self.topics
            .publish(
                &quiz_id,
                ServerMessage::ParticipantLeft {
                    lobby_id: lobby_id.to_string(),
                },
            )
            .await;
        self.topics
            .publish(
                &quiz_id,
                ServerMessage::ParticipantRemoved {
                    lobby_id: lobby_id.to_string(),
                },
            )
            .await;
        self.broadcast_lobby_update(&quiz_id).await;

        Some(removed)
    }

    /// Delete all participants for a quiz. Used when starting or resetting.
    pub async fn clear_lobby(&self, quiz_id: &str) {
        let cleared: Vec<LobbyParticipant> = match self.lobbies.read().await.get(quiz_id) {
            Some(arena) => {
                let mut lobby = arena.write().await;
                std::mem::take(&mut lobby.participants)
            }
            None => Vec::new(),
        };

        if !cleared.is_empty() {
            let mut index = self.lobby_index.write().await;
            for p in &cleared {
                index.remove(&p.id);
            }
            tracing::info!("Cleared {} participants from quiz {}", cleared.len(), quiz_id);
            self.broadcast_lobby_update(quiz_id).await;
        }
    }

    async fn broadcast_lobby_update(&self, quiz_id: &str) {
        let participants = self.lobby_participants(quiz_id).await;
        self.topics
            .publish(
                quiz_id,
                ServerMessage::LobbyUpdate {
                    quiz_id: quiz_id.to_string(),
                    participants,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NewQuiz;

    async fn seed_quiz(state: &AppState) -> Quiz {
        state
            .create_quiz(
                NewQuiz {
                    title: "Trivia Night".to_string(),
                    organizer_id: "org".to_string(),
                    config: QuizConfig::default(),
                    is_active: true,
                    starts_at: None,
                    expires_at: None,
                },
                vec![],
            )
            .await
    }

    #[tokio::test]
    async fn joins_are_listed_in_join_order_and_trigger_waiting() {
        let state = AppState::new();
        let quiz = seed_quiz(&state).await;

        for name in ["Alice", "Bob", "Carol"] {
            state.join_lobby(name, &quiz.code).await.unwrap();
        }

        let roster = state.lobby_participants(&quiz.id).await;
        assert_eq!(roster.len(), 3);
        let names: Vec<_> = roster.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
        assert_eq!(
            state.quiz_status(&quiz.id).await.unwrap(),
            QuizStatus::Waiting
        );
    }

    #[tokio::test]
    async fn duplicate_display_names_are_allowed() {
        let state = AppState::new();
        let quiz = seed_quiz(&state).await;

        let a = state.join_lobby("Alex", &quiz.code).await.unwrap();
        let b = state.join_lobby("Alex", &quiz.code).await.unwrap();
        assert_ne!(a.lobby_id, b.lobby_id);
        assert_eq!(state.lobby_participants(&quiz.id).await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let state = AppState::new();
        let err = state.join_lobby("Alice", "ZZZZZZ").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let state = AppState::new();
        let quiz = seed_quiz(&state).await;
        let join = state.join_lobby("Alice", &quiz.code).await.unwrap();

        assert!(state.leave_lobby(&join.lobby_id).await.is_some());
        // Second removal (double-click/retry) is a silent no-op.
        assert!(state.leave_lobby(&join.lobby_id).await.is_none());
        assert!(state.lobby_participants(&quiz.id).await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_joins_all_land() {
        let state = AppState::new();
        let quiz = seed_quiz(&state).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            let code = quiz.code.clone();
            handles.push(tokio::spawn(async move {
                state.join_lobby(&format!("p{}", i), &code).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(state.lobby_participants(&quiz.id).await.len(), 16);
        // Status settled on WAITING, not flapping back to DRAFT.
        assert_eq!(
            state.quiz_status(&quiz.id).await.unwrap(),
            QuizStatus::Waiting
        );
    }

    #[tokio::test]
    async fn join_publishes_participant_joined_and_roster() {
        let state = AppState::new();
        let quiz = seed_quiz(&state).await;
        let mut rx = state.topics.subscribe(&quiz.id).await;

        state.join_lobby("Alice", &quiz.code).await.unwrap();

        // WAITING transition, then the join event, then the roster.
        assert!(matches!(
            rx.recv().await,
            Ok(ServerMessage::QuizStatusChange { .. })
        ));
        match rx.recv().await {
            Ok(ServerMessage::ParticipantJoined { participant }) => {
                assert_eq!(participant.display_name, "Alice");
            }
            other => panic!("expected participantJoined, got {:?}", other),
        }
        assert!(matches!(rx.recv().await, Ok(ServerMessage::LobbyUpdate { .. })));
    }
}
