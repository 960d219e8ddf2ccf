//! Quiz lifecycle state machine.
//!
//! DRAFT -> WAITING (first lobby join) -> IN_PROGRESS (organizer start) ->
//! COMPLETED (organizer end). A COMPLETED quiz may be restarted without
//! re-authoring, and drops back to WAITING when a new participant joins.

use super::AppState;
use crate::error::QuizError;
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    /// Side-effect-free status query. Records predate the status field are DRAFT.
    pub async fn quiz_status(&self, quiz_id: &str) -> Result<QuizStatus, QuizError> {
        Ok(self.get_quiz(quiz_id).await?.status)
    }

    /// Flip a DRAFT or COMPLETED quiz to WAITING when its first participant
    /// joins. Idempotent: later joiners observe WAITING and do nothing, and a
    /// quiz that is already live is left alone. Returns whether a transition
    /// actually happened.
    pub(super) async fn mark_waiting_on_join(&self, quiz_id: &str) -> bool {
        let transitioned = {
            let mut quizzes = self.quizzes.write().await;
            match quizzes.get_mut(quiz_id) {
                Some(quiz)
                    if quiz.status == QuizStatus::Draft
                        || quiz.status == QuizStatus::Completed =>
                {
                    quiz.status = QuizStatus::Waiting;
                    true
                }
                _ => false,
            }
        };

        if transitioned {
            tracing::info!("Quiz {} entered WAITING", quiz_id);
            self.topics
                .publish(
                    quiz_id,
                    ServerMessage::QuizStatusChange {
                        quiz_id: quiz_id.to_string(),
                        status: QuizStatus::Waiting,
                    },
                )
                .await;
        }
        transitioned
    }

    /// Organizer-only: move a quiz to IN_PROGRESS and clear its lobby.
    ///
    /// An organizer may run only one live quiz at a time; any other quiz they
    /// own that is currently IN_PROGRESS is force-completed first. Starting a
    /// quiz that is already live is an explicit rejection, not a no-op.
    pub async fn start_quiz(
        &self,
        quiz_id: &str,
        organizer_id: &str,
    ) -> Result<Quiz, QuizError> {
        let other_live: Vec<QuizId> = {
            let mut quizzes = self.quizzes.write().await;
            let quiz = quizzes
                .get(quiz_id)
                .ok_or_else(|| QuizError::NotFound(format!("Quiz {} not found", quiz_id)))?;
            if quiz.organizer_id != organizer_id {
                return Err(QuizError::Forbidden(
                    "Only the quiz organizer can start it".to_string(),
                ));
            }
            if quiz.status == QuizStatus::InProgress {
                return Err(QuizError::InvalidState(format!(
                    "Quiz {} is already in progress",
                    quiz_id
                )));
            }

            let other_live: Vec<QuizId> = quizzes
                .values()
                .filter(|q| {
                    q.id != quiz_id
                        && q.organizer_id == organizer_id
                        && q.status == QuizStatus::InProgress
                })
                .map(|q| q.id.clone())
                .collect();
            for id in &other_live {
                if let Some(q) = quizzes.get_mut(id) {
                    q.status = QuizStatus::Completed;
                }
            }

            if let Some(quiz) = quizzes.get_mut(quiz_id) {
                quiz.status = QuizStatus::InProgress;
            }
            other_live
        };

        for id in &other_live {
            tracing::info!("Force-completing quiz {} (organizer started another)", id);
            self.clear_lobby(id).await;
            self.topics
                .publish(id, ServerMessage::QuizEnded { quiz_id: id.clone() })
                .await;
            self.topics
                .publish(
                    id,
                    ServerMessage::QuizStatusChange {
                        quiz_id: id.clone(),
                        status: QuizStatus::Completed,
                    },
                )
                .await;
        }

        // The lobby is scoped to the pre-start phase only.
        self.clear_lobby(quiz_id).await;

        let quiz = self.get_quiz(quiz_id).await?;
        tracing::info!("Quiz {} started by {}", quiz_id, organizer_id);
        self.topics
            .publish(
                quiz_id,
                ServerMessage::QuizStarted {
                    quiz_id: quiz_id.to_string(),
                    started_at: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await;
        self.topics
            .publish(
                quiz_id,
                ServerMessage::QuizStatusChange {
                    quiz_id: quiz_id.to_string(),
                    status: QuizStatus::InProgress,
                },
            )
            .await;

        Ok(quiz)
    }

    /// Organizer-only: end/reset a quiz from any state to COMPLETED and clear
    /// its lobby.
    pub async fn end_quiz(&self, quiz_id: &str, organizer_id: &str) -> Result<Quiz, QuizError> {
        {
            let mut quizzes = self.quizzes.write().await;
            let quiz = quizzes
                .get_mut(quiz_id)
                .ok_or_else(|| QuizError::NotFound(format!("Quiz {} not found", quiz_id)))?;
            if quiz.organizer_id != organizer_id {
                return Err(QuizError::Forbidden(
                    "Only the quiz organizer can end it".to_string(),
                ));
            }
            quiz.status = QuizStatus::Completed;
        }

        self.clear_lobby(quiz_id).await;

        tracing::info!("Quiz {} ended by {}", quiz_id, organizer_id);
        self.topics
            .publish(quiz_id, ServerMessage::QuizEnded { quiz_id: quiz_id.to_string() })
            .await;
        self.topics
            .publish(
                quiz_id,
                ServerMessage::QuizStatusChange {
                    quiz_id: quiz_id.to_string(),
                    status: QuizStatus::Completed,
                },
            )
            .await;

        self.get_quiz(quiz_id).await
    }
}
