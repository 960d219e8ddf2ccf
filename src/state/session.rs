//! Per-taker quiz sessions.
//!
//! A session is one taker's attempt: IN_PROGRESS -> COMPLETED or TIMED_OUT,
//! terminal states immutable. Registered takers get server-tracked sessions
//! with per-question submission; anonymous guests submit one completed
//! attempt in bulk, and the server recomputes correctness from the stored
//! answer values rather than trusting the client-reported score.

use super::pool::select_pool;
use super::AppState;
use crate::error::QuizError;
use crate::protocol::{
    GuestAnswerSubmission, GuestAttemptResult, LeaderboardEntry, PublicQuestion, ServerMessage,
    TakeQuizView,
};
use crate::types::*;
use std::collections::HashMap;

/// Normalize answer values for comparison (trim whitespace, case-fold).
/// The rule is uniform across question types, short-answer included.
fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Result of one accepted answer submission.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub points_earned: u32,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

impl AppState {
    /// Begin (or resume) a registered taker's attempt.
    ///
    /// If the taker already has an IN_PROGRESS session for this quiz, that
    /// session is returned instead of a duplicate. Otherwise the attempt cap
    /// is enforced, a question pool is selected, and `total_points` is fixed
    /// from the delivered set so later question-bank edits never change an
    /// in-flight session's total.
    pub async fn start_session(
        &self,
        quiz_id: &str,
        participant_id: &str,
    ) -> Result<(Session, Vec<Question>), QuizError> {
        let quiz = self.get_quiz(quiz_id).await?;
        Self::ensure_takeable(&quiz)?;

        let questions = self.questions_for_quiz(quiz_id).await;
        if questions.is_empty() {
            return Err(QuizError::InvalidState(format!(
                "Quiz {} has no questions",
                quiz_id
            )));
        }
        let by_id: HashMap<&str, &Question> =
            questions.iter().map(|q| (q.id.as_str(), q)).collect();

        let taker = Taker::Registered {
            participant_id: participant_id.to_string(),
        };

        let pool = select_pool(&questions, &quiz.config, &mut rand::rng());

        let mut sessions = self.sessions.write().await;

        // Idempotent resume: an open attempt is returned, never duplicated.
        if let Some(existing) = sessions
            .values()
            .find(|s| {
                s.quiz_id == quiz_id
                    && s.taker == taker
                    && s.status == SessionStatus::InProgress
            })
            .cloned()
        {
            let delivered = existing
                .question_ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|q| (*q).clone()))
                .collect();
            return Ok((existing, delivered));
        }

        if quiz.config.max_attempts > 0 {
            let completed = sessions
                .values()
                .filter(|s| {
                    s.quiz_id == quiz_id
                        && s.taker == taker
                        && s.status == SessionStatus::Completed
                })
                .count() as u32;
            if completed >= quiz.config.max_attempts {
                return Err(QuizError::InvalidState(format!(
                    "Attempt limit of {} reached for this quiz",
                    quiz.config.max_attempts
                )));
            }
        }

        let session = Session {
            id: ulid::Ulid::new().to_string(),
            quiz_id: quiz_id.to_string(),
            taker,
            score: 0,
            total_points: pool.iter().map(|q| q.points).sum(),
            status: SessionStatus::InProgress,
            question_ids: pool.iter().map(|q| q.id.clone()).collect(),
            started_at: chrono::Utc::now(),
            completed_at: None,
            time_spent_seconds: None,
            percentage: None,
            passed: None,
        };
        sessions.insert(session.id.clone(), session.clone());
        drop(sessions);

        tracing::info!(
            "Session {} started for {} on quiz {}",
            session.id,
            participant_id,
            quiz_id
        );
        Ok((session, pool))
    }

    /// Submit one answer for a registered session.
    ///
    /// Rejects terminal sessions, questions outside the session's quiz, and
    /// duplicate submissions for the same question. The duplicate check, the
    /// answer insert, and the score increment happen under one critical
    /// section, so concurrent submissions for different questions never lose
    /// an increment.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        participant_id: &str,
        question_id: &str,
        value: &str,
        time_spent_seconds: Option<u32>,
    ) -> Result<AnswerOutcome, QuizError> {
        let (quiz_id, delivered) = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| QuizError::NotFound(format!("Session {} not found", session_id)))?;
            Self::ensure_session_owner(session, participant_id)?;
            (session.quiz_id.clone(), session.question_ids.clone())
        };

        let quiz = self.get_quiz(&quiz_id).await?;
        let question = self
            .get_question(&quiz_id, question_id)
            .await
            .ok_or_else(|| {
                QuizError::NotFound(format!(
                    "Question {} does not belong to quiz {}",
                    question_id, quiz_id
                ))
            })?;
        if !delivered.iter().any(|id| id == question_id) {
            return Err(QuizError::Validation(format!(
                "Question {} is not part of this session's question set",
                question_id
            )));
        }

        let is_correct = normalize(value) == normalize(&question.correct_answer);
        let points_earned = if is_correct { question.points } else { 0 };

        {
            let mut sessions = self.sessions.write().await;
            let mut answers = self.answers.write().await;

            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| QuizError::NotFound(format!("Session {} not found", session_id)))?;
            if session.status != SessionStatus::InProgress {
                return Err(QuizError::InvalidState(
                    "Session is no longer in progress".to_string(),
                ));
            }

            let session_answers = answers.entry(session_id.to_string()).or_default();
            if session_answers.iter().any(|a| a.question_id == question_id) {
                return Err(QuizError::InvalidState(format!(
                    "Question {} was already answered in this session",
                    question_id
                )));
            }

            session_answers.push(Answer {
                session_id: session_id.to_string(),
                question_id: question_id.to_string(),
                value: value.to_string(),
                is_correct,
                points_earned,
                time_spent_seconds,
            });
            session.score += points_earned;
        }

        Ok(AnswerOutcome {
            is_correct,
            points_earned,
            correct_answer: quiz
                .config
                .show_answers
                .then(|| question.correct_answer.clone()),
            explanation: quiz
                .config
                .show_answers
                .then(|| question.explanation.clone())
                .flatten(),
        })
    }

    /// Finish a registered session.
    ///
    /// Timeout is detected lazily here: if the quiz caps duration and the
    /// elapsed wall-clock time exceeds it, the final status is TIMED_OUT.
    /// Calling complete on an already-terminal session is rejected, and the
    /// first call's results are never mutated.
    pub async fn complete_session(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Session, QuizError> {
        let quiz_id = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| QuizError::NotFound(format!("Session {} not found", session_id)))?;
            Self::ensure_session_owner(session, participant_id)?;
            session.quiz_id.clone()
        };
        let quiz = self.get_quiz(&quiz_id).await?;

        let completed = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| QuizError::NotFound(format!("Session {} not found", session_id)))?;
            if session.status != SessionStatus::InProgress {
                return Err(QuizError::InvalidState(
                    "Session is already completed".to_string(),
                ));
            }

            let now = chrono::Utc::now();
            let elapsed = (now - session.started_at).num_seconds().max(0);
            let timed_out = quiz
                .config
                .duration_minutes
                .is_some_and(|m| elapsed > i64::from(m) * 60);

            let percentage = if session.total_points == 0 {
                0.0
            } else {
                f64::from(session.score) / f64::from(session.total_points) * 100.0
            };

            session.status = if timed_out {
                SessionStatus::TimedOut
            } else {
                SessionStatus::Completed
            };
            session.completed_at = Some(now);
            session.time_spent_seconds = Some(elapsed);
            session.percentage = Some(percentage);
            session.passed = Some(percentage >= quiz.config.passing_score);
            session.clone()
        };

        tracing::info!(
            "Session {} finished as {:?} ({}/{})",
            session_id,
            completed.status,
            completed.score,
            completed.total_points
        );
        self.broadcast_leaderboard(&quiz_id).await;
        Ok(completed)
    }

    /// Fetch a session plus its recorded answers, for its own taker only.
    pub async fn get_session(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<(Session, Vec<Answer>), QuizError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| QuizError::NotFound(format!("Session {} not found", session_id)))?;
        Self::ensure_session_owner(session, participant_id)?;
        let answers = self
            .answers
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        Ok((session.clone(), answers))
    }

    fn ensure_session_owner(session: &Session, participant_id: &str) -> Result<(), QuizError> {
        match &session.taker {
            Taker::Registered { participant_id: owner } if owner == participant_id => Ok(()),
            _ => Err(QuizError::Forbidden(
                "Session belongs to a different taker".to_string(),
            )),
        }
    }

    /// Public "take quiz" view for anonymous takers: a fresh pool selection
    /// with correct answers and explanations stripped.
    pub async fn take_quiz_questions(&self, code: &str) -> Result<TakeQuizView, QuizError> {
        let quiz = self.get_quiz_by_code(code).await?;
        Self::ensure_takeable(&quiz)?;

        let questions = self.questions_for_quiz(&quiz.id).await;
        if questions.is_empty() {
            return Err(QuizError::InvalidState(format!(
                "Quiz {} has no questions",
                quiz.id
            )));
        }

        let pool = select_pool(&questions, &quiz.config, &mut rand::rng());
        Ok(TakeQuizView {
            quiz_id: quiz.id,
            title: quiz.title,
            duration_minutes: quiz.config.duration_minutes,
            question_count: pool.len(),
            questions: pool.iter().map(PublicQuestion::from).collect(),
        })
    }

    /// Accept an anonymous taker's completed attempt in one call.
    ///
    /// Correctness and score are recomputed server-side from the stored
    /// correct-answer values; the client's own tally is ignored. Resubmission
    /// with the same client token replaces the prior guest session rather
    /// than creating a duplicate, so a retry after a timeout cannot double
    /// count in leaderboards.
    pub async fn submit_guest_attempt(
        &self,
        code: &str,
        guest_name: &str,
        client_token: &str,
        submitted: &[GuestAnswerSubmission],
    ) -> Result<GuestAttemptResult, QuizError> {
        let guest_name = guest_name.trim();
        if guest_name.is_empty() {
            return Err(QuizError::Validation(
                "Guest name must not be empty".to_string(),
            ));
        }
        if client_token.trim().is_empty() {
            return Err(QuizError::Validation(
                "Client token must not be empty".to_string(),
            ));
        }

        let quiz = self.get_quiz_by_code(code).await?;
        Self::ensure_takeable(&quiz)?;

        let mut score = 0u32;
        let mut total_points = 0u32;
        let mut answers = Vec::with_capacity(submitted.len());
        let mut seen = std::collections::HashSet::new();
        for sub in submitted {
            if !seen.insert(sub.question_id.as_str()) {
                return Err(QuizError::Validation(format!(
                    "Duplicate answer for question {}",
                    sub.question_id
                )));
            }
            let question = self
                .get_question(&quiz.id, &sub.question_id)
                .await
                .ok_or_else(|| {
                    QuizError::Validation(format!(
                        "Question {} does not belong to quiz {}",
                        sub.question_id, quiz.id
                    ))
                })?;
            let is_correct = normalize(&sub.value) == normalize(&question.correct_answer);
            let points_earned = if is_correct { question.points } else { 0 };
            score += points_earned;
            total_points += question.points;
            answers.push(Answer {
                session_id: String::new(),
                question_id: sub.question_id.clone(),
                value: sub.value.clone(),
                is_correct,
                points_earned,
                time_spent_seconds: sub.time_spent_seconds,
            });
        }

        let percentage = if total_points == 0 {
            0.0
        } else {
            f64::from(score) / f64::from(total_points) * 100.0
        };
        let passed = percentage >= quiz.config.passing_score;
        let now = chrono::Utc::now();
        let time_spent: i64 = submitted
            .iter()
            .filter_map(|a| a.time_spent_seconds)
            .map(i64::from)
            .sum();

        let token_key = (quiz.id.clone(), client_token.to_string());
        let session_id = {
            let mut tokens = self.guest_tokens.write().await;
            let mut sessions = self.sessions.write().await;

            // Retry with the same token replaces the prior attempt.
            let session_id = match tokens.get(&token_key).cloned() {
                Some(existing) => existing,
                None => {
                    let id = ulid::Ulid::new().to_string();
                    tokens.insert(token_key.clone(), id.clone());
                    id
                }
            };

            let session = Session {
                id: session_id.clone(),
                quiz_id: quiz.id.clone(),
                taker: Taker::Guest {
                    name: guest_name.to_string(),
                    token: client_token.to_string(),
                },
                score,
                total_points,
                status: SessionStatus::Completed,
                question_ids: submitted.iter().map(|a| a.question_id.clone()).collect(),
                started_at: now,
                completed_at: Some(now),
                time_spent_seconds: Some(time_spent),
                percentage: Some(percentage),
                passed: Some(passed),
            };
            sessions.insert(session_id.clone(), session);
            session_id
        };

        for answer in &mut answers {
            answer.session_id = session_id.clone();
        }
        self.answers
            .write()
            .await
            .insert(session_id.clone(), answers);

        tracing::info!(
            "Guest attempt by {} on quiz {}: {}/{}",
            guest_name,
            quiz.id,
            score,
            total_points
        );
        self.broadcast_leaderboard(&quiz.id).await;

        Ok(GuestAttemptResult {
            session_id,
            score,
            total_points,
            percentage,
            passed,
        })
    }

    /// Ranked view over all finished sessions of a quiz, registered and guest
    /// merged. Sorted by score descending; ties break on earliest completion
    /// time, then session id, so the ordering is deterministic.
    pub async fn leaderboard(&self, quiz_id: &str) -> Vec<LeaderboardEntry> {
        let sessions = self.sessions.read().await;
        let mut entries: Vec<LeaderboardEntry> = sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id && s.status.is_terminal())
            .map(|s| LeaderboardEntry {
                session_id: s.id.clone(),
                display_name: s.taker.display_name().to_string(),
                is_guest: matches!(s.taker, Taker::Guest { .. }),
                score: s.score,
                total_points: s.total_points,
                percentage: s.percentage.unwrap_or(0.0),
                completed_at: s.completed_at,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| match (a.completed_at, b.completed_at) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        entries
    }

    async fn broadcast_leaderboard(&self, quiz_id: &str) {
        let entries = self.leaderboard(quiz_id).await;
        self.topics
            .publish(
                quiz_id,
                ServerMessage::LeaderboardUpdate {
                    quiz_id: quiz_id.to_string(),
                    entries,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NewQuiz;

    fn question(id: &str, points: u32, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            quiz_id: String::new(),
            kind: QuestionKind::ShortAnswer,
            text: format!("Question {}", id),
            options: Vec::new(),
            correct_answer: correct.to_string(),
            explanation: Some(format!("Because {}", correct)),
            points,
            time_limit_seconds: None,
            order_index: 0,
            tags: Vec::new(),
            is_active: true,
        }
    }

    /// Three questions worth 1/2/3 points, total 6.
    async fn seed_quiz(state: &AppState, config: QuizConfig) -> Quiz {
        state
            .create_quiz(
                NewQuiz {
                    title: "Weighted".to_string(),
                    organizer_id: "org".to_string(),
                    config,
                    is_active: true,
                    starts_at: None,
                    expires_at: None,
                },
                vec![
                    question("q1", 1, "alpha"),
                    question("q2", 2, "beta"),
                    question("q3", 3, "gamma"),
                ],
            )
            .await
    }

    #[tokio::test]
    async fn start_snapshots_total_points() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;

        let (session, delivered) = state.start_session(&quiz.id, "alice").await.unwrap();
        assert_eq!(session.total_points, 6);
        assert_eq!(delivered.len(), 3);
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn start_is_an_idempotent_resume() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;

        let (first, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        let (second, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn start_rejects_empty_quiz() {
        let state = AppState::new();
        let quiz = state
            .create_quiz(
                NewQuiz {
                    title: "Empty".to_string(),
                    organizer_id: "org".to_string(),
                    config: QuizConfig::default(),
                    is_active: true,
                    starts_at: None,
                    expires_at: None,
                },
                vec![],
            )
            .await;

        let err = state.start_session(&quiz.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[tokio::test]
    async fn max_attempts_caps_completed_sessions() {
        let state = AppState::new();
        let quiz = seed_quiz(
            &state,
            QuizConfig {
                max_attempts: 1,
                ..QuizConfig::default()
            },
        )
        .await;

        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        state.complete_session(&session.id, "alice").await.unwrap();

        let err = state.start_session(&quiz.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(err.to_string().contains("Attempt limit of 1"));

        // A different participant is unaffected.
        assert!(state.start_session(&quiz.id, "bob").await.is_ok());
    }

    #[tokio::test]
    async fn answers_are_normalized_and_scored() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        let outcome = state
            .submit_answer(&session.id, "alice", "q1", "  ALPHA ", None)
            .await
            .unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.points_earned, 1);
        // show_answers is off: no leak of the stored value.
        assert!(outcome.correct_answer.is_none());
        assert!(outcome.explanation.is_none());

        let wrong = state
            .submit_answer(&session.id, "alice", "q2", "delta", None)
            .await
            .unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.points_earned, 0);

        let (session, answers) = state.get_session(&session.id, "alice").await.unwrap();
        assert_eq!(session.score, 1);
        assert_eq!(answers.len(), 2);
    }

    #[tokio::test]
    async fn show_answers_reveals_correct_value() {
        let state = AppState::new();
        let quiz = seed_quiz(
            &state,
            QuizConfig {
                show_answers: true,
                ..QuizConfig::default()
            },
        )
        .await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        let outcome = state
            .submit_answer(&session.id, "alice", "q1", "nope", None)
            .await
            .unwrap();
        assert_eq!(outcome.correct_answer.as_deref(), Some("alpha"));
        assert_eq!(outcome.explanation.as_deref(), Some("Because alpha"));
    }

    #[tokio::test]
    async fn duplicate_answer_is_rejected_and_not_rescored() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        state
            .submit_answer(&session.id, "alice", "q1", "alpha", None)
            .await
            .unwrap();
        let err = state
            .submit_answer(&session.id, "alice", "q1", "alpha", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");

        let (session, _) = state.get_session(&session.id, "alice").await.unwrap();
        assert_eq!(session.score, 1);
    }

    #[tokio::test]
    async fn foreign_question_is_rejected() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        let err = state
            .submit_answer(&session.id, "alice", "not-a-question", "x", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_taker() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        let err = state
            .submit_answer(&session.id, "mallory", "q1", "alpha", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        let err = state.get_session(&session.id, "mallory").await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn concurrent_answers_never_lose_an_increment() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        let answers = [("q1", "alpha"), ("q2", "beta"), ("q3", "gamma")];
        let mut handles = Vec::new();
        for (qid, value) in answers {
            let state = state.clone();
            let sid = session.id.clone();
            handles.push(tokio::spawn(async move {
                state.submit_answer(&sid, "alice", qid, value, None).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let (session, _) = state.get_session(&session.id, "alice").await.unwrap();
        assert_eq!(session.score, 6);
    }

    #[tokio::test]
    async fn percentage_and_pass_fail_boundaries() {
        let state = AppState::new();

        // passing_score 50: 1+2+0 of 6 = 50% passes.
        let quiz = seed_quiz(
            &state,
            QuizConfig {
                passing_score: 50.0,
                ..QuizConfig::default()
            },
        )
        .await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        state
            .submit_answer(&session.id, "alice", "q1", "alpha", None)
            .await
            .unwrap();
        state
            .submit_answer(&session.id, "alice", "q2", "beta", None)
            .await
            .unwrap();
        state
            .submit_answer(&session.id, "alice", "q3", "wrong", None)
            .await
            .unwrap();
        let done = state.complete_session(&session.id, "alice").await.unwrap();
        assert_eq!(done.score, 3);
        assert_eq!(done.percentage, Some(50.0));
        assert_eq!(done.passed, Some(true));

        // passing_score 60: the same 50% fails.
        let quiz = seed_quiz(
            &state,
            QuizConfig {
                passing_score: 60.0,
                ..QuizConfig::default()
            },
        )
        .await;
        let (session, _) = state.start_session(&quiz.id, "bob").await.unwrap();
        state
            .submit_answer(&session.id, "bob", "q1", "alpha", None)
            .await
            .unwrap();
        state
            .submit_answer(&session.id, "bob", "q2", "beta", None)
            .await
            .unwrap();
        let done = state.complete_session(&session.id, "bob").await.unwrap();
        assert_eq!(done.percentage, Some(50.0));
        assert_eq!(done.passed, Some(false));
    }

    #[tokio::test]
    async fn zero_total_points_yields_zero_percentage() {
        let state = AppState::new();
        let quiz = state
            .create_quiz(
                NewQuiz {
                    title: "Degenerate".to_string(),
                    organizer_id: "org".to_string(),
                    config: QuizConfig::default(),
                    is_active: true,
                    starts_at: None,
                    expires_at: None,
                },
                vec![question("q1", 0, "alpha")],
            )
            .await;

        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        let done = state.complete_session(&session.id, "alice").await.unwrap();
        assert_eq!(done.percentage, Some(0.0));
        assert!(done.percentage.unwrap().is_finite());
    }

    #[tokio::test]
    async fn double_complete_is_rejected_and_first_result_stands() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        state
            .submit_answer(&session.id, "alice", "q1", "alpha", None)
            .await
            .unwrap();

        let first = state.complete_session(&session.id, "alice").await.unwrap();
        let err = state.complete_session(&session.id, "alice").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");

        let (after, _) = state.get_session(&session.id, "alice").await.unwrap();
        assert_eq!(after.score, first.score);
        assert_eq!(after.completed_at, first.completed_at);
        assert_eq!(after.percentage, first.percentage);
    }

    #[tokio::test]
    async fn answers_after_completion_are_rejected() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();
        state.complete_session(&session.id, "alice").await.unwrap();

        let err = state
            .submit_answer(&session.id, "alice", "q1", "alpha", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[tokio::test]
    async fn expired_duration_times_the_session_out() {
        let state = AppState::new();
        let quiz = seed_quiz(
            &state,
            QuizConfig {
                duration_minutes: Some(0),
                ..QuizConfig::default()
            },
        )
        .await;
        let (session, _) = state.start_session(&quiz.id, "alice").await.unwrap();

        // Backdate the start so elapsed exceeds the zero-minute cap.
        {
            let mut sessions = state.sessions.write().await;
            let s = sessions.get_mut(&session.id).unwrap();
            s.started_at = chrono::Utc::now() - chrono::Duration::seconds(90);
        }

        let done = state.complete_session(&session.id, "alice").await.unwrap();
        assert_eq!(done.status, SessionStatus::TimedOut);
    }

    #[tokio::test]
    async fn guest_attempt_is_recomputed_server_side() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;

        let answers = vec![
            GuestAnswerSubmission {
                question_id: "q1".to_string(),
                value: "Alpha".to_string(),
                time_spent_seconds: Some(5),
            },
            GuestAnswerSubmission {
                question_id: "q2".to_string(),
                value: "beta".to_string(),
                time_spent_seconds: Some(9),
            },
            GuestAnswerSubmission {
                question_id: "q3".to_string(),
                value: "wrong".to_string(),
                time_spent_seconds: Some(2),
            },
        ];
        let result = state
            .submit_guest_attempt(&quiz.code, "Alice", "tok-1", &answers)
            .await
            .unwrap();

        assert_eq!(result.score, 3);
        assert_eq!(result.total_points, 6);
        assert_eq!(result.percentage, 50.0);
        assert!(result.passed);
    }

    #[tokio::test]
    async fn guest_resubmission_replaces_instead_of_duplicating() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;

        let first = vec![GuestAnswerSubmission {
            question_id: "q1".to_string(),
            value: "wrong".to_string(),
            time_spent_seconds: None,
        }];
        let a = state
            .submit_guest_attempt(&quiz.code, "Alice", "tok-1", &first)
            .await
            .unwrap();
        assert_eq!(a.score, 0);

        let second = vec![GuestAnswerSubmission {
            question_id: "q1".to_string(),
            value: "alpha".to_string(),
            time_spent_seconds: None,
        }];
        let b = state
            .submit_guest_attempt(&quiz.code, "Alice", "tok-1", &second)
            .await
            .unwrap();
        assert_eq!(b.session_id, a.session_id);
        assert_eq!(b.score, 1);

        let board = state.leaderboard(&quiz.id).await;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 1);
    }

    #[tokio::test]
    async fn leaderboard_merges_and_breaks_ties_by_completion_time() {
        let state = AppState::new();
        let quiz = seed_quiz(&state, QuizConfig::default()).await;

        let (session, _) = state.start_session(&quiz.id, "late-riser").await.unwrap();
        state
            .submit_answer(&session.id, "late-riser", "q3", "gamma", None)
            .await
            .unwrap();
        state
            .complete_session(&session.id, "late-riser")
            .await
            .unwrap();

        state
            .submit_guest_attempt(
                &quiz.code,
                "Guest High",
                "tok-h",
                &[
                    GuestAnswerSubmission {
                        question_id: "q2".to_string(),
                        value: "beta".to_string(),
                        time_spent_seconds: None,
                    },
                    GuestAnswerSubmission {
                        question_id: "q3".to_string(),
                        value: "gamma".to_string(),
                        time_spent_seconds: None,
                    },
                ],
            )
            .await
            .unwrap();

        // Same score as the registered session, but completed later.
        state
            .submit_guest_attempt(
                &quiz.code,
                "Guest Tie",
                "tok-t",
                &[GuestAnswerSubmission {
                    question_id: "q3".to_string(),
                    value: "gamma".to_string(),
                    time_spent_seconds: None,
                }],
            )
            .await
            .unwrap();

        let board = state.leaderboard(&quiz.id).await;
        let names: Vec<_> = board.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, ["Guest High", "late-riser", "Guest Tie"]);
        assert!(board[0].is_guest);
        assert!(!board[1].is_guest);
    }
}
