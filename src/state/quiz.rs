use super::AppState;
use crate::error::QuizError;
use crate::types::*;
use rand::Rng;

/// Safe character set for join codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Fields accepted when seeding a quiz into the record store.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub organizer_id: OrganizerId,
    pub config: QuizConfig,
    pub is_active: bool,
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AppState {
    /// Store a new quiz record with a store-confirmed-unique join code.
    ///
    /// Collision handling is retry-until-unique under the write lock, so
    /// concurrent creators racing for the same random code cannot both win.
    pub async fn create_quiz(&self, new: NewQuiz, questions: Vec<Question>) -> Quiz {
        let mut quizzes = self.quizzes.write().await;

        let code = loop {
            let candidate = generate_join_code();
            if !quizzes.values().any(|q| q.code == candidate) {
                break candidate;
            }
            // Collision - try again (extremely rare with ~880M combinations)
        };

        let quiz = Quiz {
            id: ulid::Ulid::new().to_string(),
            code,
            title: new.title,
            organizer_id: new.organizer_id,
            status: QuizStatus::Draft,
            config: new.config,
            is_active: new.is_active,
            starts_at: new.starts_at,
            expires_at: new.expires_at,
            created_at: chrono::Utc::now(),
        };
        quizzes.insert(quiz.id.clone(), quiz.clone());
        drop(quizzes);

        let questions = questions
            .into_iter()
            .map(|mut q| {
                q.quiz_id = quiz.id.clone();
                if q.id.is_empty() {
                    q.id = ulid::Ulid::new().to_string();
                }
                q
            })
            .collect();
        self.questions.write().await.insert(quiz.id.clone(), questions);

        tracing::info!("Created quiz {} with code {}", quiz.id, quiz.code);
        quiz
    }

    pub async fn get_quiz(&self, quiz_id: &str) -> Result<Quiz, QuizError> {
        self.quizzes
            .read()
            .await
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    pub async fn get_quiz_by_code(&self, code: &str) -> Result<Quiz, QuizError> {
        self.quizzes
            .read()
            .await
            .values()
            .find(|q| q.code.eq_ignore_ascii_case(code))
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("No quiz with code {}", code)))
    }

    /// Active questions for a quiz, in authored order.
    pub async fn questions_for_quiz(&self, quiz_id: &str) -> Vec<Question> {
        let questions = self.questions.read().await;
        let mut list: Vec<Question> = questions
            .get(quiz_id)
            .map(|qs| qs.iter().filter(|q| q.is_active).cloned().collect())
            .unwrap_or_default();
        list.sort_by_key(|q| q.order_index);
        list
    }

    pub async fn get_question(&self, quiz_id: &str, question_id: &str) -> Option<Question> {
        self.questions
            .read()
            .await
            .get(quiz_id)
            .and_then(|qs| qs.iter().find(|q| q.id == question_id))
            .cloned()
    }

    /// Check that a quiz is currently takeable: active, within its scheduled
    /// window, and not expired. Expiry is a distinct error from NotFound so
    /// clients can tell a stale code from a wrong one.
    pub fn ensure_takeable(quiz: &Quiz) -> Result<(), QuizError> {
        if !quiz.is_active {
            return Err(QuizError::InvalidState(format!(
                "Quiz {} is not active",
                quiz.id
            )));
        }
        let now = chrono::Utc::now();
        if let Some(expires_at) = quiz.expires_at {
            if now > expires_at {
                return Err(QuizError::Expired(format!("Quiz {} has expired", quiz.id)));
            }
        }
        if let Some(starts_at) = quiz.starts_at {
            if now < starts_at {
                return Err(QuizError::Expired(format!(
                    "Quiz {} is not open yet",
                    quiz.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_quiz() -> (NewQuiz, Vec<Question>) {
        (
            NewQuiz {
                title: "Capitals".to_string(),
                organizer_id: "org-1".to_string(),
                config: QuizConfig::default(),
                is_active: true,
                starts_at: None,
                expires_at: None,
            },
            vec![],
        )
    }

    #[tokio::test]
    async fn join_codes_are_unique_and_well_formed() {
        let state = AppState::new();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let (new, questions) = draft_quiz();
            let quiz = state.create_quiz(new, questions).await;
            assert_eq!(quiz.code.len(), CODE_LENGTH);
            assert!(quiz.code.bytes().all(|b| CODE_CHARS.contains(&b)));
            assert!(codes.insert(quiz.code));
        }
    }

    #[tokio::test]
    async fn code_lookup_is_case_insensitive() {
        let state = AppState::new();
        let (new, questions) = draft_quiz();
        let quiz = state.create_quiz(new, questions).await;

        let found = state
            .get_quiz_by_code(&quiz.code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, quiz.id);
    }

    #[tokio::test]
    async fn expired_quiz_is_rejected_distinctly() {
        let state = AppState::new();
        let (mut new, questions) = draft_quiz();
        new.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        let quiz = state.create_quiz(new, questions).await;

        let err = AppState::ensure_takeable(&quiz).unwrap_err();
        assert_eq!(err.code(), "EXPIRED");
    }

    #[tokio::test]
    async fn scheduled_quiz_is_closed_before_its_window() {
        let state = AppState::new();
        let (mut new, questions) = draft_quiz();
        new.starts_at = Some(chrono::Utc::now() + chrono::Duration::hours(1));
        let quiz = state.create_quiz(new, questions).await;

        let err = AppState::ensure_takeable(&quiz).unwrap_err();
        assert_eq!(err.code(), "EXPIRED");
    }
}
