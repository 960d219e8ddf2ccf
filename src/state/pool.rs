//! Question pool selection.
//!
//! Pure transformation from a quiz's full active question bank to the view
//! one taker sees: tag filter, optional shuffle, optional truncation to the
//! configured pool size, optional per-question option reordering. Invoked
//! once per session creation (registered) or per take-quiz fetch (guest), so
//! the result is snapshotted, never re-evaluated for a live session.

use crate::types::{Question, QuestionKind, QuizConfig};
use rand::Rng;

/// Produce the ordered question set a specific taker will see.
pub fn select_pool<R: Rng + ?Sized>(
    questions: &[Question],
    config: &QuizConfig,
    rng: &mut R,
) -> Vec<Question> {
    let mut selected: Vec<Question> = if config.question_pool_tags.is_empty() {
        questions.to_vec()
    } else {
        questions
            .iter()
            .filter(|q| q.tags.iter().any(|t| config.question_pool_tags.contains(t)))
            .cloned()
            .collect()
    };

    if config.shuffle_questions {
        fisher_yates(&mut selected, rng);
    }

    // Truncating after the shuffle makes the cut a random sample when
    // shuffling is on, and a plain prefix otherwise.
    if let Some(size) = config.question_pool_size {
        if size < selected.len() {
            selected.truncate(size);
        }
    }

    if config.randomize_options {
        for question in &mut selected {
            if question.kind == QuestionKind::MultipleChoice {
                // The correct answer is a value, not a position index, so
                // reordering options never invalidates correctness checking.
                fisher_yates(&mut question.options, rng);
            }
        }
    }

    selected
}

/// Uniform in-place permutation: swap each element from the back with a
/// uniformly chosen element at or before it.
fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn question(id: &str, tags: &[&str], points: u32) -> Question {
        Question {
            id: id.to_string(),
            quiz_id: "quiz".to_string(),
            kind: QuestionKind::MultipleChoice,
            text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: "B".to_string(),
            explanation: None,
            points,
            time_limit_seconds: None,
            order_index: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_active: true,
        }
    }

    fn bank(n: usize) -> Vec<Question> {
        (0..n).map(|i| question(&format!("q{}", i), &[], 1)).collect()
    }

    #[test]
    fn no_config_keeps_everything_in_order() {
        let questions = bank(5);
        let config = QuizConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let pool = select_pool(&questions, &config, &mut rng);
        let ids: Vec<_> = pool.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q0", "q1", "q2", "q3", "q4"]);
    }

    #[test]
    fn tag_filter_keeps_intersecting_questions_only() {
        let questions = vec![
            question("q0", &["history"], 1),
            question("q1", &["math"], 1),
            question("q2", &["math", "history"], 1),
            question("q3", &[], 1),
        ];
        let config = QuizConfig {
            question_pool_tags: vec!["math".to_string()],
            ..QuizConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let pool = select_pool(&questions, &config, &mut rng);
        let ids: Vec<_> = pool.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2"]);
    }

    #[test]
    fn shuffle_preserves_the_set_but_not_the_order() {
        let questions = bank(10);
        let config = QuizConfig {
            shuffle_questions: true,
            ..QuizConfig::default()
        };

        let original: Vec<_> = questions.iter().map(|q| q.id.clone()).collect();
        let mut saw_different_order = false;
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pool = select_pool(&questions, &config, &mut rng);
            let ids: Vec<_> = pool.iter().map(|q| q.id.clone()).collect();
            assert_eq!(
                ids.iter().collect::<HashSet<_>>(),
                original.iter().collect::<HashSet<_>>()
            );
            if ids != original {
                saw_different_order = true;
            }
        }
        assert!(saw_different_order);
    }

    #[test]
    fn pool_size_truncates_to_a_prefix_without_shuffle() {
        let questions = bank(6);
        let config = QuizConfig {
            question_pool_size: Some(3),
            ..QuizConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let pool = select_pool(&questions, &config, &mut rng);
        let ids: Vec<_> = pool.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q0", "q1", "q2"]);
    }

    #[test]
    fn pool_size_larger_than_bank_is_a_noop() {
        let questions = bank(3);
        let config = QuizConfig {
            question_pool_size: Some(10),
            ..QuizConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(select_pool(&questions, &config, &mut rng).len(), 3);
    }

    #[test]
    fn randomize_options_keeps_the_correct_value_present() {
        let questions = vec![question("q0", &[], 1)];
        let config = QuizConfig {
            randomize_options: true,
            ..QuizConfig::default()
        };

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pool = select_pool(&questions, &config, &mut rng);
            let q = &pool[0];
            assert_eq!(q.options.len(), 4);
            assert!(q.options.iter().any(|o| o == &q.correct_answer));
            assert_eq!(q.correct_answer, "B");
        }
    }

    #[test]
    fn short_answer_options_are_left_alone() {
        let mut q = question("q0", &[], 1);
        q.kind = QuestionKind::ShortAnswer;
        q.options.clear();
        let config = QuizConfig {
            randomize_options: true,
            ..QuizConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let pool = select_pool(&[q], &config, &mut rng);
        assert!(pool[0].options.is_empty());
    }
}
