use crate::models::domain::{Answer, Question, QuestionType, Subject};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A subject with a fixed id, in academic year 1.
    pub fn subject(id: i64, name: &str, price: f64) -> Subject {
        Subject {
            id,
            ..Subject::new(name, 1, price)
        }
    }

    /// Four first-year subjects; ids 1, 2 and 4 form the discounted bundle.
    pub fn first_year_subjects() -> Vec<Subject> {
        vec![
            subject(1, "Anatomy", 100.0),
            subject(2, "Physiology", 100.0),
            subject(3, "Pharmacology", 150.0),
            subject(4, "Biochemistry", 80.0),
        ]
    }

    pub fn question(id: i64, exam_id: i64) -> Question {
        Question {
            id,
            ..Question::new(exam_id, "Which solution is isotonic?", QuestionType::MultipleChoice, id as i32)
        }
    }

    pub fn answer(id: i64, question_id: i64, is_correct: bool) -> Answer {
        Answer {
            id,
            ..Answer::new(question_id, "Normal saline", is_correct, 1)
        }
    }

    /// Three questions (ids 1..=3), each with a correct answer `10 * id` and a wrong one `10 * id + 1`.
    pub fn three_question_key(exam_id: i64) -> (Vec<Question>, Vec<Answer>) {
        let questions: Vec<Question> = (1..=3).map(|id| question(id, exam_id)).collect();
        let answers = questions
            .iter()
            .flat_map(|q| [answer(q.id * 10, q.id, true), answer(q.id * 10 + 1, q.id, false)])
            .collect();
        (questions, answers)
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_first_year_subjects_have_distinct_ids() {
        let subjects = first_year_subjects();
        let ids: Vec<i64> = subjects.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_answer_key_has_one_correct_answer_per_question() {
        let (questions, answers) = three_question_key(7);
        assert_eq!(questions.len(), 3);
        for question in &questions {
            let correct = answers
                .iter()
                .filter(|a| a.question_id == question.id && a.is_correct)
                .count();
            assert_eq!(correct, 1);
        }
    }
}
