use crate::{Difficulty, Generator, Operator, Problem, QuizError};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of a resolved problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub operator: Operator,
    pub is_correct: bool,
    /// Always 1: a problem is never offered again once answered
    pub attempt_count: u32,
}

/// Result of checking the input typed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Not enough digits yet
    Pending,
    /// The answer was checked
    Resolved(AttemptOutcome),
}

/// Check accumulated input against a problem.
///
/// Empty input stays pending. Any non-digit rejects the input. Once the input
/// has as many digits as the correct result it is compared exactly once.
pub fn submit(problem: &Problem, raw_input: &str) -> Result<Submission, QuizError> {
    if !raw_input.chars().all(|c| c.is_ascii_digit()) {
        return Err(QuizError::InvalidInput(raw_input.to_string()));
    }
    if raw_input.len() < problem.answer_digits() {
        return Ok(Submission::Pending);
    }

    // Oversized input can overflow; that's simply a wrong answer
    let is_correct = raw_input.parse::<u32>().ok() == Some(problem.correct_result);
    Ok(Submission::Resolved(AttemptOutcome {
        operator: problem.operator,
        is_correct,
        attempt_count: 1,
    }))
}

/// Stream of problems for one difficulty with the player's typed answer
pub struct Quiz<R: Rng = rand::rngs::StdRng> {
    generator: Generator<R>,
    difficulty: Difficulty,
    problem: Problem,
    input: String,
    /// Outcome of the problem answered last (for feedback)
    last_outcome: Option<(Problem, AttemptOutcome)>,
}

impl Quiz {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_generator(difficulty, Generator::new())
    }
}

impl<R: Rng> Quiz<R> {
    pub fn with_generator(difficulty: Difficulty, mut generator: Generator<R>) -> Self {
        let problem = generator.generate(difficulty);
        Self {
            generator,
            difficulty,
            problem,
            input: String::new(),
            last_outcome: None,
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn last_outcome(&self) -> Option<&(Problem, AttemptOutcome)> {
        self.last_outcome.as_ref()
    }

    /// Switch difficulty and start over with a fresh problem
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.next_problem();
        self.last_outcome = None;
    }

    /// Type one character. Non-digits leave the input unchanged.
    ///
    /// On resolution a new problem for the same difficulty replaces the
    /// answered one.
    pub fn push_char(&mut self, c: char) -> Result<Submission, QuizError> {
        let mut candidate = self.input.clone();
        candidate.push(c);

        let submission = submit(&self.problem, &candidate)?;
        match submission {
            Submission::Pending => self.input = candidate,
            Submission::Resolved(outcome) => {
                self.last_outcome = Some((self.problem, outcome));
                self.next_problem();
            }
        }
        Ok(submission)
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    fn next_problem(&mut self) {
        self.problem = self.generator.generate(self.difficulty);
        self.input.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(a: u32, b: u32, op: Operator) -> Problem {
        Problem::new(a, b, op)
    }

    #[test]
    fn test_empty_input_never_resolves() {
        let p = problem(1, 1, Operator::Add);
        assert_eq!(submit(&p, "").unwrap(), Submission::Pending);
    }

    #[test]
    fn test_short_input_stays_pending() {
        let p = problem(47, 30, Operator::Add); // 77
        assert_eq!(submit(&p, "7").unwrap(), Submission::Pending);
    }

    #[test]
    fn test_exact_answer_is_correct() {
        let p = problem(6, 7, Operator::Multiply); // 42
        match submit(&p, "42").unwrap() {
            Submission::Resolved(outcome) => {
                assert!(outcome.is_correct);
                assert_eq!(outcome.operator, Operator::Multiply);
                assert_eq!(outcome.attempt_count, 1);
            }
            Submission::Pending => panic!("expected resolution"),
        }
    }

    #[test]
    fn test_wrong_answer_of_full_length_resolves_incorrect() {
        let p = problem(6, 7, Operator::Multiply);
        match submit(&p, "41").unwrap() {
            Submission::Resolved(outcome) => assert!(!outcome.is_correct),
            Submission::Pending => panic!("expected resolution"),
        }
    }

    #[test]
    fn test_non_numeric_input_rejected() {
        let p = problem(2, 2, Operator::Add);
        assert!(matches!(submit(&p, "4a"), Err(QuizError::InvalidInput(_))));
        assert!(matches!(submit(&p, "-4"), Err(QuizError::InvalidInput(_))));
    }

    #[test]
    fn test_quiz_rejects_letters_without_state_change() {
        let mut quiz = Quiz::with_generator(Difficulty::Hard, Generator::with_seed(5));
        let before = *quiz.problem();
        let digits = before.answer_digits();
        assert!(digits >= 1);

        assert!(quiz.push_char('x').is_err());
        assert_eq!(quiz.input(), "");
        assert_eq!(*quiz.problem(), before);
    }

    #[test]
    fn test_quiz_correct_answer_moves_on() {
        let mut quiz = Quiz::with_generator(Difficulty::Medium, Generator::with_seed(11));
        let answered = *quiz.problem();
        let answer = answered.correct_result.to_string();

        let mut last = Submission::Pending;
        for c in answer.chars() {
            last = quiz.push_char(c).unwrap();
        }

        match last {
            Submission::Resolved(outcome) => assert!(outcome.is_correct),
            Submission::Pending => panic!("expected resolution"),
        }
        assert_eq!(quiz.input(), "");
        assert_eq!(quiz.last_outcome().map(|(p, _)| *p), Some(answered));
    }

    #[test]
    fn test_quiz_wrong_answer_moves_on() {
        let mut quiz = Quiz::with_generator(Difficulty::Easy, Generator::with_seed(2));
        let answered = *quiz.problem();
        let wrong = (answered.correct_result + 1).to_string();
        // Keep the digit count the same so the check fires on the last digit
        let wrong = if wrong.len() == answered.answer_digits() {
            wrong
        } else {
            (answered.correct_result - 1).to_string()
        };

        let mut last = Submission::Pending;
        for c in wrong.chars() {
            last = quiz.push_char(c).unwrap();
        }

        match last {
            Submission::Resolved(outcome) => assert!(!outcome.is_correct),
            Submission::Pending => panic!("expected resolution"),
        }
        assert_eq!(quiz.last_outcome().map(|(p, _)| *p), Some(answered));
    }

    #[test]
    fn test_backspace() {
        let mut quiz = Quiz::with_generator(Difficulty::Hard, Generator::with_seed(8));
        while quiz.problem().answer_digits() < 2 {
            quiz.set_difficulty(Difficulty::Hard);
        }
        quiz.push_char('1').unwrap();
        assert_eq!(quiz.input(), "1");
        quiz.backspace();
        assert_eq!(quiz.input(), "");
    }
}
