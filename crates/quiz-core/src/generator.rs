use crate::{Difficulty, Operator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A single arithmetic problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub operand_a: u32,
    pub operand_b: u32,
    pub operator: Operator,
    pub correct_result: u32,
}

impl Problem {
    pub fn new(operand_a: u32, operand_b: u32, operator: Operator) -> Self {
        Self {
            operand_a,
            operand_b,
            operator,
            correct_result: operator.apply(operand_a, operand_b),
        }
    }

    /// Number of digits in the correct result
    pub fn answer_digits(&self) -> usize {
        self.correct_result.to_string().len()
    }

    /// Render as "a + b"
    pub fn display(&self) -> String {
        format!("{} {} {}", self.operand_a, self.operator, self.operand_b)
    }
}

/// Inclusive operand bounds for one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandRange {
    pub a: (u32, u32),
    pub b: (u32, u32),
}

impl OperandRange {
    const fn new(a: (u32, u32), b: (u32, u32)) -> Self {
        Self { a, b }
    }

    pub fn a_range(&self) -> RangeInclusive<u32> {
        self.a.0..=self.a.1
    }

    pub fn b_range(&self) -> RangeInclusive<u32> {
        self.b.0..=self.b.1
    }
}

/// Operand policy for a difficulty tier
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub difficulty: Difficulty,
    /// Probability of picking multiplication over addition
    pub multiply_weight: f64,
    pub addition: OperandRange,
    pub multiplication: Option<OperandRange>,
}

impl GeneratorConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::easy(),
            Difficulty::Medium => Self::medium(),
            Difficulty::Hard => Self::hard(),
        }
    }

    /// Addition only, single-digit-ish operands
    pub fn easy() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            multiply_weight: 0.0,
            addition: OperandRange::new((1, 10), (1, 10)),
            multiplication: None,
        }
    }

    pub fn medium() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            multiply_weight: 0.5,
            addition: OperandRange::new((10, 29), (1, 20)),
            multiplication: Some(OperandRange::new((1, 5), (1, 5))),
        }
    }

    pub fn hard() -> Self {
        Self {
            difficulty: Difficulty::Hard,
            multiply_weight: 0.5,
            addition: OperandRange::new((20, 69), (5, 34)),
            multiplication: Some(OperandRange::new((2, 8), (2, 8))),
        }
    }

    /// Operand bounds used for the given operator, if this tier ever picks it
    pub fn range_for(&self, operator: Operator) -> Option<OperandRange> {
        match operator {
            Operator::Add => Some(self.addition),
            Operator::Multiply => self.multiplication,
        }
    }
}

/// Arithmetic problem generator
pub struct Generator<R: Rng = StdRng> {
    rng: R,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a generator seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator with a specific seed for reproducibility
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> Generator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate a problem for the given difficulty
    pub fn generate(&mut self, difficulty: Difficulty) -> Problem {
        let config = GeneratorConfig::for_difficulty(difficulty);
        self.generate_with_config(&config)
    }

    pub fn generate_with_config(&mut self, config: &GeneratorConfig) -> Problem {
        let (operator, range) = match config.multiplication {
            Some(range) if self.rng.gen_bool(config.multiply_weight.clamp(0.0, 1.0)) => {
                (Operator::Multiply, range)
            }
            _ => (Operator::Add, config.addition),
        };

        let a = self.rng.gen_range(range.a_range());
        let b = self.rng.gen_range(range.b_range());
        Problem::new(a, b, operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_match_operator() {
        let mut generator = Generator::with_seed(42);
        for &difficulty in Difficulty::all() {
            for _ in 0..500 {
                let p = generator.generate(difficulty);
                let expected = match p.operator {
                    Operator::Add => p.operand_a + p.operand_b,
                    Operator::Multiply => p.operand_a * p.operand_b,
                };
                assert_eq!(p.correct_result, expected);
                assert!(p.correct_result > 0);
            }
        }
    }

    #[test]
    fn test_operands_within_tier_ranges() {
        let mut generator = Generator::with_seed(7);
        for &difficulty in Difficulty::all() {
            let config = GeneratorConfig::for_difficulty(difficulty);
            for _ in 0..500 {
                let p = generator.generate(difficulty);
                let range = config
                    .range_for(p.operator)
                    .expect("operator not allowed for tier");
                assert!(range.a_range().contains(&p.operand_a), "{:?}", p);
                assert!(range.b_range().contains(&p.operand_b), "{:?}", p);
                assert!(p.operand_a > 0 && p.operand_b > 0);
            }
        }
    }

    #[test]
    fn test_easy_is_addition_only() {
        let mut generator = Generator::with_seed(1);
        for _ in 0..200 {
            assert_eq!(generator.generate(Difficulty::Easy).operator, Operator::Add);
        }
    }

    #[test]
    fn test_harder_tiers_mix_operators() {
        let mut generator = Generator::with_seed(3);
        for difficulty in [Difficulty::Medium, Difficulty::Hard] {
            let multiplies = (0..400)
                .filter(|_| generator.generate(difficulty).operator == Operator::Multiply)
                .count();
            assert!(multiplies > 100 && multiplies < 300, "{}: {}", difficulty, multiplies);
        }
    }

    #[test]
    fn test_tiers_have_distinct_tables() {
        let easy = GeneratorConfig::easy();
        let medium = GeneratorConfig::medium();
        let hard = GeneratorConfig::hard();
        assert_ne!(easy, medium);
        assert_ne!(medium, hard);
        assert_ne!(easy, hard);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let mut a = Generator::with_seed(99);
        let mut b = Generator::with_seed(99);
        for _ in 0..20 {
            assert_eq!(a.generate(Difficulty::Hard), b.generate(Difficulty::Hard));
        }
    }

    #[test]
    fn test_answer_digits() {
        assert_eq!(Problem::new(3, 4, Operator::Add).answer_digits(), 1);
        assert_eq!(Problem::new(5, 5, Operator::Add).answer_digits(), 2);
        assert_eq!(Problem::new(8, 8, Operator::Multiply).answer_digits(), 2);
        assert_eq!(Problem::new(69, 34, Operator::Add).answer_digits(), 3);
    }
}
