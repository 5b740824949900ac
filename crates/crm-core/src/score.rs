//! Saturating placement-score arithmetic.
//!
//! Scores are signed integers clamped to `[-INFINITY, +INFINITY]`. The two
//! bounds are sentinels: `+INFINITY` means "must", `-INFINITY` means "never".
//! Negative infinity dominates any sum it takes part in, including a sum
//! with positive infinity.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Magnitude of the infinite score sentinels.
pub const INFINITY: i32 = 1_000_000;

/// A placement or colocation score.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Score(i32);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const INFINITY: Score = Score(INFINITY);
    pub const NEG_INFINITY: Score = Score(-INFINITY);

    /// Build a score, clamping out-of-range values to the sentinels.
    pub fn new(value: i64) -> Self {
        Score(value.clamp(-(INFINITY as i64), INFINITY as i64) as i32)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_pos_infinity(self) -> bool {
        self.0 >= INFINITY
    }

    pub fn is_neg_infinity(self) -> bool {
        self.0 <= -INFINITY
    }

    /// Add two scores, honouring the infinity sentinels.
    pub fn saturating_add(self, other: Score) -> Score {
        if self.is_neg_infinity() || other.is_neg_infinity() {
            Score::NEG_INFINITY
        } else if self.is_pos_infinity() || other.is_pos_infinity() {
            Score::INFINITY
        } else {
            Score::new(self.0 as i64 + other.0 as i64)
        }
    }

    /// Parse a textual score.
    ///
    /// Accepts `INFINITY`, `+INFINITY` and `-INFINITY` (case-insensitive) and
    /// signed integers. Integers beyond the sentinels are clamped.
    pub fn parse(text: &str) -> CoreResult<Score> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("INFINITY") || trimmed.eq_ignore_ascii_case("+INFINITY") {
            return Ok(Score::INFINITY);
        }
        if trimmed.eq_ignore_ascii_case("-INFINITY") {
            return Ok(Score::NEG_INFINITY);
        }

        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        match digits.parse::<i64>() {
            Ok(value) => Ok(Score::new(value)),
            // Integers too long for i64 still carry a sign worth keeping.
            Err(_) if is_integer_literal(digits) => Ok(if digits.starts_with('-') {
                Score::NEG_INFINITY
            } else {
                Score::INFINITY
            }),
            Err(_) => Err(CoreError::InvalidScore(text.to_string())),
        }
    }
}

fn is_integer_literal(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit())
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = self.saturating_add(rhs);
    }
}

impl From<i32> for Score {
    fn from(value: i32) -> Self {
        Score::new(value as i64)
    }
}

impl FromStr for Score {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Score::parse(s)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pos_infinity() {
            f.write_str("INFINITY")
        } else if self.is_neg_infinity() {
            f.write_str("-INFINITY")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_sentinels_case_insensitively() {
        assert_eq!(Score::parse("INFINITY").unwrap(), Score::INFINITY);
        assert_eq!(Score::parse("+infinity").unwrap(), Score::INFINITY);
        assert_eq!(Score::parse("-Infinity").unwrap(), Score::NEG_INFINITY);
    }

    #[test]
    fn parses_and_clamps_integers() {
        assert_eq!(Score::parse("100").unwrap().value(), 100);
        assert_eq!(Score::parse("+7").unwrap().value(), 7);
        assert_eq!(Score::parse("-2000000").unwrap(), Score::NEG_INFINITY);
        assert_eq!(Score::parse("99999999999999999999999").unwrap(), Score::INFINITY);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Score::parse("lots"),
            Err(CoreError::InvalidScore(_))
        ));
        assert!(Score::parse("").is_err());
    }

    #[test]
    fn negative_infinity_dominates() {
        assert_eq!(Score::INFINITY + Score::NEG_INFINITY, Score::NEG_INFINITY);
        assert_eq!(Score::NEG_INFINITY + Score::INFINITY, Score::NEG_INFINITY);
        assert_eq!(Score::INFINITY + Score::from(-5), Score::INFINITY);
    }

    #[test]
    fn display_uses_sentinel_names() {
        assert_eq!(Score::INFINITY.to_string(), "INFINITY");
        assert_eq!(Score::NEG_INFINITY.to_string(), "-INFINITY");
        assert_eq!(Score::from(42).to_string(), "42");
    }

    proptest! {
        #[test]
        fn addition_stays_within_bounds(a in any::<i32>(), b in any::<i32>()) {
            let sum = Score::from(a) + Score::from(b);
            prop_assert!(sum.value() >= -INFINITY && sum.value() <= INFINITY);
        }

        #[test]
        fn addition_is_commutative(a in -2_000_000i32..2_000_000, b in -2_000_000i32..2_000_000) {
            prop_assert_eq!(Score::from(a) + Score::from(b), Score::from(b) + Score::from(a));
        }

        #[test]
        fn negative_infinity_absorbs_everything(a in any::<i32>()) {
            prop_assert_eq!(Score::NEG_INFINITY + Score::from(a), Score::NEG_INFINITY);
        }

        #[test]
        fn display_round_trips(a in -2_000_000i32..2_000_000) {
            let score = Score::from(a);
            prop_assert_eq!(Score::parse(&score.to_string()).unwrap(), score);
        }
    }
}
