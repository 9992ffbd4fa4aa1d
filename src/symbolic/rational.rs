//! Exact rational numbers backed by `i128`.
//!
//! All arithmetic is checked: an overflow yields `None` and callers fall back to
//! leaving the expression unsimplified rather than producing a wrong value.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

pub(crate) fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    // gcd of two i128 values only exceeds i128::MAX for (MIN, MIN) or (MIN, 0)
    i128::try_from(a).unwrap_or(1)
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };

    /// Build a reduced fraction. Returns `None` for a zero denominator.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        let (mut num, mut den) = (num / g, den / g);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        Some(Self { num, den })
    }

    pub const fn integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numer(&self) -> i128 {
        self.num
    }

    pub fn denom(&self) -> i128 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_one(&self) -> bool {
        self.num == 1 && self.den == 1
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn to_integer(&self) -> Option<i128> {
        self.is_integer().then_some(self.num)
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Parse a plain decimal literal such as `12`, `3.14` or `.5`.
    pub fn from_decimal_str(text: &str) -> Option<Self> {
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }
        let digits = format!("{}{}", int_part, frac_part);
        let num: i128 = digits.parse().ok()?;
        let den = 10i128.checked_pow(u32::try_from(frac_part.len()).ok()?)?;
        Self::new(num, den)
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    pub fn abs(self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_abs()?,
            den: self.den,
        })
    }

    pub fn recip(self) -> Option<Self> {
        Self::new(self.den, self.num)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let g = gcd(self.den, other.den).max(1);
        let lhs = self.num.checked_mul(other.den / g)?;
        let rhs = other.num.checked_mul(self.den / g)?;
        let den = (self.den / g).checked_mul(other.den)?;
        Self::new(lhs.checked_add(rhs)?, den)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let g1 = gcd(self.num, other.den).max(1);
        let g2 = gcd(other.num, self.den).max(1);
        let num = (self.num / g1).checked_mul(other.num / g2)?;
        let den = (self.den / g2).checked_mul(other.den / g1)?;
        Self::new(num, den)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.checked_mul(other.recip()?)
    }

    /// Integer power. `0` raised to a negative power is `None`.
    pub fn checked_pow(self, exp: i64) -> Option<Self> {
        let base = if exp < 0 { self.recip()? } else { self };
        let exp = u32::try_from(exp.unsigned_abs()).ok()?;
        Some(Self {
            num: base.num.checked_pow(exp)?,
            den: base.den.checked_pow(exp)?,
        })
    }

    /// The exact `n`-th root, when numerator and denominator are perfect powers.
    pub fn exact_root(self, n: u32) -> Option<Self> {
        if n == 0 {
            return None;
        }
        if self.num < 0 {
            if n % 2 == 0 {
                return None;
            }
            return self.checked_neg()?.exact_root(n)?.checked_neg();
        }
        let num = integer_root(self.num, n)?;
        let den = integer_root(self.den, n)?;
        Self::new(num, den)
    }
}

fn integer_root(value: i128, n: u32) -> Option<i128> {
    let estimate = (value as f64).powf(1.0 / f64::from(n)).round() as i128;
    (estimate.saturating_sub(1)..=estimate.saturating_add(1))
        .filter(|candidate| *candidate >= 0)
        .find(|candidate| candidate.checked_pow(n) == Some(value))
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
            _ => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

impl From<i128> for Rational {
    fn from(n: i128) -> Self {
        Self::integer(n)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}
