//! Univariate polynomials and rational functions over the rationals.
//!
//! Used by the simplifier to cancel common factors and to factor polynomials
//! with rational roots. Every operation is checked; `None` means the
//! coefficients overflowed and the caller should keep its original form.

use super::expr::Expr;
use super::rational::{gcd, Rational};

/// Largest exponent expanded when converting an expression to a polynomial
const MAX_DEGREE: i128 = 32;

/// Largest constant/leading coefficient whose divisors are enumerated
const MAX_ROOT_SEARCH: i128 = 1_000_000;

/// Coefficients stored lowest degree first, without trailing zeros
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    coeffs: Vec<Rational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(c: Rational) -> Self {
        Self::from_coeffs(vec![c])
    }

    /// The polynomial `x`
    pub fn x() -> Self {
        Self::from_coeffs(vec![Rational::ZERO, Rational::ONE])
    }

    pub fn from_coeffs(mut coeffs: Vec<Rational>) -> Self {
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[Rational] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Degree, or `None` for the zero polynomial
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    pub fn leading(&self) -> Rational {
        self.coeffs.last().copied().unwrap_or(Rational::ZERO)
    }

    pub fn add(&self, other: &Self) -> Option<Self> {
        let len = self.coeffs.len().max(other.coeffs.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.coeffs.get(i).copied().unwrap_or(Rational::ZERO);
            let b = other.coeffs.get(i).copied().unwrap_or(Rational::ZERO);
            out.push(a.checked_add(b)?);
        }
        Some(Self::from_coeffs(out))
    }

    pub fn sub(&self, other: &Self) -> Option<Self> {
        self.add(&other.scale(Rational::MINUS_ONE)?)
    }

    pub fn scale(&self, factor: Rational) -> Option<Self> {
        let coeffs = self
            .coeffs
            .iter()
            .map(|c| c.checked_mul(factor))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_coeffs(coeffs))
    }

    pub fn mul(&self, other: &Self) -> Option<Self> {
        if self.is_zero() || other.is_zero() {
            return Some(Self::zero());
        }
        let mut out = vec![Rational::ZERO; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] = out[i + j].checked_add(a.checked_mul(*b)?)?;
            }
        }
        Some(Self::from_coeffs(out))
    }

    pub fn pow(&self, exp: u32) -> Option<Self> {
        let mut result = Self::constant(Rational::ONE);
        for _ in 0..exp {
            result = result.mul(self)?;
        }
        Some(result)
    }

    /// Polynomial long division; `None` when dividing by zero or on overflow
    pub fn div_rem(&self, divisor: &Self) -> Option<(Self, Self)> {
        let divisor_degree = divisor.degree()?;
        let lead = divisor.leading();
        let mut remainder = self.clone();
        let mut quotient = vec![Rational::ZERO; self.coeffs.len().saturating_sub(divisor_degree).max(1)];
        while let Some(degree) = remainder.degree() {
            if degree < divisor_degree {
                break;
            }
            let shift = degree - divisor_degree;
            let factor = remainder.leading().checked_div(lead)?;
            quotient[shift] = factor;
            let mut term = vec![Rational::ZERO; shift];
            term.push(factor);
            remainder = remainder.sub(&divisor.mul(&Self::from_coeffs(term))?)?;
        }
        Some((Self::from_coeffs(quotient), remainder))
    }

    /// Scale so the leading coefficient is one
    pub fn monic(&self) -> Option<Self> {
        if self.is_zero() {
            return Some(Self::zero());
        }
        self.scale(self.leading().recip()?)
    }

    /// Monic greatest common divisor
    pub fn gcd(&self, other: &Self) -> Option<Self> {
        let (mut a, mut b) = (self.clone(), other.clone());
        while !b.is_zero() {
            let (_, r) = a.div_rem(&b)?;
            a = b;
            b = r;
        }
        a.monic()
    }

    pub fn eval(&self, x: Rational) -> Option<Rational> {
        self.coeffs
            .iter()
            .rev()
            .try_fold(Rational::ZERO, |acc, c| acc.checked_mul(x)?.checked_add(*c))
    }

    /// Split into a rational content and a primitive integer polynomial with a
    /// positive leading coefficient.
    fn primitive(&self) -> Option<(Rational, Self)> {
        let lcm = self.coeffs.iter().try_fold(1i128, |acc, c| {
            let g = gcd(acc, c.denom()).max(1);
            (acc / g).checked_mul(c.denom())
        })?;
        let integers = self
            .coeffs
            .iter()
            .map(|c| c.checked_mul(Rational::integer(lcm)).and_then(|v| v.to_integer()))
            .collect::<Option<Vec<i128>>>()?;
        let mut content = integers.iter().fold(0i128, |acc, v| gcd(acc, *v)).max(1);
        if self.leading().is_negative() {
            content = content.checked_neg()?;
        }
        let coeffs = integers
            .into_iter()
            .map(|v| Rational::integer(v / content))
            .collect();
        Some((Rational::new(content, lcm)?, Self::from_coeffs(coeffs)))
    }

    /// Factor over the rationals: constant times linear factors for every
    /// rational root (with multiplicity) times an irreducible-over-roots rest.
    pub fn factor(&self) -> Option<Factorization> {
        let mut factorization = Factorization {
            constant: Rational::ONE,
            factors: Vec::new(),
        };
        if self.degree().unwrap_or(0) == 0 {
            factorization.constant = self.leading();
            return Some(factorization);
        }
        let (content, mut rest) = self.primitive()?;
        factorization.constant = content;

        let zero_roots = rest.coeffs.iter().take_while(|c| c.is_zero()).count();
        if zero_roots > 0 {
            rest = Self::from_coeffs(rest.coeffs[zero_roots..].to_vec());
            factorization.push(Self::x(), u32::try_from(zero_roots).ok()?);
        }

        let constant_term = rest.coeffs.first().copied().unwrap_or(Rational::ZERO);
        let lead = rest.leading();
        let (c0, cn) = (constant_term.to_integer()?, lead.to_integer()?);
        if rest.degree().unwrap_or(0) > 0 && c0.abs() <= MAX_ROOT_SEARCH && cn.abs() <= MAX_ROOT_SEARCH {
            for q in divisors(cn) {
                for p in divisors(c0) {
                    for root in [Rational::new(-p, q)?, Rational::new(p, q)?] {
                        let linear = Self::from_coeffs(vec![
                            Rational::integer(-root.numer()),
                            Rational::integer(root.denom()),
                        ]);
                        let mut multiplicity = 0;
                        while rest.degree().unwrap_or(0) > 0 && rest.eval(root)?.is_zero() {
                            let (quotient, _) = rest.div_rem(&linear)?;
                            rest = quotient;
                            multiplicity += 1;
                        }
                        if multiplicity > 0 {
                            factorization.push(linear, multiplicity);
                        }
                    }
                }
            }
        }

        match rest.degree() {
            Some(0) | None => {
                factorization.constant = factorization.constant.checked_mul(rest.leading())?;
            }
            Some(_) => factorization.push(rest, 1),
        }
        Some(factorization)
    }

    /// Expression `c_n x^n + ... + c_0` in `variable`
    pub fn to_expr(&self, variable: &str) -> Expr {
        let mut terms = Vec::new();
        for (degree, c) in self.coeffs.iter().enumerate().rev() {
            if c.is_zero() {
                continue;
            }
            let power = match degree {
                0 => None,
                1 => Some(Expr::symbol(variable)),
                d => Some(Expr::pow(Expr::symbol(variable), Expr::int(d as i128))),
            };
            terms.push(match power {
                None => Expr::Number(*c),
                Some(p) if c.is_one() => p,
                Some(p) => Expr::Mul(vec![Expr::Number(*c), p]),
            });
        }
        match terms.len() {
            0 => Expr::int(0),
            1 => terms.remove(0),
            _ => Expr::Add(terms),
        }
    }
}

fn divisors(n: i128) -> Vec<i128> {
    let n = n.abs();
    if n == 0 {
        return Vec::new();
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d != n / d {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// `constant * Π factor^multiplicity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factorization {
    pub constant: Rational,
    pub factors: Vec<(Poly, u32)>,
}

impl Factorization {
    fn push(&mut self, factor: Poly, multiplicity: u32) {
        if let Some(existing) = self.factors.iter_mut().find(|(f, _)| *f == factor) {
            existing.1 += multiplicity;
        } else {
            self.factors.push((factor, multiplicity));
        }
    }

    pub fn to_expr(&self, variable: &str) -> Expr {
        let mut factors = Vec::with_capacity(self.factors.len() + 1);
        if !self.constant.is_one() {
            factors.push(Expr::Number(self.constant));
        }
        for (factor, multiplicity) in &self.factors {
            let base = factor.to_expr(variable);
            factors.push(if *multiplicity == 1 {
                base
            } else {
                Expr::pow(base, Expr::int(i128::from(*multiplicity)))
            });
        }
        match factors.len() {
            0 => Expr::int(1),
            1 => factors.remove(0),
            _ => Expr::Mul(factors),
        }
    }
}

/// `numerator / denominator` in lowest terms with a monic denominator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalFunction {
    pub numerator: Poly,
    pub denominator: Poly,
}

impl RationalFunction {
    fn polynomial(numerator: Poly) -> Self {
        Self {
            numerator,
            denominator: Poly::constant(Rational::ONE),
        }
    }

    fn new(numerator: Poly, denominator: Poly) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        let common = numerator.gcd(&denominator)?;
        let common = if common.is_zero() {
            Poly::constant(Rational::ONE)
        } else {
            common
        };
        let (numerator, _) = numerator.div_rem(&common)?;
        let (denominator, _) = denominator.div_rem(&common)?;
        let lead = denominator.leading().recip()?;
        Some(Self {
            numerator: numerator.scale(lead)?,
            denominator: denominator.scale(lead)?,
        })
    }

    /// Interpret `expr` as a rational function of `variable`. Returns `None`
    /// for other symbols, transcendental functions or symbolic exponents.
    pub fn from_expr(expr: &Expr, variable: &str) -> Option<Self> {
        match expr {
            Expr::Number(n) => Some(Self::polynomial(Poly::constant(*n))),
            Expr::Symbol(name) if name == variable => Some(Self::polynomial(Poly::x())),
            Expr::Add(terms) => terms.iter().try_fold(Self::polynomial(Poly::zero()), |acc, term| {
                acc.add(&Self::from_expr(term, variable)?)
            }),
            Expr::Mul(factors) => factors
                .iter()
                .try_fold(Self::polynomial(Poly::constant(Rational::ONE)), |acc, factor| {
                    acc.mul(&Self::from_expr(factor, variable)?)
                }),
            Expr::Pow(base, exp) => {
                let n = exp.as_number()?.to_integer()?;
                if n.abs() > MAX_DEGREE {
                    return None;
                }
                let base = Self::from_expr(base, variable)?;
                let raised = Self::new(
                    base.numerator.pow(u32::try_from(n.abs()).ok()?)?,
                    base.denominator.pow(u32::try_from(n.abs()).ok()?)?,
                )?;
                if n < 0 {
                    Self::new(raised.denominator, raised.numerator)
                } else {
                    Some(raised)
                }
            }
            _ => None,
        }
    }

    pub fn add(&self, other: &Self) -> Option<Self> {
        let numerator = self
            .numerator
            .mul(&other.denominator)?
            .add(&other.numerator.mul(&self.denominator)?)?;
        Self::new(numerator, self.denominator.mul(&other.denominator)?)
    }

    pub fn mul(&self, other: &Self) -> Option<Self> {
        Self::new(
            self.numerator.mul(&other.numerator)?,
            self.denominator.mul(&other.denominator)?,
        )
    }

    pub fn is_polynomial(&self) -> bool {
        self.denominator.degree() == Some(0)
    }

    /// Expanded numerator over expanded denominator
    pub fn to_expanded_expr(&self, variable: &str) -> Expr {
        self.combine(self.numerator.to_expr(variable), self.denominator.to_expr(variable))
    }

    /// Factored numerator over factored denominator
    pub fn to_factored_expr(&self, variable: &str) -> Option<Expr> {
        let numerator = self.numerator.factor()?.to_expr(variable);
        let denominator = self.denominator.factor()?.to_expr(variable);
        Some(self.combine(numerator, denominator))
    }

    fn combine(&self, numerator: Expr, denominator: Expr) -> Expr {
        if self.is_polynomial() {
            numerator
        } else {
            Expr::div(numerator, denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i128]) -> Poly {
        Poly::from_coeffs(values.iter().map(|v| Rational::integer(*v)).collect())
    }

    #[test]
    fn test_arithmetic_and_degree() {
        let p = ints(&[1, 1]); // x + 1
        let square = p.mul(&p).unwrap();
        assert_eq!(square, ints(&[1, 2, 1]));
        assert_eq!(square.degree(), Some(2));
        assert_eq!(square.sub(&square).unwrap().degree(), None);
    }

    #[test]
    fn test_div_rem() {
        let (q, r) = ints(&[-1, 0, 1]).div_rem(&ints(&[-1, 1])).unwrap();
        assert_eq!(q, ints(&[1, 1]));
        assert!(r.is_zero());
        assert!(ints(&[1]).div_rem(&Poly::zero()).is_none());
    }

    #[test]
    fn test_gcd_is_monic() {
        // gcd(2x^2 - 2, 3x - 3) = x - 1
        let g = ints(&[-2, 0, 2]).gcd(&ints(&[-3, 3])).unwrap();
        assert_eq!(g, ints(&[-1, 1]));
    }

    #[test]
    fn test_factor_perfect_square() {
        let f = ints(&[1, 2, 1]).factor().unwrap();
        assert_eq!(f.constant, Rational::ONE);
        assert_eq!(f.factors, vec![(ints(&[1, 1]), 2)]);
    }

    #[test]
    fn test_factor_with_content_and_rational_root() {
        // 4x^2 - 1 = (2x + 1)(2x - 1)
        let f = ints(&[-1, 0, 4]).factor().unwrap();
        assert_eq!(f.constant, Rational::ONE);
        assert_eq!(f.factors.len(), 2);
        assert!(f.factors.contains(&(ints(&[1, 2]), 1)));
        assert!(f.factors.contains(&(ints(&[-1, 2]), 1)));

        // 3x^2 + 3x = 3 x (x + 1)
        let f = ints(&[0, 3, 3]).factor().unwrap();
        assert_eq!(f.constant, Rational::integer(3));
        assert_eq!(f.factors, vec![(Poly::x(), 1), (ints(&[1, 1]), 1)]);
    }

    #[test]
    fn test_irreducible_rest_is_kept() {
        // x^2 + 1 has no rational roots
        let f = ints(&[1, 0, 1]).factor().unwrap();
        assert_eq!(f.factors, vec![(ints(&[1, 0, 1]), 1)]);
    }

    #[test]
    fn test_rational_function_cancels_common_factor() {
        let x = Expr::symbol("x");
        // (x^2 - 1) / (x - 1)
        let expr = Expr::div(
            Expr::Add(vec![Expr::pow(x.clone(), Expr::int(2)), Expr::int(-1)]),
            Expr::Add(vec![x, Expr::int(-1)]),
        );
        let rf = RationalFunction::from_expr(&expr, "x").unwrap();
        assert!(rf.is_polynomial());
        assert_eq!(rf.numerator, ints(&[1, 1]));
    }

    #[test]
    fn test_rational_function_rejects_other_symbols() {
        let expr = Expr::Add(vec![Expr::symbol("x"), Expr::symbol("y")]);
        assert!(RationalFunction::from_expr(&expr, "x").is_none());
    }

    #[test]
    fn test_zero_denominator_is_rejected() {
        let expr = Expr::div(Expr::int(1), Expr::int(0));
        assert!(RationalFunction::from_expr(&expr, "x").is_none());
    }
}
