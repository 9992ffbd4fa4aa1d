//! Canonicalization and simplification.
//!
//! [`canonicalize`] flattens sums and products, folds exact rational
//! arithmetic, collects like terms and equal bases, and orders terms by
//! descending degree. [`simplify`] additionally tries the cancelled and
//! factored forms of univariate rational functions and keeps the shortest.

use super::eval::EvaluationError;
use super::expr::{Constant, Expr, Function};
use super::poly::RationalFunction;
use super::rational::Rational;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Simplify an expression, choosing the candidate with the fewest operations.
///
/// Fails only when exact arithmetic hits a division by zero, e.g. `1/0`.
pub fn simplify(expr: &Expr) -> Result<Expr, EvaluationError> {
    let mut best = canonicalize(expr)?;
    let symbols = best.free_symbols();
    if symbols.len() != 1 {
        return Ok(best);
    }
    let Some(variable) = symbols.iter().next() else {
        return Ok(best);
    };
    if let Some(rf) = RationalFunction::from_expr(&best, variable) {
        let candidates = [
            Some(rf.to_expanded_expr(variable)),
            rf.to_factored_expr(variable),
        ];
        for candidate in candidates.into_iter().flatten() {
            let candidate = canonicalize(&candidate)?;
            if count_ops(&candidate) < count_ops(&best) {
                best = candidate;
            }
        }
    }
    Ok(best)
}

/// Bring an expression into canonical form
pub fn canonicalize(expr: &Expr) -> Result<Expr, EvaluationError> {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) | Expr::Constant(_) => Ok(expr.clone()),
        Expr::Add(terms) => add(
            terms
                .iter()
                .map(canonicalize)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Expr::Mul(factors) => mul(
            factors
                .iter()
                .map(canonicalize)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Expr::Pow(base, exp) => pow(canonicalize(base)?, canonicalize(exp)?),
        Expr::Call(function, arg) => Ok(call(*function, canonicalize(arg)?)),
    }
}

/// Number of arithmetic operations, used to rank equivalent forms
pub fn count_ops(expr: &Expr) -> usize {
    match expr {
        Expr::Number(n) => usize::from(n.is_negative()) + usize::from(!n.is_integer()),
        Expr::Symbol(_) | Expr::Constant(_) => 0,
        Expr::Add(items) | Expr::Mul(items) => {
            items.len().saturating_sub(1) + items.iter().map(count_ops).sum::<usize>()
        }
        Expr::Pow(base, exp) => 1 + count_ops(base) + count_ops(exp),
        Expr::Call(_, arg) => 1 + count_ops(arg),
    }
}

fn add(terms: Vec<Expr>) -> Result<Expr, EvaluationError> {
    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Expr::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    let mut constant = Rational::ZERO;
    let mut groups: BTreeMap<Expr, Rational> = BTreeMap::new();
    let mut leftovers = Vec::new();
    for term in flat {
        if let Expr::Number(n) = term {
            match constant.checked_add(n) {
                Some(sum) => constant = sum,
                None => leftovers.push(Expr::Number(n)),
            }
            continue;
        }
        let (coefficient, rest) = split_term(term);
        let slot = groups.entry(rest.clone()).or_insert(Rational::ZERO);
        match slot.checked_add(coefficient) {
            Some(sum) => *slot = sum,
            None => leftovers.push(with_coefficient(coefficient, rest)),
        }
    }

    let mut out: Vec<Expr> = groups
        .into_iter()
        .filter(|(_, coefficient)| !coefficient.is_zero())
        .map(|(rest, coefficient)| with_coefficient(coefficient, rest))
        .collect();
    out.extend(leftovers);
    if !constant.is_zero() {
        out.push(Expr::Number(constant));
    }
    out.sort_by(compare_terms);

    Ok(match out.len() {
        0 => Expr::int(0),
        1 => out.remove(0),
        _ => Expr::Add(out),
    })
}

/// `(coefficient, rest)` of a canonical term such as `3 x^2`
fn split_term(term: Expr) -> (Rational, Expr) {
    match term {
        Expr::Mul(mut factors) => match factors.first().and_then(Expr::as_number) {
            Some(coefficient) => {
                factors.remove(0);
                let rest = if factors.len() == 1 {
                    factors.remove(0)
                } else {
                    Expr::Mul(factors)
                };
                (coefficient, rest)
            }
            None => (Rational::ONE, Expr::Mul(factors)),
        },
        other => (Rational::ONE, other),
    }
}

fn with_coefficient(coefficient: Rational, rest: Expr) -> Expr {
    if coefficient.is_one() {
        return rest;
    }
    match rest {
        Expr::Mul(factors) => {
            let mut out = Vec::with_capacity(factors.len() + 1);
            out.push(Expr::Number(coefficient));
            out.extend(factors);
            Expr::Mul(out)
        }
        other => Expr::Mul(vec![Expr::Number(coefficient), other]),
    }
}

fn degree(expr: &Expr) -> Rational {
    match expr {
        Expr::Symbol(_) => Rational::ONE,
        Expr::Number(_) | Expr::Constant(_) | Expr::Call(..) => Rational::ZERO,
        Expr::Add(terms) => terms.iter().map(degree).max().unwrap_or(Rational::ZERO),
        Expr::Mul(factors) => factors
            .iter()
            .try_fold(Rational::ZERO, |acc, f| acc.checked_add(degree(f)))
            .unwrap_or(Rational::ZERO),
        Expr::Pow(base, exp) => match exp.as_number() {
            Some(e) => degree(base).checked_mul(e).unwrap_or(Rational::ZERO),
            None => degree(base),
        },
    }
}

/// Terms by descending degree, numbers last
fn compare_terms(a: &Expr, b: &Expr) -> Ordering {
    degree(b)
        .cmp(&degree(a))
        .then(a.is_number().cmp(&b.is_number()))
        .then_with(|| term_base(a).cmp(term_base(b)))
        .then_with(|| a.cmp(b))
}

/// The first non-numeric factor's base, used to order terms alphabetically
fn term_base(term: &Expr) -> &Expr {
    match term {
        Expr::Mul(factors) => factors
            .iter()
            .find(|f| !f.is_number())
            .map(power_base)
            .unwrap_or(term),
        other => power_base(other),
    }
}

fn power_base(expr: &Expr) -> &Expr {
    match expr {
        Expr::Pow(base, _) => base,
        other => other,
    }
}

fn factor_rank(factor: &Expr) -> u8 {
    match power_base(factor) {
        Expr::Number(_) => 0,
        Expr::Constant(_) => 1,
        Expr::Symbol(_) => 2,
        Expr::Call(..) => 3,
        Expr::Add(_) => 4,
        _ => 5,
    }
}

fn compare_factors(a: &Expr, b: &Expr) -> Ordering {
    factor_rank(a)
        .cmp(&factor_rank(b))
        .then_with(|| power_base(a).cmp(power_base(b)))
        .then_with(|| a.cmp(b))
}

fn mul(factors: Vec<Expr>) -> Result<Expr, EvaluationError> {
    let mut flat = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Expr::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    let mut coefficient = Rational::ONE;
    let mut leftovers = Vec::new();
    let mut powers: BTreeMap<Expr, Vec<Expr>> = BTreeMap::new();
    for factor in flat {
        match factor {
            Expr::Number(n) => match coefficient.checked_mul(n) {
                Some(product) => coefficient = product,
                None => leftovers.push(Expr::Number(n)),
            },
            Expr::Pow(base, exp) => powers.entry(*base).or_default().push(*exp),
            other => powers.entry(other).or_default().push(Expr::int(1)),
        }
    }
    if coefficient.is_zero() {
        return Ok(Expr::int(0));
    }

    let mut out = Vec::new();
    let mut needs_merge = false;
    for (base, exponents) in powers {
        let exponent = if exponents.len() == 1 {
            exponents.into_iter().next().unwrap_or_else(|| Expr::int(1))
        } else {
            add(exponents)?
        };
        match pow(base, exponent)? {
            Expr::Number(n) => match coefficient.checked_mul(n) {
                Some(product) => coefficient = product,
                None => leftovers.push(Expr::Number(n)),
            },
            Expr::Mul(inner) => {
                out.extend(inner);
                needs_merge = true;
            }
            other => out.push(other),
        }
    }

    if needs_merge {
        let mut again = vec![Expr::Number(coefficient)];
        again.extend(leftovers);
        again.extend(out);
        return mul(again);
    }
    if coefficient.is_zero() {
        return Ok(Expr::int(0));
    }

    // a numeric coefficient distributes over a lone sum: 2 (x + 1) = 2 x + 2
    if !coefficient.is_one() && leftovers.is_empty() && out.len() == 1 {
        if let Expr::Add(terms) = &out[0] {
            let distributed = terms
                .iter()
                .map(|term| mul(vec![Expr::Number(coefficient), term.clone()]))
                .collect::<Result<Vec<_>, _>>()?;
            return add(distributed);
        }
    }

    out.sort_by(compare_factors);
    let mut items = Vec::with_capacity(out.len() + leftovers.len() + 1);
    if !coefficient.is_one() {
        items.push(Expr::Number(coefficient));
    }
    items.extend(leftovers);
    items.extend(out);
    Ok(match items.len() {
        0 => Expr::int(1),
        1 => items.remove(0),
        _ => Expr::Mul(items),
    })
}

fn pow(base: Expr, exp: Expr) -> Result<Expr, EvaluationError> {
    let numeric_exp = exp.as_number();
    if let Some(e) = numeric_exp {
        if e.is_zero() {
            return Ok(Expr::int(1));
        }
        if e.is_one() {
            return Ok(base);
        }
    }
    match (base, numeric_exp) {
        (Expr::Number(b), Some(e)) => {
            Ok(number_pow(b, e)?.unwrap_or_else(|| Expr::pow(Expr::Number(b), exp)))
        }
        (Expr::Number(b), None) if b.is_one() => Ok(Expr::int(1)),
        (Expr::Pow(inner, inner_exp), Some(e)) if e.is_integer() => {
            let combined = mul(vec![*inner_exp, Expr::Number(e)])?;
            pow(*inner, combined)
        }
        (Expr::Mul(factors), Some(e)) if e.is_integer() => {
            let raised = factors
                .into_iter()
                .map(|factor| pow(factor, Expr::Number(e)))
                .collect::<Result<Vec<_>, _>>()?;
            mul(raised)
        }
        (Expr::Constant(Constant::E), _) => match exp {
            Expr::Call(Function::Ln, arg) => Ok(*arg),
            exp => Ok(Expr::pow(Expr::Constant(Constant::E), exp)),
        },
        (base, _) => Ok(Expr::pow(base, exp)),
    }
}

/// Exact rational power, `None` when the result is irrational or overflows
fn number_pow(base: Rational, exp: Rational) -> Result<Option<Expr>, EvaluationError> {
    if base.is_zero() {
        if exp.is_negative() {
            return Err(EvaluationError::DivisionByZero);
        }
        return Ok(Some(Expr::int(0)));
    }
    if base.is_one() {
        return Ok(Some(Expr::int(1)));
    }
    let Ok(numer) = i64::try_from(exp.numer()) else {
        return Ok(None);
    };
    if exp.is_integer() {
        return Ok(base.checked_pow(numer).map(Expr::Number));
    }
    let root = u32::try_from(exp.denom())
        .ok()
        .and_then(|q| base.exact_root(q))
        .and_then(|r| r.checked_pow(numer));
    Ok(root.map(Expr::Number))
}

fn call(function: Function, arg: Expr) -> Expr {
    use Function::*;

    let known = match (function, &arg) {
        (Sin | Tan | Asin | Atan | Sinh | Tanh, Expr::Number(n)) if n.is_zero() => {
            Some(Expr::int(0))
        }
        (Cos | Cosh, Expr::Number(n)) if n.is_zero() => Some(Expr::int(1)),
        (Acos, Expr::Number(n)) if n.is_one() => Some(Expr::int(0)),
        (Sin | Tan, Expr::Constant(Constant::Pi)) => Some(Expr::int(0)),
        (Cos, Expr::Constant(Constant::Pi)) => Some(Expr::int(-1)),
        (Ln, Expr::Number(n)) if n.is_one() => Some(Expr::int(0)),
        (Ln, Expr::Constant(Constant::E)) => Some(Expr::int(1)),
        (Ln, Expr::Pow(base, exp)) if **base == Expr::Constant(Constant::E) => {
            Some((**exp).clone())
        }
        (Abs, Expr::Number(n)) => n.abs().map(Expr::Number),
        (Abs, Expr::Call(Abs, _) | Expr::Constant(Constant::Pi | Constant::E)) => {
            Some(arg.clone())
        }
        _ => None,
    };
    known.unwrap_or_else(|| Expr::call(function, arg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::latex::expr_to_latex;
    use crate::symbolic::{LatexParser, SymbolicExpression, SymbolicParser};

    fn parse(latex: &str) -> Expr {
        match LatexParser.parse(latex).unwrap() {
            SymbolicExpression::Expression(e) => e,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    fn simplified(latex: &str) -> String {
        expr_to_latex(&simplify(&parse(latex)).unwrap())
    }

    fn canonical(latex: &str) -> String {
        expr_to_latex(&canonicalize(&parse(latex)).unwrap())
    }

    #[test]
    fn test_collects_like_terms() {
        assert_eq!(canonical("x + x + y"), "2 x + y");
        assert_eq!(canonical("3x - 3x"), "0");
        assert_eq!(canonical("x - (x + 1)"), "-1");
    }

    #[test]
    fn test_orders_by_descending_degree() {
        assert_eq!(canonical("1 + x + x^2"), "x^{2} + x + 1");
    }

    #[test]
    fn test_combines_powers() {
        assert_eq!(canonical("x \\cdot x^2"), "x^{3}");
        assert_eq!(canonical("\\frac{x^3}{x}"), "x^{2}");
        assert_eq!(canonical("(x^2)^3"), "x^{6}");
    }

    #[test]
    fn test_exact_numeric_folding() {
        assert_eq!(canonical("\\frac{1}{2} + \\frac{1}{3}"), "\\frac{5}{6}");
        assert_eq!(canonical("\\sqrt{16}"), "4");
        assert_eq!(canonical("2^{10}"), "1024");
        assert_eq!(canonical("\\sqrt{2}"), "\\sqrt{2}");
    }

    #[test]
    fn test_distributes_numeric_coefficient() {
        assert_eq!(canonical("2(x+1)"), "2 x + 2");
    }

    #[test]
    fn test_known_function_values() {
        assert_eq!(canonical("\\sin 0 + \\cos 0"), "1");
        assert_eq!(canonical("\\ln e"), "1");
        assert_eq!(canonical("\\cos \\pi"), "-1");
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(
            simplify(&parse("\\frac{1}{0}")),
            Err(EvaluationError::DivisionByZero)
        );
        assert_eq!(
            simplify(&parse("\\frac{1}{x - x}")),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn test_perfect_square_is_factored() {
        assert_eq!(simplified("x^2+2x+1"), "\\left(x + 1\\right)^{2}");
    }

    #[test]
    fn test_difference_of_squares_stays_expanded() {
        assert_eq!(simplified("x^2-4"), "x^{2} - 4");
    }

    #[test]
    fn test_rational_function_is_cancelled() {
        assert_eq!(simplified("\\frac{x^2-1}{x-1}"), "x + 1");
    }

    #[test]
    fn test_multivariate_keeps_canonical_form() {
        assert_eq!(simplified("x y + y x"), "2 x y");
    }

    #[test]
    fn test_count_ops() {
        assert_eq!(count_ops(&parse("x^2+2x+1")), 4);
        assert_eq!(count_ops(&Expr::symbol("x")), 0);
    }
}
