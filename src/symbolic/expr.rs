use super::rational::Rational;
use std::collections::BTreeSet;
use std::fmt;

/// Named mathematical constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    Pi,
    E,
    Infinity,
}

/// Elementary functions of one argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Ln,
    Abs,
}

impl Function {
    /// Resolve a LaTeX command or operator name (without backslash)
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" | "tg" => Self::Tan,
            "cot" | "ctg" => Self::Cot,
            "sec" => Self::Sec,
            "csc" | "cosec" => Self::Csc,
            "arcsin" | "asin" => Self::Asin,
            "arccos" | "acos" => Self::Acos,
            "arctan" | "atan" | "arctg" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "ln" => Self::Ln,
            "abs" => Self::Abs,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Cot => "cot",
            Self::Sec => "sec",
            Self::Csc => "csc",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Ln => "ln",
            Self::Abs => "abs",
        }
    }

    /// Inverse used for `\sin^{-1}` style notation
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::Sin => Some(Self::Asin),
            Self::Cos => Some(Self::Acos),
            Self::Tan => Some(Self::Atan),
            _ => None,
        }
    }
}

/// Algebraic expression tree.
///
/// Subtraction is `a + (-1)·b`, division is `a·b^(-1)` and roots are rational
/// powers, so the simplifier only has to reason about sums, products and powers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Number(Rational),
    Symbol(String),
    Constant(Constant),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    pub fn int(n: i128) -> Self {
        Expr::Number(Rational::integer(n))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn pow(base: Expr, exp: Expr) -> Self {
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn call(function: Function, arg: Expr) -> Self {
        Expr::Call(function, Box::new(arg))
    }

    pub fn neg(expr: Expr) -> Self {
        Expr::Mul(vec![Expr::Number(Rational::MINUS_ONE), expr])
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add(vec![lhs, Expr::neg(rhs)])
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::Mul(vec![lhs, Expr::pow(rhs, Expr::Number(Rational::MINUS_ONE))])
    }

    pub fn as_number(&self) -> Option<Rational> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Expr::Number(_))
    }

    /// Collect the names of all free variables into `out`
    pub fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Number(_) | Expr::Constant(_) => {}
            Expr::Add(items) | Expr::Mul(items) => {
                items.iter().for_each(|item| item.collect_symbols(out))
            }
            Expr::Pow(base, exp) => {
                base.collect_symbols(out);
                exp.collect_symbols(out);
            }
            Expr::Call(_, arg) => arg.collect_symbols(out),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }
}

/// Split a product into its rational coefficient and the remaining factors
pub(crate) fn split_coefficient(factors: &[Expr]) -> (Rational, Vec<&Expr>) {
    let mut coefficient = Rational::ONE;
    let mut rest = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Expr::Number(n) => match coefficient.checked_mul(*n) {
                Some(product) => coefficient = product,
                None => rest.push(factor),
            },
            _ => rest.push(factor),
        }
    }
    (coefficient, rest)
}

/// Whether a sum term should be printed with a leading minus
pub(crate) fn is_negative_term(term: &Expr) -> bool {
    match term {
        Expr::Number(n) => n.is_negative(),
        Expr::Mul(factors) => split_coefficient(factors).0.is_negative(),
        _ => false,
    }
}

/// Negate a term whose coefficient is negative, keeping its shape
pub(crate) fn negate_term(term: &Expr) -> Expr {
    match term {
        Expr::Number(n) => n
            .checked_neg()
            .map(Expr::Number)
            .unwrap_or_else(|| Expr::neg(term.clone())),
        Expr::Mul(factors) => {
            let (coefficient, rest) = split_coefficient(factors);
            let Some(positive) = coefficient.checked_neg() else {
                return Expr::neg(term.clone());
            };
            let mut out: Vec<Expr> = Vec::with_capacity(rest.len() + 1);
            if !positive.is_one() {
                out.push(Expr::Number(positive));
            }
            out.extend(rest.into_iter().cloned());
            match out.len() {
                0 => Expr::Number(Rational::ONE),
                1 => out.remove(0),
                _ => Expr::Mul(out),
            }
        }
        _ => Expr::neg(term.clone()),
    }
}

/// Split product factors into numerator and denominator parts.
///
/// Factors of the form `b^(-n)` move to the denominator as `b^n`; a fractional
/// coefficient contributes its numerator and denominator separately.
pub(crate) fn split_fraction(factors: &[Expr]) -> (Rational, Vec<Expr>, Vec<Expr>) {
    let (coefficient, rest) = split_coefficient(factors);
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    if coefficient.denom() != 1 {
        denominator.push(Expr::int(coefficient.denom()));
    }
    for factor in rest {
        match factor {
            Expr::Pow(base, exp) => match exp.as_number() {
                Some(e) if e.is_negative() => match e.checked_neg() {
                    Some(p) if p.is_one() => denominator.push((**base).clone()),
                    Some(p) => denominator.push(Expr::pow((**base).clone(), Expr::Number(p))),
                    None => numerator.push(factor.clone()),
                },
                _ => numerator.push(factor.clone()),
            },
            _ => numerator.push(factor.clone()),
        }
    }
    (Rational::integer(coefficient.numer()), numerator, denominator)
}

/// A parsed LaTeX input: either a bare expression or an equation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicExpression {
    Expression(Expr),
    Equation { lhs: Expr, rhs: Expr },
}

impl SymbolicExpression {
    pub fn is_equation(&self) -> bool {
        matches!(self, SymbolicExpression::Equation { .. })
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match self {
            SymbolicExpression::Expression(expr) => expr.collect_symbols(&mut out),
            SymbolicExpression::Equation { lhs, rhs } => {
                lhs.collect_symbols(&mut out);
                rhs.collect_symbols(&mut out);
            }
        }
        out
    }

    /// Rewrite an equation `lhs = rhs` as the expression `lhs - rhs`, whose
    /// zero set is the solution set. Bare expressions are returned unchanged.
    pub fn to_zero_form(&self) -> Expr {
        match self {
            SymbolicExpression::Expression(expr) => expr.clone(),
            SymbolicExpression::Equation { lhs, rhs } => Expr::sub(lhs.clone(), rhs.clone()),
        }
    }

    /// Apply a fallible transform to every side
    pub fn try_map<E>(&self, mut f: impl FnMut(&Expr) -> Result<Expr, E>) -> Result<Self, E> {
        Ok(match self {
            SymbolicExpression::Expression(expr) => SymbolicExpression::Expression(f(expr)?),
            SymbolicExpression::Equation { lhs, rhs } => SymbolicExpression::Equation {
                lhs: f(lhs)?,
                rhs: f(rhs)?,
            },
        })
    }
}

// Plain-text rendering, e.g. `x^2 + 2*x + 1`

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(_) => 1,
        Expr::Mul(_) => 2,
        Expr::Number(n) if n.is_negative() || !n.is_integer() => 2,
        Expr::Pow(..) => 3,
        _ => 4,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if precedence(expr) < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_product(f: &mut fmt::Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    for (i, factor) in factors.iter().enumerate() {
        if i > 0 {
            f.write_str("*")?;
        }
        write_operand(f, factor, 3)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Constant(Constant::Pi) => f.write_str("pi"),
            Expr::Constant(Constant::E) => f.write_str("e"),
            Expr::Constant(Constant::Infinity) => f.write_str("oo"),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i == 0 {
                        write_operand(f, term, 2)?;
                    } else if is_negative_term(term) {
                        f.write_str(" - ")?;
                        write_operand(f, &negate_term(term), 2)?;
                    } else {
                        f.write_str(" + ")?;
                        write_operand(f, term, 2)?;
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                let (coefficient, numerator, denominator) = split_fraction(factors);
                let mut top = Vec::with_capacity(numerator.len() + 1);
                if coefficient == Rational::MINUS_ONE && !numerator.is_empty() {
                    f.write_str("-")?;
                } else if !coefficient.is_one() || numerator.is_empty() {
                    top.push(Expr::Number(coefficient));
                }
                top.extend(numerator);
                write_product(f, &top)?;
                if !denominator.is_empty() {
                    f.write_str("/")?;
                    if denominator.len() == 1 {
                        write_operand(f, &denominator[0], 3)?;
                    } else {
                        f.write_str("(")?;
                        write_product(f, &denominator)?;
                        f.write_str(")")?;
                    }
                }
                Ok(())
            }
            Expr::Pow(base, exp) => {
                write_operand(f, base, 4)?;
                f.write_str("^")?;
                write_operand(f, exp, 4)
            }
            Expr::Call(Function::Abs, arg) => write!(f, "|{}|", arg),
            Expr::Call(function, arg) => write!(f, "{}({})", function.name(), arg),
        }
    }
}

impl fmt::Display for SymbolicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicExpression::Expression(expr) => write!(f, "{}", expr),
            SymbolicExpression::Equation { lhs, rhs } => write!(f, "{} = {}", lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_free_symbols_of_equation() {
        let eq = SymbolicExpression::Equation {
            lhs: Expr::Add(vec![x(), Expr::symbol("y")]),
            rhs: Expr::call(Function::Sin, Expr::symbol("t")),
        };
        let names: Vec<String> = eq.free_symbols().into_iter().collect();
        assert_eq!(names, vec!["t", "x", "y"]);
    }

    #[test]
    fn test_constants_are_not_free_symbols() {
        let expr = Expr::Mul(vec![Expr::Constant(Constant::Pi), Expr::int(2)]);
        assert!(expr.free_symbols().is_empty());
    }

    #[test]
    fn test_zero_form_subtracts_rhs() {
        let eq = SymbolicExpression::Equation {
            lhs: Expr::pow(x(), Expr::int(2)),
            rhs: Expr::int(4),
        };
        assert_eq!(
            eq.to_zero_form(),
            Expr::Add(vec![
                Expr::pow(x(), Expr::int(2)),
                Expr::Mul(vec![Expr::int(-1), Expr::int(4)]),
            ])
        );
    }

    #[test]
    fn test_display_sum_with_negative_terms() {
        let expr = Expr::Add(vec![
            Expr::pow(x(), Expr::int(2)),
            Expr::Mul(vec![Expr::int(-3), x()]),
            Expr::int(-4),
        ]);
        assert_eq!(expr.to_string(), "x^2 - 3*x - 4");
    }

    #[test]
    fn test_display_fraction_and_function() {
        let expr = Expr::div(Expr::call(Function::Sin, x()), Expr::Add(vec![x(), Expr::int(1)]));
        assert_eq!(expr.to_string(), "sin(x)/(x + 1)");
    }

    #[test]
    fn test_display_equation() {
        let eq = SymbolicExpression::Equation {
            lhs: Expr::pow(x(), Expr::int(2)),
            rhs: Expr::int(4),
        };
        assert_eq!(eq.to_string(), "x^2 = 4");
    }
}
