//! Numeric backend for the smooth part of an expression.
//!
//! Sums, products, non-negative integer powers and `sin`/`cos` of the bound
//! variable are handed to RustedSciThe's lambdify. Subtrees that can divide by
//! zero or leave a function's domain are evaluated by [`super::eval`], which
//! reports those failures instead of producing `inf` or `NaN`.

use super::expr::{Constant, Expr, Function};
use super::rational::Rational;
use RustedSciThe::symbolic::symbolic_engine::Expr as KernelExpr;

/// Highest integer exponent emitted to the backend
const MAX_EXPONENT: i128 = 64;

/// Backend source for a compound node over `variable` that the backend can
/// evaluate in full. Leaves and constant subtrees are not worth a lambdify.
pub(crate) fn offloadable(expr: &Expr, variable: &str) -> Option<String> {
    let compound = matches!(
        expr,
        Expr::Add(_) | Expr::Mul(_) | Expr::Pow(..) | Expr::Call(..)
    );
    if !compound || !expr.free_symbols().contains(variable) {
        return None;
    }
    source(expr, variable)
}

/// `expr` in the backend's infix grammar with the variable renamed to `x`,
/// or `None` when some node needs domain checks
pub(crate) fn source(expr: &Expr, variable: &str) -> Option<String> {
    match expr {
        Expr::Number(n) => Some(number(*n)),
        Expr::Symbol(name) if name == variable => Some("x".to_string()),
        Expr::Symbol(_) => None,
        Expr::Constant(Constant::Pi) => Some(std::f64::consts::PI.to_string()),
        Expr::Constant(Constant::E) => Some(std::f64::consts::E.to_string()),
        Expr::Constant(Constant::Infinity) => None,
        Expr::Add(terms) => joined(terms, "+", variable),
        Expr::Mul(factors) => joined(factors, "*", variable),
        Expr::Pow(base, exp) => {
            let n = exp
                .as_number()?
                .to_integer()
                .filter(|n| (0..=MAX_EXPONENT).contains(n))?;
            Some(format!("({})^{}", source(base, variable)?, n))
        }
        Expr::Call(Function::Sin, arg) => Some(format!("sin({})", source(arg, variable)?)),
        Expr::Call(Function::Cos, arg) => Some(format!("cos({})", source(arg, variable)?)),
        Expr::Call(..) => None,
    }
}

fn joined(items: &[Expr], operator: &str, variable: &str) -> Option<String> {
    let parts = items
        .iter()
        .map(|item| source(item, variable).map(|text| format!("({})", text)))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(operator))
}

fn number(n: Rational) -> String {
    let magnitude = if n.is_integer() {
        n.numer().unsigned_abs().to_string()
    } else {
        format!("({}/{})", n.numer().unsigned_abs(), n.denom())
    };
    if n.is_negative() {
        format!("(0-{})", magnitude)
    } else {
        magnitude
    }
}

/// Compile backend source into a plain `f64` function of `x`
pub(crate) fn lambdify(source: &str) -> Box<dyn Fn(f64) -> f64> {
    let f = KernelExpr::parse_expression(source).lambdify1D();
    Box::new(move |x| f(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("t")
    }

    #[test]
    fn test_source_renames_variable() {
        let expr = Expr::Add(vec![
            Expr::call(Function::Sin, x()),
            Expr::Mul(vec![Expr::int(-3), Expr::pow(x(), Expr::int(2))]),
        ]);
        assert_eq!(
            source(&expr, "t").as_deref(),
            Some("(sin(x))+(((0-3))*((x)^2))")
        );
    }

    #[test]
    fn test_domain_sensitive_nodes_are_kept_out() {
        assert_eq!(source(&Expr::call(Function::Ln, x()), "t"), None);
        assert_eq!(source(&Expr::div(Expr::int(1), x()), "t"), None);
        let root = Expr::pow(x(), Expr::Number(Rational::new(1, 2).unwrap()));
        assert_eq!(source(&root, "t"), None);
        assert_eq!(source(&Expr::symbol("y"), "t"), None);
    }

    #[test]
    fn test_trivial_and_constant_nodes_are_not_offloaded() {
        assert_eq!(offloadable(&x(), "t"), None);
        let constant = Expr::Add(vec![Expr::int(1), Expr::Constant(Constant::Pi)]);
        assert_eq!(offloadable(&constant, "t"), None);
        assert!(offloadable(&Expr::pow(x(), Expr::int(3)), "t").is_some());
    }

    #[test]
    fn test_lambdified_values() {
        let expr = Expr::Add(vec![
            Expr::call(Function::Cos, x()),
            Expr::Mul(vec![Expr::Number(Rational::new(1, 2).unwrap()), x()]),
        ]);
        let f = lambdify(&source(&expr, "t").unwrap());
        for t in [-2.0f64, 0.0, 0.7, 3.0] {
            assert!((f(t) - (t.cos() + 0.5 * t)).abs() < 1e-12);
        }
    }
}
