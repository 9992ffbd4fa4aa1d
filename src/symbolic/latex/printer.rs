use crate::symbolic::expr::{
    is_negative_term, negate_term, split_fraction, Constant, Expr, Function, SymbolicExpression,
};
use crate::symbolic::rational::Rational;

const GREEK_NAMES: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "rho", "varrho", "sigma", "tau",
    "upsilon", "phi", "varphi", "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi",
    "Sigma", "Upsilon", "Phi", "Psi", "Omega",
];

/// Render a parsed expression or equation as LaTeX
pub fn to_latex(expr: &SymbolicExpression) -> String {
    match expr {
        SymbolicExpression::Expression(e) => expr_to_latex(e),
        SymbolicExpression::Equation { lhs, rhs } => {
            format!("{} = {}", expr_to_latex(lhs), expr_to_latex(rhs))
        }
    }
}

pub fn expr_to_latex(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => number(*n),
        Expr::Symbol(name) => symbol(name),
        Expr::Constant(Constant::Pi) => "\\pi".to_string(),
        Expr::Constant(Constant::E) => "e".to_string(),
        Expr::Constant(Constant::Infinity) => "\\infty".to_string(),
        Expr::Add(terms) => {
            let mut out = String::new();
            for (i, term) in terms.iter().enumerate() {
                if i == 0 {
                    out.push_str(&expr_to_latex(term));
                } else if is_negative_term(term) {
                    out.push_str(" - ");
                    out.push_str(&expr_to_latex(&negate_term(term)));
                } else {
                    out.push_str(" + ");
                    out.push_str(&expr_to_latex(term));
                }
            }
            out
        }
        Expr::Mul(factors) => product(factors),
        Expr::Pow(base, exp) => power(base, exp),
        Expr::Call(Function::Abs, arg) => format!("\\left|{}\\right|", expr_to_latex(arg)),
        Expr::Call(function, arg) => {
            format!("{}{{\\left({} \\right)}}", function_name(*function), expr_to_latex(arg))
        }
    }
}

fn number(n: Rational) -> String {
    if n.is_integer() {
        n.numer().to_string()
    } else if n.is_negative() {
        format!("- \\frac{{{}}}{{{}}}", n.numer().unsigned_abs(), n.denom())
    } else {
        format!("\\frac{{{}}}{{{}}}", n.numer(), n.denom())
    }
}

fn symbol(name: &str) -> String {
    let (base, subscript) = match name.split_once('_') {
        Some((base, sub)) => (base, Some(sub)),
        None => (name, None),
    };
    let base = if GREEK_NAMES.contains(&base) {
        format!("\\{}", base)
    } else {
        base.to_string()
    };
    match subscript {
        Some(sub) if GREEK_NAMES.contains(&sub) => format!("{}_{{\\{}}}", base, sub),
        Some(sub) => format!("{}_{{{}}}", base, sub),
        None => base,
    }
}

fn function_name(function: Function) -> &'static str {
    match function {
        Function::Sin => "\\sin",
        Function::Cos => "\\cos",
        Function::Tan => "\\tan",
        Function::Cot => "\\cot",
        Function::Sec => "\\sec",
        Function::Csc => "\\csc",
        Function::Asin => "\\operatorname{asin}",
        Function::Acos => "\\operatorname{acos}",
        Function::Atan => "\\operatorname{atan}",
        Function::Sinh => "\\sinh",
        Function::Cosh => "\\cosh",
        Function::Tanh => "\\tanh",
        Function::Ln => "\\log",
        Function::Abs => "\\operatorname{abs}",
    }
}

fn parenthesize(expr: &Expr) -> String {
    format!("\\left({}\\right)", expr_to_latex(expr))
}

/// Factors of a product, parenthesizing sums and separating numerals
fn factor_list(factors: &[Expr]) -> String {
    let mut out = String::new();
    for (i, factor) in factors.iter().enumerate() {
        if i > 0 {
            let numeral_follows = factor.is_number()
                || matches!(factor, Expr::Pow(base, _) if base.is_number());
            out.push_str(if numeral_follows { " \\cdot " } else { " " });
        }
        match factor {
            Expr::Add(_) => out.push_str(&parenthesize(factor)),
            Expr::Number(n) if n.is_negative() => out.push_str(&parenthesize(factor)),
            _ => out.push_str(&expr_to_latex(factor)),
        }
    }
    out
}

fn product(factors: &[Expr]) -> String {
    let (coefficient, numerator, denominator) = split_fraction(factors);
    if coefficient.is_negative() {
        // i128::MIN has no positive counterpart and is printed signed instead
        if let Some(magnitude) = coefficient.checked_neg() {
            let mut positive: Vec<Expr> = Vec::with_capacity(factors.len());
            positive.push(Expr::Number(magnitude));
            positive.extend(numerator);
            let body = signless_product(Rational::ONE, &positive, &denominator);
            return format!("- {}", body);
        }
    }
    signless_product(coefficient, &numerator, &denominator)
}

/// Numerator or denominator of `\frac`, where the braces already group a lone factor
fn fraction_part(factors: &[Expr]) -> String {
    match factors {
        [single] => expr_to_latex(single),
        _ => factor_list(factors),
    }
}

fn signless_product(coefficient: Rational, numerator: &[Expr], denominator: &[Expr]) -> String {
    let mut top: Vec<Expr> = Vec::with_capacity(numerator.len() + 1);
    if !coefficient.is_one() {
        top.push(Expr::Number(coefficient));
    }
    top.extend(
        numerator
            .iter()
            .filter(|factor| factor.as_number() != Some(Rational::ONE) || numerator.len() == 1)
            .cloned(),
    );
    if top.is_empty() {
        top.push(Expr::int(1));
    }
    if denominator.is_empty() {
        factor_list(&top)
    } else {
        format!(
            "\\frac{{{}}}{{{}}}",
            fraction_part(&top),
            fraction_part(denominator)
        )
    }
}

fn power(base: &Expr, exp: &Expr) -> String {
    if let Some(e) = exp.as_number() {
        if let Some(positive) = e.checked_neg().filter(|_| e.is_negative()) {
            let inner = if positive.is_one() {
                base.clone()
            } else {
                Expr::pow(base.clone(), Expr::Number(positive))
            };
            return format!("\\frac{{1}}{{{}}}", expr_to_latex(&inner));
        }
        if e.numer() == 1 && e.denom() == 2 {
            return format!("\\sqrt{{{}}}", expr_to_latex(base));
        }
        if e.numer() == 1 && e.denom() > 2 {
            return format!("\\sqrt[{}]{{{}}}", e.denom(), expr_to_latex(base));
        }
    }
    let exponent = expr_to_latex(exp);
    match base {
        Expr::Call(function, arg) if *function != Function::Abs => format!(
            "{}^{{{}}}{{\\left({} \\right)}}",
            function_name(*function),
            exponent,
            expr_to_latex(arg)
        ),
        Expr::Add(_) | Expr::Mul(_) | Expr::Pow(..) => {
            format!("{}^{{{}}}", parenthesize(base), exponent)
        }
        Expr::Number(n) if n.is_negative() || !n.is_integer() => {
            format!("{}^{{{}}}", parenthesize(base), exponent)
        }
        _ => format!("{}^{{{}}}", expr_to_latex(base), exponent),
    }
}
