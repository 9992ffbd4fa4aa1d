//! Numeric evaluation of expression trees.
//!
//! An [`Expr`] is compiled once into a tree of boxed closures over a single
//! variable. Smooth subtrees run on the lambdified backend in [`super::kernel`];
//! the remaining operations check their real-valued domain on every call.

use super::expr::{Constant, Expr, Function};
use super::kernel;
use super::rational::Rational;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("{function} is undefined for {value}")]
    Domain { function: &'static str, value: f64 },

    #[error("result is not a finite number")]
    NonFinite,

    #[error("symbol '{0}' has no value")]
    UnboundSymbol(String),

    #[error("{0} cannot be evaluated numerically")]
    Unsupported(&'static str),

    #[error("at x = {x}: {source}")]
    AtSample {
        x: f64,
        #[source]
        source: Box<EvaluationError>,
    },

    #[error("no sample in [{min}, {max}] has a finite value")]
    NoFiniteSamples { min: f64, max: f64 },
}

type Eval = Box<dyn Fn(f64) -> Result<f64, EvaluationError>>;

/// A numeric function of one variable compiled from an expression
pub struct CompiledFunction {
    variable: Option<String>,
    eval: Eval,
}

impl std::fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("variable", &self.variable)
            .finish_non_exhaustive()
    }
}

impl CompiledFunction {
    /// Compile `expr` as a function of `variable`. Any other free symbol makes
    /// the function impossible to construct.
    pub fn new(expr: &Expr, variable: &str) -> Result<Self, EvaluationError> {
        Ok(Self {
            variable: Some(variable.to_string()),
            eval: compile(expr, Some(variable))?,
        })
    }

    /// Compile an expression without free symbols
    pub fn constant(expr: &Expr) -> Result<Self, EvaluationError> {
        Ok(Self {
            variable: None,
            eval: compile(expr, None)?,
        })
    }

    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    pub fn call(&self, x: f64) -> Result<f64, EvaluationError> {
        let y = (self.eval)(x)?;
        if y.is_finite() {
            Ok(y)
        } else {
            Err(EvaluationError::NonFinite)
        }
    }
}

/// Evaluate an expression that has no free symbols
pub fn evaluate_constant(expr: &Expr) -> Result<f64, EvaluationError> {
    CompiledFunction::constant(expr)?.call(0.0)
}

fn compile(expr: &Expr, variable: Option<&str>) -> Result<Eval, EvaluationError> {
    if let Some(source) = variable.and_then(|v| kernel::offloadable(expr, v)) {
        let f = kernel::lambdify(&source);
        return Ok(Box::new(move |x| Ok(f(x))));
    }
    let eval: Eval = match expr {
        Expr::Number(n) => {
            let value = n.to_f64();
            Box::new(move |_| Ok(value))
        }
        Expr::Symbol(name) => {
            if Some(name.as_str()) != variable {
                return Err(EvaluationError::UnboundSymbol(name.clone()));
            }
            Box::new(|x| Ok(x))
        }
        Expr::Constant(Constant::Pi) => Box::new(|_| Ok(std::f64::consts::PI)),
        Expr::Constant(Constant::E) => Box::new(|_| Ok(std::f64::consts::E)),
        Expr::Constant(Constant::Infinity) => return Err(EvaluationError::Unsupported("infinity")),
        Expr::Add(terms) => {
            let terms = compile_all(terms, variable)?;
            Box::new(move |x| {
                terms
                    .iter()
                    .try_fold(0.0, |acc, term| Ok::<f64, EvaluationError>(acc + term(x)?))
            })
        }
        Expr::Mul(factors) => {
            let factors = compile_all(factors, variable)?;
            Box::new(move |x| {
                factors
                    .iter()
                    .try_fold(1.0, |acc, factor| Ok::<f64, EvaluationError>(acc * factor(x)?))
            })
        }
        Expr::Pow(base, exp) => compile_pow(base, exp, variable)?,
        Expr::Call(function, arg) => {
            let function = *function;
            let arg = compile(arg, variable)?;
            Box::new(move |x| apply(function, arg(x)?))
        }
    };
    Ok(eval)
}

fn compile_all(items: &[Expr], variable: Option<&str>) -> Result<Vec<Eval>, EvaluationError> {
    items.iter().map(|item| compile(item, variable)).collect()
}

fn compile_pow(base: &Expr, exp: &Expr, variable: Option<&str>) -> Result<Eval, EvaluationError> {
    let base = compile(base, variable)?;
    if let Some(e) = exp.as_number() {
        if let Some(n) = e.to_integer().and_then(|n| i32::try_from(n).ok()) {
            return Ok(Box::new(move |x| {
                let b = base(x)?;
                if b == 0.0 && n < 0 {
                    return Err(EvaluationError::DivisionByZero);
                }
                Ok(b.powi(n))
            }));
        }
        return Ok(Box::new(move |x| rational_power(base(x)?, e)));
    }
    let exp = compile(exp, variable)?;
    Ok(Box::new(move |x| {
        let b = base(x)?;
        let e = exp(x)?;
        if b == 0.0 && e < 0.0 {
            return Err(EvaluationError::DivisionByZero);
        }
        if b < 0.0 && e.fract() != 0.0 {
            return Err(EvaluationError::Domain {
                function: "power",
                value: b,
            });
        }
        Ok(b.powf(e))
    }))
}

/// Real-valued `b^(p/q)`; negative bases have a real value only for odd `q`
fn rational_power(b: f64, e: Rational) -> Result<f64, EvaluationError> {
    let value = e.to_f64();
    if b == 0.0 && value < 0.0 {
        return Err(EvaluationError::DivisionByZero);
    }
    if b >= 0.0 {
        return Ok(b.powf(value));
    }
    if e.denom() % 2 == 0 {
        return Err(EvaluationError::Domain {
            function: "root",
            value: b,
        });
    }
    let magnitude = (-b).powf(value);
    Ok(if e.numer() % 2 == 0 {
        magnitude
    } else {
        -magnitude
    })
}

fn apply(function: Function, v: f64) -> Result<f64, EvaluationError> {
    let domain = |name: &'static str| EvaluationError::Domain {
        function: name,
        value: v,
    };
    Ok(match function {
        Function::Sin => v.sin(),
        Function::Cos => v.cos(),
        Function::Tan => v.tan(),
        Function::Cot => reciprocal(v.tan())?,
        Function::Sec => reciprocal(v.cos())?,
        Function::Csc => reciprocal(v.sin())?,
        Function::Asin if (-1.0..=1.0).contains(&v) => v.asin(),
        Function::Acos if (-1.0..=1.0).contains(&v) => v.acos(),
        Function::Asin => return Err(domain("asin")),
        Function::Acos => return Err(domain("acos")),
        Function::Atan => v.atan(),
        Function::Sinh => v.sinh(),
        Function::Cosh => v.cosh(),
        Function::Tanh => v.tanh(),
        Function::Ln if v > 0.0 => v.ln(),
        Function::Ln => return Err(domain("ln")),
        Function::Abs => v.abs(),
    })
}

fn reciprocal(v: f64) -> Result<f64, EvaluationError> {
    if v == 0.0 {
        Err(EvaluationError::DivisionByZero)
    } else {
        Ok(1.0 / v)
    }
}
