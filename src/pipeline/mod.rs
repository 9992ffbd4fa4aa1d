//! Expression pipeline: from a recognized LaTeX string to every derived form.
//!
//! Each stage reports its own outcome. A parse failure leaves the rendered
//! form intact, and a plot that fails or is skipped leaves the simplified
//! form intact.

pub mod plot;

pub use crate::recognition::extract_text;
pub use plot::{PlotPoint, PlotSeries, PlotSettings, SamplePolicy};

use crate::symbolic::latex::to_latex;
use crate::symbolic::simplify::{canonicalize, simplify};
use crate::symbolic::{
    CompiledFunction, EvaluationError, LatexParser, ParseError, SymbolicError, SymbolicExpression,
    SymbolicParser,
};
use serde::Serialize;
use std::sync::Arc;

/// The untransformed LaTeX, for direct display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedForm {
    pub latex: String,
}

/// A simplified expression as LaTeX and as plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimplifiedForm {
    pub latex: String,
    pub text: String,
}

/// Summary of a parsed expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolicForm {
    pub text: String,
    pub is_equation: bool,
    pub free_variables: Vec<String>,
}

impl From<&SymbolicExpression> for SymbolicForm {
    fn from(expr: &SymbolicExpression) -> Self {
        Self {
            text: expr.to_string(),
            is_equation: expr.is_equation(),
            free_variables: expr.free_symbols().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    Plotted(PlotSeries),
    /// Not exactly one free variable; not an error
    Skipped { free_variables: Vec<String> },
    Failed(SymbolicError),
}

/// Outcome of every stage for one LaTeX string
#[derive(Debug, Clone)]
pub struct ExpressionReport {
    pub rendered: RenderedForm,
    pub symbolic: Result<SymbolicForm, ParseError>,
    pub simplified: Result<SimplifiedForm, SymbolicError>,
    pub plot: PlotOutcome,
}

pub struct ExpressionPipeline {
    parser: Arc<dyn SymbolicParser>,
    settings: PlotSettings,
}

impl Default for ExpressionPipeline {
    fn default() -> Self {
        Self::new(Arc::new(LatexParser), PlotSettings::default())
    }
}

impl ExpressionPipeline {
    pub fn new(parser: Arc<dyn SymbolicParser>, settings: PlotSettings) -> Self {
        Self { parser, settings }
    }

    pub fn with_settings(settings: PlotSettings) -> Self {
        Self::new(Arc::new(LatexParser), settings)
    }

    pub fn settings(&self) -> &PlotSettings {
        &self.settings
    }

    pub fn render(&self, latex: &str) -> RenderedForm {
        RenderedForm {
            latex: latex.to_string(),
        }
    }

    pub fn parse_symbolic(&self, latex: &str) -> Result<SymbolicExpression, ParseError> {
        self.parser.parse(latex)
    }

    pub fn simplify(&self, latex: &str) -> Result<SimplifiedForm, SymbolicError> {
        let expr = self.parse_symbolic(latex)?;
        Ok(self.simplify_parsed(&expr)?)
    }

    /// Simplify an already parsed expression; equations side by side
    pub fn simplify_parsed(
        &self,
        expr: &SymbolicExpression,
    ) -> Result<SimplifiedForm, EvaluationError> {
        let simplified = expr.try_map(simplify)?;
        Ok(SimplifiedForm {
            latex: to_latex(&simplified),
            text: simplified.to_string(),
        })
    }

    /// Sample a single-variable expression. Equations are plotted as
    /// `lhs - rhs`, whose zeros are the solutions.
    pub fn plot(&self, expr: &SymbolicExpression) -> PlotOutcome {
        let zero_form = match canonicalize(&expr.to_zero_form()) {
            Ok(e) => e,
            Err(e) => return PlotOutcome::Failed(e.into()),
        };
        let variables = zero_form.free_symbols();
        let mut names = variables.iter();
        let (Some(variable), None) = (names.next(), names.next()) else {
            return PlotOutcome::Skipped {
                free_variables: variables.into_iter().collect(),
            };
        };

        let sampled = CompiledFunction::new(&zero_form, variable)
            .and_then(|f| plot::sample(&f, variable, &self.settings));
        match sampled {
            Ok(series) => PlotOutcome::Plotted(series),
            Err(e) => PlotOutcome::Failed(e.into()),
        }
    }

    /// Run every stage, parsing once
    pub fn run(&self, latex: &str) -> ExpressionReport {
        let rendered = self.render(latex);
        let parsed = self.parse_symbolic(latex);

        let (symbolic, simplified, plot) = match &parsed {
            Ok(expr) => (
                Ok(SymbolicForm::from(expr)),
                self.simplify_parsed(expr).map_err(SymbolicError::from),
                self.plot(expr),
            ),
            Err(e) => (
                Err(e.clone()),
                Err(SymbolicError::from(e.clone())),
                PlotOutcome::Failed(SymbolicError::from(e.clone())),
            ),
        };

        match &simplified {
            Ok(form) => tracing::debug!("Simplified {:?} to {:?}", latex, form.latex),
            Err(e) => tracing::warn!("Could not simplify {:?}: {}", latex, e),
        }
        match &plot {
            PlotOutcome::Plotted(series) => tracing::debug!(
                "Plotted {:?} over {} samples, {} skipped",
                latex,
                series.points.len(),
                series.skipped()
            ),
            PlotOutcome::Skipped { free_variables } => {
                tracing::debug!("Not plotting {:?}: free variables {:?}", latex, free_variables)
            }
            PlotOutcome::Failed(e) => tracing::warn!("Could not plot {:?}: {}", latex, e),
        }

        ExpressionReport {
            rendered,
            symbolic,
            simplified,
            plot,
        }
    }
}
