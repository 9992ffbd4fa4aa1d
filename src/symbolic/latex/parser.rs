use super::lexer::{tokenize, Spanned, Token};
use crate::symbolic::expr::{Constant, Expr, Function, SymbolicExpression};
use crate::symbolic::rational::Rational;
use crate::symbolic::ParseError;

const GREEK_LETTERS: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "rho", "varrho", "sigma", "tau",
    "upsilon", "phi", "varphi", "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi",
    "Sigma", "Upsilon", "Phi", "Psi", "Omega",
];

/// Font and text commands whose braced argument names a symbol or operator
const NAME_COMMANDS: &[&str] = &[
    "mathrm",
    "operatorname",
    "mathit",
    "mathbf",
    "mathsf",
    "text",
    "textrm",
    "textit",
];

const FRACTION_COMMANDS: &[&str] = &["frac", "dfrac", "tfrac", "cfrac"];

/// Nesting limit for groups, fractions, function arguments and unary signs
const MAX_DEPTH: usize = 256;

/// Parse a full LaTeX input: an expression, optionally `lhs = rhs`
pub fn parse(input: &str) -> Result<SymbolicExpression, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty expression", 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        abs_depth: 0,
        depth: 0,
        end: input.len(),
    };
    parser.parse_relation()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    abs_depth: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|spanned| spanned.position)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|spanned| spanned.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn descend<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(
                "expression is nested too deeply",
                self.position(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let message = message.into();
        match self.peek() {
            Some(token) => ParseError::new(
                format!("{}, found {}", message, describe(token)),
                self.position(),
            ),
            None => ParseError::new(format!("{}, found end of input", message), self.end),
        }
    }

    fn parse_relation(&mut self) -> Result<SymbolicExpression, ParseError> {
        let lhs = self.parse_expr()?;
        let result = if self.eat(&Token::Equals) {
            let rhs = self.parse_expr()?;
            if self.peek() == Some(&Token::Equals) {
                return Err(ParseError::new(
                    "chained equations are not supported",
                    self.position(),
                ));
            }
            SymbolicExpression::Equation { lhs, rhs }
        } else {
            SymbolicExpression::Expression(lhs)
        };
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(result)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_term()?];
        loop {
            if self.eat(&Token::Plus) {
                terms.push(self.parse_term()?);
            } else if self.eat(&Token::Minus) {
                terms.push(Expr::neg(self.parse_term()?));
            } else {
                break;
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Add(terms)
        })
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut factors = vec![self.parse_factor()?];
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    factors.push(self.parse_factor()?);
                }
                Some(Token::Command(name)) if name == "cdot" || name == "times" => {
                    self.advance();
                    factors.push(self.parse_factor()?);
                }
                Some(Token::Slash) => {
                    self.advance();
                    factors.push(reciprocal(self.parse_factor()?));
                }
                Some(Token::Command(name)) if name == "div" => {
                    self.advance();
                    factors.push(reciprocal(self.parse_factor()?));
                }
                _ if self.starts_implicit_factor() => factors.push(self.parse_postfix()?),
                _ => break,
            }
        }
        Ok(if factors.len() == 1 {
            factors.remove(0)
        } else {
            Expr::Mul(factors)
        })
    }

    /// Whether the next token begins a factor that multiplies by juxtaposition
    fn starts_implicit_factor(&self) -> bool {
        match self.peek() {
            Some(
                Token::Number(_)
                | Token::Letter(_)
                | Token::LParen
                | Token::LBracket
                | Token::LBrace,
            ) => true,
            Some(Token::Pipe) => self.abs_depth == 0,
            Some(Token::Command(name)) => !matches!(name.as_str(), "cdot" | "times" | "div"),
            _ => false,
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        self.descend(Self::read_factor)
    }

    fn read_factor(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::neg(self.parse_factor()?));
        }
        if self.eat(&Token::Plus) {
            return self.parse_factor();
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut base = self.parse_primary()?;
        loop {
            if self.eat(&Token::Caret) {
                let exp = self.parse_script_arg()?;
                base = Expr::pow(base, exp);
            } else if self.peek() == Some(&Token::Bang) {
                return Err(ParseError::new(
                    "factorial is not supported",
                    self.position(),
                ));
            } else {
                return Ok(base);
            }
        }
    }

    /// Argument of `^`, `_` or a bare `\frac` operand: a braced group or a
    /// single token, where a digit run contributes only its first digit.
    fn parse_script_arg(&mut self) -> Result<Expr, ParseError> {
        self.descend(Self::read_script_arg)
    }

    fn read_script_arg(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::LBrace) => self.parse_group(),
            Some(Token::Number(text)) if text.len() > 1 && !text.starts_with('.') => {
                let text = text.clone();
                let (first, rest) = text.split_at(1);
                let position = self.position();
                self.tokens[self.pos] = Spanned {
                    token: Token::Number(rest.to_string()),
                    position: position + 1,
                };
                number(first, position)
            }
            Some(Token::Letter(c)) => {
                let c = *c;
                self.advance();
                Ok(letter(c))
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::neg(self.parse_script_arg()?))
            }
            Some(_) => self.parse_primary(),
            None => Err(self.error("expected a superscript or operand")),
        }
    }

    fn parse_group(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let inner = self.parse_expr()?;
        self.expect(Token::RBrace, "'}'")?;
        Ok(inner)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.descend(Self::read_primary)
    }

    fn read_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(text)) => number(&text, position),
            Some(Token::Letter(c)) => {
                if self.peek() == Some(&Token::Underscore) {
                    let name = self.parse_subscripted(c.to_string())?;
                    Ok(Expr::Symbol(name))
                } else {
                    Ok(letter(c))
                }
            }
            Some(Token::LParen) => self.finish_delimited(Token::RParen, "')'"),
            Some(Token::LBracket) => self.finish_delimited(Token::RBracket, "']'"),
            Some(Token::LBrace) => self.finish_delimited(Token::RBrace, "'}'"),
            Some(Token::Pipe) => {
                self.abs_depth += 1;
                let inner = self.parse_expr();
                self.abs_depth -= 1;
                let inner = inner?;
                self.expect(Token::Pipe, "closing '|'")?;
                Ok(Expr::call(Function::Abs, inner))
            }
            Some(Token::Command(name)) => self.parse_command(&name, position),
            Some(token) => Err(ParseError::new(
                format!("unexpected {}", describe(&token)),
                position,
            )),
            None => Err(ParseError::new("unexpected end of input", self.end)),
        }
    }

    fn finish_delimited(&mut self, close: Token, what: &str) -> Result<Expr, ParseError> {
        // absolute-value bars inside a group belong to that group
        let saved = std::mem::take(&mut self.abs_depth);
        let inner = self.parse_expr();
        self.abs_depth = saved;
        let inner = inner?;
        self.expect(close, what)?;
        Ok(inner)
    }

    /// Read `_x`, `_1` or `_{...}` after a symbol name
    fn parse_subscripted(&mut self, base: String) -> Result<String, ParseError> {
        self.expect(Token::Underscore, "'_'")?;
        let position = self.position();
        let subscript = match self.advance() {
            Some(Token::LBrace) => {
                let mut text = String::new();
                loop {
                    match self.advance() {
                        Some(Token::RBrace) => break,
                        Some(Token::Number(digits)) => text.push_str(&digits),
                        Some(Token::Letter(c)) => text.push(c),
                        Some(Token::Command(name)) if GREEK_LETTERS.contains(&name.as_str()) => {
                            text.push_str(&name)
                        }
                        _ => return Err(ParseError::new("invalid subscript", position)),
                    }
                }
                text
            }
            Some(Token::Number(digits)) => {
                let (first, rest) = digits.split_at(1);
                if !rest.is_empty() {
                    self.pos -= 1;
                    self.tokens[self.pos] = Spanned {
                        token: Token::Number(rest.to_string()),
                        position: position + 1,
                    };
                }
                first.to_string()
            }
            Some(Token::Letter(c)) => c.to_string(),
            Some(Token::Command(name)) if GREEK_LETTERS.contains(&name.as_str()) => name,
            _ => return Err(ParseError::new("invalid subscript", position)),
        };
        if subscript.is_empty() {
            return Err(ParseError::new("empty subscript", position));
        }
        Ok(format!("{}_{}", base, subscript))
    }

    fn parse_command(&mut self, name: &str, position: usize) -> Result<Expr, ParseError> {
        if FRACTION_COMMANDS.contains(&name) {
            let numerator = self.parse_script_arg()?;
            let denominator = self.parse_script_arg()?;
            return Ok(Expr::Mul(vec![numerator, reciprocal(denominator)]));
        }
        if NAME_COMMANDS.contains(&name) {
            let word = self.parse_braced_word()?;
            return self.resolve_word(&word, position);
        }
        if GREEK_LETTERS.contains(&name) {
            if self.peek() == Some(&Token::Underscore) {
                return Ok(Expr::Symbol(self.parse_subscripted(name.to_string())?));
            }
            return Ok(Expr::symbol(name));
        }
        match name {
            "sqrt" => self.parse_sqrt(),
            "pi" => Ok(Expr::Constant(Constant::Pi)),
            "infty" => Ok(Expr::Constant(Constant::Infinity)),
            "exp" => {
                let arg = self.parse_function_argument()?;
                Ok(Expr::pow(Expr::Constant(Constant::E), arg))
            }
            "log" | "lg" => self.parse_logarithm(name == "lg"),
            "cdot" | "times" | "div" => Err(ParseError::new(
                format!("unexpected operator '\\{}'", name),
                position,
            )),
            _ => match Function::from_name(name) {
                Some(function) => self.parse_function(function),
                None => Err(ParseError::new(
                    format!("unsupported command '\\{}'", name),
                    position,
                )),
            },
        }
    }

    fn parse_braced_word(&mut self) -> Result<String, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let position = self.position();
        let mut word = String::new();
        loop {
            match self.advance() {
                Some(Token::RBrace) => break,
                Some(Token::Letter(c)) => word.push(c),
                Some(Token::Number(digits)) => word.push_str(&digits),
                _ => return Err(ParseError::new("expected a plain name", position)),
            }
        }
        Ok(word)
    }

    fn resolve_word(&mut self, word: &str, position: usize) -> Result<Expr, ParseError> {
        if let Some(function) = Function::from_name(word) {
            return self.parse_function(function);
        }
        match word {
            "" => Err(ParseError::new("empty name", position)),
            "e" => Ok(Expr::Constant(Constant::E)),
            "pi" => Ok(Expr::Constant(Constant::Pi)),
            "exp" => self.parse_command("exp", position),
            "log" | "lg" => self.parse_command(word, position),
            w if w.chars().all(|c| c.is_ascii_digit() || c == '.') => number(w, position),
            w => Ok(Expr::symbol(w)),
        }
    }

    fn parse_sqrt(&mut self) -> Result<Expr, ParseError> {
        let index = if self.eat(&Token::LBracket) {
            let index = self.parse_expr()?;
            self.expect(Token::RBracket, "']'")?;
            Some(index)
        } else {
            None
        };
        let radicand = self.parse_script_arg()?;
        let exponent = match index {
            None => Expr::Number(half()),
            Some(Expr::Number(n)) => match n.recip() {
                Some(r) => Expr::Number(r),
                None => return Err(ParseError::new("zeroth root is undefined", self.position())),
            },
            Some(other) => reciprocal(other),
        };
        Ok(Expr::pow(radicand, exponent))
    }

    fn parse_logarithm(&mut self, base_ten: bool) -> Result<Expr, ParseError> {
        let base = if !base_ten && self.eat(&Token::Underscore) {
            Some(self.parse_script_arg()?)
        } else if base_ten {
            Some(Expr::int(10))
        } else {
            None
        };
        let arg = self.parse_function_argument()?;
        let ln = Expr::call(Function::Ln, arg);
        Ok(match base {
            Some(base) => Expr::div(ln, Expr::call(Function::Ln, base)),
            None => ln,
        })
    }

    fn parse_function(&mut self, function: Function) -> Result<Expr, ParseError> {
        let mut function = function;
        let mut power = None;
        if self.eat(&Token::Caret) {
            let exp = self.parse_script_arg()?;
            let is_inverse = matches!(&exp, Expr::Mul(f) if f == &[Expr::int(-1), Expr::int(1)])
                || exp == Expr::int(-1);
            match function.inverse() {
                Some(inverse) if is_inverse => function = inverse,
                _ => power = Some(exp),
            }
        }
        let call = Expr::call(function, self.parse_function_argument()?);
        Ok(match power {
            Some(exp) => Expr::pow(call, exp),
            None => call,
        })
    }

    /// `\sin(x)`, `\sin{x}` or a juxtaposed run such as `\sin 2x`
    fn parse_function_argument(&mut self) -> Result<Expr, ParseError> {
        self.descend(Self::read_function_argument)
    }

    fn read_function_argument(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::LParen | Token::LBracket | Token::LBrace | Token::Pipe) => {
                self.parse_postfix()
            }
            Some(Token::Number(_) | Token::Letter(_)) => {
                let mut factors = vec![self.parse_postfix()?];
                while matches!(self.peek(), Some(Token::Number(_) | Token::Letter(_))) {
                    factors.push(self.parse_postfix()?);
                }
                Ok(if factors.len() == 1 {
                    factors.remove(0)
                } else {
                    Expr::Mul(factors)
                })
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::neg(self.parse_function_argument()?))
            }
            Some(Token::Command(_)) => self.parse_postfix(),
            _ => Err(self.error("expected a function argument")),
        }
    }
}

fn half() -> Rational {
    Rational::new(1, 2).unwrap_or(Rational::ONE)
}

fn reciprocal(expr: Expr) -> Expr {
    Expr::pow(expr, Expr::Number(Rational::MINUS_ONE))
}

fn letter(c: char) -> Expr {
    if c == 'e' {
        Expr::Constant(Constant::E)
    } else {
        Expr::Symbol(c.to_string())
    }
}

fn number(text: &str, position: usize) -> Result<Expr, ParseError> {
    Rational::from_decimal_str(text)
        .map(Expr::Number)
        .ok_or_else(|| ParseError::new(format!("invalid number '{}'", text), position))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(text) => format!("number '{}'", text),
        Token::Letter(c) => format!("'{}'", c),
        Token::Command(name) => format!("'\\{}'", name),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::Underscore => "'_'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::Pipe => "'|'".to_string(),
    }
}
