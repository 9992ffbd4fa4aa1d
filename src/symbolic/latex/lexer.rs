use crate::symbolic::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(String),
    Letter(char),
    /// A `\name` command, stored without the backslash
    Command(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Underscore,
    Equals,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Commands that only affect layout and carry no mathematical meaning
const LAYOUT_COMMANDS: &[&str] = &[
    "left",
    "right",
    "big",
    "Big",
    "bigg",
    "Bigg",
    "bigl",
    "bigr",
    "Bigl",
    "Bigr",
    "biggl",
    "biggr",
    "displaystyle",
    "textstyle",
    "scriptstyle",
    "quad",
    "qquad",
    "limits",
    "nolimits",
];

/// Split a LaTeX string into tokens, dropping spacing and sizing commands
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '0'..='9' | '.' => {
                let mut text = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        text.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if text == "." {
                    return Err(ParseError::new("unexpected '.'", position));
                }
                Token::Number(text)
            }
            c if c.is_ascii_alphabetic() => Token::Letter(c),
            '\\' => {
                let mut name = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphabetic() {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    match chars.next() {
                        // thin/medium/thick/negative spaces and control space
                        Some((_, ',' | ';' | ':' | '!' | ' ' | '>')) => continue,
                        Some((_, '{')) => Token::LParen,
                        Some((_, '}')) => Token::RParen,
                        Some((_, '|')) => Token::Pipe,
                        Some((_, other)) => {
                            return Err(ParseError::new(
                                format!("unsupported escape '\\{}'", other),
                                position,
                            ))
                        }
                        None => return Err(ParseError::new("dangling backslash", position)),
                    }
                } else if LAYOUT_COMMANDS.contains(&name.as_str()) {
                    // `\left.` and `\right.` are invisible delimiters
                    if (name == "left" || name == "right")
                        && matches!(chars.peek(), Some(&(_, '.')))
                    {
                        chars.next();
                    }
                    continue;
                } else {
                    Token::Command(name)
                }
            }
            '+' => Token::Plus,
            '-' | '\u{2212}' | '\u{2013}' => Token::Minus,
            '*' | '\u{00B7}' | '\u{22C5}' | '\u{00D7}' => Token::Star,
            '/' | '\u{00F7}' => Token::Slash,
            '^' => Token::Caret,
            '_' => Token::Underscore,
            '=' => Token::Equals,
            '!' => Token::Bang,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '|' => Token::Pipe,
            '\u{03C0}' => Token::Command("pi".to_string()),
            '\u{221E}' => Token::Command("infty".to_string()),
            '\u{00B2}' | '\u{00B3}' => {
                tokens.push(Spanned {
                    token: Token::Caret,
                    position,
                });
                let digit = if c == '\u{00B2}' { "2" } else { "3" };
                Token::Number(digit.to_string())
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", other),
                    position,
                ))
            }
        };
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn test_tokenizes_polynomial() {
        assert_eq!(
            kinds("x^2+2x"),
            vec![
                Token::Letter('x'),
                Token::Caret,
                Token::Number("2".into()),
                Token::Plus,
                Token::Number("2".into()),
                Token::Letter('x'),
            ]
        );
    }

    #[test]
    fn test_skips_spacing_and_sizing_commands() {
        assert_eq!(
            kinds("\\left( a \\, b \\right)"),
            vec![
                Token::LParen,
                Token::Letter('a'),
                Token::Letter('b'),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_invisible_delimiter_is_dropped() {
        assert_eq!(kinds("\\left. x \\right|"), vec![Token::Letter('x'), Token::Pipe]);
    }

    #[test]
    fn test_commands_and_decimals() {
        assert_eq!(
            kinds("\\frac{3.5}{\\pi}"),
            vec![
                Token::Command("frac".into()),
                Token::LBrace,
                Token::Number("3.5".into()),
                Token::RBrace,
                Token::LBrace,
                Token::Command("pi".into()),
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_unicode_operators_are_normalized() {
        assert_eq!(
            kinds("2\u{00D7}x\u{2212}1"),
            vec![
                Token::Number("2".into()),
                Token::Star,
                Token::Letter('x'),
                Token::Minus,
                Token::Number("1".into()),
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_character() {
        let err = tokenize("x < 2").unwrap_err();
        assert_eq!(err.position, 2);
    }
}
