//! Tokenizer for the restricted path grammar.

use crate::{ParseError, ParseResult};

/// Tokens of the restricted path grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Integer(i64),
    Decimal(f64),
    String(String),
    Boolean(bool),
    Dot,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Equal,
    NotEqual,
    Percent,
}

impl Token {
    /// Short human-readable description, used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Identifier(name) => format!("identifier '{name}'"),
            Self::Integer(i) => format!("integer {i}"),
            Self::Decimal(d) => format!("decimal {d}"),
            Self::String(s) => format!("string '{s}'"),
            Self::Boolean(b) => format!("boolean {b}"),
            Self::Dot => "'.'".to_string(),
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
            Self::LeftBracket => "'['".to_string(),
            Self::RightBracket => "']'".to_string(),
            Self::Equal => "'='".to_string(),
            Self::NotEqual => "'!='".to_string(),
            Self::Percent => "'%'".to_string(),
        }
    }
}

/// A token together with its byte offset in the source expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split an expression into tokens.
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = input[pos..].chars().next().unwrap_or('\0');

        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }

        let start = pos;
        let token = match ch {
            '.' => {
                pos += 1;
                Token::Dot
            }
            '(' => {
                pos += 1;
                Token::LeftParen
            }
            ')' => {
                pos += 1;
                Token::RightParen
            }
            '[' => {
                pos += 1;
                Token::LeftBracket
            }
            ']' => {
                pos += 1;
                Token::RightBracket
            }
            '=' => {
                pos += 1;
                Token::Equal
            }
            '%' => {
                pos += 1;
                Token::Percent
            }
            '!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    Token::NotEqual
                } else {
                    return Err(ParseError::UnexpectedChar { ch, offset: pos });
                }
            }
            '\'' => {
                pos += 1;
                let (literal, next) = read_string(input, pos, start)?;
                pos = next;
                Token::String(literal)
            }
            c if c.is_ascii_digit() => {
                let (token, next) = read_number(input, pos)?;
                pos = next;
                token
            }
            c if is_identifier_start(c) => {
                let (name, next) = read_identifier(input, pos);
                pos = next;
                match name.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Identifier(name),
                }
            }
            _ => return Err(ParseError::UnexpectedChar { ch, offset: pos }),
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    Ok(tokens)
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn read_identifier(input: &str, start: usize) -> (String, usize) {
    let mut end = start;
    for (i, c) in input[start..].char_indices() {
        if i == 0 || is_identifier_continue(c) {
            end = start + i + c.len_utf8();
        } else {
            break;
        }
    }
    (input[start..end].to_string(), end)
}

fn read_number(input: &str, start: usize) -> ParseResult<(Token, usize)> {
    let mut end = start;
    let mut seen_dot = false;
    let mut chars = input[start..].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_ascii_digit() {
            end = start + i + 1;
        } else if c == '.' && !seen_dot {
            // Only part of the number when a digit follows; otherwise it is
            // a path separator as in `1.first()`.
            match chars.peek() {
                Some((_, next)) if next.is_ascii_digit() => {
                    seen_dot = true;
                    end = start + i + 1;
                }
                _ => break,
            }
        } else {
            break;
        }
    }

    let text = &input[start..end];
    let token = if seen_dot {
        text.parse::<f64>()
            .map(Token::Decimal)
            .map_err(|_| ParseError::InvalidNumber {
                text: text.to_string(),
                offset: start,
            })?
    } else {
        text.parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| ParseError::InvalidNumber {
                text: text.to_string(),
                offset: start,
            })?
    };

    Ok((token, end))
}

/// Read a single-quoted string starting just after the opening quote.
/// A doubled quote (`''`) escapes a literal quote, as in FHIRPath.
fn read_string(input: &str, start: usize, quote_offset: usize) -> ParseResult<(String, usize)> {
    let mut value = String::new();
    let mut pos = start;

    while pos < input.len() {
        let c = input[pos..].chars().next().unwrap_or('\0');
        if c == '\'' {
            if input[pos + 1..].starts_with('\'') {
                value.push('\'');
                pos += 2;
            } else {
                return Ok((value, pos + 1));
            }
        } else {
            value.push(c);
            pos += c.len_utf8();
        }
    }

    Err(ParseError::UnterminatedString {
        offset: quote_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn tokenizes_simple_path() {
        assert_eq!(
            tokens("name.given"),
            vec![
                Token::Identifier("name".into()),
                Token::Dot,
                Token::Identifier("given".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_function_call_and_index() {
        assert_eq!(
            tokens("name[0].given.first()"),
            vec![
                Token::Identifier("name".into()),
                Token::LeftBracket,
                Token::Integer(0),
                Token::RightBracket,
                Token::Dot,
                Token::Identifier("given".into()),
                Token::Dot,
                Token::Identifier("first".into()),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn tokenizes_comparison() {
        assert_eq!(
            tokens("active = true"),
            vec![
                Token::Identifier("active".into()),
                Token::Equal,
                Token::Boolean(true),
            ]
        );
        assert_eq!(
            tokens("gender != 'male'"),
            vec![
                Token::Identifier("gender".into()),
                Token::NotEqual,
                Token::String("male".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_constant_reference() {
        assert_eq!(
            tokens("status = %statusFilter"),
            vec![
                Token::Identifier("status".into()),
                Token::Equal,
                Token::Percent,
                Token::Identifier("statusFilter".into()),
            ]
        );
    }

    #[test]
    fn escaped_quote_in_string() {
        assert_eq!(
            tokens("name = 'O''Brien'"),
            vec![
                Token::Identifier("name".into()),
                Token::Equal,
                Token::String("O'Brien".into()),
            ]
        );
    }

    #[test]
    fn decimal_literal() {
        assert_eq!(tokens("value = 1.5"), vec![
            Token::Identifier("value".into()),
            Token::Equal,
            Token::Decimal(1.5),
        ]);
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(matches!(
            tokenize("name & family"),
            Err(ParseError::UnexpectedChar { ch: '&', .. })
        ));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(matches!(
            tokenize("name = 'oops"),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn lone_bang_is_rejected() {
        assert!(matches!(
            tokenize("a ! b"),
            Err(ParseError::UnexpectedChar { ch: '!', .. })
        ));
    }
}
