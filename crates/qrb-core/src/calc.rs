//! Inline calculator: a routing heuristic plus a safe arithmetic evaluator.
//!
//! Incoming chat text is first run through [`looks_like_math`], a cheap
//! syntactic pre-filter. Text that passes is normalized and evaluated by a
//! small recursive-descent parser restricted to numeric literals, the seven
//! arithmetic binary operators (`+ - * / % ** //`), unary `+`/`-` and
//! parentheses. Anything else fails closed: identifiers, calls, commas and
//! unknown characters are rejected, never evaluated, so untrusted input has
//! no code-execution path.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

// ============== Errors ==============

/// Why an expression-like message could not be evaluated.
///
/// A classification reject is not an error; [`calculate`] returns `None` for
/// text that never looked like math in the first place.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

// ============== Classifier ==============

static MATH_TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn math_token_re() -> &'static Regex {
    MATH_TOKEN_RE.get_or_init(|| Regex::new(r"^[\s\d.+\-*/%()xX×÷,^]+$").expect("valid regex"))
}

const OPERATOR_GLYPHS: [char; 10] = ['+', '-', '*', '×', 'x', 'X', '/', '÷', '%', '^'];

/// Heuristic: text contains only math tokens and at least one operator.
///
/// A bare number is not routed to the evaluator. A bare `x`/`X` passes here
/// and is rejected by the parser; the classifier deliberately does not check
/// structure.
pub fn looks_like_math(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    if !math_token_re().is_match(text) {
        return false;
    }
    text.chars().any(|c| OPERATOR_GLYPHS.contains(&c))
}

// ============== Normalization ==============

/// Substitute unicode operator variants and convenience spellings with the
/// operators the parser understands: `×`→`*`, `÷`→`/`, dash variants→`-`,
/// `^`→`**`, `x`/`X`→`*`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '×' | 'x' | 'X' => out.push('*'),
            '÷' => out.push('/'),
            '–' | '—' | '−' => out.push('-'),
            '^' => out.push_str("**"),
            other => out.push(other),
        }
    }
    out
}

// ============== Expression tree ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    FloorDiv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnaryOp {
    Plus,
    Minus,
}

/// Restricted expression tree. No other node kind exists, so nothing else
/// can ever be evaluated.
#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Num(f64),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

// ============== Lexer ==============

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    DoubleStar,
    DoubleSlash,
    OpenParen,
    CloseParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(v) => write!(f, "`{v}`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::Slash => write!(f, "`/`"),
            Token::Percent => write!(f, "`%`"),
            Token::DoubleStar => write!(f, "`**`"),
            Token::DoubleSlash => write!(f, "`//`"),
            Token::OpenParen => write!(f, "`(`"),
            Token::CloseParen => write!(f, "`)`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::OpenParen),
            ')' => tokens.push(Token::CloseParen),
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '%' => tokens.push(Token::Percent),
            '*' => {
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                if matches!(chars.peek(), Some(&(_, '/'))) {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '0'..='9' | '.' => {
                let mut end = start + ch.len_utf8();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[start..end];
                let num = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::Syntax(format!("invalid number `{literal}`")))?;
                tokens.push(Token::Num(num));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, c2)) = chars.peek() {
                    if c2.is_alphanumeric() || c2 == '_' {
                        end = i + c2.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                return Err(CalcError::Unsupported(format!(
                    "identifier `{}`",
                    &input[start..end]
                )));
            }
            ',' => {
                return Err(CalcError::Unsupported("tuple expression".to_string()));
            }
            other => {
                return Err(CalcError::Syntax(format!("unexpected character `{other}`")));
            }
        }
    }

    Ok(tokens)
}

// ============== Parser ==============

// Grammar (tightest binding last):
//   expr  := term  (('+' | '-') term)*
//   term  := power (('*' | '/' | '%' | '//') power)*
//   power := unary ('**' power)?          -- right-associative
//   unary := ('+' | '-') unary | atom
//   atom  := number | '(' expr ')'

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                Some(Token::DoubleSlash) => BinOp::FloorDiv,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.power()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn power(&mut self) -> Result<Expr, CalcError> {
        let base = self.unary()?;
        if matches!(self.peek(), Some(Token::DoubleStar)) {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(Expr::Binary(
                BinOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, CalcError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Plus, Box::new(self.unary()?)))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Minus, Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Expr, CalcError> {
        match self.bump() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::OpenParen) => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token::CloseParen) => Ok(inner),
                    _ => Err(CalcError::Syntax("missing closing parenthesis".to_string())),
                }
            }
            Some(tok) => Err(CalcError::Syntax(format!("unexpected token {tok}"))),
            None => Err(CalcError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

fn parse(input: &str) -> Result<Expr, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CalcError::Syntax(format!("unexpected token {tok}")));
    }
    Ok(expr)
}

// ============== Evaluation ==============

fn eval(expr: &Expr) -> Result<f64, CalcError> {
    match expr {
        Expr::Num(v) => Ok(*v),
        Expr::Unary(op, inner) => {
            let v = eval(inner)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            })
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs)?;
            let r = eval(rhs)?;
            match op {
                BinOp::Add => Ok(l + r),
                BinOp::Sub => Ok(l - r),
                BinOp::Mul => Ok(l * r),
                BinOp::Pow => Ok(l.powf(r)),
                BinOp::Div | BinOp::Mod | BinOp::FloorDiv if r == 0.0 => {
                    Err(CalcError::DivisionByZero)
                }
                BinOp::Div => Ok(l / r),
                // Remainder with the sign of the divisor, like the floor
                // division it pairs with.
                BinOp::Mod => Ok(l - r * (l / r).floor()),
                BinOp::FloorDiv => Ok((l / r).floor()),
            }
        }
    }
}

/// Normalize, parse and evaluate one expression.
///
/// Stateless and deterministic: the same input always yields the same value
/// or the same error.
pub fn evaluate(text: &str) -> Result<f64, CalcError> {
    let normalized = normalize(text);
    let expr = parse(&normalized)?;
    let value = eval(&expr)?;
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

// ============== Result formatting ==============

/// Render a result: whole numbers as integers, everything else rounded to
/// 5 decimal places. Presentation only, never fed back into computation.
pub fn format_value(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let rounded = (value * 1e5).round() / 1e5;
    if rounded == rounded.trunc() {
        // Non-integral values that round to a whole number keep one
        // decimal digit, so `2.0000001` shows as `2.0` rather than `2`.
        return format!("{rounded:.1}");
    }
    format!("{rounded}")
}

/// Full text path: classify, then evaluate and format.
///
/// Returns `None` when the text is not expression-like (the caller falls
/// back to other message handling), `Some(Ok("<expr> = <value>"))` on
/// success and `Some(Err(_))` when expression-like input fails to evaluate.
pub fn calculate(text: &str) -> Option<Result<String, CalcError>> {
    let trimmed = text.trim();
    if !looks_like_math(trimmed) {
        return None;
    }
    Some(evaluate(trimmed).map(|v| format!("{trimmed} = {}", format_value(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> f64 {
        evaluate(text).unwrap_or_else(|e| panic!("`{text}` failed: {e}"))
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(value("2+2"), 4.0);
        assert_eq!(value("5*10"), 50.0);
        assert_eq!(value("100 - 25 * 2"), 50.0);
        assert_eq!(value("12*(3+4)/2"), 42.0);
        assert_eq!(value("(10+5)*2"), 30.0);
        assert_eq!(value("10 / 4"), 2.5);
    }

    #[test]
    fn caret_and_double_star_are_power() {
        assert_eq!(value("5^3"), 125.0);
        assert_eq!(value("2**8"), 256.0);
        assert_eq!(value("2^-3"), 0.125);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(value("2**3**2"), 512.0);
    }

    #[test]
    fn unary_binds_tighter_than_power() {
        assert_eq!(value("-2**2"), 4.0);
        assert_eq!(value("2**-3"), 0.125);
    }

    #[test]
    fn unicode_operators_normalize() {
        assert_eq!(value("10 ÷ 4"), 2.5);
        assert_eq!(value("6 × 7"), 42.0);
        assert_eq!(value("7 − 2"), 5.0);
        assert_eq!(value("7 – 2"), 5.0);
        assert_eq!(value("3x4"), 12.0);
        assert_eq!(value("3X4"), 12.0);
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(value("17 % 5"), 2.0);
        assert_eq!(value("-7 % 3"), 2.0);
        assert_eq!(value("7 % -3"), -2.0);
    }

    #[test]
    fn floor_division_floors() {
        assert_eq!(value("20 // 3"), 6.0);
        assert_eq!(value("-7 // 2"), -4.0);
    }

    #[test]
    fn unary_signs() {
        assert_eq!(value("-5 + 10"), 5.0);
        assert_eq!(value("--5"), 5.0);
        assert_eq!(value("+3 * 2"), 6.0);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(evaluate("10/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 // 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn overflowing_power_is_an_error_not_infinity() {
        assert_eq!(evaluate("10**1000"), Err(CalcError::NonFinite));
    }

    #[test]
    fn malformed_input_is_a_syntax_error() {
        assert!(matches!(evaluate("2 +"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("(1+2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate(")"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("1..2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate(""), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("1 2"), Err(CalcError::Syntax(_))));
    }

    #[test]
    fn identifiers_and_calls_are_unsupported() {
        assert!(matches!(evaluate("foo(1)"), Err(CalcError::Unsupported(_))));
        assert!(matches!(evaluate("a + 1"), Err(CalcError::Unsupported(_))));
        assert!(matches!(evaluate("__x__"), Err(CalcError::Unsupported(_))));
    }

    #[test]
    fn tuples_are_unsupported() {
        assert!(matches!(evaluate("1, 2"), Err(CalcError::Unsupported(_))));
        assert!(matches!(
            evaluate("(1+2, 3)"),
            Err(CalcError::Unsupported(_))
        ));
    }

    #[test]
    fn injection_payloads_never_evaluate() {
        // Quotes and brackets fail the classifier; even fed straight to the
        // evaluator they are rejected before anything runs.
        let payload = "__import__('os').system('x')";
        assert!(!looks_like_math(payload));
        assert!(evaluate(payload).is_err());
    }

    #[test]
    fn classifier_accepts_expressions() {
        assert!(looks_like_math("2+2"));
        assert!(looks_like_math("10 ÷ 4"));
        assert!(looks_like_math("12*(3+4)/2"));
        assert!(looks_like_math("3.14 * 2"));
    }

    #[test]
    fn classifier_rejects_plain_text_and_bare_numbers() {
        assert!(!looks_like_math(""));
        assert!(!looks_like_math("   "));
        assert!(!looks_like_math("hello world"));
        assert!(!looks_like_math("2+2; drop table"));
        assert!(!looks_like_math("[1]"));
        assert!(!looks_like_math("123"));
        assert!(!looks_like_math("(123)"));
    }

    #[test]
    fn bare_x_passes_classifier_but_fails_parse() {
        assert!(looks_like_math("x"));
        assert!(matches!(calculate("x"), Some(Err(CalcError::Syntax(_)))));
    }

    #[test]
    fn evaluation_is_deterministic() {
        assert_eq!(evaluate("12*(3+4)/2"), evaluate("12*(3+4)/2"));
        assert_eq!(evaluate("10/0"), evaluate("10/0"));
    }

    #[test]
    fn whole_results_render_as_integers() {
        assert_eq!(format_value(4.0), "4");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(125.0), "125");
    }

    #[test]
    fn fractional_results_round_to_five_decimals() {
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(6.28), "6.28");
        assert_eq!(format_value(10.0 / 3.0), "3.33333");
        assert_eq!(format_value(2.0_f64.sqrt()), "1.41421");
    }

    #[test]
    fn near_whole_results_keep_a_decimal_digit() {
        assert_eq!(format_value(2.000_000_1), "2.0");
        assert_eq!(format_value(0.999_999_9), "1.0");
        assert_eq!(format_value(-4.000_001), "-4.0");
    }

    #[test]
    fn calculate_formats_the_reply_line() {
        assert_eq!(calculate("2+2"), Some(Ok("2+2 = 4".to_string())));
        assert_eq!(calculate("3.14 * 2"), Some(Ok("3.14 * 2 = 6.28".to_string())));
        assert_eq!(calculate(" 5^3 "), Some(Ok("5^3 = 125".to_string())));
    }

    #[test]
    fn calculate_skips_non_math() {
        assert_eq!(calculate("hello world"), None);
        assert_eq!(calculate("what is 2+2?"), None);
    }

    #[test]
    fn calculate_reports_eval_failures() {
        assert_eq!(calculate("10/0"), Some(Err(CalcError::DivisionByZero)));
    }
}
