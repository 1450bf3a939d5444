use std::fmt::{Debug, Formatter};

use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of, satisfy};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::{AsChar, IResult};

use crate::internal::classad::expr::{BinaryOp, Expr, MAX_EXPR_DEPTH, UnaryOp};
use crate::internal::classad::value::Value;

pub enum ParserError<I> {
    Custom(String),
    Nom(I, ErrorKind),
}

impl<I: Debug> Debug for ParserError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(error) => f.write_fmt(format_args!("Semantic error at {}", error)),
            Self::Nom(input, error) => f.write_fmt(format_args!(
                "Parser error at '{:?}': expecting {:?}",
                input, error
            )),
        }
    }
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError::Nom(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I: std::fmt::Display, E: std::fmt::Display> FromExternalError<I, E> for ParserError<I> {
    fn from_external_error(input: I, _: ErrorKind, error: E) -> Self {
        ParserError::Custom(format!("'{}': {}", input, error))
    }
}

type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

fn format_parse_error<I: Debug>(error: nom::Err<ParserError<I>>) -> crate::Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => crate::Error::ParseError(format!("{e:?}")),
        nom::Err::Incomplete(_) => crate::Error::ParseError("Incomplete input".to_string()),
    }
}

/// Parentheses, unary operators and call arguments may be nested this deep.
const MAX_NESTING: u32 = 32;

/// A parsed expression together with the height of its tree.
type Parsed = (Expr, u32);

/// Parses a single expression, e.g. `NumJobStarts > 3 && JobStatus == 2`.
pub fn parse_expr(input: &str) -> crate::Result<Expr> {
    all_consuming(terminated(|i| p_expr(i, 0), multispace0))(input)
        .map(|(_, (expr, _))| expr)
        .map_err(format_parse_error)
}

/// Parses an attribute name followed by `=`; used by the job ad parser.
pub(crate) fn parse_assignment(input: &str) -> crate::Result<(String, Expr)> {
    let parser = tuple((ws(p_identifier), ws(char('=')), |i| p_expr(i, 0)));
    all_consuming(terminated(parser, multispace0))(input)
        .map(|(_, (name, _, (expr, _)))| (name.to_string(), expr))
        .map_err(format_parse_error)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> NomResult<'a, O>
where
    F: FnMut(&'a str) -> NomResult<'a, O>,
{
    preceded(multispace0, inner)
}

fn failure<'a>(message: String) -> nom::Err<ParserError<&'a str>> {
    nom::Err::Failure(ParserError::Custom(message))
}

fn enter<'a>(nesting: u32) -> Result<u32, nom::Err<ParserError<&'a str>>> {
    if nesting >= MAX_NESTING {
        return Err(failure(format!(
            "expression nested deeper than {MAX_NESTING} levels"
        )));
    }
    Ok(nesting + 1)
}

fn check_depth<'a>(depth: u32) -> Result<u32, nom::Err<ParserError<&'a str>>> {
    if depth > MAX_EXPR_DEPTH {
        return Err(failure(format!(
            "expression tree deeper than {MAX_EXPR_DEPTH} levels"
        )));
    }
    Ok(depth)
}

fn p_expr(input: &str, nesting: u32) -> NomResult<Parsed> {
    p_or(input, nesting)
}

/// Parses `operand (op operand)*` and folds it to the left.
fn binary_level<'a, O, F>(input: &'a str, op: O, mut operand: F) -> NomResult<'a, Parsed>
where
    O: FnMut(&'a str) -> NomResult<'a, BinaryOp>,
    F: FnMut(&'a str) -> NomResult<'a, Parsed>,
{
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(op, &mut operand))(input)?;
    let mut acc = first;
    for (op, (rhs, rhs_depth)) in rest {
        let depth = check_depth(acc.1.max(rhs_depth) + 1)?;
        acc = (Expr::binary(op, acc.0, rhs), depth);
    }
    Ok((input, acc))
}

fn p_or(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = value(BinaryOp::Or, ws(tag("||")));
    binary_level(input, op, |i| p_and(i, nesting))
}

fn p_and(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = value(BinaryOp::And, ws(tag("&&")));
    binary_level(input, op, |i| p_equality(i, nesting))
}

fn p_equality(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = ws(alt((
        value(BinaryOp::Is, tag("=?=")),
        value(BinaryOp::IsNot, tag("=!=")),
        value(BinaryOp::Equal, tag("==")),
        value(BinaryOp::NotEqual, tag("!=")),
    )));
    binary_level(input, op, |i| p_relational(i, nesting))
}

fn p_relational(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = ws(alt((
        value(BinaryOp::LessEq, tag("<=")),
        value(BinaryOp::GreaterEq, tag(">=")),
        value(BinaryOp::Less, tag("<")),
        value(BinaryOp::Greater, tag(">")),
    )));
    binary_level(input, op, |i| p_additive(i, nesting))
}

fn p_additive(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = ws(alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    )));
    binary_level(input, op, |i| p_multiplicative(i, nesting))
}

fn p_multiplicative(input: &str, nesting: u32) -> NomResult<Parsed> {
    let op = ws(alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
        value(BinaryOp::Mod, char('%')),
    )));
    binary_level(input, op, |i| p_unary(i, nesting))
}

fn p_unary(input: &str, nesting: u32) -> NomResult<Parsed> {
    let mut op = ws(alt((
        value(UnaryOp::Not, char('!')),
        value(UnaryOp::Minus, char('-')),
    )));
    let (input, op) = match op(input) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(_)) => return p_primary(input, nesting),
        Err(error) => return Err(error),
    };
    let (input, (operand, depth)) = p_unary(input, enter(nesting)?)?;
    let parsed = match (op, operand) {
        // Fold negative number literals so that `-5` stays a literal
        (UnaryOp::Minus, Expr::Literal(Value::Integer(v))) => {
            (Expr::Literal(Value::Integer(-v)), depth)
        }
        (UnaryOp::Minus, Expr::Literal(Value::Real(v))) => (Expr::Literal(Value::Real(-v)), depth),
        (op, operand) => (Expr::Unary(op, Box::new(operand)), check_depth(depth + 1)?),
    };
    Ok((input, parsed))
}

fn p_primary(input: &str, nesting: u32) -> NomResult<Parsed> {
    let (input, _) = multispace0::<_, ParserError<&str>>(input)?;
    if let Ok((input, _)) = char::<_, ParserError<&str>>('(')(input) {
        let (input, parsed) = p_expr(input, enter(nesting)?)?;
        let (input, _) = ws(char(')'))(input)?;
        return Ok((input, parsed));
    }
    alt((
        map(p_number, |expr| (expr, 1)),
        map(p_string, |s| (Expr::Literal(Value::String(s)), 1)),
        |i| p_identifier_expr(i, nesting),
    ))(input)
}

fn p_identifier(input: &str) -> NomResult<&str> {
    recognize(pair(
        satisfy(|c| c.is_alpha() || c == '_'),
        many0(satisfy(|c| c.is_alphanum() || c == '_' || c == '.')),
    ))(input)
}

fn p_identifier_expr(input: &str, nesting: u32) -> NomResult<Parsed> {
    let (input, name) = p_identifier(input)?;
    let (input, open) = opt(ws(char('(')))(input)?;
    if open.is_none() {
        let expr = match name.to_ascii_lowercase().as_str() {
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "undefined" => Expr::Literal(Value::Undefined),
            "error" => Expr::Literal(Value::Error),
            _ => Expr::Attr(name.to_string()),
        };
        return Ok((input, (expr, 1)));
    }
    let nesting = enter(nesting)?;
    let (input, args) = separated_list0(ws(char(',')), |i| p_expr(i, nesting))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    let depth = check_depth(args.iter().map(|(_, depth)| *depth).max().unwrap_or(0) + 1)?;
    let args = args.into_iter().map(|(expr, _)| expr).collect();
    Ok((input, (Expr::Call(name.to_string(), args), depth)))
}

fn p_number(input: &str) -> NomResult<Expr> {
    let fraction = pair(char('.'), digit0);
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    map_res(
        recognize(tuple((digit1, opt(fraction), opt(exponent)))),
        |text: &str| -> Result<Expr, String> {
            if text.contains(['.', 'e', 'E']) {
                text.parse::<f64>()
                    .map(|v| Expr::Literal(Value::Real(v)))
                    .map_err(|e| e.to_string())
            } else {
                text.parse::<i64>()
                    .map(|v| Expr::Literal(Value::Integer(v)))
                    .map_err(|e| e.to_string())
            }
        },
    )(input)
}

fn p_string(input: &str) -> NomResult<String> {
    let escapes = alt((
        value("\\", tag("\\")),
        value("\"", tag("\"")),
        value("\n", tag("n")),
        value("\t", tag("t")),
    ));
    map(
        delimited(
            char('"'),
            opt(escaped_transform(is_not("\\\""), '\\', escapes)),
            char('"'),
        ),
        |s: Option<String>| s.unwrap_or_default(),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::{parse_assignment, parse_expr};
    use crate::internal::classad::expr::{BinaryOp, Expr, MAX_EXPR_DEPTH, UnaryOp};
    use crate::internal::classad::value::Value;

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expr("true").unwrap(), Expr::literal(true));
        assert_eq!(parse_expr("FALSE").unwrap(), Expr::literal(false));
        assert_eq!(parse_expr("42").unwrap(), Expr::literal(42));
        assert_eq!(parse_expr("-42").unwrap(), Expr::literal(-42));
        assert_eq!(parse_expr("2.5").unwrap(), Expr::literal(2.5));
        assert_eq!(parse_expr("1e3").unwrap(), Expr::literal(1000.0));
        assert_eq!(parse_expr("undefined").unwrap(), Expr::Literal(Value::Undefined));
        assert_eq!(parse_expr("\"abc\"").unwrap(), Expr::literal("abc"));
        assert_eq!(parse_expr("\"\"").unwrap(), Expr::literal(""));
        assert_eq!(parse_expr("\"a\\\"b\"").unwrap(), Expr::literal("a\"b"));
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(
            parse_expr("a || b && c").unwrap(),
            Expr::binary(
                BinaryOp::Or,
                Expr::attr("a"),
                Expr::binary(BinaryOp::And, Expr::attr("b"), Expr::attr("c"))
            )
        );
        assert_eq!(
            parse_expr("a - b - c").unwrap(),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::attr("a"), Expr::attr("b")),
                Expr::attr("c")
            )
        );
        assert_eq!(
            parse_expr("!a == b").unwrap(),
            Expr::binary(
                BinaryOp::Equal,
                Expr::Unary(UnaryOp::Not, Box::new(Expr::attr("a"))),
                Expr::attr("b")
            )
        );
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(
            parse_expr("  ( A  <=  3 )  ").unwrap(),
            Expr::binary(BinaryOp::LessEq, Expr::attr("A"), Expr::literal(3))
        );
    }

    #[test]
    fn test_parse_call() {
        assert_eq!(parse_expr("time()").unwrap(), Expr::Call("time".into(), vec![]));
        assert_eq!(
            parse_expr("strcat(\"a\", B)").unwrap(),
            Expr::Call("strcat".into(), vec![Expr::literal("a"), Expr::attr("B")])
        );
    }

    #[test]
    fn test_parse_identifier_prefixed_by_keyword() {
        assert_eq!(parse_expr("trueValue").unwrap(), Expr::attr("trueValue"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("a +").is_err());
        assert!(parse_expr("(a").is_err());
        assert!(parse_expr("a b").is_err());
        assert!(parse_expr("\"unterminated").is_err());
    }

    #[test]
    fn test_parse_nesting_limit() {
        assert!(parse_expr(&format!("{}1{}", "(".repeat(32), ")".repeat(32))).is_ok());
        assert!(parse_expr(&format!("{}1{}", "(".repeat(33), ")".repeat(33))).is_err());
        assert!(parse_expr(&"(".repeat(100_000)).is_err());
        assert!(parse_expr(&format!("{}A", "!".repeat(100_000))).is_err());
        assert!(parse_expr(&format!("{}1{}", "f(".repeat(100), ")".repeat(100))).is_err());
    }

    #[test]
    fn test_parse_long_chain_limit() {
        let chain = |n: usize| vec!["A"; n].join(" + ");
        assert!(parse_expr(&chain(256)).is_ok());
        assert!(parse_expr(&chain(258)).is_err());
        assert!(parse_expr(&chain(100_000)).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        let (name, expr) = parse_assignment("  PeriodicHold = NumJobStarts > 3").unwrap();
        assert_eq!(name, "PeriodicHold");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Greater,
                Expr::attr("NumJobStarts"),
                Expr::literal(3)
            )
        );
        assert!(parse_assignment("= 3").is_err());
    }
}
