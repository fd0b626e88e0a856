// Parser for the textual form of AST expressions.
//
// Parses a token stream (from the lexer) into an `AstExpr` following C
// precedence: `?:` < `||` < `&&` < `==` < relational < additive <
// multiplicative < unary `-` < postfix `[]` / call. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns the expression, or every lex and parse error.
// Failure modes: syntax errors produce `Rich` diagnostics collected into
//   `ExprParseError`.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;
use thiserror::Error;

use crate::expr::{AstExpr, AstOp};
use crate::lexer::Token;

/// Error returned when an expression string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse expression `{text}`: {}", messages.join("; "))]
pub struct ExprParseError {
    pub text: String,
    pub messages: Vec<String>,
}

/// Parse an expression string. Lexes then parses.
pub fn parse_expr(source: &str) -> Result<AstExpr, ExprParseError> {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (expr, parse_errors) = expr_parser()
        .then_ignore(end())
        .parse(stream)
        .into_output_errors();

    // Merge lex errors + parse errors.
    let mut messages: Vec<String> = lex_result
        .errors
        .into_iter()
        .map(|e| format!("{} at {}..{}", e.message, e.span.start, e.span.end))
        .collect();
    messages.extend(parse_errors.into_iter().map(|e| {
        let span = *e.span();
        format!("{} at {}..{}", e, span.start, span.end)
    }));

    match expr {
        Some(expr) if messages.is_empty() => Ok(expr),
        _ => Err(ExprParseError {
            text: source.to_string(),
            messages,
        }),
    }
}

// ── Grammar ──

fn expr_parser<'tokens, I>(
) -> impl Parser<'tokens, I, AstExpr, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! { Token::Ident(name) => name };

        let call_args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        // ── Primary: literal | ident | call | '(' expr ')' ──

        let literal = select! { Token::Int(v) => AstExpr::Int(v) };

        let named = ident.then(call_args.or_not()).map(|(name, args)| match args {
            Some(args) => call_expr(name, args),
            None => AstExpr::Id(name),
        });

        let primary = literal
            .or(named)
            .or(expr
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)));

        // ── Postfix: primary ('[' expr ']')* ──

        let postfix = primary
            .then(
                expr.clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(base, index)| {
                if index.is_empty() {
                    base
                } else {
                    let mut args = vec![base];
                    args.extend(index);
                    AstExpr::op(AstOp::Access, args)
                }
            });

        // ── Unary minus ──

        let unary = just(Token::Minus)
            .repeated()
            .foldr(postfix, |_, operand| negate(operand));

        // ── Binary levels ──

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(AstOp::Mul),
                just(Token::Slash).to(AstOp::Div),
                just(Token::Percent).to(AstOp::PdivR),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        let sum = product.clone().foldl(
            choice((
                just(Token::Plus).to(AstOp::Add),
                just(Token::Minus).to(AstOp::Sub),
            ))
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        let relational = sum.clone().foldl(
            choice((
                just(Token::Le).to(AstOp::Le),
                just(Token::Lt).to(AstOp::Lt),
                just(Token::Ge).to(AstOp::Ge),
                just(Token::Gt).to(AstOp::Gt),
            ))
            .then(sum)
            .repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        let equality = relational.clone().foldl(
            just(Token::EqEq).to(AstOp::Eq).then(relational).repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        let conjunction = equality.clone().foldl(
            just(Token::AndAnd).to(AstOp::And).then(equality).repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        let disjunction = conjunction.clone().foldl(
            just(Token::OrOr).to(AstOp::Or).then(conjunction).repeated(),
            |lhs, (op, rhs)| AstExpr::binary(op, lhs, rhs),
        );

        // ── Select: disjunction ('?' expr ':' expr)? ──

        disjunction
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr)
                    .or_not(),
            )
            .map(|(cond, branches)| match branches {
                Some((then, otherwise)) => AstExpr::op(AstOp::Cond, vec![cond, then, otherwise]),
                None => cond,
            })
    })
}

/// Map the helper-macro spellings back onto their dedicated operators so that
/// printing a parsed expression reproduces the input.
fn call_expr(name: String, args: Vec<AstExpr>) -> AstExpr {
    let op = match name.as_str() {
        "ppcg_min" | "min" if args.len() >= 2 => AstOp::Min,
        "ppcg_max" | "max" if args.len() >= 2 => AstOp::Max,
        "ppcg_fdiv_q" | "floord" if args.len() == 2 => AstOp::FdivQ,
        _ => return AstExpr::call(name, args),
    };
    AstExpr::op(op, args)
}

fn negate(operand: AstExpr) -> AstExpr {
    AstExpr::op(AstOp::Minus, vec![operand])
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> AstExpr {
        parse_expr(source).unwrap_or_else(|e| panic!("{}", e))
    }

    fn id(n: &str) -> AstExpr {
        AstExpr::id(n)
    }

    #[test]
    fn atoms() {
        assert_eq!(parse_ok("42"), AstExpr::Int(42));
        assert_eq!(parse_ok("c0"), id("c0"));
        assert_eq!(parse_ok("(c0)"), id("c0"));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_ok("a + b * c"),
            AstExpr::binary(
                AstOp::Add,
                id("a"),
                AstExpr::binary(AstOp::Mul, id("b"), id("c"))
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse_ok("a - b - c"),
            AstExpr::binary(
                AstOp::Sub,
                AstExpr::binary(AstOp::Sub, id("a"), id("b")),
                id("c")
            )
        );
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(
            parse_ok("i <= N && j > 0"),
            AstExpr::binary(
                AstOp::And,
                AstExpr::binary(AstOp::Le, id("i"), id("N")),
                AstExpr::binary(AstOp::Gt, id("j"), AstExpr::Int(0))
            )
        );
    }

    #[test]
    fn access_collects_all_subscripts() {
        assert_eq!(
            parse_ok("A[i][j + 1]"),
            AstExpr::access(
                "A",
                vec![id("i"), AstExpr::binary(AstOp::Add, id("j"), AstExpr::Int(1))]
            )
        );
    }

    #[test]
    fn macro_calls_become_operators() {
        assert_eq!(
            parse_ok("ppcg_min(N, 31)"),
            AstExpr::op(AstOp::Min, vec![id("N"), AstExpr::Int(31)])
        );
        assert_eq!(
            parse_ok("floord(n, 32)"),
            AstExpr::op(AstOp::FdivQ, vec![id("n"), AstExpr::Int(32)])
        );
        assert_eq!(parse_ok("f(x)"), AstExpr::call("f", vec![id("x")]));
    }

    #[test]
    fn unary_minus_and_select() {
        assert_eq!(
            parse_ok("-x"),
            AstExpr::op(AstOp::Minus, vec![id("x")])
        );
        assert_eq!(
            parse_ok("a < b ? a : b"),
            AstExpr::op(
                AstOp::Cond,
                vec![AstExpr::binary(AstOp::Lt, id("a"), id("b")), id("a"), id("b")]
            )
        );
    }

    #[test]
    fn printing_a_parsed_expression_reproduces_it() {
        for text in [
            "ppcg_min(N - 1, 32 * b0 + 31)",
            "(a + b) * c",
            "A[c0][c1 + 1]",
            "c0 <= ppcg_fdiv_q(N, 32)",
            "a - (b - c)",
            "-x + 3",
            "n % 4 == 0",
        ] {
            assert_eq!(parse_ok(text).to_string(), text);
        }
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = parse_expr("a + ").unwrap_err();
        assert_eq!(err.text, "a + ");
        assert!(!err.messages.is_empty());

        let err = parse_expr("a $ b").unwrap_err();
        assert!(err.messages[0].contains("unexpected character"));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_expr("a b").is_err());
    }
}
