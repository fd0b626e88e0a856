// expr.rs — AST expressions produced by the AST builder, and their C printer
//
// These are the loop bounds, guards, index expressions, grid sizes and
// substitutions attached to the generated AST. They are already fully
// resolved; printing them never consults any other phase.
//
// Preconditions: `Op` nodes carry the operand count their operator expects
//   (binary ops two, `Minus` one, `Cond` three, `Call`/`Access` at least one).
// Postconditions: `Display` yields C text whose parse tree matches the
//   expression tree under C precedence rules.
// Failure modes: none when printing; `FromStr` reports syntax errors.
// Side effects: none.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::macros::MacroKind;
use crate::parser::{parse_expr, ExprParseError};

// ── Expression tree ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AstExpr {
    Id(String),
    Int(i64),
    Op { op: AstOp, args: Vec<AstExpr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstOp {
    And,
    Or,
    Max,
    Min,
    Minus,
    Add,
    Sub,
    Mul,
    Div,
    FdivQ,
    PdivQ,
    PdivR,
    /// `c ? a : b`
    Cond,
    Eq,
    Le,
    Lt,
    Ge,
    Gt,
    /// `args[0]` is the callee.
    Call,
    /// `args[0]` is the array, the rest are subscripts.
    Access,
}

impl AstExpr {
    pub fn id(name: impl Into<String>) -> Self {
        AstExpr::Id(name.into())
    }

    pub fn int(value: i64) -> Self {
        AstExpr::Int(value)
    }

    pub fn op(op: AstOp, args: Vec<AstExpr>) -> Self {
        AstExpr::Op { op, args }
    }

    pub fn binary(op: AstOp, lhs: AstExpr, rhs: AstExpr) -> Self {
        AstExpr::Op {
            op,
            args: vec![lhs, rhs],
        }
    }

    /// `name[i0][i1]...`
    pub fn access(name: impl Into<String>, index: Vec<AstExpr>) -> Self {
        let mut args = Vec::with_capacity(index.len() + 1);
        args.push(AstExpr::Id(name.into()));
        args.extend(index);
        AstExpr::Op {
            op: AstOp::Access,
            args,
        }
    }

    /// `name(a0, a1, ...)`
    pub fn call(name: impl Into<String>, call_args: Vec<AstExpr>) -> Self {
        let mut args = Vec::with_capacity(call_args.len() + 1);
        args.push(AstExpr::Id(name.into()));
        args.extend(call_args);
        AstExpr::Op {
            op: AstOp::Call,
            args,
        }
    }

    /// Does identifier `name` occur anywhere in this expression?
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            AstExpr::Id(id) => id == name,
            AstExpr::Int(_) => false,
            AstExpr::Op { args, .. } => args.iter().any(|a| a.mentions(name)),
        }
    }

    /// Helper macros that must be defined before this expression is printed.
    pub fn required_macros(&self) -> BTreeSet<MacroKind> {
        let mut kinds = BTreeSet::new();
        self.collect_macros(&mut kinds);
        kinds
    }

    fn collect_macros(&self, kinds: &mut BTreeSet<MacroKind>) {
        if let AstExpr::Op { op, args } = self {
            match op {
                AstOp::Min => {
                    kinds.insert(MacroKind::Min);
                }
                AstOp::Max => {
                    kinds.insert(MacroKind::Max);
                }
                AstOp::FdivQ => {
                    kinds.insert(MacroKind::FdivQ);
                }
                _ => {}
            }
            for arg in args {
                arg.collect_macros(kinds);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            AstExpr::Id(_) => PREC_ATOM,
            AstExpr::Int(v) if *v < 0 => PREC_UNARY,
            AstExpr::Int(_) => PREC_ATOM,
            AstExpr::Op { op, .. } => op.precedence(),
        }
    }
}

// ── Precedence ──────────────────────────────────────────────────────────────

const PREC_COND: u8 = 1;
const PREC_UNARY: u8 = 8;
const PREC_ATOM: u8 = 9;

impl AstOp {
    fn precedence(self) -> u8 {
        match self {
            AstOp::Cond => PREC_COND,
            AstOp::Or => 2,
            AstOp::And => 3,
            AstOp::Eq => 4,
            AstOp::Le | AstOp::Lt | AstOp::Ge | AstOp::Gt => 5,
            AstOp::Add | AstOp::Sub => 6,
            AstOp::Mul | AstOp::Div | AstOp::PdivQ | AstOp::PdivR => 7,
            AstOp::Minus => PREC_UNARY,
            AstOp::Min | AstOp::Max | AstOp::FdivQ | AstOp::Call | AstOp::Access => PREC_ATOM,
        }
    }

    /// C spelling of an infix operator.
    fn infix(self) -> Option<&'static str> {
        Some(match self {
            AstOp::Or => "||",
            AstOp::And => "&&",
            AstOp::Eq => "==",
            AstOp::Le => "<=",
            AstOp::Lt => "<",
            AstOp::Ge => ">=",
            AstOp::Gt => ">",
            AstOp::Add => "+",
            AstOp::Sub => "-",
            AstOp::Mul => "*",
            AstOp::Div | AstOp::PdivQ => "/",
            AstOp::PdivR => "%",
            _ => return None,
        })
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

impl fmt::Display for AstExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstExpr::Id(name) => write!(f, "{}", name),
            AstExpr::Int(v) => write!(f, "{}", v),
            AstExpr::Op { op, args } => write_op(f, *op, args),
        }
    }
}

fn write_op(f: &mut fmt::Formatter<'_>, op: AstOp, args: &[AstExpr]) -> fmt::Result {
    let prec = op.precedence();
    if let Some(sym) = op.infix() {
        if let [lhs, rhs] = args {
            write_operand(f, lhs, lhs.precedence() < prec)?;
            write!(f, " {} ", sym)?;
            return write_operand(f, rhs, rhs.precedence() <= prec);
        }
    }
    match (op, args) {
        (AstOp::Minus, [arg]) => {
            write!(f, "-")?;
            write_operand(f, arg, arg.precedence() <= PREC_UNARY)
        }
        (AstOp::Cond, [cond, then, otherwise]) => {
            write_operand(f, cond, cond.precedence() <= PREC_COND)?;
            write!(f, " ? ")?;
            write_operand(f, then, false)?;
            write!(f, " : ")?;
            write_operand(f, otherwise, otherwise.precedence() < PREC_COND)
        }
        (AstOp::Min | AstOp::Max, [first, rest @ ..]) => {
            let name = if op == AstOp::Min {
                MacroKind::Min.name()
            } else {
                MacroKind::Max.name()
            };
            // n-ary min/max folds left: min(a, b, c) = min(min(a, b), c)
            for _ in rest {
                write!(f, "{}(", name)?;
            }
            write!(f, "{}", first)?;
            for arg in rest {
                write!(f, ", {})", arg)?;
            }
            Ok(())
        }
        (AstOp::FdivQ, [n, d]) => write!(f, "{}({}, {})", MacroKind::FdivQ.name(), n, d),
        (AstOp::Call, [callee, call_args @ ..]) => {
            write_operand(f, callee, callee.precedence() < PREC_ATOM)?;
            write!(f, "(")?;
            for (i, arg) in call_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")
        }
        (AstOp::Access, [base, index @ ..]) => {
            write_operand(f, base, base.precedence() < PREC_ATOM)?;
            for i in index {
                write!(f, "[{}]", i)?;
            }
            Ok(())
        }
        // Malformed arity: print something recognizable rather than panic.
        _ => {
            write!(f, "{:?}(", op)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &AstExpr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

// ── Text form ───────────────────────────────────────────────────────────────

impl FromStr for AstExpr {
    type Err = ExprParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expr(s)
    }
}

impl TryFrom<String> for AstExpr {
    type Error = ExprParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_expr(&s)
    }
}

impl From<AstExpr> for String {
    fn from(expr: AstExpr) -> String {
        expr.to_string()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: &str) -> AstExpr {
        AstExpr::id(n)
    }

    #[test]
    fn precedence_adds_only_needed_parens() {
        let e = AstExpr::binary(
            AstOp::Mul,
            AstExpr::binary(AstOp::Add, id("a"), id("b")),
            id("c"),
        );
        assert_eq!(e.to_string(), "(a + b) * c");

        let e = AstExpr::binary(
            AstOp::Add,
            id("a"),
            AstExpr::binary(AstOp::Mul, id("b"), id("c")),
        );
        assert_eq!(e.to_string(), "a + b * c");
    }

    #[test]
    fn subtraction_keeps_right_grouping() {
        let e = AstExpr::binary(
            AstOp::Sub,
            id("a"),
            AstExpr::binary(AstOp::Sub, id("b"), id("c")),
        );
        assert_eq!(e.to_string(), "a - (b - c)");
    }

    #[test]
    fn nested_minus_does_not_become_decrement() {
        let e = AstExpr::op(AstOp::Minus, vec![AstExpr::op(AstOp::Minus, vec![id("x")])]);
        assert_eq!(e.to_string(), "-(-x)");
        let e = AstExpr::op(AstOp::Minus, vec![AstExpr::int(-3)]);
        assert_eq!(e.to_string(), "-(-3)");
    }

    #[test]
    fn min_max_print_as_macro_calls() {
        let e = AstExpr::op(AstOp::Min, vec![id("N"), id("a"), AstExpr::int(31)]);
        assert_eq!(e.to_string(), "ppcg_min(ppcg_min(N, a), 31)");
        let e = AstExpr::op(AstOp::FdivQ, vec![id("n"), AstExpr::int(32)]);
        assert_eq!(e.to_string(), "ppcg_fdiv_q(n, 32)");
    }

    #[test]
    fn access_and_call() {
        let e = AstExpr::access(
            "A",
            vec![id("i"), AstExpr::binary(AstOp::Add, id("j"), AstExpr::int(1))],
        );
        assert_eq!(e.to_string(), "A[i][j + 1]");
        let e = AstExpr::call("f", vec![id("x"), AstExpr::int(2)]);
        assert_eq!(e.to_string(), "f(x, 2)");
    }

    #[test]
    fn select_prints_ternary() {
        let cond = AstExpr::binary(AstOp::Lt, id("a"), id("b"));
        let e = AstExpr::op(AstOp::Cond, vec![cond, id("a"), id("b")]);
        assert_eq!(e.to_string(), "a < b ? a : b");
    }

    #[test]
    fn required_macros_are_collected_recursively() {
        let e = AstExpr::binary(
            AstOp::Add,
            AstExpr::op(AstOp::Max, vec![id("a"), AstExpr::int(0)]),
            AstExpr::op(AstOp::FdivQ, vec![id("n"), AstExpr::int(4)]),
        );
        let kinds: Vec<_> = e.required_macros().into_iter().collect();
        assert_eq!(kinds, vec![MacroKind::Max, MacroKind::FdivQ]);
        assert!(id("x").required_macros().is_empty());
    }

    #[test]
    fn mentions_searches_all_operands() {
        let e = AstExpr::access("A", vec![AstExpr::binary(AstOp::Add, id("c0"), AstExpr::int(1))]);
        assert!(e.mentions("c0"));
        assert!(e.mentions("A"));
        assert!(!e.mentions("c1"));
    }

    #[test]
    fn serde_uses_text_form() {
        let e: AstExpr = serde_json::from_str("\"ppcg_min(N, 32 * b0 + 31)\"").unwrap();
        assert_eq!(
            e,
            AstExpr::op(
                AstOp::Min,
                vec![
                    id("N"),
                    AstExpr::binary(
                        AstOp::Add,
                        AstExpr::binary(AstOp::Mul, AstExpr::int(32), id("b0")),
                        AstExpr::int(31)
                    ),
                ]
            )
        );
        assert_eq!(
            serde_json::to_string(&e).unwrap(),
            "\"ppcg_min(N, 32 * b0 + 31)\""
        );
    }
}
