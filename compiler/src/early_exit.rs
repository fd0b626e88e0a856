// early_exit.rs — Early loop exits rewritten as guarded jumps
//
// A break statement marks a loop that the input program leaves early. The
// exit condition is the guard of the original statement the break belongs
// to. The printer turns "exit when C" into
//
//     if (<not C>)
//       goto label_for_<it>;
//
// and the code generator places `label_for_<it>: ;` right after the loop.
// Guards of an unrecognised shape are tolerated: nothing is printed and the
// caller records a warning.
//
// Preconditions: `domain` is the domain statement `stmt.domain` refers to.
// Postconditions: either two lines are printed (`Emitted`) or none
//   (`NoPattern`).
// Failure modes: none.
// Side effects: appends lines to the printer.

use std::fmt;

use log::debug;

use crate::printer::Printer;
use crate::prog::{BreakStmt, DomainStmt};
use crate::source::{condition_has_loop_iterator, print_source_expr, SourceExpr, SourceOp, SourceTree};

// ── Comparison operators ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
    Ne,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [CmpOp::Le, CmpOp::Ge, CmpOp::Lt, CmpOp::Gt, CmpOp::Eq, CmpOp::Ne];

    /// Logical complement: `a <op> b` is false exactly when `a <inverse> b` holds.
    pub fn inverse(self) -> CmpOp {
        match self {
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// `None` for every operator that is not a comparison.
    pub fn from_source_op(op: SourceOp) -> Option<CmpOp> {
        match op {
            SourceOp::Le => Some(CmpOp::Le),
            SourceOp::Ge => Some(CmpOp::Ge),
            SourceOp::Lt => Some(CmpOp::Lt),
            SourceOp::Gt => Some(CmpOp::Gt),
            SourceOp::Eq => Some(CmpOp::Eq),
            SourceOp::Ne => Some(CmpOp::Ne),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ── Break printing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakOutcome {
    Emitted,
    /// Nothing was printed; the reason says which shape was expected.
    NoPattern(String),
}

/// Label jumped to when leaving the loop over `loop_id`.
pub fn break_label(loop_id: &str) -> String {
    format!("label_for_{}", loop_id)
}

pub fn print_break(p: &mut Printer, stmt: &BreakStmt, domain: &DomainStmt) -> BreakOutcome {
    match break_guard(stmt, domain) {
        Ok((lhs, op, rhs)) => {
            p.line(&format!("if ({} {} {})", lhs, op.inverse(), rhs));
            p.indent();
            p.line(&format!("goto {};", break_label(&stmt.loop_id)));
            p.dedent();
            BreakOutcome::Emitted
        }
        Err(reason) => {
            debug!(
                "no early exit printed for loop `{}` in {}: {}",
                stmt.loop_id, domain.stmt.label, reason
            );
            BreakOutcome::NoPattern(reason)
        }
    }
}

/// The two printed operands and the comparison of the exit guard.
fn break_guard(stmt: &BreakStmt, domain: &DomainStmt) -> Result<(String, CmpOp, String), String> {
    let SourceTree::If { cond, .. } = &domain.stmt.body else {
        return Err("statement body is not a single conditional".into());
    };
    let subst = &domain.ref2expr;
    let Some(cmp) = condition_has_loop_iterator(cond, &stmt.loop_id, subst) else {
        return Err(format!("guard does not compare loop iterator `{}`", stmt.loop_id));
    };
    let SourceExpr::Op { op, args } = cmp else {
        return Err("guard is not an operation".into());
    };
    let Some(cmp_op) = CmpOp::from_source_op(*op) else {
        return Err(format!("guard operator {:?} is not a comparison", op));
    };
    let (Some(first), Some(last)) = (args.first(), args.last()) else {
        return Err("guard has no operands".into());
    };

    let lhs = if stmt.is_inner {
        print_source_expr(first, subst)
    } else {
        stmt.loop_id.clone()
    };
    Ok((lhs, cmp_op, print_source_expr(last, subst)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AstExpr;
    use crate::id::StmtId;
    use crate::source::{SourceStmt, Substitutions};

    fn guarded(cond: SourceExpr, subst: Substitutions) -> DomainStmt {
        DomainStmt {
            stmt: SourceStmt {
                label: "S_1".into(),
                body: SourceTree::If {
                    cond,
                    then: Box::new(SourceTree::Block(Vec::new())),
                    otherwise: None,
                },
            },
            ref2expr: subst,
        }
    }

    fn brk(loop_id: &str, is_inner: bool) -> BreakStmt {
        BreakStmt {
            loop_id: loop_id.into(),
            is_inner,
            domain: StmtId(0),
        }
    }

    fn le(lhs: SourceExpr, rhs: SourceExpr) -> SourceExpr {
        SourceExpr::binary(SourceOp::Le, lhs, rhs)
    }

    #[test]
    fn inverse_table() {
        assert_eq!(CmpOp::Le.inverse(), CmpOp::Gt);
        assert_eq!(CmpOp::Ge.inverse(), CmpOp::Lt);
        assert_eq!(CmpOp::Lt.inverse(), CmpOp::Ge);
        assert_eq!(CmpOp::Gt.inverse(), CmpOp::Le);
        assert_eq!(CmpOp::Eq.inverse(), CmpOp::Ne);
        assert_eq!(CmpOp::Ne.inverse(), CmpOp::Eq);
    }

    #[test]
    fn non_comparisons_have_no_cmp_op() {
        assert_eq!(CmpOp::from_source_op(SourceOp::Add), None);
        assert_eq!(CmpOp::from_source_op(SourceOp::And), None);
        assert_eq!(CmpOp::from_source_op(SourceOp::Ne), Some(CmpOp::Ne));
    }

    #[test]
    fn outer_break_compares_the_raw_iterator() {
        let domain = guarded(
            le(SourceExpr::access("r0", "i"), SourceExpr::access("r1", "N")),
            Substitutions::new(),
        );
        let mut p = Printer::default();
        assert_eq!(print_break(&mut p, &brk("i", false), &domain), BreakOutcome::Emitted);
        assert_eq!(p.finish(), "if (i > N)\n  goto label_for_i;\n");
    }

    #[test]
    fn inner_break_prints_substituted_operands() {
        let subst: Substitutions = [
            ("r0".to_string(), AstExpr::id("c1")),
            ("r1".to_string(), "ppcg_min(N, 32 * b0)".parse().unwrap()),
        ]
        .into_iter()
        .collect();
        let domain = guarded(
            SourceExpr::binary(
                SourceOp::Lt,
                SourceExpr::access("r0", "j"),
                SourceExpr::access("r1", "M"),
            ),
            subst,
        );
        let mut p = Printer::default();
        assert_eq!(print_break(&mut p, &brk("c1", true), &domain), BreakOutcome::Emitted);
        assert_eq!(
            p.finish(),
            "if (c1 >= ppcg_min(N, 32 * b0))\n  goto label_for_c1;\n"
        );
    }

    #[test]
    fn body_without_conditional_prints_nothing() {
        let domain = DomainStmt {
            stmt: SourceStmt {
                label: "S_0".into(),
                body: SourceTree::Expr(SourceExpr::Int(0)),
            },
            ref2expr: Substitutions::new(),
        };
        let mut p = Printer::default();
        let outcome = print_break(&mut p, &brk("i", false), &domain);
        assert!(matches!(outcome, BreakOutcome::NoPattern(_)));
        assert!(p.is_empty());
    }

    #[test]
    fn guard_on_another_iterator_prints_nothing() {
        let domain = guarded(
            le(SourceExpr::access("r0", "j"), SourceExpr::access("r1", "N")),
            Substitutions::new(),
        );
        let mut p = Printer::default();
        let outcome = print_break(&mut p, &brk("i", false), &domain);
        assert!(matches!(outcome, BreakOutcome::NoPattern(ref r) if r.contains("`i`")));
        assert!(p.is_empty());
    }

    #[test]
    fn label_name() {
        assert_eq!(break_label("c0"), "label_for_c0");
    }
}
