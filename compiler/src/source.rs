// source.rs — Original source statements and their substituted printing
//
// A domain statement keeps the body of the statement it was generated from,
// as written in the input program. Every access in that body has a reference
// id; the domain statement's substitution map replaces referenced accesses
// with expressions over the new loop iterators when the body is printed.
//
// Preconditions: reference ids are unique within one statement.
// Postconditions: printing never reorders operands; nested operations are
//   always parenthesized.
// Failure modes: none.
// Side effects: none.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::expr::AstExpr;
use crate::macros::MacroKind;
use crate::printer::Printer;

/// Reference id → regenerated expression.
pub type Substitutions = BTreeMap<String, AstExpr>;

// ── Trees ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStmt {
    /// Statement label in the input program (e.g. `S_3`).
    pub label: String,
    pub body: SourceTree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTree {
    /// Expression statement, printed with a trailing `;`.
    Expr(SourceExpr),
    If {
        cond: SourceExpr,
        then: Box<SourceTree>,
        #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<SourceTree>>,
    },
    Block(Vec<SourceTree>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceExpr {
    Access {
        #[serde(rename = "ref")]
        ref_id: String,
        name: String,
        #[serde(default)]
        index: Vec<SourceExpr>,
    },
    Int(i64),
    Call {
        name: String,
        #[serde(default)]
        args: Vec<SourceExpr>,
    },
    Op {
        op: SourceOp,
        args: Vec<SourceExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Minus,
    Not,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    And,
    Or,
    Cond,
}

impl SourceOp {
    fn symbol(self) -> &'static str {
        match self {
            SourceOp::Assign => "=",
            SourceOp::AddAssign => "+=",
            SourceOp::SubAssign => "-=",
            SourceOp::MulAssign => "*=",
            SourceOp::DivAssign => "/=",
            SourceOp::Add => "+",
            SourceOp::Sub | SourceOp::Minus => "-",
            SourceOp::Mul => "*",
            SourceOp::Div => "/",
            SourceOp::Rem => "%",
            SourceOp::Not => "!",
            SourceOp::Eq => "==",
            SourceOp::Ne => "!=",
            SourceOp::Le => "<=",
            SourceOp::Ge => ">=",
            SourceOp::Lt => "<",
            SourceOp::Gt => ">",
            SourceOp::And => "&&",
            SourceOp::Or => "||",
            SourceOp::Cond => "?",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            SourceOp::Eq | SourceOp::Ne | SourceOp::Le | SourceOp::Ge | SourceOp::Lt | SourceOp::Gt
        )
    }
}

// ── Construction helpers ────────────────────────────────────────────────────

impl SourceExpr {
    pub fn access(ref_id: impl Into<String>, name: impl Into<String>) -> Self {
        SourceExpr::Access {
            ref_id: ref_id.into(),
            name: name.into(),
            index: Vec::new(),
        }
    }

    pub fn indexed(
        ref_id: impl Into<String>,
        name: impl Into<String>,
        index: Vec<SourceExpr>,
    ) -> Self {
        SourceExpr::Access {
            ref_id: ref_id.into(),
            name: name.into(),
            index,
        }
    }

    pub fn binary(op: SourceOp, lhs: SourceExpr, rhs: SourceExpr) -> Self {
        SourceExpr::Op {
            op,
            args: vec![lhs, rhs],
        }
    }
}

// ── Queries ─────────────────────────────────────────────────────────────────

impl SourceExpr {
    /// Does this expression read or write `loop_id`, either directly or
    /// through the substitution of one of its accesses?
    pub fn refers_to(&self, loop_id: &str, subst: &Substitutions) -> bool {
        match self {
            SourceExpr::Access {
                ref_id,
                name,
                index,
            } => {
                if let Some(expr) = subst.get(ref_id) {
                    return expr.mentions(loop_id);
                }
                name == loop_id || index.iter().any(|i| i.refers_to(loop_id, subst))
            }
            SourceExpr::Int(_) => false,
            SourceExpr::Call { args, .. } | SourceExpr::Op { args, .. } => {
                args.iter().any(|a| a.refers_to(loop_id, subst))
            }
        }
    }
}

/// Return the comparison in `cond` that tests `loop_id`.
///
/// Only a single top-level comparison is recognized; conjunctions,
/// disjunctions and any other guard shape yield `None`.
pub fn condition_has_loop_iterator<'a>(
    cond: &'a SourceExpr,
    loop_id: &str,
    subst: &Substitutions,
) -> Option<&'a SourceExpr> {
    match cond {
        SourceExpr::Op { op, args } if op.is_comparison() => args
            .iter()
            .any(|a| a.refers_to(loop_id, subst))
            .then_some(cond),
        _ => None,
    }
}

/// Macros needed by every substituted expression of a statement.
pub fn body_macros(subst: &Substitutions) -> BTreeSet<MacroKind> {
    subst
        .values()
        .flat_map(|expr| expr.required_macros())
        .collect()
}

// ── Printing ────────────────────────────────────────────────────────────────

/// Print `expr` as C, replacing substituted accesses.
pub fn print_source_expr(expr: &SourceExpr, subst: &Substitutions) -> String {
    match expr {
        SourceExpr::Access {
            ref_id,
            name,
            index,
        } => {
            if let Some(replacement) = subst.get(ref_id) {
                return replacement.to_string();
            }
            let mut s = name.clone();
            for i in index {
                s.push('[');
                s.push_str(&print_source_expr(i, subst));
                s.push(']');
            }
            s
        }
        SourceExpr::Int(v) => v.to_string(),
        SourceExpr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(|a| print_source_expr(a, subst)).collect();
            format!("{}({})", name, args.join(", "))
        }
        SourceExpr::Op { op, args } => match (op, args.as_slice()) {
            (SourceOp::Minus | SourceOp::Not, [arg]) => {
                format!("{}{}", op.symbol(), operand(arg, subst))
            }
            (SourceOp::Cond, [c, a, b]) => format!(
                "{} ? {} : {}",
                operand(c, subst),
                operand(a, subst),
                operand(b, subst)
            ),
            // Assignments print their target bare so `A[i] = ...` stays an lvalue.
            (op, [lhs, rhs]) if is_assignment(*op) => format!(
                "{} {} {}",
                print_source_expr(lhs, subst),
                op.symbol(),
                print_source_expr(rhs, subst)
            ),
            (op, [lhs, rhs]) => format!(
                "{} {} {}",
                operand(lhs, subst),
                op.symbol(),
                operand(rhs, subst)
            ),
            (op, _) => {
                let args: Vec<String> = args.iter().map(|a| print_source_expr(a, subst)).collect();
                format!("{:?}({})", op, args.join(", "))
            }
        },
    }
}

fn operand(expr: &SourceExpr, subst: &Substitutions) -> String {
    match expr {
        // Negative literals too: `-` before `-3` would read as `--`.
        SourceExpr::Op { .. } | SourceExpr::Int(i64::MIN..=-1) => {
            format!("({})", print_source_expr(expr, subst))
        }
        _ => print_source_expr(expr, subst),
    }
}

fn is_assignment(op: SourceOp) -> bool {
    matches!(
        op,
        SourceOp::Assign
            | SourceOp::AddAssign
            | SourceOp::SubAssign
            | SourceOp::MulAssign
            | SourceOp::DivAssign
    )
}

/// Print a statement body, one C statement per line.
pub fn print_source_tree(p: &mut Printer, tree: &SourceTree, subst: &Substitutions) {
    match tree {
        SourceTree::Expr(expr) => {
            p.start_line();
            p.print_str(&print_source_expr(expr, subst));
            p.print_str(";");
            p.end_line();
        }
        SourceTree::If {
            cond,
            then,
            otherwise,
        } => {
            p.line(&format!("if ({}) {{", print_source_expr(cond, subst)));
            p.indent();
            print_source_tree(p, then, subst);
            p.dedent();
            if let Some(otherwise) = otherwise {
                p.line("} else {");
                p.indent();
                print_source_tree(p, otherwise, subst);
                p.dedent();
            }
            p.line("}");
        }
        SourceTree::Block(trees) => {
            for t in trees {
                print_source_tree(p, t, subst);
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
