// macros.rs — Helper macro discovery and emission
//
// Some AST expressions print as calls of helper macros (`ppcg_min`,
// `ppcg_max`, `ppcg_fdiv_q`). Before a kernel or host body is printed, the
// whole AST is walked once and every macro its annotated statements need is
// defined. Each definition is printed at most once per output unit.
//
// Preconditions: every user node carries an annotation that resolves
//   against the unit's kernel and statement tables.
// Postconditions: every macro needed by the AST has been printed exactly once
//   in this output unit.
// Failure modes: missing or dangling annotations abort with `EmitError`.
// Side effects: appends `#define` lines to the printer.

use std::collections::BTreeSet;

use log::debug;

use crate::ast::{Annotation, AstNode};
use crate::error::EmitError;
use crate::expr::AstExpr;
use crate::printer::Printer;
use crate::prog::{KernelStmt, Unit};
use crate::source::body_macros;

// ── Macro kinds ─────────────────────────────────────────────────────────────

/// A helper macro, identified by the expression shape it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacroKind {
    Min,
    Max,
    FdivQ,
}

impl MacroKind {
    pub fn name(self) -> &'static str {
        match self {
            MacroKind::Min => "ppcg_min",
            MacroKind::Max => "ppcg_max",
            MacroKind::FdivQ => "ppcg_fdiv_q",
        }
    }

    pub fn definition(self) -> &'static str {
        match self {
            MacroKind::Min => "#define ppcg_min(x,y)    ((x) < (y) ? (x) : (y))",
            MacroKind::Max => "#define ppcg_max(x,y)    ((x) > (y) ? (x) : (y))",
            MacroKind::FdivQ => "#define ppcg_fdiv_q(n,d) (((n)<0) ? -((-(n)+(d)-1)/(d)) : (n)/(d))",
        }
    }
}

// ── Macro set ───────────────────────────────────────────────────────────────

/// Macros already defined in the current output unit.
#[derive(Debug, Default, Clone)]
pub struct MacroSet {
    printed: BTreeSet<MacroKind>,
}

impl MacroSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: MacroKind) -> bool {
        self.printed.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.printed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.printed.is_empty()
    }

    /// Print the definitions in `kinds` that have not been printed yet.
    pub fn print(&mut self, p: &mut Printer, kinds: &BTreeSet<MacroKind>) {
        for &kind in kinds {
            if self.printed.insert(kind) {
                debug!("defining macro {}", kind.name());
                p.line(kind.definition());
            }
        }
    }

    /// Print the definitions needed by `expr`.
    pub fn print_for_expr(&mut self, p: &mut Printer, expr: &AstExpr) {
        self.print(p, &expr.required_macros());
    }
}

// ── Discovery traversal ─────────────────────────────────────────────────────

/// Print the macros required by the AST `node`, including those needed by
/// the statements its user nodes stand for.
///
/// For a kernel launch, the grid size needs them; for a copy statement, its
/// two index expressions; for an original statement, its substitutions; for
/// a break, the substitutions of the statement whose guard it rewrites.
/// User nodes are not descended into. A final pass covers the expressions of
/// the AST itself (loop bounds, guards).
pub fn print_macros(
    p: &mut Printer,
    node: &AstNode,
    unit: &Unit,
    macros: &mut MacroSet,
) -> Result<(), EmitError> {
    node.foreach_descendant_top_down(&mut |n: &AstNode| at_node(p, n, unit, macros))?;

    let mut kinds = BTreeSet::new();
    node.for_each_expr(&mut |e: &AstExpr| kinds.extend(e.required_macros()));
    macros.print(p, &kinds);
    Ok(())
}

fn at_node(
    p: &mut Printer,
    node: &AstNode,
    unit: &Unit,
    macros: &mut MacroSet,
) -> Result<bool, EmitError> {
    let AstNode::User(user) = node else {
        return Ok(true);
    };
    let annotation = user.annotation.ok_or(EmitError::MissingAnnotation {
        call: user.expr.to_string(),
    })?;

    match annotation {
        Annotation::Kernel(id) => {
            for size in &unit.kernel(id)?.grid_size {
                macros.print_for_expr(p, size);
            }
        }
        Annotation::Stmt(id) => match unit.stmt(id)? {
            KernelStmt::Copy(copy) => {
                macros.print_for_expr(p, &copy.index);
                macros.print_for_expr(p, &copy.local_index);
            }
            KernelStmt::Domain(domain) => {
                macros.print(p, &body_macros(&domain.ref2expr));
            }
            KernelStmt::Break(brk) => {
                let domain = unit.break_domain(id, brk)?;
                macros.print(p, &body_macros(&domain.ref2expr));
            }
        },
    }
    Ok(false)
}

// ── Tests ───────────────────────────────────────────────────────────────────
