// prog.rs — Program, array, kernel and kernel-statement descriptors
//
// The read-only model an emission unit is printed from. Everything here is
// produced upstream (scheduler, memory-placement and AST-building phases)
// and arrives in one JSON bundle; this phase never mutates it.
//
// Preconditions: ids are unique; `BreakStmt::domain` indexes `Unit::stmts`.
// Postconditions: none (data + lookups only).
// Failure modes: lookups of unknown ids / names return `EmitError`.
// Side effects: none.

use serde::{Deserialize, Serialize};

use crate::ast::AstNode;
use crate::diag::SourceLoc;
use crate::error::EmitError;
use crate::expr::AstExpr;
use crate::id::{KernelId, StmtId};
use crate::source::{SourceStmt, Substitutions};

fn default_true() -> bool {
    true
}

// ── Arrays ──────────────────────────────────────────────────────────────────

/// An array (or scalar, when `n_index == 0`) of the input program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayInfo {
    #[serde(rename = "type")]
    pub elem_type: String,
    pub name: String,
    pub n_index: usize,
    /// Extent of each dimension, outermost first.
    #[serde(default)]
    pub bound: Vec<AstExpr>,
    /// Scalar that is only read; passed by value.
    #[serde(default)]
    pub read_only_scalar: bool,
    /// Lives entirely on the device side; never an argument.
    #[serde(default)]
    pub local: bool,
    /// Needs a local declaration in the host procedure.
    #[serde(default)]
    pub declare_local: bool,
    /// Accessed through a flat pointer with explicit index arithmetic.
    #[serde(default)]
    pub linearize: bool,
    #[serde(default = "default_true")]
    pub accessed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
}

impl ArrayInfo {
    /// An accessed, non-linearized array with the given bounds.
    pub fn new(elem_type: impl Into<String>, name: impl Into<String>, bound: Vec<AstExpr>) -> Self {
        ArrayInfo {
            elem_type: elem_type.into(),
            name: name.into(),
            n_index: bound.len(),
            bound,
            read_only_scalar: false,
            local: false,
            declare_local: false,
            linearize: false,
            accessed: true,
            loc: None,
        }
    }

    /// A writable scalar.
    pub fn scalar(elem_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(elem_type, name, Vec::new())
    }

    pub fn is_scalar(&self) -> bool {
        self.n_index == 0
    }

    pub fn is_read_only_scalar(&self) -> bool {
        self.read_only_scalar && self.is_scalar()
    }

    /// `name[b0][b1]...`, the fixed-size declarator of this array.
    pub fn bound_expr(&self) -> AstExpr {
        AstExpr::access(self.name.clone(), self.bound.clone())
    }
}

// ── Program ─────────────────────────────────────────────────────────────────

/// A user-defined type the generated code needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    /// Full definition text, without the trailing `;`.
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prog {
    pub id: u32,
    /// Name of the source function the program was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Scalar parameters of the constraint context, in order.
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub arrays: Vec<ArrayInfo>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl Prog {
    pub fn new(id: u32) -> Self {
        Prog {
            id,
            function_name: None,
            params: Vec::new(),
            arrays: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn array(&self, name: &str) -> Result<&ArrayInfo, EmitError> {
        self.arrays
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| EmitError::UnknownArray(name.to_string()))
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }
}

// ── Kernels ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Shared,
    Private,
}

/// A buffer declared inside a kernel body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelVar {
    pub kind: VarKind,
    pub name: String,
    #[serde(rename = "type")]
    pub elem_type: String,
    #[serde(default)]
    pub size: Vec<AstExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    pub id: KernelId,
    /// Threads per block, one entry per dimension.
    #[serde(default)]
    pub block_dim: Vec<u32>,
    /// Blocks per grid, one expression per dimension.
    #[serde(default)]
    pub grid_size: Vec<AstExpr>,
    /// Names of the block index variables (`b0`, `b1`, ...).
    #[serde(default)]
    pub block_ids: Vec<String>,
    /// Names of the thread index variables (`t0`, `t1`, ...).
    #[serde(default)]
    pub thread_ids: Vec<String>,
    /// Arrays the kernel takes as arguments, in argument order.
    #[serde(default)]
    pub arrays: Vec<String>,
    /// Parameters the kernel takes after its arrays.
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub vars: Vec<KernelVar>,
    pub tree: AstNode,
}

impl Kernel {
    pub fn new(id: KernelId, grid_size: Vec<AstExpr>, tree: AstNode) -> Self {
        Kernel {
            id,
            block_dim: Vec::new(),
            grid_size,
            block_ids: Vec::new(),
            thread_ids: Vec::new(),
            arrays: Vec::new(),
            params: Vec::new(),
            vars: Vec::new(),
            tree,
        }
    }

    pub fn name(&self) -> String {
        format!("kernel{}", self.id)
    }
}

// ── Kernel statements ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStmt {
    Copy(CopyStmt),
    Domain(DomainStmt),
    Break(BreakStmt),
}

/// Transfer of one element between global and local memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyStmt {
    /// `true`: global → local; `false`: local → global.
    pub read: bool,
    pub array: String,
    /// Global-side access expression.
    pub index: AstExpr,
    /// Local-side access expression.
    pub local_index: AstExpr,
}

/// An instance of an original statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStmt {
    pub stmt: SourceStmt,
    #[serde(default)]
    pub ref2expr: Substitutions,
}

/// An early exit out of the loop iterating `loop_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakStmt {
    pub loop_id: String,
    /// The guard's own iterator is compared instead of the raw loop id.
    #[serde(default)]
    pub is_inner: bool,
    /// The domain statement whose guard holds the exit condition.
    pub domain: StmtId,
}

// ── Emission unit ───────────────────────────────────────────────────────────

/// Everything printed into one output text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub prog: Prog,
    pub host: AstNode,
    #[serde(default)]
    pub kernels: Vec<Kernel>,
    #[serde(default)]
    pub stmts: Vec<KernelStmt>,
}

impl Unit {
    pub fn new(prog: Prog, host: AstNode) -> Self {
        Unit {
            prog,
            host,
            kernels: Vec::new(),
            stmts: Vec::new(),
        }
    }

    /// Append a statement and return its id.
    pub fn push_stmt(&mut self, stmt: KernelStmt) -> StmtId {
        self.stmts.push(stmt);
        StmtId((self.stmts.len() - 1) as u32)
    }

    pub fn stmt(&self, id: StmtId) -> Result<&KernelStmt, EmitError> {
        self.stmts
            .get(id.0 as usize)
            .ok_or(EmitError::UnknownStmt(id))
    }

    pub fn kernel(&self, id: KernelId) -> Result<&Kernel, EmitError> {
        self.kernels
            .iter()
            .find(|k| k.id == id)
            .ok_or(EmitError::UnknownKernel(id))
    }

    /// The domain statement a break statement (`brk`, with id `id`) refers to.
    pub fn break_domain(&self, id: StmtId, brk: &BreakStmt) -> Result<&DomainStmt, EmitError> {
        match self.stmt(brk.domain)? {
            KernelStmt::Domain(domain) => Ok(domain),
            _ => Err(EmitError::BreakTarget {
                brk: id,
                target: brk.domain,
            }),
        }
    }
}
