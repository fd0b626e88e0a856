// id.rs — Stable identifiers for the objects an emission unit refers to
//
// AST annotations and break statements refer to kernels and kernel
// statements by index into the unit's tables instead of by pointer. The
// indices are assigned by the upstream AST builder in creation order and are
// stable for the lifetime of one unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a kernel statement in `Unit::stmts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StmtId(pub u32);

/// Identifier of a kernel (`Kernel::id`), also used in its printed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
