// copy.rs — Copy statements between global and local memory
//
// A copy statement moves one element between an array in global memory and
// its shared/private copy. The statement's `read` flag is the only thing
// deciding the direction of the printed assignment.
//
// Preconditions: `array` is the descriptor named by `stmt.array`.
// Postconditions: exactly one line, terminated by `;`.
// Failure modes: none.
// Side effects: appends one line to the printer.

use crate::printer::Printer;
use crate::prog::{ArrayInfo, CopyStmt};

fn local_side(stmt: &CopyStmt) -> String {
    stmt.local_index.to_string()
}

/// Scalars live behind a pointer unless they are only read.
fn global_side(stmt: &CopyStmt, array: &ArrayInfo) -> String {
    if array.is_scalar() {
        if array.is_read_only_scalar() {
            array.name.clone()
        } else {
            format!("*{}", array.name)
        }
    } else {
        stmt.index.to_string()
    }
}

/// Print `local = global;` for a read copy, `global = local;` otherwise.
pub fn print_copy(p: &mut Printer, stmt: &CopyStmt, array: &ArrayInfo) {
    let local = local_side(stmt);
    let global = global_side(stmt, array);
    let (lhs, rhs) = if stmt.read {
        (local, global)
    } else {
        (global, local)
    };
    p.line(&format!("{} = {};", lhs, rhs));
}
