// decl.rs — Array declarations, argument entries and call-site arguments
//
// Renders one array's type and name in the three places a generated
// procedure needs it: as a kernel parameter declaration, as an entry of the
// program procedure's argument list, and as the expression passed at a
// kernel launch. Also prints the host-side sizes and local declarations the
// program procedure needs for its arrays.
//
// Preconditions: array descriptors are consistent (`n_index == bound.len()`).
// Postconditions: only linearized or scalar arrays reach argument position.
// Failure modes: a fixed-size multi-dimensional array in argument position
//   returns `EmitError::UnsupportedLayout`.
// Side effects: `print_local_declarations` appends lines to the printer.

use crate::error::EmitError;
use crate::printer::Printer;
use crate::prog::{ArrayInfo, Prog};

/// Prefix of the device-resident copy of a host array.
pub const DEVICE_PREFIX: &str = "dev_";

fn is_fixed_size(array: &ArrayInfo) -> bool {
    array.n_index != 0 && !array.linearize
}

/// Kernel parameter declaration of `array`.
///
/// `memory_space` (e.g. `__global__`) prefixes every form except read-only
/// scalars, which are passed by value.
pub fn print_declaration_argument(array: &ArrayInfo, memory_space: Option<&str>) -> String {
    if array.is_read_only_scalar() {
        return format!("{} {}", array.elem_type, array.name);
    }
    let mut s = String::new();
    if let Some(space) = memory_space {
        s.push_str(space);
        s.push(' ');
    }
    if is_fixed_size(array) {
        s.push_str(&format!("{} {}", array.elem_type, array.bound_expr()));
    } else {
        s.push_str(&format!("{} *{}", array.elem_type, array.name));
    }
    s
}

/// Only pointer layouts can be passed to a generated procedure.
pub fn check_argument_layout(array: &ArrayInfo) -> Result<(), EmitError> {
    if is_fixed_size(array) {
        return Err(EmitError::UnsupportedLayout {
            array: array.name.clone(),
            loc: array.loc,
        });
    }
    Ok(())
}

/// Argument-list entry of `array` in a procedure declaration.
pub fn print_argument_entry(array: &ArrayInfo) -> Result<String, EmitError> {
    if array.is_read_only_scalar() {
        return Ok(format!("{} {}", array.elem_type, array.name));
    }
    check_argument_layout(array)?;
    Ok(format!("{} *{}", array.elem_type, array.name))
}

/// Expression passed for `array` when launching a kernel.
pub fn print_call_argument(array: &ArrayInfo) -> String {
    if array.is_read_only_scalar() {
        array.name.clone()
    } else {
        format!("{}{}", DEVICE_PREFIX, array.name)
    }
}

/// Size in bytes of `array`: `(b0) * (b1) * sizeof(type)`.
pub fn print_array_size(array: &ArrayInfo) -> String {
    let mut s = String::new();
    for bound in &array.bound {
        s.push_str(&format!("({}) * ", bound));
    }
    s.push_str(&format!("sizeof({})", array.elem_type));
    s
}

/// Declare every array the program procedure must hold locally.
pub fn print_local_declarations(p: &mut Printer, prog: &Prog) {
    for array in prog.arrays.iter().filter(|a| a.declare_local) {
        p.line(&format!("{} {};", array.elem_type, array.bound_expr()));
    }
}
