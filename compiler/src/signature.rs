// signature.rs — Program procedure declaration and invocation
//
// The host code of a program is wrapped in one procedure. Its declaration
// and its call site are printed from the same ordered argument sequence so
// that they always agree positionally: scalar parameters first, then every
// array the procedure must receive.
//
// Preconditions: `prog.params` is the parameter list of the program context.
// Postconditions: declaration and invocation list the same entries in the
//   same order.
// Failure modes: a fixed-size multi-dimensional array reaching argument
//   position returns `EmitError::UnsupportedLayout`.
// Side effects: `print_prog_invocation` appends one line to the printer.

use crate::decl::{check_argument_layout, print_argument_entry};
use crate::error::EmitError;
use crate::printer::Printer;
use crate::prog::{ArrayInfo, Prog};

/// Element types printed as-is even without a custom type table.
const BUILTIN_TYPES: [&str; 5] = ["float", "double", "int", "char", "short"];

/// One entry of the program procedure's argument list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgArg<'a> {
    Param(&'a str),
    Array(&'a ArrayInfo),
}

/// Visit the procedure arguments of `prog` in order.
///
/// `visit` receives `first == true` only for the first entry. Arrays that
/// are local, never accessed, or read-only scalars already passed as a
/// parameter of the same name are skipped.
pub fn for_each_prog_arg<F>(prog: &Prog, mut visit: F) -> Result<(), EmitError>
where
    F: FnMut(bool, ProgArg<'_>) -> Result<(), EmitError>,
{
    let mut first = true;

    for param in &prog.params {
        visit(first, ProgArg::Param(param))?;
        first = false;
    }

    for array in &prog.arrays {
        if array.local || !array.accessed {
            continue;
        }
        if array.is_read_only_scalar() && prog.has_param(&array.name) {
            continue;
        }
        check_argument_layout(array)?;
        visit(first, ProgArg::Array(array))?;
        first = false;
    }

    Ok(())
}

// ── Argument styles ─────────────────────────────────────────────────────────

/// Declaration-side entry: `int n`, `float *A`, or `void *A` for element
/// types the includer may not know about.
pub fn print_prog_parameter(
    out: &mut String,
    first: bool,
    arg: ProgArg<'_>,
    has_custom_types: bool,
) -> Result<(), EmitError> {
    if !first {
        out.push_str(", ");
    }
    match arg {
        ProgArg::Param(name) => {
            out.push_str("int ");
            out.push_str(name);
        }
        ProgArg::Array(array)
            if array.is_read_only_scalar()
                || has_custom_types
                || BUILTIN_TYPES.contains(&array.elem_type.as_str()) =>
        {
            out.push_str(&print_argument_entry(array)?);
        }
        ProgArg::Array(array) => {
            out.push_str("void *");
            out.push_str(&array.name);
        }
    }
    Ok(())
}

/// Call-side entry: the bare name, or a pointer cast that works for both
/// pointer-typed and array-typed host variables.
pub fn print_prog_argument(out: &mut String, first: bool, arg: ProgArg<'_>) {
    if !first {
        out.push_str(", ");
    }
    match arg {
        ProgArg::Param(name) => out.push_str(name),
        ProgArg::Array(array) if array.is_read_only_scalar() => out.push_str(&array.name),
        ProgArg::Array(array) if array.is_scalar() => {
            out.push_str(&format!("({}*)&{}", array.elem_type, array.name));
        }
        ProgArg::Array(array) => {
            out.push_str(&format!("({}*)&{}[0]", array.elem_type, array.name));
        }
    }
}

// ── Procedure ───────────────────────────────────────────────────────────────

/// `__ppcg_<function>_prog<id>`, or `__ppcg_prog<id>` without a function name.
pub fn print_prog_name(prog: &Prog) -> String {
    match &prog.function_name {
        Some(func) => format!("__ppcg_{}_prog{}", func, prog.id),
        None => format!("__ppcg_prog{}", prog.id),
    }
}

/// `void <name>(<parameters>)`
pub fn print_prog_declaration(prog: &Prog, has_custom_types: bool) -> Result<String, EmitError> {
    let mut params = String::new();
    for_each_prog_arg(prog, |first, arg| {
        print_prog_parameter(&mut params, first, arg, has_custom_types)
    })?;
    Ok(format!("void {}({})", print_prog_name(prog), params))
}

/// `<name>(<arguments>);` as one line.
pub fn print_prog_invocation(p: &mut Printer, prog: &Prog) -> Result<(), EmitError> {
    let mut args = String::new();
    for_each_prog_arg(prog, |first, arg| {
        print_prog_argument(&mut args, first, arg);
        Ok(())
    })?;
    p.line(&format!("{}({});", print_prog_name(prog), args));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AstExpr;

    fn linear(ty: &str, name: &str, dims: usize) -> ArrayInfo {
        let mut a = ArrayInfo::new(ty, name, vec![AstExpr::id("N"); dims]);
        a.linearize = true;
        a
    }

    fn sample() -> Prog {
        let mut prog = Prog::new(3);
        prog.function_name = Some("kernel_gemm".into());
        prog.params = vec!["N".into(), "alpha".into()];

        let mut alpha = ArrayInfo::scalar("float", "alpha");
        alpha.read_only_scalar = true;
        let mut beta = ArrayInfo::scalar("float", "beta");
        beta.read_only_scalar = true;
        let mut tmp = linear("float", "tmp", 1);
        tmp.local = true;
        let mut unused = linear("float", "unused", 1);
        unused.accessed = false;

        prog.arrays = vec![
            alpha,
            beta,
            linear("float", "A", 2),
            ArrayInfo::scalar("double", "sum"),
            tmp,
            unused,
            linear("struct pt", "P", 1),
        ];
        prog
    }

    #[test]
    fn prog_name_with_and_without_function() {
        let mut prog = Prog::new(7);
        assert_eq!(print_prog_name(&prog), "__ppcg_prog7");
        prog.function_name = Some("foo".into());
        assert_eq!(print_prog_name(&prog), "__ppcg_foo_prog7");
    }

    #[test]
    fn declaration_lists_params_then_arrays() {
        assert_eq!(
            print_prog_declaration(&sample(), false).unwrap(),
            "void __ppcg_kernel_gemm_prog3(int N, int alpha, float beta, float *A, double *sum, void *P)"
        );
    }

    #[test]
    fn custom_types_keep_their_names() {
        let decl = print_prog_declaration(&sample(), true).unwrap();
        assert!(decl.ends_with("struct pt *P)"), "{}", decl);
    }

    #[test]
    fn invocation_matches_declaration_positions() {
        let mut p = Printer::default();
        print_prog_invocation(&mut p, &sample()).unwrap();
        assert_eq!(
            p.finish(),
            "__ppcg_kernel_gemm_prog3(N, alpha, beta, (float*)&A[0], (double*)&sum, (struct pt*)&P[0]);\n"
        );
    }

    #[test]
    fn first_flag_is_set_once() {
        let mut flags = Vec::new();
        for_each_prog_arg(&sample(), |first, _| {
            flags.push(first);
            Ok(())
        })
        .unwrap();
        assert_eq!(flags, vec![true, false, false, false, false, false]);
    }

    #[test]
    fn first_array_without_params_has_no_separator() {
        let mut prog = Prog::new(0);
        prog.arrays.push(linear("int", "B", 1));
        assert_eq!(
            print_prog_declaration(&prog, false).unwrap(),
            "void __ppcg_prog0(int *B)"
        );
    }

    #[test]
    fn fixed_size_array_aborts_the_signature() {
        let mut prog = sample();
        prog.arrays.push(ArrayInfo::new("float", "F", vec![AstExpr::int(4)]));
        assert!(matches!(
            print_prog_declaration(&prog, false),
            Err(EmitError::UnsupportedLayout { ref array, .. }) if array == "F"
        ));
        let mut p = Printer::default();
        assert!(print_prog_invocation(&mut p, &prog).is_err());
        assert!(p.is_empty());
    }
}
