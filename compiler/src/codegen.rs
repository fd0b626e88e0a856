// codegen.rs — C/CUDA source generation for one emission unit
//
// Prints the type definitions, every kernel definition and the host
// procedure of a program, walking the annotated ASTs and dispatching user
// nodes to the copy, domain and early-exit printers. The procedure's
// declaration and invocation are produced alongside so that the caller can
// place them in other files.
//
// Preconditions: the unit passed `pipeline::validate` (or is known to be
//                consistent); every user node carries an annotation.
// Postconditions: returns `CodegenResult` with the generated text and any
//                 warnings (unrecognised early-exit guards, repeated exit
//                 labels within one function).
// Failure modes: unresolvable annotations and unsupported argument layouts
//                return `EmitError`; nothing is partially returned.
// Side effects: grows the type and macro registries of `EmitState`.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::ast::{Annotation, AstNode, ForNode, IfNode, UserNode};
use crate::copy::print_copy;
use crate::decl::{
    print_array_size, print_call_argument, print_declaration_argument, print_local_declarations,
};
use crate::diag::{codes, Diagnostic};
use crate::early_exit::{break_label, print_break, BreakOutcome};
use crate::error::EmitError;
use crate::macros::{print_macros, MacroSet};
use crate::printer::Printer;
use crate::prog::{ArrayInfo, Kernel, KernelStmt, KernelVar, Prog, Unit, VarKind};
use crate::signature::{print_prog_declaration, print_prog_invocation, print_prog_name};
use crate::source::print_source_tree;
use crate::types::PrintedTypes;

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CodegenResult {
    pub generated: GeneratedCode,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Types, kernels and the host procedure, in that order.
    pub source: String,
    /// Only the type definitions printed for this unit.
    pub types: String,
    /// `void __ppcg_..._prog<id>(...)`, without a trailing `;`.
    pub declaration: String,
    /// The call of the host procedure, one line.
    pub invocation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenOptions {
    /// Prefix for kernel array parameters (e.g. `__global`).
    pub memory_space: Option<String>,
    /// Print element types by name even outside the builtin set.
    /// `None` means "when the program defines types".
    pub custom_types: Option<bool>,
    /// Spaces per indentation level.
    pub indent: usize,
    /// Start the output with a comment naming the bundle digest.
    pub emit_provenance: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            memory_space: None,
            custom_types: None,
            indent: 2,
            emit_provenance: true,
        }
    }
}

impl CodegenOptions {
    pub fn has_custom_types(&self, prog: &Prog) -> bool {
        self.custom_types.unwrap_or(!prog.types.is_empty())
    }
}

/// Registries shared by every program printed into the same output unit.
#[derive(Debug, Default)]
pub struct EmitState {
    pub types: PrintedTypes,
    pub macros: MacroSet,
}

impl EmitState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Print `unit` into a fresh output unit.
pub fn codegen(unit: &Unit, options: &CodegenOptions) -> Result<CodegenResult, EmitError> {
    let mut state = EmitState::new();
    codegen_with_state(unit, options, &mut state)
}

/// Print `unit` into the output unit whose registries are `state`.
pub fn codegen_with_state(
    unit: &Unit,
    options: &CodegenOptions,
    state: &mut EmitState,
) -> Result<CodegenResult, EmitError> {
    let mut ctx = CodegenCtx::new(unit, options, state);
    ctx.emit_all()?;
    Ok(ctx.build_result())
}

// ── Internal context ────────────────────────────────────────────────────────

/// Components of the GPU index variables, innermost first.
const GPU_DIMS: [&str; 3] = ["x", "y", "z"];

struct CodegenCtx<'a> {
    unit: &'a Unit,
    options: &'a CodegenOptions,
    state: &'a mut EmitState,
    p: Printer,
    types: String,
    declaration: String,
    invocation: String,
    diagnostics: Vec<Diagnostic>,
    /// Early-exit labels placed in the function being printed.
    labels: BTreeSet<String>,
}

impl<'a> CodegenCtx<'a> {
    fn new(unit: &'a Unit, options: &'a CodegenOptions, state: &'a mut EmitState) -> Self {
        CodegenCtx {
            unit,
            options,
            state,
            p: Printer::new(options.indent),
            types: String::new(),
            declaration: String::new(),
            invocation: String::new(),
            diagnostics: Vec::new(),
            labels: BTreeSet::new(),
        }
    }

    fn emit_all(&mut self) -> Result<(), EmitError> {
        let unit = self.unit;
        info!(
            "emitting {} ({} kernels, {} statements)",
            print_prog_name(&unit.prog),
            unit.kernels.len(),
            unit.stmts.len()
        );

        self.emit_types();
        for kernel in &unit.kernels {
            self.emit_kernel(kernel)?;
        }
        self.emit_host()?;
        self.emit_invocation()
    }

    fn build_result(self) -> CodegenResult {
        CodegenResult {
            generated: GeneratedCode {
                source: self.p.finish(),
                types: self.types,
                declaration: self.declaration,
                invocation: self.invocation,
            },
            diagnostics: self.diagnostics,
        }
    }

    // ── Sections ──

    fn emit_types(&mut self) {
        let mut p = Printer::new(self.options.indent);
        self.state.types.print_types(&mut p, &self.unit.prog);
        self.types = p.finish();
        if !self.types.is_empty() {
            self.p.print_str(&self.types);
            self.p.blank_line();
        }
    }

    fn emit_kernel(&mut self, kernel: &Kernel) -> Result<(), EmitError> {
        debug!("emitting {}", kernel.name());
        self.labels.clear();
        print_macros(&mut self.p, &kernel.tree, self.unit, &mut self.state.macros)?;

        let header = self.kernel_header(kernel)?;
        self.p.line(&header);
        self.p.line("{");
        self.p.indent();
        self.print_iterators(&kernel.block_ids, "blockIdx");
        self.print_iterators(&kernel.thread_ids, "threadIdx");
        for var in &kernel.vars {
            self.p.line(&kernel_var_declaration(var));
        }
        self.print_node(&kernel.tree)?;
        self.p.dedent();
        self.p.line("}");
        self.p.blank_line();
        Ok(())
    }

    fn emit_host(&mut self) -> Result<(), EmitError> {
        let unit = self.unit;
        let prog = &unit.prog;
        self.labels.clear();
        print_macros(&mut self.p, &unit.host, unit, &mut self.state.macros)?;

        self.declaration = print_prog_declaration(prog, self.options.has_custom_types(prog))?;
        self.p.line(&self.declaration);
        self.p.line("{");
        self.p.indent();
        print_local_declarations(&mut self.p, prog);

        let device = device_arrays(unit);
        for array in &device {
            self.p.line(&format!(
                "{} *{};",
                array.elem_type,
                print_call_argument(array)
            ));
        }
        for array in &device {
            self.p.line(&format!(
                "cudaCheckReturn(cudaMalloc((void **) &{}, {}));",
                print_call_argument(array),
                print_array_size(array)
            ));
        }

        self.print_node(&unit.host)?;

        for array in &device {
            self.p.line(&format!(
                "cudaCheckReturn(cudaFree({}));",
                print_call_argument(array)
            ));
        }
        self.p.dedent();
        self.p.line("}");
        Ok(())
    }

    fn emit_invocation(&mut self) -> Result<(), EmitError> {
        let mut p = Printer::new(self.options.indent);
        print_prog_invocation(&mut p, &self.unit.prog)?;
        self.invocation = p.finish();
        Ok(())
    }

    // ── Kernel pieces ──

    fn kernel_header(&self, kernel: &Kernel) -> Result<String, EmitError> {
        let prog = &self.unit.prog;
        let memory_space = self.options.memory_space.as_deref();
        let mut args = Vec::with_capacity(kernel.arrays.len() + kernel.params.len());
        for name in &kernel.arrays {
            args.push(print_declaration_argument(prog.array(name)?, memory_space));
        }
        args.extend(kernel.params.iter().map(|p| format!("int {}", p)));
        Ok(format!(
            "__global__ void {}({})",
            kernel.name(),
            args.join(", ")
        ))
    }

    /// `int b0 = blockIdx.y, b1 = blockIdx.x;` (the last id varies fastest).
    fn print_iterators(&mut self, ids: &[String], base: &str) {
        if ids.is_empty() {
            return;
        }
        let mut decls: Vec<String> = ids
            .iter()
            .rev()
            .zip(GPU_DIMS)
            .map(|(id, dim)| format!("{} = {}.{}", id, base, dim))
            .collect();
        decls.reverse();
        self.p.line(&format!("int {};", decls.join(", ")));
    }

    fn print_launch(&mut self, kernel: &Kernel) -> Result<(), EmitError> {
        let prog = &self.unit.prog;
        let mut args = Vec::with_capacity(kernel.arrays.len() + kernel.params.len());
        for name in &kernel.arrays {
            args.push(print_call_argument(prog.array(name)?));
        }
        args.extend(kernel.params.iter().cloned());

        let block: Vec<String> = kernel.block_dim.iter().rev().map(|d| d.to_string()).collect();
        let grid: Vec<String> = kernel.grid_size.iter().rev().map(|e| e.to_string()).collect();
        let id = kernel.id;

        self.p.line("{");
        self.p.indent();
        self.p.line(&format!("dim3 k{}_dimBlock({});", id, dims(&block)));
        self.p.line(&format!("dim3 k{}_dimGrid({});", id, dims(&grid)));
        self.p.line(&format!(
            "{} <<<k{id}_dimGrid, k{id}_dimBlock>>> ({});",
            kernel.name(),
            args.join(", "),
            id = id
        ));
        self.p.line("cudaCheckKernel();");
        self.p.dedent();
        self.p.line("}");
        Ok(())
    }

    // ── AST walk ──

    fn print_node(&mut self, node: &AstNode) -> Result<(), EmitError> {
        match node {
            AstNode::For(f) => self.print_for(f),
            AstNode::If(i) => self.print_if(i),
            AstNode::Block(nodes) => {
                for n in nodes {
                    self.print_node(n)?;
                }
                Ok(())
            }
            AstNode::Mark { node, .. } => self.print_node(node),
            AstNode::User(user) => self.print_user(user),
        }
    }

    fn print_for(&mut self, f: &ForNode) -> Result<(), EmitError> {
        self.p.line(&format!(
            "for (int {0} = {1}; {2}; {0} += {3}) {{",
            f.iterator, f.init, f.cond, f.inc
        ));
        self.p.indent();
        self.print_node(&f.body)?;
        self.p.dedent();
        self.p.line("}");
        if self.breaks_out_of(&f.body, &f.iterator)? {
            let label = break_label(&f.iterator);
            self.p.line(&format!("{}: ;", label));
            if !self.labels.insert(label.clone()) {
                warn!("label {} placed twice in one function", label);
                self.diagnostics.push(
                    Diagnostic::warning(format!(
                        "label `{}` is defined by more than one loop over `{}` in the same function",
                        label, f.iterator
                    ))
                    .with_code(codes::W0401)
                    .with_hint("the generated function will not compile; give the loops distinct iterators"),
                );
            }
        }
        Ok(())
    }

    fn print_if(&mut self, i: &IfNode) -> Result<(), EmitError> {
        self.p.line(&format!("if ({}) {{", i.cond));
        self.p.indent();
        self.print_node(&i.then)?;
        self.p.dedent();
        if let Some(otherwise) = &i.otherwise {
            self.p.line("} else {");
            self.p.indent();
            self.print_node(otherwise)?;
            self.p.dedent();
        }
        self.p.line("}");
        Ok(())
    }

    fn print_user(&mut self, user: &UserNode) -> Result<(), EmitError> {
        let unit = self.unit;
        let annotation = user.annotation.ok_or_else(|| EmitError::MissingAnnotation {
            call: user.expr.to_string(),
        })?;

        match annotation {
            Annotation::Kernel(id) => self.print_launch(unit.kernel(id)?),
            Annotation::Stmt(id) => match unit.stmt(id)? {
                KernelStmt::Copy(copy) => {
                    print_copy(&mut self.p, copy, unit.prog.array(&copy.array)?);
                    Ok(())
                }
                KernelStmt::Domain(domain) => {
                    print_source_tree(&mut self.p, &domain.stmt.body, &domain.ref2expr);
                    Ok(())
                }
                KernelStmt::Break(brk) => {
                    let domain = unit.break_domain(id, brk)?;
                    if let BreakOutcome::NoPattern(reason) = print_break(&mut self.p, brk, domain) {
                        self.diagnostics.push(
                            Diagnostic::warning(format!(
                                "early exit from loop `{}` ({}) was not printed: {}",
                                brk.loop_id, id, reason
                            ))
                            .with_code(codes::W0400)
                            .with_hint("only a guard comparing the loop iterator is rewritten"),
                        );
                    }
                    Ok(())
                }
            },
        }
    }

    /// Does `body` contain a break statement leaving the loop over `iterator`?
    fn breaks_out_of(&self, body: &AstNode, iterator: &str) -> Result<bool, EmitError> {
        let unit = self.unit;
        let mut found = false;
        body.foreach_descendant_top_down(&mut |n: &AstNode| -> Result<bool, EmitError> {
            let AstNode::User(UserNode {
                annotation: Some(Annotation::Stmt(id)),
                ..
            }) = n
            else {
                return Ok(true);
            };
            if let KernelStmt::Break(brk) = unit.stmt(*id)? {
                found |= brk.loop_id == iterator;
            }
            Ok(false)
        })?;
        Ok(found)
    }
}

// ── Free helpers ────────────────────────────────────────────────────────────

/// Arrays that need a device copy: those some kernel takes, except
/// read-only scalars, which are passed by value.
fn device_arrays(unit: &Unit) -> Vec<&ArrayInfo> {
    unit.prog
        .arrays
        .iter()
        .filter(|a| !a.is_read_only_scalar())
        .filter(|a| unit.kernels.iter().any(|k| k.arrays.contains(&a.name)))
        .collect()
}

fn kernel_var_declaration(var: &KernelVar) -> String {
    let mut decl = String::new();
    if var.kind == VarKind::Shared {
        decl.push_str("__shared__ ");
    }
    decl.push_str(&var.elem_type);
    decl.push(' ');
    decl.push_str(&var.name);
    for size in &var.size {
        decl.push_str(&format!("[{}]", size));
    }
    decl.push(';');
    decl
}

fn dims(extents: &[String]) -> String {
    if extents.is_empty() {
        "1".to_string()
    } else {
        extents.join(", ")
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
// Unit tests check individual sections; whole-unit output is covered by the
// snapshots in compiler/tests/snapshot_codegen.rs.
