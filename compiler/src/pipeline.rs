// pipeline.rs — Bundle loading, validation and emission orchestration
//
// Turns the text of an emission bundle into the requested output: decodes
// the unit, checks that every cross-reference resolves, runs code
// generation and selects the part the caller asked for. Errors and warnings
// come back as diagnostics with stable codes.
//
// Preconditions: none (any text is accepted; invalid bundles become errors).
// Postconditions: `EmitOutcome::output` is `Some` iff no error diagnostic was
//                 produced.
// Failure modes: decoding, validation and emission errors, reported as
//                `Diagnostic`s.
// Side effects: logging only.

use std::time::Instant;

use log::{debug, info};

use crate::ast::{Annotation, AstNode};
use crate::codegen::{codegen, CodegenOptions, GeneratedCode};
use crate::diag::Diagnostic;
use crate::error::EmitError;
use crate::id::StmtId;
use crate::prog::{KernelStmt, Unit};

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible outputs.
///
/// `bundle_hash`: SHA-256 of the raw bundle text.
/// `options_fingerprint`: SHA-256 of the compact JSON form of the options.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub bundle_hash: [u8; 32],
    pub options_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the bundle hash (64 characters).
    pub fn bundle_hash_hex(&self) -> String {
        bytes_to_hex(&self.bundle_hash)
    }

    pub fn options_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.options_fingerprint)
    }

    /// Serialize provenance as a JSON string for `--emit build-info`.
    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"bundle_hash\": \"{}\",\n  \"options_fingerprint\": \"{}\",\n  \"compiler_version\": \"{}\"\n}}\n",
            self.bundle_hash_hex(),
            self.options_fingerprint_hex(),
            self.compiler_version,
        )
    }

    /// One-line comment placed at the top of generated code.
    pub fn header_comment(&self) -> String {
        format!(
            "/* kemit {} from bundle sha256:{} */\n",
            self.compiler_version,
            self.bundle_hash_hex()
        )
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(text: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute provenance from the bundle text and the options in effect.
pub fn compute_provenance(bundle: &str, options: &CodegenOptions) -> Provenance {
    // Serializing a plain struct of strings, numbers and booleans cannot fail.
    let canonical = serde_json::to_string(options).unwrap_or_default();
    Provenance {
        bundle_hash: sha256(bundle),
        options_fingerprint: sha256(&canonical),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Loading and validation ─────────────────────────────────────────────────

pub fn load_unit(bundle: &str) -> Result<Unit, EmitError> {
    let unit: Unit = serde_json::from_str(bundle)?;
    debug!(
        "loaded unit: {} arrays, {} kernels, {} statements",
        unit.prog.arrays.len(),
        unit.kernels.len(),
        unit.stmts.len()
    );
    Ok(unit)
}

/// Check that every reference inside `unit` resolves.
///
/// Every user node is annotated and its annotation names an existing kernel
/// or statement; break statements point at domain statements; copies and
/// kernels name existing arrays; every array lists one bound per index.
pub fn validate(unit: &Unit) -> Result<(), EmitError> {
    for array in &unit.prog.arrays {
        if array.n_index != array.bound.len() {
            return Err(EmitError::BoundMismatch {
                array: array.name.clone(),
                n_index: array.n_index,
                bounds: array.bound.len(),
            });
        }
    }
    check_annotations(unit, &unit.host)?;
    for kernel in &unit.kernels {
        check_annotations(unit, &kernel.tree)?;
        for name in &kernel.arrays {
            unit.prog.array(name)?;
        }
    }

    for (i, stmt) in unit.stmts.iter().enumerate() {
        match stmt {
            KernelStmt::Copy(copy) => {
                unit.prog.array(&copy.array)?;
            }
            KernelStmt::Break(brk) => {
                unit.break_domain(StmtId(i as u32), brk)?;
            }
            KernelStmt::Domain(_) => {}
        }
    }
    Ok(())
}

fn check_annotations(unit: &Unit, root: &AstNode) -> Result<(), EmitError> {
    root.foreach_descendant_top_down(&mut |node: &AstNode| -> Result<bool, EmitError> {
        let AstNode::User(user) = node else {
            return Ok(true);
        };
        match user.annotation {
            Some(Annotation::Kernel(id)) => {
                unit.kernel(id)?;
            }
            Some(Annotation::Stmt(id)) => {
                unit.stmt(id)?;
            }
            None => {
                return Err(EmitError::MissingAnnotation {
                    call: user.expr.to_string(),
                })
            }
        }
        Ok(false)
    })
}

// ── Orchestration ──────────────────────────────────────────────────────────

/// Which part of the generated code to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitKind {
    /// Types, kernels and the host procedure.
    Code,
    /// The host procedure's declaration, terminated by `;`.
    Declaration,
    /// The host procedure's call.
    Invocation,
    /// Type definitions only.
    Types,
    /// Provenance JSON; the bundle is not decoded.
    BuildInfo,
}

#[derive(Debug)]
pub struct EmitOutcome {
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub provenance: Provenance,
}

impl EmitOutcome {
    pub fn has_error(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Decode, validate and print `bundle`, returning the part selected by `emit`.
pub fn run(bundle: &str, options: &CodegenOptions, emit: EmitKind) -> EmitOutcome {
    let provenance = compute_provenance(bundle, options);
    if emit == EmitKind::BuildInfo {
        return EmitOutcome {
            output: Some(provenance.to_json()),
            diagnostics: Vec::new(),
            provenance,
        };
    }

    let start = Instant::now();
    let result = load_unit(bundle).and_then(|unit| {
        validate(&unit)?;
        codegen(&unit, options)
    });
    debug!("emission finished in {:?}", start.elapsed());

    match result {
        Ok(result) => {
            info!(
                "generated {} bytes with {} warnings",
                result.generated.source.len(),
                result.diagnostics.len()
            );
            let output = select_output(result.generated, emit, options, &provenance);
            EmitOutcome {
                output: Some(output),
                diagnostics: result.diagnostics,
                provenance,
            }
        }
        Err(err) => EmitOutcome {
            output: None,
            diagnostics: vec![err.to_diagnostic()],
            provenance,
        },
    }
}

fn select_output(
    generated: GeneratedCode,
    emit: EmitKind,
    options: &CodegenOptions,
    provenance: &Provenance,
) -> String {
    match emit {
        EmitKind::Code if options.emit_provenance => {
            let mut out = provenance.header_comment();
            out.push_str(&generated.source);
            out
        }
        EmitKind::Code => generated.source,
        EmitKind::Declaration => format!("{};\n", generated.declaration),
        EmitKind::Invocation => generated.invocation,
        EmitKind::Types => generated.types,
        EmitKind::BuildInfo => provenance.to_json(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
