use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use kemit::*;

// Emission latency: bundle decoding, code generation and the full pipeline
// on the demo bundle, plus generation time as the kernel count grows.

const SAXPY_UNTIL: &str = include_str!("../demos/saxpy_until.json");

fn quiet_options() -> codegen::CodegenOptions {
    codegen::CodegenOptions {
        emit_provenance: false,
        ..codegen::CodegenOptions::default()
    }
}

/// A unit with `n_kernels` kernels, each copying one tile of its own array
/// into shared memory and launched once from a host loop.
fn generate_scaling_unit(n_kernels: usize) -> prog::Unit {
    let parse = |s: &str| -> expr::AstExpr { s.parse().expect("benchmark expression must parse") };

    let mut p = prog::Prog::new(0);
    p.params = vec!["N".into()];
    for k in 0..n_kernels {
        let mut array = prog::ArrayInfo::new("float", format!("A{}", k), vec![parse("N")]);
        array.linearize = true;
        p.arrays.push(array);
    }

    let mut unit = prog::Unit::new(p, ast::AstNode::Block(Vec::new()));
    let mut launches = Vec::with_capacity(n_kernels);
    for k in 0..n_kernels {
        let copy = unit.push_stmt(prog::KernelStmt::Copy(prog::CopyStmt {
            read: true,
            array: format!("A{}", k),
            index: parse(&format!("A{}[32 * b0 + t0]", k)),
            local_index: parse("shared_A[t0]"),
        }));
        let kernel_id = id::KernelId(k as u32);
        let mut kernel = prog::Kernel::new(
            kernel_id,
            vec![parse("ppcg_fdiv_q(N + 31, 32)")],
            ast::AstNode::if_then(parse("32 * b0 + t0 < N"), ast::AstNode::stmt(copy), None),
        );
        kernel.block_dim = vec![32];
        kernel.block_ids = vec!["b0".into()];
        kernel.thread_ids = vec!["t0".into()];
        kernel.arrays = vec![format!("A{}", k)];
        kernel.params = vec!["N".into()];
        unit.kernels.push(kernel);
        launches.push(ast::AstNode::launch(kernel_id));
    }
    unit.host = ast::AstNode::for_loop(
        "c0",
        parse("0"),
        parse("c0 < 4"),
        parse("1"),
        ast::AstNode::Block(launches),
    );
    unit
}

// ── Benchmarks ──────────────────────────────────────────────────────────────

fn bench_load(c: &mut Criterion) {
    c.bench_function("load/saxpy_until", |b| {
        b.iter(|| pipeline::load_unit(black_box(SAXPY_UNTIL)).expect("demo bundle must load"))
    });
}

fn bench_codegen(c: &mut Criterion) {
    let unit = pipeline::load_unit(SAXPY_UNTIL).expect("demo bundle must load");
    let opts = quiet_options();
    c.bench_function("codegen/saxpy_until", |b| {
        b.iter(|| codegen::codegen(black_box(&unit), &opts).expect("demo bundle must emit"))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let opts = codegen::CodegenOptions::default();
    c.bench_function("pipeline/saxpy_until", |b| {
        b.iter(|| {
            let outcome = pipeline::run(black_box(SAXPY_UNTIL), &opts, pipeline::EmitKind::Code);
            assert!(!outcome.has_error());
            outcome
        })
    });
}

fn bench_codegen_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("codegen/scaling");
    let opts = quiet_options();
    for n_kernels in [1usize, 8, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(n_kernels),
            &n_kernels,
            |b, &n| {
                b.iter_batched(
                    || generate_scaling_unit(n),
                    |unit| codegen::codegen(&unit, &opts).expect("scaling unit must emit"),
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_load,
    bench_codegen,
    bench_full_pipeline,
    bench_codegen_scaling,
);
criterion_main!(benches);
