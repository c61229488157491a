//! Benchmarks for the compilation pipeline.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qcomp_compile::{BackendRegistry, CompilationConstraints, CompileBudget};
use qcomp_ir::{Circuit, QubitId};

fn ladder(num_qubits: u32, layers: u32) -> Circuit {
    let mut circuit = Circuit::with_size("ladder", num_qubits, 0);
    for layer in 0..layers {
        for q in 0..num_qubits {
            circuit.h(QubitId(q)).unwrap();
            circuit.rz(0.1 * f64::from(layer + 1), QubitId(q)).unwrap();
        }
        for q in 0..num_qubits {
            circuit
                .cx(QubitId(q), QubitId((q + 2) % num_qubits))
                .unwrap();
        }
    }
    circuit
}

fn bench_backends(c: &mut Criterion) {
    let registry = BackendRegistry::with_defaults();
    let circuit = ladder(5, 20);
    let mut group = c.benchmark_group("compile_5q_20l");

    for backend_id in ["ideal-simulator", "linear-5q", "star-5q"] {
        let backend = registry.get(backend_id).unwrap();
        for level in [0u8, 3] {
            let constraints = CompilationConstraints::new(backend_id, level);
            group.bench_with_input(
                BenchmarkId::new(backend_id, level),
                &constraints,
                |b, constraints| {
                    b.iter(|| {
                        backend
                            .compile(black_box(&circuit), constraints, &CompileBudget::unlimited())
                            .unwrap()
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_backends);
criterion_main!(benches);
