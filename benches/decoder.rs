//! Benchmarks for bytecode decoding and call graph construction.
//!
//! - Decoding bodies made of short, long and token-carrying instructions
//! - Decoding a body whose tokens all resolve through an in-memory loader
//! - Building the assembly-wide call graph of a synthetic binary
//! - Building a depth-bounded subgraph from its entry method

extern crate dotprobe;

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use dotprobe::{
    analysis::CallGraph,
    assembly::decode_body,
    metadata::{
        loader::InMemoryAssembly,
        method::MethodDescriptor,
        token::Token,
    },
};

/// 1000 x (ldarg.0, ldc.i4 0x12345678, add, stloc.0), then ret.
fn arithmetic_body() -> Vec<u8> {
    let mut code = Vec::new();
    for _ in 0..1000 {
        code.extend_from_slice(&[0x02, 0x20, 0x78, 0x56, 0x34, 0x12, 0x58, 0x0A]);
    }
    code.push(0x2A);
    code
}

/// A binary with `count` methods, each calling the next two (wrapping around).
fn chained_assembly(count: u32) -> (InMemoryAssembly, Arc<MethodDescriptor>) {
    let mut assembly = InMemoryAssembly::new("Bench");
    let mut first = None;

    for row in 1..=count {
        let mut code = Vec::new();
        for callee in [row % count + 1, (row + 1) % count + 1] {
            code.push(0x28);
            code.extend_from_slice(&(0x0600_0000 | callee).to_le_bytes());
        }
        code.push(0x2A);

        let method = assembly.add_method(
            MethodDescriptor::new("Bench", "Bench.Chain", &format!("M{row}"))
                .with_token(Token::new(0x0600_0000 | row)),
            code,
        );
        first.get_or_insert(method);
    }

    let root = first.unwrap_or_else(|| Arc::new(MethodDescriptor::new("Bench", "Bench.Chain", "M")));
    (assembly, root)
}

fn bench_decode_arithmetic(c: &mut Criterion) {
    let code = arithmetic_body();

    c.bench_function("decode_arithmetic_4001", |b| {
        b.iter(|| {
            let decoded = decode_body(black_box(&code), &());
            black_box(decoded)
        });
    });
}

fn bench_decode_switch_and_branches(c: &mut Criterion) {
    // switch with 64 targets, br.s, brtrue (long), ret
    let mut code = vec![0x45, 0x40, 0x00, 0x00, 0x00];
    code.extend(std::iter::repeat(0x00).take(64 * 4));
    code.extend_from_slice(&[0x2B, 0x00, 0x3A, 0x00, 0x00, 0x00, 0x00, 0x2A]);

    c.bench_function("decode_switch_branches", |b| {
        b.iter(|| {
            let decoded = decode_body(black_box(&code), &());
            black_box(decoded)
        });
    });
}

fn bench_decode_resolved_calls(c: &mut Criterion) {
    let (assembly, _) = chained_assembly(64);
    let mut code = Vec::new();
    for row in 1..=64u32 {
        code.push(0x28);
        code.extend_from_slice(&(0x0600_0000 | row).to_le_bytes());
    }
    code.push(0x2A);

    c.bench_function("decode_resolved_calls_64", |b| {
        b.iter(|| {
            let decoded = decode_body(black_box(&code), &assembly);
            black_box(decoded)
        });
    });
}

fn bench_callgraph_assembly(c: &mut Criterion) {
    let (assembly, _) = chained_assembly(2000);

    c.bench_function("callgraph_assembly_2000", |b| {
        b.iter(|| {
            let graph = CallGraph::build_assembly(black_box(&assembly));
            black_box(graph)
        });
    });
}

fn bench_callgraph_subgraph(c: &mut Criterion) {
    let (assembly, root) = chained_assembly(2000);

    c.bench_function("callgraph_subgraph_depth_8", |b| {
        b.iter(|| {
            let graph = CallGraph::build_subgraph(black_box(&assembly), &root, 8);
            black_box(graph)
        });
    });
}

criterion_group!(
    benches,
    bench_decode_arithmetic,
    bench_decode_switch_and_branches,
    bench_decode_resolved_calls,
    bench_callgraph_assembly,
    bench_callgraph_subgraph,
);
criterion_main!(benches);
