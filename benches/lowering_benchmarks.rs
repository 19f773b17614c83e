//! Benchmarks for index notation lowering.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use index_notation::frontend::{self, TensorEnv};
use index_notation::ir::{Access, Assignment, IndexStmt};
use index_notation::transform::{make_concrete_notation, make_reduction_notation, simplify};
use std::collections::HashSet;

const MATMUL: &str = "A(i,j) = B(i,k) * C(k,j)";
const MTTKRP: &str = "A(i,j) = B(i,k,l) * D(l,j) * C(k,j)";
const MIXED: &str = "y(i) = sum(j, B(i,j) * x(j)) + sum(k, D(i,k)) * z(i)";

fn parse(source: &str, env: &mut TensorEnv) -> IndexStmt {
    frontend::parse(source, env).unwrap()
}

fn assignment(source: &str) -> Assignment {
    let mut env = TensorEnv::new();
    parse(source, &mut env).to_assignment().unwrap().clone()
}

/// Benchmark parsing speed.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_mttkrp", |b| {
        b.iter(|| {
            let mut env = TensorEnv::new();
            parse(black_box(MTTKRP), &mut env)
        })
    });
}

/// Benchmark einsum to reduction notation.
fn bench_reduction_notation(c: &mut Criterion) {
    let matmul = assignment(MATMUL);
    let mttkrp = assignment(MTTKRP);

    c.bench_function("reduction_matmul", |b| {
        b.iter(|| make_reduction_notation(black_box(&matmul)).unwrap())
    });
    c.bench_function("reduction_mttkrp", |b| {
        b.iter(|| make_reduction_notation(black_box(&mttkrp)).unwrap())
    });
}

/// Benchmark lowering to concrete notation, including temporaries.
fn bench_concrete_notation(c: &mut Criterion) {
    let mttkrp = assignment(MTTKRP);
    let mixed = assignment(MIXED);

    c.bench_function("concrete_mttkrp", |b| {
        b.iter(|| make_concrete_notation(black_box(&mttkrp)).unwrap())
    });
    c.bench_function("concrete_with_temporaries", |b| {
        b.iter(|| make_concrete_notation(black_box(&mixed)).unwrap())
    });
}

/// Benchmark zero propagation.
fn bench_simplify(c: &mut Criterion) {
    let mut env = TensorEnv::new();
    let stmt = parse("a(i) = (B(i,j) + C(i,j)) * d(j) - C(i,j) * e(j)", &mut env);
    let zero: Access = frontend::parse_access("C(i,j)", &mut env).unwrap();
    let zeroed: HashSet<Access> = [zero].into_iter().collect();
    let rhs = stmt.to_assignment().unwrap().rhs().clone();

    c.bench_function("simplify_zero", |b| {
        b.iter(|| simplify(black_box(&rhs), &zeroed))
    });
}

criterion_group!(
    benches,
    bench_parsing,
    bench_reduction_notation,
    bench_concrete_notation,
    bench_simplify,
);
criterion_main!(benches);
