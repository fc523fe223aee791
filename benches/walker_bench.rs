//! Benchmarks for mdu
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mdu::walker::{Controller, Expansion, SharedState};
use mdu::MduConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn benchmark_state_operations(c: &mut Criterion) {
    c.bench_function("claim_finish", |b| {
        let state = SharedState::new(1);
        b.iter(|| {
            state.install_job(PathBuf::from("/bench")).unwrap();
            let claim = state.next_task().unwrap();
            claim.finish(Expansion {
                bytes: 4096,
                files: 1,
                listed: true,
                ..Expansion::default()
            });
            black_box(state.await_completion());
        })
    });
}

/// Three levels of eight directories, each holding eight small files
fn build_tree() -> TempDir {
    fn fill(dir: &Path, depth: usize) {
        for f in 0..8 {
            fs::write(dir.join(format!("f{}", f)), vec![0u8; 512]).unwrap();
        }
        if depth == 0 {
            return;
        }
        for d in 0..8 {
            let sub = dir.join(format!("d{}", d));
            fs::create_dir(&sub).unwrap();
            fill(&sub, depth - 1);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    fill(dir.path(), 3);
    dir
}

fn benchmark_tree_walk(c: &mut Criterion) {
    let tree = build_tree();
    let mut group = c.benchmark_group("measure_tree");

    for workers in [1, 2, 4, 8] {
        let controller = Controller::new(&MduConfig::new(workers)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| black_box(controller.measure(tree.path()).unwrap()))
        });
        controller.shutdown();
    }

    group.finish();
}

criterion_group!(benches, benchmark_state_operations, benchmark_tree_walk);
criterion_main!(benches);
