use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use devsweep::paths::ConfinedRoot;
use devsweep::scanner::{self, ScanOptions};
use devsweep::targets;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Create a deterministic workspace tree for benchmarking.
///
/// Each of `projects` project directories gets a `src/` with ordinary files
/// and a `node_modules/` artifact tree with `breadth` package directories of
/// `files_per_pkg` files (~100 bytes each).
fn create_benchmark_tree(root: &Path, projects: usize, breadth: usize, files_per_pkg: usize) {
    for i in 0..projects {
        let project = root.join(format!("project_{:03}", i));
        let src = project.join("src");
        fs::create_dir_all(&src).unwrap();
        for j in 0..5 {
            fs::write(src.join(format!("mod_{}.js", j)), "x".repeat(100)).unwrap();
        }

        let modules = project.join("node_modules");
        for j in 0..breadth {
            let pkg = modules.join(format!("pkg_{:03}", j));
            fs::create_dir_all(&pkg).unwrap();
            for k in 0..files_per_pkg {
                fs::write(pkg.join(format!("file_{:03}.js", k)), "y".repeat(100)).unwrap();
            }
        }
    }
}

fn bench_options(root: &Path) -> ScanOptions {
    ScanOptions {
        root: Arc::new(ConfinedRoot::open(root).unwrap()),
        targets: targets::build_catalog(&[], &[]),
        skip_dirs: scanner::default_skip_dirs(),
        max_depth: 0,
    }
}

/// Run a full scan generation, draining events into the void the way the
/// controller would.
fn run_full_scan(opts: &ScanOptions) {
    let (tx, mut rx) = mpsc::channel(1024);
    let cancel = AtomicBool::new(false);
    scanner::run_scan(opts.clone(), 1, &cancel, &tx);
    drop(tx);
    while let Some(event) = rx.blocking_recv() {
        black_box(event);
    }
}

/// Benchmark full scans over workspaces of increasing size
fn bench_scan_workspaces(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_workspace");
    group.sample_size(20);

    for (label, projects, breadth, files) in [
        ("small", 5, 10, 10),
        ("medium", 10, 20, 20),
        ("large", 20, 30, 30),
    ] {
        let temp_dir = tempfile::TempDir::new().unwrap();
        create_benchmark_tree(temp_dir.path(), projects, breadth, files);
        let opts = bench_options(temp_dir.path());

        group.bench_with_input(BenchmarkId::new("tree", label), &opts, |b, opts| {
            b.iter(|| run_full_scan(black_box(opts)))
        });
    }

    group.finish();
}

/// Benchmark the per-hit size pass in isolation
fn bench_dir_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("dir_size");
    group.sample_size(20);

    for (label, breadth, files) in [("shallow", 20, 20), ("wide", 100, 20)] {
        let temp_dir = tempfile::TempDir::new().unwrap();
        create_benchmark_tree(temp_dir.path(), 1, breadth, files);
        let target = temp_dir.path().join("project_000/node_modules");

        group.bench_with_input(BenchmarkId::new("modules", label), &target, |b, path| {
            b.iter(|| {
                let cancel = AtomicBool::new(false);
                scanner::dir_size(black_box(path), &cancel).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scan_workspaces, bench_dir_size);
criterion_main!(benches);
