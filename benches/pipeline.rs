//! Pipeline benchmark: raw audit lines → parsed records → feature vector.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use overwatch_agent::features::{FeatureExtractor, SyscallTable};

fn make_window(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!(
                "type=SYSCALL msg=audit(1700000{i}.101:{i}): arch=c000003e syscall=2 success=yes exit=3 comm=\"bench\""
            ),
            1 => format!(
                "type=SYSCALL msg=audit(1700000{i}.102:{i}): arch=c000003e syscall=87 success=no exit=-2 comm=\"bench\""
            ),
            2 => format!(
                "type=PATH msg=audit(1700000{i}.103:{i}): item=0 name=\"/tmp/bench_{i}\""
            ),
            _ => format!("type=CWD msg=audit(1700000{i}.104:{i}): cwd=\"/tmp\""),
        })
        .collect()
}

fn bench_parse_line(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(SyscallTable::x86_64());
    let line =
        "type=SYSCALL msg=audit(1700000000.123:42): arch=c000003e syscall=59 success=yes exit=0";
    c.bench_function("parse_syscall_line", |b| {
        b.iter(|| black_box(extractor.parse_line(black_box(line))))
    });
}

fn bench_process_window(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(SyscallTable::x86_64());
    let mut g = c.benchmark_group("process_window");
    for n in [100, 1000, 10000] {
        let window = make_window(n);
        g.bench_function(format!("lines_{}", n).as_str(), |b| {
            b.iter(|| black_box(extractor.process_window(black_box(&window), 0)))
        });
    }
    g.finish();
}

criterion_group!(benches, bench_parse_line, bench_process_window);
criterion_main!(benches);
