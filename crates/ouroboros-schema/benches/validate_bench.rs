//! Schema compilation and validation throughput
//!
//! Run with `cargo bench -p ouroboros-schema`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ouroboros_schema::{SchemaCompiler, ValidationConfig, Value};

const SCHEMA: &str = "\
name: str(min=1, max=64)
age: int(min=0, max=150)
tags: list(str(), max=16, required=False)
friends: list(include('person'), required=False)
---
person:
  name: str()
  age: int(min=0)
  email: regex('^[^@]+@[^@]+$', name='email', required=False)
  friends: list(include('person'), required=False)
";

/// Document with `count` friends, each carrying one nested friend
fn document(count: usize) -> Value {
    let friends = (0..count)
        .map(|i| {
            let nested = Value::object([
                ("name", Value::from(format!("nested_{}", i))),
                ("age", Value::Int(i as i64)),
            ]);
            Value::object([
                ("name", Value::from(format!("friend_{}", i))),
                ("age", Value::Int(20 + (i % 50) as i64)),
                ("email", Value::from(format!("friend_{}@example.com", i))),
                ("friends", Value::List(vec![nested])),
            ])
        })
        .collect::<Vec<_>>();

    Value::object([
        ("name", Value::from("root")),
        ("age", Value::Int(42)),
        ("tags", Value::List(vec![Value::from("a"), Value::from("b")])),
        ("friends", Value::List(friends)),
    ])
}

fn bench_compile(c: &mut Criterion) {
    let compiler = SchemaCompiler::new();
    c.bench_function("compile_schema", |b| {
        b.iter(|| compiler.compile_yaml(black_box(SCHEMA)))
    });
}

fn bench_validate(c: &mut Criterion) {
    let Ok(schema) = SchemaCompiler::new().compile_yaml(SCHEMA) else {
        return;
    };
    let config = ValidationConfig::default();

    let mut group = c.benchmark_group("validate");
    for count in [1usize, 10, 100, 1_000] {
        let data = document(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| schema.validate(black_box(data), &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_validate);
criterion_main!(benches);
