use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emblem_convert::{ConversionConfig, ConversionService};
use emblem_core::{create_standard_registry, Argument, Value};

fn service() -> ConversionService {
    ConversionService::new(Arc::new(create_standard_registry()))
}

fn bench_scalars(c: &mut Criterion) {
    let service = service();
    let mut group = c.benchmark_group("scalars");

    let cases = [
        ("string_to_int", Value::string("8080"), Argument::of("Integer")),
        ("string_to_bool", Value::string("yes"), Argument::of("Boolean")),
        ("int_to_string", Value::Int(42), Argument::of("String")),
        ("int_to_number", Value::Int(42), Argument::of("Number")),
        ("string_to_duration", Value::string("250ms"), Argument::of("Duration")),
    ];
    for (name, value, target) in &cases {
        group.bench_with_input(BenchmarkId::new("convert", name), &(value, target), |b, (v, t)| {
            b.iter(|| service.convert_value(black_box(v), (*t).clone()));
        });
    }

    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let service = service();
    let mut group = c.benchmark_group("containers");

    let csv = Value::string("1, 2, 3, 4, 5, 6, 7, 8");
    let list_of_ints = Argument::list_of(Argument::of("Integer"));
    group.bench_function("csv_to_list", |b| {
        b.iter(|| service.convert_value(black_box(&csv), list_of_ints.clone()));
    });

    let boxed = Value::array("Integer", (0..64).map(Value::Int).collect());
    group.bench_function("boxed_to_primitive_array", |b| {
        b.iter(|| service.convert_value(black_box(&boxed), "int[]"));
    });

    group.finish();
}

fn bench_cache_pressure(c: &mut Criterion) {
    // Tiny cache: every lookup of the rotating targets misses and re-walks
    let config = ConversionConfig {
        cache_capacity: 2,
        eviction_percent: 50,
    };
    let service = ConversionService::with_config(Arc::new(create_standard_registry()), &config);
    let targets = ["Byte", "Short", "Integer", "Long", "Float", "Double"];
    let value = Value::string("12");

    c.bench_function("cache_thrash", |b| {
        b.iter(|| {
            for target in &targets {
                black_box(service.convert_value(&value, *target));
            }
        });
    });
}

criterion_group!(benches, bench_scalars, bench_containers, bench_cache_pressure);
criterion_main!(benches);
