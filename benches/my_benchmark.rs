use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use relq::{Database, Table};
use std::hint::black_box;

fn setup_populated_db(n: usize) -> Database {
    let mut db = Database::new();

    let rows = (0..n)
        .map(|i| {
            let i = i as i64;
            vec![i, (i * 7919) % 1000, i % 100, i % 50]
        })
        .collect();
    let sales = Table::from_rows(
        "sales",
        vec!["saleid".into(), "itemid".into(), "customerid".into(), "qty".into()],
        rows,
    )
    .unwrap();
    db.insert_table(sales);

    let customers = Table::from_rows(
        "customers",
        vec!["id".into(), "region".into()],
        (0..100).map(|i| vec![i, i % 4]).collect(),
    )
    .unwrap();
    db.insert_table(customers);
    db
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("Command_Parsing");
    group.bench_function("parse_select", |b| {
        let parser = relq::CommandParser::new();
        b.iter(|| {
            let statement = parser
                .parse_statement(black_box("r := select(sales, qty > 10)"))
                .unwrap();
            black_box(statement);
        });
    });
    group.finish();
}

fn bench_select_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Select_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                let res = db.execute("r := select(sales, qty = 42)").unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_sort_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sort_Performance");

    // quadratic, so kept small
    for n in [500, 2000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                black_box(db.execute("r := sort(sales, itemid)").unwrap());
            });
        });
    }
    group.finish();
}

fn bench_join_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Join_Performance");

    for n in [1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                black_box(
                    db.execute("r := join(sales, customers, sales.customerid = customers.id)")
                        .unwrap(),
                );
            });
        });
    }
    group.finish();
}

fn bench_group_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Group_Aggregate_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                black_box(db.execute("r := sumgroup(sales, qty, customerid)").unwrap());
                black_box(db.execute("m := movavg(sales, qty, 5)").unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_select_scaling,
    bench_sort_performance,
    bench_join_performance,
    bench_group_performance
);
criterion_main!(benches);
