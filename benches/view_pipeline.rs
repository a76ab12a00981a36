use autobi_cli::data::result_set::{CellValue, Column, ResultSet};
use autobi_cli::data::view::{filter_indices, render_page, sort_indices, SortDirection, ViewState};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn create_test_result(rows: usize) -> ResultSet {
    let columns = vec![
        Column::dimension("region"),
        Column::dimension("product"),
        Column::measure("revenue"),
    ];

    let regions = vec![
        "North America",
        "South America",
        "Western Europe",
        "Eastern Europe",
        "Asia Pacific",
        "Middle East",
        "Africa",
        "Oceania",
    ];

    let mut data = Vec::with_capacity(rows);
    for i in 0..rows {
        let region = regions[i % regions.len()].to_string();
        let revenue = if i % 17 == 0 {
            CellValue::Null
        } else {
            CellValue::Number(((i * 37) % 100_000) as f64 / 100.0)
        };
        data.push(vec![
            CellValue::Text(region),
            CellValue::Text(format!("product_{}", i % 500)),
            revenue,
        ]);
    }

    ResultSet::new(columns, data)
}

fn benchmark_filter(c: &mut Criterion) {
    let result_10k = create_test_result(10_000);
    let result_100k = create_test_result(100_000);

    let mut group = c.benchmark_group("filter");

    group.bench_function("10k_rows", |b| {
        b.iter(|| {
            let hits = filter_indices(&result_10k, black_box("europe"));
            assert!(!hits.is_empty());
        });
    });

    group.bench_function("100k_rows", |b| {
        b.iter(|| {
            let hits = filter_indices(&result_100k, black_box("europe"));
            assert!(!hits.is_empty());
        });
    });

    group.finish();
}

fn benchmark_sort(c: &mut Criterion) {
    let result_100k = create_test_result(100_000);
    let all: Vec<usize> = (0..result_100k.row_count()).collect();

    let mut group = c.benchmark_group("sort");

    group.bench_function("numeric_100k", |b| {
        b.iter(|| {
            let mut indices = all.clone();
            sort_indices(
                &result_100k,
                &mut indices,
                black_box("revenue"),
                SortDirection::Descending,
            );
            indices
        });
    });

    group.bench_function("text_100k", |b| {
        b.iter(|| {
            let mut indices = all.clone();
            sort_indices(
                &result_100k,
                &mut indices,
                black_box("region"),
                SortDirection::Ascending,
            );
            indices
        });
    });

    group.finish();
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let result_100k = create_test_result(100_000);

    let mut group = c.benchmark_group("render_page");

    group.bench_function("filter_sort_page_100k", |b| {
        let mut state = ViewState::default();
        state.set_search("europe");
        state.toggle_sort("revenue");
        b.iter(|| {
            let page = render_page(&result_100k, black_box(&state), 25);
            assert_eq!(page.rows.len(), 25);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_filter,
    benchmark_sort,
    benchmark_full_pipeline
);
criterion_main!(benches);
