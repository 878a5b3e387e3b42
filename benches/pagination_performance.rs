//! Pagination Performance Benchmarks
//!
//! Measures filter evaluation over a datastore snapshot and the cost of a
//! complete cached crawl compared to querying the datastore for every page.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use scim_connector::{
    ConnectorConfig, Filter, InMemoryStore, PageRequest, PageWindow, PaginationController,
    ResourceStore, ScimUser,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_test_users(count: usize) -> Vec<ScimUser> {
    (1..=count)
        .map(|n| {
            ScimUser::new(format!("user{}@example.com", n))
                .with_id(format!("user-{:06}", n))
                .with_name(format!("User{}", n), "Test")
                .with_email(format!("user{}@example.com", n))
                .with_active(n % 3 != 0)
                .with_custom_attribute("number", json!(n))
        })
        .collect()
}

fn bench_filter_matching(c: &mut Criterion) {
    let users = create_test_users(1000);
    let mut group = c.benchmark_group("filter_matching");
    group.throughput(Throughput::Elements(users.len() as u64));

    for expression in ["active eq true", "number lt 500", r#"userName eq "user999@example.com""#] {
        let filter = Filter::parse(expression).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(expression), &filter, |b, filter| {
            b.iter(|| users.iter().filter(|user| filter.matches(*user)).count())
        });
    }
    group.finish();
}

fn bench_window_slice(c: &mut Criterion) {
    let users = create_test_users(1000);
    c.bench_function("window_slice_page_of_100", |b| {
        b.iter(|| {
            let window = PageWindow::compute(black_box(451), Some(100), users.len(), 200);
            window.slice(&users)
        })
    });
}

fn crawl(rt: &Runtime, controller: &PaginationController<InMemoryStore<ScimUser>>, total: usize, count: usize) {
    rt.block_on(async {
        let mut start = 1;
        while start <= total {
            let request = PageRequest::new()
                .with_start_index(start)
                .with_count(count)
                .with_total_results(total);
            black_box(controller.paginate(&request).await.unwrap());
            start += count;
        }
    });
}

fn bench_crawl(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectorConfig::default().with_cache_dir(dir.path());
    let mut group = c.benchmark_group("crawl");

    for total in [100usize, 1000] {
        let store = Arc::new(InMemoryStore::from_records(create_test_users(total)));
        let controller = rt
            .block_on(PaginationController::open(store.clone(), &config))
            .unwrap();

        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(BenchmarkId::new("cached", total), &total, |b, &total| {
            b.iter(|| crawl(&rt, &controller, total, 50))
        });
        group.bench_with_input(BenchmarkId::new("datastore_per_page", total), &total, |b, &total| {
            b.iter(|| {
                rt.block_on(async {
                    let mut start = 1;
                    while start <= total {
                        let records = store.list(None).await.unwrap();
                        let window = PageWindow::compute(start, Some(50), total, 200);
                        black_box(window.slice(&records));
                        start += 50;
                    }
                })
            })
        });
    }
    group.finish();
}

criterion_group!(
    pagination_benches,
    bench_filter_matching,
    bench_window_slice,
    bench_crawl
);
criterion_main!(pagination_benches);
