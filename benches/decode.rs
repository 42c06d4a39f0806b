use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use haproxy_runtime::stat::STAT_COLUMNS;
use haproxy_runtime::{find_counter, parse_show_servers_state, parse_show_stat};

/// `show stat` response with `servers` server rows plus the backend row
fn stat_response(servers: usize) -> Vec<u8> {
    let mut response = format!("# {}\n", STAT_COLUMNS.join(","));
    for i in 0..=servers {
        let mut columns = vec!["0".to_string(); STAT_COLUMNS.len()];
        columns[0] = "indexws".to_string();
        columns[1] = if i == servers {
            "BACKEND".to_string()
        } else {
            format!("iws{:03}", i)
        };
        columns[4] = (i % 17).to_string();
        columns[17] = "UP".to_string();
        columns[32] = if i == servers { "1" } else { "2" }.to_string();
        columns[36] = "L7OK".to_string();
        response.push_str(&columns.join(","));
        response.push_str(",\n");
    }
    response.into_bytes()
}

/// `show servers state` response with `servers` rows
fn servers_state_response(servers: usize) -> Vec<u8> {
    let mut response = String::from("1\n# be_id be_name srv_id srv_name ...\n");
    for i in 0..servers {
        response.push_str(&format!(
            "4 indexws {} iws{:03} 172.24.21.{} 2 0 1 1 96 15 3 4 6 0 0 0 - 8080 - 0 0 - - 0\n",
            i + 1,
            i,
            i % 250
        ));
    }
    response.into_bytes()
}

/// `show stat` decoding benchmarks
fn bench_show_stat(c: &mut Criterion) {
    let mut group = c.benchmark_group("show_stat");

    for servers in [10, 100, 1000].iter() {
        let response = stat_response(*servers);
        group.bench_with_input(
            BenchmarkId::new("parse", servers),
            &response,
            |b, response| {
                b.iter(|| {
                    let records = parse_show_stat(black_box(response)).unwrap();
                    black_box(records);
                });
            },
        );
    }

    let records = parse_show_stat(&stat_response(1000)).unwrap();
    group.bench_function("find_counter", |b| {
        b.iter(|| {
            black_box(find_counter(&records, black_box("indexws"), black_box("iws999")));
        });
    });

    group.finish();
}

/// `show servers state` decoding benchmarks
fn bench_show_servers_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("show_servers_state");

    for servers in [10, 100, 1000].iter() {
        let response = servers_state_response(*servers);
        group.bench_with_input(
            BenchmarkId::new("parse", servers),
            &response,
            |b, response| {
                b.iter(|| {
                    let records = parse_show_servers_state(black_box(response)).unwrap();
                    black_box(records);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_show_stat, bench_show_servers_state);
criterion_main!(benches);
