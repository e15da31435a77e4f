#![forbid(unsafe_code)]

mod support;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graphload::bulk::{BufferOptions, Properties, QueryBuffer};
use graphload::cli::{run_import, EdgeImportConfig, ImportConfig, NodeImportConfig};
use graphload::transport::RecordingTransport;
use serde_json::Value;
use support::datasets::SyntheticDataset;

const NODE_COUNT: usize = 50_000;
const EDGE_COUNT: usize = 200_000;

fn macro_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("macro/import");
    group.sample_size(10);
    group.throughput(Throughput::Elements((NODE_COUNT + EDGE_COUNT) as u64));
    let harness = ImportHarness::new(NODE_COUNT, EDGE_COUNT);
    group.bench_function("synthetic_csv", |b| b.iter(|| black_box(harness.run())));
    group.finish();
}

fn buffer_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("macro/encode");
    group.sample_size(10);
    group.throughput(Throughput::Elements(NODE_COUNT as u64));
    for max in [64 * 1024, 1024 * 1024, 512 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(max), &max, |b, &max| {
            b.iter(|| black_box(encode_nodes(NODE_COUNT, max)))
        });
    }
    group.finish();
}

fn encode_nodes(count: usize, max: usize) -> usize {
    let mut buf = QueryBuffer::new(BufferOptions::new("bench").max_task_bytes(max))
        .expect("buffer");
    let mut props = Properties::new();
    for id in 0..count {
        props.insert("name".into(), Value::String(format!("user-{id}")));
        props.insert("score".into(), Value::String((id % 997).to_string()));
        buf.add_node("User", &id.to_string(), &props).expect("node");
    }
    buf.into_tasks().len()
}

struct ImportHarness {
    dataset: SyntheticDataset,
}

impl ImportHarness {
    fn new(nodes: usize, edges: usize) -> Self {
        Self {
            dataset: SyntheticDataset::ensure(nodes, edges),
        }
    }

    fn run(&self) -> (u64, u64) {
        let mut config = ImportConfig::new("macro-import");
        config.nodes.push(NodeImportConfig {
            label_column: Some("label".into()),
            prop_columns: Some(vec!["name".into()]),
            ..NodeImportConfig::new(&self.dataset.nodes_csv)
        });
        config.edges.push(EdgeImportConfig {
            static_type: Some("FOLLOWS".into()),
            ..EdgeImportConfig::new(&self.dataset.edges_csv)
        });
        config.max_task_bytes = 8 * 1024 * 1024;
        let mut transport = RecordingTransport::new();
        let summary = run_import(&config, &mut transport).expect("import");
        (summary.nodes, summary.edges)
    }
}

criterion_group!(benches, macro_import, buffer_encode);
criterion_main!(benches);
