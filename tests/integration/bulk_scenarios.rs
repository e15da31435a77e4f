#![allow(missing_docs)]

use bytes::Bytes;
use graphload::{
    bulk::{
        BufferOptions, Properties, PropertyType, QueryBuffer, TypeHeader, BEGIN_MARKER,
        BULK_COMMAND,
    },
    transport::{RecordingTransport, Reply, Transport, TransportError},
    GraphLoadError, NodeId,
};
use serde_json::json;

fn props(value: serde_json::Value) -> Properties {
    value.as_object().cloned().unwrap_or_default()
}

/// Transport that fails with a protocol error after `ok` successful bulk commands.
struct FlakyTransport {
    ok: usize,
    seen: Vec<Vec<Bytes>>,
}

impl Transport for FlakyTransport {
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError> {
        assert_eq!(name, BULK_COMMAND);
        self.seen.push(args.to_vec());
        if self.seen.len() > self.ok {
            return Err(TransportError::Protocol("connection reset".into()));
        }
        Ok(Reply::Status("OK".into()))
    }
}

#[test]
fn mixed_property_types_share_one_header() {
    let mut buf = QueryBuffer::new(BufferOptions::new("people")).expect("buffer");
    buf.add_node(
        "Person",
        "ada",
        &props(json!({"born": "1815", "ratio": "0.5", "alive": "false", "tags": ["a", 1]})),
    )
    .expect("ada");
    buf.add_node("Person", "alan", &props(json!({"born": 1912, "alive": true})))
        .expect("alan");

    let tasks = buf.into_tasks();
    assert_eq!(tasks.len(), 1);
    let group = &tasks[0].node_groups()[0];
    assert_eq!(group.header().props(), ["born", "ratio", "alive", "tags"]);

    let binary = group.to_binary();
    let (header, used) = TypeHeader::decode(&binary).expect("header decodes");
    assert_eq!(header.label(), "Person");
    let body = &binary[used..];

    let mut ada = vec![PropertyType::Long.tag()];
    ada.extend_from_slice(&1815i64.to_le_bytes());
    ada.push(PropertyType::Double.tag());
    ada.extend_from_slice(&0.5f64.to_le_bytes());
    ada.extend_from_slice(&[PropertyType::Bool.tag(), 0]);
    ada.push(PropertyType::Array.tag());
    ada.extend_from_slice(&2u64.to_le_bytes());
    ada.extend_from_slice(b"\x03a\0");
    ada.push(PropertyType::Long.tag());
    ada.extend_from_slice(&1i64.to_le_bytes());
    assert_eq!(&body[..ada.len()], ada.as_slice());

    let mut alan = vec![PropertyType::Long.tag()];
    alan.extend_from_slice(&1912i64.to_le_bytes());
    alan.push(PropertyType::Null.tag());
    alan.extend_from_slice(&[PropertyType::Bool.tag(), 1]);
    alan.push(PropertyType::Null.tag());
    assert_eq!(&body[ada.len()..], alan.as_slice());
}

#[test]
fn failure_mid_send_reports_the_task_and_stops() {
    let mut buf = QueryBuffer::new(BufferOptions::new("g").max_task_bytes(64)).expect("buffer");
    for i in 0..20 {
        buf.add_node("N", &format!("n{i}"), &props(json!({"i": i})))
            .expect("node");
    }
    let total = buf.stats().tasks;
    assert!(total > 2);

    let mut transport = FlakyTransport {
        ok: 2,
        seen: Vec::new(),
    };
    let err = buf.send(&mut transport).expect_err("third task fails");
    match err {
        GraphLoadError::TransportFailure { task, source } => {
            assert_eq!(task, 2);
            assert!(matches!(source, TransportError::Protocol(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(transport.seen.len(), 3);
    assert_eq!(transport.seen[0][1].as_ref(), BEGIN_MARKER.as_bytes());
    assert_ne!(transport.seen[1][1].as_ref(), BEGIN_MARKER.as_bytes());
}

#[test]
fn every_entity_lands_in_exactly_one_task() {
    let mut buf = QueryBuffer::new(BufferOptions::new("g").max_task_bytes(200)).expect("buffer");
    let labels = ["A", "B", "C"];
    for i in 0..60u64 {
        let label = labels[(i % 3) as usize];
        let id = buf
            .add_node(label, &i.to_string(), &props(json!({"v": i, "s": "x"})))
            .expect("node");
        assert_eq!(id, NodeId(i));
    }
    for i in 1..60u64 {
        buf.add_edge("NEXT", &(i - 1).to_string(), &i.to_string(), &Properties::new())
            .expect("edge");
    }

    let mut transport = RecordingTransport::new();
    buf.send(&mut transport).expect("send");
    let commands = transport.into_commands();

    let (mut nodes, mut edges) = (0u64, 0u64);
    for (index, cmd) in commands.iter().enumerate() {
        let skip = if index == 0 { 2 } else { 1 };
        let count = |i: usize| -> u64 {
            std::str::from_utf8(&cmd.args[skip + i])
                .expect("utf8")
                .parse()
                .expect("count")
        };
        nodes += count(0);
        edges += count(1);
        let groups = count(2) + count(3);
        assert_eq!(cmd.args.len() as u64, skip as u64 + 4 + groups);
    }
    assert_eq!(nodes, 60);
    assert_eq!(edges, 59);
}

#[test]
fn edges_may_be_added_by_id() {
    let mut buf = QueryBuffer::new(BufferOptions::new("g")).expect("buffer");
    let a = buf.add_node("N", "a", &Properties::new()).expect("a");
    let b = buf.add_node("N", "b", &Properties::new()).expect("b");
    buf.add_edge_by_id("E", b, a, &props(json!({"w": 1.25})))
        .expect("edge");

    let tasks = buf.into_tasks();
    let edge = tasks[0].edge_groups()[0].to_binary();
    let header = TypeHeader::new("E", vec!["w".into()]);
    let body = &edge[header.encoded_len()..];
    assert_eq!(&body[..8], &1u64.to_le_bytes());
    assert_eq!(&body[8..16], &0u64.to_le_bytes());
    assert_eq!(body[16], PropertyType::Double.tag());
}
