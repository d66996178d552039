// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Record frames to a file, replay them through a stream into a JSON Lines sink.

#![allow(clippy::missing_panics_doc)]

use bpf_export::metrics::export_prometheus;
use bpf_export::{
    create_sink, EventStream, ExportFormat, FrameReader, FrameWriter, OutputConfig, RawEvent,
    StreamConfig, TypeCatalog, TypeNode,
};
use std::sync::Arc;
use tempfile::TempDir;

const TASK_TYPES: &str = r#"{
    "kind": "struct", "name": "sched_switch",
    "members": [
        { "name": "cpu",  "type": { "kind": "int", "name": "u16", "size": 2 } },
        { "name": "prev", "type": { "kind": "ref", "name": "task" } },
        { "name": "state", "type": { "kind": "enum", "name": "task_state", "size": 4,
                                      "variants": [ { "name": "RUNNING", "value": 0 },
                                                    { "name": "SLEEPING", "value": 1 } ] } }
    ]
}"#;

const TASK: &str = r#"{
    "kind": "struct", "name": "task", "size": 20,
    "members": [
        { "name": "pid",  "type": { "kind": "int", "name": "pid_t", "size": 4, "signed": true } },
        { "name": "comm", "type": { "kind": "char_array", "len": 16 } }
    ]
}"#;

fn switch_frame(cpu: u16, pid: i32, comm: &str, state: u32) -> Vec<u8> {
    // cpu@0, prev@4 (pid@4, comm@8), state@24, sizeof 28
    let mut frame = vec![0u8; 28];
    frame[0..2].copy_from_slice(&cpu.to_le_bytes());
    frame[4..8].copy_from_slice(&pid.to_le_bytes());
    frame[8..8 + comm.len()].copy_from_slice(comm.as_bytes());
    frame[24..28].copy_from_slice(&state.to_le_bytes());
    frame
}

#[test]
fn test_replay_recorded_frames_as_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let frames_path = temp_dir.path().join("capture.bpfx");
    let out_path = temp_dir.path().join("events.jsonl");

    let mut writer = FrameWriter::create(&frames_path).unwrap();
    writer
        .write_frame(&RawEvent::new(switch_frame(1, 42, "bash", 1)).with_source(1))
        .unwrap();
    writer.write_frame(&RawEvent::new(vec![0u8; 8])).unwrap();
    writer
        .write_frame(&RawEvent::new(switch_frame(3, 7, "kworker/3:1", 9)).with_source(3))
        .unwrap();
    writer.finish().unwrap();

    let catalog = Arc::new(TypeCatalog::new());
    catalog
        .register("task", &TypeNode::from_json(TASK).unwrap())
        .unwrap();
    let layout = catalog
        .register_struct("sched_switch", &TypeNode::from_json(TASK_TYPES).unwrap())
        .unwrap();
    assert_eq!(layout.size_bytes(), 28);

    let config = StreamConfig::builder("sched_switch")
        .format(ExportFormat::JsonLines)
        .byte_order(bpf_export::Endianness::Little)
        .build();
    let mut stream = EventStream::new(catalog, config);
    let mut source = FrameReader::open(&frames_path).unwrap();
    let mut sink = create_sink(&OutputConfig::File {
        path: out_path.clone(),
        append: false,
    })
    .unwrap();
    stream.run(&mut source, &mut sink).unwrap();
    drop(sink);

    let output = std::fs::read_to_string(&out_path).unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(
        lines,
        [
            r#"{"cpu":1,"prev":{"pid":42,"comm":"bash"},"state":"SLEEPING"}"#,
            r#"{"cpu":3,"prev":{"pid":7,"comm":"kworker/3:1"},"state":9}"#,
        ]
    );

    let snapshot = stream.metrics().snapshot();
    assert_eq!(snapshot.received, 3);
    assert_eq!(snapshot.dropped_truncated, 1);
    let exposition = export_prometheus(&snapshot, "bpf");
    assert!(exposition.contains("bpf_events_decoded_total 2\n"));
}
