// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! bpf-export-dump - Decode recorded eBPF event frames.
//!
//! Usage:
//!   bpf-export-dump --types event.json --input capture.bpfx
//!   bpf-export-dump --types types.json --struct sched_switch --input capture.bpfx --format jsonl
//!   bpf-export-dump --types event.json --layout
//!
//! The types file holds either one struct tree or an array of
//! `{ "name": ..., "type": ... }` entries registered in order, so later
//! entries can `ref` earlier ones.

use anyhow::{bail, Context, Result};
use bpf_export::metrics::export_prometheus;
use bpf_export::{
    create_sink, Endianness, EventStream, ExportFormat, FieldKind, FrameReader, OutputConfig,
    StopHandle, StreamConfig, StructLayout, TypeCatalog, TypeNode,
};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bpf-export-dump")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decode recorded eBPF event frames with a JSON type description")]
struct Args {
    /// Type description file (JSON)
    #[arg(short, long)]
    types: PathBuf,

    /// Struct to decode (default: last type in the file)
    #[arg(short = 's', long = "struct")]
    struct_name: Option<String>,

    /// Recorded frame file (.bpfx)
    #[arg(short, long, required_unless_present = "layout")]
    input: Option<PathBuf>,

    /// Output format (text, json, jsonl, csv)
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    format: ExportFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    append: bool,

    /// Byte order of the recorded frames
    #[arg(long, value_enum, default_value = "native")]
    byte_order: ByteOrderArg,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,

    /// Omit the CSV header row
    #[arg(long)]
    no_header: bool,

    /// Mark strings that filled their array without a terminator
    #[arg(long)]
    show_truncation: bool,

    /// Print the resolved layout and exit
    #[arg(long)]
    layout: bool,

    /// Print stream metrics (Prometheus text) to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ByteOrderArg {
    Native,
    Little,
    Big,
}

impl From<ByteOrderArg> for Endianness {
    fn from(arg: ByteOrderArg) -> Self {
        match arg {
            ByteOrderArg::Native => Endianness::Native,
            ByteOrderArg::Little => Endianness::Little,
            ByteOrderArg::Big => Endianness::Big,
        }
    }
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse::<ExportFormat>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging (RUST_LOG wins over --log-level)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bpf_export={lvl},bpf_export_dump={lvl}",
            lvl = args.log_level
        ))
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let text = std::fs::read_to_string(&args.types)
        .with_context(|| format!("Failed to read types file {}", args.types.display()))?;
    let catalog = Arc::new(TypeCatalog::new());
    let last = load_types(&catalog, &text)
        .with_context(|| format!("Failed to load types from {}", args.types.display()))?;
    let struct_name = args.struct_name.clone().unwrap_or(last);

    let layout = match catalog.layout(&struct_name) {
        Some(layout) => layout,
        None => {
            let tree_hint = catalog.resolve(&struct_name).map(|d| d.kind.label());
            match tree_hint {
                Some(kind) => bail!("`{}` is a {}, not a decodable struct", struct_name, kind),
                None => bail!(
                    "No struct named `{}` (known: {})",
                    struct_name,
                    catalog.names().join(", ")
                ),
            }
        }
    };

    if args.layout {
        print!("{}", describe_layout(&layout));
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        bail!("--input is required unless --layout is given");
    };
    run_stream(&args, catalog, &struct_name, input)
}

/// Register every type in `text`; returns the name of the last one.
fn load_types(catalog: &TypeCatalog, text: &str) -> Result<String> {
    let doc: serde_json::Value = serde_json::from_str(text).context("Invalid JSON")?;
    let entries: Vec<(String, TypeNode)> = match doc {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, mut item)| {
                let name = item
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .with_context(|| format!("Entry {} has no name", i))?;
                let ty = item
                    .get_mut("type")
                    .map(serde_json::Value::take)
                    .with_context(|| format!("Entry `{}` has no type", name))?;
                let node: TypeNode = serde_json::from_value(ty)
                    .with_context(|| format!("Entry `{}` is not a type tree", name))?;
                Ok((name, node))
            })
            .collect::<Result<_>>()?,
        other => {
            let node: TypeNode =
                serde_json::from_value(other).context("Document is not a type tree")?;
            let name = node.name().to_string();
            if name.is_empty() {
                bail!("Top-level type has no name");
            }
            vec![(name, node)]
        }
    };

    let mut last = None;
    for (name, node) in entries {
        if matches!(node, TypeNode::Struct { .. }) {
            catalog
                .register_struct(&name, &node)
                .with_context(|| format!("Cannot register struct `{}`", name))?;
        } else {
            catalog
                .register(&name, &node)
                .with_context(|| format!("Cannot register type `{}`", name))?;
        }
        last = Some(name);
    }
    last.context("Types file is empty")
}

fn describe_layout(layout: &StructLayout) -> String {
    let mut out = format!(
        "struct {} (size {}, align {}, data extent {})\n",
        layout.name(),
        layout.size_bytes(),
        layout.alignment(),
        layout.data_extent()
    );
    for leaf in layout.leaves() {
        let kind = match &leaf.kind {
            FieldKind::Integer { width, signed } => {
                format!("{}{}", if *signed { "i" } else { "u" }, width * 8)
            }
            FieldKind::CharArray { capacity } => format!("char[{}]", capacity),
            FieldKind::Enum(e) => format!("enum({} variants)", e.variants.len()),
            FieldKind::Struct(s) => format!("struct {}", s.name()),
        };
        out.push_str(&format!(
            "  {:>5} {:>4}  {:<24} {}\n",
            leaf.offset, leaf.size, leaf.path, kind
        ));
    }
    out
}

fn run_stream(
    args: &Args,
    catalog: Arc<TypeCatalog>,
    struct_name: &str,
    input: &Path,
) -> Result<()> {
    let mut source = FrameReader::open(input)
        .with_context(|| format!("Failed to open frame file {}", input.display()))?;

    let output = match &args.output {
        Some(path) => OutputConfig::File {
            path: path.clone(),
            append: args.append,
        },
        None => OutputConfig::Stdout,
    };
    let mut sink = create_sink(&output).context("Failed to open output")?;

    let config = StreamConfig::builder(struct_name)
        .format(args.format)
        .pretty_json(args.pretty)
        .csv_header(!args.no_header)
        .show_truncation(args.show_truncation)
        .byte_order(args.byte_order.into())
        .poll_timeout(Duration::from_millis(100))
        .build();

    let mut stream = EventStream::new(catalog, config);
    ctrlc_handler(stream.stop_handle());

    tracing::info!(
        input = %input.display(),
        struct_name = %struct_name,
        format = %args.format,
        "Replaying frames"
    );
    stream.run(&mut source, &mut sink).context("Event stream error")?;

    let snapshot = stream.metrics().snapshot();
    tracing::info!(
        frames = source.frames_read(),
        decoded = snapshot.decoded,
        dropped = snapshot.dropped(),
        "Replay complete"
    );
    if args.metrics {
        eprint!("{}", export_prometheus(&snapshot, "bpf_export"));
    }
    Ok(())
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop_handle: StopHandle) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        stop_handle.stop();
    });
}
