use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use bindery::{
    resolve_offsets, Diagnostics, RecordingDevice, ShaderProgram, StageConfig, StreamOutOptions,
};
use bindery_dxbc::{DxbcFile, ShaderDescription, SignatureEntry};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "\
shader_reflect: print the reflected bindings of a compiled DXBC shader

USAGE:
    cargo run -p bindery --bin shader_reflect -- <path.dxbc> [--stage S] [--stream-out]

FLAGS:
    --stage S       Also build a program for stage S (vs, ps, hs, ds, gs or cs) and print
                    its binding tables
    --stream-out    With --stage gs, enable stream output (rasterizing stream 0)

Set RUST_LOG=bindery=debug to trace the build; failures are always reported.
"
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn parse_stage(v: &str, stream_out: bool) -> anyhow::Result<StageConfig> {
    Ok(match v {
        "vs" => StageConfig::vertex(),
        "ps" => StageConfig::Pixel,
        "hs" => StageConfig::Hull,
        "ds" => StageConfig::Domain,
        "gs" => StageConfig::Geometry {
            stream_out: stream_out.then_some(StreamOutOptions {
                rasterize_stream: true,
            }),
        },
        "cs" => StageConfig::Compute,
        _ => bail!("invalid --stage value {v:?} (expected vs, ps, hs, ds, gs or cs)"),
    })
}

fn real_main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut path: Option<PathBuf> = None;
    let mut stage: Option<String> = None;
    let mut stream_out = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{}", usage());
                return Ok(());
            }
            "--stage" => {
                let Some(v) = args.next() else {
                    bail!("--stage requires a value");
                };
                stage = Some(v);
            }
            "--stream-out" => stream_out = true,
            _ if arg.starts_with("--stage=") => {
                stage = Some(arg["--stage=".len()..].to_owned());
            }
            _ if arg.starts_with('-') => {
                bail!("unknown option {arg:?}\n\n{}", usage());
            }
            _ => {
                if path.is_some() {
                    bail!("unexpected positional argument {arg:?}\n\n{}", usage());
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    let Some(path) = path else {
        bail!("missing DXBC input path\n\n{}", usage());
    };
    let config = stage
        .as_deref()
        .map(|v| parse_stage(v, stream_out))
        .transpose()?;

    let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let file = DxbcFile::parse(&bytes)
        .with_context(|| format!("failed to parse {} as DXBC", path.display()))?;
    println!("{}", file.debug_summary());

    let desc = bindery_dxbc::reflect_file(&file)
        .with_context(|| format!("failed to reflect {}", path.display()))?;
    println!();
    print_description(&desc);

    if let Some(config) = config {
        println!();
        print_program(config, &bytes)?;
    }
    Ok(())
}

fn print_description(desc: &ShaderDescription) {
    println!("shader: {}_{}", desc.stage.short_name(), desc.model);
    if let Some([x, y, z]) = desc.thread_group_size {
        println!("thread group: {x}x{y}x{z}");
    }

    println!("bound resources:");
    for b in &desc.bound_resources {
        println!(
            "  {:<24} {:?} slot={} count={} space={}",
            b.name, b.input_type, b.bind_point, b.bind_count, b.space
        );
    }

    println!("constant buffers:");
    for cb in &desc.constant_buffers {
        println!("  {} ({:?}, {} bytes)", cb.name, cb.kind, cb.size);
        for var in &cb.variables {
            let shape = var
                .ty
                .as_ref()
                .map(|ty| format!(" {}x{}", ty.rows, ty.columns))
                .unwrap_or_default();
            println!(
                "    +{:<5} {:<24} {} bytes{shape}",
                var.start_offset, var.name, var.size
            );
        }
    }

    print_signature("input signature", &desc.input_signature);
    print_signature("output signature", &desc.output_signature);
}

fn print_signature(title: &str, entries: &[SignatureEntry]) {
    println!("{title}:");
    for e in entries {
        println!(
            "  {}{} reg={} mask={:#x} {:?} sv={} stream={}",
            e.semantic_name,
            e.semantic_index,
            e.register,
            e.mask,
            e.component_type,
            e.system_value_type,
            e.stream
        );
    }
}

fn print_program(config: StageConfig, bytes: &[u8]) -> anyhow::Result<()> {
    let device = RecordingDevice::new();
    let diagnostics = Diagnostics::VERBOSE;
    let program = ShaderProgram::from_bytes(&device, config, diagnostics, bytes);
    if !program.is_valid() {
        bail!("binary cannot be loaded as a {} program", program.stage());
    }

    println!("{} program:", program.stage());
    for i in 0..program.buffer_count() {
        let Some(cb) = program.buffer_info(i) else {
            continue;
        };
        println!(
            "  cbuffer {:<24} slot={} size={} {:?}",
            cb.name(),
            cb.bind_slot(),
            cb.size(),
            cb.kind()
        );
        for name in cb.variables() {
            if let Some(var) = program.variable_info(name) {
                println!("    {name:<26} offset={} size={}", var.byte_offset, var.size);
            }
        }
    }
    if let Some(desc) = program.description() {
        for b in &desc.bound_resources {
            if program.has_resource(&b.name) {
                let slot = program.resource_info(&b.name).map_or(0, |r| r.bind_slot);
                println!("  resource {:<23} slot={slot}", b.name);
            } else if program.has_sampler(&b.name) {
                let slot = program.sampler_info(&b.name).map_or(0, |s| s.bind_slot);
                println!("  sampler {:<24} slot={slot}", b.name);
            } else if let Some(slot) = program.unordered_access_slot(&b.name) {
                println!("  uav {:<28} slot={slot}", b.name);
            }
        }
    }

    let elements = program.input_layout_elements();
    if !elements.is_empty() {
        println!(
            "  input layout ({}):",
            if program.is_instancing_compatible() {
                "instanced"
            } else {
                "per-vertex"
            }
        );
        for (e, offset) in elements.iter().zip(resolve_offsets(elements)) {
            println!(
                "    {}{} {:?} slot={} offset={offset} step={}",
                e.semantic_name, e.semantic_index, e.format, e.input_slot, e.instance_data_step_rate
            );
        }
    }

    if !program.stream_out_declaration().is_empty() {
        println!("  stream out stride: {} bytes", program.stream_out_stride());
        for e in program.stream_out_declaration() {
            println!(
                "    stream {} {}{} components={}",
                e.stream, e.semantic_name, e.semantic_index, e.component_count
            );
        }
    }

    let [x, y, z] = program.thread_group_size();
    if program.threads_per_group() > 0 {
        println!(
            "  dispatch: {x}x{y}x{z} threads per group ({} total)",
            program.threads_per_group()
        );
    }
    Ok(())
}
