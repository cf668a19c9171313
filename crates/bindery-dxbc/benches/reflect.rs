#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use bindery_dxbc::test_utils::{BlobBuilder, RdefBuilder, SigParam, TypeDesc, VarDesc};
#[cfg(not(target_arch = "wasm32"))]
use bindery_dxbc::{reflect, DxbcFile, FourCC, ShaderStage};
#[cfg(not(target_arch = "wasm32"))]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

#[cfg(not(target_arch = "wasm32"))]
fn vertex_blob(cbuffers: usize) -> Vec<u8> {
    let add_cbuffers = |mut rdef: RdefBuilder| {
        for i in 0..cbuffers {
            let vars = (0..8)
                .map(|v| {
                    VarDesc::new(&format!("cb{i}_var{v}"), v * 16, 16)
                        .with_type(TypeDesc::float(4))
                })
                .collect();
            rdef = rdef.cbuffer(&format!("Constants{i}"), i as u32, 128, vars);
        }
        rdef.binding("albedo", 2, 0).binding("linear", 3, 0)
    };
    BlobBuilder::new(ShaderStage::Vertex)
        .rdef(add_cbuffers)
        .signature(
            FourCC::ISGN,
            vec![
                SigParam::float("POSITION", 0, 0, 0x7),
                SigParam::float("NORMAL", 0, 1, 0x7),
                SigParam::float("TEXCOORD", 0, 2, 0x3),
                SigParam::float("TRANSFORM_PER_INSTANCE", 0, 3, 0xF),
            ],
        )
        .signature(
            FourCC::OSGN,
            vec![SigParam::float("SV_Position", 0, 0, 0xF).with_system_value(1)],
        )
        .build()
}

#[cfg(not(target_arch = "wasm32"))]
fn bench_reflect(c: &mut Criterion) {
    let mut group = c.benchmark_group("dxbc_reflect");
    for cbuffers in [1usize, 4, 14] {
        let blob = vertex_blob(cbuffers);
        group.bench_with_input(BenchmarkId::new("container", cbuffers), &blob, |b, bytes| {
            b.iter(|| {
                let file = DxbcFile::parse(black_box(bytes)).unwrap();
                black_box(file.chunks().count());
            })
        });
        group.bench_with_input(BenchmarkId::new("reflect", cbuffers), &blob, |b, bytes| {
            b.iter(|| {
                let desc = reflect(black_box(bytes)).unwrap();
                black_box(desc.constant_buffers.len());
            })
        });
    }
    group.finish();
}

#[cfg(not(target_arch = "wasm32"))]
criterion_group!(benches, bench_reflect);
#[cfg(not(target_arch = "wasm32"))]
criterion_main!(benches);
