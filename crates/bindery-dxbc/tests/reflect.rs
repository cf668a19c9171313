use bindery_dxbc::{reflect, ComponentType, DxbcError, FourCC, ShaderInputType, ShaderStage};

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn container(chunks: &[(FourCC, Vec<u8>)]) -> Vec<u8> {
    let header_len = 32 + 4 * chunks.len();
    let mut out = Vec::new();
    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]);
    push_u32(&mut out, 1);
    push_u32(&mut out, 0); // total_size, patched below
    push_u32(&mut out, chunks.len() as u32);

    let mut offset = header_len;
    for (_, data) in chunks {
        push_u32(&mut out, offset as u32);
        offset += 8 + data.len();
    }
    for (fourcc, data) in chunks {
        out.extend_from_slice(&fourcc.0);
        push_u32(&mut out, data.len() as u32);
        out.extend_from_slice(data);
    }
    let total = out.len() as u32;
    out[24..28].copy_from_slice(&total.to_le_bytes());
    out
}

fn shader_chunk(program_type: u32, decls: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, (program_type << 16) | 0x50); // shader model 5.0
    push_u32(&mut out, 2 + decls.len() as u32 + 1);
    for &tok in decls {
        push_u32(&mut out, tok);
    }
    push_u32(&mut out, 0x0100_003e); // ret
    out
}

// SM4-layout RDEF with one cbuffer `Params { uint count; float scale; }` bound at b1 and
// one RW buffer at u0.
fn compute_rdef(scale_offset: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, 1); // cb count
    push_u32(&mut out, 92); // cb offset
    push_u32(&mut out, 2); // resource count
    push_u32(&mut out, 28); // resource offset
    push_u32(&mut out, 0x4353_0400); // cs_4_0
    push_u32(&mut out, 0); // flags
    push_u32(&mut out, 0); // creator

    // bindings @ 28
    for (name_off, ty, slot) in [(164u32, 0u32, 1u32), (172, 4, 0)] {
        for v in [name_off, ty, 0, 0, 0, slot, 1, 0] {
            push_u32(&mut out, v);
        }
    }
    // cbuffer @ 92: name, var count, var offset, size, flags, type
    for v in [164u32, 2, 116, 16, 0, 0] {
        push_u32(&mut out, v);
    }
    // variables @ 116
    for v in [180u32, 0, 4, 2, 0, 0] {
        push_u32(&mut out, v);
    }
    for v in [186u32, scale_offset, 4, 2, 0, 0] {
        push_u32(&mut out, v);
    }
    assert_eq!(out.len(), 164);
    out.extend_from_slice(b"Params\0\0"); // 164
    out.extend_from_slice(b"Output\0\0"); // 172
    out.extend_from_slice(b"count\0"); // 180
    out.extend_from_slice(b"scale\0"); // 186
    out
}

#[test]
fn reflects_compute_shader() {
    let blob = container(&[
        (FourCC::RDEF, compute_rdef(4)),
        (FourCC::SHEX, shader_chunk(5, &[0x0400_009b, 64, 2, 1])),
    ]);
    let desc = reflect(&blob).unwrap();

    assert_eq!(desc.stage, ShaderStage::Compute);
    assert_eq!(desc.thread_group_size, Some([64, 2, 1]));
    assert_eq!(desc.bound_resources.len(), 2);
    assert_eq!(
        desc.find_binding("Output").unwrap().input_type,
        ShaderInputType::UavRwTyped
    );
    let params = desc.find_constant_buffer("Params").unwrap();
    assert_eq!(params.variables[1].name, "scale");
    assert_eq!(params.variables[1].start_offset, 4);
    assert!(desc.input_signature.is_empty());
}

#[test]
fn variable_past_buffer_end_is_rejected() {
    let blob = container(&[
        (FourCC::RDEF, compute_rdef(14)),
        (FourCC::SHEX, shader_chunk(5, &[0x0400_009b, 1, 1, 1])),
    ]);
    let err = reflect(&blob).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("scale"), "{err}");
}

#[test]
fn stripped_blob_has_empty_tables() {
    let blob = container(&[(FourCC::SHDR, shader_chunk(0, &[]))]);
    let desc = reflect(&blob).unwrap();
    assert_eq!(desc.stage, ShaderStage::Pixel);
    assert!(desc.bound_resources.is_empty());
    assert!(desc.constant_buffers.is_empty());
    assert!(desc.output_signature.is_empty());
    assert_eq!(desc.thread_group_size, None);
}

#[test]
fn missing_shader_chunk_is_an_error() {
    let blob = container(&[(FourCC::RDEF, compute_rdef(4))]);
    assert_eq!(reflect(&blob).unwrap_err(), DxbcError::MissingChunk("SHDR/SHEX"));
}

#[test]
fn reads_input_signature() {
    // ISGN with POSITION.xyz (float) and SV_VertexID (uint).
    let mut isgn = Vec::new();
    push_u32(&mut isgn, 2);
    push_u32(&mut isgn, 8);
    for (name_off, sv, comp, reg, mask) in [(56u32, 0u32, 3u32, 0u32, 0x7u32), (68, 6, 1, 1, 0x1)] {
        for v in [name_off, 0, sv, comp, reg] {
            push_u32(&mut isgn, v);
        }
        push_u32(&mut isgn, mask | (mask << 8));
    }
    isgn.extend_from_slice(b"POSITION\0\0\0\0"); // 56
    isgn.extend_from_slice(b"SV_VertexID\0"); // 68

    let blob = container(&[
        (FourCC::ISGN, isgn),
        (FourCC::SHEX, shader_chunk(1, &[])),
    ]);
    let desc = reflect(&blob).unwrap();
    assert_eq!(desc.stage, ShaderStage::Vertex);
    assert_eq!(desc.input_signature.len(), 2);
    assert_eq!(desc.input_signature[0].component_type, ComponentType::Float32);
    assert_eq!(desc.input_signature[1].semantic_name, "SV_VertexID");
    assert_eq!(desc.input_signature[1].system_value_type, 6);
    assert_eq!(desc.input_signature[1].read_write_mask, 0x1);
}

#[test]
fn truncated_container_is_rejected() {
    let blob = container(&[(FourCC::SHEX, shader_chunk(1, &[]))]);
    let err = reflect(&blob[..blob.len() - 4]).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
}
