use crate::test_utils::{build_container, RdefBuilder, TypeDesc, VarDesc};
use crate::{
    parse_rdef_chunk, CbufferType, DxbcError, DxbcFile, FourCC, ShaderInputType, ShaderStage,
};

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[test]
fn parse_rdef_resource_bindings_minimal() {
    // Single texture bound at t3, SM4 layout, no creator string.
    let mut chunk = Vec::new();
    push_u32(&mut chunk, 0); // cb count
    push_u32(&mut chunk, 0); // cb offset
    push_u32(&mut chunk, 1); // resource count
    push_u32(&mut chunk, 28); // resource offset (header size)
    push_u32(&mut chunk, 0xfffe_0400); // ps_4_0
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // creator offset

    push_u32(&mut chunk, 60); // name offset
    push_u32(&mut chunk, 2); // texture
    push_u32(&mut chunk, 5); // return type
    push_u32(&mut chunk, 4); // dimension
    push_u32(&mut chunk, 0); // num samples
    push_u32(&mut chunk, 3); // bind point
    push_u32(&mut chunk, 1); // bind count
    push_u32(&mut chunk, 0); // flags

    chunk.extend_from_slice(b"tex0\0");

    let rdef = parse_rdef_chunk(&chunk).unwrap();
    assert_eq!(rdef.creator, None);
    assert_eq!(rdef.major_version(), 4);
    assert!(rdef.constant_buffers.is_empty());
    let tex = rdef.find_binding("tex0").unwrap();
    assert_eq!(tex.input_type, ShaderInputType::Texture);
    assert_eq!(tex.bind_point, 3);
    assert_eq!(tex.bind_count, 1);
}

fn object_constants() -> Vec<VarDesc> {
    vec![
        VarDesc::new("world", 0, 64).with_type(TypeDesc::float4x4()),
        VarDesc::new("tint", 64, 16).with_type(TypeDesc::float(4)),
        VarDesc::new("time", 80, 4).with_type(TypeDesc::float(1)),
    ]
}

#[test]
fn parses_sm4_constant_buffers() {
    let chunk = RdefBuilder::new(ShaderStage::Vertex, 4, 0)
        .cbuffer("PerObject", 2, 96, object_constants())
        .build();
    let rdef = parse_rdef_chunk(&chunk).unwrap();

    assert_eq!(rdef.creator.as_deref(), Some("bindery test_utils"));
    let cb = &rdef.constant_buffers[0];
    assert_eq!(cb.name, "PerObject");
    assert_eq!(cb.size, 96);
    assert_eq!(cb.kind, CbufferType::ConstantBuffer);
    assert_eq!(cb.variables.len(), 3);
    assert_eq!(cb.variables[1].name, "tint");
    assert_eq!(cb.variables[1].start_offset, 64);
    assert_eq!(cb.variables[2].size, 4);

    let world_ty = cb.variables[0].ty.as_ref().unwrap();
    assert_eq!((world_ty.rows, world_ty.columns), (4, 4));
    assert_eq!(rdef.find_binding("PerObject").unwrap().bind_point, 2);
}

#[test]
fn parses_sm5_layout_from_rd11_header() {
    let light = TypeDesc::structure(vec![
        ("direction".to_owned(), 0, TypeDesc::float(3)),
        ("intensity".to_owned(), 12, TypeDesc::float(1)),
    ]);
    let chunk = RdefBuilder::new(ShaderStage::Pixel, 5, 0)
        .binding("albedo", 2, 0)
        .binding("linear", 3, 1)
        .cbuffer(
            "Lighting",
            0,
            32,
            vec![
                VarDesc::new("sun", 0, 16).with_type(light),
                VarDesc::new("ambient", 16, 12).with_type(TypeDesc::float(3)),
            ],
        )
        .build();
    assert_eq!(&chunk[28..32], b"RD11");

    let rdef = parse_rdef_chunk(&chunk).unwrap();
    assert_eq!(rdef.major_version(), 5);
    assert_eq!(rdef.bound_resources.len(), 3);
    assert_eq!(rdef.bound_resources[1].input_type, ShaderInputType::Sampler);

    let sun = &rdef.constant_buffers[0].variables[0];
    let members = &sun.ty.as_ref().unwrap().members;
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].name, "intensity");
    assert_eq!(members[1].offset, 12);
    assert_eq!(members[0].ty.columns, 3);
    assert_eq!(rdef.constant_buffers[0].variables[1].name, "ambient");
}

#[test]
fn parses_sm51_register_space() {
    let chunk = RdefBuilder::new(ShaderStage::Compute, 5, 1)
        .binding_in_space("output", 4, 0, 2)
        .build();
    let rdef = parse_rdef_chunk(&chunk).unwrap();
    let output = &rdef.bound_resources[0];
    assert_eq!(output.input_type, ShaderInputType::UavRwTyped);
    assert_eq!(output.space, 2);
}

#[test]
fn classifies_every_uav_kind() {
    for raw in [4, 6, 8, 9, 10, 11] {
        let ty = ShaderInputType::from_raw(raw);
        assert!(ty.is_unordered_access(), "{ty:?}");
        assert!(!ty.is_shader_resource(), "{ty:?}");
    }
    for raw in [2, 5, 7] {
        assert!(ShaderInputType::from_raw(raw).is_shader_resource());
    }
    assert_eq!(ShaderInputType::from_raw(99), ShaderInputType::Unknown(99));
}

#[test]
fn non_cbuffer_kinds_are_preserved() {
    let chunk = RdefBuilder::new(ShaderStage::Pixel, 5, 0)
        .cbuffer_without_binding("Lookup", 16, 1, vec![VarDesc::new("entries", 0, 16)])
        .build();
    let rdef = parse_rdef_chunk(&chunk).unwrap();
    assert_eq!(rdef.constant_buffers[0].kind, CbufferType::TextureBuffer);
    assert!(rdef.bound_resources.is_empty());
}

#[test]
fn truncated_variable_table_is_rejected() {
    let mut chunk = RdefBuilder::new(ShaderStage::Vertex, 4, 0)
        .cbuffer("PerObject", 0, 96, object_constants())
        .build();
    // Constant buffer entry sits right after the 28-byte header and one 32-byte binding;
    // bump its variable count past the end of the chunk.
    let var_count_pos = 28 + 32 + 4;
    chunk[var_count_pos..var_count_pos + 4].copy_from_slice(&100_000u32.to_le_bytes());
    assert!(parse_rdef_chunk(&chunk).is_err());
}

#[test]
fn self_referencing_struct_is_rejected() {
    let mut chunk = RdefBuilder::new(ShaderStage::Vertex, 4, 0)
        .cbuffer(
            "Cb",
            0,
            16,
            vec![VarDesc::new("s", 0, 16).with_type(TypeDesc::structure(vec![(
                "inner".to_owned(),
                0,
                TypeDesc::float(4),
            )]))],
        )
        .build();
    let rdef = parse_rdef_chunk(&chunk).unwrap();
    assert_eq!(rdef.constant_buffers[0].variables[0].ty.as_ref().unwrap().members.len(), 1);

    // Point the only member's type back at the struct itself.
    let var_pos = 28 + 32 + 24;
    let struct_ty = u32::from_le_bytes(chunk[var_pos + 16..var_pos + 20].try_into().unwrap());
    let member_table = u32::from_le_bytes(
        chunk[struct_ty as usize + 12..struct_ty as usize + 16].try_into().unwrap(),
    ) as usize;
    chunk[member_table + 4..member_table + 8].copy_from_slice(&struct_ty.to_le_bytes());

    let err = parse_rdef_chunk(&chunk).unwrap_err();
    assert!(err.context().contains("nests deeper"), "{err}");
}

#[test]
fn get_rdef_accepts_rd11_fourcc() {
    let chunk = RdefBuilder::new(ShaderStage::Pixel, 5, 0)
        .binding("albedo", 2, 4)
        .build();
    let bytes = build_container(&[(FourCC::RD11, &chunk)]);
    let file = DxbcFile::parse(&bytes).unwrap();
    let rdef = file.get_rdef().unwrap().unwrap();
    assert_eq!(rdef.bound_resources[0].bind_point, 4);
}

fn push_u16s(out: &mut Vec<u8>, values: [u16; 6]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

// One cbuffer variable whose type is `levels` nested structs. Every member of a level
// points at the same type offset for the next level, ending in a float4.
fn shared_member_chain(levels: usize, fanout: u16) -> Vec<u8> {
    let mut chunk = RdefBuilder::new(ShaderStage::Vertex, 4, 0)
        .cbuffer("Cb", 0, 16, vec![VarDesc::new("s", 0, 16)])
        .build();

    let name = chunk.len() as u32;
    chunk.extend_from_slice(b"m\0\0\0");

    let mut ty = chunk.len() as u32;
    push_u16s(&mut chunk, [1, 3, 1, 4, 0, 0]);
    push_u32(&mut chunk, 0);

    for _ in 0..levels {
        let members = chunk.len() as u32;
        for _ in 0..fanout {
            push_u32(&mut chunk, name);
            push_u32(&mut chunk, ty);
            push_u32(&mut chunk, 0);
        }
        ty = chunk.len() as u32;
        push_u16s(&mut chunk, [5, 0, 1, 0, 0, fanout]);
        push_u32(&mut chunk, members);
    }

    // Header, one binding, one cbuffer entry, then the variable's type offset.
    let type_offset_pos = 28 + 32 + 24 + 16;
    chunk[type_offset_pos..type_offset_pos + 4].copy_from_slice(&ty.to_le_bytes());
    chunk
}

#[test]
fn shared_member_types_parse_when_small() {
    let rdef = parse_rdef_chunk(&shared_member_chain(4, 2)).unwrap();
    let mut ty = rdef.constant_buffers[0].variables[0].ty.as_ref().unwrap();
    for _ in 0..4 {
        assert_eq!(ty.members.len(), 2);
        ty = &ty.members[1].ty;
    }
    assert_eq!((ty.class, ty.columns), (1, 4));
}

#[test]
fn exponential_type_expansion_is_rejected() {
    let chunk = shared_member_chain(15, 4);
    assert!(chunk.len() < 1200);

    let err = parse_rdef_chunk(&chunk).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("type nodes"), "{err}");
}
