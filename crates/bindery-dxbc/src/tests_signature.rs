use crate::test_utils::{build_container, build_signature_chunk, SigParam};
use crate::{
    parse_signature_chunk, parse_signature_chunk_with_fourcc, ComponentType, DxbcError, DxbcFile,
    FourCC, SignatureKind,
};

fn vs_inputs() -> Vec<SigParam> {
    vec![
        SigParam::float("POSITION", 0, 0, 0x7),
        SigParam::float("TEXCOORD", 0, 1, 0x3),
        SigParam::float("BLENDINDICES", 0, 2, 0xF).with_component_type(1),
    ]
}

#[test]
fn parses_basic_layout() {
    let chunk = build_signature_chunk(FourCC::ISGN, &vs_inputs());
    let sig = parse_signature_chunk(&chunk).unwrap();

    assert_eq!(sig.entries.len(), 3);
    assert_eq!(sig.entries[0].semantic_name, "POSITION");
    assert_eq!(sig.entries[0].mask, 0x7);
    assert_eq!(sig.entries[1].register, 1);
    assert_eq!(sig.entries[2].component_type, ComponentType::Uint32);
    assert_eq!(sig.entries[2].stream, 0);
}

#[test]
fn parses_osg5_stream_layout() {
    let params = vec![
        SigParam::float("SV_Position", 0, 0, 0xF).with_system_value(1),
        SigParam::float("COLOR", 0, 1, 0xF).with_stream(2),
    ];
    let chunk = build_signature_chunk(FourCC::OSG5, &params);
    let sig = parse_signature_chunk_with_fourcc(FourCC::OSG5, &chunk).unwrap();

    assert_eq!(sig.entries[0].system_value_type, 1);
    assert_eq!(sig.entries[1].semantic_name, "COLOR");
    assert_eq!(sig.entries[1].stream, 2);
    assert_eq!(sig.entries[1].min_precision, 0);
}

#[test]
fn parses_sg1_layout_with_min_precision() {
    let mut param = SigParam::float("TEXCOORD", 3, 4, 0x3);
    param.min_precision = 1;
    let chunk = build_signature_chunk(FourCC::ISG1, &[param]);
    let sig = parse_signature_chunk_with_fourcc(FourCC::ISG1, &chunk).unwrap();

    let entry = &sig.entries[0];
    assert_eq!(entry.semantic_index, 3);
    assert_eq!(entry.register, 4);
    assert_eq!(entry.min_precision, 1);
}

#[test]
fn empty_signature_is_valid() {
    let chunk = build_signature_chunk(FourCC::ISGN, &[]);
    assert!(parse_signature_chunk(&chunk).unwrap().entries.is_empty());
}

#[test]
fn truncated_table_is_rejected() {
    let mut chunk = build_signature_chunk(FourCC::ISGN, &vs_inputs());
    // Claim far more entries than the chunk holds.
    chunk[0..4].copy_from_slice(&1000u32.to_le_bytes());
    let err = parse_signature_chunk(&chunk).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
}

#[test]
fn name_offset_out_of_bounds_is_rejected() {
    let mut chunk = build_signature_chunk(FourCC::ISGN, &vs_inputs()[..1]);
    chunk[8..12].copy_from_slice(&0xffffu32.to_le_bytes());
    let err = parse_signature_chunk(&chunk).unwrap_err();
    assert!(err.context().contains("semantic_name"), "{err}");
}

#[test]
fn get_signature_falls_back_to_isg1() {
    let chunk = build_signature_chunk(FourCC::ISG1, &vs_inputs());
    let bytes = build_container(&[(FourCC::ISG1, &chunk)]);
    let file = DxbcFile::parse(&bytes).unwrap();

    let sig = file.get_signature(SignatureKind::Input).unwrap().unwrap();
    assert_eq!(sig.entries.len(), 3);
    assert!(file.get_signature(SignatureKind::Output).is_none());
}

#[test]
fn get_signature_skips_malformed_duplicate() {
    let bad = [0xffu8; 8];
    let good = build_signature_chunk(FourCC::OSGN, &[SigParam::float("SV_Target", 0, 0, 0xF)]);
    let bytes = build_container(&[(FourCC::OSGN, &bad), (FourCC::OSGN, &good)]);
    let file = DxbcFile::parse(&bytes).unwrap();

    let sig = file.get_signature(SignatureKind::Output).unwrap().unwrap();
    assert_eq!(sig.entries[0].semantic_name, "SV_Target");
}

#[test]
fn get_signature_reports_first_error_when_nothing_parses() {
    let bad = [0xffu8; 8];
    let bytes = build_container(&[(FourCC::ISGN, &bad)]);
    let file = DxbcFile::parse(&bytes).unwrap();

    let err = file.get_signature(SignatureKind::Input).unwrap().unwrap_err();
    assert!(err.context().starts_with("ISGN chunk"), "{err}");
}
