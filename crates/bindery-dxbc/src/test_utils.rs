use crate::{FourCC, ShaderStage};

/// Builds a minimal `DXBC` container containing the provided chunks.
///
/// The checksum field is left zeroed; parsing never checks it.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let header_size = 4 + 16 + 4 + 4 + 4 + (4 * chunks.len());
    let chunk_bytes = chunks.iter().map(|(_, data)| 8 + data.len()).sum::<usize>();

    let mut out = Vec::with_capacity(header_size + chunk_bytes);
    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]); // checksum
    out.extend_from_slice(&1u32.to_le_bytes()); // reserved
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size placeholder
    let chunk_count = u32::try_from(chunks.len()).expect("DXBC chunk_count does not fit in u32");
    out.extend_from_slice(&chunk_count.to_le_bytes());

    let offsets_pos = out.len();
    out.resize(out.len() + 4 * chunks.len(), 0);

    for (i, (fourcc, data)) in chunks.iter().enumerate() {
        let offset = u32::try_from(out.len()).expect("DXBC chunk offset does not fit in u32");
        patch_u32(&mut out, offsets_pos + i * 4, offset);
        let chunk_size = u32::try_from(data.len()).expect("DXBC chunk size does not fit in u32");
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&chunk_size.to_le_bytes());
        out.extend_from_slice(data);
    }

    let total_size = u32::try_from(out.len()).expect("DXBC total_size does not fit in u32");
    patch_u32(&mut out, 24, total_size);
    out
}

/// One signature parameter for [`build_signature_chunk`].
#[derive(Debug, Clone)]
pub struct SigParam {
    /// Semantic name.
    pub semantic_name: String,
    /// Semantic index.
    pub semantic_index: u32,
    /// Register.
    pub register: u32,
    /// Raw `D3D_NAME`.
    pub system_value_type: u32,
    /// Raw `D3D_REGISTER_COMPONENT_TYPE` (1 uint, 2 sint, 3 float).
    pub component_type: u32,
    /// Component mask.
    pub mask: u8,
    /// Read/write mask.
    pub read_write_mask: u8,
    /// Stream (written only by the `OSG5`/`*SG1` layouts).
    pub stream: u32,
    /// Min precision (written only by the `*SG1` layouts).
    pub min_precision: u32,
}

impl SigParam {
    /// A float parameter in `register` with the given mask.
    pub fn float(name: &str, index: u32, register: u32, mask: u8) -> Self {
        Self {
            semantic_name: name.to_owned(),
            semantic_index: index,
            register,
            system_value_type: 0,
            component_type: 3,
            mask,
            read_write_mask: mask,
            stream: 0,
            min_precision: 0,
        }
    }

    /// Same as [`SigParam::float`] with a different component type.
    pub fn with_component_type(mut self, component_type: u32) -> Self {
        self.component_type = component_type;
        self
    }

    /// Marks the parameter as a system value.
    pub fn with_system_value(mut self, system_value_type: u32) -> Self {
        self.system_value_type = system_value_type;
        self
    }

    /// Sets the geometry-shader output stream.
    pub fn with_stream(mut self, stream: u32) -> Self {
        self.stream = stream;
        self
    }
}

/// Builds a signature chunk payload in the layout implied by `fourcc`
/// (`*SGN`: 24 bytes, `OSG5`: 28 bytes, `*SG1`: 32 bytes).
pub fn build_signature_chunk(fourcc: FourCC, params: &[SigParam]) -> Vec<u8> {
    let entry_len = match fourcc.0[3] {
        b'5' => 28,
        b'1' => 32,
        _ => 24,
    };
    let mut out = Vec::new();
    push_u32(&mut out, params.len() as u32);
    push_u32(&mut out, 8);
    let table_start = out.len();
    out.resize(table_start + params.len() * entry_len, 0);

    for (i, p) in params.iter().enumerate() {
        let name_offset = push_str(&mut out, &p.semantic_name);
        let mut pos = table_start + i * entry_len;
        if entry_len != 24 {
            patch_u32(&mut out, pos, p.stream);
            pos += 4;
        }
        patch_u32(&mut out, pos, name_offset);
        patch_u32(&mut out, pos + 4, p.semantic_index);
        patch_u32(&mut out, pos + 8, p.system_value_type);
        patch_u32(&mut out, pos + 12, p.component_type);
        patch_u32(&mut out, pos + 16, p.register);
        out[pos + 20] = p.mask;
        out[pos + 21] = p.read_write_mask;
        if entry_len == 32 {
            patch_u32(&mut out, pos + 24, p.min_precision);
        }
    }
    out
}

/// A type description for [`RdefBuilder`].
#[derive(Debug, Clone)]
pub struct TypeDesc {
    /// Raw `D3D_SHADER_VARIABLE_CLASS`.
    pub class: u16,
    /// Raw `D3D_SHADER_VARIABLE_TYPE`.
    pub base_type: u16,
    /// Rows.
    pub rows: u16,
    /// Columns.
    pub columns: u16,
    /// Array elements.
    pub elements: u16,
    /// Struct members as `(name, offset, type)`.
    pub members: Vec<(String, u32, TypeDesc)>,
}

impl TypeDesc {
    /// `floatN` vector (`N == 1` gives a scalar).
    pub fn float(n: u16) -> Self {
        Self {
            class: if n == 1 { 0 } else { 1 },
            base_type: 3,
            rows: 1,
            columns: n,
            elements: 0,
            members: Vec::new(),
        }
    }

    /// `float4x4` in column-major order.
    pub fn float4x4() -> Self {
        Self {
            class: 3,
            base_type: 3,
            rows: 4,
            columns: 4,
            elements: 0,
            members: Vec::new(),
        }
    }

    /// A struct with the given members.
    pub fn structure(members: Vec<(String, u32, TypeDesc)>) -> Self {
        Self {
            class: 5,
            base_type: 0,
            rows: 1,
            columns: 0,
            elements: 0,
            members,
        }
    }
}

/// A constant buffer variable for [`RdefBuilder`].
#[derive(Debug, Clone)]
pub struct VarDesc {
    /// Variable name.
    pub name: String,
    /// Byte offset inside the buffer.
    pub offset: u32,
    /// Size in bytes.
    pub size: u32,
    /// Variable flags.
    pub flags: u32,
    /// Optional type description.
    pub ty: Option<TypeDesc>,
}

impl VarDesc {
    /// A used variable without type information.
    pub fn new(name: &str, offset: u32, size: u32) -> Self {
        Self {
            name: name.to_owned(),
            offset,
            size,
            flags: 2,
            ty: None,
        }
    }

    /// Attaches a type description.
    pub fn with_type(mut self, ty: TypeDesc) -> Self {
        self.ty = Some(ty);
        self
    }
}

#[derive(Debug, Clone)]
struct CbDesc {
    name: String,
    size: u32,
    kind: u32,
    variables: Vec<VarDesc>,
}

#[derive(Debug, Clone)]
struct BindingDesc {
    name: String,
    input_type: u32,
    bind_point: u32,
    bind_count: u32,
    space: u32,
}

/// Builds `RDEF` chunk payloads in the SM4 (fixed sizes) or SM5 (`RD11` sub-header) layout.
#[derive(Debug, Clone)]
pub struct RdefBuilder {
    major: u8,
    minor: u8,
    stage: ShaderStage,
    bindings: Vec<BindingDesc>,
    cbuffers: Vec<CbDesc>,
}

impl RdefBuilder {
    /// Starts an `RDEF` for `stage` compiled as shader model `major_minor`.
    pub fn new(stage: ShaderStage, major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            stage,
            bindings: Vec::new(),
            cbuffers: Vec::new(),
        }
    }

    /// Adds a bound resource with a raw `D3D_SHADER_INPUT_TYPE`.
    pub fn binding(mut self, name: &str, input_type: u32, bind_point: u32) -> Self {
        self.bindings.push(BindingDesc {
            name: name.to_owned(),
            input_type,
            bind_point,
            bind_count: 1,
            space: 0,
        });
        self
    }

    /// Adds a register-space binding (only meaningful for SM5.1 layouts).
    pub fn binding_in_space(
        mut self,
        name: &str,
        input_type: u32,
        bind_point: u32,
        space: u32,
    ) -> Self {
        self.bindings.push(BindingDesc {
            name: name.to_owned(),
            input_type,
            bind_point,
            bind_count: 1,
            space,
        });
        self
    }

    /// Adds a `cbuffer` and its matching binding at `bind_point`.
    pub fn cbuffer(self, name: &str, bind_point: u32, size: u32, variables: Vec<VarDesc>) -> Self {
        self.binding(name, 0, bind_point)
            .cbuffer_without_binding(name, size, 0, variables)
    }

    /// Adds a constant buffer entry with a raw `D3D_CBUFFER_TYPE` and no binding.
    pub fn cbuffer_without_binding(
        mut self,
        name: &str,
        size: u32,
        kind: u32,
        variables: Vec<VarDesc>,
    ) -> Self {
        self.cbuffers.push(CbDesc {
            name: name.to_owned(),
            size,
            kind,
            variables,
        });
        self
    }

    /// Serializes the chunk payload.
    pub fn build(&self) -> Vec<u8> {
        let sm5 = self.major >= 5;
        let sm51 = sm5 && self.minor >= 1;
        let header_len = if sm5 { 60 } else { 28 };
        let binding_len = if sm51 { 40 } else { 32 };
        let var_len = if sm5 { 40 } else { 24 };
        let type_len = if sm5 { 36 } else { 16 };

        let program_type: u32 = match self.stage {
            ShaderStage::Pixel => 0xfffe,
            ShaderStage::Vertex => 0xffff,
            ShaderStage::Geometry => 0x4753,
            ShaderStage::Hull => 0x4853,
            ShaderStage::Domain => 0x4453,
            ShaderStage::Compute => 0x4353,
            ShaderStage::Unknown(ty) => u32::from(ty),
        };
        let target = (program_type << 16) | (u32::from(self.major) << 8) | u32::from(self.minor);

        let binding_off = header_len;
        let cb_off = binding_off + self.bindings.len() * binding_len;
        let mut var_offs = Vec::with_capacity(self.cbuffers.len());
        let mut end = cb_off + self.cbuffers.len() * 24;
        for cb in &self.cbuffers {
            var_offs.push(end);
            end += cb.variables.len() * var_len;
        }

        let mut out = vec![0u8; end];
        patch_u32(&mut out, 0, self.cbuffers.len() as u32);
        patch_u32(&mut out, 4, cb_off as u32);
        patch_u32(&mut out, 8, self.bindings.len() as u32);
        patch_u32(&mut out, 12, binding_off as u32);
        patch_u32(&mut out, 16, target);
        patch_u32(&mut out, 20, 0x100); // D3DCOMPILE_NO_PRESHADER
        if sm5 {
            out[28..32].copy_from_slice(b"RD11");
            for (i, v) in [60u32, 24, binding_len as u32, var_len as u32, type_len as u32, 12, 0]
                .into_iter()
                .enumerate()
            {
                patch_u32(&mut out, 32 + i * 4, v);
            }
        }
        let creator = push_str(&mut out, "bindery test_utils");
        patch_u32(&mut out, 24, creator);

        for (i, b) in self.bindings.iter().enumerate() {
            let name = push_str(&mut out, &b.name);
            let pos = binding_off + i * binding_len;
            let dimension = if b.input_type == 2 { 4 } else { 0 }; // TEXTURE2D
            let return_type = if b.input_type == 2 { 5 } else { 0 }; // FLOAT
            let row = [
                name,
                b.input_type,
                return_type,
                dimension,
                0,
                b.bind_point,
                b.bind_count,
                0,
            ];
            for (j, v) in row.into_iter().enumerate() {
                patch_u32(&mut out, pos + j * 4, v);
            }
            if sm51 {
                patch_u32(&mut out, pos + 32, b.space);
                patch_u32(&mut out, pos + 36, i as u32);
            }
        }

        for (i, cb) in self.cbuffers.iter().enumerate() {
            let name = push_str(&mut out, &cb.name);
            let pos = cb_off + i * 24;
            let var_count = cb.variables.len() as u32;
            let var_off = if cb.variables.is_empty() { 0 } else { var_offs[i] as u32 };
            for (j, v) in [name, var_count, var_off, cb.size, 0, cb.kind].into_iter().enumerate() {
                patch_u32(&mut out, pos + j * 4, v);
            }

            for (k, var) in cb.variables.iter().enumerate() {
                let name = push_str(&mut out, &var.name);
                let ty = match &var.ty {
                    Some(ty) => push_type(&mut out, ty, type_len),
                    None => 0,
                };
                let pos = var_offs[i] + k * var_len;
                let row = [name, var.offset, var.size, var.flags, ty, 0];
                for (j, v) in row.into_iter().enumerate() {
                    patch_u32(&mut out, pos + j * 4, v);
                }
                if sm5 {
                    // No texture/sampler slots: start 0xffffffff, size 0.
                    patch_u32(&mut out, pos + 24, u32::MAX);
                    patch_u32(&mut out, pos + 32, u32::MAX);
                }
            }
        }
        out
    }
}

fn push_type(out: &mut Vec<u8>, ty: &TypeDesc, type_len: usize) -> u32 {
    let members: Vec<(u32, u32, u32)> = ty
        .members
        .iter()
        .map(|(name, offset, member_ty)| {
            let name = push_str(out, name);
            let ty = push_type(out, member_ty, type_len);
            (name, ty, *offset)
        })
        .collect();
    let member_off = if members.is_empty() { 0 } else { out.len() as u32 };
    for (name, ty, offset) in members.iter().copied() {
        push_u32(out, name);
        push_u32(out, ty);
        push_u32(out, offset);
    }

    let pos = out.len();
    for v in [ty.class, ty.base_type, ty.rows, ty.columns, ty.elements, ty.members.len() as u16] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    push_u32(out, member_off);
    out.resize(pos + type_len, 0);
    pos as u32
}

/// Builds an `SHDR`/`SHEX` payload: version token, length, `decls`, then `ret`.
pub fn build_shader_chunk(stage: ShaderStage, major: u8, minor: u8, decls: &[u32]) -> Vec<u8> {
    let ty: u32 = match stage {
        ShaderStage::Pixel => 0,
        ShaderStage::Vertex => 1,
        ShaderStage::Geometry => 2,
        ShaderStage::Hull => 3,
        ShaderStage::Domain => 4,
        ShaderStage::Compute => 5,
        ShaderStage::Unknown(ty) => u32::from(ty),
    };
    let version = (ty << 16) | (u32::from(major) << 4) | u32::from(minor);
    let len = 2 + decls.len() as u32 + 1;

    let mut out = Vec::new();
    push_u32(&mut out, version);
    push_u32(&mut out, len);
    for &tok in decls {
        push_u32(&mut out, tok);
    }
    push_u32(&mut out, (1 << 24) | 0x3e); // ret
    out
}

/// Tokens for `dcl_thread_group x, y, z`.
pub fn dcl_thread_group(x: u32, y: u32, z: u32) -> [u32; 4] {
    [(4 << 24) | 0x9b, x, y, z]
}

/// Assembles a complete shader blob from its parts.
#[derive(Debug, Clone)]
pub struct BlobBuilder {
    stage: ShaderStage,
    major: u8,
    minor: u8,
    decls: Vec<u32>,
    rdef: Option<RdefBuilder>,
    signatures: Vec<(FourCC, Vec<SigParam>)>,
}

impl BlobBuilder {
    /// A shader model 5.0 blob for `stage`.
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            major: 5,
            minor: 0,
            decls: Vec::new(),
            rdef: None,
            signatures: Vec::new(),
        }
    }

    /// Overrides the shader model (`SHDR` is emitted for major < 5).
    pub fn model(mut self, major: u8, minor: u8) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }

    /// Starts (or returns) the `RDEF` description for this blob.
    pub fn rdef(mut self, f: impl FnOnce(RdefBuilder) -> RdefBuilder) -> Self {
        let base = self
            .rdef
            .take()
            .unwrap_or_else(|| RdefBuilder::new(self.stage, self.major, self.minor));
        self.rdef = Some(f(base));
        self
    }

    /// Adds a signature chunk.
    pub fn signature(mut self, fourcc: FourCC, params: Vec<SigParam>) -> Self {
        self.signatures.push((fourcc, params));
        self
    }

    /// Adds a `dcl_thread_group` declaration.
    pub fn thread_group(mut self, x: u32, y: u32, z: u32) -> Self {
        self.decls.extend_from_slice(&dcl_thread_group(x, y, z));
        self
    }

    /// Serializes the container.
    pub fn build(&self) -> Vec<u8> {
        let rdef = self.rdef.as_ref().map(RdefBuilder::build);
        let sigs: Vec<(FourCC, Vec<u8>)> = self
            .signatures
            .iter()
            .map(|(fourcc, params)| (*fourcc, build_signature_chunk(*fourcc, params)))
            .collect();
        let shader = build_shader_chunk(self.stage, self.major, self.minor, &self.decls);
        let shader_fourcc = if self.major >= 5 { FourCC::SHEX } else { FourCC::SHDR };

        let mut chunks: Vec<(FourCC, &[u8])> = Vec::new();
        if let Some(rdef) = &rdef {
            chunks.push((FourCC::RDEF, rdef.as_slice()));
        }
        for (fourcc, data) in &sigs {
            chunks.push((*fourcc, data.as_slice()));
        }
        chunks.push((shader_fourcc, shader.as_slice()));
        build_container(&chunks)
    }
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn patch_u32(out: &mut [u8], pos: usize, v: u32) {
    out[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
}

fn push_str(out: &mut Vec<u8>, s: &str) -> u32 {
    let offset = out.len() as u32;
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    offset
}
