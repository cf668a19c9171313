//! Name-addressable binding tables and the constant-buffer store.
//!
//! Every table is a `Vec` in reflected order plus a name index into it. The first
//! definition of a name wins.

use std::collections::HashMap;

use bindery_dxbc::{CbufferType, ShaderDescription, ShaderInputType};
use tracing::debug;

use crate::device::{BufferDesc, BufferId, GpuDevice};
use crate::diagnostics::Diagnostics;
use crate::error::ShaderError;
use crate::stage::ShaderStage;

/// Addresses a table entry by position or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

/// Where a variable lives inside the constant-buffer store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderVariable {
    pub buffer_index: usize,
    pub byte_offset: u32,
    pub size: u32,
}

/// A constant buffer with its GPU object and CPU staging copy.
#[derive(Debug, Clone)]
pub struct ConstantBuffer {
    pub(crate) name: String,
    pub(crate) bind_slot: u32,
    pub(crate) kind: CbufferType,
    pub(crate) gpu_buffer: BufferId,
    pub(crate) staging: Vec<u8>,
    pub(crate) variables: Vec<String>,
}

impl ConstantBuffer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bind_slot(&self) -> u32 {
        self.bind_slot
    }

    /// Byte width; always equal to the staging length.
    pub fn size(&self) -> u32 {
        self.staging.len() as u32
    }

    pub fn kind(&self) -> CbufferType {
        self.kind
    }

    pub fn gpu_buffer(&self) -> BufferId {
        self.gpu_buffer
    }

    pub fn staging(&self) -> &[u8] {
        &self.staging
    }

    /// Names of the variables reflected in this buffer, in reflected order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// A texture or read-only buffer view slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub bind_slot: u32,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerSlot {
    pub name: String,
    pub bind_slot: u32,
    pub index: usize,
}

/// A compute-stage unordered-access view slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnorderedAccessSlot {
    pub name: String,
    pub bind_slot: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct NamedTable<T> {
    kind: &'static str,
    entries: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T> NamedTable<T> {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Appends `value` unless `name` is already present. Returns the entry's index.
    pub(crate) fn insert(&mut self, name: &str, value: impl FnOnce(usize) -> T) -> Option<usize> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let index = self.entries.len();
        self.entries.push(value(index));
        self.by_name.insert(name.to_owned(), index);
        Some(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub(crate) fn entries(&self) -> &[T] {
        &self.entries
    }

    pub(crate) fn resolve(&self, key: Key<'_>) -> Result<usize, ShaderError> {
        match key {
            Key::Index(index) if index < self.entries.len() => Ok(index),
            Key::Index(index) => Err(ShaderError::InvalidIndex {
                table: self.kind,
                index,
                len: self.entries.len(),
            }),
            Key::Name(name) => self.by_name.get(name).copied().ok_or_else(|| {
                ShaderError::ResourceNotFound {
                    kind: self.kind,
                    name: name.to_owned(),
                }
            }),
        }
    }

    pub(crate) fn at(&self, index: usize) -> &T {
        &self.entries[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut T {
        &mut self.entries[index]
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }
}

/// All reflected tables of one program.
#[derive(Debug, Clone)]
pub(crate) struct BindingTables {
    pub(crate) variables: NamedTable<ShaderVariable>,
    pub(crate) buffers: NamedTable<ConstantBuffer>,
    pub(crate) resources: NamedTable<ShaderResource>,
    pub(crate) samplers: NamedTable<SamplerSlot>,
    pub(crate) unordered_access: NamedTable<UnorderedAccessSlot>,
}

impl Default for BindingTables {
    fn default() -> Self {
        Self {
            variables: NamedTable::new("shader variable"),
            buffers: NamedTable::new("constant buffer"),
            resources: NamedTable::new("shader resource"),
            samplers: NamedTable::new("sampler"),
            unordered_access: NamedTable::new("unordered access view"),
        }
    }
}

impl BindingTables {
    /// Fills the tables from `desc`, creating one GPU buffer per constant buffer.
    ///
    /// On error the buffers created so far stay in the table so [`BindingTables::release`]
    /// frees them.
    pub(crate) fn build<D: GpuDevice>(
        &mut self,
        device: &D,
        stage: ShaderStage,
        desc: &ShaderDescription,
        diagnostics: &Diagnostics,
    ) -> Result<(), ShaderError> {
        for binding in &desc.bound_resources {
            let ty = binding.input_type;
            if ty.is_shader_resource() {
                self.resources.insert(&binding.name, |index| ShaderResource {
                    name: binding.name.clone(),
                    bind_slot: binding.bind_point,
                    index,
                });
            } else if ty == ShaderInputType::Sampler {
                self.samplers.insert(&binding.name, |index| SamplerSlot {
                    name: binding.name.clone(),
                    bind_slot: binding.bind_point,
                    index,
                });
            } else if ty.is_unordered_access() && stage == ShaderStage::Compute {
                self.unordered_access
                    .insert(&binding.name, |_| UnorderedAccessSlot {
                        name: binding.name.clone(),
                        bind_slot: binding.bind_point,
                    });
            }
        }

        for (reflected_index, cb) in desc.constant_buffers.iter().enumerate() {
            if self.buffers.contains(&cb.name) {
                continue;
            }
            let bind_slot = match desc.find_binding(&cb.name) {
                Some(binding) => binding.bind_point,
                None => {
                    diagnostics.report(&ShaderError::ResourceNotFound {
                        kind: "constant buffer binding",
                        name: cb.name.clone(),
                    });
                    reflected_index as u32
                }
            };

            let gpu_buffer = device
                .create_buffer(&BufferDesc::constant(cb.size))
                .map_err(|source| ShaderError::Create {
                    what: "constant buffer",
                    source,
                })?;

            let buffer_index = self.buffers.len();
            for var in &cb.variables {
                self.variables.insert(&var.name, |_| ShaderVariable {
                    buffer_index,
                    byte_offset: var.start_offset,
                    size: var.size,
                });
            }
            self.buffers.insert(&cb.name, |_| ConstantBuffer {
                name: cb.name.clone(),
                bind_slot,
                kind: cb.kind,
                gpu_buffer,
                staging: vec![0; cb.size as usize],
                variables: cb.variables.iter().map(|v| v.name.clone()).collect(),
            });
            debug!(
                name = %cb.name,
                slot = bind_slot,
                size = cb.size,
                variables = cb.variables.len(),
                "constant buffer"
            );
        }
        Ok(())
    }

    /// Releases every GPU buffer and empties all tables.
    pub(crate) fn release<D: GpuDevice>(&mut self, device: &D) {
        for buffer in self.buffers.entries() {
            device.release_buffer(buffer.gpu_buffer);
        }
        self.variables.clear();
        self.buffers.clear();
        self.resources.clear();
        self.samplers.clear();
        self.unordered_access.clear();
    }

    /// Copies `data` into the staging bytes of variable `name`.
    pub(crate) fn write_variable(&mut self, name: &str, data: &[u8]) -> Result<(), ShaderError> {
        let var = *self
            .variables
            .get(name)
            .ok_or_else(|| ShaderError::VariableNotFound(name.to_owned()))?;
        if data.len() > var.size as usize {
            return Err(ShaderError::SizeMismatch {
                name: name.to_owned(),
                len: data.len(),
                capacity: var.size,
            });
        }
        let start = var.byte_offset as usize;
        let staging = &mut self.buffers.at_mut(var.buffer_index).staging;
        let capacity = staging.len().saturating_sub(start) as u32;
        let dst = staging
            .get_mut(start..start + data.len())
            .ok_or_else(|| ShaderError::SizeMismatch {
                name: name.to_owned(),
                len: data.len(),
                capacity,
            })?;
        dst.copy_from_slice(data);
        Ok(())
    }
}
