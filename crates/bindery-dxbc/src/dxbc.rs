use crate::error::DxbcError;
use crate::fourcc::FourCC;
use crate::rdef::{parse_rdef_chunk, RdefChunk};
use crate::signature::{parse_signature_chunk_with_fourcc, SignatureChunk};
use core::fmt;

// magic + checksum + reserved + total_size + chunk_count
const DXBC_HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4;
// Real containers carry a handful of chunks; this only bounds the work done on hostile input.
const MAX_DXBC_CHUNK_COUNT: u32 = 4096;

/// The fixed header of a `DXBC` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcHeader {
    /// Must be [`FourCC::DXBC`].
    pub magic: FourCC,
    /// The checksum stored in the container header (MD5).
    pub checksum: [u8; 16],
    /// Declared total size, in bytes, of this container.
    pub total_size: u32,
    /// Number of chunk offsets following the header.
    pub chunk_count: u32,
}

/// A single chunk within a `DXBC` container.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DxbcChunk<'a> {
    /// The chunk identifier (e.g. `SHEX`, `RDEF`).
    pub fourcc: FourCC,
    /// Raw chunk payload bytes.
    pub data: &'a [u8],
}

impl fmt::Debug for DxbcChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxbcChunk")
            .field("fourcc", &self.fourcc)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Which signature a caller is asking [`DxbcFile::get_signature`] for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// `ISGN` / `ISG1`.
    Input,
    /// `OSGN` / `OSG5` / `OSG1`.
    Output,
}

impl SignatureKind {
    fn fourccs(self) -> &'static [FourCC] {
        match self {
            Self::Input => &[FourCC::ISGN, FourCC::ISG1],
            Self::Output => &[FourCC::OSGN, FourCC::OSG5, FourCC::OSG1],
        }
    }
}

/// A parsed `DXBC` container.
///
/// Every offset and size is validated against the declared `total_size` during
/// [`DxbcFile::parse`], so chunk iteration afterwards cannot go out of bounds.
#[derive(Debug, Clone)]
pub struct DxbcFile<'a> {
    bytes: &'a [u8],
    header: DxbcHeader,
    chunk_offsets: &'a [u8],
}

impl<'a> DxbcFile<'a> {
    /// Parses a `DXBC` container from `bytes`.
    ///
    /// The input is treated as untrusted: this never panics on malformed data.
    pub fn parse(bytes: &'a [u8]) -> Result<DxbcFile<'a>, DxbcError> {
        if bytes.len() < DXBC_HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "need at least {DXBC_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let magic = FourCC([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != FourCC::DXBC {
            return Err(DxbcError::malformed_header(format!(
                "bad magic {magic:?}, expected {:?}",
                FourCC::DXBC
            )));
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&bytes[4..20]);

        // bytes[20..24] is a reserved DWORD (usually 1).
        let total_size = header_u32(bytes, 24);
        let chunk_count = header_u32(bytes, 28);
        if chunk_count > MAX_DXBC_CHUNK_COUNT {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk_count {chunk_count} exceeds maximum {MAX_DXBC_CHUNK_COUNT}"
            )));
        }
        if total_size < DXBC_HEADER_LEN as u32 {
            return Err(DxbcError::malformed_header(format!(
                "total_size {total_size} is smaller than header size {DXBC_HEADER_LEN}"
            )));
        }
        if total_size as usize > bytes.len() {
            return Err(DxbcError::out_of_bounds(format!(
                "total_size {total_size} exceeds buffer length {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..total_size as usize];

        // chunk_count is capped above, so this cannot overflow.
        let offset_table_end = DXBC_HEADER_LEN + chunk_count as usize * 4;
        if offset_table_end > bytes.len() {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk offset table ends at {offset_table_end}, but total_size is {}",
                bytes.len()
            )));
        }

        for i in 0..chunk_count as usize {
            let chunk_offset = header_u32(bytes, DXBC_HEADER_LEN + i * 4) as usize;
            if chunk_offset < offset_table_end {
                return Err(DxbcError::malformed_offsets(format!(
                    "chunk {i} offset {chunk_offset} points into the container header \
                     (need >= {offset_table_end})"
                )));
            }

            let data_start = chunk_offset.checked_add(8).ok_or_else(|| {
                DxbcError::malformed_offsets(format!(
                    "chunk {i} offset {chunk_offset} overflows when reading header"
                ))
            })?;
            if data_start > bytes.len() {
                return Err(DxbcError::out_of_bounds(format!(
                    "chunk {i} header at {chunk_offset}..{data_start} is outside total_size {}",
                    bytes.len()
                )));
            }

            let fourcc = FourCC([
                bytes[chunk_offset],
                bytes[chunk_offset + 1],
                bytes[chunk_offset + 2],
                bytes[chunk_offset + 3],
            ]);
            let chunk_size = header_u32(bytes, chunk_offset + 4) as usize;
            let data_end = data_start.checked_add(chunk_size).ok_or_else(|| {
                DxbcError::malformed_offsets(format!(
                    "chunk {i} size {chunk_size} overflows when computing data range"
                ))
            })?;
            if data_end > bytes.len() {
                return Err(DxbcError::out_of_bounds(format!(
                    "chunk {i} ({fourcc}) data at {data_start}..{data_end} is outside \
                     total_size {}",
                    bytes.len()
                )));
            }
        }

        Ok(DxbcFile {
            bytes,
            header: DxbcHeader {
                magic,
                checksum,
                total_size,
                chunk_count,
            },
            chunk_offsets: &bytes[DXBC_HEADER_LEN..offset_table_end],
        })
    }

    /// Returns the parsed container header.
    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// Returns the raw bytes covered by the container's declared `total_size`.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Iterates over all chunks in file order.
    pub fn chunks(&self) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        DxbcChunksIter {
            bytes: self.bytes,
            chunk_offsets: self.chunk_offsets,
            index: 0,
        }
    }

    /// Returns the first chunk matching `fourcc`, if any.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<DxbcChunk<'a>> {
        self.chunks().find(|chunk| chunk.fourcc == fourcc)
    }

    /// Iterates over all chunks matching `fourcc`, in file order.
    pub fn get_chunks(&self, fourcc: FourCC) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        self.chunks().filter(move |chunk| chunk.fourcc == fourcc)
    }

    /// Returns the shader bytecode chunk, preferring `SHEX` over `SHDR`.
    pub fn shader_chunk(&self) -> Option<DxbcChunk<'a>> {
        self.get_chunk(FourCC::SHEX)
            .or_else(|| self.get_chunk(FourCC::SHDR))
    }

    /// Returns and parses the requested signature, if the container has one.
    ///
    /// The spellings for `kind` are tried in order (`ISGN` then `ISG1`; `OSGN`, `OSG5`,
    /// then `OSG1`). Within each spelling, chunks are tried in file order and the first
    /// one that parses wins. If chunks exist but none parse, the first error is returned.
    pub fn get_signature(&self, kind: SignatureKind) -> Option<Result<SignatureChunk, DxbcError>> {
        first_parsed(self, kind.fourccs(), |chunk| {
            parse_signature_chunk_with_fourcc(chunk.fourcc, chunk.data)
        })
    }

    /// Returns and parses the resource definition chunk (`RDEF`, falling back to `RD11`).
    pub fn get_rdef(&self) -> Option<Result<RdefChunk, DxbcError>> {
        first_parsed(self, &[FourCC::RDEF, FourCC::RD11], |chunk| {
            parse_rdef_chunk(chunk.data)
        })
    }

    /// Returns a human-readable summary of the container and its chunks.
    pub fn debug_summary(&self) -> String {
        use core::fmt::Write as _;

        let mut out = String::new();
        let _ = write!(
            &mut out,
            "{} total_size={} chunk_count={}",
            self.header.magic, self.header.total_size, self.header.chunk_count
        );
        for (idx, chunk) in self.chunks().enumerate() {
            let _ = write!(
                &mut out,
                "\n  [{idx:02}] {} {} bytes",
                chunk.fourcc,
                chunk.data.len()
            );
        }
        out
    }

    /// Computes the MD5 checksum used by DXBC containers.
    ///
    /// Parsing never validates the checksum; compare against [`DxbcHeader::checksum`]
    /// (or call [`DxbcFile::checksum_matches`]) to opt in.
    #[cfg(feature = "md5")]
    pub fn compute_md5_checksum(&self) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        ctx.consume(&self.bytes[..4]);
        ctx.consume([0u8; 16]);
        ctx.consume(&self.bytes[20..]);
        ctx.compute().0
    }

    /// Returns `true` if the computed checksum matches the stored one.
    #[cfg(feature = "md5")]
    pub fn checksum_matches(&self) -> bool {
        self.compute_md5_checksum() == self.header.checksum
    }
}

fn first_parsed<'a, T>(
    dxbc: &DxbcFile<'a>,
    kinds: &[FourCC],
    parse: impl Fn(DxbcChunk<'a>) -> Result<T, DxbcError>,
) -> Option<Result<T, DxbcError>> {
    let mut first_err = None;
    for &kind in kinds {
        for chunk in dxbc.get_chunks(kind) {
            match parse(chunk) {
                Ok(parsed) => return Some(Ok(parsed)),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(DxbcError::invalid_chunk(format!(
                            "{} chunk: {}",
                            chunk.fourcc,
                            err.context()
                        )));
                    }
                }
            }
        }
    }
    first_err.map(Err)
}

struct DxbcChunksIter<'a> {
    bytes: &'a [u8],
    chunk_offsets: &'a [u8],
    index: usize,
}

impl<'a> Iterator for DxbcChunksIter<'a> {
    type Item = DxbcChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index.checked_mul(4)?;
        let offset_bytes = self.chunk_offsets.get(start..start.checked_add(4)?)?;
        let chunk_offset = u32::from_le_bytes(offset_bytes.try_into().ok()?) as usize;

        let header = self.bytes.get(chunk_offset..chunk_offset.checked_add(8)?)?;
        let fourcc = FourCC([header[0], header[1], header[2], header[3]]);
        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let data_start = chunk_offset + 8;
        let data = self.bytes.get(data_start..data_start.checked_add(chunk_size)?)?;

        self.index = self.index.saturating_add(1);
        Some(DxbcChunk { fourcc, data })
    }
}

// Callers have already checked `offset + 4 <= bytes.len()`.
fn header_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
