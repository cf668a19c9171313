use core::fmt;

/// A four-character chunk identifier such as `RDEF` or `ISGN`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// `DXBC` container magic.
    pub const DXBC: Self = Self(*b"DXBC");
    /// SM4 shader bytecode.
    pub const SHDR: Self = Self(*b"SHDR");
    /// SM5 shader bytecode.
    pub const SHEX: Self = Self(*b"SHEX");
    /// Resource definitions.
    pub const RDEF: Self = Self(*b"RDEF");
    /// Alternate resource definition ID emitted by some toolchains.
    pub const RD11: Self = Self(*b"RD11");
    /// Input signature (24-byte entries).
    pub const ISGN: Self = Self(*b"ISGN");
    /// Input signature (32-byte entries with stream + min precision).
    pub const ISG1: Self = Self(*b"ISG1");
    /// Output signature (24-byte entries).
    pub const OSGN: Self = Self(*b"OSGN");
    /// Geometry-shader output signature with a leading stream index (28-byte entries).
    pub const OSG5: Self = Self(*b"OSG5");
    /// Output signature (32-byte entries with stream + min precision).
    pub const OSG1: Self = Self(*b"OSG1");

    /// Returns the identifier as a string if it is printable ASCII.
    pub fn as_str(&self) -> Option<&str> {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            core::str::from_utf8(&self.0).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}
