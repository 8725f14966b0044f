//! Operation kinds and artifact element formats.

use std::fmt;

/// The four operation families a worker can apply.
///
/// The order of [`OperationKind::ALL`] is the order of the default weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Blur-like smoothing; the only kind with an in-place variant.
    Blur,
    /// Border/padding: output grows by a few pixels per side.
    Pad,
    /// Element format conversion with scale and offset.
    Convert,
    /// Copy a random region of interest into a zeroed artifact.
    RegionMask,
}

impl OperationKind {
    /// All kinds, in default table order.
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Blur,
        OperationKind::Pad,
        OperationKind::Convert,
        OperationKind::RegionMask,
    ];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Blur => "blur",
            OperationKind::Pad => "pad",
            OperationKind::Convert => "convert",
            OperationKind::RegionMask => "region-mask",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            OperationKind::Blur => 0,
            OperationKind::Pad => 1,
            OperationKind::Convert => 2,
            OperationKind::RegionMask => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(usize::from(v)).copied()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric element format of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    U8,
    S8,
    U16,
    S16,
    S32,
    F32,
    F64,
}

impl Format {
    /// Every format a worker may pick at random.
    pub const ALL: [Format; 7] = [
        Format::U8,
        Format::S8,
        Format::U16,
        Format::S16,
        Format::S32,
        Format::F32,
        Format::F64,
    ];

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Format::U8 | Format::S8 => 1,
            Format::U16 | Format::S16 => 2,
            Format::S32 | Format::F32 => 4,
            Format::F64 => 8,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::U8 => "8U",
            Format::S8 => "8S",
            Format::U16 => "16U",
            Format::S16 => "16S",
            Format::S32 => "32S",
            Format::F32 => "32F",
            Format::F64 => "64F",
        };
        f.write_str(s)
    }
}

/// One operation request handed to [`Workload::apply`](crate::workload::Workload::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    /// Which operation to run.
    pub op: OperationKind,
    /// Caller asks for the in-place variant (mutate and return the input).
    ///
    /// Operations without an in-place form ignore it.
    pub inplace: bool,
}
