//! NDR primitive type implementations
//!
//! | IDL Type       | Rust Type | Size | Alignment |
//! |----------------|-----------|------|-----------|
//! | boolean        | bool      | 1    | 1         |
//! | byte/char      | u8        | 1    | 1         |
//! | small          | i8        | 1    | 1         |
//! | short          | i16       | 2    | 2         |
//! | unsigned short | u16       | 2    | 2         |
//! | long           | i32       | 4    | 4         |
//! | unsigned long  | u32       | 4    | 4         |
//! | hyper          | i64       | 8    | 8         |
//! | unsigned hyper | u64       | 8    | 8         |
//! | float          | f32       | 4    | 4         |
//! | double         | f64       | 8    | 8         |
//! | GUID           | Guid      | 16   | 4         |

use std::fmt;
use std::str::FromStr;

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

macro_rules! impl_ndr_primitive {
    ($($ty:ty => $size:expr, $write:ident, $read:ident;)*) => {
        $(
            impl NdrEncode for $ty {
                fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
                    w.$write(*self);
                    Ok(())
                }

                fn ndr_align() -> usize {
                    $size
                }
            }

            impl NdrDecode for $ty {
                fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
                    r.$read()
                }

                fn ndr_align() -> usize {
                    $size
                }

                fn ndr_min_size() -> usize {
                    $size
                }
            }
        )*
    };
}

impl_ndr_primitive! {
    u8 => 1, write_u8, read_u8;
    i8 => 1, write_i8, read_i8;
    bool => 1, write_bool, read_bool;
    u16 => 2, write_u16, read_u16;
    i16 => 2, write_i16, read_i16;
    u32 => 4, write_u32, read_u32;
    i32 => 4, write_i32, read_i32;
    u64 => 8, write_u64, read_u64;
    i64 => 8, write_i64, read_i64;
    f32 => 4, write_f32, read_f32;
    f64 => 8, write_f64, read_f64;
}

/// A GUID in its NDR layout: `Data1`, `Data2`, `Data3` in stream byte order,
/// `Data4` as eight raw octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const NIL: Self = Self::from_fields(0, 0, 0, [0; 8]);

    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Build a GUID from its 128-bit big-endian textual value,
    /// e.g. `0x82273fdc_e32a_18c3_3f78_827929dc23ea`.
    pub const fn from_u128(value: u128) -> Self {
        let tail = (value as u64).to_be_bytes();
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: tail,
        }
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Parse from string "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('{').trim_end_matches('}');
        let groups: Vec<&str> = s.split('-').collect();
        let lens: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        if lens != [8, 4, 4, 4, 12] {
            return None;
        }
        let hex: String = groups.concat();
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u128::from_str_radix(&hex, 16).ok().map(Self::from_u128)
    }
}

impl FromStr for Guid {
    type Err = NdrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| NdrError::InvalidString(format!("malformed GUID: {s}")))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, d[0], d[1]
        )?;
        d[2..].iter().try_for_each(|b| write!(f, "{:02x}", b))
    }
}

impl NdrEncode for Guid {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_u32(self.data1);
        w.write_u16(self.data2);
        w.write_u16(self.data3);
        w.write_bytes(&self.data4);
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for Guid {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let data1 = r.read_u32()?;
        let data2 = r.read_u16()?;
        let data3 = r.read_u16()?;
        let tail = r.read_bytes(8)?;
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&tail);
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        16
    }
}
