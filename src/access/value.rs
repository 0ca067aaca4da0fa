use byteorder::{BigEndian, ReadBytesExt};
use bytes::BufMut;
use std::fmt;
use std::io::{self, Read};

/// Maximum number of content bytes in a `Varchar` field.
pub const STRING_LEN: usize = 128;

/// Data types supported by the database. Every type has a fixed on-disk width.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32 = 2,
    Varchar = 4,
}

impl DataType {
    /// Parse a type name as written in a catalog file.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" => Some(DataType::Int32),
            "string" => Some(DataType::Varchar),
            _ => None,
        }
    }

    /// Width in bytes of a serialized value of this type.
    pub fn byte_len(&self) -> usize {
        match self {
            DataType::Int32 => 4,
            DataType::Varchar => STRING_LEN + 4,
        }
    }

    /// Read one value of this type. Malformed content is reported as
    /// `InvalidData`.
    pub fn read_value<R: Read>(&self, reader: &mut R) -> io::Result<Value> {
        match self {
            DataType::Int32 => Ok(Value::Int32(reader.read_i32::<BigEndian>()?)),
            DataType::Varchar => {
                let len = reader.read_i32::<BigEndian>()?;
                if !(0..=STRING_LEN as i32).contains(&len) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("string length {} out of range", len),
                    ));
                }
                let mut raw = [0u8; STRING_LEN];
                reader.read_exact(&mut raw)?;
                let s = std::str::from_utf8(&raw[..len as usize])
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Value::String(s.to_string()))
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int32 => write!(f, "INT32"),
            DataType::Varchar => write!(f, "VARCHAR"),
        }
    }
}

/// Values that can be stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int32(i32),
    String(String),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::String(_) => DataType::Varchar,
        }
    }

    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        self.data_type() == data_type
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse the textual form of a value of `data_type`.
    pub fn parse(data_type: DataType, text: &str) -> Option<Self> {
        match data_type {
            DataType::Int32 => text.trim().parse().ok().map(Value::Int32),
            DataType::Varchar => Some(Value::String(text.to_string())),
        }
    }

    /// Append exactly `self.data_type().byte_len()` bytes.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        match self {
            Value::Int32(v) => buf.put_i32(*v),
            Value::String(s) => {
                let bytes = truncate_to_boundary(s, STRING_LEN).as_bytes();
                buf.put_i32(bytes.len() as i32);
                buf.put_slice(bytes);
                buf.put_bytes(0, STRING_LEN - bytes.len());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
