//! Sequence-container header reader.
//!
//! Layout, in order: the bytes `SEQ`, a version byte, the key and value class
//! names, a compressed flag (version 3+), a block-compressed flag (version 4+)
//! and, for compressed containers of version 5+, the codec class name.
//! Strings are a variable-length integer byte count followed by UTF-8 bytes;
//! containers older than version 6 use a two-byte big-endian count instead.

use object_store::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::StorageError;
use crate::storage::StorageClient;

const MAGIC: &[u8; 3] = b"SEQ";

const VERSION_WITH_COMPRESSION: u8 = 3;
const VERSION_WITH_BLOCK_COMPRESSION: u8 = 4;
const VERSION_WITH_CODEC: u8 = 5;
const VERSION_WITH_VINT_STRINGS: u8 = 6;

/// Longest class name accepted before the header is considered corrupt.
const MAX_CLASS_NAME_LEN: i64 = 64 * 1024;

/// Record key and value types understood by downstream readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritableType {
    Boolean,
    Byte,
    Int,
    VInt,
    Long,
    VLong,
    Double,
    Float,
    Text,
}

impl WritableType {
    /// Map a fully-qualified class name to its type, if it is a known one.
    pub fn from_class_name(class_name: &str) -> Option<Self> {
        let simple = class_name.rsplit('.').next().unwrap_or(class_name);
        match simple {
            "BooleanWritable" => Some(WritableType::Boolean),
            "ByteWritable" => Some(WritableType::Byte),
            "IntWritable" => Some(WritableType::Int),
            "VIntWritable" => Some(WritableType::VInt),
            "LongWritable" => Some(WritableType::Long),
            "VLongWritable" => Some(WritableType::VLong),
            "DoubleWritable" => Some(WritableType::Double),
            "FloatWritable" => Some(WritableType::Float),
            "Text" => Some(WritableType::Text),
            _ => None,
        }
    }
}

/// Decoded container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    pub version: u8,
    pub key_class: String,
    pub value_class: String,
    pub compressed: bool,
    pub block_compressed: bool,
    pub codec_class: Option<String>,
}

impl SequenceHeader {
    pub fn key_type(&self) -> Option<WritableType> {
        WritableType::from_class_name(&self.key_class)
    }

    pub fn value_type(&self) -> Option<WritableType> {
        WritableType::from_class_name(&self.value_class)
    }
}

/// Read the container header of `path`.
///
/// Fails with [`StorageError::InvalidHeader`] when the object is not a
/// container or its header is truncated.
pub async fn read_sequence_header<C>(client: &C, path: &Path) -> Result<SequenceHeader, StorageError>
where
    C: StorageClient + ?Sized,
{
    let mut object = client.open(path).await?;
    let header = decode_header(&mut object).await.map_err(|e| match e {
        HeaderError::Io(source) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
            StorageError::InvalidHeader {
                path: path.to_string(),
                message: "truncated header".to_string(),
            }
        }
        HeaderError::Io(source) => StorageError::Io { source },
        HeaderError::Malformed(message) => StorageError::InvalidHeader {
            path: path.to_string(),
            message,
        },
    })?;

    debug!(
        path = %path,
        version = header.version,
        key_class = %header.key_class,
        value_class = %header.value_class,
        compressed = header.compressed,
        "Read container header"
    );
    Ok(header)
}

enum HeaderError {
    Io(std::io::Error),
    Malformed(String),
}

impl From<std::io::Error> for HeaderError {
    fn from(e: std::io::Error) -> Self {
        HeaderError::Io(e)
    }
}

async fn decode_header<R>(reader: &mut R) -> Result<SequenceHeader, HeaderError>
where
    R: AsyncRead + Unpin,
{
    let mut magic = [0u8; 3];
    reader.read_exact(&mut magic).await?;
    if &magic != MAGIC {
        return Err(HeaderError::Malformed("missing SEQ magic".to_string()));
    }

    let version = reader.read_u8().await?;
    let key_class = read_string(reader, version).await?;
    let value_class = read_string(reader, version).await?;

    let compressed = version >= VERSION_WITH_COMPRESSION && reader.read_u8().await? != 0;
    let block_compressed =
        version >= VERSION_WITH_BLOCK_COMPRESSION && reader.read_u8().await? != 0;
    let codec_class = if compressed && version >= VERSION_WITH_CODEC {
        Some(read_string(reader, version).await?)
    } else {
        None
    };

    Ok(SequenceHeader {
        version,
        key_class,
        value_class,
        compressed,
        block_compressed,
        codec_class,
    })
}

async fn read_string<R>(reader: &mut R, version: u8) -> Result<String, HeaderError>
where
    R: AsyncRead + Unpin,
{
    let len = if version >= VERSION_WITH_VINT_STRINGS {
        read_vlong(reader).await?
    } else {
        i64::from(reader.read_u16().await?)
    };
    if !(0..=MAX_CLASS_NAME_LEN).contains(&len) {
        return Err(HeaderError::Malformed(format!("bad string length {len}")));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    String::from_utf8(buf).map_err(|e| HeaderError::Malformed(e.to_string()))
}

/// Decode a zero-compressed variable-length integer.
///
/// Values in `-112..=127` occupy the first byte. Otherwise the first byte
/// encodes the sign and the count of big-endian magnitude bytes that follow.
pub async fn read_vlong<R>(reader: &mut R) -> std::io::Result<i64>
where
    R: AsyncRead + Unpin,
{
    let first = reader.read_i8().await?;
    if first >= -112 {
        return Ok(i64::from(first));
    }

    let negative = first < -120;
    let len = if negative { -120 - first } else { -112 - first };

    let mut value: i64 = 0;
    for _ in 0..len {
        value = (value << 8) | i64::from(reader.read_u8().await?);
    }
    Ok(if negative { !value } else { value })
}
