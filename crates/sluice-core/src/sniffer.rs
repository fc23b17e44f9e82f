//! File-type classification by magic bytes and codec suffix.
//!
//! The checks run in a fixed order:
//!
//! 1. an empty object is [`FileType::PlainText`];
//! 2. an object starting with `SEQ` is a [`FileType::SequenceContainer`];
//! 3. otherwise the file name is looked up in the codec registry, giving
//!    [`FileType::CompressedText`] on a hit and [`FileType::PlainText`] on a
//!    miss.
//!
//! Open and read failures are returned to the caller. The reader is dropped
//! on every exit path.

use std::io::SeekFrom;

use object_store::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::codec::CodecRegistry;
use crate::config::SchemeConfiguration;
use crate::emit;
use crate::error::StorageError;
use crate::metrics::events::FileClassified;
use crate::storage::{OpenedObject, StorageClient};

/// Big-endian value of the first two magic bytes, `'S' 'E'`.
pub const SEQUENCE_MAGIC: u16 = 0x5345;

/// Byte following [`SEQUENCE_MAGIC`].
pub const SEQUENCE_MARKER: u8 = b'Q';

/// Encoding of a file as seen by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    PlainText,
    CompressedText,
    SequenceContainer,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::PlainText => "plain_text",
            FileType::CompressedText => "compressed_text",
            FileType::SequenceContainer => "sequence_container",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `path` using the codecs enabled in `configuration`.
pub async fn classify<C>(
    client: &C,
    path: &Path,
    configuration: &SchemeConfiguration,
) -> Result<FileType, StorageError>
where
    C: StorageClient + ?Sized,
{
    classify_with(client, path, &CodecRegistry::from_configuration(configuration)).await
}

/// Classify `path` against an explicit codec registry.
pub async fn classify_with<C>(
    client: &C,
    path: &Path,
    codecs: &CodecRegistry,
) -> Result<FileType, StorageError>
where
    C: StorageClient + ?Sized,
{
    let mut object = client.open(path).await?;

    let file_type = if object.is_empty() {
        FileType::PlainText
    } else if has_sequence_magic(&mut object).await? {
        FileType::SequenceContainer
    } else {
        object.seek(SeekFrom::Start(0)).await?;
        let file_name = path.filename().unwrap_or_default();
        match codecs.codec_for(file_name) {
            Some(codec) => {
                debug!(path = %path, codec = codec.name(), "Matched compression codec");
                FileType::CompressedText
            }
            None => FileType::PlainText,
        }
    };
    drop(object);

    debug!(path = %path, file_type = file_type.as_str(), "Classified file");
    emit!(FileClassified { file_type });
    Ok(file_type)
}

/// Read the magic prefix. Objects too short to hold it are not containers.
async fn has_sequence_magic(object: &mut OpenedObject) -> Result<bool, StorageError> {
    let magic = match object.read_u16().await {
        Ok(magic) => magic,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if magic != SEQUENCE_MAGIC {
        return Ok(false);
    }

    match object.read_u8().await {
        Ok(marker) => Ok(marker == SEQUENCE_MARKER),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectStoreClient;
    use std::io::Write;

    async fn client_with(path: &str, bytes: &[u8]) -> ObjectStoreClient {
        let client = ObjectStoreClient::in_memory();
        client.put(&Path::from(path), bytes.to_vec()).await.unwrap();
        client
    }

    async fn classify_default(client: &ObjectStoreClient, path: &str) -> FileType {
        classify(client, &Path::from(path), &SchemeConfiguration::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_is_plain_text_regardless_of_suffix() {
        let client = client_with("data/empty.gz", b"").await;
        assert_eq!(
            classify_default(&client, "data/empty.gz").await,
            FileType::PlainText
        );
    }

    #[tokio::test]
    async fn test_sequence_magic() {
        let client = client_with("data/part-0000", b"SEQ\x06rest of header").await;
        assert_eq!(
            classify_default(&client, "data/part-0000").await,
            FileType::SequenceContainer
        );
    }

    #[tokio::test]
    async fn test_sequence_magic_wins_over_suffix() {
        let client = client_with("data/part-0000.gz", b"SEQ\x06").await;
        assert_eq!(
            classify_default(&client, "data/part-0000.gz").await,
            FileType::SequenceContainer
        );
    }

    #[tokio::test]
    async fn test_registered_suffix_is_compressed_text() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"a,b,c\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let client = client_with("data/part-0000.gz", &compressed).await;
        assert_eq!(
            classify_default(&client, "data/part-0000.gz").await,
            FileType::CompressedText
        );
    }

    #[tokio::test]
    async fn test_unregistered_suffix_is_plain_text() {
        let client = client_with("data/part-0000.txt", b"a,b,c\n").await;
        assert_eq!(
            classify_default(&client, "data/part-0000.txt").await,
            FileType::PlainText
        );
    }

    #[tokio::test]
    async fn test_partial_magic_is_not_a_container() {
        let client = client_with("data/se.gz", b"SE").await;
        assert_eq!(
            classify_default(&client, "data/se.gz").await,
            FileType::CompressedText
        );

        let client = client_with("data/sex", b"SEX").await;
        assert_eq!(classify_default(&client, "data/sex").await, FileType::PlainText);

        let client = client_with("data/one", b"S").await;
        assert_eq!(classify_default(&client, "data/one").await, FileType::PlainText);
    }

    #[tokio::test]
    async fn test_codecs_follow_configuration() {
        let client = client_with("data/part.gz", b"not really gzip").await;
        let path = Path::from("data/part.gz");

        let mut config = SchemeConfiguration::default();
        config.set(crate::config::CODECS_KEY, "bzip2");
        assert_eq!(
            classify(&client, &path, &config).await.unwrap(),
            FileType::PlainText
        );

        assert_eq!(
            classify_with(&client, &path, &CodecRegistry::default())
                .await
                .unwrap(),
            FileType::CompressedText
        );
    }

    #[tokio::test]
    async fn test_missing_file_propagates() {
        let client = ObjectStoreClient::in_memory();
        let err = classify(&client, &Path::from("nope"), &SchemeConfiguration::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
