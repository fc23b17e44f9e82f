//! Compression codec descriptors and the suffix-keyed registry used by the
//! sniffer.
//!
//! A file is treated as compressed text when its name ends with the extension
//! of an enabled codec. The registry never looks at file contents.

use std::sync::Arc;

use tracing::warn;

use crate::config::{CODECS_KEY, SchemeConfiguration};

/// A compression format resolvable by file-name extension.
pub trait CompressionCodec: Send + Sync + std::fmt::Debug {
    /// Short name, also accepted in `io.compression.codecs`.
    fn name(&self) -> &'static str;

    /// File-name extension including the leading dot, e.g. `.gz`.
    fn extension(&self) -> &'static str;

    /// Alternative spellings accepted in `io.compression.codecs`.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCodec;

impl CompressionCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn extension(&self) -> &'static str {
        ".gz"
    }
}

/// Zlib-wrapped deflate streams, historically the "default" codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCodec;

impl CompressionCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn extension(&self) -> &'static str {
        ".deflate"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["default"]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bzip2Codec;

impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn extension(&self) -> &'static str {
        ".bz2"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn extension(&self) -> &'static str {
        ".zst"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["zstandard"]
    }
}

fn builtin() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        Arc::new(GzipCodec),
        Arc::new(DeflateCodec),
        Arc::new(Bzip2Codec),
        Arc::new(ZstdCodec),
    ]
}

/// Map an `io.compression.codecs` entry onto a built-in codec.
///
/// Accepts a codec name or alias, an extension with or without its dot, or a
/// fully-qualified class name such as `org.apache.hadoop.io.compress.GzipCodec`.
fn lookup_builtin(entry: &str) -> Option<Arc<dyn CompressionCodec>> {
    let entry = entry.trim();
    let simple = entry.rsplit('.').next().unwrap_or(entry);
    let simple = simple
        .strip_suffix("Codec")
        .unwrap_or(simple)
        .to_ascii_lowercase();
    let bare = entry.trim_start_matches('.').to_ascii_lowercase();

    builtin().into_iter().find(|codec| {
        codec.name() == simple
            || codec.aliases().contains(&simple.as_str())
            || codec.extension().trim_start_matches('.') == bare
    })
}

/// Codecs keyed by file-name suffix.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn CompressionCodec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self { codecs: builtin() }
    }
}

impl CodecRegistry {
    /// A registry with no codecs; every lookup misses.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Codecs enabled by the bundle's `io.compression.codecs` property, or
    /// every built-in codec when the property is absent.
    pub fn from_configuration(config: &SchemeConfiguration) -> Self {
        let Some(listed) = config.get(CODECS_KEY) else {
            return Self::default();
        };

        let mut registry = Self::empty();
        for entry in listed.split(',').filter(|e| !e.trim().is_empty()) {
            match lookup_builtin(entry) {
                Some(codec) => registry.register(codec),
                None => warn!(codec = entry.trim(), "Ignoring unknown compression codec"),
            }
        }
        registry
    }

    /// Add a codec, replacing any codec already registered for its extension.
    pub fn register(&mut self, codec: Arc<dyn CompressionCodec>) {
        self.codecs.retain(|c| c.extension() != codec.extension());
        self.codecs.push(codec);
    }

    /// Codec whose extension is the longest suffix of `file_name`.
    pub fn codec_for(&self, file_name: &str) -> Option<&dyn CompressionCodec> {
        self.codecs
            .iter()
            .filter(|codec| file_name.ends_with(codec.extension()))
            .max_by_key(|codec| codec.extension().len())
            .map(|codec| codec.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_codecs(value: &str) -> SchemeConfiguration {
        let mut config = SchemeConfiguration::default();
        config.set(CODECS_KEY, value);
        config
    }

    #[test]
    fn test_codec_for_suffix() {
        let registry = CodecRegistry::default();

        assert_eq!(registry.codec_for("part-0000.gz").unwrap().name(), "gzip");
        assert_eq!(registry.codec_for("data.bz2").unwrap().name(), "bzip2");
        assert_eq!(registry.codec_for("x.deflate").unwrap().name(), "deflate");
        assert_eq!(registry.codec_for("x.zst").unwrap().name(), "zstd");
        assert!(registry.codec_for("part-0000.txt").is_none());
        assert!(registry.codec_for("gz").is_none());
    }

    #[test]
    fn test_longest_suffix_wins() {
        #[derive(Debug)]
        struct TarGz;

        impl CompressionCodec for TarGz {
            fn name(&self) -> &'static str {
                "targz"
            }

            fn extension(&self) -> &'static str {
                ".tar.gz"
            }
        }

        let mut registry = CodecRegistry::default();
        registry.register(Arc::new(TarGz));

        assert_eq!(registry.codec_for("bundle.tar.gz").unwrap().name(), "targz");
        assert_eq!(registry.codec_for("plain.gz").unwrap().name(), "gzip");
    }

    #[test]
    fn test_register_replaces_same_extension() {
        #[derive(Debug)]
        struct FastGzip;

        impl CompressionCodec for FastGzip {
            fn name(&self) -> &'static str {
                "fastgzip"
            }

            fn extension(&self) -> &'static str {
                ".gz"
            }
        }

        let mut registry = CodecRegistry::default();
        registry.register(Arc::new(FastGzip));

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.codec_for("a.gz").unwrap().name(), "fastgzip");
    }

    #[test]
    fn test_from_configuration() {
        let registry = CodecRegistry::from_configuration(&SchemeConfiguration::default());
        assert_eq!(registry.len(), 4);

        let registry = CodecRegistry::from_configuration(&config_with_codecs(
            "org.apache.hadoop.io.compress.GzipCodec, bz2, bogus",
        ));
        assert_eq!(registry.names(), vec!["gzip", "bzip2"]);
        assert!(registry.codec_for("a.zst").is_none());

        let registry = CodecRegistry::from_configuration(&config_with_codecs(
            "org.apache.hadoop.io.compress.DefaultCodec,ZStandardCodec",
        ));
        assert_eq!(registry.names(), vec!["deflate", "zstd"]);

        let registry = CodecRegistry::from_configuration(&config_with_codecs(""));
        assert!(registry.is_empty());
    }
}
