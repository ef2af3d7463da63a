//! The codec boundary: concrete PNG/BMP/JPEG parsers and writers are
//! external collaborators. This module specifies only the narrow interface
//! the core consumes from them, plus the header-sniff dispatch that picks
//! one out of a registered set.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::buffer::DynBuffer;
use crate::error::{Error, Result};

/// One concrete image format's decode/encode contract.
///
/// Implementations are expected to be cheap to construct and stateless
/// (or internally synchronised); the core only ever holds them behind
/// `Arc<dyn Codec>`.
pub trait Codec: Send + Sync {
    /// Number of leading bytes `matches` needs to see.
    fn header_size(&self) -> usize;

    /// Whether `header` (exactly `header_size()` bytes, or fewer at
    /// end-of-stream) identifies this codec's format.
    fn matches(&self, header: &[u8]) -> bool;

    /// Decode a full image from `reader`, positioned at the start of the
    /// stream (the dispatcher has already rewound it past the header
    /// sniff).
    fn decode(&self, reader: &mut dyn Read) -> Result<DynBuffer>;

    /// Encode `buffer` (already converted to this codec's required pixel
    /// format by the caller) to `writer`, at `quality` in `[1, 100]`.
    fn encode(&self, writer: &mut dyn std::io::Write, buffer: &DynBuffer, quality: u8) -> Result<()>;

    /// Lower-case encoder type tags this codec accepts for `encode`
    /// dispatch (e.g. `"png"`). Empty by default, for decode-only codecs.
    fn encoder_tags(&self) -> &[&str] {
        &[]
    }
}

/// Load/save configuration: the registered codecs (tried in order) and how
/// many header bytes the dispatcher is willing to buffer.
#[derive(Clone)]
pub struct Config {
    /// Maximum number of leading bytes read for format sniffing.
    pub max_header_size: usize,
    /// Codecs tried in registration order; the first whose `matches`
    /// returns true wins.
    pub codecs: Vec<Arc<dyn Codec>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_header_size: 512,
            codecs: Vec::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec, trying it after every codec already registered.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.push(codec);
        self
    }
}

/// Read up to `config.max_header_size` bytes from `stream`, test every
/// registered codec in order, rewind the stream, and return the first
/// match (not yet invoked to decode).
pub fn detect<S: Read + Seek>(stream: &mut S, config: &Config) -> Result<Arc<dyn Codec>> {
    let mut header = vec![0u8; config.max_header_size];
    let read = read_up_to(stream, &mut header)?;
    header.truncate(read);
    stream.seek(SeekFrom::Start(0))?;

    if header.is_empty() {
        return Err(Error::invalid_data("stream is empty, no header to sniff"));
    }

    for codec in &config.codecs {
        let needed = codec.header_size().min(header.len());
        if codec.matches(&header[..needed]) {
            log::debug!("codec dispatch matched after {} bytes of header", needed);
            return Ok(Arc::clone(codec));
        }
    }

    Err(Error::invalid_data("no registered codec matched the stream header"))
}

fn read_up_to<S: Read>(stream: &mut S, buffer: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buffer.len() {
        let read = stream.read(&mut buffer[total..])?;
        if read == 0 {
            break;
        }
        total += read;
    }
    Ok(total)
}

/// Decode `stream` by detecting its codec via `config`, then delegating.
pub fn decode<S: Read + Seek>(stream: &mut S, config: &Config) -> Result<DynBuffer> {
    let codec = detect(stream, config)?;
    codec.decode(stream)
}

/// Encode `buffer` with the first registered codec whose `encoder_tag`
/// (already lower-cased by the caller) it reports support for.
pub fn encode<W: std::io::Write>(
    writer: &mut W,
    buffer: &DynBuffer,
    encoder_tag: &str,
    quality: u8,
    config: &Config,
) -> Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(Error::invalid_argument(format!(
            "quality must be in [1, 100], got {quality}"
        )));
    }

    for codec in &config.codecs {
        if codec.encoder_tags().iter().any(|t| t.eq_ignore_ascii_case(encoder_tag)) {
            return codec.encode(writer, buffer, quality);
        }
    }

    Err(Error::unsupported(format!(
        "no registered codec supports encoder tag '{encoder_tag}'"
    )))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::io::Cursor;

    pub(crate) const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// A minimal fixture codec recognising the PNG magic header and
    /// "decoding" to a fixed 1x1 buffer, for exercising dispatch without a
    /// real image format implementation.
    pub(crate) struct FixturePngCodec;

    impl Codec for FixturePngCodec {
        fn header_size(&self) -> usize {
            PNG_HEADER.len()
        }

        fn matches(&self, header: &[u8]) -> bool {
            header.len() >= PNG_HEADER.len() && header[..PNG_HEADER.len()] == PNG_HEADER
        }

        fn decode(&self, _reader: &mut dyn Read) -> Result<DynBuffer> {
            use crate::element::L8;
            use crate::buffer::Packed;
            Ok(DynBuffer::Mono8(Packed::from_slice(1, 1, &[L8(0)]).unwrap()))
        }

        fn encode(&self, writer: &mut dyn std::io::Write, _buffer: &DynBuffer, _quality: u8) -> Result<()> {
            writer.write_all(&PNG_HEADER)?;
            Ok(())
        }

        fn encoder_tags(&self) -> &[&str] {
            &["png"]
        }
    }

    pub(crate) fn stream_with_header(header: &[u8]) -> Cursor<Vec<u8>> {
        Cursor::new(header.to_vec())
    }

    #[test]
    fn png_header_is_detected_before_later_codecs() {
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let mut stream = stream_with_header(&PNG_HEADER);
        let codec = detect(&mut stream, &config).unwrap();
        assert!(codec.matches(&PNG_HEADER));
        // stream was rewound
        let mut rewound = [0u8; 8];
        stream.read_exact(&mut rewound).unwrap();
        assert_eq!(rewound, PNG_HEADER);
    }

    #[test]
    fn unmatched_header_without_a_registered_codec_is_invalid_data() {
        let config = Config::new();
        let mut stream = stream_with_header(&PNG_HEADER);
        assert!(matches!(detect(&mut stream, &config), Err(Error::InvalidData { .. })));
    }

    #[test]
    fn empty_stream_is_invalid_data() {
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let mut stream: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        assert!(matches!(detect(&mut stream, &config), Err(Error::InvalidData { .. })));
    }

    #[test]
    fn encode_dispatches_on_matching_tag_case_insensitively() {
        use crate::element::L8;
        use crate::buffer::Packed;

        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let buffer = DynBuffer::Mono8(Packed::from_slice(1, 1, &[L8(0)]).unwrap());
        let mut out = Vec::new();
        encode(&mut out, &buffer, "PNG", 80, &config).unwrap();
        assert_eq!(out, PNG_HEADER);
    }

    #[test]
    fn encode_with_unregistered_tag_is_unsupported() {
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let buffer = DynBuffer::Mono8(crate::buffer::Packed::from_slice(1, 1, &[crate::element::L8(0)]).unwrap());
        let mut out = Vec::new();
        assert!(matches!(
            encode(&mut out, &buffer, "bmp", 80, &config),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn encode_rejects_quality_out_of_range() {
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let buffer = DynBuffer::Mono8(crate::buffer::Packed::from_slice(1, 1, &[crate::element::L8(0)]).unwrap());
        let mut out = Vec::new();
        assert!(matches!(
            encode(&mut out, &buffer, "png", 0, &config),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
