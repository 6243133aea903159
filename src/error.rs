use std::{error::Error as StdError, fmt, io, string::FromUtf8Error};

/// An error occured while decoding the Aseprite file.
#[derive(Debug)]
pub enum AsepriteParseError {
    /// A read would go past the end of the input. `offset` is the absolute
    /// position in the file where the read started.
    TruncatedInput {
        /// Absolute byte offset of the failed read.
        offset: u64,
        /// Number of bytes the read needed.
        wanted: usize,
    },
    /// The file or frame header is not an Aseprite header.
    InvalidHeader(String),
    /// A chunk with a type tag outside the supported set.
    UnsupportedChunk {
        /// The chunk type tag.
        chunk_type: u16,
        /// Absolute byte offset of the chunk header.
        offset: u64,
    },
    /// A compressed block could not be inflated.
    Decompression(String),
    /// The input data was malformed. String contains detailed message.
    InvalidInput(String),
    /// The input data was correct, but uses a feature that is not supported by
    /// this version of `asepack`. String contains detailed message.
    UnsupportedFeature(String),
}

impl From<FromUtf8Error> for AsepriteParseError {
    fn from(err: FromUtf8Error) -> Self {
        AsepriteParseError::InvalidInput(format!("Could not decode utf8: {}", err))
    }
}

impl fmt::Display for AsepriteParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsepriteParseError::TruncatedInput { offset, wanted } => write!(
                f,
                "Truncated Aseprite input: needed {} bytes at offset {}",
                wanted, offset
            ),
            AsepriteParseError::InvalidHeader(msg) => {
                write!(f, "Invalid Aseprite header: {}", msg)
            }
            AsepriteParseError::UnsupportedChunk { chunk_type, offset } => write!(
                f,
                "Invalid or unsupported chunk type 0x{:04x} at offset {}",
                chunk_type, offset
            ),
            AsepriteParseError::Decompression(msg) => {
                write!(f, "Could not decompress data: {}", msg)
            }
            AsepriteParseError::InvalidInput(msg) => write!(f, "Invalid Aseprite input: {}", msg),
            AsepriteParseError::UnsupportedFeature(msg) => {
                write!(f, "Unsupported Aseprite feature: {}", msg)
            }
        }
    }
}

impl StdError for AsepriteParseError {}

/// An error occured while turning a parsed file into raw bundles.
///
/// These errors come from compositing, packing or building the raw model and
/// are distinct from decoding errors: the file was read fine, but it cannot be
/// turned into the requested output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Cel geometry or cel data is inconsistent.
    Composite(String),
    /// An image does not fit into the largest supported atlas.
    Packing(String),
    /// Two tags share the same name. Animations are looked up by name so tag
    /// names must be unique even though Aseprite allows duplicates.
    DuplicateTagName(String),
    /// Two slices share the same name.
    DuplicateSliceName(String),
    /// The requested frame does not exist.
    InvalidFrame(u32),
    /// The requested tileset does not exist.
    MissingTileset(u32),
    /// The [ProcessorOptions](crate::ProcessorOptions) are out of range.
    InvalidOptions(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Composite(msg) => write!(f, "Could not composite frame: {}", msg),
            ProcessError::Packing(msg) => write!(f, "Could not pack atlas: {}", msg),
            ProcessError::DuplicateTagName(name) => write!(
                f,
                "Duplicate tag name '{}'. Tags must have unique names to be used as animations",
                name
            ),
            ProcessError::DuplicateSliceName(name) => {
                write!(f, "Duplicate slice name '{}'", name)
            }
            ProcessError::InvalidFrame(frame) => write!(f, "Frame {} does not exist", frame),
            ProcessError::MissingTileset(id) => write!(f, "Tileset {} does not exist", id),
            ProcessError::InvalidOptions(msg) => write!(f, "Invalid processor options: {}", msg),
        }
    }
}

impl StdError for ProcessError {}

/// An error occured while writing or reading a raw bundle.
#[derive(Debug)]
pub enum RawFormatError {
    /// The input does not start with the raw bundle magic marker.
    BadMagic([u8; 4]),
    /// The input was written by a newer version of the format.
    UnsupportedVersion {
        /// Version found in the input.
        found: u16,
        /// Newest version this build can read.
        supported: u16,
    },
    /// The bundle kind tag is not known.
    UnknownKind(u8),
    /// The input ended in the middle of a field.
    Truncated {
        /// Byte offset of the failed read.
        offset: u64,
    },
    /// A field holds a value that is not allowed.
    InvalidInput(String),
    /// The output writer failed.
    Io(io::Error),
}

impl From<io::Error> for RawFormatError {
    fn from(err: io::Error) -> Self {
        RawFormatError::Io(err)
    }
}

impl fmt::Display for RawFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFormatError::BadMagic(found) => {
                write!(f, "Not a raw bundle. Bad magic marker: {:02x?}", found)
            }
            RawFormatError::UnsupportedVersion { found, supported } => write!(
                f,
                "Raw bundle version {} is newer than supported version {}",
                found, supported
            ),
            RawFormatError::UnknownKind(kind) => write!(f, "Unknown raw bundle kind: {}", kind),
            RawFormatError::Truncated { offset } => {
                write!(f, "Raw bundle truncated at offset {}", offset)
            }
            RawFormatError::InvalidInput(msg) => write!(f, "Invalid raw bundle: {}", msg),
            RawFormatError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl StdError for RawFormatError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RawFormatError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Any error of the full decode, process and serialize pipeline.
#[derive(Debug)]
pub enum Error {
    /// Decoding the Aseprite file failed.
    Parse(AsepriteParseError),
    /// Building the raw bundle failed.
    Process(ProcessError),
    /// Writing or reading the raw bundle failed.
    Format(RawFormatError),
}

impl From<AsepriteParseError> for Error {
    fn from(err: AsepriteParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<ProcessError> for Error {
    fn from(err: ProcessError) -> Self {
        Error::Process(err)
    }
}

impl From<RawFormatError> for Error {
    fn from(err: RawFormatError) -> Self {
        Error::Format(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Process(err) => err.fmt(f),
            Error::Format(err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Process(err) => Some(err),
            Error::Format(err) => Some(err),
        }
    }
}
