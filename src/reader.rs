use crate::{AsepriteParseError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

// Sizes come from the file, so do not trust them for up-front allocation.
const MAX_PREALLOCATION: usize = 1 << 24;

// Forward-only cursor over a byte buffer. `base` is the absolute file offset
// of the buffer start so that errors can point into the original file.
pub(crate) struct AseReader<'a> {
    input: Cursor<&'a [u8]>,
    base: u64,
}

impl<'a> AseReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub(crate) fn at(data: &'a [u8], base: u64) -> Self {
        AseReader {
            input: Cursor::new(data),
            base,
        }
    }

    /// Absolute position of the cursor in the file.
    pub(crate) fn position(&self) -> u64 {
        self.base + self.input.position()
    }

    pub(crate) fn remaining(&self) -> usize {
        let len = self.input.get_ref().len() as u64;
        (len - self.input.position().min(len)) as usize
    }

    fn truncated(&self, wanted: usize) -> AsepriteParseError {
        AsepriteParseError::TruncatedInput {
            offset: self.position(),
            wanted,
        }
    }

    fn ensure(&self, wanted: usize) -> Result<()> {
        if self.remaining() < wanted {
            Err(self.truncated(wanted))
        } else {
            Ok(())
        }
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        self.input.read_u8().map_err(|_| self.truncated(1))
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.ensure(2)?;
        self.input
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated(2))
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.ensure(2)?;
        self.input
            .read_i16::<LittleEndian>()
            .map_err(|_| self.truncated(2))
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.ensure(4)?;
        self.input
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated(4))
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        self.ensure(4)?;
        self.input
            .read_i32::<LittleEndian>()
            .map_err(|_| self.truncated(4))
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let str_len = self.word()?;
        let str_bytes = self.bytes(str_len as usize)?;
        let s = String::from_utf8(str_bytes.to_vec())?;
        Ok(s)
    }

    /// Borrow the next `count` bytes without copying them.
    pub(crate) fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let data: &'a [u8] = *self.input.get_ref();
        let start = self.input.position() as usize;
        self.input.set_position((start + count) as u64);
        Ok(&data[start..start + count])
    }

    pub(crate) fn skip_reserved(&mut self, count: usize) -> Result<()> {
        self.bytes(count).map(|_| ())
    }

    /// Inflate everything that is left in the buffer.
    pub(crate) fn unzip(self, expected_output_size: usize) -> Result<Vec<u8>> {
        let start = self.position();
        let decoder = ZlibDecoder::new(self.input);
        // One extra byte lets us detect oversized streams without inflating
        // them completely.
        let mut limited = decoder.take(expected_output_size as u64 + 1);
        let mut buffer = Vec::with_capacity(expected_output_size.min(MAX_PREALLOCATION));
        limited.read_to_end(&mut buffer).map_err(|err| {
            AsepriteParseError::Decompression(format!("zlib stream at offset {}: {}", start, err))
        })?;
        if buffer.len() != expected_output_size {
            return Err(AsepriteParseError::Decompression(format!(
                "zlib stream at offset {} has wrong size. Expected: {} bytes",
                start, expected_output_size
            )));
        }
        Ok(buffer)
    }

    /// Inflate a block of exactly `compressed_len` bytes.
    pub(crate) fn unzip_block(
        &mut self,
        compressed_len: usize,
        expected_output_size: usize,
    ) -> Result<Vec<u8>> {
        let base = self.position();
        let block = self.bytes(compressed_len)?;
        AseReader::at(block, base).unzip(expected_output_size)
    }
}
