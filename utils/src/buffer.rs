use thiserror::Error;

/// A buffer reader, used to decode big-endian data from a byte array, starting at any offset
pub struct Buffer<'a> {
    buffer: &'a [u8],
    position: usize,
}

/// Errors related to reading from a [Buffer]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of data")]
    UnexpectedEndOfData,
}

type Result<T> = std::result::Result<T, BufferError>;

impl<'a> Buffer<'a> {
    /// Creates a buffer whose first read happens at the given offset
    pub fn at(data: &'a [u8], position: usize) -> Result<Self> {
        if position > data.len() {
            Err(BufferError::UnexpectedEndOfData)
        } else {
            Ok(Buffer {
                buffer: data,
                position,
            })
        }
    }

    fn advance(&mut self, size: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(size)
            .ok_or(BufferError::UnexpectedEndOfData)?;
        if end > self.buffer.len() {
            Err(BufferError::UnexpectedEndOfData)
        } else {
            let slice = &self.buffer[self.position..end];
            self.position = end;
            Ok(slice)
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.advance(std::mem::size_of::<u32>())
            .map(|bytes| u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Number of bytes that can still be read
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}
