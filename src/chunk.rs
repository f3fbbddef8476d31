use std::{
    io::{self, Read, Seek, SeekFrom},
    ops::Deref,
};

use log::debug;
use memchr::{memchr, memrchr};

use crate::error::Error;
use crate::parse::TERMINATOR;

/// A block of whole records. Only the last chunk of an input may end without
/// a trailing `\n`.
#[derive(Debug)]
pub struct Chunk(Box<[u8]>);

impl Deref for Chunk {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Chunk {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Splits a buffer on `\n`. The terminator is not part of the yielded line,
/// and a trailing terminator does not produce an extra empty line.
pub struct Lines<'a> {
    remaining: &'a [u8],
}

impl<'a> Lines<'a> {
    pub fn new(items: &'a [u8]) -> Self {
        Self { remaining: items }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        match memchr(TERMINATOR, self.remaining) {
            Some(end) => {
                let line = &self.remaining[..end];
                self.remaining = &self.remaining[end + 1..];
                Some(line)
            }
            None => {
                let line = self.remaining;
                self.remaining = &[];
                Some(line)
            }
        }
    }
}

/// Reads fixed-size blocks from `source` and cuts each one back to its last
/// complete record, rewinding the source so the cut-off tail is read again as
/// the start of the next block.
///
/// A read that fills less than a whole block means end of input; whatever it
/// returned becomes the final chunk, terminator or not. So does a full block
/// without a terminator when nothing follows it.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    offset: u64,
    done: bool,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            source,
            chunk_size,
            offset: 0,
            done: false,
        }
    }

    /// Byte offset of the first record the next chunk will start with.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>, Error> {
        let mut buf = vec![0u8; self.chunk_size];
        let filled = self.fill(&mut buf)?;

        if filled < buf.len() {
            self.done = true;
            buf.truncate(filled);
        } else if let Some(last) = memrchr(TERMINATOR, &buf) {
            let tail = buf.len() - (last + 1);
            if tail > 0 {
                self.source
                    .seek(SeekFrom::Current(-(tail as i64)))
                    .map_err(|source| self.read_error(source))?;
                buf.truncate(last + 1);
            }
        } else if self.at_end()? {
            self.done = true;
        } else {
            return Err(Error::RecordTooLong {
                offset: self.offset,
                chunk_size: self.chunk_size,
            });
        }

        if buf.is_empty() {
            return Ok(None);
        }
        debug!("read chunk of {} bytes at offset {}", buf.len(), self.offset);
        self.offset += buf.len() as u64;
        Ok(Some(Chunk(buf.into_boxed_slice())))
    }

    /// Reads until `buf` is full or the source reports end of input.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(self.read_error(source)),
            }
        }
        Ok(filled)
    }

    /// Checks for end of input by reading one more byte, putting it back if
    /// there was one.
    fn at_end(&mut self) -> Result<bool, Error> {
        let mut probe = [0u8; 1];
        if self.fill(&mut probe)? == 0 {
            return Ok(true);
        }
        self.source
            .seek(SeekFrom::Current(-1))
            .map_err(|source| self.read_error(source))?;
        Ok(false)
    }

    fn read_error(&self, source: io::Error) -> Error {
        Error::Read {
            offset: self.offset,
            source,
        }
    }
}

impl<R: Read + Seek> Iterator for ChunkReader<R> {
    type Item = Result<Chunk, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let chunk = self.read_chunk();
        if !matches!(chunk, Ok(Some(_))) {
            self.done = true;
        }
        chunk.transpose()
    }
}
