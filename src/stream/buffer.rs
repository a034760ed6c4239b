//! Bounded byte buffer for partial records

use bytes::{Buf, BytesMut};

use crate::error::{StreamError, StreamResult};

/// Spare capacity kept after [`ByteBuffer::compact`]
const COMPACT_SLACK: usize = 16 * 1024;

/// Growable byte queue with a hard size limit.
///
/// Bytes are appended at the back and consumed from the front. Growth past
/// `limit` fails instead of allocating.
#[derive(Debug)]
pub struct ByteBuffer {
    buf: BytesMut,
    limit: usize,
}

impl ByteBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Buffered bytes, front first
    pub fn peek(&self) -> &[u8] {
        &self.buf
    }

    /// Append `data`, failing if the total would exceed the limit.
    pub fn append(&mut self, data: &[u8]) -> StreamResult<()> {
        let attempted = self
            .buf
            .len()
            .checked_add(data.len())
            .ok_or(StreamError::BufferOverflow {
                limit: self.limit,
                attempted: usize::MAX,
            })?;
        if attempted > self.limit {
            return Err(StreamError::BufferOverflow {
                limit: self.limit,
                attempted,
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Drop `n` bytes from the front. Consuming past the end is an
    /// invalid-frame error and leaves the buffer untouched.
    pub fn consume(&mut self, n: usize) -> StreamResult<()> {
        if n > self.buf.len() {
            return Err(StreamError::InvalidFrame {
                details: format!("consume {} of {} buffered bytes", n, self.buf.len()),
            });
        }
        self.buf.advance(n);
        Ok(())
    }

    /// Remove and return everything buffered.
    pub fn take_all(&mut self) -> Vec<u8> {
        self.buf.split().to_vec()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Release capacity left behind by a burst of large records.
    pub fn compact(&mut self) {
        if self.buf.capacity() > self.buf.len() + COMPACT_SLACK {
            self.buf = BytesMut::from(&self.buf[..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_consume() {
        let mut buf = ByteBuffer::new(16);
        buf.append(b"hello").unwrap();
        buf.append(b" world").unwrap();
        assert_eq!(buf.peek(), b"hello world");

        buf.consume(6).unwrap();
        assert_eq!(buf.peek(), b"world");
        assert_eq!(buf.len(), 5);

        assert_eq!(buf.take_all(), b"world");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_limit_enforced() {
        let mut buf = ByteBuffer::new(8);
        buf.append(&[0u8; 8]).unwrap();
        let err = buf.append(&[0u8; 1]).unwrap_err();
        assert!(matches!(
            err,
            StreamError::BufferOverflow { limit: 8, attempted: 9 }
        ));
        // failed append leaves contents intact
        assert_eq!(buf.len(), 8);

        buf.consume(4).unwrap();
        buf.append(&[1u8; 4]).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_consume_past_end() {
        let mut buf = ByteBuffer::new(8);
        buf.append(b"abc").unwrap();
        assert!(buf.consume(4).is_err());
        assert_eq!(buf.peek(), b"abc");
        buf.consume(3).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_compact_releases_capacity() {
        let mut buf = ByteBuffer::new(1 << 20);
        buf.append(&vec![7u8; 256 * 1024]).unwrap();
        buf.consume(256 * 1024 - 3).unwrap();
        buf.compact();
        assert_eq!(buf.peek(), &[7, 7, 7]);
        assert!(buf.buf.capacity() <= 3 + COMPACT_SLACK);
    }
}
