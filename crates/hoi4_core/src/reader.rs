use std::io::{self, Read};

/// Little-endian primitive reader that counts consumed bytes, so decode
/// failures can report where in the stream they happened.
pub struct LittleEndianReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Starts counting from `position` instead of zero; used when the caller
    /// already consumed a header from the same stream.
    pub fn with_offset(inner: R, position: u64) -> Self {
        Self { inner, position }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let buf: [u8; 1] = self.read_array()?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a `u16` only if both bytes are available. A clean end of stream,
    /// or a single dangling byte, yields `Ok(None)`.
    pub fn try_read_u16(&mut self) -> io::Result<Option<u16>> {
        let mut buf = [0u8; 2];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.position += filled as u64;
        if filled < buf.len() {
            return Ok(None);
        }
        Ok(Some(u16::from_le_bytes(buf)))
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        self.position += n as u64;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.position += N as u64;
        Ok(buf)
    }
}
