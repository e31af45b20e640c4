use std::io::{self, Read, Write};

use bytemuck::cast_slice;

pub fn as_byte_slice(input: &[u16]) -> &[u8] {
    cast_slice(input)
}

////////////////////////////////////////////////////////////////////////////////

/// Fill `buf` from `reader`, treating anything past the end as zeros.
pub fn read_sparse<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    buf[filled..].fill(0);
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

// Little-endian, the byte order of the PDP-11 and of RK05 images.
// Words past the end of the stream read as zero.
pub trait ReadU16 {
    fn read_u16(&mut self) -> io::Result<u16>;
}

impl<T: Read + ?Sized> ReadU16 for T {
    fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        read_sparse(self, &mut buf)?;
        let lower = buf[0] as u16;
        let upper = buf[1] as u16;
        Ok(lower | (upper << u8::BITS))
    }
}

pub trait WriteU16 {
    fn write_u16(&mut self, val: u16) -> io::Result<()>;
}

impl<T: Write + ?Sized> WriteU16 for T {
    fn write_u16(&mut self, val: u16) -> io::Result<()> {
        let lower = val as u8;
        let upper = (val >> u8::BITS) as u8;
        self.write_all(&[lower, upper])
    }
}
