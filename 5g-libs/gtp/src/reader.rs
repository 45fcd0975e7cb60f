//! reader - bounds-checked big-endian cursor over a received buffer

use crate::GtpcError;
use std::net::Ipv4Addr;

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], GtpcError> {
        if n > self.remaining() {
            return Err(GtpcError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], GtpcError> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    pub fn read_u8(&mut self) -> Result<u8, GtpcError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, GtpcError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u16_le(&mut self) -> Result<u16, GtpcError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u24_be(&mut self) -> Result<u32, GtpcError> {
        let [a, b, c] = self.take_array()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, GtpcError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u40_be(&mut self) -> Result<u64, GtpcError> {
        let mut a = [0u8; 8];
        a[3..].copy_from_slice(self.take(5)?);
        Ok(u64::from_be_bytes(a))
    }

    pub fn read_u64_be(&mut self) -> Result<u64, GtpcError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_ipv4(&mut self) -> Result<Ipv4Addr, GtpcError> {
        Ok(Ipv4Addr::from(self.take_array::<4>()?))
    }
}
