//! Bounds-checked packet reader
//!
//! All reads are big-endian and fail with [`PacketError::Truncated`] instead of
//! reading past the end of the buffer.

use super::error::{PacketError, PacketResult};

/// Text encodings used by string fields on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// One byte per character (ASCII / Latin-1)
    Ascii,
    /// Two bytes per code unit, UTF-16 big-endian
    UnicodeBe,
}

impl TextEncoding {
    fn unit_width(self) -> usize {
        match self {
            TextEncoding::Ascii => 1,
            TextEncoding::UnicodeBe => 2,
        }
    }
}

/// A forward-only reader over one received packet
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> PacketResult<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_i8(&mut self) -> PacketResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> PacketResult<u16> {
        Ok(u16::from_be_bytes(self.read_array::<2>()?))
    }

    pub fn read_i16(&mut self) -> PacketResult<i16> {
        Ok(i16::from_be_bytes(self.read_array::<2>()?))
    }

    pub fn read_u32(&mut self) -> PacketResult<u32> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    /// Borrow the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> PacketResult<&'a [u8]> {
        self.ensure(len)?;
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    pub fn skip(&mut self, len: usize) -> PacketResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a fixed-width string field of exactly `len` bytes.
    ///
    /// The text ends at the first NUL; the rest of the field is padding.
    pub fn read_fixed_string(&mut self, len: usize, encoding: TextEncoding) -> PacketResult<String> {
        let bytes = self.read_bytes(len)?;
        Ok(decode_text(bytes, encoding))
    }

    /// Read a NUL-terminated string.
    ///
    /// A missing terminator is not an error: the string runs to the end of the buffer.
    pub fn read_terminated_string(&mut self, encoding: TextEncoding) -> PacketResult<String> {
        let width = encoding.unit_width();
        let rest = &self.data[self.pos.min(self.data.len())..];

        let mut end = 0;
        let mut consumed = rest.len();
        while end + width <= rest.len() {
            if rest[end..end + width].iter().all(|&b| b == 0) {
                consumed = end + width;
                break;
            }
            end += width;
        }

        let text = decode_text(&rest[..end], encoding);
        self.pos += consumed;
        Ok(text)
    }

    fn ensure(&self, needed: usize) -> PacketResult<()> {
        let available = self.remaining();
        if needed > available {
            return Err(PacketError::Truncated {
                needed,
                available,
                offset: self.pos,
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> PacketResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

fn decode_text(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Ascii => bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect(),
        TextEncoding::UnicodeBe => {
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .take_while(|&unit| unit != 0);
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_big_endian() {
        let mut cursor = ByteCursor::new(&[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xff]);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_u16().unwrap(), 0x9abc);
        assert_eq!(cursor.read_i8().unwrap(), -1);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_truncated_read_does_not_advance() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02, 0x03]);
        assert_eq!(cursor.read_u8().unwrap(), 1);

        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            PacketError::Truncated {
                needed: 4,
                available: 2,
                offset: 1
            }
        );
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_u16().unwrap(), 0x0203);
    }

    #[test]
    fn test_fixed_ascii_strips_padding() {
        let mut data = b"Lord British".to_vec();
        data.resize(30, 0);
        data.push(0x7f);

        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_fixed_string(30, TextEncoding::Ascii).unwrap(),
            "Lord British"
        );
        assert_eq!(cursor.read_u8().unwrap(), 0x7f);
    }

    #[test]
    fn test_fixed_string_truncated() {
        let mut cursor = ByteCursor::new(b"short");
        assert!(matches!(
            cursor.read_fixed_string(30, TextEncoding::Ascii),
            Err(PacketError::Truncated { needed: 30, .. })
        ));
    }

    #[test]
    fn test_terminated_unicode() {
        let data = [0x00, b'h', 0x00, b'i', 0x00, 0x00, 0x42];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_terminated_string(TextEncoding::UnicodeBe).unwrap(),
            "hi"
        );
        assert_eq!(cursor.read_u8().unwrap(), 0x42);
    }

    #[test]
    fn test_terminated_missing_terminator_reads_to_end() {
        let data = [0x00, b'o', 0x00, b'k', 0x00];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_terminated_string(TextEncoding::UnicodeBe).unwrap(),
            "ok"
        );
        assert!(cursor.is_empty());

        let mut cursor = ByteCursor::new(b"abc");
        assert_eq!(cursor.read_terminated_string(TextEncoding::Ascii).unwrap(), "abc");
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_terminated_string(TextEncoding::Ascii).unwrap(), "");
    }

    #[test]
    fn test_unpaired_surrogate_is_replaced() {
        let data = [0xd8, 0x00, 0x00, b'x'];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_fixed_string(4, TextEncoding::UnicodeBe).unwrap(),
            "\u{fffd}x"
        );
    }
}
