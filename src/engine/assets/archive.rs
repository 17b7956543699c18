// Tagged binary archive reader/writer
//
// Layout: a 16 byte header (magic tag, version, record count) followed by a
// payload of little records. Values use the host byte order.

use super::AssetError;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Current archive format version
pub const ARCHIVE_VERSION: u32 = 1;

/// Fixed-size archive header
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes)]
pub struct ArchiveHeader {
    /// Type tag identifying what the archive contains
    pub magic: [u8; 8],
    pub version: u32,
    /// Number of top-level records (joints or tracks)
    pub count: u32,
}

impl ArchiveHeader {
    pub const SIZE: usize = std::mem::size_of::<ArchiveHeader>();

    pub fn new(magic: [u8; 8], count: u32) -> Self {
        Self {
            magic,
            version: ARCHIVE_VERSION,
            count,
        }
    }

    /// Human readable form of the tag for error messages
    pub fn tag_string(magic: &[u8; 8]) -> String {
        String::from_utf8_lossy(magic)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// Cursor over an archive payload
pub struct ArchiveReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ArchiveReader<'a> {
    /// Validate the header against `magic` and position the cursor on the payload
    pub fn open(bytes: &'a [u8], magic: [u8; 8], path: &str) -> Result<(ArchiveHeader, Self), AssetError> {
        let header = ArchiveHeader::read_from_prefix(bytes).ok_or(AssetError::Truncated {
            offset: 0,
            needed: ArchiveHeader::SIZE,
        })?;

        if header.magic != magic {
            return Err(AssetError::InvalidTag {
                path: path.to_string(),
                expected: ArchiveHeader::tag_string(&magic),
                found: ArchiveHeader::tag_string(&header.magic),
            });
        }

        if header.version != ARCHIVE_VERSION {
            return Err(AssetError::UnsupportedVersion(header.version));
        }

        Ok((
            header,
            Self {
                bytes,
                offset: ArchiveHeader::SIZE,
            },
        ))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AssetError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(AssetError::Truncated {
                offset: self.offset,
                needed: len,
            })?;

        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, AssetError> {
        Ok(bytemuck::pod_read_unaligned(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, AssetError> {
        Ok(bytemuck::pod_read_unaligned(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, AssetError> {
        Ok(bytemuck::pod_read_unaligned(self.take(4)?))
    }

    /// Read one plain-old-data record
    pub fn read_pod<T: bytemuck::Pod>(&mut self) -> Result<T, AssetError> {
        Ok(bytemuck::pod_read_unaligned(
            self.take(std::mem::size_of::<T>())?,
        ))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, AssetError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AssetError::Malformed(format!("invalid UTF-8 name: {}", e)))
    }

    /// Check that `count` records of at least `min_record_size` bytes fit in
    /// the rest of the payload, and return `count` as a capacity
    pub fn record_capacity(&self, count: u32, min_record_size: usize) -> Result<usize, AssetError> {
        let count = count as usize;
        match count.checked_mul(min_record_size) {
            Some(needed) if needed <= self.remaining() => Ok(count),
            _ => Err(AssetError::Malformed(format!(
                "{} records of {} bytes claimed but only {} bytes remain",
                count,
                min_record_size,
                self.remaining()
            ))),
        }
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

/// Builds archives in memory (used by tooling and tests)
pub struct ArchiveWriter {
    bytes: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new(magic: [u8; 8], count: u32) -> Self {
        let header = ArchiveHeader::new(magic, count);
        Self {
            bytes: header.as_bytes().to_vec(),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(&value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(&value));
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(&value));
    }

    pub fn write_pod<T: bytemuck::Pod>(&mut self, value: &T) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: [u8; 8] = *b"TESTARC\0";

    #[test]
    fn test_header_size() {
        assert_eq!(ArchiveHeader::SIZE, 16);
    }

    #[test]
    fn test_reader_reads_written_values() {
        let mut writer = ArchiveWriter::new(TAG, 2);
        writer.write_string("spine");
        writer.write_i32(-1);
        writer.write_f32(0.5);
        let bytes = writer.finish();

        let (header, mut reader) = ArchiveReader::open(&bytes, TAG, "test").unwrap();
        assert_eq!(header.count, 2);
        assert_eq!(reader.read_string().unwrap(), "spine");
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert_eq!(reader.read_f32().unwrap(), 0.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let bytes = ArchiveWriter::new(*b"OTHER\0\0\0", 0).finish();
        let result = ArchiveReader::open(&bytes, TAG, "other.bin");
        match result {
            Err(AssetError::InvalidTag { expected, found, .. }) => {
                assert_eq!(expected, "TESTARC");
                assert_eq!(found, "OTHER");
            }
            _ => panic!("expected InvalidTag"),
        }
    }

    #[test]
    fn test_short_header_is_truncated() {
        let result = ArchiveReader::open(&[0u8; 7], TAG, "short");
        assert!(matches!(result, Err(AssetError::Truncated { .. })));
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let bytes = ArchiveWriter::new(TAG, 0).finish();
        let (_, mut reader) = ArchiveReader::open(&bytes, TAG, "empty").unwrap();
        assert!(matches!(
            reader.read_u32(),
            Err(AssetError::Truncated {
                offset: 16,
                needed: 4
            })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = ArchiveWriter::new(TAG, 0).finish();
        bytes[8..12].copy_from_slice(&7u32.to_ne_bytes());
        let result = ArchiveReader::open(&bytes, TAG, "v7");
        assert!(matches!(result, Err(AssetError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_record_capacity_checks_remaining_bytes() {
        let mut writer = ArchiveWriter::new(TAG, 2);
        writer.write_u32(7);
        writer.write_u32(9);
        let bytes = writer.finish();

        let (header, reader) = ArchiveReader::open(&bytes, TAG, "counts").unwrap();
        assert_eq!(reader.record_capacity(header.count, 4).unwrap(), 2);
        assert!(matches!(
            reader.record_capacity(3, 4),
            Err(AssetError::Malformed(_))
        ));
        assert!(matches!(
            reader.record_capacity(u32::MAX, usize::MAX),
            Err(AssetError::Malformed(_))
        ));
    }
}
