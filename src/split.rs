//! Reassembly of responses that the server split over several datagrams.
//!
//! Source engine split layout (after the `-2` header):
//!
//! | field  | type | notes                                       |
//! |--------|------|---------------------------------------------|
//! | id     | u32  | top bit set when the payload is compressed  |
//! | total  | u8   | number of fragments                         |
//! | number | u8   | index of this fragment, starting at 0       |
//! | size   | u16  | maximum fragment size                       |
//! | dsize  | u32  | fragment 0 of a compressed response only    |
//! | crc32  | u32  | fragment 0 of a compressed response only    |
//!
//! The rest of the datagram is payload. Concatenated in index order the
//! payloads form a regular single-header packet (possibly bzip2-compressed).
use std::io::{self, Read};

use bzip2::read::BzDecoder;
use log::{debug, warn};

use crate::error::SourceQueryError;
use crate::packet::{PacketHeader, MAX_PACKET_SIZE};
use crate::parse::{get_i32, get_u16, get_u32, get_u8};

/// Declared size and checksum of a compressed response.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CompressionInfo {
    pub decompressed_size: u32,
    pub checksum: u32,
}

/// Header of one fragment of a split response.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SplitHeader {
    pub id: u32,
    pub total: u8,
    pub number: u8,
    pub size: u16,
    pub compression: Option<CompressionInfo>,
}

impl SplitHeader {
    const COMPRESSED_FLAG: u32 = 0x8000_0000;

    /// Parse a split datagram (including its `-2` header) into the fragment
    /// header and the payload bytes that follow it.
    pub fn parse(datagram: &[u8]) -> Result<(SplitHeader, &[u8]), SourceQueryError> {
        let mut offset: usize = 0;
        let raw_header: i32 = get_i32(datagram, &mut offset)?;
        if PacketHeader::try_from(raw_header)? != PacketHeader::Split {
            return Err(SourceQueryError::UnknownPacketHeader(raw_header));
        }

        let id: u32 = get_u32(datagram, &mut offset)?;
        let total: u8 = get_u8(datagram, &mut offset)?;
        let number: u8 = get_u8(datagram, &mut offset)?;
        let size: u16 = get_u16(datagram, &mut offset)?;

        let compression = if id & Self::COMPRESSED_FLAG != 0 && number == 0 {
            Some(CompressionInfo {
                decompressed_size: get_u32(datagram, &mut offset)?,
                checksum: get_u32(datagram, &mut offset)?,
            })
        } else {
            None
        };

        let header = SplitHeader {
            id,
            total,
            number,
            size,
            compression,
        };
        Ok((header, &datagram[offset..]))
    }

    pub fn is_compressed(&self) -> bool {
        self.id & Self::COMPRESSED_FLAG != 0
    }
}

/// Fragments collected so far for one split response.
///
/// Discarded as a whole on any protocol violation; never shared between requests.
#[derive(Debug)]
pub struct SplitAssembly {
    id: u32,
    total: u8,
    received: u8,
    fragments: Vec<Option<Vec<u8>>>,
    compression: Option<CompressionInfo>,
}

impl SplitAssembly {
    /// Start an assembly sized by the first fragment that arrived.
    pub fn new(first: &SplitHeader) -> Self {
        SplitAssembly {
            id: first.id,
            total: first.total,
            received: 0,
            fragments: vec![None; first.total as usize],
            compression: None,
        }
    }

    /// Store one fragment. Duplicates of an already stored index are ignored.
    pub fn insert(&mut self, header: &SplitHeader, payload: &[u8]) -> Result<(), SourceQueryError> {
        if header.id != self.id {
            return Err(SourceQueryError::RequestIdMismatch {
                expected: self.id,
                got: header.id,
            });
        }
        if header.total != self.total {
            return Err(SourceQueryError::FragmentCountMismatch {
                expected: self.total,
                got: header.total,
            });
        }

        let slot = self
            .fragments
            .get_mut(header.number as usize)
            .ok_or(SourceQueryError::FragmentOutOfRange {
                index: header.number,
                total: self.total,
            })?;
        if slot.is_some() {
            debug!("ignoring duplicate fragment {} of {}", header.number, self.total);
            return Ok(());
        }

        *slot = Some(payload.to_vec());
        if header.compression.is_some() {
            self.compression = header.compression;
        }
        self.received += 1;
        debug!("received fragment {} ({}/{})", header.number, self.received, self.total);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.total
    }

    pub fn is_compressed(&self) -> bool {
        self.id & SplitHeader::COMPRESSED_FLAG != 0
    }

    /// Concatenate the fragments in index order, decompressing if needed.
    pub fn finish(self) -> Result<Vec<u8>, SourceQueryError> {
        let compressed: bool = self.is_compressed();
        let compression: Option<CompressionInfo> = self.compression;

        let mut buffer: Vec<u8> = Vec::new();
        for (index, fragment) in self.fragments.into_iter().enumerate() {
            let fragment = fragment.ok_or(SourceQueryError::FragmentOutOfRange {
                index: index as u8,
                total: self.total,
            })?;
            buffer.extend_from_slice(&fragment);
        }

        if !compressed {
            return Ok(buffer);
        }

        let info = compression.ok_or_else(|| {
            SourceQueryError::Decompress(io::Error::new(
                io::ErrorKind::InvalidData,
                "compressed response without size and checksum",
            ))
        })?;
        decompress(&buffer, info)
    }
}

/// Upper bound on what the fragments of one response can carry.
const MAX_ASSEMBLED_SIZE: usize = u8::MAX as usize * MAX_PACKET_SIZE;

/// Inflate a bzip2 payload and verify it against the declared size and CRC32.
///
/// Inflation stops one byte past the declared size, so a lying server
/// cannot make us expand more than it announced.
pub fn decompress(data: &[u8], info: CompressionInfo) -> Result<Vec<u8>, SourceQueryError> {
    let declared: usize = info.decompressed_size as usize;
    let mut decompressed: Vec<u8> = Vec::with_capacity(declared.min(MAX_ASSEMBLED_SIZE));
    BzDecoder::new(data)
        .take(u64::from(info.decompressed_size) + 1)
        .read_to_end(&mut decompressed)
        .map_err(SourceQueryError::Decompress)?;

    if decompressed.len() != info.decompressed_size as usize {
        warn!(
            "decompressed {} bytes, server declared {}",
            decompressed.len(),
            info.decompressed_size
        );
        return Err(SourceQueryError::DecompressedSizeMismatch {
            expected: info.decompressed_size,
            got: decompressed.len(),
        });
    }

    let computed: u32 = crc32fast::hash(&decompressed);
    if computed != info.checksum {
        warn!("checksum mismatch: declared {:#010X}, computed {:#010X}", info.checksum, computed);
        return Err(SourceQueryError::ChecksumMismatch {
            declared: info.checksum,
            computed,
        });
    }

    Ok(decompressed)
}
