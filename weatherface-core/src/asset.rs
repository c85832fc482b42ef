//! Weather icon assets
//!
//! Icons are requested by `AssetRef` and streamed by the companion as a
//! sequence of chunks written to the asset characteristic:
//!
//! ```text
//! [asset: u32 LE][offset: u16 LE][total: u16 LE][payload ...]
//! ```
//!
//! A chunk with `total == 0` means the companion does not know the asset.
//! The reassembled blob is `[width: u16 LE][height: u16 LE]` followed by
//! `width * height` RGB565 pixels in big-endian byte order.

use heapless::Vec;

use crate::record::AssetRef;

/// Largest icon edge in pixels
pub const ICON_MAX_EDGE: u16 = 48;
/// Largest pixel payload of an icon
pub const ICON_MAX_BYTES: usize = ICON_MAX_EDGE as usize * ICON_MAX_EDGE as usize * 2;
/// Size of the blob header (width, height)
pub const BLOB_HEADER_LEN: usize = 4;
/// Largest reassembled blob
pub const BLOB_MAX_BYTES: usize = BLOB_HEADER_LEN + ICON_MAX_BYTES;
/// Size of the chunk header
pub const CHUNK_HEADER_LEN: usize = 8;
/// Largest chunk, one GATT write at an ATT MTU of 247
pub const CHUNK_MAX_LEN: usize = 244;
/// Chunks needed for the largest blob at `CHUNK_MAX_LEN`
pub const BLOB_MAX_CHUNKS: usize =
    (BLOB_MAX_BYTES + CHUNK_MAX_LEN - CHUNK_HEADER_LEN - 1) / (CHUNK_MAX_LEN - CHUNK_HEADER_LEN);

/// Asset resolution failures
///
/// None of these are shown to the user; the previous icon stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssetError {
    /// No BLE link came up within the connect timeout
    Timeout,
    /// The link dropped or the request could not be sent
    ConnectionFailed,
    /// Companion answered with an empty stream for this asset
    UnknownAsset,
    /// Transfer ended without any payload
    EmptyStream,
    /// Chunk or blob did not match the expected layout
    Decode,
    /// Blob exceeds `BLOB_MAX_BYTES` or the icon exceeds `ICON_MAX_EDGE`
    TooLarge,
}

/// A decoded weather icon, raw RGB565 big-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    width: u16,
    height: u16,
    data: Vec<u8, ICON_MAX_BYTES>,
}

impl Icon {
    /// Decode a reassembled blob
    pub fn decode(blob: &[u8]) -> Result<Self, AssetError> {
        if blob.is_empty() {
            return Err(AssetError::EmptyStream);
        }
        if blob.len() < BLOB_HEADER_LEN {
            return Err(AssetError::Decode);
        }

        let width = u16::from_le_bytes([blob[0], blob[1]]);
        let height = u16::from_le_bytes([blob[2], blob[3]]);
        if width == 0 || height == 0 {
            return Err(AssetError::Decode);
        }
        if width > ICON_MAX_EDGE || height > ICON_MAX_EDGE {
            return Err(AssetError::TooLarge);
        }

        let pixels = &blob[BLOB_HEADER_LEN..];
        if pixels.len() != width as usize * height as usize * 2 {
            return Err(AssetError::Decode);
        }

        let data = Vec::from_slice(pixels).map_err(|_| AssetError::TooLarge)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Raw RGB565 big-endian pixel data
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Header of a single asset chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkHeader {
    pub asset: AssetRef,
    pub offset: u16,
    pub total: u16,
}

impl ChunkHeader {
    /// Split a chunk into its header and payload
    pub fn parse(chunk: &[u8]) -> Result<(Self, &[u8]), AssetError> {
        if chunk.len() < CHUNK_HEADER_LEN {
            return Err(AssetError::Decode);
        }
        let asset = AssetRef(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        let offset = u16::from_le_bytes([chunk[4], chunk[5]]);
        let total = u16::from_le_bytes([chunk[6], chunk[7]]);
        Ok((
            Self {
                asset,
                offset,
                total,
            },
            &chunk[CHUNK_HEADER_LEN..],
        ))
    }
}

/// Reassembles chunks of the asset currently being waited for
pub struct AssetAssembler {
    /// Asset being assembled, `None` when idle
    expected: Option<AssetRef>,
    /// Total blob length announced by the first chunk
    total: usize,
    buf: Vec<u8, BLOB_MAX_BYTES>,
}

impl Default for AssetAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetAssembler {
    pub const fn new() -> Self {
        Self {
            expected: None,
            total: 0,
            buf: Vec::new(),
        }
    }

    /// Start waiting for `asset`, dropping any partial transfer
    pub fn begin(&mut self, asset: AssetRef) {
        self.expected = Some(asset);
        self.total = 0;
        self.buf.clear();
    }

    /// Stop waiting and drop any partial transfer
    pub fn reset(&mut self) {
        self.expected = None;
        self.total = 0;
        self.buf.clear();
    }

    pub fn expected(&self) -> Option<AssetRef> {
        self.expected
    }

    /// Feed one chunk
    ///
    /// Returns `Ok(Some(blob))` once the announced length has arrived,
    /// `Ok(None)` while more chunks are needed. Chunks for other assets are
    /// ignored. Any error resets the assembler.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<&[u8]>, AssetError> {
        let Some(expected) = self.expected else {
            return Ok(None);
        };
        let (header, payload) = match ChunkHeader::parse(chunk) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };
        if header.asset != expected {
            return Ok(None);
        }

        match self.accept(header, payload) {
            Ok(true) => {
                self.expected = None;
                Ok(Some(&self.buf))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn accept(&mut self, header: ChunkHeader, payload: &[u8]) -> Result<bool, AssetError> {
        if header.total == 0 {
            return Err(AssetError::UnknownAsset);
        }
        let total = header.total as usize;
        if total > BLOB_MAX_BYTES {
            return Err(AssetError::TooLarge);
        }

        if self.buf.is_empty() {
            self.total = total;
        } else if total != self.total {
            return Err(AssetError::Decode);
        }

        // Chunks must arrive in order
        if header.offset as usize != self.buf.len() {
            return Err(AssetError::Decode);
        }
        if self.buf.len() + payload.len() > self.total {
            return Err(AssetError::Decode);
        }
        self.buf
            .extend_from_slice(payload)
            .map_err(|_| AssetError::TooLarge)?;

        Ok(self.buf.len() == self.total)
    }
}
