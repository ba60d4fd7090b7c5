// lzw.rs
//
// Copyright (c) 2025  The gifload developers
//
//! Lempel-Ziv-Welch expansion for GIF frames
use crate::error::{Error, Result};

/// Maximum code width, in bits
const MAX_BITS: u32 = 12;

/// Code table length (4096 entries)
const TABLE_LEN: usize = 1 << MAX_BITS;

/// Outcome of expanding one frame's code stream.
///
/// Anything short of `Clean` is still a decoded frame; the distinctions
/// only matter for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpandStatus {
    /// Stop code followed directly by the chain terminator
    Clean,
    /// Stop code followed by extra sub-block data
    TrailingData,
    /// Chain ended before the stop code; pixels so far are kept
    MissingStopCode,
}

/// Reader over an LZW sub-block chain.
///
/// Assembles codes LSB-first from the length-prefixed segments,
/// continuing across segment boundaries transparently.
struct ChainReader<'a> {
    /// Input data, starting at the first sub-block length byte
    data: &'a [u8],
    /// Position of the next unread byte
    pos: usize,
    /// Bytes left in the current sub-block
    seq: usize,
    /// Bit accumulator
    load: u32,
    /// Number of bits held in the accumulator
    n_bits: u32,
}

impl<'a> ChainReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ChainReader {
            data,
            pos: 0,
            seq: 0,
            load: 0,
            n_bits: 0,
        }
    }

    /// Read one byte
    fn byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(Error::UnexpectedEndOfData)?;
        self.pos += 1;
        Ok(b)
    }

    /// Read one code of the given width.
    ///
    /// Returns `None` when the chain terminator is reached instead.
    fn code(&mut self, bits: u32, mask: u32) -> Result<Option<u32>> {
        while self.n_bits < bits {
            if self.seq == 0 {
                let len = self.byte()? as usize;
                if len == 0 {
                    return Ok(None);
                }
                self.seq = len;
            }
            let b = self.byte()?;
            self.seq -= 1;
            self.load |= u32::from(b) << self.n_bits;
            self.n_bits += 8;
        }
        let code = self.load & mask;
        self.load >>= bits;
        self.n_bits -= bits;
        Ok(Some(code))
    }

    /// Consume the rest of the chain after a stop code.
    ///
    /// Returns `true` if any data sub-blocks trailed the stop code.
    fn finish(&mut self) -> Result<bool> {
        if self.pos + self.seq > self.data.len() {
            return Err(Error::UnexpectedEndOfData);
        }
        self.pos += self.seq;
        self.seq = 0;
        let mut trailing = false;
        loop {
            let len = self.byte()? as usize;
            if len == 0 {
                return Ok(trailing);
            }
            trailing = true;
            if self.pos + len > self.data.len() {
                return Err(Error::UnexpectedEndOfData);
            }
            self.pos += len;
        }
    }
}

/// LZW expander for frame rasters.
///
/// The code table holds one `u32` per entry:
///
/// * bits 31..24 — suffix byte (last byte of the entry's string)
/// * bits 23..12 — string length minus one
/// * bits 11..0  — prefix code
///
/// Expansion walks the prefix chain from tail to head, writing bytes
/// backward into the output raster, then advances the write position by
/// the string length.
pub(crate) struct Expander {
    /// Code table, reused across frames
    table: Box<[u32]>,
}

impl Expander {
    /// Create an expander with a zeroed code table
    pub fn new() -> Self {
        Expander {
            table: vec![0; TABLE_LEN].into_boxed_slice(),
        }
    }

    /// Expand one frame's code stream into a raster.
    ///
    /// `data` starts at the minimum code size byte; `dst` is the raster
    /// region the frame's pixels are written to, starting at index 0.
    ///
    /// Returns the expand status and the number of input bytes consumed
    /// (through the chain terminator).
    pub fn expand(
        &mut self,
        data: &[u8],
        dst: &mut [u8],
    ) -> Result<(ExpandStatus, usize)> {
        let table = &mut self.table;
        let ctsz = u32::from(*data.first().ok_or(Error::UnexpectedEndOfData)?);
        if !(2..=8).contains(&ctsz) {
            return Err(Error::InvalidCodeSize);
        }
        let clear = 1 << ctsz;
        for (i, entry) in table.iter_mut().enumerate().take(clear as usize) {
            *entry = (i as u32) << 24;
        }
        let mut rdr = ChainReader::new(&data[1..]);
        let mut ccsz = ctsz + 1;
        let mut mask = (1 << ccsz) - 1;
        // last assigned index; clear and stop slots count as assigned
        let mut last = clear as usize + 1;
        let mut prev = 0;
        let mut have_prev = false;
        let mut out = 0;
        match rdr.code(ccsz, mask)? {
            Some(code) if code == clear => (),
            // empty first sub-block or initial code not clear
            _ => return Err(Error::InvalidLzwData),
        }
        loop {
            let curr = match rdr.code(ccsz, mask)? {
                Some(code) => code,
                None => {
                    return Ok((ExpandStatus::MissingStopCode, rdr.pos + 1))
                }
            };
            if curr & !1 == clear {
                if curr & 1 != 0 {
                    // stop code
                    let trailing = rdr.finish()?;
                    let status = if trailing {
                        ExpandStatus::TrailingData
                    } else {
                        ExpandStatus::Clean
                    };
                    return Ok((status, rdr.pos + 1));
                }
                // clear code: user codes resume after the stop slot
                last = clear as usize + 1;
                ccsz = ctsz + 1;
                mask = (1 << ccsz) - 1;
                have_prev = false;
                continue;
            }
            let curr = curr as usize;
            let mut created = false;
            if have_prev && last < TABLE_LEN - 1 {
                last += 1;
                // length field saturates; it must never wrap into the suffix
                let len = (table[prev] & 0xFF_F000).min(0xFF_E000) + 0x1000;
                table[last] = prev as u32 | len;
                created = true;
            }
            // a code referencing the entry just created is the KwKwK case
            let known = if created { last } else { last + 1 };
            if curr >= known && !have_prev {
                return Err(Error::InvalidLzwData);
            }
            let first = if curr >= known { prev } else { curr };
            let len_m1 = ((table[first] >> 12) & 0xFFF) as usize;
            let end = out + len_m1;
            let wrote = end + 1 + (curr >= known) as usize;
            if wrote > dst.len() {
                return Err(Error::InvalidLzwData);
            }
            let mut entry = first;
            let mut at = end;
            loop {
                dst[at] = (table[entry] >> 24) as u8;
                if table[entry] & 0xFF_F000 == 0 || at == out {
                    break;
                }
                at -= 1;
                entry = (table[entry] & 0xFFF) as usize;
            }
            out = end + 1;
            if curr >= known {
                // KwKwK: the string's first byte repeats at the end
                dst[out] = (table[entry] >> 24) as u8;
                out += 1;
            }
            if created {
                // suffix is the first byte of the expansion
                table[last] |= table[entry] & 0xFF00_0000;
            }
            if last == mask as usize && last < TABLE_LEN - 1 {
                mask = (mask << 1) | 1;
                ccsz += 1;
            }
            prev = curr;
            have_prev = true;
        }
    }
}
