// decode.rs
//
// Copyright (c) 2025  The gifload developers
//
//! GIF container decoding
use crate::block::*;
use crate::error::{Error, Result};
use crate::lzw::{ExpandStatus, Expander};

/// Cursor over an in-memory byte stream.
///
/// All multi-byte stream integers are little-endian; the cursor owns the
/// conversion, so decoding is identical on either host endianness.
#[derive(Debug, Clone, Copy)]
struct ByteStream<'a> {
    /// Input buffer
    buf: &'a [u8],
    /// Position of the next unread byte
    pos: usize,
}

impl<'a> ByteStream<'a> {
    /// Create a byte stream starting at the given position
    fn new(buf: &'a [u8], pos: usize) -> Self {
        ByteStream { buf, pos }
    }

    /// Get the current position
    fn pos(&self) -> usize {
        self.pos
    }

    /// Get the number of unread bytes
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Get the unread remainder of the buffer
    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Read one byte
    fn byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(Error::UnexpectedEndOfData)?;
        self.pos += 1;
        Ok(b)
    }

    /// Read one little-endian 16-bit integer
    fn u16_le(&mut self) -> Result<u16> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Borrow the next `len` bytes
    fn slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEndOfData);
        }
        let s = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(s)
    }

    /// Advance past `len` bytes
    fn skip(&mut self, len: usize) -> Result<()> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEndOfData);
        }
        self.pos += len;
        Ok(())
    }
}

/// Advance past one sub-block chain.
///
/// On success the cursor is one past the zero-length terminator.
fn skip_chain(stream: &mut ByteStream) -> Result<()> {
    loop {
        let len = stream.byte()? as usize;
        if len == 0 {
            return Ok(());
        }
        stream.skip(len)?;
    }
}

impl ScreenDesc {
    /// Parse a logical screen descriptor block
    fn parse(stream: &mut ByteStream) -> Result<Self> {
        Ok(ScreenDesc::default()
            .with_screen_width(stream.u16_le()?)
            .with_screen_height(stream.u16_le()?)
            .with_flags(stream.byte()?)
            .with_background_color_idx(stream.byte()?)
            .with_pixel_aspect_ratio(stream.byte()?))
    }
}

impl FrameHead {
    /// Parse a frame image descriptor block (after the 0x2C separator)
    fn parse(stream: &mut ByteStream) -> Result<Self> {
        Ok(FrameHead::default()
            .with_left(stream.u16_le()?)
            .with_top(stream.u16_le()?)
            .with_width(stream.u16_le()?)
            .with_height(stream.u16_le()?)
            .with_flags(stream.byte()?))
    }
}

impl GraphicControl {
    /// Parse a graphic control payload (4 bytes)
    fn parse(stream: &mut ByteStream) -> Result<Self> {
        let mut control = GraphicControl::default();
        control.set_flags(stream.byte()?);
        control.set_delay_time_cs(stream.u16_le()?);
        control.set_transparent_color_idx(stream.byte()?);
        Ok(control)
    }
}

/// Parse a frame header and resolve the active palette.
///
/// A local color table always has priority over the global one.  An empty
/// active palette fails the frame.
fn parse_frame_head<'a>(
    stream: &mut ByteStream<'a>,
    global_pal: &'a [u8],
) -> Result<(FrameHead, &'a [u8])> {
    let head = FrameHead::parse(stream)?;
    let palette = if head.has_color_table() {
        stream.slice(head.color_table_bytes())?
    } else {
        global_pal
    };
    if palette.is_empty() {
        return Err(Error::MissingColorTable);
    }
    Ok((head, palette))
}

/// Preamble blocks parsed ahead of both passes
#[derive(Debug)]
struct Preamble<'a> {
    /// Logical screen descriptor
    screen: ScreenDesc,
    /// Global color table (empty when absent)
    global_pal: &'a [u8],
    /// Offset of the first block after the global color table
    body: usize,
}

/// Descriptor for one decoded frame, delivered to a [FrameSink].
///
/// The borrowed palette and raster slices are only valid for the duration
/// of the sink call.
///
/// [FrameSink]: trait.FrameSink.html
#[derive(Debug)]
pub struct Frame<'a> {
    /// Logical screen descriptor
    pub screen: ScreenDesc,
    /// Frame image descriptor (offset, size, interlace)
    pub head: FrameHead,
    /// Active palette for this frame, as RGB triplets
    pub palette: &'a [u8],
    /// Transparent color index, if any
    pub transparent_color: Option<u8>,
    /// Disposal method to apply after this frame
    pub disposal_method: DisposalMethod,
    /// Delay before the next frame, in 10 ms units
    pub delay_time_cs: u16,
    /// Zero-based frame index
    pub index: i64,
    /// Total frame count (negative when the input is truncated)
    pub frame_count: i64,
    /// Screen-sized raster; the frame rectangle's pixels are freshly
    /// written at its start, row-major, in interlaced row order when
    /// [interlaced](#method.interlaced) is set
    pub raster: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Get the number of colors in the active palette
    pub fn color_count(&self) -> usize {
        self.palette.len() / 3
    }

    /// Check if the frame rows are interlaced
    pub fn interlaced(&self) -> bool {
        self.head.interlaced()
    }

    /// Get the frame rectangle's pixels (color indices, row-major)
    pub fn image(&self) -> &'a [u8] {
        &self.raster[..self.head.image_sz()]
    }
}

/// Descriptor for one application extension, delivered to a
/// [MetadataSink].
///
/// [MetadataSink]: trait.MetadataSink.html
#[derive(Debug)]
pub struct AppExtension<'a> {
    /// Raw extension bytes: the 11 byte application header followed by
    /// its sub-block chain
    pub raw: &'a [u8],
    /// Running frame index at the point the extension was encountered
    pub frame_index: i64,
    /// Logical screen descriptor
    pub screen: ScreenDesc,
}

impl<'a> AppExtension<'a> {
    /// Get the application identifier and authentication code
    pub fn app_id(&self) -> &'a [u8] {
        &self.raw[..self.raw.len().min(11)]
    }

    /// Iterate over the data sub-blocks following the header
    pub fn sub_blocks(&self) -> SubBlocks<'a> {
        SubBlocks::new(&self.raw[self.raw.len().min(11)..])
    }
}

/// Sink receiving decoded frames in stream order
pub trait FrameSink {
    /// Handle one decoded frame.
    ///
    /// The descriptor is a temporary; its palette and raster borrows must
    /// not be assumed valid after this call returns.
    fn frame(&mut self, frame: &Frame);
}

impl<F: FnMut(&Frame)> FrameSink for F {
    fn frame(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// Sink receiving raw application extension blocks in stream order
pub trait MetadataSink {
    /// Handle one application extension
    fn extension(&mut self, ext: &AppExtension);
}

impl<F: FnMut(&AppExtension)> MetadataSink for F {
    fn extension(&mut self, ext: &AppExtension) {
        self(ext)
    }
}

/// Allocator policy for the raster buffer.
///
/// A decode call makes exactly one `alloc` and, when it succeeds, exactly
/// one matching `free`.
pub trait RasterAllocator {
    /// Allocate a zeroed buffer of at least `size` bytes, with
    /// `len() == size`
    fn alloc(&mut self, size: usize) -> Vec<u8>;
    /// Release a buffer obtained from [alloc](#tymethod.alloc)
    fn free(&mut self, buf: Vec<u8>);
}

/// Default raster allocator backed by the process heap
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl RasterAllocator for HeapAllocator {
    fn alloc(&mut self, size: usize) -> Vec<u8> {
        vec![0; size]
    }
    fn free(&mut self, buf: Vec<u8>) {
        drop(buf);
    }
}

impl<T: RasterAllocator> RasterAllocator for &mut T {
    fn alloc(&mut self, size: usize) -> Vec<u8> {
        (**self).alloc(size)
    }
    fn free(&mut self, buf: Vec<u8>) {
        (**self).free(buf)
    }
}

/// GIF animation decoder for in-memory buffers.
///
/// The input may be a partial file; see [skip] for resuming once more
/// data has arrived.  Frames are delivered to a [FrameSink] in stream
/// order, and application extensions to an optional [MetadataSink].
///
/// ## Example
/// ```
/// use gifload::Decoder;
///
/// let gif = &[
///     0x47, 0x49, 0x46, 0x38, 0x37, 0x61, 0x01, 0x00,
///     0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0xFF, 0xFF, 0xFF, 0x2C, 0x00, 0x00, 0x00, 0x00,
///     0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44,
///     0x01, 0x00, 0x3B,
/// ][..];
/// let mut pixels = vec![];
/// let count = Decoder::new(gif).decode(&mut |frame: &gifload::Frame| {
///     pixels.extend_from_slice(frame.image());
/// });
/// assert_eq!(count, 1);
/// assert_eq!(pixels, [0]);
/// ```
///
/// [FrameSink]: trait.FrameSink.html
/// [MetadataSink]: trait.MetadataSink.html
/// [skip]: struct.Decoder.html#method.skip
pub struct Decoder<'a, A: RasterAllocator = HeapAllocator> {
    /// Input buffer (may be a partial GIF file)
    input: &'a [u8],
    /// Number of leading frames to parse but not deliver
    skip: usize,
    /// Maximum raster size, in bytes
    max_image_sz: Option<usize>,
    /// Raster allocator
    allocator: A,
}

impl<'a> Decoder<'a> {
    /// Create a new GIF decoder.
    pub fn new(input: &'a [u8]) -> Self {
        Decoder {
            input,
            skip: 0,
            max_image_sz: Some(1 << 25),
            allocator: HeapAllocator,
        }
    }
}

impl<'a, A: RasterAllocator> Decoder<'a, A> {
    /// Set the number of leading frames to parse but not deliver.
    ///
    /// Used to resume decoding after a truncated call: when `decode`
    /// returns `-m`, calling it again on a longer buffer with
    /// `skip(m)` more frames delivers only the frames not yet seen.
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Set the maximum raster size (in bytes) to allow for decoding.
    pub fn max_image_sz(mut self, max_image_sz: Option<usize>) -> Self {
        self.max_image_sz = max_image_sz;
        self
    }

    /// Use a custom raster allocator.
    pub fn with_allocator<B: RasterAllocator>(
        self,
        allocator: B,
    ) -> Decoder<'a, B> {
        Decoder {
            input: self.input,
            skip: self.skip,
            max_image_sz: self.max_image_sz,
            allocator,
        }
    }

    /// Parse the header, screen descriptor and global color table
    fn preamble(&self) -> Result<Preamble<'a>> {
        let mut stream = ByteStream::new(self.input, 0);
        let sig = stream.slice(6)?;
        if &sig[..3] != b"GIF" {
            return Err(Error::MalformedHeader);
        }
        let version = [sig[3], sig[4], sig[5]];
        match &version {
            b"87a" | b"89a" => (),
            _ => return Err(Error::UnsupportedVersion(version)),
        }
        let screen = ScreenDesc::parse(&mut stream)?;
        let global_pal = stream.slice(screen.color_table_bytes())?;
        if stream.remaining() == 0 {
            return Err(Error::UnexpectedEndOfData);
        }
        Ok(Preamble {
            screen,
            global_pal,
            body: stream.pos(),
        })
    }

    /// Count the frames in the input without decoding them.
    ///
    /// Returns the frame count, negated when the input has no trailer
    /// (a truncated stream).  Returns 0 when the input is not a GIF.
    pub fn count_frames(&self) -> i64 {
        match self.preamble() {
            Ok(pre) => self.count_from(&pre),
            Err(_) => 0,
        }
    }

    /// Counting pass: dry walk over the block sequence
    fn count_from(&self, pre: &Preamble<'a>) -> i64 {
        let mut stream = ByteStream::new(self.input, pre.body);
        let mut count: i64 = 0;
        let complete = loop {
            let tag = match stream.byte() {
                Ok(tag) => tag,
                Err(_) => break false,
            };
            match BlockCode::from_u8(tag) {
                Some(BlockCode::Trailer_) => break true,
                Some(BlockCode::ImageDesc_) => {
                    if parse_frame_head(&mut stream, pre.global_pal).is_err() {
                        break false;
                    }
                    count += 1;
                    // minimum code size byte, then the chain
                    if stream.byte().is_err() || skip_chain(&mut stream).is_err()
                    {
                        break false;
                    }
                }
                // extension label byte (or an unknown tag's next byte),
                // then the chain
                Some(BlockCode::Extension_) | None => {
                    if stream.byte().is_err() || skip_chain(&mut stream).is_err()
                    {
                        break false;
                    }
                }
            }
        };
        if complete {
            count
        } else {
            -count
        }
    }

    /// Decode the input, delivering frames to a sink.
    ///
    /// Returns the total number of frames parsed this call (delivered
    /// plus skipped) when the input carries a proper trailer, the
    /// negated number of frames delivered when it is truncated, or 0
    /// when the input is not a valid GIF or `skip` leaves no frame to
    /// deliver.
    pub fn decode<S: FrameSink>(self, sink: &mut S) -> i64 {
        self.run(sink, None)
    }

    /// Decode the input, delivering frames to a sink and application
    /// extensions to a metadata sink.
    ///
    /// Same return value as [decode](struct.Decoder.html#method.decode).
    /// The metadata sink is invoked for every application extension
    /// encountered, including those ahead of skipped frames.
    pub fn decode_with_metadata<S, M>(self, sink: &mut S, metadata: &mut M) -> i64
    where
        S: FrameSink,
        M: MetadataSink,
    {
        self.run(sink, Some(metadata))
    }

    /// Extraction pass
    fn run<S: FrameSink>(
        self,
        sink: &mut S,
        mut metadata: Option<&mut dyn MetadataSink>,
    ) -> i64 {
        let pre = match self.preamble() {
            Ok(pre) => pre,
            Err(_) => return 0,
        };
        let total = self.count_from(&pre);
        // oversized skip: no frame left to deliver
        if total >= 0 && self.skip as i64 >= total {
            return 0;
        }
        let raster_sz = pre.screen.raster_sz();
        if let Some(sz) = self.max_image_sz {
            if raster_sz > sz {
                warn!("raster too large: {} bytes", raster_sz);
                return 0;
            }
        }
        let input = self.input;
        let skip = self.skip;
        let mut allocator = self.allocator;
        let mut raster = allocator.alloc(raster_sz);
        let mut expander = Expander::new();
        let mut stream = ByteStream::new(input, pre.body);
        let mut control: Option<GraphicControl> = None;
        let mut index: i64 = 0;
        loop {
            let tag = match stream.byte() {
                Ok(tag) => tag,
                Err(_) => break,
            };
            match BlockCode::from_u8(tag) {
                Some(BlockCode::Trailer_) => break,
                Some(BlockCode::ImageDesc_) => {
                    let (head, palette) =
                        match parse_frame_head(&mut stream, pre.global_pal) {
                            Ok(fh) => fh,
                            Err(e) => {
                                debug!("frame {index}: {e}");
                                break;
                            }
                        };
                    if head.image_sz() > raster.len() {
                        debug!("frame {index}: {}", Error::InvalidFrameDimensions);
                        break;
                    }
                    if (index as usize) < skip {
                        // advance past the image data without decoding;
                        // the frame still consumes the control block
                        if stream.byte().is_err()
                            || skip_chain(&mut stream).is_err()
                        {
                            break;
                        }
                        control = None;
                        index += 1;
                        continue;
                    }
                    let sz = head.image_sz();
                    let used = match expander
                        .expand(stream.rest(), &mut raster[..sz])
                    {
                        Ok((status, used)) => {
                            match status {
                                ExpandStatus::Clean => (),
                                ExpandStatus::TrailingData => {
                                    warn!("frame {index}: data after stop code")
                                }
                                ExpandStatus::MissingStopCode => {
                                    warn!("frame {index}: no stop code")
                                }
                            }
                            used
                        }
                        Err(e) => {
                            debug!("frame {index}: {e}");
                            break;
                        }
                    };
                    if stream.skip(used).is_err() {
                        break;
                    }
                    debug!("frame {index}: {head:?}");
                    let frame = Frame {
                        screen: pre.screen,
                        head,
                        palette,
                        transparent_color: control
                            .and_then(|c| c.transparent_color()),
                        disposal_method: match &control {
                            Some(c) if !c.user_input() => c.disposal_method(),
                            _ => DisposalMethod::NoAction,
                        },
                        delay_time_cs: control
                            .map(|c| c.delay_time_cs())
                            .unwrap_or(0),
                        index,
                        frame_count: total,
                        raster: &raster,
                    };
                    sink.frame(&frame);
                    // the control block applies to this frame only
                    control = None;
                    index += 1;
                }
                Some(BlockCode::Extension_) => {
                    let label = match stream.byte() {
                        Ok(label) => label,
                        Err(_) => break,
                    };
                    match ExtensionCode::from(label) {
                        ExtensionCode::GraphicControl_ => {
                            let len = match stream.byte() {
                                Ok(len) => len as usize,
                                Err(_) => break,
                            };
                            if len == 4 {
                                match GraphicControl::parse(&mut stream) {
                                    Ok(c) => control = Some(c),
                                    Err(_) => break,
                                }
                            } else {
                                warn!("graphic control length: {len}");
                                if stream.skip(len).is_err() {
                                    break;
                                }
                            }
                            if skip_chain(&mut stream).is_err() {
                                break;
                            }
                        }
                        ExtensionCode::Application_ => {
                            // raw bytes start at the application header,
                            // one past the length byte
                            let start = stream.pos() + 1;
                            if skip_chain(&mut stream).is_err() {
                                break;
                            }
                            if let Some(m) = metadata.as_mut() {
                                let ext = AppExtension {
                                    raw: &input[start..stream.pos()],
                                    frame_index: index,
                                    screen: pre.screen,
                                };
                                m.extension(&ext);
                            }
                        }
                        ExtensionCode::Unknown_(n) => {
                            debug!("skipping extension 0x{n:02X}");
                            if skip_chain(&mut stream).is_err() {
                                break;
                            }
                        }
                    }
                }
                // unknown tag: treat the next byte as a label followed
                // by a sub-block chain, as for extensions
                None => {
                    if stream.byte().is_err() || skip_chain(&mut stream).is_err()
                    {
                        break;
                    }
                }
            }
        }
        allocator.free(raster);
        if total < 0 {
            let delivered = (index - skip as i64).max(0);
            -delivered
        } else {
            index
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Single pixel GIF87a with a 2 color global palette
    const TINY: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x37, 0x61, // "GIF87a"
        0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, // screen descriptor
        0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, // global color table
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
        0x02, 0x02, 0x44, 0x01, 0x00, // image data
        0x3B,
    ];

    /// 2x2 frame of the four color indices 0, 1, 2, 3
    const FRAME_2X2: &[u8] = &[
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x00,
        0x02, 0x03, 0x44, 0x34, 0x05, 0x00,
    ];

    /// Graphic control with no flags and a 100 ms delay
    const GCE_DELAY_10: &[u8] =
        &[0x21, 0xF9, 0x04, 0x00, 0x0A, 0x00, 0x00, 0x00];

    /// Build a GIF89a with a 2x2 screen, a 4 color global palette and
    /// the given body blocks
    fn gif89(body: &[&[u8]]) -> Vec<u8> {
        let mut v = vec![];
        v.extend_from_slice(b"GIF89a");
        v.extend_from_slice(&[0x02, 0x00, 0x02, 0x00, 0x81, 0x00, 0x00]);
        v.extend_from_slice(&[
            0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00,
            0x00, 0xFF,
        ]);
        for b in body {
            v.extend_from_slice(b);
        }
        v.extend_from_slice(&[0x3B]);
        v
    }

    /// One delivered frame, copied out of the descriptor
    struct Got {
        index: i64,
        count: i64,
        image: Vec<u8>,
        palette: Vec<u8>,
        delay: u16,
        transparent: Option<u8>,
        disposal: DisposalMethod,
        interlaced: bool,
    }

    /// Frame sink collecting every delivery
    #[derive(Default)]
    struct Collector {
        got: Vec<Got>,
    }

    impl FrameSink for Collector {
        fn frame(&mut self, f: &Frame) {
            self.got.push(Got {
                index: f.index,
                count: f.frame_count,
                image: f.image().to_vec(),
                palette: f.palette.to_vec(),
                delay: f.delay_time_cs,
                transparent: f.transparent_color,
                disposal: f.disposal_method,
                interlaced: f.interlaced(),
            });
        }
    }

    #[test]
    fn single_pixel() {
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(TINY).decode(&mut sink), 1);
        assert_eq!(sink.got.len(), 1);
        let got = &sink.got[0];
        assert_eq!(got.index, 0);
        assert_eq!(got.count, 1);
        assert_eq!(got.image, [0]);
        assert_eq!(got.palette, [0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(got.delay, 0);
        assert_eq!(got.transparent, None);
        assert_eq!(got.disposal, DisposalMethod::NoAction);
        assert!(!got.interlaced);
    }

    #[test]
    fn screen_desc() {
        let mut screen = ScreenDesc::default();
        let count = Decoder::new(TINY).decode(&mut |f: &Frame| {
            screen = f.screen;
        });
        assert_eq!(count, 1);
        assert_eq!(screen.screen_width(), 1);
        assert_eq!(screen.screen_height(), 1);
        assert_eq!(screen.background_color_idx(), 0);
        assert_eq!(screen.color_table_len(), 2);
    }

    #[test]
    fn truncated() {
        let mut sink = Collector::default();
        let cut = &TINY[..TINY.len() - 1];
        assert_eq!(Decoder::new(cut).decode(&mut sink), -1);
        assert_eq!(sink.got.len(), 1);
        assert_eq!(sink.got[0].count, -1);
    }

    #[test]
    fn truncation_sweep() {
        for cut in 1..TINY.len() {
            let mut sink = Collector::default();
            let count = Decoder::new(&TINY[..cut]).decode(&mut sink);
            assert!(count <= 0, "cut {cut}");
            assert_eq!(-count, sink.got.len() as i64, "cut {cut}");
        }
    }

    #[test]
    fn two_frames() {
        let gif = gif89(&[GCE_DELAY_10, FRAME_2X2, FRAME_2X2]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 2);
        assert_eq!(sink.got.len(), 2);
        assert_eq!(sink.got[0].delay, 10);
        assert_eq!(sink.got[0].image, [0, 1, 2, 3]);
        // the control block was consumed by the first frame
        assert_eq!(sink.got[1].delay, 0);
        assert_eq!(sink.got[1].index, 1);
        assert_eq!(sink.got[1].count, 2);
    }

    #[test]
    fn resumption() {
        let gif = gif89(&[GCE_DELAY_10, FRAME_2X2, FRAME_2X2]);
        // cut after the first frame's image data
        let cut = 6 + 7 + 12 + GCE_DELAY_10.len() + FRAME_2X2.len();
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif[..cut]).decode(&mut sink), -1);
        assert_eq!(sink.got.len(), 1);
        // once the rest has arrived, skip the frame already delivered
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).skip(1).decode(&mut sink), 2);
        assert_eq!(sink.got.len(), 1);
        assert_eq!(sink.got[0].index, 1);
        assert_eq!(sink.got[0].count, 2);
        // same delivery a full decode would have made
        assert_eq!(sink.got[0].delay, 0);
    }

    #[test]
    fn graphic_control() {
        // transparent color 2, delay 5
        let gce = &[0x21, 0xF9, 0x04, 0x01, 0x05, 0x00, 0x02, 0x00][..];
        let gif = gif89(&[gce, FRAME_2X2]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert_eq!(sink.got[0].transparent, Some(2));
        assert_eq!(sink.got[0].delay, 5);
        // disposal background
        let gce = &[0x21, 0xF9, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00][..];
        let gif = gif89(&[gce, FRAME_2X2]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert_eq!(sink.got[0].disposal, DisposalMethod::Background);
        // user input flag set; disposal is not taken
        let gce = &[0x21, 0xF9, 0x04, 0x06, 0x00, 0x00, 0x00, 0x00][..];
        let gif = gif89(&[gce, FRAME_2X2]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert_eq!(sink.got[0].disposal, DisposalMethod::NoAction);
    }

    #[test]
    fn interlaced() {
        let frame = &[
            0x2C, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x40,
            0x02, 0x03, 0x44, 0x34, 0x05, 0x00,
        ][..];
        let gif = gif89(&[frame]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert!(sink.got[0].interlaced);
        // rows are delivered in interlaced order, not reordered
        assert_eq!(sink.got[0].image, [0, 1, 2, 3]);
    }

    #[test]
    fn metadata() {
        let app = &[
            0x21, 0xFF, 0x0B, b'N', b'E', b'T', b'S', b'C', b'A', b'P',
            b'E', b'2', b'.', b'0', 0x03, 0x01, 0x00, 0x00, 0x00,
        ][..];
        let gif = gif89(&[app, FRAME_2X2]);
        let mut sink = Collector::default();
        let mut exts = vec![];
        let count = Decoder::new(&gif).decode_with_metadata(
            &mut sink,
            &mut |e: &AppExtension| {
                let blocks: Vec<_> =
                    e.sub_blocks().map(<[u8]>::to_vec).collect();
                exts.push((e.app_id().to_vec(), blocks, e.frame_index));
            },
        );
        assert_eq!(count, 1);
        assert_eq!(sink.got.len(), 1);
        assert_eq!(exts.len(), 1);
        let (id, blocks, index) = &exts[0];
        assert_eq!(id, b"NETSCAPE2.0");
        assert_eq!(blocks[..], [vec![0x01, 0x00, 0x00]][..]);
        assert_eq!(*index, 0);
        // extensions ahead of skipped frames are still delivered
        let gif = gif89(&[app, FRAME_2X2, FRAME_2X2]);
        let mut sink = Collector::default();
        let mut n_exts = 0;
        let count = Decoder::new(&gif).skip(1).decode_with_metadata(
            &mut sink,
            &mut |_: &AppExtension| n_exts += 1,
        );
        assert_eq!(count, 2);
        assert_eq!(sink.got.len(), 1);
        assert_eq!(sink.got[0].index, 1);
        assert_eq!(n_exts, 1);
        // without a metadata sink the extension is skipped
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 2);
        assert_eq!(sink.got.len(), 2);
    }

    #[test]
    fn oversized_skip() {
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(TINY).skip(1).decode(&mut sink), 0);
        assert_eq!(Decoder::new(TINY).skip(5).decode(&mut sink), 0);
        let gif = gif89(&[GCE_DELAY_10, FRAME_2X2, FRAME_2X2]);
        assert_eq!(Decoder::new(&gif).skip(2).decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
        // truncated input with nothing left to deliver
        let cut = &TINY[..TINY.len() - 1];
        assert_eq!(Decoder::new(cut).skip(3).decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
    }

    #[test]
    fn local_palette() {
        // 1x1 frame with a local 2 color table
        let frame = &[
            0x2C, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x80,
            0x10, 0x20, 0x30, 0x40, 0x50, 0x60,
            0x02, 0x02, 0x44, 0x01, 0x00,
        ][..];
        let gif = gif89(&[frame]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert_eq!(sink.got[0].palette, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
        assert_eq!(sink.got[0].image, [0]);
    }

    #[test]
    fn no_palette() {
        // no global color table and no local one either
        let mut gif = vec![];
        gif.extend_from_slice(b"GIF89a");
        gif.extend_from_slice(&[0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]);
        gif.extend_from_slice(FRAME_2X2);
        gif.push(0x3B);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
    }

    #[test]
    fn missing_stop_code() {
        // clear and a single literal 2, then the chain just ends
        let frame = &[
            0x2C, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x00,
            0x02, 0x01, 0x14, 0x00,
        ][..];
        let gif = gif89(&[frame]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        // the partial raster is delivered
        assert_eq!(sink.got[0].image, [2, 0, 0, 0]);
    }

    #[test]
    fn frame_exceeds_screen() {
        // 2x2 frame on a 1x1 screen
        let mut gif = TINY[..19].to_vec();
        gif.extend_from_slice(FRAME_2X2);
        gif.push(0x3B);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
    }

    #[test]
    fn unknown_extension() {
        let comment = &[0x21, 0xFE, 0x05, b'h', b'e', b'l', b'l', b'o', 0x00][..];
        let gif = gif89(&[comment, FRAME_2X2]);
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 1);
        assert_eq!(sink.got.len(), 1);
    }

    #[test]
    fn count_frames() {
        assert_eq!(Decoder::new(TINY).count_frames(), 1);
        assert_eq!(Decoder::new(&TINY[..TINY.len() - 1]).count_frames(), -1);
        let gif = gif89(&[GCE_DELAY_10, FRAME_2X2, FRAME_2X2]);
        assert_eq!(Decoder::new(&gif).count_frames(), 2);
        assert_eq!(Decoder::new(b"not a gif").count_frames(), 0);
    }

    #[test]
    fn bad_signature() {
        let mut sink = Collector::default();
        assert_eq!(Decoder::new(b"").decode(&mut sink), 0);
        assert_eq!(Decoder::new(b"NOT A GIF AT ALL").decode(&mut sink), 0);
        let mut gif = TINY.to_vec();
        gif[4] = b'8'; // "GIF88a"
        assert_eq!(Decoder::new(&gif).decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
    }

    #[test]
    fn max_image_sz() {
        let mut sink = Collector::default();
        let dec = Decoder::new(TINY).max_image_sz(Some(0));
        assert_eq!(dec.decode(&mut sink), 0);
        assert_eq!(sink.got.len(), 0);
    }

    /// Allocator counting its calls
    #[derive(Default)]
    struct CountingAlloc {
        allocs: usize,
        frees: usize,
        size: usize,
    }

    impl RasterAllocator for CountingAlloc {
        fn alloc(&mut self, size: usize) -> Vec<u8> {
            self.allocs += 1;
            self.size = size;
            vec![0; size]
        }
        fn free(&mut self, buf: Vec<u8>) {
            self.frees += 1;
            drop(buf);
        }
    }

    #[test]
    fn allocator_pairing() {
        let mut alloc = CountingAlloc::default();
        let mut sink = Collector::default();
        let dec = Decoder::new(TINY).with_allocator(&mut alloc);
        assert_eq!(dec.decode(&mut sink), 1);
        assert_eq!(alloc.allocs, 1);
        assert_eq!(alloc.frees, 1);
        assert_eq!(alloc.size, 1);
    }
}
