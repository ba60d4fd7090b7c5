// lib.rs      gifload crate.
//
// Copyright (c) 2025  The gifload developers
//
//! # gifload
//!
//! A library for decoding GIF images and animations from in-memory
//! buffers, with support for partial input and resuming.
//!
//! Frames are delivered to a [FrameSink] as indexed pixels plus a
//! per-frame descriptor; compositing, deinterlacing and color conversion
//! are left to the caller.
//!
//! [FrameSink]: trait.FrameSink.html
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod block;
mod decode;
mod error;
mod lzw;

pub use crate::decode::{
    AppExtension, Decoder, Frame, FrameSink, HeapAllocator, MetadataSink,
    RasterAllocator,
};
pub use crate::error::{Error, Result};
