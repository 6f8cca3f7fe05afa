//! Blosc compressor options and (de)serialization, adapted from the
//! teacher's `codecs/bb/blosc_codec.rs`: same `cname`/`clevel`/`shuffle`
//! vocabulary, narrowed to what this store's `.zarray` needs.

use blosc::{Clevel, Compressor as BloscCompressor, Context, ShuffleMode};
use serde_json::Value;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloscOptions {
    cname: BloscCname,
    clevel: u8,
    shuffle: BloscShuffle,
}

impl Default for BloscOptions {
    fn default() -> Self {
        BloscOptions {
            cname: BloscCname::LZ4,
            clevel: 5,
            shuffle: BloscShuffle::Shuffle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BloscCname {
    LZ4,
    LZ4HC,
    Zlib,
    Zstd,
}

impl BloscCname {
    fn as_str(self) -> &'static str {
        match self {
            BloscCname::LZ4 => "lz4",
            BloscCname::LZ4HC => "lz4hc",
            BloscCname::Zlib => "zlib",
            BloscCname::Zstd => "zstd",
        }
    }

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "lz4" => Ok(BloscCname::LZ4),
            "lz4hc" => Ok(BloscCname::LZ4HC),
            "zlib" => Ok(BloscCname::Zlib),
            "zstd" => Ok(BloscCname::Zstd),
            other => Err(Error::UnknownCompressor {
                id: format!("blosc:{other}"),
            }),
        }
    }

    fn to_blosc(self) -> BloscCompressor {
        match self {
            BloscCname::LZ4 => BloscCompressor::LZ4,
            BloscCname::LZ4HC => BloscCompressor::LZ4HC,
            BloscCname::Zlib => BloscCompressor::Zlib,
            BloscCname::Zstd => BloscCompressor::Zstd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BloscShuffle {
    None,
    Shuffle,
    BitShuffle,
}

impl BloscShuffle {
    fn from_i64(v: i64) -> Self {
        match v {
            1 => BloscShuffle::Shuffle,
            2 => BloscShuffle::BitShuffle,
            _ => BloscShuffle::None,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            BloscShuffle::None => 0,
            BloscShuffle::Shuffle => 1,
            BloscShuffle::BitShuffle => 2,
        }
    }

    fn to_blosc(self) -> ShuffleMode {
        match self {
            BloscShuffle::None => ShuffleMode::None,
            BloscShuffle::Shuffle => ShuffleMode::Byte,
            BloscShuffle::BitShuffle => ShuffleMode::Bit,
        }
    }
}

impl BloscOptions {
    pub(crate) fn to_json(&self) -> Value {
        serde_json::json!({
            "id": "blosc",
            "cname": self.cname.as_str(),
            "clevel": self.clevel,
            "shuffle": self.shuffle.as_i64(),
        })
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self, Error> {
        let cname = value
            .get("cname")
            .and_then(Value::as_str)
            .map(BloscCname::from_str)
            .transpose()?
            .unwrap_or(BloscCname::LZ4);
        let clevel = value
            .get("clevel")
            .and_then(Value::as_u64)
            .unwrap_or(5)
            .min(9) as u8;
        let shuffle = value
            .get("shuffle")
            .and_then(Value::as_i64)
            .map(BloscShuffle::from_i64)
            .unwrap_or(BloscShuffle::Shuffle);
        Ok(BloscOptions {
            cname,
            clevel,
            shuffle,
        })
    }
}

fn clevel_of(level: u8) -> Clevel {
    match level {
        0 => Clevel::None,
        1 => Clevel::L1,
        2 => Clevel::L2,
        3 => Clevel::L3,
        4 => Clevel::L4,
        5 => Clevel::L5,
        6 => Clevel::L6,
        7 => Clevel::L7,
        8 => Clevel::L8,
        _ => Clevel::L9,
    }
}

pub(crate) fn compress(opts: &BloscOptions, raw: &[u8]) -> Vec<u8> {
    let ctx = Context::new()
        .compressor(opts.cname.to_blosc())
        .expect("Blosc compressor not enabled")
        .clevel(clevel_of(opts.clevel))
        .shuffle(opts.shuffle.to_blosc());
    ctx.compress(raw).into()
}

/// `None` if `bytes` does not carry a valid Blosc frame header; callers
/// treat that as "this chunk was written without compression."
///
/// # Safety note
/// `blosc::decompress_bytes` is `unsafe` because it trusts the frame header
/// embedded in `bytes` to size its output buffer; a corrupt header cannot
/// smuggle in a type confusion here since the result is always reinterpreted
/// as a byte buffer, never as another type's bit pattern.
pub(crate) fn decompress(bytes: &[u8]) -> Option<Vec<u8>> {
    unsafe { blosc::decompress_bytes(bytes) }.ok()
}
