// SPDX-License-Identifier: MPL-2.0

//! Length-prefixed frame codec: a 4-byte big-endian length followed by that
//! many bytes of frame body. Grounded on the `tokio_util::codec::FramedRead`
//! usage in `opcua-client/src/transport/tcp.rs`, with the protocol-specific
//! `TcpCodec` there replaced by the generic length-prefix framing this
//! session protocol uses instead.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ErrorCode;

const LENGTH_PREFIX_BYTES: usize = 4;

/// [`Decoder`]/[`Encoder`] for 4-byte-length-prefixed frames.
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Create a codec that rejects frames longer than `max_frame_len`.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Decoder for FrameCodec {
    type Item = Vec<u8>;
    type Error = ErrorCode;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_BYTES {
            return Ok(None);
        }
        let len = u32::from_be_bytes(src[..LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
        if len > self.max_frame_len {
            return Err(ErrorCode::MarshallingError);
        }
        if src.len() < LENGTH_PREFIX_BYTES + len {
            src.reserve(LENGTH_PREFIX_BYTES + len - src.len());
            return Ok(None);
        }
        src.advance(LENGTH_PREFIX_BYTES);
        let frame = src.split_to(len);
        Ok(Some(frame.to_vec()))
    }
}

impl Encoder<Vec<u8>> for FrameCodec {
    type Error = ErrorCode;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_len {
            return Err(ErrorCode::MarshallingError);
        }
        dst.reserve(LENGTH_PREFIX_BYTES + item.len());
        dst.put_u32(item.len() as u32);
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_frame() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::new();
        codec.encode(b"hello".to_vec(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_more_bytes() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&5u32.to_be_bytes());
        buf.extend_from_slice(b"he");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"llo");
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut codec = FrameCodec::new(4);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&100u32.to_be_bytes());
        assert!(codec.decode(&mut buf).is_err());
    }
}
