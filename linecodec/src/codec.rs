//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::{ACCEPT, CodecError, FINISHED, Frame, KEEP_ALIVE};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Default cap on a single wire line, greeting and records included.
const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// A codec for the telemetry line protocol.
///
/// `LineCodec` splits the byte stream on `\n`, tolerates a trailing `\r`, and
/// maps the control literals `200`/`100`/`500` onto their [`Frame`] variants.
/// Everything else is surfaced verbatim as [`Frame::Line`] for the session
/// layer to interpret. It is typically used through
/// `tokio_util::codec::Framed` on both ends of the connection.
pub struct LineCodec {
    /// Index to resume the newline scan from after a partial read.
    scanned: usize,
    max_line_length: usize,
}

impl LineCodec {
    /// Creates a new codec with the default line length limit.
    pub fn new() -> LineCodec {
        LineCodec::default()
    }

    /// Creates a new codec with an explicit line length limit.
    pub fn with_max_line_length(max_line_length: usize) -> LineCodec {
        LineCodec {
            scanned: 0,
            max_line_length,
        }
    }

    /// The configured line length limit in bytes.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn frame_from_line(line: &str) -> Frame {
        match line {
            ACCEPT => Frame::Accept,
            KEEP_ALIVE => Frame::KeepAlive,
            FINISHED => Frame::Finished,
            _ => Frame::Line(line.to_string()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec {
            scanned: 0,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        let newline = src[self.scanned..].iter().position(|b| *b == b'\n');
        match newline {
            Some(offset) => {
                let line = src.split_to(self.scanned + offset + 1);
                self.scanned = 0;

                let line = &line[..line.len() - 1];
                if !line.is_ascii() {
                    warn!("Dropping peer speaking a non-ASCII protocol");
                    return Err(CodecError::NonAscii);
                }
                let line = std::str::from_utf8(line)
                    .map_err(|_| CodecError::NonAscii)?
                    .trim();

                Ok(Some(Self::frame_from_line(line)))
            }
            None if src.len() > self.max_line_length => {
                warn!(
                    limit = self.max_line_length,
                    "Peer exceeded the line length limit"
                );
                Err(CodecError::LineTooLong {
                    limit: self.max_line_length,
                })
            }
            None => {
                // Resume the scan where it stopped once more bytes arrive.
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            // A trailing unterminated line is dropped: the peer vanished
            // mid-write and the fragment cannot be trusted.
            None => {
                src.clear();
                self.scanned = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.as_line();
        if line.len() > self.max_line_length {
            return Err(CodecError::LineTooLong {
                limit: self.max_line_length,
            });
        }
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, bytes: &[u8]) -> Vec<Frame> {
        let mut src = BytesMut::from(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut src).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_decode_control_codes() {
        let mut codec = LineCodec::new();
        let frames = decode_all(&mut codec, b"200\n100\n500\n");
        assert_eq!(frames, vec![Frame::Accept, Frame::KeepAlive, Frame::Finished]);
    }

    #[test]
    fn test_decode_text_lines() {
        let mut codec = LineCodec::new();
        let frames = decode_all(&mut codec, b"alice:secret\n1678134985526;8;1\n");
        assert_eq!(
            frames,
            vec![
                Frame::Line("alice:secret".to_string()),
                Frame::Line("1678134985526;8;1".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_strips_carriage_return() {
        let mut codec = LineCodec::new();
        let frames = decode_all(&mut codec, b"100\r\n");
        assert_eq!(frames, vec![Frame::KeepAlive]);
    }

    #[test]
    fn test_decode_partial_line_across_reads() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"16781349"[..]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(b"85526;8;1\n100\n");
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Frame::Line("1678134985526;8;1".to_string()))
        );
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Frame::KeepAlive));
        assert_eq!(codec.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn test_decode_empty_line_counts_as_line() {
        let mut codec = LineCodec::new();
        let frames = decode_all(&mut codec, b"\n");
        assert_eq!(frames, vec![Frame::Line(String::new())]);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_decode_line_too_long() {
        let mut codec = LineCodec::with_max_line_length(16);
        let mut src = BytesMut::from(&[b'a'; 32][..]);
        assert_eq!(
            codec.decode(&mut src),
            Err(CodecError::LineTooLong { limit: 16 })
        );
        assert!(logs_contain("line length limit"));
    }

    #[test]
    fn test_decode_rejects_non_ascii() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"caf\xc3\xa9\n"[..]);
        assert_eq!(codec.decode(&mut src), Err(CodecError::NonAscii));
    }

    #[test]
    fn test_decode_eof_drops_fragment() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"half a reco"[..]);
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
        assert!(src.is_empty());
    }

    #[test]
    fn test_encode_frames() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();

        codec.encode(Frame::greeting("alice", "secret"), &mut dst).unwrap();
        codec.encode(Frame::Accept, &mut dst).unwrap();
        codec.encode(Frame::KeepAlive, &mut dst).unwrap();
        codec
            .encode(Frame::Line("1;2;3".to_string()), &mut dst)
            .unwrap();
        codec.encode(Frame::Finished, &mut dst).unwrap();

        assert_eq!(&dst[..], b"alice:secret\n200\n100\n1;2;3\n500\n");
    }

    #[test]
    fn test_encode_oversize_line() {
        let mut codec = LineCodec::with_max_line_length(8);
        let mut dst = BytesMut::new();
        let result = codec.encode(Frame::Line("far too long a line".to_string()), &mut dst);
        assert_eq!(result, Err(CodecError::LineTooLong { limit: 8 }));
        assert!(dst.is_empty());
    }

    #[tokio::test]
    async fn test_framed_round_trip() {
        use futures::{SinkExt, StreamExt};
        use tokio_util::codec::Framed;

        let (near, far) = tokio::io::duplex(1024);
        let mut near = Framed::new(near, LineCodec::new());
        let mut far = Framed::new(far, LineCodec::new());

        near.send(Frame::greeting("alice", "secret")).await.unwrap();
        near.send(Frame::Line("1;2;3".to_string())).await.unwrap();
        near.send(Frame::Finished).await.unwrap();

        assert_eq!(
            far.next().await.unwrap().unwrap(),
            Frame::Line("alice:secret".to_string())
        );
        assert_eq!(
            far.next().await.unwrap().unwrap(),
            Frame::Line("1;2;3".to_string())
        );
        assert_eq!(far.next().await.unwrap().unwrap(), Frame::Finished);
    }
}
