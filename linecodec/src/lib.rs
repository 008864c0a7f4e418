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

//! # Telemetrix Line Codec
//!
//! This crate implements the wire grammar shared by the telemetry server and
//! client: an ASCII, `\n`-delimited line protocol carrying an authentication
//! greeting, numeric control codes and free-form telemetry record lines. It is
//! designed to work with asynchronous networking libraries like Tokio and
//! plugs into `tokio_util::codec::Framed`.
//!
//! ## Frame Grammar
//!
//! One frame per line, client-to-server unless noted:
//!
//! - Greeting: `<username>:<password>` — sent once, first line of a session.
//! - Accept: `200` — server-to-client, authentication succeeded.
//! - Keep-alive: `100` — either direction, a liveness probe or its echo.
//! - Data record: `timestamp;code;value` — one telemetry event.
//! - Finished: `500` — the client is ending the session voluntarily.
//!
//! The greeting and a data record are both plain text on the wire; which one a
//! line means depends on the session phase, so the decoder surfaces them as
//! [`Frame::Line`] and the server applies [`Frame::parse_greeting`] while
//! authenticating.
//!
//! ## Usage Example
//!
//! ```rust
//! use telemetrix_linecodec::{Frame, LineCodec};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! # fn example() -> Result<(), telemetrix_linecodec::CodecError> {
//! let mut codec = LineCodec::new();
//!
//! let mut buffer = BytesMut::new();
//! codec.encode(Frame::greeting("alice", "secret"), &mut buffer)?;
//! assert_eq!(&buffer[..], b"alice:secret\n");
//!
//! let mut input = BytesMut::from(&b"100\n1678134985526;8;1\n"[..]);
//! assert_eq!(codec.decode(&mut input)?, Some(Frame::KeepAlive));
//! assert_eq!(
//!     codec.decode(&mut input)?,
//!     Some(Frame::Line("1678134985526;8;1".to_string()))
//! );
//! # Ok(())
//! # }
//! ```

mod codec;
mod frame;
mod result;

pub use codec::LineCodec;
pub use frame::{Frame, is_well_formed};
pub use result::{CodecError, CodecResult};

/// Wire literal acknowledging a successful authentication.
pub const ACCEPT: &str = "200";

/// Wire literal for a liveness probe and its echo.
pub const KEEP_ALIVE: &str = "100";

/// Wire literal for a voluntary end of session.
pub const FINISHED: &str = "500";
