//! # Media descriptions for offer/answer negotiation
//!
//! This crate models what a SIP call has agreed (or proposes) to run as media:
//! a [`MediaSessionDescriptor`] holding an ordered list of
//! [`StreamDescriptor`]s plus session level attributes (connection address,
//! ICE credentials, BUNDLE groups).
//!
//! Descriptors are value types. Once built they are never mutated: a new
//! negotiation round produces a new descriptor, derived from an old one with
//! [`MediaSessionDescriptor::to_builder`] when needed.
//!
//! The [`diff`] module classifies what changed between two rounds, which is
//! what a call session uses to decide between doing nothing, moving transport
//! endpoints, restarting ICE or rebuilding the media streams.
//!
//! ```
//! use rvoip_media_description::prelude::*;
//!
//! let audio = StreamDescriptor::new(StreamType::Audio, MediaProto::RtpAvp)
//!     .with_rtp("192.0.2.10", 7078)
//!     .with_codec(CodecOffer::audio(0, "PCMU", 8000));
//! let previous = MediaSessionDescriptor::builder()
//!     .address("192.0.2.10")
//!     .stream(audio.clone())
//!     .build()
//!     .unwrap();
//!
//! let moved = previous
//!     .to_builder()
//!     .replace_stream(0, audio.with_rtp("192.0.2.10", 7080))
//!     .build()
//!     .unwrap();
//!
//! let flags = compare(&previous, &moved);
//! assert_eq!(flags, ChangeFlags::NETWORK_CHANGED);
//! ```

pub mod bundle;
pub mod codec;
pub mod crypto;
pub mod diff;
pub mod error;
pub mod session;
pub mod stream;
pub mod types;

pub use bundle::BundleGroup;
pub use codec::{CodecOffer, PayloadKind};
pub use crypto::{CryptoAttribute, CryptoSuite};
pub use diff::{compare, compare_global, compare_streams, payload_lists_equal, print_differences, ChangeFlags};
pub use error::{DescriptionError, Result};
pub use session::{MediaSessionDescriptor, MediaSessionDescriptorBuilder};
pub use stream::StreamDescriptor;
pub use types::{DtlsRole, MediaProto, MulticastRole, StreamDirection, StreamType};

/// Re-export of the types most callers need
pub mod prelude {
    pub use super::{
        compare, BundleGroup, ChangeFlags, CodecOffer, CryptoAttribute, CryptoSuite,
        DtlsRole, MediaProto, MediaSessionDescriptor, StreamDescriptor, StreamDirection,
        StreamType,
    };
}

/// Connection addresses that legacy endpoints use to signal "no media here"
pub const NULL_ADDRESSES: [&str; 2] = ["0.0.0.0", "::0"];
