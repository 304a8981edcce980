//! Collaborators the session drives but does not implement: the source of
//! local capabilities and the media engine running the streams.

use async_trait::async_trait;
use rvoip_media_description::{MediaSessionDescriptor, StreamDescriptor, StreamType};

use crate::errors::Result;

/// Local codec enumeration and transport binding
pub trait CapabilityProvider: Send + Sync {
    /// One stream per requested type, in the requested order. A type the
    /// provider cannot serve may be left out.
    fn enumerate_streams(&self, requested: &[StreamType]) -> Vec<StreamDescriptor>;
}

/// Media engine owning the RTP streams of a session.
///
/// Streams are addressed by their index in the negotiated description.
#[async_trait]
pub trait MediaStreamController: Send + Sync {
    async fn start_stream(&self, index: usize, stream: &StreamDescriptor) -> Result<()>;

    /// Point an existing stream at new transport endpoints, keeping its
    /// encoder and decoder
    async fn update_endpoints(&self, index: usize, stream: &StreamDescriptor) -> Result<()>;

    async fn stop_stream(&self, index: usize) -> Result<()>;

    /// Fresh candidate gathering and connectivity checks
    async fn restart_ice(&self, description: &MediaSessionDescriptor) -> Result<()>;

    /// Full teardown then start
    async fn rebuild_stream(&self, index: usize, stream: &StreamDescriptor) -> Result<()> {
        self.stop_stream(index).await?;
        self.start_stream(index, stream).await
    }
}
