//! Reference space negotiation
//!
//! Walks an ordered candidate list against the session and keeps the first
//! space the platform grants.

use crate::error::XrError;
use crate::platform::XrSession;
use crate::types::SpaceType;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedSpace<S> {
    pub space_type: SpaceType,
    pub space: S,
}

#[derive(Debug, Clone)]
pub struct SpaceNegotiator {
    order: Vec<SpaceType>,
}

impl SpaceNegotiator {
    pub fn new(order: Vec<SpaceType>) -> Self {
        Self { order }
    }

    /// Request each candidate once, in order, stopping at the first success
    pub async fn negotiate<X: XrSession>(&self, session: &X) -> Result<NegotiatedSpace<X::Space>> {
        let mut attempted = Vec::with_capacity(self.order.len());

        for &space_type in &self.order {
            attempted.push(space_type);

            match session.request_reference_space(space_type).await {
                Ok(space) => {
                    tracing::info!(space = %space_type, attempts = attempted.len(), "Using reference space");
                    return Ok(NegotiatedSpace { space_type, space });
                }
                Err(e) => {
                    tracing::debug!(space = %space_type, error = %e, "Reference space rejected");
                }
            }
        }

        Err(XrError::NoUsableReferenceSpace { attempted })
    }
}

impl Default for SpaceNegotiator {
    fn default() -> Self {
        Self::new(SpaceType::DEFAULT_ORDER.to_vec())
    }
}
