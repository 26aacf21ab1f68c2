//! Error taxonomy for the generation pipeline.
//!
//! `Config` errors are raised before any geometry work and are never
//! retried. `Geometry` errors are retried a bounded number of times by
//! the synthesizer, then surfaced. `Placement` errors report the exact
//! asset instance and attempt count so failures reproduce under the
//! same seed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or contradictory parameters, or a lookup of an
    /// unregistered constraint/asset/mesh name.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Degenerate synthesis result (disjoint rectangle union,
    /// collinear triangulation input, ...).
    #[error("degenerate geometry: {0}")]
    Geometry(String),

    /// Retry budget exhausted while placing one object instance.
    #[error("unable to place {tag} #{instance} after {attempts} attempts")]
    Placement {
        tag: String,
        instance: u32,
        attempts: u32,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Error::Geometry(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_message_reports_target_and_attempts() {
        let err = Error::Placement {
            tag: "box".to_string(),
            instance: 3,
            attempts: 100,
        };
        assert_eq!(
            err.to_string(),
            "unable to place box #3 after 100 attempts"
        );
    }

    #[test]
    fn config_message() {
        let err = Error::config("unknown workspace reference 'nope'");
        assert!(err.to_string().contains("unknown workspace reference"));
    }
}
