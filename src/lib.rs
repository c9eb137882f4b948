// SPDX-License-Identifier: GPL-3.0-only

//! Barcode scanning session core
//!
//! Drives a camera through a scanning session, analyses its frames for
//! barcodes and reports results to the caller over a channel.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera provider abstraction and a virtual camera
//! - [`frame_processor`]: Per-frame analysis, decoding and result filtering
//! - [`session`]: Session lifecycle, torch and zoom controls
//! - [`config`]: Session configuration
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = ScannerSession::new(backend, tokio::runtime::Handle::current(), tx);
//! session.start(SessionConfig::default(), |opts| Arc::new(QrDecoder::new(opts.clone())))?;
//! while let Some(event) = rx.recv().await { /* ... */ }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod session;

// Re-export commonly used types
pub use config::SessionConfig;
pub use errors::{ScannerError, ScannerResult};
pub use frame_processor::{Barcode, Detection, DetectionMode, QrDecoder, ScanEvent, ScanWindow};
pub use session::{ScannerSession, SessionState, StartResult};
