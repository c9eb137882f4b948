// SPDX-License-Identifier: GPL-3.0-only

//! Bundled decoder implementations

pub mod qr_detector;
#[cfg(test)]
pub(crate) mod test_codes;

pub use qr_detector::QrDecoder;
