//! Integration test crate for waveview.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every waveview crate to verify they work together.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod loading;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod interaction;

#[cfg(test)]
mod plugins;
