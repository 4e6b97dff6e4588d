//! Integration test crate for Scenebox.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the scenebox crates to verify they work together.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod mixer;

#[cfg(test)]
mod media;

#[cfg(test)]
mod scene;
