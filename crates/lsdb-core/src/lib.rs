//! Spectral line-shape database engine: displacement morphing of sampled
//! profiles, four-corner interpolation over plasma density and temperature,
//! and Voigt broadening.

pub mod common;
pub mod config;
pub mod domain;
pub mod grid;
pub mod io;
pub mod numerics;
pub mod store;

pub use domain::{LsdbError, LsdbErrorCategory, LsdbResult};
