//! # falldetect-domain
//!
//! Pure domain model for the fall-detection relay.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps, identifiers
//! - Define the **`FallEvent`** value produced for every detected fall
//! - Decode the peripheral's **wire messages** (`FALL:<type>:<severity>`)
//! - Describe the peripheral's **GATT profile** (service, characteristic,
//!   notification descriptor)
//! - Define **accounts** and the caregiver link between them
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod account;
pub mod device;
pub mod fall_event;
pub mod profile;
pub mod wire;
