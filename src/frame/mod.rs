//! # Frame Codec Module
//!
//! Implementation of the MCC BTH-series message framing protocol.
//!
//! This module handles:
//! - Request frame encoding (start marker, command, frame id, payload)
//! - Reply frame validation against a per-command expectation record
//! - Additive mod-256 checksum calculation
//! - Surfacing the device status byte on rejected commands

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod protocol;
