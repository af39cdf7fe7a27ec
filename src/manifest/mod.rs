// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest decoding and application.

pub mod apply;
pub mod decode;

pub use apply::{read_manifest, submit, ApplyMode, ResourceApplier};
pub use decode::{decode, decode_all, RawDocument};
