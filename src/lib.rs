// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod manifest;
pub mod pipeline;
pub mod resources;
pub mod secrets;
pub mod sonar;
pub mod wait;

#[cfg(test)]
pub mod test_utils;
