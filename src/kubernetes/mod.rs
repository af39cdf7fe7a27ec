// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for type discovery, client creation, and namespace management.

pub mod client;
pub mod discovery;
pub mod namespaces;

pub use client::create_client;
pub use discovery::{ResourceType, TypeCatalog};
pub use namespaces::{create_namespace, delete_namespace, namespace_exists};
