// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Event admission and fan-out for the Runtime controller.

pub mod filter;
pub mod owners;

pub use filter::{admitted, should_reconcile, EventClassifier, ResourceEvent};
pub use owners::runtime_owners;
