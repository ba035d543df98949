// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of Runtime resources.

pub mod backends;
pub mod backoff;
pub mod controller;
pub mod runtime;

pub use backends::Backends;
pub use controller::RuntimeController;
pub use runtime::RuntimeReconciler;
