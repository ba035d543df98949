// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources watched by the operator.

pub mod infra;
pub mod request;
pub mod runtime;

pub use infra::{Infra, InfraSpec};
pub use request::ReconcileRequest;
pub use runtime::{Runtime, RuntimeSpec, RuntimeType};
