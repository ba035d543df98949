// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prints the Runtime and Infra CustomResourceDefinitions as YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::CustomResourceExt;
use runtime_operator::types::{Infra, Runtime};

fn main() -> anyhow::Result<()> {
    for crd in [Runtime::crd(), Infra::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
