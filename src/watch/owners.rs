// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Maps changes of Infra objects back to the Runtimes referencing them.

use crate::types::{Infra, Runtime};
use kube::{runtime::reflector::ObjectRef, Resource, ResourceExt};
use std::collections::BTreeSet;
use tracing::debug;

/// Every Runtime listed as owner of the given Infra object, whether or not it
/// is the controlling owner. Owners match on group and kind, so references
/// written through any served version count. Owner references are
/// namespace-local, so the Runtimes live in the Infra object's namespace.
pub fn runtime_owners(infra: &Infra) -> Vec<ObjectRef<Runtime>> {
    let group = Runtime::group(&());
    let kind = Runtime::kind(&());

    let names: BTreeSet<&str> = infra
        .owner_references()
        .iter()
        .filter(|owner| api_group(&owner.api_version) == group && owner.kind == kind)
        .map(|owner| owner.name.as_str())
        .collect();

    let namespace = infra.namespace();
    debug!(
        "Infra {} change maps to {} runtime(s)",
        infra.name_any(),
        names.len()
    );

    names
        .into_iter()
        .map(|name| {
            let reference = ObjectRef::<Runtime>::new(name);
            match namespace.as_deref() {
                Some(ns) => reference.within(ns),
                None => reference,
            }
        })
        .collect()
}

/// Group part of an `apiVersion`, empty for the core group
fn api_group(api_version: &str) -> &str {
    match api_version.split_once('/') {
        Some((group, _)) => group,
        None => "",
    }
}
