// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Subscriber setup for hosts embedding the compiler.

use std::sync::Once;

const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

/// Install a `fmt` subscriber once per process.
///
/// `level` is an `EnvFilter` directive such as
/// `"air_assembly_winterfell=debug"`; when absent
/// or empty `RUST_LOG` is used, then `info`.
pub fn init_with_level(level: Option<&str>) {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }

        let directive = match level {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        };

        let filter = tracing_subscriber::EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            eprintln!("WARN: invalid log filter '{directive}': {e}; falling back to '{DEFAULT_FILTER}'");
            tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)
        });

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init();

        tracing::debug!(filter = %directive, "logging initialized");
    });
}

/// Same as [`init_with_level`] reading only `RUST_LOG`.
pub fn init() {
    init_with_level(None);
}
