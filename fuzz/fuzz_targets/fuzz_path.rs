// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for path normalization and manipulation

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use ufs_core::path::{PathResolver, StoragePath};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        for resolver in [PathResolver::posix(), PathResolver::windows()] {
            let resolver = Arc::new(resolver);

            // Normalizing twice must not change the result
            let once = resolver.normalize(input);
            assert_eq!(resolver.normalize(&once), once);

            let path = StoragePath::new(resolver.clone(), input);
            let _ = path.leaf_name();
            let _ = path.extension();
            let _ = path.file_stem();
            let _ = path.is_root();

            if let Some(parent) = path.parent() {
                assert!(parent.as_str().len() <= path.as_str().len());
            }

            if let Some((base, rest)) = input.split_once('|') {
                let combined = resolver.combine(base, &[rest]);
                let _ = resolver.leaf_name(&combined);
            }
        }
    }
});
