// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for collision-free candidate names

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ufs_core::collision::candidate_name;
use ufs_core::path::PathResolver;
use ufs_core::EntryKind;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    name: &'a str,
    directory: bool,
    counter: u16,
}

fuzz_target!(|input: Input<'_>| {
    let resolver = PathResolver::posix();
    let kind = if input.directory { EntryKind::Directory } else { EntryKind::File };
    let counter = u64::from(input.counter).max(2);

    let candidate = candidate_name(&resolver, input.name, kind, counter);
    assert!(candidate.contains(&format!("({counter})")));
});
