// SPDX-License-Identifier: MIT

//! Filesystem-safe slug derivation (`spec.md` §4.5).
//!
//! `slugify` lowercases, replaces runs of non-`[a-z0-9]` with a single
//! dash, and trims leading/trailing dashes. Storage-layout collisions are
//! resolved by the caller via [`next_candidate`].

/// Lowercase, dash-delimited slug of `name`. Never empty for non-empty
/// ASCII/Unicode input containing at least one alphanumeric character; the
/// caller is responsible for rejecting names that slugify to `""`
/// (`spec.md`'s "must produce a non-empty ... slug" invariant).
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Given a desired slug and a predicate that reports whether a candidate is
/// already taken, return the first of `slug`, `slug-2`, `slug-3`, … that is
/// free. Used both for per-server storage subtrees and for job base paths
/// within a server (`spec.md` §4.5: "collisions append `-2`, `-3`, … until
/// unique across all jobs").
pub fn next_candidate(slug: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(slug) {
        return slug.to_string();
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{slug}-{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
