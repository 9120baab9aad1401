//! Snapshot diffing for directory listings.

use std::collections::HashSet;

use crate::update::EndpointUpdate;

/// Cleans a raw directory listing: empty names are dropped and duplicates
/// collapsed, keeping first-seen order.
pub fn normalize<I, S>(children: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    children
        .into_iter()
        .map(Into::into)
        .filter(|child| !child.is_empty() && seen.insert(child.clone()))
        .collect()
}

/// Diffs a listing against the currently known endpoints.
///
/// Returns the updates that turn `known` into the listing, and the listing as
/// the new known set. Adds follow listing order; removes are sorted.
pub fn diff<I, S>(known: &HashSet<String>, listing: I) -> (Vec<EndpointUpdate>, HashSet<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let listing = normalize(listing);
    let mut updates = Vec::new();
    let mut current = HashSet::with_capacity(listing.len());

    for addr in listing {
        if !known.contains(&addr) {
            updates.push(EndpointUpdate::add(addr.clone()));
        }
        current.insert(addr);
    }

    let mut gone: Vec<&String> = known.difference(&current).collect();
    gone.sort();
    updates.extend(gone.into_iter().map(|addr| EndpointUpdate::remove(addr.clone())));

    (updates, current)
}
