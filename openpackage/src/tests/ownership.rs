//! Tests for the ownership resolver

use openpackage_schema::{IndexFile, IndexPackage, IndexTarget, SortedMap};

use crate::ownership::{AllowReason, OwnershipContext, OwnershipDecision};

fn index_with(package: &str, targets: &[&str]) -> IndexFile {
    let mut index = IndexFile::default();
    let mut record = IndexPackage {
        path: format!("registry:{package}"),
        ..Default::default()
    };
    for target in targets {
        record.files.insert(
            format!("src/{target}"),
            vec![IndexTarget::Plain(target.to_string())],
        );
    }
    index.packages.insert(package.to_owned(), record);
    index
}

#[test]
fn own_files_are_updates() {
    let index = index_with("reviewer", &["agents/reviewer.md"]);
    let ownership = OwnershipContext::build("reviewer", &index, &SortedMap::new());
    assert_eq!(
        ownership.decide("agents/reviewer.md", true, false),
        OwnershipDecision::Allow(AllowReason::OwnUpdate)
    );
}

#[test]
fn foreign_files_are_denied_unless_forced() {
    let index = index_with("other", &["agents/shared.md"]);
    let ownership = OwnershipContext::build("reviewer", &index, &SortedMap::new());
    assert_eq!(
        ownership.decide("agents/shared.md", true, false),
        OwnershipDecision::Deny {
            owner: "other".to_owned()
        }
    );
    assert_eq!(
        ownership.decide("agents/shared.md", true, true),
        OwnershipDecision::Allow(AllowReason::Forced)
    );
}

#[test]
fn unowned_existing_files_are_claimed() {
    let ownership =
        OwnershipContext::build("reviewer", &IndexFile::default(), &SortedMap::new());
    assert_eq!(
        ownership.decide("agents/stray.md", true, false),
        OwnershipDecision::Allow(AllowReason::UnownedClaim)
    );
    assert_eq!(
        ownership.decide("agents/new.md", false, false),
        OwnershipDecision::Allow(AllowReason::NewFile)
    );
}

#[test]
fn pending_mutations_count_as_ownership() {
    // a package installed earlier in this run (queued, not yet flushed)
    // already owns its targets
    let mut pending: SortedMap<String, IndexPackage> = SortedMap::new();
    let mut record = IndexPackage::default();
    record.files.insert(
        "agents/a.md".to_owned(),
        vec![IndexTarget::Plain("agents/a.md".to_owned())],
    );
    pending.insert("earlier".to_owned(), record);

    let ownership = OwnershipContext::build("reviewer", &IndexFile::default(), &pending);
    assert_eq!(
        ownership.decide("agents/a.md", true, false),
        OwnershipDecision::Deny {
            owner: "earlier".to_owned()
        }
    );
}

#[test]
fn merged_targets_never_deny() {
    let mut index = IndexFile::default();
    let mut record = IndexPackage::default();
    record.files.insert(
        "rules/style.md".to_owned(),
        vec![IndexTarget::Merged {
            target: "CLAUDE.md".to_owned(),
            merge: true,
        }],
    );
    index.packages.insert("other".to_owned(), record);

    let ownership = OwnershipContext::build("reviewer", &index, &SortedMap::new());
    assert_eq!(
        ownership.decide("CLAUDE.md", true, false),
        OwnershipDecision::Allow(AllowReason::UnownedClaim)
    );
}
