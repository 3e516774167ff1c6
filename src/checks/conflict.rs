use crate::pr::Mergeable;
use crate::report::types::Verdict;

/// Only a definite MERGEABLE passes; unknown mergeability is treated as unsafe.
pub fn check_conflicts(mergeable: &Mergeable) -> Verdict {
    match mergeable {
        Mergeable::Mergeable => Verdict::pass(),
        Mergeable::Conflicting => Verdict::fail("Has merge conflicts"),
        other => Verdict::fail(format!("Conflict status: {}", other)),
    }
}
