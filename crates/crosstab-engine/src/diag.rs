use std::collections::BTreeSet;
use std::sync::{Mutex, OnceLock};

/// Emits one `debug!` line per distinct `(context, detail)` pair per process.
///
/// The engine absorbs malformed requests (missing columns, unusable
/// predicates) into empty results rather than erroring; this keeps those
/// absorptions discoverable in logs without spamming on every recompute.
pub(crate) fn debug_once(context: &'static str, detail: String) {
    static SEEN: OnceLock<Mutex<BTreeSet<(&'static str, String)>>> = OnceLock::new();

    let seen = SEEN.get_or_init(|| Mutex::new(BTreeSet::new()));
    let mut seen = match seen.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if seen.insert((context, detail.clone())) {
        log::debug!("{context}: {detail}");
    }
}
