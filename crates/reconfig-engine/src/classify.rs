//! Static vs. dynamic parameter classification

use std::collections::BTreeSet;

/// Check if a parameter can be applied without restart
///
/// Rules, first match wins:
/// 1. listed static → `false`
/// 2. listed dynamic → `true`
/// 3. only a static list exists → `true`
/// 4. only a dynamic list exists → `false`
/// 5. otherwise → `false`
#[must_use]
pub fn is_dynamic(param: &str, static_params: &BTreeSet<String>, dynamic_params: &BTreeSet<String>) -> bool {
    if static_params.contains(param) {
        return false;
    }
    if dynamic_params.contains(param) {
        return true;
    }
    dynamic_params.is_empty() && !static_params.is_empty()
}
