//! Names of the evaluation norms reported by the tree builder.
//!
//! The builder identifies norms by integer id. The first three have
//! well-known names; any further id is named `tnorm_<id>`.

const KNOWN_NORMS: [&str; 3] = ["classic", "zadeh", "luka"];
const FALLBACK_PREFIX: &str = "tnorm_";

/// Name of the norm with the given id.
#[must_use]
pub fn norm_name(id: u32) -> String {
    usize::try_from(id)
        .ok()
        .and_then(|index| KNOWN_NORMS.get(index))
        .map_or_else(|| format!("{FALLBACK_PREFIX}{id}"), |name| (*name).to_string())
}

/// Names of every norm evaluated when the builder runs with `-f t_norms`:
/// ids `0..=t_norms`.
#[must_use]
pub fn norm_names(t_norms: u32) -> Vec<String> {
    (0..=t_norms).map(norm_name).collect()
}
