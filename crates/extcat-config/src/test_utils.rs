/// Runs `f` with the given environment variables set, restoring the previous values after.
///
/// Callers must be `#[serial]`.
pub fn with_env<F>(vars: Vec<(&str, Option<&str>)>, f: F)
where
    F: FnOnce(),
{
    let old_vars: Vec<_> = vars
        .iter()
        .map(|(k, _)| (*k, std::env::var(k).ok()))
        .collect();

    for (key, value) in &vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    f();

    for (key, old_value) in old_vars {
        match old_value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}
