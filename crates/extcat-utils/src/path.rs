use std::{env, path::PathBuf};

use crate::error::{PathError, PathResult};

/// Resolves a path string that may contain environment variables.
///
/// Expands `$VAR` and `${VAR}`, replaces a leading `~` with the user's home directory
/// and makes relative paths absolute against the current working directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::CurrentDir`] if the current directory cannot be determined
/// * [`PathError::MissingEnvVar`] if a referenced variable is undefined
/// * [`PathError::UnclosedVariable`] if a `${` is never closed
///
/// # Example
///
/// ```
/// use extcat_utils::path::resolve_path;
///
/// let resolved = resolve_path("$HOME/catalogs").unwrap();
/// assert!(resolved.is_absolute());
/// ```
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();

    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let resolved = expand_variables(path)?;
    let path_buf = PathBuf::from(resolved);

    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path_buf))
            .map_err(|err| PathError::CurrentDir { source: err })
    }
}

/// Returns the user's home directory.
///
/// Uses `HOME`, falling back to `/home/$USER` and finally `/`.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("USER").map(|user| PathBuf::from(format!("/home/{user}"))))
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Returns `$XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let var_name = consume_until(&mut chars, '}')?;
                    expand_env_var(&var_name, &mut result, path)?;
                } else {
                    let var_name = consume_var_name(&mut chars);
                    if var_name.is_empty() {
                        result.push('$');
                    } else {
                        expand_env_var(&var_name, &mut result, path)?;
                    }
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_until(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    delimiter: char,
) -> PathResult<String> {
    let mut var_name = String::new();

    for c in chars.by_ref() {
        if c == delimiter {
            return Ok(var_name);
        }
        var_name.push(c);
    }

    Err(PathError::UnclosedVariable {
        input: format!("${{{var_name}"),
    })
}

fn consume_var_name(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut var_name = String::new();

    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            var_name.push(c);
            chars.next();
        } else {
            break;
        }
    }

    var_name
}

fn expand_env_var(var_name: &str, result: &mut String, original: &str) -> PathResult<()> {
    match var_name {
        "HOME" => result.push_str(&home_dir().to_string_lossy()),
        "XDG_CONFIG_HOME" => result.push_str(&xdg_config_home().to_string_lossy()),
        _ => {
            let value = env::var(var_name).map_err(|_| {
                PathError::MissingEnvVar {
                    input: original.into(),
                    var: var_name.into(),
                }
            })?;
            result.push_str(&value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_resolve_path_env_vars() {
        env::set_var("EXTCAT_TEST_OUT", "/srv/catalogs");

        assert_eq!(
            resolve_path("$EXTCAT_TEST_OUT/json").unwrap(),
            PathBuf::from("/srv/catalogs/json")
        );
        assert_eq!(
            resolve_path("${EXTCAT_TEST_OUT}/json").unwrap(),
            PathBuf::from("/srv/catalogs/json")
        );

        env::remove_var("EXTCAT_TEST_OUT");
    }

    #[test]
    #[serial]
    fn test_resolve_path_tilde() {
        env::set_var("HOME", "/home/extcat");
        assert_eq!(
            resolve_path("~/json").unwrap(),
            PathBuf::from("/home/extcat/json")
        );
    }

    #[test]
    fn test_resolve_path_relative() {
        let resolved = resolve_path("json/sqlite.json").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("json/sqlite.json"));
    }

    #[test]
    fn test_resolve_path_errors() {
        assert!(matches!(resolve_path("  "), Err(PathError::Empty)));
        assert!(matches!(
            resolve_path("${UNCLOSED"),
            Err(PathError::UnclosedVariable { .. })
        ));
        assert!(matches!(
            resolve_path("$EXTCAT_SURELY_UNSET_VARIABLE/x"),
            Err(PathError::MissingEnvVar { .. })
        ));
    }

    #[test]
    fn test_lone_dollar_is_kept() {
        let resolved = resolve_path("/tmp/$/x").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/$/x"));
    }

    #[test]
    #[serial]
    fn test_xdg_config_home() {
        env::set_var("XDG_CONFIG_HOME", "/cfg");
        assert_eq!(xdg_config_home(), PathBuf::from("/cfg"));
        env::remove_var("XDG_CONFIG_HOME");
        env::set_var("HOME", "/home/extcat");
        assert_eq!(xdg_config_home(), PathBuf::from("/home/extcat/.config"));
    }
}
