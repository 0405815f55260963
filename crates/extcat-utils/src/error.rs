use std::{error::Error, fmt, io, path::PathBuf};

/// A configured path (config file override, output directory, local overrides file)
/// that could not be turned into an absolute path.
#[derive(Debug)]
pub enum PathError {
    Empty,

    /// Relative path given while the working directory is unavailable.
    CurrentDir { source: io::Error },

    MissingEnvVar { var: String, input: String },

    /// A `${` with no closing brace.
    UnclosedVariable { input: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty path in configuration"),
            Self::CurrentDir { source } => {
                write!(f, "Cannot resolve relative path without a working directory: {source}")
            }
            Self::MissingEnvVar { var, input } => {
                write!(f, "`{input}` references `${var}`, which is not set")
            }
            Self::UnclosedVariable { input } => write!(f, "Missing `}}` after `{input}`"),
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir { source } => Some(source),
            _ => None,
        }
    }
}

/// Failures while writing a catalog or config file to disk.
///
/// Writes go through a `<target>.part` staging file, so the variants distinguish the
/// staging write from the final rename.
#[derive(Debug)]
pub enum FileSystemError {
    CreateDir {
        dir: PathBuf,
        source: io::Error,
    },

    WriteStaging {
        staging: PathBuf,
        source: io::Error,
    },

    /// The staging file was written but could not replace the target.
    Persist {
        staging: PathBuf,
        target: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { dir, source } => {
                write!(f, "Cannot create output directory `{}`: {source}", dir.display())
            }
            Self::WriteStaging { staging, source } => {
                write!(f, "Cannot write `{}`: {source}", staging.display())
            }
            Self::Persist {
                staging,
                target,
                source,
            } => {
                write!(
                    f,
                    "Cannot move `{}` into place at `{}`: {source}",
                    staging.display(),
                    target.display()
                )
            }
        }
    }
}

impl Error for FileSystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        let (Self::CreateDir { source, .. }
        | Self::WriteStaging { source, .. }
        | Self::Persist { source, .. }) = self;
        Some(source)
    }
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_messages() {
        let err = PathError::MissingEnvVar {
            var: "CATALOG_ROOT".to_string(),
            input: "$CATALOG_ROOT/json".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`$CATALOG_ROOT/json` references `$CATALOG_ROOT`, which is not set"
        );
        assert!(err.source().is_none());

        let err = PathError::UnclosedVariable {
            input: "${HOME".to_string(),
        };
        assert_eq!(err.to_string(), "Missing `}` after `${HOME`");

        let err = PathError::CurrentDir {
            source: io::Error::other("gone"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_persist_error_names_both_files() {
        let err = FileSystemError::Persist {
            staging: PathBuf::from("/json/duckdb.json.part"),
            target: PathBuf::from("/json/duckdb.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };

        assert_eq!(
            err.to_string(),
            "Cannot move `/json/duckdb.json.part` into place at `/json/duckdb.json`: permission denied"
        );
        assert!(err.source().is_some());
    }
}
