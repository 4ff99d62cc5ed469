use tracing::warn;

/// Environment override for the native backends' thread pool.
pub const THREADS_ENV: &str = "OMP_NUM_THREADS";

/// Thread count for native compute libraries: the `OMP_NUM_THREADS` value
/// in `env` if given, otherwise half of `logical_cores`. Always at least 1.
/// A malformed override is ignored with a warning.
pub fn threads_from(env: Option<&str>, logical_cores: usize) -> usize {
    let default = (logical_cores / 2).max(1);
    match env.map(str::trim) {
        None | Some("") => default,
        Some(v) => match v.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(value = v, "ignoring invalid {THREADS_ENV}, using {default}");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_half_the_cores() {
        assert_eq!(threads_from(None, 16), 8);
        assert_eq!(threads_from(None, 3), 1);
        assert_eq!(threads_from(None, 1), 1);
        assert_eq!(threads_from(Some(""), 8), 4);
    }

    #[test]
    fn env_override_wins() {
        assert_eq!(threads_from(Some("6"), 16), 6);
        assert_eq!(threads_from(Some(" 2 "), 16), 2);
    }

    #[test]
    fn invalid_override_is_ignored() {
        assert_eq!(threads_from(Some("0"), 8), 4);
        assert_eq!(threads_from(Some("lots"), 8), 4);
    }
}
