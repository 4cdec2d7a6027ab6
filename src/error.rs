use thiserror::Error;

/// Exit code for bad arguments, missing variables and local I/O failures.
pub const EXIT_USAGE: i32 = 1;
/// sysexits `EX_UNAVAILABLE`: the store could not be reached.
pub const EXIT_UNAVAILABLE: i32 = 69;
/// sysexits `EX_PROTOCOL`: the store replied with something unexpected.
pub const EXIT_PROTOCOL: i32 = 76;
/// The child process for `run` could not be started.
pub const EXIT_SPAWN: i32 = 111;

#[derive(Debug, Error)]
pub enum EnvredisError {
    #[error("{0}")]
    Usage(String),
    #[error("variable not found: {0}")]
    NotFound(String),
    #[error("could not reach store at {url}: {reason}")]
    Connection { url: String, reason: String },
    #[error("unexpected reply from store: {0}")]
    Protocol(String),
    #[error("cannot export variable {name:?} to the child: {reason}")]
    Unexportable { name: String, reason: &'static str },
    #[error("could not start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EnvredisError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::NotFound(_) | Self::Unexportable { .. } | Self::Io(_) => {
                EXIT_USAGE
            }
            Self::Connection { .. } => EXIT_UNAVAILABLE,
            Self::Protocol(_) => EXIT_PROTOCOL,
            Self::Spawn { .. } => EXIT_SPAWN,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvredisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(EnvredisError::usage("bad").exit_code(), 1);
        assert_eq!(EnvredisError::NotFound("FOO".into()).exit_code(), 1);
        assert_eq!(
            EnvredisError::Connection { url: "redis://x".into(), reason: "refused".into() }
                .exit_code(),
            69
        );
        assert_eq!(EnvredisError::Protocol("WRONGTYPE".into()).exit_code(), 76);

        let spawn = EnvredisError::Spawn {
            program: "nope".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.exit_code(), 111);
    }

    #[test]
    fn connection_error_names_the_url() {
        let err = EnvredisError::Connection {
            url: "redis://127.0.0.1:1".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not reach store at redis://127.0.0.1:1: connection refused"
        );
    }
}
