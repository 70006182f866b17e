use crate::error::RuntimeError;

/// Runtime options derived from the host's fixed-position startup
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// The entrypoint executed on incoming messages.
    pub entrypoint: String,

    /// Written to stdout once per response, immediately before the
    /// serialized JSON body.
    pub stdout_sequence: String,

    /// Keep the worker alive after the first invocation and answer
    /// keepalive probes.
    pub keep_alive: bool,

    /// Written to both stdout and stderr after each completed invocation
    /// in keepalive mode.
    pub termination_sequence: String,
}

/// The two valid launch shapes of the worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// `<binary> metadata`: print the self-description document and exit.
    Metadata,
    /// `<binary> <entrypoint> <stdout-sequence> <keepalive> <termination-sequence>`.
    Execute(Options),
}

impl Launch {
    /// Parses the process argument vector.
    ///
    /// The framing sequences may contain NUL bytes, which cannot travel
    /// through a textual argument vector; the host escapes them as `\0`
    /// and they are unescaped here.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Launch, RuntimeError> {
        if args.len() == 2 && args[1].as_ref() == "metadata" {
            return Ok(Launch::Metadata);
        }
        if args.len() != 5 {
            return Err(RuntimeError::InvalidArgumentCount(args.len()));
        }

        Ok(Launch::Execute(Options {
            entrypoint: args[1].as_ref().to_string(),
            stdout_sequence: unescape_nul(args[2].as_ref()),
            keep_alive: args[3].as_ref() == "1",
            termination_sequence: unescape_nul(args[4].as_ref()),
        }))
    }
}

fn unescape_nul(sequence: &str) -> String {
    sequence.replace("\\0", "\0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_normal_mode() {
        let launch =
            Launch::parse(&["worker", "sum", "---", "1", "==="]).unwrap();
        assert_eq!(
            launch,
            Launch::Execute(Options {
                entrypoint: "sum".to_string(),
                stdout_sequence: "---".to_string(),
                keep_alive: true,
                termination_sequence: "===".to_string(),
            })
        );
    }

    #[test]
    fn keepalive_flag_must_be_one() {
        for flag in ["0", "true", "yes", ""] {
            let launch = Launch::parse(&["worker", "sum", "-", flag, "-"]).unwrap();
            let Launch::Execute(options) = launch else {
                panic!("expected execute mode");
            };
            assert!(!options.keep_alive, "flag {flag:?} should not enable keepalive");
        }
    }

    #[test]
    fn unescapes_embedded_nul_markers() {
        let launch =
            Launch::parse(&["worker", "sum", "\\0\\0\\0", "0", "x\\0y"]).unwrap();
        let Launch::Execute(options) = launch else {
            panic!("expected execute mode");
        };
        assert_eq!(options.stdout_sequence, "\0\0\0");
        assert_eq!(options.termination_sequence, "x\0y");
    }

    #[test]
    fn parses_metadata_mode() {
        assert_eq!(Launch::parse(&["worker", "metadata"]).unwrap(), Launch::Metadata);
    }

    #[test]
    fn rejects_wrong_argument_counts() {
        for args in [vec!["worker"], vec!["worker", "sum"], vec!["worker", "a", "b", "c", "d", "e"]] {
            let err = Launch::parse(&args).unwrap_err();
            let expected = format!("invalid number of process arguments: {}", args.len());
            assert_eq!(err.to_string(), expected);
        }
    }
}
