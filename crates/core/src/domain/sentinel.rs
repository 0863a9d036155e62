// Sentinel - the single terminal line of a run

use super::session::RunId;

pub const SUCCESS_MARKER: &str = "[SUCCESS]";
pub const ERROR_MARKER: &str = "[ERROR]";

const EXIT_CODE_PREFIX: &str = "exit code ";
const RUN_TAG_PREFIX: &str = "(run ";

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Success,
    Error { exit_code: i32 },
}

/// A sentinel recognised in a log line, with the run it belongs to (if tagged)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSentinel {
    pub sentinel: Sentinel,
    pub run_id: Option<RunId>,
}

impl Sentinel {
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Sentinel::Success
        } else {
            Sentinel::Error { exit_code }
        }
    }

    /// Render the sentinel line, tagged with the run it terminates
    pub fn render(&self, run_id: &RunId) -> String {
        match self {
            Sentinel::Success => format!(
                "{} Command completed successfully. {}{})",
                SUCCESS_MARKER, RUN_TAG_PREFIX, run_id
            ),
            Sentinel::Error { exit_code } => format!(
                "{} Command failed with {}{}. {}{})",
                ERROR_MARKER, EXIT_CODE_PREFIX, exit_code, RUN_TAG_PREFIX, run_id
            ),
        }
    }

    /// Recognise a sentinel line.
    ///
    /// The marker must open the line; an `[ERROR]` line must carry `exit code <n>`.
    pub fn parse(line: &str) -> Option<ParsedSentinel> {
        let line = line.trim_end();

        let sentinel = if line.starts_with(SUCCESS_MARKER) {
            Sentinel::Success
        } else if let Some(rest) = line.strip_prefix(ERROR_MARKER) {
            Sentinel::Error {
                exit_code: parse_exit_code(rest)?,
            }
        } else {
            return None;
        };

        Some(ParsedSentinel {
            sentinel,
            run_id: parse_run_tag(line),
        })
    }

    /// Like [`Sentinel::parse`], but only accepts lines tagged with `run_id`
    pub fn parse_for_run(line: &str, run_id: &RunId) -> Option<Sentinel> {
        Self::parse(line)
            .filter(|parsed| parsed.run_id.as_ref() == Some(run_id))
            .map(|parsed| parsed.sentinel)
    }
}

fn parse_exit_code(text: &str) -> Option<i32> {
    let (_, after) = text.split_once(EXIT_CODE_PREFIX)?;
    let digits: String = after
        .chars()
        .enumerate()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();
    digits.parse().ok()
}

fn parse_run_tag(line: &str) -> Option<RunId> {
    let (_, tag) = line.rsplit_once(RUN_TAG_PREFIX)?;
    let id = tag.strip_suffix(')')?;
    (!id.is_empty() && !id.contains(char::is_whitespace)).then(|| RunId::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_exit_code() {
        assert_eq!(Sentinel::from_exit_code(0), Sentinel::Success);
        assert_eq!(
            Sentinel::from_exit_code(7),
            Sentinel::Error { exit_code: 7 }
        );
    }

    #[test]
    fn test_render_shapes() {
        let run = RunId::new("0f1e2d3c");
        assert_eq!(
            Sentinel::Success.render(&run),
            "[SUCCESS] Command completed successfully. (run 0f1e2d3c)"
        );
        assert_eq!(
            Sentinel::Error { exit_code: 7 }.render(&run),
            "[ERROR] Command failed with exit code 7. (run 0f1e2d3c)"
        );
    }

    #[test]
    fn test_parse_rendered() {
        let run = RunId::new("0f1e2d3c");
        for sentinel in [
            Sentinel::Success,
            Sentinel::Error { exit_code: 7 },
            Sentinel::Error { exit_code: -1073741510 },
        ] {
            let parsed = Sentinel::parse(&sentinel.render(&run)).unwrap();
            assert_eq!(parsed.sentinel, sentinel);
            assert_eq!(parsed.run_id, Some(run.clone()));
        }
    }

    #[test]
    fn test_parse_untagged_legacy_lines() {
        let parsed = Sentinel::parse("[SUCCESS] Command completed successfully.").unwrap();
        assert_eq!(parsed.sentinel, Sentinel::Success);
        assert_eq!(parsed.run_id, None);

        let parsed = Sentinel::parse("[ERROR] Command failed with exit code 3.\r").unwrap();
        assert_eq!(parsed.sentinel, Sentinel::Error { exit_code: 3 });
    }

    #[test]
    fn test_parse_rejects_non_sentinels() {
        assert!(Sentinel::parse("build [SUCCESS]").is_none());
        assert!(Sentinel::parse("[ERROR] something broke").is_none());
        assert!(Sentinel::parse("").is_none());
    }

    #[test]
    fn test_parse_for_run_ignores_foreign_runs() {
        let ours = RunId::new("aaaa0000");
        let theirs = RunId::new("bbbb1111");
        let line = Sentinel::Success.render(&theirs);

        assert_eq!(Sentinel::parse_for_run(&line, &ours), None);
        assert_eq!(
            Sentinel::parse_for_run(&Sentinel::Success.render(&ours), &ours),
            Some(Sentinel::Success)
        );
        assert_eq!(
            Sentinel::parse_for_run("[SUCCESS] printed by the command", &ours),
            None
        );
    }
}
