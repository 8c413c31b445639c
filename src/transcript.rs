//! Reading the Claude Code transcript (JSONL event log).
//!
//! Every line is an independent JSON object. Only the tail of the file is
//! inspected; lines that fail to decode are ignored.

use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Lines scanned when looking for the latest token usage.
pub const USAGE_SCAN_LINES: usize = 100;
/// Lines scanned when looking for recent user messages.
pub const MESSAGE_SCAN_LINES: usize = 400;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TranscriptEntry {
    is_sidechain: bool,
    session_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<TranscriptMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TranscriptMessage {
    role: Option<String>,
    content: Option<Value>,
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usage {
    input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
}

impl Usage {
    fn context_tokens(&self) -> u64 {
        self.input_tokens.unwrap_or(0)
            + self.cache_read_input_tokens.unwrap_or(0)
            + self.cache_creation_input_tokens.unwrap_or(0)
    }
}

/// Returns the last `limit` lines of the file as raw bytes, oldest first.
///
/// Lines are kept undecoded: a line that is not valid UTF-8 (a host caught
/// mid-append) must not spoil the rest of the file.
pub fn tail_lines(path: &Path, limit: usize) -> io::Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut tail = VecDeque::with_capacity(limit.min(1024));
    loop {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(tail.into())
}

/// Decodes the lines newest first, dropping any that are not a JSON object.
fn parse_entries(lines: &[Vec<u8>]) -> Vec<TranscriptEntry> {
    lines
        .iter()
        .rev()
        .filter_map(|line| serde_json::from_slice::<TranscriptEntry>(line).ok())
        .collect()
}

/// Context size of the most recent main-thread turn: input tokens plus both
/// cache counters. Zero when the transcript is missing or has no usage yet.
pub fn latest_context_tokens(path: &Path) -> u64 {
    let Ok(lines) = tail_lines(path, USAGE_SCAN_LINES) else {
        return 0;
    };

    parse_entries(&lines)
        .into_iter()
        .filter(|entry| !entry.is_sidechain)
        .filter_map(|entry| entry.message?.usage)
        .map(|usage| usage.context_tokens())
        .find(|&tokens| tokens > 0)
        .unwrap_or(0)
}

/// Up to `limit` of the most recent user-typed messages for `session_id`,
/// in chronological order.
pub fn recent_user_messages(path: &Path, session_id: &str, limit: usize) -> Vec<String> {
    let Ok(lines) = tail_lines(path, MESSAGE_SCAN_LINES) else {
        return Vec::new();
    };

    let mut messages: Vec<String> = parse_entries(&lines)
        .into_iter()
        .filter(|entry| {
            !entry.is_sidechain
                && entry.session_id.as_deref() == Some(session_id)
                && entry.kind.as_deref() == Some("user")
        })
        .filter_map(|entry| {
            let message = entry.message?;
            if message.role.as_deref() != Some("user") {
                return None;
            }
            match message.content? {
                Value::String(text) if !is_system_message(&text) => Some(text),
                _ => None,
            }
        })
        .take(limit)
        .collect();

    messages.reverse();
    messages
}

/// Heuristic for content the host injected rather than the user typed.
pub fn is_system_message(content: &str) -> bool {
    content.starts_with('[')
        || content.starts_with('{')
        || content.starts_with("Caveat:")
        || content.contains("<local-command-stdout>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_transcript(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn user_line(session: &str, content: &str) -> String {
        serde_json::json!({
            "type": "user",
            "sessionId": session,
            "isSidechain": false,
            "message": {"role": "user", "content": content}
        })
        .to_string()
    }

    fn usage_line(sidechain: bool, input: u64, read: u64, create: u64) -> String {
        serde_json::json!({
            "type": "assistant",
            "isSidechain": sidechain,
            "message": {
                "role": "assistant",
                "usage": {
                    "input_tokens": input,
                    "cache_read_input_tokens": read,
                    "cache_creation_input_tokens": create,
                    "output_tokens": 999
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_tail_lines_keeps_last_lines_in_order() {
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let file = write_transcript(&lines);
        assert_eq!(
            tail_lines(file.path(), 3).unwrap(),
            vec![b"7".to_vec(), b"8".to_vec(), b"9".to_vec()]
        );
        assert_eq!(tail_lines(file.path(), 50).unwrap().len(), 10);
    }

    #[test]
    fn test_latest_context_tokens_sums_cache_counters() {
        let file = write_transcript(&[usage_line(false, 100, 2000, 300), usage_line(false, 10, 50_000, 5)]);
        assert_eq!(latest_context_tokens(file.path()), 50_015);
    }

    #[test]
    fn test_latest_context_tokens_skips_sidechain_and_zero() {
        let file = write_transcript(&[
            usage_line(false, 1, 1000, 0),
            usage_line(true, 9, 90_000, 0),
            usage_line(false, 0, 0, 0),
            "not json".to_string(),
            user_line("s", "hi"),
        ]);
        assert_eq!(latest_context_tokens(file.path()), 1001);
    }

    #[test]
    fn test_latest_context_tokens_only_scans_tail() {
        let mut lines = vec![usage_line(false, 5, 5, 5)];
        lines.extend((0..USAGE_SCAN_LINES).map(|_| user_line("s", "filler")));
        let file = write_transcript(&lines);
        assert_eq!(latest_context_tokens(file.path()), 0);
    }

    #[test]
    fn test_truncated_trailing_line_is_skipped() {
        let mut file = write_transcript(&[user_line("s", "hello"), usage_line(false, 0, 50_000, 0)]);
        // Host still appending: the last line stops inside a multi-byte char.
        file.write_all(b"{\"type\":\"user\",\"content\":\"caf\xc3").unwrap();
        file.flush().unwrap();

        assert_eq!(latest_context_tokens(file.path()), 50_000);
        assert_eq!(recent_user_messages(file.path(), "s", 2), vec!["hello"]);
    }

    #[test]
    fn test_tail_lines_strips_crlf() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"one\r\ntwo\r\n").unwrap();
        file.flush().unwrap();
        assert_eq!(tail_lines(file.path(), 5).unwrap(), vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_latest_context_tokens_missing_file() {
        assert_eq!(latest_context_tokens(Path::new("/this/path/does/not/exist.jsonl")), 0);
    }

    #[test]
    fn test_recent_user_messages_returns_last_two_in_order() {
        let file = write_transcript(&[user_line("s", "a"), user_line("s", "b"), user_line("s", "c")]);
        assert_eq!(recent_user_messages(file.path(), "s", 2), vec!["b", "c"]);
    }

    #[test]
    fn test_recent_user_messages_filters() {
        let sidechain = serde_json::json!({
            "type": "user", "sessionId": "s", "isSidechain": true,
            "message": {"role": "user", "content": "sidechain"}
        })
        .to_string();
        let tool_result = serde_json::json!({
            "type": "user", "sessionId": "s",
            "message": {"role": "user", "content": [{"type": "tool_result"}]}
        })
        .to_string();
        let file = write_transcript(&[
            user_line("s", "keep me"),
            user_line("other", "wrong session"),
            sidechain,
            tool_result,
            user_line("s", "[Request interrupted by user]"),
            user_line("s", "{\"json\": true}"),
            user_line("s", "Caveat: The messages below were generated"),
            user_line("s", "<local-command-stdout>ok</local-command-stdout>"),
        ]);
        assert_eq!(recent_user_messages(file.path(), "s", 2), vec!["keep me"]);
    }

    #[test]
    fn test_recent_user_messages_only_scans_tail() {
        let mut lines = vec![user_line("s", "too old")];
        lines.extend((0..MESSAGE_SCAN_LINES).map(|_| usage_line(false, 1, 0, 0)));
        let file = write_transcript(&lines);
        assert!(recent_user_messages(file.path(), "s", 2).is_empty());

        lines.remove(1);
        let file = write_transcript(&lines);
        assert_eq!(recent_user_messages(file.path(), "s", 2), vec!["too old"]);
    }

    #[test]
    fn test_recent_user_messages_missing_file() {
        assert!(recent_user_messages(Path::new("/nope.jsonl"), "s", 2).is_empty());
    }

    #[test]
    fn test_is_system_message() {
        assert!(is_system_message("[tool output]"));
        assert!(is_system_message("{}"));
        assert!(is_system_message("Caveat: something"));
        assert!(is_system_message("x <local-command-stdout> y"));
        assert!(!is_system_message("fix the [bug]"));
    }
}
