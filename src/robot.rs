//! Shared JSON envelope for `--robot-*` output. Every subcommand that
//! supports machine-readable output serializes through this so success and
//! error shapes stay consistent across the CLI surface.

use serde::Serialize;
use std::io::{self, Write};

use crate::errors::NzmError;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Envelope<T: Serialize> {
    Ok { data: T },
    Error { error_code: &'static str, message: String },
}

/// Write a successful robot-output payload to stdout as pretty JSON.
pub fn emit_ok<T: Serialize>(data: &T) -> anyhow::Result<()> {
    emit(&Envelope::Ok { data })
}

/// Write an error robot-output payload to stdout as pretty JSON. Does not
/// itself set the process exit code; callers still propagate the error.
pub fn emit_err(err: &NzmError) -> anyhow::Result<()> {
    emit(&Envelope::<()>::Error {
        error_code: err.code(),
        message: err.to_string(),
    })
}

fn emit<T: Serialize>(envelope: &Envelope<T>) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, envelope)?;
    handle.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn ok_envelope_round_trips_through_json() {
        let envelope = Envelope::Ok { data: Payload { value: 7 } };
        let json = serde_json::to_string(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["value"], 7);
    }

    #[test]
    fn error_envelope_carries_code_and_message() {
        let err = NzmError::PaneNotFound("%9".to_string());
        let envelope = Envelope::<()>::Error {
            error_code: err.code(),
            message: err.to_string(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_code"], "pane_not_found");
    }
}
