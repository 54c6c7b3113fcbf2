//! Replay of recorded call history.
//!
//! A pure read over the journal: nothing here mutates the store. The
//! rendered trace mirrors the recorded order, oldest call first.

use std::fmt;

use mnemo_core::{HistoryError, MnemoResult};

use crate::instrument::CallJournal;

/// An ordered, human-readable trace of one operation's recorded calls.
#[derive(Debug, Clone)]
pub struct CallTrace {
    operation: String,
    count: usize,
    lines: Vec<String>,
    truncated: bool,
}

impl CallTrace {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Total recorded calls (the length of the inputs list).
    pub fn count(&self) -> usize {
        self.count
    }

    /// One line per replayed call, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when the input and output lists disagreed in length and the
    /// trace was truncated to the shorter of the two.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for CallTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} was called {} times:", self.operation, self.count)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Reads the journal and renders recorded calls as a [`CallTrace`].
#[derive(Debug, Clone)]
pub struct Replay {
    journal: CallJournal,
}

impl Replay {
    pub fn new(journal: CallJournal) -> Self {
        Self { journal }
    }

    /// Render the full history of `operation`.
    ///
    /// Inputs and outputs are zipped positionally into
    /// `"<op>(*<input>) -> <output>"` lines. When the two lists are out
    /// of sync the zip truncates to the shorter list and the trace is
    /// flagged, rather than failing the whole replay.
    pub async fn report(&self, operation: &str) -> MnemoResult<CallTrace> {
        let (inputs, outputs) = self.journal.history(operation).await?;
        let count = inputs.len();

        let truncated = inputs.len() != outputs.len();
        if truncated {
            let err = HistoryError::OutOfSync {
                operation: operation.to_string(),
                inputs: inputs.len(),
                outputs: outputs.len(),
            };
            tracing::warn!(%err, "history lists out of sync, truncating replay");
        }

        let lines = inputs
            .iter()
            .zip(outputs.iter())
            .map(|(input, output)| format!("{operation}(*{input}) -> {output}"))
            .collect();

        Ok(CallTrace {
            operation: operation.to_string(),
            count,
            lines,
            truncated,
        })
    }
}
