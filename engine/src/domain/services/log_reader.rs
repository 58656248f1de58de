//! Log Reader
//! Returns the trailing lines of a project's captured output

use crate::domain::services::RuntimeStateStore;
use crate::domain::DomainError;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Upper bound on the window allocated before the file is read
const PREALLOCATED_LINES: usize = 1024;

pub struct LogReader {
    states: Arc<RuntimeStateStore>,
}

impl LogReader {
    pub fn new(states: Arc<RuntimeStateStore>) -> Self {
        Self { states }
    }

    /// Up to `max_lines` most recent lines, oldest first
    pub async fn tail(&self, name: &str, max_lines: usize) -> Result<Vec<String>, DomainError> {
        let state = self.states.get(name).await?;
        let path = state
            .log_path()
            .ok_or_else(|| DomainError::LogNotCreated(name.to_string()))?;

        // read-only, no locking: the writer keeps appending undisturbed
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::LogNotCreated(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if max_lines == 0 {
            return Ok(Vec::new());
        }

        let mut window: VecDeque<Vec<u8>> =
            VecDeque::with_capacity(max_lines.min(PREALLOCATED_LINES));
        let mut segments = BufReader::new(file).split(b'\n');
        while let Some(mut line) = segments.next_segment().await? {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if window.len() == max_lines {
                window.pop_front();
            }
            window.push_back(line);
        }

        debug!(
            project = %name,
            path = %path.display(),
            lines = window.len(),
            "Read log tail"
        );

        Ok(window
            .into_iter()
            .map(|line| String::from_utf8_lossy(&line).into_owned())
            .collect())
    }
}
