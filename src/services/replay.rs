use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::services::command::Command;
use crate::services::contest_engine::ContestEngine;
use crate::services::engine_actor;
use crate::services::scroll_log::ScrollLog;

/// Totals reported once the command stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: u64,
    pub skipped: u64,
    pub submissions: usize,
}

/// Feeds every line of `reader` through an engine actor, writing protocol
/// output to `out`. Unreadable and unparsable lines are skipped with a warning.
pub async fn replay<R, W, L>(
    mut reader: R,
    mut out: W,
    engine: ContestEngine,
    mut scroll_log: Option<&mut ScrollLog<L>>,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    L: Write,
{
    let (handle, task) = engine_actor::spawn(engine);
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read input")?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(err) => {
                warn!("Line {}: not valid UTF-8 ({}), skipped", line_no, err);
                skipped += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                warn!("Line {}: {}", line_no, err);
                skipped += 1;
                continue;
            }
        };

        let outcome = handle.execute(command).await?;
        for text in &outcome.lines {
            writeln!(out, "{text}")?;
        }
        if let (Some(log), Some(report)) = (scroll_log.as_deref_mut(), outcome.scroll.as_ref()) {
            log.append(report)?;
        }
        if outcome.finished {
            break;
        }
    }
    out.flush()?;
    drop(handle);

    let engine = task.await.context("Engine task panicked")?;
    info!(
        "Replay finished in phase {:?}: contest duration {}, {} problems",
        engine.phase(),
        engine.duration(),
        engine.problem_count()
    );
    Ok(ReplaySummary {
        lines: line_no,
        skipped,
        submissions: engine.submission_count(),
    })
}
