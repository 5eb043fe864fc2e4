//! Touch counting from a streaming `getevent -lt <device>`
//!
//! Every completed input report ends with an `EV_SYN SYN_REPORT` line:
//!
//! ```text
//! [   81234.118260] EV_ABS       ABS_MT_POSITION_X    000002a1
//! [   81234.118260] EV_SYN       SYN_REPORT           00000000
//! ```

use std::future::Future;
use std::pin::Pin;

use dmon_core::prelude::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::Child;

const SYN_REPORT: &str = "SYN_REPORT";

type LineSource = Pin<Box<dyn AsyncBufRead + Send>>;

/// Line stream of input events. Owns the `getevent` child, which is killed
/// when the stream is dropped.
pub struct EventStream {
    lines: Lines<LineSource>,
    _child: Option<Child>,
}

impl EventStream {
    /// Wrap a spawned child whose stdout was piped.
    pub fn from_child(mut child: Child) -> Result<Self> {
        let stdout = child.stdout.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "getevent stdout was not captured".to_string(),
        })?;
        let source: LineSource = Box::pin(BufReader::new(stdout));
        Ok(Self {
            lines: source.lines(),
            _child: Some(child),
        })
    }

    /// Stream lines from any buffered reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + 'static,
    {
        let source: LineSource = Box::pin(reader);
        Self {
            lines: source.lines(),
            _child: None,
        }
    }

    /// Next event line, or `None` once the stream has ended.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("child", &self._child.as_ref().and_then(Child::id))
            .finish()
    }
}

/// Count `SYN_REPORT` lines until `shutdown` resolves or the stream ends.
///
/// `on_report` runs once per report so callers can feed a shared counter.
/// Returns the number of reports seen.
pub async fn count_syn_reports<F>(
    stream: &mut EventStream,
    shutdown: F,
    mut on_report: impl FnMut(),
) -> Result<u64>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut total = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Touch counting stopped after {} reports", total);
                break;
            }
            line = stream.next_line() => match line? {
                Some(line) if line.contains(SYN_REPORT) => {
                    total += 1;
                    on_report();
                }
                Some(_) => {}
                None => {
                    debug!("getevent stream ended after {} reports", total);
                    break;
                }
            },
        }
    }

    Ok(total)
}
