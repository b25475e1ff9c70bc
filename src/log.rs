//! Log sink interface (spec §6): the buffer pool emits page-level log
//! records at well-defined points (fetch, evict, EMLSN update, restore
//! begin/end, warmup done) but never manages the log file itself, WAL
//! segmentation, or archiving -- all of that lives outside this crate.

use crate::common::PageId;

/// One buffer-pool-originated log record. Variants mirror the emission
/// points named in spec §4.8 and §6.
#[derive(Debug, Clone)]
pub enum LogRecord {
    FetchPage { page_id: PageId },
    EvictPage { page_id: PageId, dirty: bool },
    UpdateEmlsn { page_id: PageId, emlsn: i64 },
    RestoreBegin { page_id: PageId },
    RestoreEnd { page_id: PageId },
    WarmupDone,
}

/// Consumed by the buffer pool to hand off log records; the real
/// implementation lives in the log/archiver subsystem, out of scope here.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Discards every record. The default when the embedder has no log
/// subsystem wired up yet (e.g. early bring-up, or a read-only replica).
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn emit(&self, _record: LogRecord) {}
}

/// Routes every record through `tracing` at debug level, so an embedder can
/// see buffer-pool log activity in its existing structured-logging pipeline
/// without standing up a real log sink.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, record: LogRecord) {
        tracing::debug!(?record, "buffer pool log record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullLogSink;
        sink.emit(LogRecord::FetchPage {
            page_id: PageId::new(1),
        });
        sink.emit(LogRecord::WarmupDone);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let sink = TracingLogSink;
        sink.emit(LogRecord::EvictPage {
            page_id: PageId::new(2),
            dirty: true,
        });
    }
}
