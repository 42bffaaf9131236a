//! Status callback (reporter) contract, spec §3 "Status Callback" and §4.6.
//!
//! A [`Reporter`] is handed to every top-level request. The negotiator
//! guarantees `report` fires at most once per request; if a method returns
//! without reporting, [`Latch`] inserts a final [`StatusCode::LocalError`]
//! report so callers always get a last-line answer.

use std::sync::atomic::{AtomicBool, Ordering};

/// Status codes surfaced to reporters (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NoData,
    DataError,
    MethodNotAllowed,
    ProtoMethodError,
    ProtoVersionMismatch,
    ServerError,
    CommunicationFailure,
    ConnectionFailure,
    InvalidAddress,
    LocalError,
}

impl StatusCode {
    /// HTTP-style status used by the embedded web front-end (SPEC_FULL §6.5,
    /// grounded in the original's `clients/status_cb.h` `RESP_*` table).
    pub fn http_status(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoData => 404,
            StatusCode::DataError => 502,
            StatusCode::MethodNotAllowed => 403,
            StatusCode::ProtoMethodError => 400,
            StatusCode::ProtoVersionMismatch => 502,
            StatusCode::ServerError => 502,
            StatusCode::CommunicationFailure => 504,
            StatusCode::ConnectionFailure => 503,
            StatusCode::InvalidAddress => 400,
            StatusCode::LocalError => 500,
        }
    }
}

/// Caller-supplied outcome sink. Implementors must tolerate being called
/// from a worker thread (the auto-send fan-out reports from per-peer
/// threads).
pub trait Reporter: Send + Sync {
    fn report(&self, status: StatusCode, payload: &[u8]);
}

/// A reporter that discards everything; used when the caller passes none.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _status: StatusCode, _payload: &[u8]) {}
}

/// Wraps a caller's reporter with the at-most-once latch spec §4.6 demands.
pub struct Latch<'a> {
    inner: &'a dyn Reporter,
    called: AtomicBool,
}

impl<'a> Latch<'a> {
    pub fn new(inner: &'a dyn Reporter) -> Self {
        Latch {
            inner,
            called: AtomicBool::new(false),
        }
    }

    /// Reports at most once; subsequent calls are silently dropped.
    pub fn report(&self, status: StatusCode, payload: &[u8]) {
        if self
            .called
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.report(status, payload);
        }
    }

    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }

    /// Final backstop: if nothing reported yet, report `LocalError` (spec §4.6).
    pub fn finish_with_default(&self) {
        self.report(StatusCode::LocalError, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingReporter(Mutex<Vec<(StatusCode, Vec<u8>)>>);

    impl Reporter for RecordingReporter {
        fn report(&self, status: StatusCode, payload: &[u8]) {
            self.0.lock().unwrap().push((status, payload.to_vec()));
        }
    }

    #[test]
    fn latch_reports_at_most_once() {
        let rec = RecordingReporter(Mutex::new(Vec::new()));
        let latch = Latch::new(&rec);
        latch.report(StatusCode::Ok, b"first");
        latch.report(StatusCode::ServerError, b"second");
        let calls = rec.0.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, StatusCode::Ok);
        assert_eq!(calls[0].1, b"first");
    }

    #[test]
    fn finish_with_default_only_fires_if_unreported() {
        let rec = RecordingReporter(Mutex::new(Vec::new()));
        let latch = Latch::new(&rec);
        latch.finish_with_default();
        assert_eq!(rec.0.lock().unwrap().len(), 1);
        assert_eq!(rec.0.lock().unwrap()[0].0, StatusCode::LocalError);

        let rec2 = RecordingReporter(Mutex::new(Vec::new()));
        let latch2 = Latch::new(&rec2);
        latch2.report(StatusCode::Ok, b"");
        latch2.finish_with_default();
        assert_eq!(rec2.0.lock().unwrap().len(), 1);
        assert_eq!(rec2.0.lock().unwrap()[0].0, StatusCode::Ok);
    }
}
