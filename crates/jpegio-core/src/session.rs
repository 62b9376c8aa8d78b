//! The recovery point around one backend session.
//!
//! Everything between creating a backend session and tearing it down runs
//! inside [`trap`]. A backend error returned through `?` and a backend panic
//! both land here, so the driver has exactly one place to restore the stream
//! and pick the public error.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use crate::backend::BackendError;
use crate::JpegError;

/// A failure inside a trapped session.
#[derive(Debug)]
pub(crate) enum SessionError {
    /// The backend failed. Its diagnostic text stays internal.
    Backend(BackendError),
    /// The driver itself failed with an error that is already public.
    Core(JpegError),
}

impl SessionError {
    /// Turn this into the error returned to the caller.
    ///
    /// Backend failures are logged and replaced with `failure`; driver errors
    /// pass through untouched.
    pub(crate) fn resolve(self, failure: JpegError) -> JpegError {
        match self {
            SessionError::Backend(e) => {
                log::debug!("suppressed backend diagnostic: {e}");
                failure
            }
            SessionError::Core(e) => e,
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(e: BackendError) -> Self {
        SessionError::Backend(e)
    }
}

impl From<JpegError> for SessionError {
    fn from(e: JpegError) -> Self {
        SessionError::Core(e)
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Backend(BackendError::Io(e))
    }
}

/// Run `op`, catching a panic as a backend failure.
///
/// Whatever `op` borrowed is dropped during unwinding before this returns,
/// so the caller regains its stream in a usable state.
pub(crate) fn trap<T>(op: impl FnOnce() -> Result<T, SessionError>) -> Result<T, SessionError> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result,
        Err(payload) => Err(SessionError::Backend(BackendError::Panicked(
            panic_message(payload.as_ref()),
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_passes_success_through() {
        let result = trap(|| Ok::<_, SessionError>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_trap_catches_panic() {
        let result: Result<(), _> = trap(|| panic!("huffman table missing"));
        match result {
            Err(SessionError::Backend(BackendError::Panicked(msg))) => {
                assert_eq!(msg, "huffman table missing");
            }
            other => panic!("expected panic to be trapped, got {other:?}"),
        }
    }

    #[test]
    fn test_trap_catches_formatted_panic() {
        let result: Result<(), _> = trap(|| panic!("row {} out of range", 7));
        assert!(matches!(
            result,
            Err(SessionError::Backend(BackendError::Panicked(msg))) if msg == "row 7 out of range"
        ));
    }

    #[test]
    fn test_resolve_hides_backend_text() {
        let err = SessionError::from(BackendError::Decoder("bad DHT".to_string()));
        let resolved = err.resolve(JpegError::DecodeFailed);
        assert_eq!(resolved.to_string(), "JPEG loading error");
    }

    #[test]
    fn test_resolve_keeps_core_errors() {
        let err = SessionError::from(JpegError::OutOfMemory { width: 9, height: 9 });
        let resolved = err.resolve(JpegError::DecodeFailed);
        assert!(matches!(resolved, JpegError::OutOfMemory { width: 9, height: 9 }));
    }

    #[test]
    fn test_io_error_is_a_backend_failure() {
        let err = SessionError::from(io::Error::other("pipe closed"));
        assert!(matches!(err, SessionError::Backend(BackendError::Io(_))));
    }
}
