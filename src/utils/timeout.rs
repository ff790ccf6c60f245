use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for establishing the TCP connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default idle read timeout. Vanilla servers send a keep-alive every 15 seconds
/// and drop clients after 30, so a silent server for this long is gone.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `fut`, mapping an elapsed deadline to `ProtocolError::Timeout`.
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Like [`with_timeout_error`], but `None` means no deadline.
pub async fn maybe_with_timeout<F, T>(fut: F, duration: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match duration {
        Some(duration) => with_timeout_error(fut, duration).await,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_deadline_is_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        };
        let result = with_timeout_error(slow, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn no_deadline_passes_through() {
        let result = maybe_with_timeout(async { Ok(7) }, None).await;
        assert!(matches!(result, Ok(7)));
    }
}
