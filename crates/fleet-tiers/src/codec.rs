//! Reading and writing whole wire records on a stream.
//!
//! A record is read with `read_exact`: anything short of the full record
//! size (EOF, reset, timeout) is a protocol failure and the caller decides
//! what that means for its hop.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("short read: peer closed before {expected} bytes arrived")]
    ShortRead { expected: usize },
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read exactly one `T`.
pub async fn read_record<T, R>(reader: &mut R) -> Result<T, ExchangeError>
where
    T: AsBytes + FromBytes + FromZeroes,
    R: AsyncRead + Unpin,
{
    let mut record = T::new_zeroed();
    match reader.read_exact(record.as_bytes_mut()).await {
        Ok(_) => Ok(record),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ExchangeError::ShortRead {
                expected: std::mem::size_of::<T>(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Write exactly one `T` and flush.
pub async fn write_record<T, W>(writer: &mut W, record: &T) -> Result<(), ExchangeError>
where
    T: AsBytes,
    W: AsyncWrite + Unpin,
{
    writer.write_all(record.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Run `fut` under an optional deadline. `None` waits forever.
pub async fn within<F, T>(limit: Option<Duration>, fut: F) -> Result<T, ExchangeError>
where
    F: Future<Output = Result<T, ExchangeError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ExchangeError::TimedOut(limit))?,
        None => fut.await,
    }
}
