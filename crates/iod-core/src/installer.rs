//! Offset-addressed streaming of installer payloads.
//!
//! Each stream owns its own file handle, so concurrent downloads of the same
//! package never share a cursor. The handle is closed when the stream is
//! dropped, whether it was drained, abandoned, or failed.

use std::io::{self, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;

/// Stream of exactly `len` bytes read from a byte range of a file.
///
/// If the file turns out to be shorter than the range (for example it was
/// truncated after the catalog was loaded), the stream ends with an
/// [`io::ErrorKind::UnexpectedEof`] error instead of silently yielding less.
pub struct InstallerStream {
    inner: ReaderStream<Take<File>>,
    path: PathBuf,
    len: u64,
    remaining: u64,
    finished: bool,
}

impl std::fmt::Debug for InstallerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerStream")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl InstallerStream {
    /// Open `path` and position a stream over `range`.
    pub async fn open(path: &Path, range: Range<u64>) -> io::Result<Self> {
        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(range.start)).await?;

        let len = range.end.saturating_sub(range.start);
        Ok(Self {
            inner: ReaderStream::new(file.take(len)),
            path: path.to_path_buf(),
            len,
            remaining: len,
            finished: false,
        })
    }

    /// Total bytes this stream will yield.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Stream for InstallerStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                if this.remaining > 0 {
                    Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "{} ended {} bytes before the end of the installer",
                            this.path.display(),
                            this.remaining
                        ),
                    ))))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, usize::try_from(self.remaining).ok())
    }
}
