use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{ready, Stream};
use pin_project::pin_project;

use crate::UploadError;

/// Byte stream that fails once more than `limit` bytes have passed through.
///
/// The chunk that crosses the limit is never yielded; the stream ends right
/// after reporting the error.
#[pin_project]
#[derive(Debug)]
pub(crate) struct SizeLimited<S> {
    #[pin]
    inner: S,
    field: String,
    limit: u64,
    seen: u64,
    done: bool,
}

impl<S> SizeLimited<S> {
    pub(crate) fn new(inner: S, field: impl Into<String>, limit: u64) -> Self {
        Self {
            inner,
            field: field.into(),
            limit,
            seen: 0,
            done: false,
        }
    }
}

impl<S> Stream for SizeLimited<S>
where
    S: Stream<Item = Result<Bytes, UploadError>>,
{
    type Item = Result<Bytes, UploadError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(chunk)) => {
                *this.seen = this.seen.saturating_add(chunk.len() as u64);
                if *this.seen > *this.limit {
                    *this.done = true;
                    return Poll::Ready(Some(Err(UploadError::FileSizeLimitExceeded {
                        field: this.field.clone(),
                        max_file_size: *this.limit,
                    })));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => {
                *this.done = true;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                *this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, stream, StreamExt};

    use super::*;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, UploadError>> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn passes_streams_at_the_limit() {
        let limited = SizeLimited::new(chunks(&[b"abc", b"de"]), "image", 5);
        let items = block_on(limited.collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
    }

    #[test]
    fn fails_on_the_crossing_chunk_and_stops() {
        let limited = SizeLimited::new(chunks(&[b"abc", b"def", b"ghi"]), "image", 5);
        let items = block_on(limited.collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[1],
            Err(UploadError::FileSizeLimitExceeded { field, max_file_size: 5 }) if field == "image"
        ));
    }
}
