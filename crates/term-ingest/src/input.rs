//! Line input for the loader
//!
//! `tokio::io::stdin` reads on a runtime blocking thread that cannot be
//! cancelled, so a load interrupted while stdin is idle would hang at
//! runtime shutdown. Input is instead pumped from a detached OS thread
//! through a bounded channel; the thread dies with the process.

use std::io::{Cursor, Read};
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_CAPACITY: usize = 16;

type Chunk = std::io::Result<Cursor<Vec<u8>>>;

/// Async view of the process's standard input.
pub fn stdin_reader() -> impl AsyncBufRead + Unpin + Send {
    blocking_reader(std::io::stdin())
}

/// Async view of any blocking reader, read on its own thread.
///
/// At most `CHANNEL_CAPACITY` chunks are buffered ahead of the consumer.
pub fn blocking_reader<R>(source: R) -> impl AsyncBufRead + Unpin + Send
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);

    std::thread::spawn(move || pump(source, tx));

    StreamReader::new(ReceiverStream::new(rx))
}

fn pump<R: Read>(mut source: R, tx: mpsc::Sender<Chunk>) {
    loop {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let chunk = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                buf.truncate(n);
                Ok(Cursor::new(buf))
            },
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };

        let failed = chunk.is_err();
        if tx.blocking_send(chunk).is_err() || failed {
            break;
        }
    }
    debug!("Input reader finished");
}
