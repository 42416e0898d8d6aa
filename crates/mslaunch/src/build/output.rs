//! Output relay for build processes
//!
//! Each redirected stream gets its own reader task. Lines are delivered to the
//! sink in the order the child wrote them; nothing is guaranteed about the
//! interleaving of stdout and stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Callback receiving one line of output at a time
///
/// Sinks are invoked from a Tokio worker, never from the thread waiting on
/// the build.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Redirected stream of a build process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Create a sink that forwards lines into a channel
///
/// The receiver yields lines in order and ends once the sink and every clone
/// of it are dropped, i.e. after the build finished.
pub fn channel_sink() -> (LineSink, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: LineSink = Arc::new(move |line: &str| {
        // Receiver gone means nobody is listening anymore
        let _ = tx.send(line.to_string());
    });
    (sink, rx)
}

/// Spawn a task relaying `reader` line by line to `sink`
pub(crate) fn spawn_line_reader<R>(
    reader: R,
    stream: OutputStream,
    program: String,
    sink: Option<LineSink>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line_ending(&buf));

                    match stream {
                        OutputStream::Stdout => {
                            tracing::debug!(target: "build_output", program = %program, "{}", line)
                        }
                        OutputStream::Stderr => {
                            tracing::warn!(target: "build_output", program = %program, "{}", line)
                        }
                    }

                    if let Some(ref sink) = sink {
                        sink(&line);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read {} of {}: {}", stream, program, e);
                    break;
                }
            }
        }
    })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"abc\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc"), b"abc");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }

    #[tokio::test]
    async fn test_reader_preserves_order() {
        let input: &[u8] = b"first\r\nsecond\n\nlast line without newline";
        let (sink, mut rx) = channel_sink();

        spawn_line_reader(input, OutputStream::Stdout, "test".to_string(), Some(sink))
            .await
            .unwrap();

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec!["first", "second", "", "last line without newline"]
        );
    }

    #[tokio::test]
    async fn test_reader_replaces_invalid_utf8() {
        let input: &[u8] = b"ok\n\xffbad\n";
        let (sink, mut rx) = channel_sink();

        spawn_line_reader(input, OutputStream::Stderr, "test".to_string(), Some(sink))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("ok"));
        assert_eq!(rx.recv().await.as_deref(), Some("\u{fffd}bad"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_reader_without_sink_drains_input() {
        let input: &[u8] = b"one\ntwo\n";

        spawn_line_reader(input, OutputStream::Stdout, "test".to_string(), None)
            .await
            .unwrap();
    }
}
