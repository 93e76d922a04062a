//! Scripted HTTP endpoint for exercising the session controller against a
//! real socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

use crate::core::message::Message;
use crate::core::session::TranscriptObserver;
use crate::core::transcript::Transcript;

pub enum Step {
    /// Write one chunk of the response body.
    Chunk(Vec<u8>),
    /// Hold the body open until the gate is opened.
    Wait(Arc<Notify>),
    /// Close the socket without finishing the chunked body.
    Drop,
}

pub fn chunk(bytes: impl Into<Vec<u8>>) -> Step {
    Step::Chunk(bytes.into())
}

pub fn event_line(json: &str) -> String {
    format!("data: {json}\n\n")
}

pub enum Reply {
    Stream(Vec<Step>),
    Status(u16),
}

pub struct ScriptedServer {
    pub addr: SocketAddr,
    /// Resolves with the raw request body once the request has been read.
    pub request: oneshot::Receiver<Vec<u8>>,
    pub task: JoinHandle<()>,
}

impl ScriptedServer {
    pub fn url(&self) -> String {
        format!("http://{}/api/chat", self.addr)
    }
}

pub async fn spawn_scripted_server(reply: Reply) -> ScriptedServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let (request_tx, request_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(body) = read_http_request(&mut stream).await else {
            return;
        };
        let _ = request_tx.send(body);
        let _ = write_reply(&mut stream, reply).await;
    });

    ScriptedServer {
        addr,
        request: request_rx,
        task,
    }
}

async fn write_reply(stream: &mut TcpStream, reply: Reply) -> std::io::Result<()> {
    match reply {
        Reply::Status(code) => {
            let head = format!(
                "HTTP/1.1 {code} Scripted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(head.as_bytes()).await?;
        }
        Reply::Stream(steps) => {
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\
                      Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                )
                .await?;
            stream.flush().await?;

            for step in steps {
                match step {
                    Step::Chunk(bytes) => {
                        let size = format!("{:x}\r\n", bytes.len());
                        stream.write_all(size.as_bytes()).await?;
                        stream.write_all(&bytes).await?;
                        stream.write_all(b"\r\n").await?;
                        stream.flush().await?;
                    }
                    Step::Wait(gate) => gate.notified().await,
                    Step::Drop => return Ok(()),
                }
            }
            stream.write_all(b"0\r\n\r\n").await?;
        }
    }
    stream.flush().await?;
    stream.shutdown().await
}

async fn read_http_request(stream: &mut TcpStream) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text = std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut content_length = 0_usize;
    for line in header_text.split("\r\n") {
        let mut parts = line.splitn(2, ':');
        let Some(name) = parts.next() else {
            continue;
        };
        if name.eq_ignore_ascii_case("content-length") {
            let value = parts.next().unwrap_or_default().trim();
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(body)
}

/// Records every transcript the controller publishes.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub snapshots: Arc<Mutex<Vec<Vec<Message>>>>,
    pub resets: Arc<Mutex<usize>>,
}

impl RecordingObserver {
    pub fn last(&self) -> Option<Vec<Message>> {
        self.snapshots.lock().expect("snapshots lock").last().cloned()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().expect("snapshots lock").len()
    }

    pub fn reset_count(&self) -> usize {
        *self.resets.lock().expect("resets lock")
    }
}

impl TranscriptObserver for RecordingObserver {
    fn transcript_changed(&mut self, transcript: &Transcript) {
        self.snapshots
            .lock()
            .expect("snapshots lock")
            .push(transcript.messages().to_vec());
    }

    fn transcript_reset(&mut self) {
        *self.resets.lock().expect("resets lock") += 1;
    }
}
