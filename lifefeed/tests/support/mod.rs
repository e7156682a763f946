#![allow(dead_code)]

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lifefeed::prelude::*;

pub fn live_server_url() -> Option<String> {
    env::var("LIFEFEED_LIVE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn timing(queue_capacity: usize, period: Duration) -> PipelineTiming {
    PipelineTiming {
        period,
        queue_capacity,
        backoff: ms(2),
        poll_interval: ms(2),
    }
}

pub fn wait_for(
    timeout: Duration,
    mut condition: impl FnMut() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(ms(2));
    }
    condition()
}

type Script = Box<dyn Fn(usize, Option<u64>) -> Frame + Send + Sync>;

/// A frame source driven by a closure of `(call index, cursor)`. Records
/// every cursor it was asked for.
pub struct ScriptedSource {
    script: Script,
    latency: Duration,
    cursors: Mutex<Vec<Option<u64>>>,
}

impl ScriptedSource {
    pub fn new(
        script: impl Fn(usize, Option<u64>) -> Frame + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            latency: Duration::ZERO,
            cursors: Mutex::new(Vec::new()),
        }
    }

    /// Counts up from the cursor (1 when none is given) and finishes at
    /// `last`.
    pub fn counting_to(last: u64) -> Self {
        Self::new(move |_, cursor| {
            let sequence = cursor.unwrap_or(1);
            if sequence >= last {
                Frame::finished(sequence, format!("world {}", sequence))
            } else {
                Frame::live(sequence, format!("world {}", sequence))
            }
        })
    }

    pub fn endless() -> Self {
        Self::counting_to(u64::MAX)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn cursors(&self) -> Vec<Option<u64>> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn clear_cursors(&self) {
        self.cursors.lock().unwrap().clear();
    }

    /// Fetches started so far, including one still in flight.
    pub fn fetch_count(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }
}

impl FrameSource for ScriptedSource {
    fn fetch(&self, cursor: Option<u64>) -> Frame {
        let index = {
            let mut cursors = self.cursors.lock().unwrap();
            cursors.push(cursor);
            cursors.len() - 1
        };

        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        (self.script)(index, cursor)
    }
}

/// Collects rendered frames with the instant they were shown.
#[derive(Clone, Default)]
pub struct Rendered(Arc<Mutex<Vec<(Instant, Frame)>>>);

impl Rendered {
    pub fn renderer(&self) -> impl Renderer + 'static {
        let log = self.0.clone();
        move |frame: &Frame| {
            log.lock().unwrap().push((Instant::now(), frame.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.0.lock().unwrap().iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn sequences(&self) -> Vec<Option<u64>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|(_, f)| f.sequence())
            .collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.0.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }
}

/// Minimal HTTP/1.1 server on a loopback port. Answers requests with the
/// scripted responses in order and repeats the last one after that.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener =
            TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        thread::spawn(move || {
            let mut served = 0usize;
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    break;
                };

                let mut reader = match stream.try_clone() {
                    Ok(read_half) => BufReader::new(read_half),
                    Err(_) => continue,
                };

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }

                let mut header = String::new();
                while reader.read_line(&mut header).is_ok_and(|n| n > 2) {
                    header.clear();
                }

                let target = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                log.lock().unwrap().push(target);

                let index = served.min(responses.len().saturating_sub(1));
                served += 1;
                let (status, body) = responses
                    .get(index)
                    .cloned()
                    .unwrap_or((404, String::new()));
                let reason = if status == 200 { "OK" } else { "Error" };

                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// A URL on a loopback port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind spare port");
    let addr = listener.local_addr().expect("spare port address");
    drop(listener);
    format!("http://{}/world", addr)
}
