//! 测试辅助：事件记录 actor、内存输出，以及两个手写的 HTTP 服务

use actix::prelude::*;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::core::task::ProgressEvent;

pub type EventLog = Arc<Mutex<Vec<ProgressEvent>>>;

pub struct EventRecorder {
    events: EventLog,
}

impl Actor for EventRecorder {
    type Context = Context<Self>;
}

impl Handler<ProgressEvent> for EventRecorder {
    type Result = ();
    fn handle(&mut self, msg: ProgressEvent, _ctx: &mut Self::Context) {
        self.events.lock().unwrap().push(msg);
    }
}

pub fn recorder() -> (Recipient<ProgressEvent>, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let addr = EventRecorder {
        events: Arc::clone(&events),
    }
    .start();
    (addr.recipient(), events)
}

/// 等邮箱中已有事件处理完，返回除屏障以外的全部事件
pub async fn drain(progress: &Recipient<ProgressEvent>, events: &EventLog) -> Vec<ProgressEvent> {
    progress.send(ProgressEvent::SessionDone).await.unwrap();
    let mut all = events.lock().unwrap().clone();
    all.pop();
    all
}

/// 可以克隆共享的内存输出，用来检查控制台内容
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 声明 `declared` 字节却只发送 `sent` 字节后断开
pub async fn truncated_server(declared: usize, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Disposition: attachment; filename=\"broken.bin\"\r\nConnection: close\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![7u8; sent]).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/broken.bin", addr)
}

/// 每个请求先停 `delay` 再回 64 字节，记录同时在处理的请求数的峰值
pub async fn counting_server(delay: Duration) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let peak_out = Arc::clone(&peak);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                let head = read_request_head(&mut socket).await;
                let name = head
                    .split_whitespace()
                    .nth(1)
                    .and_then(|path| path.rsplit('/').next())
                    .unwrap_or("file.bin")
                    .to_string();

                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                // 先减计数再回包，客户端收到响应时这个请求已不算在内
                in_flight.fetch_sub(1, Ordering::SeqCst);

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: 64\r\nContent-Disposition: attachment; filename=\"{}\"\r\nConnection: close\r\n\r\n",
                    name
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&[1u8; 64]).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (format!("http://{}", addr), peak_out)
}

async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut buf = [0u8; 4096];
    let mut request = Vec::new();
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}
