use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use poolftp::{Server, ServerConfig};

fn test_config(root: &Path, worker_threads: usize) -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1".into(),
        control_port: 0,
        worker_threads,
        root_dir: root.display().to_string(),
        passive_port_min: 30000,
        passive_port_max: 60000,
        ..ServerConfig::default()
    }
}

fn start_server(root: &Path, worker_threads: usize) -> SocketAddr {
    let config = test_config(root, worker_threads);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let server = Server::bind(config).await.unwrap();
            tx.send(server.local_addr().unwrap()).unwrap();
            server.run_until(std::future::pending()).await.unwrap();
        });
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap()
}

/// A server whose shutdown the test triggers.
struct StoppableServer {
    addr: SocketAddr,
    stop: Option<tokio::sync::oneshot::Sender<()>>,
    /// Signalled once the acceptor has stopped.
    stopped: mpsc::Receiver<()>,
    /// Signalled once every running session has finished.
    drained: mpsc::Receiver<()>,
}

impl StoppableServer {
    fn start(root: &Path, worker_threads: usize) -> Self {
        let config = test_config(root, worker_threads);
        let (addr_tx, addr_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let (stopped_tx, stopped_rx) = mpsc::channel();
        let (drained_tx, drained_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let server = Server::bind(config).await.unwrap();
                addr_tx.send(server.local_addr().unwrap()).unwrap();
                server
                    .run_until(async {
                        let _ = stop_rx.await;
                    })
                    .await
                    .unwrap();
                stopped_tx.send(()).unwrap();
                server.drain().await.unwrap();
                drained_tx.send(()).unwrap();
            });
        });

        Self {
            addr: addr_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            stop: Some(stop_tx),
            stopped: stopped_rx,
            drained: drained_rx,
        }
    }

    fn shutdown(&mut self) {
        self.stop.take().unwrap().send(()).unwrap();
        self.stopped.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}

struct FtpClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl FtpClient {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let writer = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    /// Connects and consumes the greeting.
    fn login(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr);
        assert!(client.reply().starts_with("220 "));
        client
    }

    fn reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line
    }

    fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).unwrap();
        self.writer.write_all(b"\r\n").unwrap();
    }

    fn cmd(&mut self, line: &str) -> String {
        self.send(line);
        self.reply()
    }

    fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.reader.read(&mut buf), Ok(0))
    }

    /// Enters passive mode and connects to the advertised port.
    fn passive_data(&mut self) -> TcpStream {
        let reply = self.cmd("PASV");
        assert!(reply.starts_with("227 "), "unexpected reply: {reply}");
        assert!(reply.contains("(127,0,0,1,"), "unexpected reply: {reply}");

        let start = reply.find('(').unwrap() + 1;
        let end = reply.find(')').unwrap();
        let fields: Vec<u16> = reply[start..end]
            .split(',')
            .map(|f| f.parse().unwrap())
            .collect();
        let port = fields[4] * 256 + fields[5];
        TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap()
    }
}

fn epsv_port(reply: &str) -> u16 {
    let start = reply.find("(|||").unwrap() + 4;
    let end = reply.find("|)").unwrap();
    reply[start..end].parse().unwrap()
}

fn read_all(mut stream: TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    stream.read_to_end(&mut data).unwrap();
    data
}

#[test]
fn greeting_login_and_quit() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::connect(addr);

    assert_eq!(client.reply(), "220 CoolFTPServer\r\n");
    assert_eq!(client.cmd("USER alice"), "331 Password required for alice\r\n");
    assert_eq!(client.cmd("PASS secret"), "230 You are now logged in.\r\n");
    assert!(client.cmd("SYST").starts_with("215 "));
    assert!(client.cmd("FEAT").starts_with("211 "));
    assert_eq!(client.cmd("QUIT"), "221 Goodbye\r\n");
    assert!(client.is_closed());
}

#[test]
fn ascii_retrieve_rewrites_line_endings() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("notes.txt"), b"abc\ndef").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let data = client.passive_data();
    assert!(client.cmd("RETR notes.txt").starts_with("150 "));
    assert_eq!(read_all(data), b"abc\r\ndef\r\n");
    assert!(client.reply().starts_with("226 "));
}

#[test]
fn binary_retrieve_is_byte_exact() {
    let root = tempfile::tempdir().unwrap();
    let payload = [0x00, b'\r', b'\n', 0xff, b'\r', 0x00, b'\n', b'\n'];
    fs::write(root.path().join("blob.bin"), payload).unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    assert_eq!(client.cmd("TYPE I"), "200 Switching to binary mode\r\n");
    let data = client.passive_data();
    assert!(client.cmd("RETR blob.bin").starts_with("150 "));
    assert_eq!(read_all(data), payload);
    assert!(client.reply().starts_with("226 "));
}

#[test]
fn active_mode_connects_back_to_client() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("hello.txt"), b"hello\n").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let data_listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = data_listener.local_addr().unwrap().port();
    let reply = client.cmd(&format!("PORT 127,0,0,1,{},{}", port >> 8, port & 0xff));
    assert_eq!(reply, "200 Entering active mode\r\n");

    assert!(client.cmd("RETR hello.txt").starts_with("150 "));
    let (data, _) = data_listener.accept().unwrap();
    assert_eq!(read_all(data), b"hello\r\n");
    assert!(client.reply().starts_with("226 "));
}

#[test]
fn list_hides_dot_entries() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("b.txt"), b"").unwrap();
    fs::write(root.path().join(".hidden"), b"").unwrap();
    fs::create_dir(root.path().join("a")).unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let data = client.passive_data();
    assert!(client.cmd("LIST").starts_with("150 "));
    assert_eq!(read_all(data), b"a\nb.txt\n");
    assert!(client.reply().starts_with("226 "));
}

#[test]
fn concurrent_store_has_one_winner() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 3);
    let mut first = FtpClient::login(addr);
    let mut second = FtpClient::login(addr);

    first.cmd("TYPE I");
    let mut data = first.passive_data();
    assert!(first.cmd("STOR upload.bin").starts_with("150 "));

    let _second_data = second.passive_data();
    assert!(second.cmd("STOR upload.bin").starts_with("452 "));

    data.write_all(b"first\r\n").unwrap();
    drop(data);
    assert!(first.reply().starts_with("226 "));
    assert_eq!(fs::read(root.path().join("upload.bin")).unwrap(), b"first\r\n");
}

#[test]
fn append_extends_existing_file() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("log.txt"), b"one\n").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    client.cmd("TYPE I");
    let mut data = client.passive_data();
    assert!(client.cmd("APPE log.txt").starts_with("150 "));
    data.write_all(b"two\n").unwrap();
    drop(data);
    assert!(client.reply().starts_with("226 "));
    assert_eq!(fs::read(root.path().join("log.txt")).unwrap(), b"one\ntwo\n");
}

#[test]
fn failed_cwd_keeps_directory() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("pub")).unwrap();
    let canonical = root.path().canonicalize().unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let expected_pwd = format!("257 \"{}\"\r\n", canonical.display());
    assert_eq!(client.cmd("PWD"), expected_pwd);
    assert!(client.cmd("CWD missing").starts_with("550 "));
    assert_eq!(client.cmd("PWD"), expected_pwd);

    assert_eq!(client.cmd("CWD pub"), "250 Directory successfully changed\r\n");
    assert_eq!(
        client.cmd("PWD"),
        format!("257 \"{}\"\r\n", canonical.join("pub").display())
    );
}

#[test]
fn directory_commands() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    assert!(client.cmd("MKD incoming").starts_with("226 "));
    assert!(root.path().join("incoming").is_dir());
    assert!(client.cmd("MKD incoming").starts_with("451 "));
    assert!(client.cmd("RMD incoming").starts_with("226 "));
    assert!(!root.path().join("incoming").exists());
    assert!(client.cmd("RMD incoming").starts_with("451 "));
}

#[test]
fn errors_keep_the_session_alive() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    assert_eq!(client.cmd("FOO"), "500 Command not supported\r\n");
    assert!(client.cmd("TYPE E").starts_with("504 "));
    assert!(client.cmd("PORT 1,2,3").starts_with("501 "));
    assert!(client.cmd("RETR").starts_with("501 "));
    assert!(client.cmd("RETR missing.txt").starts_with("550 "));
    assert!(client.cmd("LIST").starts_with("150 "));
    assert!(client.reply().starts_with("425 "));
    assert!(client.cmd("PWD").starts_with("257 "));
}

#[test]
fn carriage_return_only_line_closes_session() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    client.writer.write_all(b"\r\r\n").unwrap();
    assert!(client.is_closed());
}

#[test]
fn extra_clients_wait_for_a_free_worker() {
    let root = tempfile::tempdir().unwrap();
    let addr = start_server(root.path(), 1);
    let mut first = FtpClient::login(addr);

    let mut second = FtpClient::connect(addr);
    second
        .writer
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    let mut line = String::new();
    assert!(second.reader.read_line(&mut line).is_err());

    assert_eq!(first.cmd("QUIT"), "221 Goodbye\r\n");
    second
        .writer
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(second.reply(), "220 CoolFTPServer\r\n");
}

#[test]
fn extended_passive_transfer() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("data.txt"), b"one\ntwo\n").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let reply = client.cmd("EPSV");
    assert!(
        reply.starts_with("229 Entering passive mode. (|||"),
        "unexpected reply: {reply}"
    );
    let data = TcpStream::connect((Ipv4Addr::LOCALHOST, epsv_port(&reply))).unwrap();

    assert!(client.cmd("RETR data.txt").starts_with("150 "));
    assert_eq!(read_all(data), b"one\r\ntwo\r\n");
    assert!(client.reply().starts_with("226 "));
}

#[test]
fn ascii_uploads_rewrite_line_endings() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("log.txt"), b"one\r\n").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let mut data = client.passive_data();
    assert!(client.cmd("STOR notes.txt").starts_with("150 "));
    data.write_all(b"abc\ndef").unwrap();
    drop(data);
    assert!(client.reply().starts_with("226 "));
    assert_eq!(fs::read(root.path().join("notes.txt")).unwrap(), b"abc\r\ndef\r\n");

    let mut data = client.passive_data();
    assert!(client.cmd("APPE log.txt").starts_with("150 "));
    data.write_all(b"two\nthree").unwrap();
    drop(data);
    assert!(client.reply().starts_with("226 "));
    assert_eq!(
        fs::read(root.path().join("log.txt")).unwrap(),
        b"one\r\ntwo\r\nthree\r\n"
    );
}

#[test]
fn passive_listener_serves_one_transfer() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("a.txt"), b"a\n").unwrap();
    let addr = start_server(root.path(), 2);
    let mut client = FtpClient::login(addr);

    let data = client.passive_data();
    assert!(client.cmd("RETR a.txt").starts_with("150 "));
    assert_eq!(read_all(data), b"a\r\n");
    assert!(client.reply().starts_with("226 "));

    assert!(client.cmd("RETR a.txt").starts_with("150 "));
    assert!(client.reply().starts_with("425 "));
    assert!(client.cmd("PWD").starts_with("257 "));
}

#[test]
fn shutdown_lets_running_upload_finish() {
    let root = tempfile::tempdir().unwrap();
    let mut server = StoppableServer::start(root.path(), 2);
    let mut client = FtpClient::login(server.addr);

    client.cmd("TYPE I");
    let mut data = client.passive_data();
    assert!(client.cmd("STOR big.bin").starts_with("150 "));
    data.write_all(b"part1").unwrap();

    server.shutdown();
    assert!(server.drained.recv_timeout(Duration::from_millis(300)).is_err());

    data.write_all(b"part2").unwrap();
    drop(data);
    assert_eq!(client.reply(), "226 Transfer complete\r\n");
    assert_eq!(fs::read(root.path().join("big.bin")).unwrap(), b"part1part2");

    assert_eq!(client.cmd("QUIT"), "221 Goodbye\r\n");
    server.drained.recv_timeout(Duration::from_secs(5)).unwrap();
}
