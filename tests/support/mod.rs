use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// A one-connection Redis stand-in.
///
/// Handshake commands (`CLIENT ...`) get `+OK`; every other command gets
/// `reply` verbatim and is recorded.
pub struct FakeRedis {
    pub url: String,
    handle: JoinHandle<Vec<Vec<String>>>,
}

impl FakeRedis {
    pub fn start(reply: &'static [u8]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("redis://{}", listener.local_addr().expect("local addr"));

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut writer = stream;
            let mut commands = Vec::new();

            while let Some(command) = read_command(&mut reader) {
                let handshake =
                    command.first().is_some_and(|name| name.eq_ignore_ascii_case("CLIENT"));
                if handshake {
                    writer.write_all(b"+OK\r\n").expect("write handshake reply");
                } else {
                    writer.write_all(reply).expect("write reply");
                    commands.push(command);
                }
            }
            commands
        });

        Self { url, handle }
    }

    /// Waits for the client to hang up and returns what it sent.
    pub fn commands(self) -> Vec<Vec<String>> {
        self.handle.join().expect("fake redis thread")
    }
}

// Reads one RESP array of bulk strings; `None` on EOF.
fn read_command(reader: &mut impl BufRead) -> Option<Vec<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;
        let mut data = vec![0; len + 2];
        reader.read_exact(&mut data).ok()?;
        data.truncate(len);
        args.push(String::from_utf8_lossy(&data).into_owned());
    }
    Some(args)
}
