//! Thin REPL client: one line of stdin in, one newline-framed request out,
//! one newline-framed response line printed.

use std::io::{self, BufRead, Write};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() {
    let address = std::env::args().nth(1).unwrap_or_else(|| "localhost:8088".to_string());

    let stream = match TcpStream::connect(&address).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("failed to connect to {address}: {e}");
            std::process::exit(1);
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    print!("connected to {address}\n> ");
    stdout.flush().ok();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("stdin error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            print!("> ");
            stdout.flush().ok();
            continue;
        }

        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            eprintln!("write error: {e}");
            break;
        }
        if let Err(e) = write_half.write_all(b"\n").await {
            eprintln!("write error: {e}");
            break;
        }

        let mut response = Vec::new();
        match reader.read_until(b'\n', &mut response).await {
            Ok(0) => {
                eprintln!("connection closed by server");
                break;
            }
            Ok(_) => {
                print!("{}", String::from_utf8_lossy(&response));
            }
            Err(e) => {
                eprintln!("read error: {e}");
                break;
            }
        }

        print!("> ");
        stdout.flush().ok();
    }
}
