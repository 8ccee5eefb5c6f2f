//! Compresses the input from stdin and writes the result to stdout.
//!
//! Pass `reset` as the first argument to allow dictionary resets.

use std::env;
use std::io::{self, BufWriter};

use varlzw::{Encoder, Header};

fn main() {
    match (|| -> io::Result<()> {
        let reset = env::args().nth(1).map_or(false, |arg| arg == "reset");
        let mut encoder = Encoder::new(Header::default().with_reset(reset));
        let stdin = io::stdin();
        let stdin = stdin.lock();
        let stdout = io::stdout();
        let stdout = BufWriter::new(stdout.lock());
        let result = encoder.into_stream(stdout).encode_all(stdin);
        result.status?;
        eprintln!("{} -> {} bytes", result.bytes_read, result.bytes_written);
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
