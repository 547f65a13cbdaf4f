//! Module `file_transfer`
//!
//! Moves bytes between a file and a data connection. Binary transfers copy
//! unchanged in fixed-size chunks; ASCII transfers rewrite every line with a
//! CRLF terminator. The same routines serve both directions: RETR copies
//! file -> socket, STOR/APPE copy socket -> file.

use log::debug;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use crate::error::TransferError;
use crate::transfer::modes::TransferType;

/// Copies `src` into `dst` honoring the transfer type. Returns the number of
/// bytes written to `dst`.
pub fn transfer<R: Read, W: Write>(
    src: R,
    dst: W,
    transfer_type: TransferType,
    buffer_size: usize,
) -> Result<u64, TransferError> {
    let written = match transfer_type {
        TransferType::Binary => copy_binary(src, dst, buffer_size)?,
        TransferType::Ascii => copy_ascii(BufReader::with_capacity(buffer_size, src), dst)?,
    };
    debug!("{} transfer finished: {} bytes written", transfer_type.label(), written);
    Ok(written)
}

/// Byte-for-byte streaming copy.
pub fn copy_binary<R: Read, W: Write>(
    mut src: R,
    mut dst: W,
    buffer_size: usize,
) -> Result<u64, TransferError> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match src.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Read(e)),
        };
        dst.write_all(&buffer[..n]).map_err(TransferError::Write)?;
        total += n as u64;
    }

    dst.flush().map_err(TransferError::Write)?;
    Ok(total)
}

/// Line-oriented copy that terminates every line with CRLF.
///
/// A line ends at CR, LF or CRLF (CRLF counts once). The last line is
/// terminated even when the source ends without a line break; a source that
/// already ends with a break gains no extra empty line.
pub fn copy_ascii<R: BufRead, W: Write>(mut src: R, dst: W) -> Result<u64, TransferError> {
    let mut out = BufWriter::new(dst);
    let mut total = 0u64;
    let mut line_open = false;
    let mut after_cr = false;

    loop {
        let chunk = match src.fill_buf() {
            Ok([]) => break,
            Ok(chunk) => chunk,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Read(e)),
        };
        let consumed = chunk.len();

        let mut start = 0;
        for (idx, &byte) in chunk.iter().enumerate() {
            match byte {
                b'\n' if after_cr => {
                    after_cr = false;
                    start = idx + 1;
                }
                b'\r' | b'\n' => {
                    out.write_all(&chunk[start..idx]).map_err(TransferError::Write)?;
                    out.write_all(b"\r\n").map_err(TransferError::Write)?;
                    total += (idx - start) as u64 + 2;
                    start = idx + 1;
                    line_open = false;
                    after_cr = byte == b'\r';
                }
                _ => {
                    after_cr = false;
                    line_open = true;
                }
            }
        }
        if start < consumed {
            out.write_all(&chunk[start..]).map_err(TransferError::Write)?;
            total += (consumed - start) as u64;
        }

        src.consume(consumed);
    }

    if line_open {
        out.write_all(b"\r\n").map_err(TransferError::Write)?;
        total += 2;
    }

    out.flush().map_err(TransferError::Write)?;
    Ok(total)
}
