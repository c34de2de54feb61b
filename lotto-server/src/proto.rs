//! Wire protocol: framing and message codes.
//!
//! Every message is a big-endian `u16` length followed by that many body
//! bytes. A client body starts with a one-byte request code; after login it
//! continues with the 10-byte session id plus a NUL, then the request
//! arguments. A server body starts with `0x01` (data) or `0x00` (error, one
//! code byte follows). Multi-byte integers on the wire are big-endian
//! regardless of host architecture.

use anyhow::{bail, Result};
use lotto_core::ErrorCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const MSG_ERROR: u8 = 0x00;
pub const MSG_DATA: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestCode {
    Signup = 0x01,
    Login = 0x02,
    SubmitBet = 0x03,
    ListBets = 0x04,
    ListDraws = 0x05,
    ListWinnings = 0x06,
    Quit = 0x07,
}

impl RequestCode {
    pub fn from_byte(byte: u8) -> Option<RequestCode> {
        match byte {
            0x01 => Some(RequestCode::Signup),
            0x02 => Some(RequestCode::Login),
            0x03 => Some(RequestCode::SubmitBet),
            0x04 => Some(RequestCode::ListBets),
            0x05 => Some(RequestCode::ListDraws),
            0x06 => Some(RequestCode::ListWinnings),
            0x07 => Some(RequestCode::Quit),
            _ => None,
        }
    }
}

/// Reads one framed message. `None` means the peer closed the connection.
pub async fn read_frame(stream: &mut TcpStream) -> Result<Option<Vec<u8>>> {
    let len = match stream.read_u16().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len == 0 {
        bail!("zero-length frame");
    }

    let mut body = vec![0u8; len];
    match stream.read_exact(&mut body).await {
        Ok(_) => Ok(Some(body)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_frame(stream: &mut TcpStream, body: &[u8]) -> Result<()> {
    if body.len() > u16::MAX as usize {
        bail!("response of {} bytes exceeds the frame limit", body.len());
    }
    stream.write_u16(body.len() as u16).await?;
    stream.write_all(body).await?;
    Ok(())
}

pub async fn write_data(stream: &mut TcpStream, payload: &[u8]) -> Result<()> {
    let mut body = Vec::with_capacity(payload.len() + 1);
    body.push(MSG_DATA);
    body.extend_from_slice(payload);
    write_frame(stream, &body).await
}

pub async fn write_error(stream: &mut TcpStream, code: ErrorCode) -> Result<()> {
    write_frame(stream, &[MSG_ERROR, code.as_byte()]).await
}
