//! Per-connection request dispatch.

use crate::proto::{self, RequestCode};
use anyhow::Result;
use lotto_core::storage::winnings::encode_record;
use lotto_core::types::{SESSION_ID_LEN, WHEEL_UNSPECIFIED};
use lotto_core::{
    codec, AuthOutcome, BetKind, DrawSlice, ErrorCode, LottoEngine, LottoError, Session, Wheel,
};
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpStream;

/// Offset of request arguments in an authenticated message: one code byte,
/// the session id, and its NUL terminator.
const ARGS_OFFSET: usize = 1 + SESSION_ID_LEN + 1;

/// Serves one client connection until it closes, quits, or strikes out.
pub async fn handle_connection(
    engine: Arc<LottoEngine>,
    mut stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let ip = client_ipv4(&peer);
    let mut session: Option<Session> = None;
    let mut failed_logins: u8 = 0;

    while let Some(frame) = proto::read_frame(&mut stream).await? {
        let Some(code) = RequestCode::from_byte(frame[0]) else {
            proto::write_error(&mut stream, ErrorCode::Malformed).await?;
            continue;
        };

        // Gate every operation behind login, and login/signup behind not
        // being logged in yet.
        let is_auth_request = matches!(code, RequestCode::Signup | RequestCode::Login);
        match &session {
            None if !is_auth_request && code != RequestCode::Quit => {
                proto::write_error(&mut stream, ErrorCode::NotLoggedIn).await?;
                continue;
            }
            Some(_) if is_auth_request => {
                proto::write_error(&mut stream, ErrorCode::AlreadyLoggedIn).await?;
                continue;
            }
            Some(current) if code != RequestCode::Quit => {
                if !session_id_matches(&frame, &current.id) {
                    proto::write_error(&mut stream, ErrorCode::BadSession).await?;
                    continue;
                }
            }
            _ => {}
        }

        match code {
            RequestCode::Login => {
                tracing::debug!("client {}: login started", peer);
                match parse_credentials(&frame[1..]) {
                    Ok((username, password)) => {
                        let outcome = engine
                            .login(&username, &password, ip, &mut failed_logins)
                            .await;
                        match outcome {
                            Ok(AuthOutcome::Granted { session_id }) => {
                                let mut payload = session_id.clone().into_bytes();
                                payload.push(0);
                                proto::write_data(&mut stream, &payload).await?;
                                session = Some(Session {
                                    id: session_id,
                                    username,
                                });
                                tracing::info!("client {}: login completed", peer);
                            }
                            Ok(AuthOutcome::Rejected { third_strike: true }) => {
                                proto::write_error(&mut stream, ErrorCode::ThirdStrike).await?;
                                tracing::info!("client {}: third strike, closing", peer);
                                return Ok(());
                            }
                            Ok(AuthOutcome::Rejected { third_strike: false }) => {
                                proto::write_error(&mut stream, ErrorCode::BadCredentials).await?;
                            }
                            Ok(AuthOutcome::Blocked) => {
                                proto::write_error(&mut stream, ErrorCode::IpBlocked).await?;
                            }
                            Err(e) => report(&mut stream, &e, peer).await?,
                        }
                    }
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::Signup => {
                tracing::debug!("client {}: signup started", peer);
                match parse_credentials(&frame[1..]) {
                    Ok((username, password)) => {
                        match engine.signup(&username, &password).await {
                            Ok(()) => {
                                proto::write_data(&mut stream, b"OK\0").await?;
                                tracing::info!("client {}: signup completed", peer);
                            }
                            Err(e) => report(&mut stream, &e, peer).await?,
                        }
                    }
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::SubmitBet => {
                let Some(session) = session.as_ref() else {
                    proto::write_error(&mut stream, ErrorCode::NotLoggedIn).await?;
                    continue;
                };
                match parse_bet(&frame[ARGS_OFFSET..]) {
                    Ok(bet) => match engine.submit_bet(session, &bet).await {
                        Ok(()) => proto::write_data(&mut stream, b"OK\0").await?,
                        Err(e) => report(&mut stream, &e, peer).await?,
                    },
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::ListBets => {
                let Some(session) = session.as_ref() else {
                    proto::write_error(&mut stream, ErrorCode::NotLoggedIn).await?;
                    continue;
                };
                match parse_bet_kind(&frame[ARGS_OFFSET..]) {
                    Ok(kind) => match engine.list_bets(session, kind).await {
                        Ok(listings) if listings.is_empty() => {
                            proto::write_error(&mut stream, ErrorCode::Empty).await?;
                        }
                        Ok(listings) => {
                            let mut text = String::new();
                            for listing in &listings {
                                let _ = write!(text, "{}", codec::encode(&listing.entry.bet));
                                if let Some(record) = &listing.outcome {
                                    let _ = write!(text, "-> {}", encode_record(record));
                                }
                                text.push('\n');
                            }
                            text.push('\0');
                            proto::write_data(&mut stream, text.as_bytes()).await?;
                        }
                        Err(e) => report(&mut stream, &e, peer).await?,
                    },
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::ListDraws => {
                match parse_draw_query(&frame[ARGS_OFFSET..]) {
                    Ok((n, wheel)) => match engine.list_draws(n, wheel).await {
                        Ok(slices) => {
                            proto::write_data(&mut stream, &encode_draw_slices(&slices)).await?;
                        }
                        Err(e) => report(&mut stream, &e, peer).await?,
                    },
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::ListWinnings => {
                let Some(session) = session.as_ref() else {
                    proto::write_error(&mut stream, ErrorCode::NotLoggedIn).await?;
                    continue;
                };
                match engine.list_winnings(session).await {
                    Ok(text) if text.is_empty() => {
                        proto::write_error(&mut stream, ErrorCode::Empty).await?;
                    }
                    Ok(mut text) => {
                        text.push('\0');
                        proto::write_data(&mut stream, text.as_bytes()).await?;
                    }
                    Err(e) => report(&mut stream, &e, peer).await?,
                }
            }

            RequestCode::Quit => {
                tracing::info!("client {}: quit", peer);
                return Ok(());
            }
        }
    }

    tracing::info!("client {}: connection closed", peer);
    Ok(())
}

async fn report(stream: &mut TcpStream, err: &LottoError, peer: SocketAddr) -> Result<()> {
    let code = ErrorCode::from(err);
    if code == ErrorCode::Internal {
        tracing::error!("client {}: internal error: {}", peer, err);
    } else {
        tracing::debug!("client {}: rejected request: {}", peer, err);
    }
    proto::write_error(stream, code).await
}

fn client_ipv4(peer: &SocketAddr) -> Ipv4Addr {
    match peer.ip() {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => v6.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
    }
}

fn session_id_matches(frame: &[u8], session_id: &str) -> bool {
    frame.len() >= ARGS_OFFSET
        && &frame[1..1 + SESSION_ID_LEN] == session_id.as_bytes()
        && frame[1 + SESSION_ID_LEN] == 0
}

/// `"{username} {password}"`, optionally NUL-terminated.
fn parse_credentials(body: &[u8]) -> lotto_core::Result<(String, String)> {
    let text = std::str::from_utf8(body)
        .map_err(|_| LottoError::malformed_request("credentials are not valid UTF-8"))?;
    let text = text.trim_end_matches('\0');
    let (username, password) = text
        .split_once(' ')
        .ok_or_else(|| LottoError::malformed_request("expected 'username password'"))?;
    Ok((username.to_string(), password.to_string()))
}

fn parse_bet(body: &[u8]) -> lotto_core::Result<lotto_core::Bet> {
    let text = std::str::from_utf8(body)
        .map_err(|_| LottoError::malformed_request("bet is not valid UTF-8"))?;
    let (bet, _) = codec::decode(text.trim_end_matches('\0'))?;
    Ok(bet)
}

fn parse_bet_kind(body: &[u8]) -> lotto_core::Result<BetKind> {
    match body.first() {
        Some(0) => Ok(BetKind::Settled),
        Some(1) => Ok(BetKind::Pending),
        _ => Err(LottoError::malformed_request("unknown bet listing kind")),
    }
}

/// Big-endian `u32` count followed by a wheel code byte (0xFF = all wheels).
fn parse_draw_query(body: &[u8]) -> lotto_core::Result<(u32, Option<Wheel>)> {
    if body.len() < 5 {
        return Err(LottoError::malformed_request("draw query too short"));
    }
    let n = u32::from_be_bytes(body[0..4].try_into().unwrap());
    let wheel = match body[4] {
        WHEEL_UNSPECIFIED => None,
        code => Some(
            Wheel::from_code(code)
                .ok_or_else(|| LottoError::malformed_request("unknown wheel code"))?,
        ),
    };
    Ok((n, wheel))
}

/// Draw payload: per draw slice, an 8-byte BE timestamp, then each wheel as
/// its code byte plus five 4-byte BE numbers.
fn encode_draw_slices(slices: &[DrawSlice]) -> Vec<u8> {
    let mut out = Vec::new();
    for slice in slices {
        out.extend_from_slice(&slice.timestamp.to_be_bytes());
        for (wheel, numbers) in &slice.wheels {
            out.push(wheel.code());
            for &n in numbers {
                out.extend_from_slice(&n.to_be_bytes());
            }
        }
    }
    out
}
