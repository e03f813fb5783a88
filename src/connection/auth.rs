// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication
//!
//! Post-6.43 plain-text login first; a `!trap` falls back to the pre-6.43
//! MD5 challenge/response. The exchange is generic over the stream so the
//! whole state machine can be driven against an in-memory pipe.

use md5::compute as md5_compute;
use tokio::io::{AsyncRead, AsyncWrite};

use super::parse::{parse_block, sentence_status, ReplyStatus};
use super::protocol::{read_block, write_sentence};
use crate::error::{ApiError, Result};

async fn exchange<S, W>(stream: &mut S, words: &[W]) -> Result<Vec<Vec<String>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsRef<str>,
{
    write_sentence(stream, words).await?;
    read_block(stream).await
}

/// Runs the login state machine to completion.
pub(crate) async fn login<S>(stream: &mut S, username: &str, password: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::trace!("Attempting login for user: {}", username);
    // Try new login method first (RouterOS 6.43+)
    let block = exchange(
        stream,
        &[
            "/login".to_string(),
            format!("=name={username}"),
            format!("=password={password}"),
        ],
    )
    .await?;

    match parse_block(&block) {
        Ok(_) => {
            tracing::debug!("Login successful (new method)");
            Ok(())
        }
        Err(ApiError::Trap { message, .. }) => {
            tracing::debug!("New login method rejected ({}), trying legacy method", message);
            login_md5(stream, username, password).await
        }
        Err(ApiError::Fatal { message }) => Err(ApiError::ConnectionFailed(message)),
        Err(e) => Err(e),
    }
}

/// Legacy challenge-response method (pre-6.43).
async fn login_md5<S>(stream: &mut S, username: &str, password: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::trace!("Requesting challenge for legacy login");
    let block = exchange(stream, &["/login"]).await?;
    let challenge_hex = login_challenge(&block)?;

    let Some(challenge_hex) = challenge_hex.filter(|ret| !ret.is_empty()) else {
        // No challenge means the server already considers us authenticated.
        tracing::debug!("Login challenge absent, session already authenticated");
        return Ok(());
    };
    tracing::trace!("Challenge received, length: {}", challenge_hex.len());

    let response = challenge_response(password, &challenge_hex)?;
    let block = exchange(
        stream,
        &[
            "/login".to_string(),
            format!("=name={username}"),
            format!("=response={response}"),
        ],
    )
    .await?;

    match parse_block(&block) {
        Ok(_) => {
            tracing::debug!("Login successful (legacy method)");
            Ok(())
        }
        Err(ApiError::Trap { message, .. }) => Err(ApiError::AuthFailed(message)),
        Err(ApiError::Fatal { message }) => Err(ApiError::ConnectionFailed(message)),
        Err(e) => Err(e),
    }
}

/// Extracts the login salt from a `/login` reply block.
///
/// The salt is the first `=ret=` word of the `!done` sentence. `None`
/// means the server sent `!done` without a challenge.
fn login_challenge(block: &[Vec<String>]) -> Result<Option<String>> {
    let done = block
        .iter()
        .find(|sentence| sentence_status(sentence) == Some(ReplyStatus::Done))
        .ok_or_else(|| ApiError::Protocol("login reply lacks a !done sentence".to_string()))?;

    Ok(done
        .iter()
        .find_map(|word| word.strip_prefix("=ret="))
        .map(ToString::to_string))
}

/// Builds the legacy `=response=` word: `"00"` followed by the lowercase
/// hex of `MD5(0x00 ∥ password ∥ salt)`.
fn challenge_response(password: &str, challenge_hex: &str) -> Result<String> {
    let challenge = hex::decode(challenge_hex)
        .map_err(|e| ApiError::Protocol(format!("malformed login salt: {e}")))?;

    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(0u8);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&challenge);
    let digest = md5_compute(&data);

    let mut response = String::from("00");
    response.push_str(&hex::encode(digest.0));
    Ok(response)
}
