// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS wire protocol codec
//!
//! Words are length-prefixed byte strings; a zero-length word terminates a
//! sentence; a block is a sequence of sentences ending with a terminal
//! status sentence. All I/O is generic over the stream type so plain TCP,
//! TLS, and in-memory pipes share one code path.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::parse::sentence_status;
use crate::error::{ApiError, Result};

/// Largest word the protocol can frame: the 4-byte length prefix tops out
/// at 2^28 - 1.
pub const MAX_WORD_LEN: usize = 0x0FFF_FFFF;

/// Encodes a word length into its 1-4 byte wire prefix.
///
/// Callers must keep `len` within [`MAX_WORD_LEN`]; [`write_word`] enforces
/// the bound before encoding.
// RouterOS protocol length encoding - intentional truncation is part of the wire format
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn encode_length(len: usize) -> Vec<u8> {
    debug_assert!(len <= MAX_WORD_LEN);
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        vec![((len >> 8) as u8) | 0x80, (len & 0xFF) as u8]
    } else if len < 0x0020_0000 {
        vec![
            ((len >> 16) as u8) | 0xC0,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else {
        vec![
            ((len >> 24) as u8) | 0xE0,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    }
}

/// Decodes a word length prefix from the stream.
///
/// Reads exactly as many bytes as the first byte's tag bits announce. A
/// first byte with its top four bits set would announce a length the
/// protocol cannot carry and fails with [`ApiError::Protocol`].
pub async fn read_length<S>(stream: &mut S) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    let first = stream.read_u8().await?;
    let len = if first & 0x80 == 0 {
        first as usize
    } else if first & 0xC0 == 0x80 {
        let second = stream.read_u8().await?;
        (((first & 0x3F) as usize) << 8) + second as usize
    } else if first & 0xE0 == 0xC0 {
        let second = stream.read_u8().await?;
        let third = stream.read_u8().await?;
        (((first & 0x1F) as usize) << 16) + ((second as usize) << 8) + third as usize
    } else if first & 0xF0 == 0xE0 {
        let second = stream.read_u8().await?;
        let third = stream.read_u8().await?;
        let fourth = stream.read_u8().await?;
        (((first & 0x0F) as usize) << 24)
            + ((second as usize) << 16)
            + ((third as usize) << 8)
            + fourth as usize
    } else {
        return Err(ApiError::Protocol(format!(
            "illegal length prefix byte 0x{first:02X}"
        )));
    };
    Ok(len)
}

/// Writes a single length-prefixed word.
pub async fn write_word<S>(stream: &mut S, word: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let bytes = word.as_bytes();
    if bytes.len() > MAX_WORD_LEN {
        return Err(ApiError::Protocol(format!(
            "word of {} bytes exceeds the protocol maximum",
            bytes.len()
        )));
    }
    stream.write_all(&encode_length(bytes.len())).await?;
    stream.write_all(bytes).await?;
    Ok(())
}

/// Writes a sentence: each word in order, then the zero-length terminator.
pub async fn write_sentence<S, W>(stream: &mut S, words: &[W]) -> Result<()>
where
    S: AsyncWrite + Unpin,
    W: AsRef<str>,
{
    for word in words {
        write_word(stream, word.as_ref()).await?;
    }
    // zero length word terminator
    stream.write_all(&[0]).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one word; `None` marks the end of the sentence.
pub async fn read_word<S>(stream: &mut S) -> Result<Option<String>>
where
    S: AsyncRead + Unpin,
{
    let len = read_length(stream).await?;
    if len == 0 {
        return Ok(None);
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    let word: String = String::from_utf8_lossy(&buf).into();
    tracing::trace!("Received word: {}", word);
    Ok(Some(word))
}

/// Reads a full sentence, which may be empty.
pub async fn read_sentence<S>(stream: &mut S) -> Result<Vec<String>>
where
    S: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    while let Some(word) = read_word(stream).await? {
        words.push(word);
    }
    Ok(words)
}

/// Reads sentences up to and including the first terminal one.
///
/// `!re` sentences are data and never terminate a block; `!done`, `!trap`,
/// and `!fatal` do. Nothing is read past the terminal sentence.
pub async fn read_block<S>(stream: &mut S) -> Result<Vec<Vec<String>>>
where
    S: AsyncRead + Unpin,
{
    let mut block = Vec::new();
    loop {
        let sentence = read_sentence(stream).await?;
        if sentence.is_empty() {
            continue;
        }
        let terminal = sentence_status(&sentence).is_some_and(|s| s.is_terminal());
        block.push(sentence);
        if terminal {
            tracing::trace!("Reply complete, {} sentences received", block.len());
            return Ok(block);
        }
    }
}
