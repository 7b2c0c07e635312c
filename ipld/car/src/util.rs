// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::{self, Read, Write};

use cid::Cid;

use super::error::Error;

pub(crate) fn ld_read<R>(mut reader: &mut R) -> Result<Option<Vec<u8>>, Error>
where
    R: Read,
{
    const MAX_ALLOC: usize = 1 << 20;
    let l = match unsigned_varint::io::read_u64(&mut reader) {
        Ok(len) => len,
        Err(unsigned_varint::io::ReadError::Io(e))
            if e.kind() == io::ErrorKind::UnexpectedEof =>
        {
            return Ok(None);
        }
        Err(e) => return Err(Error::Malformed(e.to_string())),
    };

    let mut buf = Vec::with_capacity(std::cmp::min(l as usize, MAX_ALLOC));
    let bytes_read = reader.take(l).read_to_end(&mut buf)?;
    if bytes_read as u64 != l {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected to read at least {} bytes, but read {}", l, bytes_read),
        )));
    }
    Ok(Some(buf))
}

pub(crate) fn ld_write<W>(writer: &mut W, bytes: &[u8]) -> Result<u64, Error>
where
    W: Write,
{
    let mut varint_buf = unsigned_varint::encode::u64_buffer();
    let len = unsigned_varint::encode::u64(bytes.len() as u64, &mut varint_buf);
    writer.write_all(len)?;
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok((len.len() + bytes.len()) as u64)
}

pub(crate) fn read_node<R>(reader: &mut R) -> Result<Option<(Cid, Vec<u8>)>, Error>
where
    R: Read,
{
    match ld_read(reader)? {
        Some(buf) => {
            let mut cursor = std::io::Cursor::new(&buf);
            let cid = Cid::read_bytes(&mut cursor)?;
            Ok(Some((cid, buf[cursor.position() as usize..].to_vec())))
        }
        None => Ok(None),
    }
}

/// Encoded size of a varint, for offset bookkeeping.
pub(crate) fn varint_len(value: u64) -> u64 {
    let mut buf = unsigned_varint::encode::u64_buffer();
    unsigned_varint::encode::u64(value, &mut buf).len() as u64
}
