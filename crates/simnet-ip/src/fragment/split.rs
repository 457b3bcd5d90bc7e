//! Splitting a datagram to fit an interface MTU.

use simnet_core::Datagram;
use simnet_core::constants::FRAGMENT_UNIT;

use crate::error::FragmentError;

/// Split `datagram` into pieces no larger than `mtu` bytes each.
///
/// A datagram that already fits is returned unchanged as the only element.
/// Every piece repeats the header and options, carries the original
/// identification and a byte offset relative to the original payload. All
/// pieces but the last set more-fragments; the last keeps the flag of the
/// input, so an already fragmented datagram can be split again.
///
/// The don't-fragment bit is not consulted here; the pipeline checks it
/// before calling.
pub fn fragment(mut datagram: Datagram, mtu: usize) -> Result<Vec<Datagram>, FragmentError> {
    if datagram.total_len() <= mtu {
        return Ok(vec![datagram]);
    }

    let header_len = datagram.header_len();
    let chunk = mtu.saturating_sub(header_len) / FRAGMENT_UNIT * FRAGMENT_UNIT;
    if chunk == 0 {
        return Err(FragmentError::MtuTooSmall { mtu, header_len });
    }

    let base_offset = usize::from(datagram.fragment_offset);
    let last_more = datagram.more_fragments;
    let payload = std::mem::take(&mut datagram.payload);
    let count = payload.len().div_ceil(chunk);

    let mut pieces = Vec::with_capacity(count);
    for (i, data) in payload.chunks(chunk).enumerate() {
        let start = base_offset + i * chunk;
        let offset =
            u16::try_from(start).map_err(|_| FragmentError::TooLarge { end: start + data.len() })?;
        let mut piece = datagram.clone();
        piece.fragment_offset = offset;
        piece.more_fragments = i + 1 < count || last_more;
        piece.payload = data.to_vec();
        pieces.push(piece);
    }

    tracing::trace!(
        id = datagram.identification,
        mtu,
        pieces = pieces.len(),
        "datagram fragmented"
    );
    Ok(pieces)
}
