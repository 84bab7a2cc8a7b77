//! The wire format: `tag: i32, count: i32, payload: [u8; count]` per
//! message, native byte order — safe since only instances of the same
//! binary ever talk to each other over these channels.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Matches any non-negative user tag on the receive side.
pub const ANY_TAG: i32 = 0;

/// Reserved, negative tags. User code must never pass these to `send`/`recv`.
pub const BARRIER_TAG: i32 = -2;
pub const BCAST_TAG: i32 = -3;
pub const REDUCE_TAG: i32 = -4;
pub const DEADLOCK_PROBE_TAG: i32 = -5;

pub fn is_reserved(tag: i32) -> bool {
    tag < 0
}

/// Header of every frame: `(tag, count)`. The payload follows separately
/// since callers usually want to read straight into a caller-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub tag: i32,
    pub count: i32,
}

impl FrameHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<NativeEndian>(self.tag)?;
        w.write_i32::<NativeEndian>(self.count)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<FrameHeader> {
        let tag = r.read_i32::<NativeEndian>()?;
        let count = r.read_i32::<NativeEndian>()?;
        Ok(FrameHeader { tag, count })
    }
}

/// A deadlock probe: "I am waiting on you for `(tag, count)`", sent with
/// the outer frame's tag set to `DEADLOCK_PROBE_TAG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRecord {
    pub from: i32,
    pub tag: i32,
    pub count: i32,
}

impl ProbeRecord {
    pub const WIRE_LEN: usize = 12;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<NativeEndian>(self.from)?;
        w.write_i32::<NativeEndian>(self.tag)?;
        w.write_i32::<NativeEndian>(self.count)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<ProbeRecord> {
        let from = r.read_i32::<NativeEndian>()?;
        let tag = r.read_i32::<NativeEndian>()?;
        let count = r.read_i32::<NativeEndian>()?;
        Ok(ProbeRecord { from, tag, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let h = FrameHeader { tag: 7, count: 1234 };
        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 8);
        let h2 = FrameHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(h, h2);
    }

    #[test]
    fn probe_round_trips() {
        let p = ProbeRecord { from: 3, tag: 9, count: 2 };
        let mut buf = Vec::new();
        p.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), ProbeRecord::WIRE_LEN);
        let p2 = ProbeRecord::read_from(&mut &buf[..]).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn reserved_tags_are_negative() {
        assert!(is_reserved(BARRIER_TAG));
        assert!(is_reserved(BCAST_TAG));
        assert!(is_reserved(REDUCE_TAG));
        assert!(is_reserved(DEADLOCK_PROBE_TAG));
        assert!(!is_reserved(ANY_TAG));
        assert!(!is_reserved(42));
    }
}
