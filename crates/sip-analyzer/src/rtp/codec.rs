//! Static RTP payload-type table (RFC 3551 §6) and dynamic-PT helpers.

/// Payload types 96-127 are dynamically assigned per session; codec names
/// for those come only from an `a=rtpmap` attribute.
pub const DYNAMIC_PT_RANGE: std::ops::RangeInclusive<u8> = 96..=127;

/// Name for a statically assigned payload type, or `None` for dynamic
/// (96-127) or reserved/unassigned numbers.
pub fn static_codec_name(pt: u8) -> Option<&'static str> {
    Some(match pt {
        0 => "PCMU",
        3 => "GSM",
        4 => "G723",
        5 => "DVI4",
        6 => "DVI4",
        7 => "LPC",
        8 => "PCMA",
        9 => "G722",
        10 => "L16",
        11 => "L16",
        12 => "QCELP",
        13 => "CN",
        14 => "MPA",
        15 => "G728",
        16 => "DVI4",
        17 => "DVI4",
        18 => "G729",
        25 => "CelB",
        26 => "JPEG",
        28 => "nv",
        31 => "H261",
        32 => "MPV",
        33 => "MP2T",
        34 => "H263",
        101 => "telephone-event",
        _ => return None,
    })
}

pub fn is_dynamic(pt: u8) -> bool {
    DYNAMIC_PT_RANGE.contains(&pt)
}
