use std::io::{self, Write};

use crate::error::SourceError;
use crate::rtp::Stream;

const WAVE_FORMAT_MULAW: u16 = 7;
const WAVE_FORMAT_ALAW: u16 = 6;

/// Write a single RTP [`Stream`]'s buffered payloads as a WAV file,
/// the alternate output format spec.md §6 permits for a Stream-scoped
/// save ("For 'RTP Stream' only, an alternate WAV writer is
/// permitted"). Only the two static G.711 payload types are supported;
/// anything else (a dynamic codec, or a stream captured without
/// `capture.rtp` enabled) is not representable without transcoding.
pub fn write_wav<W: Write>(writer: &mut W, stream: &Stream) -> Result<(), SourceError> {
    let format_tag = match stream.format_code {
        0 => WAVE_FORMAT_MULAW,
        8 => WAVE_FORMAT_ALAW,
        other => {
            return Err(SourceError::NotSupported(format!(
                "WAV export only supports PCMU/PCMA payloads, got payload type {other}"
            )))
        }
    };

    let samples: Vec<u8> = stream.payloads().iter().flatten().copied().collect();
    write_header(writer, format_tag, samples.len() as u32)?;
    writer.write_all(&samples).map_err(wrap_io)?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut W, format_tag: u16, data_len: u32) -> Result<(), SourceError> {
    const SAMPLE_RATE: u32 = 8000;
    const BITS_PER_SAMPLE: u16 = 8;
    let block_align = BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * block_align as u32;
    let riff_len = 36 + data_len;

    writer.write_all(b"RIFF").map_err(wrap_io)?;
    writer.write_all(&riff_len.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(b"WAVE").map_err(wrap_io)?;

    writer.write_all(b"fmt ").map_err(wrap_io)?;
    writer.write_all(&16u32.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&format_tag.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&1u16.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&SAMPLE_RATE.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&byte_rate.to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&(block_align as u16).to_le_bytes()).map_err(wrap_io)?;
    writer.write_all(&BITS_PER_SAMPLE.to_le_bytes()).map_err(wrap_io)?;

    writer.write_all(b"data").map_err(wrap_io)?;
    writer.write_all(&data_len.to_le_bytes()).map_err(wrap_io)?;
    Ok(())
}

fn wrap_io(e: io::Error) -> SourceError {
    SourceError::Io(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Transport};
    use crate::rtp::{StreamKey, StreamKind};
    use std::net::{IpAddr, Ipv4Addr};

    fn pcmu_stream() -> Stream {
        let key = StreamKey {
            src: Address::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 10000, Transport::Udp),
            dst: Address::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)), 20000, Transport::Udp),
            ssrc: 1,
        };
        let mut s = Stream::new(key, StreamKind::Rtp, 0, "PCMU".to_string(), 0);
        s.enable_payload_ring(8);
        s.observe_rtp(1, 160, 20_000, 8000, &[0xFFu8; 160]);
        s
    }

    #[test]
    fn writes_a_valid_riff_header_for_pcmu() {
        let stream = pcmu_stream();
        let mut buf = Vec::new();
        write_wav(&mut buf, &stream).unwrap();
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(&buf[8..12], b"WAVE");
        assert_eq!(buf.len(), 44 + 160);
    }

    #[test]
    fn rejects_a_dynamic_payload_type() {
        let key = StreamKey {
            src: Address::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 10000, Transport::Udp),
            dst: Address::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)), 20000, Transport::Udp),
            ssrc: 1,
        };
        let stream = Stream::new(key, StreamKind::Rtp, 101, "telephone-event".to_string(), 0);
        let mut buf = Vec::new();
        assert!(write_wav(&mut buf, &stream).is_err());
    }
}
