//! Sans-io Modbus TCP frame codec for holding-register reads.
//!
//! Wraps `rmodbus`'s client request machinery in three pure functions so the
//! transport layer only ever moves byte slices:
//!
//! 1. [`build_read_holdings`] — produce the request frame to write.
//! 2. [`response_frame_len`] — size the response from its 6-byte MBAP prefix.
//! 3. [`parse_read_holdings`] — validate the response against the request and
//!    extract the register values.
//!
//! # Why size from a prefix?
//!
//! TCP is a stream protocol: a single `read()` may return less than one
//! complete Modbus frame.  The MBAP header's length field (bytes 4..6) tells
//! the caller exactly how many more bytes to wait for, so the transport can
//! `read_exact` the prefix, then `read_exact` the remainder.
//!
//! # Register width
//!
//! One register is one big-endian 16-bit word.  All sub-word decoding happens
//! here; callers never see raw data bytes.

use rmodbus::{client::ModbusRequest, guess_response_frame_len, ModbusProto};
use thiserror::Error;

/// Number of bytes of a Modbus TCP response needed to determine the total
/// frame length (the MBAP transaction id, protocol id, and length fields).
pub const MBAP_PREFIX_LEN: usize = 6;

/// Offset of the register data bytes within a read-holdings response frame
/// (MBAP header 7 bytes, then function code and byte count).
const DATA_OFFSET: usize = 9;

/// Errors building or parsing Modbus frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// `rmodbus` rejected the request parameters or the response frame
    /// (including Modbus exception responses from the device).
    #[error("{0}")]
    Modbus(#[from] rmodbus::ErrorKind),

    /// The response frame is too small to contain a read-holdings reply.
    #[error("short response frame: {got} bytes, need at least {need}")]
    Short { need: usize, got: usize },

    /// The advertised data byte count runs past the end of the frame.
    #[error("response advertises {advertised} data bytes but only {available} are present")]
    Truncated { advertised: usize, available: usize },
}

/// Builds a Read Holding Registers (0x03) request frame for `quantity`
/// registers starting at `start_address`, addressed to `unit_id`.
///
/// Returns the `ModbusRequest` state alongside the frame bytes; the same
/// state must be passed to [`parse_read_holdings`] so the response can be
/// validated against the request (transaction id, function, count).
///
/// # Errors
///
/// Returns [`CodecError::Modbus`] if the parameters are out of range for the
/// protocol (e.g., quantity above the Modbus per-request limit).
pub fn build_read_holdings(
    unit_id: u8,
    start_address: u16,
    quantity: u16,
) -> Result<(ModbusRequest, Vec<u8>), CodecError> {
    let mut request = ModbusRequest::new(unit_id, ModbusProto::TcpUdp);
    let mut frame = Vec::new();
    request.generate_get_holdings(start_address, quantity, &mut frame)?;
    Ok((request, frame))
}

/// Returns the total response frame length implied by its 6-byte MBAP prefix.
///
/// # Errors
///
/// Returns [`CodecError::Modbus`] if the prefix is not a valid MBAP header.
pub fn response_frame_len(prefix: &[u8; MBAP_PREFIX_LEN]) -> Result<usize, CodecError> {
    Ok(guess_response_frame_len(prefix, ModbusProto::TcpUdp)? as usize)
}

/// Validates a complete response frame against `request` and extracts the
/// register values as big-endian 16-bit words in ascending address order.
///
/// # Errors
///
/// Returns an error if the frame is shorter than a minimal reply, the data
/// byte count overruns the frame, or `rmodbus` rejects the frame (wrong
/// transaction id, wrong function, or a device exception response).
pub fn parse_read_holdings(
    request: &mut ModbusRequest,
    response: &[u8],
) -> Result<Vec<u16>, CodecError> {
    if response.len() < DATA_OFFSET {
        return Err(CodecError::Short {
            need: DATA_OFFSET,
            got: response.len(),
        });
    }

    // Checks transaction id, unit, function code, and exception status.
    request.parse_ok(response)?;

    let advertised = response[DATA_OFFSET - 1] as usize;
    let data = &response[DATA_OFFSET..];
    if advertised > data.len() {
        return Err(CodecError::Truncated {
            advertised,
            available: data.len(),
        });
    }

    let values = data[..advertised]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Ok(values)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a well-formed response frame for `request`, echoing the
    /// transaction id from the generated request frame.
    fn craft_response(request_frame: &[u8], unit_id: u8, values: &[u16]) -> Vec<u8> {
        let mut frame = Vec::new();
        // MBAP: transaction id echoed from the request, protocol id 0,
        // length = unit + function + byte count + data.
        frame.extend_from_slice(&request_frame[0..2]);
        frame.extend_from_slice(&[0, 0]);
        let pdu_len = (3 + 2 * values.len()) as u16;
        frame.extend_from_slice(&pdu_len.to_be_bytes());
        frame.push(unit_id);
        frame.push(0x03);
        frame.push((2 * values.len()) as u8);
        for v in values {
            frame.extend_from_slice(&v.to_be_bytes());
        }
        frame
    }

    #[test]
    fn test_request_frame_layout() {
        let (_, frame) = build_read_holdings(1, 4000, 2).unwrap();

        // MBAP header + function + address + quantity = 12 bytes.
        assert_eq!(frame.len(), 12);
        // Protocol id must be zero for Modbus TCP.
        assert_eq!(&frame[2..4], &[0, 0]);
        // Length field counts unit + PDU = 6 bytes.
        assert_eq!(&frame[4..6], &[0, 6]);
        // Unit, function, then big-endian address and quantity.
        assert_eq!(frame[6], 1);
        assert_eq!(frame[7], 0x03);
        assert_eq!(&frame[8..10], &4000u16.to_be_bytes());
        assert_eq!(&frame[10..12], &2u16.to_be_bytes());
    }

    #[test]
    fn test_response_frame_len_from_prefix() {
        // Length field of 7 → 6 prefix bytes + 7 remaining = 13 total.
        let prefix = [0x00, 0x01, 0x00, 0x00, 0x00, 0x07];
        assert_eq!(response_frame_len(&prefix).unwrap(), 13);
    }

    #[test]
    fn test_parse_extracts_values_in_order() {
        let (mut request, frame) = build_read_holdings(1, 100, 3).unwrap();
        let response = craft_response(&frame, 1, &[10, 20, 30]);

        let values = parse_read_holdings(&mut request, &response).unwrap();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_parse_big_endian_word() {
        // 0x04D2 = 1234: the device sends high byte first.
        let (mut request, frame) = build_read_holdings(1, 4000, 1).unwrap();
        let response = craft_response(&frame, 1, &[1234]);

        let values = parse_read_holdings(&mut request, &response).unwrap();
        assert_eq!(values, vec![1234]);
    }

    #[test]
    fn test_parse_rejects_short_frame() {
        let (mut request, _) = build_read_holdings(1, 0, 1).unwrap();
        let result = parse_read_holdings(&mut request, &[0x00, 0x01, 0x00]);
        assert!(matches!(result, Err(CodecError::Short { .. })));
    }

    #[test]
    fn test_parse_rejects_exception_response() {
        let (mut request, frame) = build_read_holdings(1, 0, 1).unwrap();

        // Exception reply: function | 0x80 with a one-byte exception code
        // (0x02 = illegal data address).
        let mut response = Vec::new();
        response.extend_from_slice(&frame[0..2]);
        response.extend_from_slice(&[0, 0, 0, 3]);
        response.push(1);
        response.push(0x83);
        response.push(0x02);

        assert!(parse_read_holdings(&mut request, &response).is_err());
    }

    #[test]
    fn test_parse_rejects_overrunning_byte_count() {
        let (mut request, frame) = build_read_holdings(1, 0, 2).unwrap();
        let mut response = craft_response(&frame, 1, &[1, 2]);
        // Claim more data bytes than the frame carries.
        response[8] = 10;

        assert!(parse_read_holdings(&mut request, &response).is_err());
    }
}
