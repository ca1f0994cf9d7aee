//! Register value formatting.

/// Formats a run of register values read from `start_address` as
/// `"<address>:<value>"` pairs joined by `", "`, the i-th pair's address
/// being `start_address + i`.
///
/// The address arithmetic wraps at the u16 boundary, matching the device's
/// 16-bit address space.  Empty input yields an empty string.
///
/// The register client contract guarantees `values` holds exactly the number
/// of registers requested, so this function has no failure mode.
///
/// # Example
///
/// ```rust
/// use modweb_bridge::application::format_registers;
///
/// assert_eq!(format_registers(100, &[10, 20, 30]), "100:10, 101:20, 102:30");
/// ```
pub fn format_registers(start_address: u16, values: &[u16]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| format!("{}:{}", start_address.wrapping_add(i as u16), value))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_register() {
        assert_eq!(format_registers(4000, &[1234]), "4000:1234");
    }

    #[test]
    fn test_multiple_registers_ascending_addresses() {
        assert_eq!(format_registers(100, &[10, 20, 30]), "100:10, 101:20, 102:30");
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(format_registers(0, &[]), "");
    }

    #[test]
    fn test_start_address_zero() {
        assert_eq!(format_registers(0, &[7, 8]), "0:7, 1:8");
    }

    #[test]
    fn test_address_wraps_at_u16_boundary() {
        assert_eq!(format_registers(65535, &[1, 2]), "65535:1, 0:2");
    }

    #[test]
    fn test_max_register_value() {
        assert_eq!(format_registers(10, &[65535]), "10:65535");
    }
}
