use multisig_governance_sdk::types::Percent;

/// Hex-encoded bytes, with or without a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl std::str::FromStr for HexBytes {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Format: 0xdeadbeef
        hex::decode(s.trim_start_matches("0x"))
            .map(HexBytes)
            .map_err(|e| format!("Invalid hex: {}", e))
    }
}

pub fn parse_percent(s: &str) -> Result<Percent, String> {
    let value: u8 = s
        .trim_end_matches('%')
        .parse()
        .map_err(|_| "Invalid percentage")?;
    Percent::new(value).map_err(|e| e.to_string())
}
