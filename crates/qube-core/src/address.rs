//! Bech32 address encoding for EVM-style accounts.
//!
//! Ethermint-style chains share the 20-byte account between the EVM side
//! (`0x` hex) and the Cosmos side (bech32 with the chain prefix).

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];
const CHECKSUM_LEN: usize = 6;
const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid hex address: {0}")]
    InvalidHex(String),
    #[error("Address must be {ADDRESS_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("Invalid prefix '{0}'")]
    InvalidPrefix(String),
    #[error("Invalid bech32 string: {0}")]
    InvalidBech32(String),
    #[error("Invalid bech32 checksum for {0}")]
    InvalidChecksum(String),
}

/// Operator address prefix for a chain prefix (`qubetics` -> `qubeticsvaloper`).
pub fn valoper_prefix(prefix: &str) -> String {
    format!("{prefix}valoper")
}

/// Encode a 20-byte EVM address (`0x` optional) as bech32 with `prefix`.
pub fn evm_to_bech32(evm_address: &str, prefix: &str) -> Result<String, AddressError> {
    let hex_part = evm_address
        .strip_prefix("0x")
        .or_else(|| evm_address.strip_prefix("0X"))
        .unwrap_or(evm_address);
    let bytes =
        hex::decode(hex_part).map_err(|_| AddressError::InvalidHex(evm_address.to_string()))?;
    if bytes.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    encode(prefix, &bytes)
}

/// Decode a bech32 account address back to `0x`-prefixed lowercase hex.
pub fn bech32_to_evm(address: &str) -> Result<String, AddressError> {
    let (_, bytes) = decode(address)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Encode arbitrary bytes as bech32.
pub fn encode(prefix: &str, data: &[u8]) -> Result<String, AddressError> {
    encode_groups(prefix, &convert_bits(data, 8, 5, true))
}

/// Decode a bech32 string into its prefix and payload bytes.
pub fn decode(address: &str) -> Result<(String, Vec<u8>), AddressError> {
    let (prefix, groups) = decode_groups(address)?;
    let bytes = regroup_to_bytes(&groups)
        .ok_or_else(|| AddressError::InvalidBech32(address.to_string()))?;
    Ok((prefix, bytes))
}

fn validate_prefix(prefix: &str) -> Result<(), AddressError> {
    let valid = !prefix.is_empty()
        && prefix.len() <= 83
        && prefix.bytes().all(|b| (33..=126).contains(&b))
        && !prefix.bytes().any(|b| b.is_ascii_uppercase());
    if valid {
        Ok(())
    } else {
        Err(AddressError::InvalidPrefix(prefix.to_string()))
    }
}

pub(crate) fn encode_groups(prefix: &str, groups: &[u8]) -> Result<String, AddressError> {
    validate_prefix(prefix)?;
    let checksum = create_checksum(prefix, groups);

    let mut out = String::with_capacity(prefix.len() + 1 + groups.len() + CHECKSUM_LEN);
    out.push_str(prefix);
    out.push('1');
    for &g in groups.iter().chain(checksum.iter()) {
        out.push(CHARSET[g as usize] as char);
    }
    Ok(out)
}

pub(crate) fn decode_groups(address: &str) -> Result<(String, Vec<u8>), AddressError> {
    let has_lower = address.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = address.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressError::InvalidBech32(address.to_string()));
    }
    let lowered = address.to_ascii_lowercase();

    let sep = lowered
        .rfind('1')
        .ok_or_else(|| AddressError::InvalidBech32(address.to_string()))?;
    let (prefix, rest) = (&lowered[..sep], &lowered[sep + 1..]);
    if rest.len() < CHECKSUM_LEN {
        return Err(AddressError::InvalidBech32(address.to_string()));
    }
    validate_prefix(prefix)?;

    let mut values = Vec::with_capacity(rest.len());
    for c in rest.bytes() {
        let pos = CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| AddressError::InvalidBech32(address.to_string()))?;
        values.push(pos as u8);
    }

    let mut check_input = expand_prefix(prefix);
    check_input.extend_from_slice(&values);
    if polymod(&check_input) != 1 {
        return Err(AddressError::InvalidChecksum(address.to_string()));
    }

    values.truncate(values.len() - CHECKSUM_LEN);
    Ok((prefix.to_string(), values))
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &v in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(v);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() * 2 + 1);
    out.extend(prefix.bytes().map(|b| b >> 5));
    out.push(0);
    out.extend(prefix.bytes().map(|b| b & 0x1f));
    out
}

fn create_checksum(prefix: &str, groups: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = expand_prefix(prefix);
    values.extend_from_slice(groups);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let pm = polymod(&values) ^ 1;

    let mut checksum = [0u8; CHECKSUM_LEN];
    for (i, slot) in checksum.iter_mut().enumerate() {
        *slot = ((pm >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f) as u8;
    }
    checksum
}

/// Regroup bits, padding the final group with zero bits when `pad` is set.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }
    if pad && bits > 0 {
        out.push(((acc << (to - bits)) & max) as u8);
    }
    out
}

/// 5-bit groups back to bytes; rejects non-zero or oversized padding.
fn regroup_to_bytes(groups: &[u8]) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(groups.len() * 5 / 8);
    for &g in groups {
        acc = (acc << 5) | u32::from(g);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    if bits >= 5 || (acc << (8 - bits)) & 0xff != 0 {
        return None;
    }
    Some(out)
}
