//! Contract ABI descriptors and the standard call encoding.
//!
//! Descriptors are `'static` so whole contract tables can live in statics.
//! Arguments are encoded head/tail: static values sit inline in the head,
//! dynamic values (`string`, arrays, tuples containing them) are referenced by
//! an offset and appended to the tail.

use std::fmt;

use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::{ChainError, Result};

/// Size of one ABI word.
const WORD: usize = 32;

/// Whether a function mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    /// Read-only.
    View,
    /// Writes state, rejects value.
    NonPayable,
    /// Writes state, accepts value.
    Payable,
}

impl Mutability {
    /// Returns `true` for functions that need a signed transaction.
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::View)
    }
}

/// Parameter types used by the Learn2Earn contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    /// 20-byte account address.
    Address,
    /// Unsigned 256-bit integer. Values are limited to `u128`.
    Uint256,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Fixed 32-byte value.
    Bytes32,
    /// Dynamic array `T[]`.
    Array(&'static AbiType),
    /// Tuple of named components.
    Tuple(&'static [AbiParam]),
}

impl AbiType {
    /// Returns `true` if values of this type are encoded in the tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::String | Self::Array(_) => true,
            Self::Tuple(params) => params.iter().any(|p| p.kind.is_dynamic()),
            Self::Address | Self::Uint256 | Self::Bool | Self::Bytes32 => false,
        }
    }

    /// Bytes this type occupies in the head.
    fn head_size(&self) -> usize {
        match self {
            Self::Tuple(params) if !self.is_dynamic() => {
                params.iter().map(|p| p.kind.head_size()).sum()
            }
            _ => WORD,
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Uint256 => f.write_str("uint256"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Bytes32 => f.write_str("bytes32"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Tuple(params) => {
                f.write_str("(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", param.kind)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiParam {
    /// Parameter name, empty for unnamed outputs.
    pub name: &'static str,
    /// Parameter type.
    pub kind: AbiType,
}

impl AbiParam {
    /// Creates a parameter descriptor.
    #[must_use]
    pub const fn new(name: &'static str, kind: AbiType) -> Self {
        Self { name, kind }
    }
}

/// A decoded or to-be-encoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AbiValue {
    /// Lower-case `0x` address.
    Address(String),
    /// Unsigned integer.
    Uint(u128),
    /// Boolean.
    Bool(bool),
    /// String.
    String(String),
    /// 32 raw bytes.
    Bytes32([u8; 32]),
    /// Array items.
    Array(Vec<AbiValue>),
    /// Tuple components in order.
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Creates an address value, validating and lower-casing it.
    pub fn address(text: &str) -> Result<Self> {
        parse_address(text).map(|bytes| Self::Address(format_address(&bytes)))
    }

    /// Creates a string value.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Uint(_) => "uint256",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Bytes32(_) => "bytes32",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }
}

/// A contract function descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiFunction {
    /// Function name.
    pub name: &'static str,
    /// Input parameters.
    pub inputs: &'static [AbiParam],
    /// Output parameters.
    pub outputs: &'static [AbiParam],
    /// State mutability.
    pub mutability: Mutability,
}

impl AbiFunction {
    /// Canonical signature such as `completeCourse(string)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the Keccak-256 hash of the signature.
    #[must_use]
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Encodes a call: selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[AbiValue]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            return Err(ChainError::Encode(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.inputs.len(),
                args.len()
            )));
        }
        let kinds: Vec<AbiType> = self.inputs.iter().map(|p| p.kind).collect();
        let mut data = self.selector().to_vec();
        data.extend(encode_params(&kinds, args)?);
        Ok(data)
    }

    /// Decodes returned data into the function's outputs.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>> {
        let kinds: Vec<AbiType> = self.outputs.iter().map(|p| p.kind).collect();
        decode_params(&kinds, data)
    }
}

/// Keccak-256 digest.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Parses a `0x`-prefixed 20-byte hex address.
pub fn parse_address(text: &str) -> Result<[u8; 20]> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| ChainError::InvalidAddress(text.to_string()))?;
    let bytes = hex::decode(digits).map_err(|_| ChainError::InvalidAddress(text.to_string()))?;
    <[u8; 20]>::try_from(bytes.as_slice()).map_err(|_| ChainError::InvalidAddress(text.to_string()))
}

/// Formats address bytes as lower-case `0x` hex.
#[must_use]
pub fn format_address(bytes: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ============================================================================
// Encoding
// ============================================================================

fn encode_params(kinds: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    let head_len: usize = kinds.iter().map(AbiType::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (kind, value) in kinds.iter().zip(values) {
        let encoded = encode_value(kind, value)?;
        if kind.is_dynamic() {
            head.extend(usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(kind: &AbiType, value: &AbiValue) -> Result<Vec<u8>> {
    match (kind, value) {
        (AbiType::Address, AbiValue::Address(text)) => {
            let mut word = vec![0u8; 12];
            word.extend(parse_address(text)?);
            Ok(word)
        }
        (AbiType::Uint256, AbiValue::Uint(n)) => Ok(uint_word(*n)),
        (AbiType::Bool, AbiValue::Bool(b)) => Ok(uint_word(u128::from(*b))),
        (AbiType::Bytes32, AbiValue::Bytes32(bytes)) => Ok(bytes.to_vec()),
        (AbiType::String, AbiValue::String(text)) => {
            let bytes = text.as_bytes();
            let mut out = usize_word(bytes.len());
            out.extend(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            Ok(out)
        }
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let kinds = vec![**inner; items.len()];
            let mut out = usize_word(items.len());
            out.extend(encode_params(&kinds, items)?);
            Ok(out)
        }
        (AbiType::Tuple(params), AbiValue::Tuple(items)) => {
            if params.len() != items.len() {
                return Err(ChainError::Encode(format!(
                    "tuple {kind} expects {} components, got {}",
                    params.len(),
                    items.len()
                )));
            }
            let kinds: Vec<AbiType> = params.iter().map(|p| p.kind).collect();
            encode_params(&kinds, items)
        }
        (kind, value) => Err(ChainError::Encode(format!(
            "expected {kind}, got {}",
            value.kind_name()
        ))),
    }
}

const fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn uint_word(n: u128) -> Vec<u8> {
    let mut word = vec![0u8; 16];
    word.extend(n.to_be_bytes());
    word
}

fn usize_word(n: usize) -> Vec<u8> {
    uint_word(n as u128)
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_params(kinds: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>> {
    let mut values = Vec::with_capacity(kinds.len());
    let mut head = 0;

    for kind in kinds {
        if kind.is_dynamic() {
            let offset = read_usize(data, head)?;
            let tail = data
                .get(offset..)
                .ok_or_else(|| ChainError::Decode(format!("offset {offset} past end of data")))?;
            values.push(decode_value(kind, tail)?);
        } else {
            let slot = data
                .get(head..)
                .ok_or_else(|| ChainError::Decode(format!("{kind} past end of data")))?;
            values.push(decode_value(kind, slot)?);
        }
        head += kind.head_size();
    }

    Ok(values)
}

fn decode_value(kind: &AbiType, data: &[u8]) -> Result<AbiValue> {
    match kind {
        AbiType::Address => {
            let word = read_word(data, 0)?;
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(AbiValue::Address(format_address(&bytes)))
        }
        AbiType::Uint256 => read_uint(data, 0).map(AbiValue::Uint),
        AbiType::Bool => match read_uint(data, 0)? {
            0 => Ok(AbiValue::Bool(false)),
            1 => Ok(AbiValue::Bool(true)),
            other => Err(ChainError::Decode(format!("invalid bool word {other}"))),
        },
        AbiType::Bytes32 => read_word(data, 0).map(AbiValue::Bytes32),
        AbiType::String => {
            let len = read_usize(data, 0)?;
            let bytes = WORD
                .checked_add(len)
                .and_then(|end| data.get(WORD..end))
                .ok_or_else(|| ChainError::Decode(format!("string of {len} bytes past end of data")))?;
            String::from_utf8(bytes.to_vec())
                .map(AbiValue::String)
                .map_err(|_| ChainError::Decode("string is not valid UTF-8".to_string()))
        }
        AbiType::Array(inner) => {
            let len = read_usize(data, 0)?;
            let items = data.get(WORD..).unwrap_or_default();
            if len > items.len() / inner.head_size().max(1) {
                return Err(ChainError::Decode(format!("array of {len} items past end of data")));
            }
            let kinds = vec![**inner; len];
            decode_params(&kinds, items).map(AbiValue::Array)
        }
        AbiType::Tuple(params) => {
            let kinds: Vec<AbiType> = params.iter().map(|p| p.kind).collect();
            decode_params(&kinds, data).map(AbiValue::Tuple)
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; 32]> {
    data.get(at..at + WORD)
        .and_then(|slice| <[u8; 32]>::try_from(slice).ok())
        .ok_or_else(|| ChainError::Decode(format!("expected a word at byte {at}")))
}

fn read_uint(data: &[u8], at: usize) -> Result<u128> {
    let word = read_word(data, at)?;
    let (high, low) = word.split_at(16);
    if high.iter().any(|b| *b != 0) {
        return Err(ChainError::Decode("integer exceeds 128 bits".to_string()));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(low);
    Ok(u128::from_be_bytes(bytes))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let n = read_uint(data, at)?;
    usize::try_from(n).map_err(|_| ChainError::Decode(format!("length {n} does not fit in memory")))
}
