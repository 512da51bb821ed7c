//! Parameter layout inference for calldata whose selector resolves to
//! nothing.
//!
//! Each head word is classified as a tail pointer (dynamic `bytes` or word
//! array), an address, or a `uint256`. A guess is only returned when
//! decoding with it re-encodes to the exact input bytes.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::json_abi::Function;
use tracing::debug;

use crate::domain::GUESSED_FUNCTION_NAME;

const WORD: usize = 32;

enum Slot {
    Static(DynSolType),
    Dynamic(usize),
}

/// Guess a function for full calldata (selector included).
pub fn guess_function(calldata: &[u8]) -> Option<(Function, Vec<DynSolValue>)> {
    let params = calldata.get(4..)?;
    let types = guess_param_types(params)?;

    let values = if types.is_empty() {
        Vec::new()
    } else {
        match DynSolType::Tuple(types.clone()).abi_decode_params(params).ok()? {
            DynSolValue::Tuple(values) => values,
            _ => return None,
        }
    };
    if DynSolValue::Tuple(values.clone()).abi_encode_params() != params {
        debug!("guessed layout does not reproduce the calldata");
        return None;
    }

    let type_list: Vec<String> = types
        .iter()
        .map(|ty| ty.sol_type_name().into_owned())
        .collect();
    let function = Function::parse(&format!(
        "{GUESSED_FUNCTION_NAME}({})",
        type_list.join(",")
    ))
    .ok()?;
    Some((function, values))
}

/// Guess the parameter types of selector-less parameter bytes.
pub fn guess_param_types(params: &[u8]) -> Option<Vec<DynSolType>> {
    if params.len() % WORD != 0 {
        return None;
    }

    let mut head_end = params.len();
    let mut slots = Vec::new();
    let mut index = 0;
    while (index + 1) * WORD <= head_end {
        let word = &params[index * WORD..(index + 1) * WORD];
        match tail_offset(word, index, params) {
            Some(offset) => {
                head_end = head_end.min(offset);
                slots.push(Slot::Dynamic(offset));
            }
            None if looks_like_address(word) => slots.push(Slot::Static(DynSolType::Address)),
            None => slots.push(Slot::Static(DynSolType::Uint(256))),
        }
        index += 1;
    }

    let mut offsets: Vec<usize> = slots
        .iter()
        .filter_map(|slot| match slot {
            Slot::Dynamic(offset) => Some(*offset),
            Slot::Static(_) => None,
        })
        .collect();
    offsets.sort_unstable();
    offsets.dedup();

    let types = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Static(ty) => ty,
            Slot::Dynamic(offset) => {
                let end = offsets
                    .iter()
                    .copied()
                    .find(|o| *o > offset)
                    .unwrap_or(params.len());
                dynamic_type(params, offset, end)
            }
        })
        .collect();
    Some(types)
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let low: [u8; 8] = word[WORD - 8..].try_into().ok()?;
    usize::try_from(u64::from_be_bytes(low)).ok()
}

fn ceil_word(len: usize) -> Option<usize> {
    len.checked_add(WORD - 1).map(|n| n / WORD * WORD)
}

fn tail_offset(word: &[u8], index: usize, params: &[u8]) -> Option<usize> {
    let offset = word_as_usize(word)?;
    if offset % WORD != 0 || offset < (index + 1) * WORD {
        return None;
    }
    let length_end = offset.checked_add(WORD).filter(|end| *end <= params.len())?;
    let length = word_as_usize(params.get(offset..length_end)?)?;
    let payload_end = length_end.checked_add(ceil_word(length)?)?;
    (payload_end <= params.len()).then_some(offset)
}

fn dynamic_type(params: &[u8], offset: usize, end: usize) -> DynSolType {
    let length = word_as_usize(&params[offset..offset + WORD]).unwrap_or_default();
    let region = end.saturating_sub(offset + WORD);

    if ceil_word(length) == Some(region) {
        return DynSolType::Bytes;
    }
    if length.checked_mul(WORD) == Some(region) && length > 0 {
        let elements = &params[offset + WORD..end];
        let all_addresses = elements.chunks(WORD).all(looks_like_address);
        let element = if all_addresses {
            DynSolType::Address
        } else {
            DynSolType::Uint(256)
        };
        return DynSolType::Array(Box::new(element));
    }
    DynSolType::Bytes
}

// Small integers are far more common than addresses below 2^128.
fn looks_like_address(word: &[u8]) -> bool {
    word[..12].iter().all(|b| *b == 0) && word[12..16].iter().any(|b| *b != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn params(values: Vec<DynSolValue>) -> Vec<u8> {
        DynSolValue::Tuple(values).abi_encode_params()
    }

    #[test]
    fn guesses_address_and_amount() {
        let data = params(vec![
            DynSolValue::Address(Address::repeat_byte(0x42)),
            DynSolValue::Uint(U256::from(1_000u64), 256),
        ]);
        let types = guess_param_types(&data).unwrap();
        assert_eq!(types, vec![DynSolType::Address, DynSolType::Uint(256)]);
    }

    #[test]
    fn guesses_dynamic_bytes() {
        let data = params(vec![
            DynSolValue::Uint(U256::from(5u64), 256),
            DynSolValue::Bytes(vec![0xab; 37]),
        ]);
        let types = guess_param_types(&data).unwrap();
        assert_eq!(types, vec![DynSolType::Uint(256), DynSolType::Bytes]);
    }

    #[test]
    fn guesses_word_arrays() {
        let data = params(vec![DynSolValue::Array(vec![
            DynSolValue::Uint(U256::from(1u64), 256),
            DynSolValue::Uint(U256::from(2u64), 256),
            DynSolValue::Uint(U256::from(3u64), 256),
        ])]);
        let types = guess_param_types(&data).unwrap();
        assert_eq!(
            types,
            vec![DynSolType::Array(Box::new(DynSolType::Uint(256)))]
        );
    }

    #[test]
    fn guessed_function_is_marked() {
        let mut calldata = vec![0x12, 0x34, 0x56, 0x78];
        calldata.extend(params(vec![
            DynSolValue::Address(Address::repeat_byte(0x42)),
            DynSolValue::Bytes(vec![0x01, 0x02, 0x03]),
        ]));
        let (function, values) = guess_function(&calldata).unwrap();
        assert_eq!(function.name, GUESSED_FUNCTION_NAME);
        assert_eq!(function.signature(), "__guessed__(address,bytes)");
        assert_eq!(values[1], DynSolValue::Bytes(vec![0x01, 0x02, 0x03]));
    }

    #[test]
    fn huge_offset_word_is_a_plain_number() {
        let mut data = vec![0u8; 24];
        data.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xe0]);
        assert_eq!(guess_param_types(&data), Some(vec![DynSolType::Uint(256)]));

        let mut calldata = vec![0x12, 0x34, 0x56, 0x78];
        calldata.extend_from_slice(&data);
        let (function, _) = guess_function(&calldata).unwrap();
        assert_eq!(function.signature(), "__guessed__(uint256)");
    }

    #[test]
    fn rejects_unaligned_params() {
        assert!(guess_param_types(&[0u8; 33]).is_none());
        assert!(guess_function(&[0x12, 0x34, 0x56, 0x78, 0x00]).is_none());
    }
}
