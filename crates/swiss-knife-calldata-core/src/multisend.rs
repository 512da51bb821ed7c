//! Safe MultiSend packed batches.
//!
//! `multiSend(bytes transactions)` carries a tight concatenation of
//! `operation (1) | to (20) | value (32) | dataLength (32) | data` records.
//! This is not ABI encoding and is parsed by fixed-offset slicing.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, U256};

use crate::domain::MultiSendTransaction;
use crate::error::DecodeError;

pub const MULTISEND_SELECTOR: [u8; 4] = [0x8d, 0x80, 0xff, 0x0a];

/// Fixed bytes in front of every record's `data`.
pub const RECORD_HEADER_LEN: usize = 1 + 20 + 32 + 32;

/// Unpack a packed batch. The cursor has to land exactly on the end of the
/// buffer; a truncated header or an overlong `dataLength` fails the whole
/// batch.
pub fn decode_multisend(packed: &[u8]) -> Result<Vec<MultiSendTransaction>, DecodeError> {
    let mut transactions = Vec::new();
    let mut offset = 0usize;

    while offset < packed.len() {
        let index = transactions.len();
        let remaining = packed.len() - offset;
        if remaining < RECORD_HEADER_LEN {
            return Err(DecodeError::MalformedNestedBatch(format!(
                "record {index} header needs {RECORD_HEADER_LEN} bytes, {remaining} left"
            )));
        }

        let operation = packed[offset];
        offset += 1;

        let to = Address::from_slice(&packed[offset..offset + 20]);
        offset += 20;

        let value = U256::from_be_slice(&packed[offset..offset + 32]);
        offset += 32;

        let data_length = U256::from_be_slice(&packed[offset..offset + 32]);
        offset += 32;

        let left = packed.len() - offset;
        if data_length > U256::from(left) {
            return Err(DecodeError::MalformedNestedBatch(format!(
                "record {index} declares {data_length} data bytes, {left} left"
            )));
        }
        let data_end = offset + data_length.to::<usize>();

        // dataLength == 0 is a valid empty record; the header already moved
        // the cursor forward.
        let data = Bytes::copy_from_slice(&packed[offset..data_end]);
        offset = data_end;

        transactions.push(MultiSendTransaction {
            operation,
            to,
            value,
            data,
        });
    }

    Ok(transactions)
}

/// Pack transactions into the MultiSend batch format.
pub fn encode_multisend(transactions: &[MultiSendTransaction]) -> Bytes {
    let capacity = transactions
        .iter()
        .map(|tx| RECORD_HEADER_LEN + tx.data.len())
        .sum();
    let mut packed = Vec::with_capacity(capacity);
    for tx in transactions {
        packed.push(tx.operation);
        packed.extend_from_slice(tx.to.as_slice());
        packed.extend_from_slice(&tx.value.to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(tx.data.len()).to_be_bytes::<32>());
        packed.extend_from_slice(&tx.data);
    }
    Bytes::from(packed)
}

/// Full `multiSend(bytes)` calldata for a batch.
pub fn encode_multisend_call(transactions: &[MultiSendTransaction]) -> Bytes {
    let packed = encode_multisend(transactions);
    let params = DynSolValue::Tuple(vec![DynSolValue::Bytes(packed.to_vec())]).abi_encode_params();
    let mut calldata = MULTISEND_SELECTOR.to_vec();
    calldata.extend_from_slice(&params);
    Bytes::from(calldata)
}

/// Record as the tuple value the decode tree exposes.
pub(crate) fn record_value(tx: &MultiSendTransaction) -> DynSolValue {
    DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(tx.operation), 8),
        DynSolValue::Address(tx.to),
        DynSolValue::Uint(tx.value, 256),
        DynSolValue::Uint(U256::from(tx.data.len()), 256),
        DynSolValue::Bytes(tx.data.to_vec()),
    ])
}
