//! ABI encoding/decoding for the contracts the scanner talks to
//! ERC-20 allowance/approve/decimals, Multicall3 aggregate3, ENS lookups

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};

sol! {
    // ERC-20
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
    function decimals() external view returns (uint8);

    // Multicall3
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Result3 {
        bool success;
        bytes returnData;
    }

    function aggregate3(Call3[] calldata calls) external payable returns (Result3[] memory returnData);

    // ENS registry / resolver
    function resolver(bytes32 node) external view returns (address);
    function addr(bytes32 node) external view returns (address);
}

/// One read-only call against a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub target: Address,
    pub calldata: Bytes,
}

impl ReadCall {
    pub fn new(target: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            target,
            calldata: calldata.into(),
        }
    }
}

/// Outcome of one call inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Raw return data
    Success(Bytes),
    /// Reason the call did not produce data
    Failure(String),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }
}

/// Decoder for scanner calls
pub struct AllowanceDecoder;

impl AllowanceDecoder {
    /// `allowance(owner, spender)` calldata
    pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
        allowanceCall { owner, spender }.abi_encode().into()
    }

    /// Decode `allowance` return data
    pub fn decode_allowance(data: &[u8]) -> Result<U256> {
        if data.is_empty() {
            return Err(eyre!("empty return data (not a contract?)"));
        }
        let ret = allowanceCall::abi_decode_returns(data, false)
            .map_err(|e| eyre!("bad allowance return data: {}", e))?;
        Ok(ret._0)
    }

    /// `decimals()` calldata
    pub fn encode_decimals() -> Bytes {
        decimalsCall {}.abi_encode().into()
    }

    /// Decode `decimals` return data
    ///
    /// Non-validating decode: tokens that return a full word are accepted,
    /// as long as the value fits a `u8`.
    pub fn decode_decimals(data: &[u8]) -> Result<u8> {
        if data.len() < 32 {
            return Err(eyre!("short decimals return data ({} bytes)", data.len()));
        }
        let word = U256::from_be_slice(&data[..32]);
        u8::try_from(word).map_err(|_| eyre!("decimals out of range: {}", word))
    }

    /// `approve(spender, amount)` calldata
    pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
        approveCall { spender, amount }.abi_encode().into()
    }

    /// `aggregate3` calldata with `allowFailure = true` on every call
    pub fn encode_aggregate3(calls: &[ReadCall]) -> Bytes {
        let calls = calls
            .iter()
            .map(|c| Call3 {
                target: c.target,
                allowFailure: true,
                callData: c.calldata.clone(),
            })
            .collect();
        aggregate3Call { calls }.abi_encode().into()
    }

    /// Decode `aggregate3` return data into one outcome per request, in order
    pub fn decode_aggregate3(data: &[u8], expected: usize) -> Result<Vec<CallOutcome>> {
        let ret = aggregate3Call::abi_decode_returns(data, false)
            .map_err(|e| eyre!("bad aggregate3 return data: {}", e))?;
        let results = ret.returnData;
        if results.len() != expected {
            return Err(eyre!(
                "aggregate3 returned {} results for {} calls",
                results.len(),
                expected
            ));
        }
        Ok(results
            .into_iter()
            .map(|r| {
                if r.success {
                    CallOutcome::Success(r.returnData)
                } else {
                    CallOutcome::Failure(revert_reason(&r.returnData))
                }
            })
            .collect())
    }

    /// `resolver(node)` calldata
    pub fn encode_resolver(node: B256) -> Bytes {
        resolverCall { node }.abi_encode().into()
    }

    /// `addr(node)` calldata
    pub fn encode_addr(node: B256) -> Bytes {
        addrCall { node }.abi_encode().into()
    }

    /// Decode a single `address` return word
    pub fn decode_address(data: &[u8]) -> Result<Address> {
        let ret = addrCall::abi_decode_returns(data, false)
            .map_err(|e| eyre!("bad address return data: {}", e))?;
        Ok(ret._0)
    }
}

/// Short description of a failed sub-call's revert data
pub fn revert_reason(data: &[u8]) -> String {
    if data.is_empty() {
        "call reverted".to_string()
    } else {
        format!("call reverted (0x{})", hex::encode(&data[..data.len().min(36)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: U256) -> Vec<u8> {
        value.to_be_bytes::<32>().to_vec()
    }

    #[test]
    fn test_allowance_selector() {
        let data = AllowanceDecoder::encode_allowance(Address::ZERO, Address::ZERO);
        assert_eq!(&data[..4], &[0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(data.len(), 4 + 64);
    }

    #[test]
    fn test_approve_selector() {
        let data = AllowanceDecoder::encode_approve(Address::repeat_byte(1), U256::ZERO);
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_decode_allowance() {
        let value = U256::from(5_000_000u64);
        assert_eq!(AllowanceDecoder::decode_allowance(&word(value)).unwrap(), value);
        assert!(AllowanceDecoder::decode_allowance(&[]).is_err());
    }

    #[test]
    fn test_decode_decimals_bounds() {
        assert_eq!(AllowanceDecoder::decode_decimals(&word(U256::from(6u8))).unwrap(), 6);
        assert!(AllowanceDecoder::decode_decimals(&word(U256::from(300u16))).is_err());
        assert!(AllowanceDecoder::decode_decimals(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_aggregate3_positional_decode() {
        let results = vec![
            Result3 { success: true, returnData: word(U256::from(7u8)).into() },
            Result3 { success: false, returnData: Bytes::new() },
            Result3 { success: true, returnData: word(U256::ZERO).into() },
        ];
        let encoded = aggregate3Call::abi_encode_returns(&(results,));

        let outcomes = AllowanceDecoder::decode_aggregate3(&encoded, 3).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1], CallOutcome::Failure("call reverted".to_string()));
        assert!(outcomes[2].is_success());

        assert!(AllowanceDecoder::decode_aggregate3(&encoded, 4).is_err());
    }
}
