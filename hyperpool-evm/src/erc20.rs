use alloy::{
    core::sol,
    primitives::{Address, U256},
    sol_types::SolCall,
};

// ERC20 interface definition
// Copied from EIP-20: https://eips.ethereum.org/EIPS/eip-20
sol! {
    function balanceOf(address _owner) public view returns (uint256 balance);
    function approve(address _spender, uint256 _value) public returns (bool success);
    function allowance(address _owner, address _spender) public view returns (uint256 remaining);
}

/// Encode balanceOf(address) call
pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    balanceOfCall { _owner: owner }.abi_encode()
}

/// Encode approve(address,uint256) call
pub fn encode_approve(spender: Address, value: U256) -> Vec<u8> {
    approveCall { _spender: spender, _value: value }.abi_encode()
}

/// Encode allowance(address,address) call
pub fn encode_allowance(owner: Address, spender: Address) -> Vec<u8> {
    allowanceCall { _owner: owner, _spender: spender }.abi_encode()
}

/// Decode allowance(address,address) return value
pub fn decode_allowance(data: &[u8]) -> Result<U256, Box<dyn std::error::Error + Send + Sync>> {
    allowanceCall::abi_decode_returns(data)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_allowance() {
        let val = U256::from(1_000_000u64);
        let allowance = decode_allowance(&val.to_be_bytes::<32>()).unwrap();
        assert_eq!(allowance, U256::from(1_000_000u64));
    }

    #[test]
    fn test_decode_allowance_does_not_panic() {
        let res = decode_allowance(&[0u8; 7]);
        assert!(res.is_err());
    }

    #[test]
    fn test_encode_approve_selector() {
        let spender = Address::repeat_byte(0x42);
        let data = encode_approve(spender, U256::MAX);
        // approve(address,uint256) -> 0x095ea7b3
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 32 + 32);
    }

    #[test]
    fn test_encode_allowance_selector() {
        let data = encode_allowance(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        // allowance(address,address) -> 0xdd62ed3e
        assert_eq!(&data[..4], &[0xdd, 0x62, 0xed, 0x3e]);
    }
}
