//! Providers Module - Chain Access
//!
//! JSON-RPC transport, the read interface used by the scanner (Multicall3
//! batching, ENS) and the write interface used by revoke.

pub mod ens;
pub mod reader;
pub mod rpc;
pub mod wallet;

pub use reader::{read_allowance, ChainReader, RpcChainReader};
pub use rpc::{mask_url, RpcError, RpcProvider};
pub use wallet::{LocalWallet, WalletSigner};
