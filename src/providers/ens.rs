//! ENS name resolution on mainnet: registry `resolver(node)`, then `addr(node)`

use alloy_primitives::Address;
use eyre::{eyre, Result};
use tracing::debug;

use super::reader::ChainReader;
use crate::utils::address::namehash;
use crate::utils::constants::{ENS_REGISTRY, MAINNET_CHAIN_ID};
use crate::utils::decoder::{AllowanceDecoder, CallOutcome, ReadCall};

/// Resolve `name` to an address; `Ok(None)` when no resolver or no address is set
pub async fn resolve<R: ChainReader + ?Sized>(reader: &R, name: &str) -> Result<Option<Address>> {
    let node = namehash(&name.to_lowercase());

    let lookup = ReadCall::new(*ENS_REGISTRY, AllowanceDecoder::encode_resolver(node));
    let resolver = match single(reader, lookup).await? {
        Some(addr) => addr,
        None => {
            debug!("🔎 No resolver for {}", name);
            return Ok(None);
        }
    };

    let lookup = ReadCall::new(resolver, AllowanceDecoder::encode_addr(node));
    let resolved = single(reader, lookup).await?;
    if let Some(addr) = resolved {
        debug!("🔎 {} -> {}", name, addr);
    }
    Ok(resolved)
}

/// One address-returning read; zero address maps to `None`
async fn single<R: ChainReader + ?Sized>(reader: &R, call: ReadCall) -> Result<Option<Address>> {
    let mut outcomes = reader
        .read_many(MAINNET_CHAIN_ID, std::slice::from_ref(&call))
        .await?;
    match outcomes.pop() {
        Some(CallOutcome::Success(data)) => {
            let addr = AllowanceDecoder::decode_address(&data)?;
            Ok((addr != Address::ZERO).then_some(addr))
        }
        Some(CallOutcome::Failure(reason)) => Err(eyre!("ENS lookup failed: {}", reason)),
        None => Err(eyre!("ENS lookup returned no outcome")),
    }
}
