// LNP/BP Core Library implementing LNPBP specifications & standards
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! Everything this crate exchanges with the outside world that is not
//! `lnp2p` wire traffic (spec §6 "External Interfaces"): local commands from
//! the owning node, requests to and notifications from the blockchain
//! watcher, messages to the HTLC relayer, and the node-wide event stream.
//! `crate::channel` is the only module that produces or consumes these
//! types; none of them cross into `crate::commitments`.

use bitcoin::{Transaction, Txid};
use bitcoin_scripts::hlc::{HashLock, HashPreimage};
use bitcoin_scripts::PubkeyScript;
use lnp2p::bolt::{ChannelId, ShortChannelId};

use crate::htlc::HtlcAmount;

/// Local commands issued by the owning node (spec §6 "Local commands").
#[derive(Clone, Debug)]
pub enum Command {
    AddHtlc {
        amount_msat: u64,
        payment_hash: HashLock,
        cltv_expiry: u32,
        origin: HtlcOrigin,
    },
    FulfillHtlc {
        id: u64,
        payment_preimage: HashPreimage,
    },
    FailHtlc {
        id: u64,
        reason: Vec<u8>,
    },
    Sign,
    Close {
        final_script: Option<PubkeyScript>,
    },
    GetState,
    GetStateData,
    GetInfo,
}

/// Where a locally-added HTLC came from: a local sender paying an invoice,
/// or a forward from an upstream channel the relayer is routing through us.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HtlcOrigin {
    Local,
    Relayed { upstream_channel: ChannelId, upstream_htlc_id: u64 },
}

/// Tags distinguishing which on-chain condition a blockchain request is
/// armed for, mirroring the BOLT-agnostic `BITCOIN_*` event names used
/// throughout the spec's external-interface section.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WatchTag {
    FundingSpent,
    FundingDepthOk,
    FundingLost,
    CloseDone,
    LocalCommitDone,
    RemoteCommitDone,
    NextRemoteCommitDone,
    PenaltyDone,
    HtlcSpent(u64),
}

/// Requests this channel issues to the blockchain-watcher collaborator
/// (spec §6).
#[derive(Clone, Debug)]
pub enum BlockchainRequest {
    MakeFundingTx { funding_satoshis: u64 },
    PublishAsap(Transaction),
    WatchConfirmed { txid: Txid, depth: u32, tag: WatchTag },
    WatchSpent { txid: Txid, vout: u32, tag: WatchTag },
    WatchLost { txid: Txid, depth: u32, tag: WatchTag },
}

/// Notifications the blockchain-watcher collaborator delivers back.
#[derive(Clone, Debug)]
pub enum BlockchainEvent {
    MakeFundingTxResponse { tx: Transaction, output_index: u16 },
    /// `tx_index` is only meaningful for `WatchTag::FundingDepthOk`: it feeds
    /// `ShortChannelId::with` once the funding reaches `minimum_depth`.
    Confirmed { tag: WatchTag, height: u32, tx_index: u32 },
    Spent { tag: WatchTag, tx: Transaction },
    Lost { tag: WatchTag },
}

/// Messages this channel emits to the HTLC relayer collaborator, which
/// matches offered and received HTLCs across channels to route payments.
#[derive(Clone, Debug)]
pub enum RelayerMsg {
    Bind { htlc: HtlcAmount, origin: HtlcOrigin },
    ForwardAdd { htlc: HtlcAmount },
    ForwardFulfill { id: u64, payment_preimage: HashPreimage },
    ForwardFail { id: u64, reason: Vec<u8> },
}

/// Node-wide event-stream emissions (spec §6), consumed by whatever
/// observability or persistence layer the owning node wires in.
#[derive(Clone, Debug)]
pub enum ChannelEvent {
    Created,
    ChannelIdAssigned(ChannelId),
    SignatureReceived,
    StateChanged { previous: &'static str, current: &'static str },
    /// `announcement_signatures` exchange completed; the owning node may now
    /// propagate `channel_announcement`/`node_announcement`/`channel_update`
    /// to the gossip network (out of scope here; see `crate::collaborators`
    /// module docs).
    Announced(ShortChannelId),
    /// A local command was rejected without any state change (spec §7).
    CommandRejected(String),
    /// Reply to `CMD_GETSTATE`/`CMD_GETSTATEDATA`/`CMD_GETINFO` (spec §6).
    Info(String),
}

/// Everything a single call into the controller can produce: wire replies to
/// the peer, requests to the blockchain watcher, messages to the relayer,
/// and event-stream emissions. Returned in full from every `Channel` entry
/// point so the caller can dispatch each piece to its collaborator without
/// the controller needing to hold a reference to any of them.
#[derive(Clone, Debug, Default)]
pub struct Outputs {
    pub to_peer: Vec<lnp2p::bolt::Messages>,
    pub to_blockchain: Vec<BlockchainRequest>,
    pub to_relayer: Vec<RelayerMsg>,
    pub events: Vec<ChannelEvent>,
}

impl Outputs {
    pub fn is_empty(&self) -> bool {
        self.to_peer.is_empty()
            && self.to_blockchain.is_empty()
            && self.to_relayer.is_empty()
            && self.events.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_outputs_reports_empty() {
        assert!(Outputs::default().is_empty());
    }

    #[test]
    fn outputs_with_an_event_is_not_empty() {
        let mut outputs = Outputs::default();
        outputs.events.push(ChannelEvent::Created);
        assert!(!outputs.is_empty());
    }
}
