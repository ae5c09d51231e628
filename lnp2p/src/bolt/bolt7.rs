// LNP P2P library, plmeneting both bolt (BOLT) and Bifrost P2P messaging
// system for Lightning network protocol (LNP)
//
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

//! BOLT-7 messages relevant to a single channel's lifecycle.
//!
//! Full gossip propagation and validation (`channel_announcement`,
//! `node_announcement`, `channel_update`, gossip queries) is the
//! responsibility of the router collaborator and is out of scope here; the
//! channel actor only ever sends and receives `announcement_signatures`
//! directly with its peer once a publicly-announced channel is locked in.

use secp256k1::ecdsa::Signature;

use super::{ChannelId, ShortChannelId};

/// This is a direct message between the two endpoints of a channel and serves
/// as an opt-in mechanism to allow the announcement of the channel to the rest
/// of the network. It contains the necessary signatures, by the sender, to
/// construct the `channel_announcement` message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[derive(LightningEncode, LightningDecode)]
#[cfg_attr(feature = "strict_encoding", derive(NetworkEncode, NetworkDecode))]
#[display(
    "announcement_signature({channel_id}, {short_channel_id}, ...signatures)"
)]
pub struct AnnouncementSignatures {
    /// The channel ID
    pub channel_id: ChannelId,

    /// Short channel Id
    pub short_channel_id: ShortChannelId,

    /// Node Signature
    pub node_signature: Signature,

    /// Bitcoin Signature
    pub bitcoin_signature: Signature,
}
