// LNP P2P library, implementing both bolt (BOLT) and Bifrost P2P messaging
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

use std::io;

#[cfg(feature = "serde")]
use serde_with::{As, DisplayFromStr};
use amplify::hex::{self, FromHex};
use amplify::{Display, DumbDefault, Slice32, Wrapper};
use bitcoin::hashes::Hash;
use bitcoin::OutPoint;
use lightning_encoding::{LightningDecode, LightningEncode};

#[cfg(feature = "strict_encoding")]
use strict_encoding::{self, StrictDecode, StrictEncode};

/// BOLT-2 channel id: 256-bit number representing funding txid XOR'ed with
/// the 32-bit funding output number.
///
/// Prior to the funding transaction being known the channel is referred to
/// by its [`TempChannelId`]; once the funding outpoint is fixed the id
/// becomes final and is derived deterministically with [`ChannelId::with`].
#[cfg_attr(
    feature = "serde",
    serde_as,
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
#[derive(
    Wrapper,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    Default,
    From,
    LightningEncode,
    LightningDecode,
)]
#[cfg_attr(feature = "strict_encoding", derive(StrictEncode, StrictDecode))]
#[display(LowerHex)]
#[wrapper(FromStr, LowerHex, UpperHex)]
pub struct ChannelId(
    #[cfg_attr(feature = "serde", serde(with = "As::<DisplayFromStr>"))]
    Slice32,
);

impl FromHex for ChannelId {
    fn from_byte_iter<I>(iter: I) -> Result<Self, hex::Error>
    where
        I: Iterator<Item = Result<u8, hex::Error>>
            + ExactSizeIterator
            + DoubleEndedIterator,
    {
        Ok(Self(Slice32::from_byte_iter(iter)?))
    }
}

impl ChannelId {
    /// Derives the final channel id from the funding transaction outpoint, as
    /// defined by BOLT-2: the funding txid with its last two bytes XOR'ed
    /// with the big-endian encoding of the output index.
    pub fn with(funding_outpoint: OutPoint) -> Self {
        let mut slice = funding_outpoint.txid.into_inner();
        let vout = funding_outpoint.vout.to_be_bytes();
        slice[30] ^= vout[0];
        slice[31] ^= vout[1];
        ChannelId::from_inner(Slice32::from_inner(slice))
    }

    /// With some lightning messages (like error) channel id consisting of all
    /// zeros has a special meaning of "applicable to all opened channels".
    /// This function allows detecting this kind of [`ChannelId`].
    pub fn is_wildcard(&self) -> bool {
        self.to_inner().to_inner() == [0u8; 32]
    }
}

/// Lightning network temporary channel id, randomly picked by the funder
/// before the funding transaction is known.
#[cfg_attr(
    feature = "serde",
    serde_as,
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
#[derive(
    Wrapper,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    From,
    LightningEncode,
    LightningDecode,
)]
#[cfg_attr(feature = "strict_encoding", derive(StrictEncode, StrictDecode))]
#[display(LowerHex)]
#[wrapper(FromStr, LowerHex, UpperHex)]
pub struct TempChannelId(
    #[cfg_attr(feature = "serde", serde(with = "As::<DisplayFromStr>"))]
    Slice32,
);

impl From<TempChannelId> for ChannelId {
    fn from(temp: TempChannelId) -> Self {
        Self(temp.into_inner())
    }
}

impl From<ChannelId> for TempChannelId {
    fn from(id: ChannelId) -> Self {
        Self(id.into_inner())
    }
}

impl FromHex for TempChannelId {
    fn from_byte_iter<I>(iter: I) -> Result<Self, hex::Error>
    where
        I: Iterator<Item = Result<u8, hex::Error>>
            + ExactSizeIterator
            + DoubleEndedIterator,
    {
        Ok(Self(Slice32::from_byte_iter(iter)?))
    }
}

impl TempChannelId {
    pub fn random() -> Self {
        TempChannelId::from_inner(Slice32::random())
    }
}

impl DumbDefault for TempChannelId {
    fn dumb_default() -> Self {
        Self(Default::default())
    }
}

/// A channel is addressed by its temporary id until the funding transaction
/// is broadcast, and by its final id afterwards. Rather than threading an
/// `Option<ChannelId>` through the whole stack, the two cases are unified
/// into a single identifier that transparently upgrades in place once the
/// funding outpoint becomes known.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
#[display(inner)]
pub enum ActiveChannelId {
    /// Channel does not yet have a known funding outpoint.
    Temporary(TempChannelId),

    /// Channel funding outpoint is known and the final channel id is fixed.
    Final(ChannelId),
}

impl ActiveChannelId {
    /// Generates a fresh temporary channel id.
    pub fn random() -> Self {
        ActiveChannelId::Temporary(TempChannelId::random())
    }

    /// Transitions a temporary id into its final form, given the now-known
    /// funding outpoint. Has no effect if the id is already final.
    pub fn with(funding_outpoint: OutPoint) -> Self {
        ActiveChannelId::Final(ChannelId::with(funding_outpoint))
    }

    /// Returns the final channel id, if known.
    pub fn channel_id(self) -> Option<ChannelId> {
        match self {
            ActiveChannelId::Temporary(_) => None,
            ActiveChannelId::Final(channel_id) => Some(channel_id),
        }
    }

    /// Returns the temporary channel id, if the channel is still in that
    /// stage.
    pub fn temp_channel_id(self) -> Option<TempChannelId> {
        match self {
            ActiveChannelId::Temporary(temp_channel_id) => {
                Some(temp_channel_id)
            }
            ActiveChannelId::Final(_) => None,
        }
    }

    /// Returns the 32-byte representation shared by both id stages.
    pub fn as_slice32(self) -> Slice32 {
        match self {
            ActiveChannelId::Temporary(temp) => temp.into_inner(),
            ActiveChannelId::Final(id) => id.into_inner(),
        }
    }
}

impl From<TempChannelId> for ActiveChannelId {
    fn from(temp_channel_id: TempChannelId) -> Self {
        ActiveChannelId::Temporary(temp_channel_id)
    }
}

impl From<ChannelId> for ActiveChannelId {
    fn from(channel_id: ChannelId) -> Self {
        ActiveChannelId::Final(channel_id)
    }
}

impl DumbDefault for ActiveChannelId {
    fn dumb_default() -> Self {
        ActiveChannelId::Temporary(TempChannelId::dumb_default())
    }
}

#[cfg(feature = "strict_encoding")]
impl StrictEncode for ActiveChannelId {
    fn strict_encode<E: io::Write>(
        &self,
        mut e: E,
    ) -> Result<usize, strict_encoding::Error> {
        let is_final = matches!(self, ActiveChannelId::Final(_));
        let mut len = is_final.strict_encode(&mut e)?;
        len += self.as_slice32().strict_encode(&mut e)?;
        Ok(len)
    }
}

#[cfg(feature = "strict_encoding")]
impl StrictDecode for ActiveChannelId {
    fn strict_decode<D: io::Read>(
        mut d: D,
    ) -> Result<Self, strict_encoding::Error> {
        let is_final = bool::strict_decode(&mut d)?;
        let slice = Slice32::strict_decode(&mut d)?;
        Ok(if is_final {
            ActiveChannelId::Final(ChannelId::from_inner(slice))
        } else {
            ActiveChannelId::Temporary(TempChannelId::from_inner(slice))
        })
    }
}

/// Short channel id, uniquely locating the funding transaction output of a
/// confirmed channel by its position on chain: the block height, the index
/// of the funding transaction within that block, and the funding output
/// index, packed into a single 64-bit number as specified by BOLT-7.
#[derive(Wrapper, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From)]
#[derive(LightningEncode, LightningDecode)]
#[cfg_attr(feature = "strict_encoding", derive(StrictEncode, StrictDecode))]
#[wrapper(FromStr)]
pub struct ShortChannelId(u64);

impl ShortChannelId {
    pub fn with(
        block_height: u32,
        tx_index: u32,
        output_index: u16,
    ) -> Self {
        let block_height = (block_height & 0x00FF_FFFF) as u64;
        let tx_index = (tx_index & 0x00FF_FFFF) as u64;
        ShortChannelId(
            (block_height << 40) | (tx_index << 16) | output_index as u64,
        )
    }

    pub fn block_height(self) -> u32 {
        ((self.0 >> 40) & 0x00FF_FFFF) as u32
    }

    pub fn tx_index(self) -> u32 {
        ((self.0 >> 16) & 0x00FF_FFFF) as u32
    }

    pub fn output_index(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl std::fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block_height(),
            self.tx_index(),
            self.output_index()
        )
    }
}

impl std::fmt::Debug for ShortChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ShortChannelId({})", self)
    }
}

/// Opaque onion routing packet carried by `update_add_htlc`.
///
/// Constructing, peeling and forwarding the Sphinx onion is the
/// responsibility of the HTLC relayer collaborator; this type only carries
/// the fixed-size blob across the wire.
pub const ONION_PACKET_LEN: usize = 1 + 33 + 1300 + 32;

#[derive(Wrapper, Clone, PartialEq, Eq, Debug, From)]
pub struct OnionPacket(Vec<u8>);

impl Default for OnionPacket {
    fn default() -> Self {
        OnionPacket(vec![0u8; ONION_PACKET_LEN])
    }
}

impl lightning_encoding::LightningEncode for OnionPacket {
    fn lightning_encode<E: io::Write>(
        &self,
        mut e: E,
    ) -> Result<usize, lightning_encoding::Error> {
        e.write_all(&self.0)?;
        Ok(self.0.len())
    }
}

impl lightning_encoding::LightningDecode for OnionPacket {
    fn lightning_decode<D: io::Read>(
        mut d: D,
    ) -> Result<Self, lightning_encoding::Error> {
        let mut buf = vec![0u8; ONION_PACKET_LEN];
        d.read_exact(&mut buf)?;
        Ok(OnionPacket(buf))
    }
}

#[cfg(feature = "strict_encoding")]
impl StrictEncode for OnionPacket {
    fn strict_encode<E: io::Write>(
        &self,
        mut e: E,
    ) -> Result<usize, strict_encoding::Error> {
        e.write_all(&self.0)?;
        Ok(self.0.len())
    }
}

#[cfg(feature = "strict_encoding")]
impl StrictDecode for OnionPacket {
    fn strict_decode<D: io::Read>(
        mut d: D,
    ) -> Result<Self, strict_encoding::Error> {
        let mut buf = vec![0u8; ONION_PACKET_LEN];
        d.read_exact(&mut buf)?;
        Ok(OnionPacket(buf))
    }
}
