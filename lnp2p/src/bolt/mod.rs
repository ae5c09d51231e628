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

mod bolt1;
mod bolt2;
mod bolt7;
mod bolt9;
mod types;

pub use bolt1::*;
pub use bolt2::*;
pub use bolt7::*;
pub use bolt9::{Feature, FeatureContext, InitFeatures, UnknownFeatureError};
pub use types::{
    ActiveChannelId, ChannelId, OnionPacket, ShortChannelId, TempChannelId,
};

use std::io;

use internet2::{CreateUnmarshaller, Payload, Unmarshall, Unmarshaller};
use lightning_encoding::{self, LightningDecode, LightningEncode};
use once_cell::sync::Lazy;

/// Default BOLT Lightning port number
pub const LNP2P_BOLT_PORT: u16 = 9735;

pub static LNP2P_BOLT_UNMARSHALLER: Lazy<Unmarshaller<Messages>> =
    Lazy::new(Messages::create_unmarshaller);

/// All BOLT wire messages exchanged between two lightning peers, relevant to
/// channel establishment, operation and closing (BOLT-1, BOLT-2) together
/// with the gossip messages needed to announce a channel once it is funded
/// (BOLT-7).
#[derive(Clone, Debug, Display, Api)]
#[api(encoding = "lightning")]
#[non_exhaustive]
#[display(inner)]
pub enum Messages {
    // Part I: Generic messages outside of channel operations (BOLT-1)
    // ===============================================================
    /// Once authentication is complete, the first message reveals the
    /// features supported or required by this node, even if this is a
    /// reconnection.
    #[api(type = 16)]
    Init(Init),

    /// For simplicity of diagnosis, it's often useful to tell a peer that
    /// something is incorrect.
    #[api(type = 17)]
    Error(Error),

    /// In order to allow for the existence of long-lived TCP connections, at
    /// times it may be required that both ends keep alive the TCP connection
    /// at the application level.
    #[api(type = 18)]
    Ping(Ping),

    /// The pong message is sent whenever a ping message is received.
    #[api(type = 19)]
    #[display("pong(...)")]
    Pong(Vec<u8>),

    // Part II: Channel management protocol (BOLT-2)
    // =============================================
    //
    // 1. Channel establishment / closing
    // ----------------------------------
    #[api(type = 32)]
    OpenChannel(OpenChannel),

    #[api(type = 33)]
    AcceptChannel(AcceptChannel),

    #[api(type = 34)]
    FundingCreated(FundingCreated),

    #[api(type = 35)]
    FundingSigned(FundingSigned),

    #[api(type = 36)]
    FundingLocked(FundingLocked),

    #[api(type = 38)]
    Shutdown(Shutdown),

    #[api(type = 39)]
    ClosingSigned(ClosingSigned),

    // 2. Channel operations
    // ---------------------
    #[api(type = 128)]
    UpdateAddHtlc(UpdateAddHtlc),

    #[api(type = 130)]
    UpdateFulfillHtlc(UpdateFulfillHtlc),

    #[api(type = 131)]
    UpdateFailHtlc(UpdateFailHtlc),

    #[api(type = 135)]
    UpdateFailMalformedHtlc(UpdateFailMalformedHtlc),

    #[api(type = 132)]
    CommitmentSigned(CommitmentSigned),

    #[api(type = 133)]
    RevokeAndAck(RevokeAndAck),

    #[api(type = 134)]
    UpdateFee(UpdateFee),

    #[api(type = 136)]
    ChannelReestablish(ChannelReestablish),

    // Part III. Gossip protocol (BOLT-7), needed only to announce a channel
    // once it has reached NORMAL operation and both peers agreed to announce it
    // ==========================================================================
    #[api(type = 259)]
    AnnouncementSignatures(AnnouncementSignatures),
}

impl LightningEncode for Messages {
    fn lightning_encode<E: io::Write>(
        &self,
        e: E,
    ) -> Result<usize, lightning_encoding::Error> {
        Payload::from(self.clone()).lightning_encode(e)
    }
}

impl LightningDecode for Messages {
    fn lightning_decode<D: io::Read>(
        d: D,
    ) -> Result<Self, lightning_encoding::Error> {
        let message = &*LNP2P_BOLT_UNMARSHALLER
            .unmarshall(&Vec::<u8>::lightning_decode(d)?)
            .map_err(|_| {
                lightning_encoding::Error::DataIntegrityError(s!(
                    "can't unmarshall LMP message"
                ))
            })?;
        Ok(message.clone())
    }
}
