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

//! The channel's lifecycle as a single tagged sum type: each state carries
//! exactly the data that exists while the channel is in it (spec §9 "State +
//! data pairing"). `crate::channel` is the only code that matches on
//! `ChannelState` directly; everything else works against `Commitments` or
//! the per-state data structs.

use lnp2p::bolt::{
    ActiveChannelId, ChannelId, Messages, ShortChannelId, TempChannelId,
};

use crate::closing::ClosingOutcomes;
use crate::commitments::Commitments;
use crate::keyset::{LocalKeyset, RemoteKeyset};
use crate::policy::{CommonParams, PeerParams};

/// Data common to every pre-`FUNDING_SIGNED` state: what we proposed or
/// accepted before a `Commitments` exists to hold it.
#[derive(Clone, Debug)]
pub struct DataOpening {
    pub is_originator: bool,
    pub active_channel_id: ActiveChannelId,
    pub local_params: PeerParams,
    pub common_params: CommonParams,
    pub local_keys: LocalKeyset,
    pub local_per_commitment_seed: [u8; 32],
    pub funding_satoshis: u64,
    pub push_msat: u64,
    pub remote_params: Option<PeerParams>,
    pub remote_keys: Option<RemoteKeyset>,
    /// The last message we sent in this state, replayed verbatim if the
    /// connection drops before the peer acknowledges it (spec §4.8). `None`
    /// in the fundee's `WAIT_FOR_OPEN_CHANNEL`, the one pre-`FUNDING_SIGNED`
    /// state that has not sent anything yet.
    pub last_sent: Option<Messages>,
}

/// `WAIT_FOR_FUNDING_SIGNED`: the funder has sent `funding_created` and is
/// waiting for the matching `funding_signed`; we already know the real
/// `channel_id` derived from the funding outpoint.
#[derive(Clone, Debug)]
pub struct DataWaitForFundingSigned {
    pub opening: DataOpening,
    pub channel_id: ChannelId,
    pub commit_input: crate::commitments::CommitInput,
    /// The unsigned funding transaction, needed by the funder to publish it
    /// once `funding_signed` arrives; unused by the fundee, who never
    /// broadcasts it.
    pub funding_tx: bitcoin::Transaction,
    /// Our own first local commitment transaction, missing only the peer's
    /// signature that `funding_signed` supplies.
    pub local_commit_tx: bitcoin::Transaction,
    /// The peer's first commitment, which we already signed ourselves when
    /// we emitted `funding_created`/`funding_signed`.
    pub remote_commit: crate::commitments::Commitment,
}

/// `WAIT_FOR_FUNDING_CONFIRMED`: both signatures are in and we are watching
/// the chain for `minimum_depth` confirmations.
#[derive(Clone, Debug)]
pub struct DataWaitForFundingConfirmed {
    pub commitments: Commitments,
    /// `funding_locked` received from the peer before we reached depth;
    /// BOLT-2 permits this and we must hold it rather than reject it.
    pub deferred_funding_locked: Option<lnp2p::bolt::FundingLocked>,
    /// Carried from `DataOpening::common_params.announce_channel` since
    /// `Commitments` has no room for it: whether both sides agreed to make
    /// this channel public once it reaches `NORMAL` (spec §4.2
    /// "Announcement").
    pub announce_channel: bool,
    /// Carried from `DataOpening::common_params.minimum_depth`, needed again
    /// once depth is reached to arm `WATCH_LOST` at the same depth (spec
    /// §4.2 funding confirmation).
    pub minimum_depth: u32,
}

/// `WAIT_FOR_FUNDING_LOCKED`: depth was reached, we have sent our own
/// `funding_locked` and are waiting for the peer's.
#[derive(Clone, Debug)]
pub struct DataWaitForFundingLocked {
    pub commitments: Commitments,
    pub announce_channel: bool,
    /// Known as soon as the funding transaction reaches `minimum_depth`;
    /// carried forward so it is available once the channel reaches `NORMAL`
    /// or `WAIT_FOR_ANN_SIGNATURES` without re-deriving it from the watcher.
    pub short_channel_id: ShortChannelId,
}

/// `WAIT_FOR_ANN_SIGNATURES`: channel is usable but the public announcement,
/// if requested, has not yet exchanged `announcement_signatures`.
#[derive(Clone, Debug)]
pub struct DataWaitForAnnouncementSignatures {
    pub commitments: Commitments,
    pub short_channel_id: ShortChannelId,
    pub local_announcement_signature: bitcoin::secp256k1::ecdsa::Signature,
}

/// `NORMAL`: the channel is fully operational (spec §4.4).
#[derive(Clone, Debug)]
pub struct DataNormal {
    pub commitments: Commitments,
    pub short_channel_id: Option<ShortChannelId>,
    pub announced: bool,
}

/// `SHUTDOWN`: a mutual close has been requested but HTLCs may still be
/// in-flight and must drain before fee negotiation can start (spec §4.5).
#[derive(Clone, Debug)]
pub struct DataShutdown {
    pub commitments: Commitments,
    pub local_shutdown_script: bitcoin_scripts::PubkeyScript,
    pub remote_shutdown_script: Option<bitcoin_scripts::PubkeyScript>,
}

/// `NEGOTIATING`: both `shutdown` messages have been exchanged and all HTLCs
/// have drained; `closing_signed` fee negotiation is under way (spec §4.6).
#[derive(Clone, Debug)]
pub struct DataNegotiating {
    pub commitments: Commitments,
    pub local_shutdown_script: bitcoin_scripts::PubkeyScript,
    pub remote_shutdown_script: bitcoin_scripts::PubkeyScript,
    pub last_sent_fee: Option<u64>,
    pub last_received_fee: Option<u64>,
}

/// `CLOSING`: some closing transaction is broadcast and we are unwinding the
/// remaining outputs as it (or a competing transaction) confirms (spec
/// §4.7).
#[derive(Clone, Debug)]
pub struct DataClosing {
    pub commitments: Commitments,
    pub outcomes: ClosingOutcomes,
    /// Number of `WATCH_CONFIRMED` requests still outstanding before the
    /// channel can be declared fully settled (spec §4.7): the published
    /// settling transaction itself plus one per second-stage claim. A
    /// `CloseDone` confirmation bypasses this counter entirely, since a
    /// mutual close has no second-stage claims to wait on.
    pub pending_confirmations: u32,
}

/// `OFFLINE`: the peer connection dropped. Wraps whichever pre-`OFFLINE`
/// state the channel was in, so reconnection (spec §4.8) can resume from
/// exactly where it left off and replay the right unacknowledged messages.
#[derive(Clone, Debug)]
pub struct DataOffline {
    pub prior_state: Box<ChannelState>,
}

/// The channel's lifecycle, tagged with exactly the data live in that state.
/// Variant names mirror the BOLT-2 state machine by name (spec §4.1, §9).
#[derive(Clone, Debug)]
pub enum ChannelState {
    WaitForInitInternal(DataOpening),
    WaitForOpenChannel(DataOpening),
    WaitForAcceptChannel(DataOpening),
    WaitForFundingCreated(DataOpening),
    WaitForFundingInternal(DataOpening),
    WaitForFundingSigned(DataWaitForFundingSigned),
    WaitForFundingConfirmed(DataWaitForFundingConfirmed),
    WaitForFundingLocked(DataWaitForFundingLocked),
    WaitForAnnouncementSignatures(DataWaitForAnnouncementSignatures),
    Normal(DataNormal),
    Shutdown(DataShutdown),
    Negotiating(DataNegotiating),
    Closing(DataClosing),
    Closed,
    Offline(DataOffline),
    ErrInformationLeak,
    ErrFundingLost,
}

impl ChannelState {
    /// The state's BOLT-style name, used for logging and `CMD_GETSTATE`
    /// (spec §6).
    pub fn name(&self) -> &'static str {
        match self {
            ChannelState::WaitForInitInternal(_) => "WAIT_FOR_INIT_INTERNAL",
            ChannelState::WaitForOpenChannel(_) => "WAIT_FOR_OPEN_CHANNEL",
            ChannelState::WaitForAcceptChannel(_) => "WAIT_FOR_ACCEPT_CHANNEL",
            ChannelState::WaitForFundingCreated(_) => "WAIT_FOR_FUNDING_CREATED",
            ChannelState::WaitForFundingInternal(_) => "WAIT_FOR_FUNDING_INTERNAL",
            ChannelState::WaitForFundingSigned(_) => "WAIT_FOR_FUNDING_SIGNED",
            ChannelState::WaitForFundingConfirmed(_) => "WAIT_FOR_FUNDING_CONFIRMED",
            ChannelState::WaitForFundingLocked(_) => "WAIT_FOR_FUNDING_LOCKED",
            ChannelState::WaitForAnnouncementSignatures(_) => "WAIT_FOR_ANN_SIGNATURES",
            ChannelState::Normal(_) => "NORMAL",
            ChannelState::Shutdown(_) => "SHUTDOWN",
            ChannelState::Negotiating(_) => "NEGOTIATING",
            ChannelState::Closing(_) => "CLOSING",
            ChannelState::Closed => "CLOSED",
            ChannelState::Offline(_) => "OFFLINE",
            ChannelState::ErrInformationLeak => "ERR_INFORMATION_LEAK",
            ChannelState::ErrFundingLost => "ERR_FUNDING_LOST",
        }
    }

    /// The channel's commitment engine, where the state carries one (every
    /// state from `WAIT_FOR_FUNDING_CONFIRMED` onward except the terminal
    /// error/closed states and `OFFLINE`, which defers to its wrapped state).
    pub fn commitments(&self) -> Option<&Commitments> {
        match self {
            ChannelState::WaitForFundingConfirmed(data) => Some(&data.commitments),
            ChannelState::WaitForFundingLocked(data) => Some(&data.commitments),
            ChannelState::WaitForAnnouncementSignatures(data) => Some(&data.commitments),
            ChannelState::Normal(data) => Some(&data.commitments),
            ChannelState::Shutdown(data) => Some(&data.commitments),
            ChannelState::Negotiating(data) => Some(&data.commitments),
            ChannelState::Closing(data) => Some(&data.commitments),
            ChannelState::Offline(data) => data.prior_state.commitments(),
            _ => None,
        }
    }

    pub fn commitments_mut(&mut self) -> Option<&mut Commitments> {
        match self {
            ChannelState::WaitForFundingConfirmed(data) => Some(&mut data.commitments),
            ChannelState::WaitForFundingLocked(data) => Some(&mut data.commitments),
            ChannelState::WaitForAnnouncementSignatures(data) => Some(&mut data.commitments),
            ChannelState::Normal(data) => Some(&mut data.commitments),
            ChannelState::Shutdown(data) => Some(&mut data.commitments),
            ChannelState::Negotiating(data) => Some(&mut data.commitments),
            ChannelState::Closing(data) => Some(&mut data.commitments),
            ChannelState::Offline(data) => data.prior_state.commitments_mut(),
            _ => None,
        }
    }

    /// `true` once the temporary channel id has been superseded by the final
    /// one derived from the funding outpoint.
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            ChannelState::WaitForFundingSigned(data) => Some(data.channel_id),
            other => other.commitments().map(|c| c.channel_id),
        }
    }

    pub fn temp_channel_id(&self) -> Option<TempChannelId> {
        match self {
            ChannelState::WaitForInitInternal(data)
            | ChannelState::WaitForOpenChannel(data)
            | ChannelState::WaitForAcceptChannel(data)
            | ChannelState::WaitForFundingCreated(data)
            | ChannelState::WaitForFundingInternal(data) => data.active_channel_id.temp_channel_id(),
            ChannelState::Offline(data) => data.prior_state.temp_channel_id(),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChannelState::Closed | ChannelState::ErrInformationLeak | ChannelState::ErrFundingLost
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn state_name_matches_bolt_identifier() {
        assert_eq!(ChannelState::Normal(dumb_normal()).name(), "NORMAL");
        assert_eq!(ChannelState::Closed.name(), "CLOSED");
    }

    #[test]
    fn terminal_states_are_recognized() {
        assert!(ChannelState::Closed.is_terminal());
        assert!(ChannelState::ErrInformationLeak.is_terminal());
        assert!(!ChannelState::Normal(dumb_normal()).is_terminal());
    }

    fn dumb_normal() -> DataNormal {
        use amplify::DumbDefault;
        use crate::commitments::{
            ChangeStream, CommitInput, Commitment, CommitmentSpec, RemoteCommitInfo,
        };
        use crate::keyset::{LocalKeyset, RemoteKeyset};
        use crate::shachain::ShaChainStore;
        use bitcoin::hashes::Hash;

        let local_keys = LocalKeyset::dumb_default();
        let remote_keys = RemoteKeyset::dumb_default();
        let spec = CommitmentSpec::new(1_000_000, 1_000_000);
        let commit = Commitment {
            index: 0,
            tx: bitcoin::Transaction {
                version: 2,
                lock_time: bitcoin::PackedLockTime::ZERO,
                input: vec![],
                output: vec![],
            },
            sig: deterministic_sig_for_test(),
            htlc_sigs: vec![],
            spec,
            per_commitment_point: remote_keys.first_per_commitment_point,
        };
        let commitments = Commitments {
            channel_id: ChannelId::default(),
            is_originator: true,
            obscuring_factor: 0,
            local_commit: commit.clone(),
            remote_commit: commit,
            remote_next_commit_info: RemoteCommitInfo::Point(remote_keys.first_per_commitment_point),
            local_changes: ChangeStream::default(),
            remote_changes: ChangeStream::default(),
            local_next_htlc_id: 0,
            remote_next_htlc_id: 0,
            unacked_messages: vec![],
            commit_input: CommitInput {
                funding_txid: bitcoin::Txid::all_zeros(),
                funding_output_index: 0,
                amount_sat: 10_000_000,
            },
            per_commitment_secrets: ShaChainStore::new(),
            local_params: PeerParams::default(),
            remote_params: PeerParams::default(),
            local_keys,
            remote_keys,
            local_per_commitment_seed: [7u8; 32],
        };
        DataNormal { commitments, short_channel_id: None, announced: false }
    }

    fn deterministic_sig_for_test() -> bitcoin::secp256k1::ecdsa::Signature {
        use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
        let msg = Message::from_slice(&[3u8; 32]).unwrap();
        let key = SecretKey::from_slice(&[1u8; 32]).unwrap();
        Secp256k1::signing_only().sign_ecdsa(&msg, &key)
    }
}
