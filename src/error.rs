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

use crate::funding::Error as FundingError;
use crate::policy::PolicyError;

/// Top-level error produced by any commitments-engine entry point or by the
/// state controller while driving the channel. Every fallible operation in
/// this crate returns this type rather than panicking; the controller
/// (`crate::channel`) is the only place that turns an `Err` into a
/// unilateral-close transition, per the channel's exception policy.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Error {
    /// channel parameters proposed by the remote peer violate local policy:
    /// {0}
    #[from]
    Policy(PolicyError),

    /// funding transaction data are inconsistent: {0}
    #[from]
    Funding(FundingError),

    /// HTLC #{htlc_id} amount {amount_msat} msat is below the htlc_minimum_msat
    /// of {minimum_msat} msat agreed for this channel
    HtlcBelowMinimum {
        htlc_id: u64,
        amount_msat: u64,
        minimum_msat: u64,
    },

    /// adding HTLC #{htlc_id} would push the in-flight HTLC total to
    /// {proposed_total_msat} msat, exceeding max_htlc_value_in_flight_msat of
    /// {allowed_maximum_msat} msat
    HtlcValueInFlightExceeded {
        htlc_id: u64,
        proposed_total_msat: u64,
        allowed_maximum_msat: u64,
    },

    /// adding HTLC #{htlc_id} would push the number of in-flight HTLCs to
    /// {proposed_count}, exceeding max_accepted_htlcs of {allowed_maximum}
    HtlcCountExceeded {
        htlc_id: u64,
        proposed_count: usize,
        allowed_maximum: u16,
    },

    /// adding HTLC #{htlc_id} would leave our balance below the peer's
    /// channel_reserve_satoshis plus the commitment fee
    HtlcBreachesReserve { htlc_id: u64 },

    /// peer used htlc_id {provided} in `update_add_htlc` while we expected
    /// {expected}
    HtlcIdOutOfOrder { provided: u64, expected: u64 },

    /// no offered HTLC with id {0} found in the current remote commitment
    /// while processing a fulfill or fail
    UnknownHtlc(u64),

    /// preimage provided for HTLC #{0} does not hash to the HTLC's
    /// `payment_hash`
    PreimageMismatch(u64),

    /// cannot sign the peer's next commitment: a previous `commit_sig` is
    /// still awaiting `revoke_and_ack`
    CommitmentSignInFlight,

    /// received `commit_sig` carries an invalid signature over the local
    /// commitment transaction or one of its HTLC outputs
    InvalidCommitmentSignature,

    /// received `revoke_and_ack` reveals a per-commitment secret that does
    /// not hash to the previously announced per-commitment point
    InvalidRevocationSecret,

    /// received `revoke_and_ack` while no commitment was awaiting revocation
    NoCommitmentToRevoke,

    /// peer sent `update_add_htlc`/`shutdown` that is illegal in the current
    /// channel stage: {0}
    UnexpectedMessage(String),

    /// local command rejected: {0}
    CommandRejected(String),

    /// remote peer reported a protocol error: {0}
    RemoteError(String),

    /// a funding-spend event was observed whose transaction matches neither
    /// our commitment, the current remote commitment, the next remote
    /// commitment, nor a recognizable revoked commitment
    InformationLeak,

    /// closing transaction construction or fee negotiation failed: {0}
    Closing(String),

    /// offered or received HTLC #{0} has passed its `cltv_expiry` without
    /// being settled, forcing a unilateral close
    HtlcTimedOut(u64),
}

impl Error {
    /// `true` for faults that must be escalated to `handle_local_error`
    /// (emit `error` to peer, then `spend_local_current`) rather than merely
    /// reported back to the local caller, per the channel's exception
    /// policy.
    pub fn is_protocol_fault(&self) -> bool {
        !matches!(self, Error::CommandRejected(_))
    }
}
