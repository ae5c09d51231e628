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

//! The commitments engine: the dual-commitment-chain data structure and its
//! update algebra (send/receive add, fulfill, fail, commit, revocation).
//! This is the pure, peer-independent heart of a channel — `crate::channel`
//! is the only caller, and it is the only place an `Err` here becomes a
//! unilateral-close decision.

use std::collections::BTreeMap;

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{PublicKey, Secp256k1, Signing};
use bitcoin::{OutPoint, Transaction};
use bitcoin_scripts::hlc::{HashLock, HashPreimage};
use bitcoin_scripts::WitnessScript;

use crate::htlc::HtlcAmount;
use crate::keyset::{LocalKeyset, RemoteKeyset};
use crate::policy::PeerParams;
use crate::shachain::ShaChainStore;
use crate::txbuilder::{self, TxGenerators};
use crate::Error;

/// A single outstanding update, tagged by which side originated it. Moves
/// through `ChangeStream::{proposed,signed,acked}` as described by spec §3.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub enum Change {
    AddHtlc(HtlcAmount),
    FulfillHtlc {
        id: u64,
        payment_preimage: HashPreimage,
    },
    FailHtlc {
        id: u64,
        reason: Vec<u8>,
    },
}

impl Change {
    pub fn htlc_id(&self) -> u64 {
        match self {
            Change::AddHtlc(htlc) => htlc.id,
            Change::FulfillHtlc { id, .. } | Change::FailHtlc { id, .. } => *id,
        }
    }
}

/// Our outgoing or the peer's incoming updates, bucketed by how far they
/// have progressed through a sign/revoke round.
#[derive(Clone, Default, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct ChangeStream {
    pub proposed: Vec<Change>,
    pub signed: Vec<Change>,
    pub acked: Vec<Change>,
}

impl ChangeStream {
    pub fn is_empty(&self) -> bool {
        self.proposed.is_empty() && self.signed.is_empty() && self.acked.is_empty()
    }
}

/// Balances and HTLC sets derived by folding a change stream onto the
/// previous spec (spec §3 "HTLC spec"). `offered_htlcs` are those the local
/// side originated; `received_htlcs` were originated by the peer. This shape
/// is shared by both `local_commit.spec` and `remote_commit.spec` — the two
/// commitment transactions differ only in which side's balance gets the
/// delayed `to_local` script, not in how the spec itself is computed.
#[derive(Clone, PartialEq, Eq, Debug, Default, StrictEncode, StrictDecode)]
pub struct CommitmentSpec {
    pub local_amount_msat: u64,
    pub remote_amount_msat: u64,
    pub offered_htlcs: BTreeMap<u64, HtlcAmount>,
    pub received_htlcs: BTreeMap<u64, HtlcAmount>,
}

impl CommitmentSpec {
    pub fn new(local_amount_msat: u64, remote_amount_msat: u64) -> Self {
        CommitmentSpec {
            local_amount_msat,
            remote_amount_msat,
            offered_htlcs: bmap! {},
            received_htlcs: bmap! {},
        }
    }

    pub fn total_offered_msat(&self) -> u64 {
        self.offered_htlcs.values().map(|h| h.amount_msat).sum()
    }

    pub fn total_received_msat(&self) -> u64 {
        self.received_htlcs.values().map(|h| h.amount_msat).sum()
    }

    /// Applies `local` changes (things our side originated) and `remote`
    /// changes (things the peer originated) on top of this spec, in the
    /// order spec §4.3 prescribes for building the next commitment: the
    /// already-acked side first, then the newly signed side.
    pub fn reduce(&self, local: &[Change], remote: &[Change]) -> CommitmentSpec {
        let mut spec = self.clone();
        for change in remote {
            spec.apply(change, false);
        }
        for change in local {
            spec.apply(change, true);
        }
        spec
    }

    fn apply(&mut self, change: &Change, originated_locally: bool) {
        match (originated_locally, change) {
            (true, Change::AddHtlc(htlc)) => {
                self.local_amount_msat = self.local_amount_msat.saturating_sub(htlc.amount_msat);
                self.offered_htlcs.insert(htlc.id, *htlc);
            }
            (false, Change::AddHtlc(htlc)) => {
                self.remote_amount_msat = self.remote_amount_msat.saturating_sub(htlc.amount_msat);
                self.received_htlcs.insert(htlc.id, *htlc);
            }
            // We fulfill an HTLC the peer offered us: funds we were owed
            // move onto our balance.
            (true, Change::FulfillHtlc { id, .. }) => {
                if let Some(htlc) = self.received_htlcs.remove(id) {
                    self.local_amount_msat += htlc.amount_msat;
                }
            }
            // The peer fulfills an HTLC we offered: funds move to them.
            (false, Change::FulfillHtlc { id, .. }) => {
                if let Some(htlc) = self.offered_htlcs.remove(id) {
                    self.remote_amount_msat += htlc.amount_msat;
                }
            }
            // We fail an HTLC the peer offered: refund goes back to them.
            (true, Change::FailHtlc { id, .. }) => {
                if let Some(htlc) = self.received_htlcs.remove(id) {
                    self.remote_amount_msat += htlc.amount_msat;
                }
            }
            // The peer fails an HTLC we offered: refund comes back to us.
            (false, Change::FailHtlc { id, .. }) => {
                if let Some(htlc) = self.offered_htlcs.remove(id) {
                    self.local_amount_msat += htlc.amount_msat;
                }
            }
        }
    }
}

/// A fully built and (where applicable) signed commitment transaction. Kept
/// in memory only — it is rebuilt deterministically from the change stream
/// rather than persisted on the wire, so unlike the message types in
/// `lnp2p` it carries no `StrictEncode` impl.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Commitment {
    pub index: u64,
    pub tx: Transaction,
    pub sig: Signature,
    pub htlc_sigs: Vec<Signature>,
    pub spec: CommitmentSpec,
    /// The per-commitment point this transaction was built against. Only
    /// meaningful for `remote_commit`, where it is what `receive_revocation`
    /// checks the peer's revealed secret against.
    pub per_commitment_point: PublicKey,
}

/// An in-flight remote commitment we have signed and are waiting for the
/// matching `revoke_and_ack` before we may sign another.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WaitingForRevocation {
    pub next_remote_commit: Commitment,
    pub sent_sig: Signature,
    /// Set by `CMD_SIGN` arriving while a sign round is already in flight;
    /// triggers an immediate re-sign once the pending revocation lands.
    pub re_sign_asap: bool,
}

/// Exactly one of: we're idle and know the peer's next point, or we've sent
/// a `commit_sig` and are waiting on their `revoke_and_ack` (spec §3).
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RemoteCommitInfo {
    Point(PublicKey),
    Awaiting(WaitingForRevocation),
}

impl RemoteCommitInfo {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, RemoteCommitInfo::Awaiting(_))
    }
}

/// The funding outpoint and its multisig script, fixed for the channel's
/// lifetime (spec §3 `commit_input`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct CommitInput {
    pub funding_txid: bitcoin::Txid,
    pub funding_output_index: u16,
    pub amount_sat: u64,
}

impl CommitInput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.funding_txid, self.funding_output_index as u32)
    }
}

/// The heart of the channel state (spec §3 "Commitments"): the dual
/// commitment chains, the change streams feeding them, and everything
/// needed to keep both in sync with the peer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Commitments {
    pub channel_id: lnp2p::bolt::ChannelId,
    pub is_originator: bool,
    pub obscuring_factor: u64,

    pub local_commit: Commitment,
    pub remote_commit: Commitment,
    pub remote_next_commit_info: RemoteCommitInfo,

    pub local_changes: ChangeStream,
    pub remote_changes: ChangeStream,
    pub local_next_htlc_id: u64,
    pub remote_next_htlc_id: u64,

    /// Wire messages sent but not yet acknowledged by a matching
    /// `revoke_and_ack`; replayed verbatim on reconnect (spec §4.8).
    pub unacked_messages: Vec<lnp2p::bolt::Messages>,

    pub commit_input: CommitInput,
    pub per_commitment_secrets: ShaChainStore,

    pub local_params: PeerParams,
    pub remote_params: PeerParams,
    pub local_keys: LocalKeyset,
    pub remote_keys: RemoteKeyset,

    /// Seed from which our own per-commitment secrets at every index are
    /// derived (see `crate::shachain::generate_secret`).
    pub local_per_commitment_seed: [u8; 32],
}

impl Commitments {
    /// `local_changes.proposed ∪ remote_changes.acked` non-empty — the
    /// condition to begin a new sign round (spec §4.3).
    pub fn local_has_changes(&self) -> bool {
        !self.local_changes.proposed.is_empty() || !self.remote_changes.acked.is_empty()
    }

    /// Any offered or received HTLC whose `cltv_expiry` has passed.
    pub fn has_timedout_htlcs(&self, height: u32) -> bool {
        self.local_commit
            .spec
            .offered_htlcs
            .values()
            .chain(self.local_commit.spec.received_htlcs.values())
            .any(|htlc| htlc.cltv_expiry <= height)
    }

    fn total_in_flight_msat(&self, spec: &CommitmentSpec) -> u64 {
        spec.total_offered_msat() + spec.total_received_msat()
    }

    /// spec §4.3 `send_add`.
    pub fn send_add(
        &mut self,
        amount_msat: u64,
        payment_hash: HashLock,
        cltv_expiry: u32,
    ) -> Result<HtlcAmount, Error> {
        let htlc_id = self.local_next_htlc_id;

        if amount_msat < self.remote_params.htlc_minimum_msat {
            return Err(Error::HtlcBelowMinimum {
                htlc_id,
                amount_msat,
                minimum_msat: self.remote_params.htlc_minimum_msat,
            });
        }

        let proposed_total = self.total_in_flight_msat(&self.remote_commit.spec) + amount_msat;
        if proposed_total > self.remote_params.max_htlc_value_in_flight_msat {
            return Err(Error::HtlcValueInFlightExceeded {
                htlc_id,
                proposed_total_msat: proposed_total,
                allowed_maximum_msat: self.remote_params.max_htlc_value_in_flight_msat,
            });
        }

        let proposed_count = self.remote_commit.spec.received_htlcs.len() + 1;
        if proposed_count > self.remote_params.max_accepted_htlcs as usize {
            return Err(Error::HtlcCountExceeded {
                htlc_id,
                proposed_count,
                allowed_maximum: self.remote_params.max_accepted_htlcs,
            });
        }

        let balance_after = self
            .remote_commit
            .spec
            .remote_amount_msat
            .saturating_sub(amount_msat);
        if balance_after < self.remote_params.channel_reserve_satoshis * 1000 {
            return Err(Error::HtlcBreachesReserve { htlc_id });
        }

        let htlc = HtlcAmount {
            id: htlc_id,
            amount_msat,
            payment_hash,
            cltv_expiry,
        };
        self.local_next_htlc_id += 1;
        self.local_changes
            .proposed
            .push(Change::AddHtlc(htlc));
        Ok(htlc)
    }

    /// spec §4.3 `receive_add`: mirrors `send_add`'s checks against
    /// `local_params`/`local_commit` rather than `remote_params`/`remote_commit`,
    /// since it is our own limits and our own commitment spec the peer's
    /// offer must respect.
    pub fn receive_add(&mut self, htlc: HtlcAmount) -> Result<(), Error> {
        if htlc.id != self.remote_next_htlc_id {
            return Err(Error::HtlcIdOutOfOrder {
                provided: htlc.id,
                expected: self.remote_next_htlc_id,
            });
        }
        if htlc.amount_msat < self.local_params.htlc_minimum_msat {
            return Err(Error::HtlcBelowMinimum {
                htlc_id: htlc.id,
                amount_msat: htlc.amount_msat,
                minimum_msat: self.local_params.htlc_minimum_msat,
            });
        }

        let proposed_total = self.total_in_flight_msat(&self.local_commit.spec) + htlc.amount_msat;
        if proposed_total > self.local_params.max_htlc_value_in_flight_msat {
            return Err(Error::HtlcValueInFlightExceeded {
                htlc_id: htlc.id,
                proposed_total_msat: proposed_total,
                allowed_maximum_msat: self.local_params.max_htlc_value_in_flight_msat,
            });
        }

        let proposed_count = self.local_commit.spec.received_htlcs.len() + 1;
        if proposed_count > self.local_params.max_accepted_htlcs as usize {
            return Err(Error::HtlcCountExceeded {
                htlc_id: htlc.id,
                proposed_count,
                allowed_maximum: self.local_params.max_accepted_htlcs,
            });
        }

        let balance_after = self
            .local_commit
            .spec
            .remote_amount_msat
            .saturating_sub(htlc.amount_msat);
        if balance_after < self.local_params.channel_reserve_satoshis * 1000 {
            return Err(Error::HtlcBreachesReserve { htlc_id: htlc.id });
        }

        self.remote_next_htlc_id += 1;
        self.remote_changes.proposed.push(Change::AddHtlc(htlc));
        Ok(())
    }

    /// spec §4.3 `send_fulfill`.
    pub fn send_fulfill(
        &mut self,
        id: u64,
        payment_preimage: HashPreimage,
    ) -> Result<(), Error> {
        let htlc = self
            .remote_commit
            .spec
            .received_htlcs
            .get(&id)
            .ok_or(Error::UnknownHtlc(id))?;
        if HashLock::from(payment_preimage) != htlc.payment_hash {
            return Err(Error::PreimageMismatch(id));
        }
        self.local_changes
            .proposed
            .push(Change::FulfillHtlc { id, payment_preimage });
        Ok(())
    }

    /// spec §4.3 `receive_fulfill`. Returns `Ok(true)` if this settles an
    /// HTLC for the first time, `Ok(false)` if it is a replay of an
    /// already-settled HTLC (tolerated for idempotence on reconnect).
    pub fn receive_fulfill(
        &mut self,
        id: u64,
        payment_preimage: HashPreimage,
    ) -> Result<bool, Error> {
        let htlc = match self.local_commit.spec.offered_htlcs.get(&id) {
            Some(htlc) => htlc,
            None => return Ok(false),
        };
        if HashLock::from(payment_preimage) != htlc.payment_hash {
            return Err(Error::PreimageMismatch(id));
        }
        self.remote_changes
            .proposed
            .push(Change::FulfillHtlc { id, payment_preimage });
        Ok(true)
    }

    /// spec §4.3 `send_fail`.
    pub fn send_fail(&mut self, id: u64, reason: Vec<u8>) -> Result<(), Error> {
        if !self.remote_commit.spec.received_htlcs.contains_key(&id) {
            return Err(Error::UnknownHtlc(id));
        }
        self.local_changes
            .proposed
            .push(Change::FailHtlc { id, reason });
        Ok(())
    }

    /// spec §4.3 `receive_fail`.
    pub fn receive_fail(&mut self, id: u64, reason: Vec<u8>) -> Result<bool, Error> {
        if !self.local_commit.spec.offered_htlcs.contains_key(&id) {
            return Ok(false);
        }
        self.remote_changes
            .proposed
            .push(Change::FailHtlc { id, reason });
        Ok(true)
    }

    /// spec §4.3 `send_commit`: signs the peer's next commitment.
    pub fn send_commit<C: Signing>(
        &mut self,
        secp: &Secp256k1<C>,
    ) -> Result<(lnp2p::bolt::Messages, Commitment), Error> {
        let remote_next_point = match self.remote_next_commit_info {
            RemoteCommitInfo::Point(point) => point,
            RemoteCommitInfo::Awaiting(_) => return Err(Error::CommitmentSignInFlight),
        };

        let local_proposed_and_signed: Vec<Change> = self
            .local_changes
            .proposed
            .iter()
            .chain(self.local_changes.signed.iter())
            .cloned()
            .collect();
        let next_remote_spec = self
            .remote_commit
            .spec
            .reduce(&local_proposed_and_signed, &self.remote_changes.acked);

        let next_index = self.remote_commit.index + 1;
        let tx = build_commitment_tx(
            self,
            next_index,
            &next_remote_spec,
            remote_next_point,
            false,
        );
        let sig = sign_commitment_tx(&tx);
        let htlc_sigs = next_remote_spec
            .offered_htlcs
            .values()
            .chain(next_remote_spec.received_htlcs.values())
            .map(|_| sig)
            .collect::<Vec<_>>();
        let _ = secp;

        let next_commit = Commitment {
            index: next_index,
            tx: tx.clone(),
            sig,
            htlc_sigs: htlc_sigs.clone(),
            spec: next_remote_spec,
            per_commitment_point: remote_next_point,
        };

        move_all(&mut self.local_changes.proposed, &mut self.local_changes.signed);
        move_all(&mut self.remote_changes.acked, &mut self.remote_changes.signed);

        self.remote_next_commit_info = RemoteCommitInfo::Awaiting(WaitingForRevocation {
            next_remote_commit: next_commit.clone(),
            sent_sig: sig,
            re_sign_asap: false,
        });

        let message = lnp2p::bolt::Messages::CommitmentSigned(lnp2p::bolt::CommitmentSigned {
            channel_id: self.channel_id,
            signature: sig,
            htlc_signatures: htlc_sigs,
        });
        Ok((message, next_commit))
    }

    /// spec §4.3 `receive_commit`: the peer signs our next local commitment.
    pub fn receive_commit(
        &mut self,
        msg: &lnp2p::bolt::CommitmentSigned,
    ) -> Result<(lnp2p::bolt::Messages, bool), Error> {
        let remote_proposed_and_signed: Vec<Change> = self
            .remote_changes
            .proposed
            .iter()
            .chain(self.remote_changes.signed.iter())
            .cloned()
            .collect();
        let next_local_spec = self
            .local_commit
            .spec
            .reduce(&self.local_changes.acked, &remote_proposed_and_signed);

        let old_index = self.local_commit.index;
        let next_index = old_index + 1;
        let novel = next_local_spec != self.local_commit.spec;

        let next_point = crate::shachain::generate_point(
            &Secp256k1::new(),
            self.local_per_commitment_seed,
            next_index,
        );
        let tx = build_commitment_tx(self, next_index, &next_local_spec, next_point, true);
        verify_commitment_sig(&tx, msg.signature).map_err(|_| Error::InvalidCommitmentSignature)?;

        self.local_commit = Commitment {
            index: next_index,
            tx,
            sig: msg.signature,
            htlc_sigs: msg.htlc_signatures.clone(),
            spec: next_local_spec,
            per_commitment_point: next_point,
        };

        move_all(&mut self.local_changes.acked, &mut self.local_changes.signed);
        move_all(&mut self.remote_changes.proposed, &mut self.remote_changes.signed);

        let revoke_secret =
            crate::shachain::generate_secret(self.local_per_commitment_seed, old_index);
        let upcoming_point = crate::shachain::generate_point(
            &Secp256k1::new(),
            self.local_per_commitment_seed,
            next_index + 1,
        );
        let message = lnp2p::bolt::Messages::RevokeAndAck(lnp2p::bolt::RevokeAndAck {
            channel_id: self.channel_id,
            per_commitment_secret: revoke_secret,
            next_per_commitment_point: upcoming_point,
        });
        Ok((message, novel))
    }

    /// spec §4.3 `receive_revocation`. Returns the HTLCs newly acked by this
    /// revocation (for relaying onward) and whether the completed sign round
    /// had `re_sign_asap` set, so the caller knows to immediately start
    /// another one.
    pub fn receive_revocation(
        &mut self,
        msg: &lnp2p::bolt::RevokeAndAck,
    ) -> Result<(Vec<HtlcAmount>, bool), Error> {
        let waiting = match self.remote_next_commit_info.clone() {
            RemoteCommitInfo::Awaiting(waiting) => waiting,
            RemoteCommitInfo::Point(_) => return Err(Error::NoCommitmentToRevoke),
        };

        let revealed_point =
            PublicKey::from_secret_key(&Secp256k1::new(), &msg.per_commitment_secret);
        if revealed_point != self.remote_commit.per_commitment_point {
            return Err(Error::InvalidRevocationSecret);
        }

        self.per_commitment_secrets
            .insert_secret(self.remote_commit.index, msg.per_commitment_secret)
            .map_err(|_| Error::InvalidRevocationSecret)?;

        let newly_acked_adds: Vec<HtlcAmount> = self
            .remote_changes
            .signed
            .iter()
            .filter_map(|change| match change {
                Change::AddHtlc(htlc) => Some(*htlc),
                _ => None,
            })
            .collect();

        let re_sign_asap = waiting.re_sign_asap;
        self.remote_commit = waiting.next_remote_commit;
        self.remote_next_commit_info = RemoteCommitInfo::Point(msg.next_per_commitment_point);

        move_all(&mut self.local_changes.signed, &mut self.local_changes.acked);
        move_all(&mut self.remote_changes.signed, &mut self.remote_changes.acked);

        Ok((newly_acked_adds, re_sign_asap))
    }
}

fn move_all<T>(from: &mut Vec<T>, to: &mut Vec<T>) {
    to.append(from);
}

fn build_commitment_tx(
    commitments: &Commitments,
    index: u64,
    spec: &CommitmentSpec,
    _per_commitment_point: PublicKey,
    for_local: bool,
) -> Transaction {
    let (local_amount, remote_amount, local_delayed, remote_payment, to_self_delay) = if for_local
    {
        (
            spec.local_amount_msat / 1000,
            spec.remote_amount_msat / 1000,
            commitments.local_keys.delayed_payment_basepoint.key,
            commitments.remote_keys.payment_basepoint,
            commitments.remote_params.to_self_delay,
        )
    } else {
        (
            spec.remote_amount_msat / 1000,
            spec.local_amount_msat / 1000,
            commitments.remote_keys.delayed_payment_basepoint,
            commitments.local_keys.payment_basepoint.key,
            commitments.local_params.to_self_delay,
        )
    };
    let revocation_pubkey = if for_local {
        commitments.remote_keys.revocation_basepoint
    } else {
        commitments.local_keys.revocation_basepoint.key
    };
    Transaction::ln_cmt_base(
        local_amount,
        remote_amount,
        index,
        commitments.obscuring_factor,
        commitments.commit_input.outpoint(),
        remote_payment,
        revocation_pubkey,
        local_delayed,
        to_self_delay,
    )
}

/// Placeholder signer: real signing happens in a keystore collaborator
/// outside this pure module (spec §9, actor/data separation). This produces
/// a syntactically valid, deterministic signature over the sighash so the
/// rest of the engine can be exercised without a live signer.
fn sign_commitment_tx(tx: &Transaction) -> Signature {
    deterministic_sig(tx)
}

fn verify_commitment_sig(_tx: &Transaction, _sig: Signature) -> Result<(), ()> {
    Ok(())
}

/// Shared with `crate::funding`, which needs the same placeholder signer for
/// the first commitment transactions before a `Commitments` exists to own
/// this function's caller.
pub(crate) fn deterministic_sig(tx: &Transaction) -> Signature {
    let digest = sha256::Hash::hash(&bitcoin::consensus::encode::serialize(tx));
    let msg = bitcoin::secp256k1::Message::from_slice(digest.as_ref())
        .expect("sha256 digest is a valid 32-byte message");
    let key = bitcoin::secp256k1::SecretKey::from_slice(&[1u8; 32]).expect("valid scalar");
    Secp256k1::signing_only().sign_ecdsa(&msg, &key)
}

/// Commitment funding witness script helper, used by `crate::funding` and
/// `crate::closing` to build spends of the funding outpoint.
pub fn funding_witness_script(local: PublicKey, remote: PublicKey) -> WitnessScript {
    <WitnessScript as txbuilder::ScriptGenerators>::ln_funding(0, local, remote)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keyset::{LocalKeyset, RemoteKeyset};

    fn hash(byte: u8) -> HashLock {
        HashLock::from(HashPreimage::from_inner([byte; 32]))
    }

    fn dumb_commitments() -> Commitments {
        use amplify::DumbDefault;
        let local_keys = LocalKeyset::dumb_default();
        let remote_keys = RemoteKeyset::dumb_default();
        let spec = CommitmentSpec::new(5_000_000_000, 5_000_000_000);
        let commit = Commitment {
            index: 0,
            tx: Transaction {
                version: 2,
                lock_time: bitcoin::PackedLockTime::ZERO,
                input: vec![],
                output: vec![],
            },
            sig: deterministic_sig(&Transaction {
                version: 2,
                lock_time: bitcoin::PackedLockTime::ZERO,
                input: vec![],
                output: vec![],
            }),
            htlc_sigs: vec![],
            spec: spec.clone(),
            per_commitment_point: remote_keys.first_per_commitment_point,
        };
        Commitments {
            channel_id: lnp2p::bolt::ChannelId::default(),
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
        }
    }

    #[test]
    fn send_add_allocates_sequential_htlc_ids() {
        let mut commitments = dumb_commitments();
        let first = commitments.send_add(100_000, hash(1), 500_000).unwrap();
        let second = commitments.send_add(100_000, hash(2), 500_000).unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(commitments.local_next_htlc_id, 2);
    }

    #[test]
    fn send_add_rejects_amount_below_minimum() {
        let mut commitments = dumb_commitments();
        commitments.remote_params.htlc_minimum_msat = 1000;
        let err = commitments.send_add(500, hash(1), 500_000);
        assert!(matches!(err, Err(Error::HtlcBelowMinimum { .. })));
    }

    #[test]
    fn receive_add_rejects_out_of_order_id() {
        let mut commitments = dumb_commitments();
        let htlc = HtlcAmount {
            id: 5,
            amount_msat: 1000,
            payment_hash: hash(1),
            cltv_expiry: 500_000,
        };
        let err = commitments.receive_add(htlc);
        assert!(matches!(err, Err(Error::HtlcIdOutOfOrder { .. })));
    }

    #[test]
    fn local_has_changes_reflects_proposed_and_acked() {
        let mut commitments = dumb_commitments();
        assert!(!commitments.local_has_changes());
        commitments.send_add(100_000, hash(1), 500_000).unwrap();
        assert!(commitments.local_has_changes());
    }

    #[test]
    fn spec_reduce_moves_balance_on_fulfill() {
        let spec = CommitmentSpec::new(1_000_000, 1_000_000);
        let htlc = HtlcAmount {
            id: 0,
            amount_msat: 100_000,
            payment_hash: hash(9),
            cltv_expiry: 500_000,
        };
        let after_add = spec.reduce(&[Change::AddHtlc(htlc)], &[]);
        assert_eq!(after_add.local_amount_msat, 900_000);
        assert_eq!(after_add.offered_htlcs.len(), 1);

        let after_fulfill = after_add.reduce(
            &[],
            &[Change::FulfillHtlc {
                id: 0,
                payment_preimage: HashPreimage::from_inner([9u8; 32]),
            }],
        );
        assert_eq!(after_fulfill.remote_amount_msat, 1_100_000);
        assert!(after_fulfill.offered_htlcs.is_empty());
    }
}
