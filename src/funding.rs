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

use amplify::Slice32;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::util::psbt::raw::ProprietaryKey;
use bitcoin::{OutPoint, Transaction, TxOut, Txid};
use lnp2p::bolt::{AcceptChannel, ActiveChannelId, ChannelId, OpenChannel, ShortChannelId};
use wallet::psbt;
use wallet::psbt::Psbt;

use crate::commitments::{Commitment, CommitInput, CommitmentSpec};
use crate::keyset::{LocalKeyset, RemoteKeyset};
use crate::policy::{CommonParams, PeerParams};
use crate::txbuilder::{self, TxGenerators};

pub const PSBT_LNP_PROPRIETARY_PREFIX: &[u8] = b"LNP";
pub const PSBT_OUT_LNP_CHANNEL_FUNDING: u8 = 0x01;

#[derive(
    Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error
)]
#[display(doc_comments)]
pub enum Error {
    /// no funding output found in the funding transaction. The funding output
    /// must be marked with proprietary key having "LNP" prefix and 0x01
    /// subtype.
    NoFundingOutput,

    /// funding transaction does not contain output #{0} specified as a
    /// funding outpoint
    WrongOutput(u16),
}

/// Information about channel funding
#[derive(Getters, Clone, PartialEq, Debug, StrictEncode, StrictDecode)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Funding {
    /// PSBT containing full information about the funding of the channel in a
    /// structured way.
    ///
    /// Channel is always funded with a single input, that is why we need a
    /// single PSBT. If channel needs to receive more funds, it will require a
    /// new funding transaction to be created, spending previous funding
    /// transaction output.
    psbt: Psbt,

    // Cached information extracted from PSBT, which is the master data source
    #[getter(as_copy)]
    txid: Txid,

    #[getter(as_copy)]
    output: u16,

    #[getter(as_copy)]
    amount: u64,

    #[getter(as_copy)]
    signing_parties: u8,

    #[getter(as_copy)]
    signing_threshold: u8,
}

impl Funding {
    /// Constructs empty funding information. Can be used only during initial
    /// channel setup.
    #[inline]
    pub(super) fn new() -> Funding {
        let mut psbt = Psbt::from_unsigned_tx(Transaction {
            version: 2,
            lock_time: 0,
            input: vec![],
            output: vec![TxOut {
                value: 0,
                script_pubkey: Default::default(),
            }],
        })
        .expect("dumb manual PSBT creation");
        psbt.outputs[0]
            .proprietary
            .insert(lnp_out_channel_funding_key(), vec![]);
        Funding::with(psbt).expect("dumb manual PSBT creation")
    }

    #[inline]
    pub fn with(psbt: Psbt) -> Result<Funding, Error> {
        psbt.extract_channel_funding()
    }

    #[inline]
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.output as u32)
    }
}

fn lnp_out_channel_funding_key() -> ProprietaryKey {
    ProprietaryKey {
        prefix: PSBT_LNP_PROPRIETARY_PREFIX.to_vec(),
        subtype: PSBT_OUT_LNP_CHANNEL_FUNDING,
        key: vec![],
    }
}

fn psbt_funding_output_info(
    psbt: &Psbt,
) -> Result<(u16, &psbt::Output, &TxOut), Error> {
    let funding_key = lnp_out_channel_funding_key();
    psbt.outputs
        .iter()
        .zip(&psbt.global.unsigned_tx.output)
        .enumerate()
        .find(|(_, (output, _))| output.proprietary.get(&funding_key).is_some())
        .ok_or(Error::NoFundingOutput)
        .map(|(vout, (out, txout))| (vout as u16, out, txout))
}

pub trait PsbtLnpFunding {
    fn set_channel_funding_output(&mut self, vout: u16) -> Result<(), Error>;
    fn channel_funding_outpoint(&self) -> Result<OutPoint, Error>;
    fn extract_channel_funding(self) -> Result<Funding, Error>;
}

impl PsbtLnpFunding for Psbt {
    fn set_channel_funding_output(&mut self, vout: u16) -> Result<(), Error> {
        self.outputs
            .get_mut(vout as usize)
            .map(|out| {
                out.proprietary
                    .insert(lnp_out_channel_funding_key(), vec![]);
            })
            .ok_or(Error::WrongOutput(vout))
    }

    fn channel_funding_outpoint(&self) -> Result<OutPoint, Error> {
        let (vout, _, _) = psbt_funding_output_info(&self)?;
        Ok(OutPoint::new(self.global.unsigned_tx.txid(), vout as u32))
    }

    fn extract_channel_funding(self) -> Result<Funding, Error> {
        let (vout, _out, txout) = psbt_funding_output_info(&self)?;
        let amount = txout.value;
        let txid = self.global.unsigned_tx.txid();
        // TODO: Parse number of signing parties and signing threshold from
        //       witness script attached to the funding output
        Ok(Funding {
            psbt: self,
            txid,
            output: vout as u16,
            amount,
            signing_parties: 2,
            signing_threshold: 2,
        })
    }
}

/// Builds the `open_channel` message a funder sends to kick off channel
/// establishment (spec §4.2 INIT_FUNDER).
#[allow(clippy::too_many_arguments)]
pub fn build_open_channel(
    chain_hash: Slice32,
    temporary_channel_id: lnp2p::bolt::TempChannelId,
    funding_satoshis: u64,
    push_msat: u64,
    local_params: &PeerParams,
    common_params: &CommonParams,
    local_keys: &LocalKeyset,
) -> OpenChannel {
    OpenChannel {
        chain_hash,
        temporary_channel_id,
        funding_satoshis,
        push_msat,
        dust_limit_satoshis: local_params.dust_limit_satoshis,
        max_htlc_value_in_flight_msat: local_params.max_htlc_value_in_flight_msat,
        channel_reserve_satoshis: local_params.channel_reserve_satoshis,
        htlc_minimum_msat: local_params.htlc_minimum_msat,
        feerate_per_kw: common_params.feerate_per_kw,
        to_self_delay: local_params.to_self_delay,
        max_accepted_htlcs: local_params.max_accepted_htlcs,
        funding_pubkey: local_keys.funding_pubkey.key,
        revocation_basepoint: local_keys.revocation_basepoint.key,
        payment_point: local_keys.payment_basepoint.key,
        delayed_payment_basepoint: local_keys.delayed_payment_basepoint.key,
        htlc_basepoint: local_keys.htlc_basepoint.key,
        first_per_commitment_point: local_keys.first_per_commitment_point.key,
        channel_flags: if common_params.announce_channel { 0x01 } else { 0x00 },
        shutdown_scriptpubkey: local_keys.shutdown_scriptpubkey.clone(),
        channel_type: common_params.channel_type.into_option(),
        unknown_tlvs: Default::default(),
    }
}

/// Builds the `accept_channel` reply a fundee sends once `open_channel` has
/// passed policy validation (spec §4.2 INIT_FUNDEE).
pub fn build_accept_channel(
    open_channel: &OpenChannel,
    common_params: &CommonParams,
    local_params: &PeerParams,
    local_keys: &LocalKeyset,
) -> AcceptChannel {
    AcceptChannel {
        temporary_channel_id: open_channel.temporary_channel_id,
        dust_limit_satoshis: local_params.dust_limit_satoshis,
        max_htlc_value_in_flight_msat: local_params.max_htlc_value_in_flight_msat,
        channel_reserve_satoshis: local_params.channel_reserve_satoshis,
        htlc_minimum_msat: local_params.htlc_minimum_msat,
        minimum_depth: common_params.minimum_depth,
        to_self_delay: local_params.to_self_delay,
        max_accepted_htlcs: local_params.max_accepted_htlcs,
        funding_pubkey: local_keys.funding_pubkey.key,
        revocation_basepoint: local_keys.revocation_basepoint.key,
        payment_point: local_keys.payment_basepoint.key,
        delayed_payment_basepoint: local_keys.delayed_payment_basepoint.key,
        htlc_basepoint: local_keys.htlc_basepoint.key,
        first_per_commitment_point: local_keys.first_per_commitment_point.key,
        shutdown_scriptpubkey: local_keys.shutdown_scriptpubkey.clone(),
        channel_type: open_channel.channel_type,
        unknown_tlvs: Default::default(),
    }
}

/// The two unsigned index-0 commitment transactions built from a channel's
/// opening parameters (spec §4.2 `make_first_commit_txs`), before either side
/// has attached a signature to either one.
pub struct FirstCommitTxs {
    pub local_tx: Transaction,
    pub remote_tx: Transaction,
    pub local_spec: CommitmentSpec,
    pub remote_spec: CommitmentSpec,
    pub obscuring_factor: u64,
}

/// Builds both parties' index-0 commitment transactions from the channel's
/// agreed parameters, before either side has signed anything (spec §4.2,
/// BOLT-3 "commitment transaction"). Funder and fundee call this the same
/// way; what differs is which signature each attaches to which transaction
/// (see `sign_first_commitments`).
#[allow(clippy::too_many_arguments)]
pub fn make_first_commit_txs(
    is_originator: bool,
    commit_input: CommitInput,
    push_msat: u64,
    local_params: &PeerParams,
    remote_params: &PeerParams,
    local_keys: &LocalKeyset,
    remote_keys: &RemoteKeyset,
) -> FirstCommitTxs {
    let funding_msat = commit_input.amount_sat * 1000;
    let (local_amount_msat, remote_amount_msat) = if is_originator {
        (funding_msat.saturating_sub(push_msat), push_msat)
    } else {
        (push_msat, funding_msat.saturating_sub(push_msat))
    };
    let local_spec = CommitmentSpec::new(local_amount_msat, remote_amount_msat);
    let remote_spec = CommitmentSpec::new(remote_amount_msat, local_amount_msat);

    let obscuring_factor = txbuilder::compute_obscuring_factor(
        is_originator,
        local_keys.payment_basepoint.key,
        remote_keys.payment_basepoint,
    );

    let local_tx = Transaction::ln_cmt_base(
        local_amount_msat / 1000,
        remote_amount_msat / 1000,
        0,
        obscuring_factor,
        commit_input.outpoint(),
        remote_keys.payment_basepoint,
        remote_keys.revocation_basepoint,
        local_keys.delayed_payment_basepoint.key,
        remote_params.to_self_delay,
    );
    let remote_tx = Transaction::ln_cmt_base(
        remote_amount_msat / 1000,
        local_amount_msat / 1000,
        0,
        obscuring_factor,
        commit_input.outpoint(),
        local_keys.payment_basepoint.key,
        local_keys.revocation_basepoint.key,
        remote_keys.delayed_payment_basepoint,
        local_params.to_self_delay,
    );

    FirstCommitTxs { local_tx, remote_tx, local_spec, remote_spec, obscuring_factor }
}

/// Placeholder signer shared with `crate::commitments`: real signing lives in
/// a keystore collaborator outside this crate (spec §9).
pub(crate) fn sign_first_commitment(tx: &Transaction) -> Signature {
    crate::commitments::deterministic_sig(tx)
}

/// Builds the fundee's `remote_commit` entry (the funder's view, which the
/// fundee signs itself and sends via `funding_signed.signature`) or the
/// funder's `local_commit` entry (which only becomes complete once the
/// fundee's `funding_signed.signature` arrives) from a `FirstCommitTxs` pair
/// and an explicit signature.
pub fn first_commitment(
    tx: Transaction,
    sig: Signature,
    spec: CommitmentSpec,
    per_commitment_point: bitcoin::secp256k1::PublicKey,
) -> Commitment {
    Commitment {
        index: 0,
        tx,
        sig,
        htlc_sigs: vec![],
        spec,
        per_commitment_point,
    }
}

/// Deterministic placeholder for `node_signature`/`bitcoin_signature` in
/// `announcement_signatures` (spec §4.2, BOLT-7): same construction as
/// `crate::commitments`'s commitment-tx signer, but over the channel/short
/// channel id pair being announced rather than a transaction.
pub fn sign_announcement(channel_id: ChannelId, short_channel_id: ShortChannelId) -> Signature {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(&channel_id.to_inner().to_inner());
    buf.extend_from_slice(&short_channel_id.into_inner().to_be_bytes());
    let digest = sha256::Hash::hash(&buf);
    let msg = Message::from_slice(digest.as_ref()).expect("sha256 digest is a valid message");
    let key = SecretKey::from_slice(&[4u8; 32]).expect("valid scalar");
    sign_with(&key, &msg)
}

fn sign_with(key: &SecretKey, msg: &Message) -> Signature {
    let secp: Secp256k1<bitcoin::secp256k1::SignOnly> = Secp256k1::signing_only();
    secp.sign_ecdsa(msg, key)
}

/// Derives the active channel id's final form once the funding outpoint is
/// known, used when transitioning out of the pre-`WAIT_FOR_FUNDING_SIGNED`
/// states.
pub fn finalize_channel_id(active: ActiveChannelId, commit_input: CommitInput) -> ChannelId {
    match active {
        ActiveChannelId::Final(id) => id,
        ActiveChannelId::Temporary(_) => ChannelId::with(commit_input.outpoint()),
    }
}
