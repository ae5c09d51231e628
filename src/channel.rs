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

//! The state controller (spec §4.1): the single entry point driving a
//! channel through its BOLT-2 lifecycle. `Channel::advance` is the only
//! place that matches on `ChannelState` directly and the only place an
//! `Err` from `crate::commitments`/`crate::closing`/`crate::policy` is
//! turned into a unilateral-close decision (spec §7).

use amplify::Slice32;
use bitcoin::secp256k1::Secp256k1;
use lnp2p::bolt::{
    ActiveChannelId, ChannelId, Messages, OpenChannel, ShortChannelId,
    TempChannelId,
};

use crate::closing::{self, ClosingOutcomes, FeeNegotiation};
use crate::collaborators::{
    BlockchainEvent, BlockchainRequest, ChannelEvent, Command, Outputs,
    RelayerMsg, WatchTag,
};
use crate::commitments::{CommitInput, Commitments, RemoteCommitInfo};
use crate::error::Error;
use crate::funding;
use crate::keyset::{LocalKeyset, RemoteKeyset};
use crate::policy::{CommonParams, PeerParams, Policy};
use crate::state::{
    ChannelState, DataClosing, DataNegotiating, DataNormal, DataOffline,
    DataOpening, DataShutdown, DataWaitForAnnouncementSignatures,
    DataWaitForFundingConfirmed, DataWaitForFundingLocked,
    DataWaitForFundingSigned,
};

/// Everything that can move a channel forward: peer wire traffic, local
/// commands, blockchain-watcher notifications, and connection lifecycle
/// events (spec §6).
#[derive(Clone, Debug)]
pub enum Event {
    Peer(Messages),
    Command(Command),
    Blockchain(BlockchainEvent),
    CurrentBlockCount(u32),
    Disconnected,
    Reconnected,
}

/// The channel actor: current state plus the node-operator policy it
/// validates peer proposals against (spec §4.1, §9 "synchronously-driven
/// state struct with an `advance(event) -> outputs` method").
#[derive(Clone, Debug)]
pub struct Channel {
    state: ChannelState,
    policy: Policy,
}

impl Channel {
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Starts a channel as the funder (spec §4.2 INIT_FUNDER): emits
    /// `open_channel` and lands in `WAIT_FOR_ACCEPT_CHANNEL`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_funder(
        chain_hash: Slice32,
        funding_satoshis: u64,
        push_msat: u64,
        local_params: PeerParams,
        common_params: CommonParams,
        local_keys: LocalKeyset,
        local_per_commitment_seed: [u8; 32],
        policy: Policy,
    ) -> (Channel, Outputs) {
        let temporary_channel_id = TempChannelId::random();
        let open_channel = funding::build_open_channel(
            chain_hash,
            temporary_channel_id,
            funding_satoshis,
            push_msat,
            &local_params,
            &common_params,
            &local_keys,
        );
        let opening = DataOpening {
            is_originator: true,
            active_channel_id: ActiveChannelId::Temporary(temporary_channel_id),
            local_params,
            common_params,
            local_keys,
            local_per_commitment_seed,
            funding_satoshis,
            push_msat,
            remote_params: None,
            remote_keys: None,
            last_sent: Some(Messages::OpenChannel(open_channel.clone())),
        };
        let mut outputs = Outputs::default();
        outputs.to_peer.push(Messages::OpenChannel(open_channel));
        outputs.events.push(ChannelEvent::Created);
        (
            Channel { state: ChannelState::WaitForAcceptChannel(opening), policy },
            outputs,
        )
    }

    /// Starts a channel as the fundee (spec §4.2 INIT_FUNDEE): waits for
    /// `open_channel` before sending anything.
    pub fn new_fundee(
        local_params: PeerParams,
        local_keys: LocalKeyset,
        local_per_commitment_seed: [u8; 32],
        policy: Policy,
    ) -> (Channel, Outputs) {
        let opening = DataOpening {
            is_originator: false,
            active_channel_id: ActiveChannelId::random(),
            local_params,
            common_params: CommonParams::default(),
            local_keys,
            local_per_commitment_seed,
            funding_satoshis: 0,
            push_msat: 0,
            remote_params: None,
            remote_keys: None,
            last_sent: None,
        };
        let mut outputs = Outputs::default();
        outputs.events.push(ChannelEvent::Created);
        (Channel { state: ChannelState::WaitForOpenChannel(opening), policy }, outputs)
    }

    /// Drives the channel with a single event, returning everything the
    /// caller must dispatch to its collaborators (spec §4.1 contract).
    pub fn advance(&mut self, event: Event) -> Outputs {
        let previous = self.state.clone();
        match dispatch(previous.clone(), &self.policy, event) {
            Ok((next_state, mut outputs)) => {
                if next_state.name() != previous.name() {
                    log::info!(
                        "channel {:?}: {} -> {}",
                        previous.channel_id(),
                        previous.name(),
                        next_state.name()
                    );
                    outputs.events.push(ChannelEvent::StateChanged {
                        previous: previous.name(),
                        current: next_state.name(),
                    });
                }
                self.state = next_state;
                outputs
            }
            Err(err) => self.handle_error(previous, err),
        }
    }

    /// spec §7 exception wrapper: a `CommandRejected` fault leaves the state
    /// untouched and is reported back to the local caller only; any other
    /// fault is a protocol fault and escalates to a unilateral close.
    fn handle_error(&mut self, previous: ChannelState, err: Error) -> Outputs {
        let mut outputs = Outputs::default();
        if !err.is_protocol_fault() {
            log::warn!("command rejected: {}", err);
            outputs.events.push(ChannelEvent::CommandRejected(err.to_string()));
            self.state = previous;
            return outputs;
        }

        log::error!("protocol fault, forcing unilateral close: {}", err);
        outputs.events.push(ChannelEvent::Info(err.to_string()));

        let channel_id = previous.channel_id().unwrap_or_default();
        outputs.to_peer.push(Messages::Error(lnp2p::bolt::Error {
            channel_id,
            data: err.to_string().into_bytes(),
        }));

        // spec §7: a funding spend that matches nothing recognizable freezes
        // the channel in a terminal state rather than unwinding like an
        // ordinary unilateral close — there is nothing left to unwind
        // against. Still publish our own commitment for safety before
        // freezing.
        if matches!(err, Error::InformationLeak) {
            if let Some(commitments) = previous.commitments() {
                publish_local_commit(commitments, &mut outputs);
            }
            self.state = ChannelState::ErrInformationLeak;
            return outputs;
        }

        self.state = match previous.commitments().cloned() {
            Some(commitments) => spend_local_current(commitments, &mut outputs),
            None => ChannelState::Closed,
        };
        outputs
    }
}

/// Publishes a commitment transaction and arms a depth-1 watch for it,
/// shared by `spend_local_current` and the information-leak freeze.
fn publish_local_commit(commitments: &Commitments, outputs: &mut Outputs) {
    let tx = commitments.local_commit.tx.clone();
    outputs.to_blockchain.push(BlockchainRequest::PublishAsap(tx.clone()));
    outputs.to_blockchain.push(BlockchainRequest::WatchConfirmed {
        txid: tx.txid(),
        depth: 1,
        tag: WatchTag::LocalCommitDone,
    });
}

/// Publishes our own current local commitment and arms the watcher for it,
/// per spec §4.7's `spend_local_current` (the only close path available once
/// a protocol fault is detected and no richer `ClosingOutcomes` exist yet).
fn spend_local_current(commitments: Commitments, outputs: &mut Outputs) -> ChannelState {
    publish_local_commit(&commitments, outputs);
    let mut outcomes = ClosingOutcomes::default();
    outcomes.local_commit_published = Some(commitments.local_commit.tx.clone());
    ChannelState::Closing(DataClosing { commitments, outcomes, pending_confirmations: 1 })
}

/// The transition table: one pure function from `(state, event)` to either
/// the next state plus its outputs, or an `Error` for `Channel::advance` to
/// turn into the appropriate exception response.
fn dispatch(
    state: ChannelState,
    policy: &Policy,
    event: Event,
) -> Result<(ChannelState, Outputs), Error> {
    match (state, event) {
        // --- Connection lifecycle (spec §4.8) ------------------------------
        (state, Event::Disconnected) if !state.is_terminal() => {
            if matches!(state, ChannelState::Offline(_)) {
                return Ok((state, Outputs::default()));
            }
            Ok((
                ChannelState::Offline(DataOffline { prior_state: Box::new(state) }),
                Outputs::default(),
            ))
        }
        (ChannelState::Offline(data), Event::Reconnected) => reconnect(*data.prior_state),

        // --- Opening protocol (spec §4.2) -----------------------------------
        (ChannelState::WaitForOpenChannel(mut opening), Event::Peer(Messages::OpenChannel(msg))) => {
            on_open_channel(&mut opening, policy, msg)
        }
        (ChannelState::WaitForAcceptChannel(mut opening), Event::Peer(Messages::AcceptChannel(msg))) => {
            on_accept_channel(&mut opening, policy, msg)
        }
        (
            ChannelState::WaitForFundingInternal(opening),
            Event::Blockchain(BlockchainEvent::MakeFundingTxResponse { tx, output_index }),
        ) => on_funding_tx_made(opening, tx, output_index),
        (
            ChannelState::WaitForFundingCreated(opening),
            Event::Peer(Messages::FundingCreated(msg)),
        ) => on_funding_created(opening, msg),
        (
            ChannelState::WaitForFundingSigned(data),
            Event::Peer(Messages::FundingSigned(msg)),
        ) => on_funding_signed(data, msg),
        (
            ChannelState::WaitForFundingConfirmed(mut data),
            Event::Peer(Messages::FundingLocked(msg)),
        ) => {
            data.deferred_funding_locked = Some(msg);
            Ok((ChannelState::WaitForFundingConfirmed(data), Outputs::default()))
        }
        (
            ChannelState::WaitForFundingConfirmed(data),
            Event::Blockchain(BlockchainEvent::Confirmed {
                tag: WatchTag::FundingDepthOk,
                height,
                tx_index,
            }),
        ) => on_funding_depth_ok(data, height, tx_index),
        (
            ChannelState::WaitForFundingLocked(data),
            Event::Peer(Messages::FundingLocked(msg)),
        ) => on_funding_locked(data, msg),
        (
            ChannelState::WaitForAnnouncementSignatures(data),
            Event::Peer(Messages::AnnouncementSignatures(msg)),
        ) => on_announcement_signatures(data, msg),

        // --- Normal operation (spec §4.4) -----------------------------------
        (ChannelState::Normal(mut data), Event::Peer(Messages::UpdateAddHtlc(msg))) => {
            data.commitments.receive_add(crate::htlc::HtlcAmount {
                id: msg.htlc_id,
                amount_msat: msg.amount_msat,
                payment_hash: msg.payment_hash,
                cltv_expiry: msg.cltv_expiry,
            })?;
            Ok((ChannelState::Normal(data), Outputs::default()))
        }
        (ChannelState::Normal(mut data), Event::Peer(Messages::UpdateFulfillHtlc(msg))) => {
            let outputs = forward_fulfill(&mut data.commitments, msg.htlc_id, msg.payment_preimage)?;
            Ok((ChannelState::Normal(data), outputs))
        }
        (ChannelState::Normal(mut data), Event::Peer(Messages::UpdateFailHtlc(msg))) => {
            let outputs = forward_fail(&mut data.commitments, msg.htlc_id, msg.reason)?;
            Ok((ChannelState::Normal(data), outputs))
        }
        (ChannelState::Normal(data), Event::Peer(Messages::CommitmentSigned(msg))) => {
            on_commitment_signed(ChannelState::Normal(data), &msg)
        }
        (ChannelState::Normal(data), Event::Peer(Messages::RevokeAndAck(msg))) => {
            on_revoke_and_ack(ChannelState::Normal(data), &msg)
        }
        (ChannelState::Normal(data), Event::CurrentBlockCount(height)) => {
            on_block_count(ChannelState::Normal(data), height)
        }
        (ChannelState::Normal(data), Event::Peer(Messages::Shutdown(msg))) => {
            on_peer_shutdown(data.commitments, msg)
        }
        (ChannelState::Normal(_), Event::Peer(Messages::Error(msg))) => {
            Err(Error::RemoteError(String::from_utf8_lossy(&msg.data).into_owned()))
        }

        // --- SHUTDOWN (spec §4.5) -------------------------------------------
        (ChannelState::Shutdown(_), Event::Peer(Messages::UpdateAddHtlc(_))) => {
            Err(Error::UnexpectedMessage(
                "update_add_htlc received after shutdown".into(),
            ))
        }
        (ChannelState::Shutdown(mut data), Event::Peer(Messages::UpdateFulfillHtlc(msg))) => {
            let mut outputs = forward_fulfill(&mut data.commitments, msg.htlc_id, msg.payment_preimage)?;
            let (state, drained) = drain_shutdown(data)?;
            outputs.to_peer.extend(drained.to_peer);
            outputs.to_blockchain.extend(drained.to_blockchain);
            outputs.events.extend(drained.events);
            Ok((state, outputs))
        }
        (ChannelState::Shutdown(mut data), Event::Peer(Messages::UpdateFailHtlc(msg))) => {
            let mut outputs = forward_fail(&mut data.commitments, msg.htlc_id, msg.reason)?;
            let (state, drained) = drain_shutdown(data)?;
            outputs.to_peer.extend(drained.to_peer);
            outputs.to_blockchain.extend(drained.to_blockchain);
            outputs.events.extend(drained.events);
            Ok((state, outputs))
        }
        (ChannelState::Shutdown(data), Event::Peer(Messages::CommitmentSigned(msg))) => {
            let (next, mut outputs) = on_commitment_signed(ChannelState::Shutdown(data), &msg)?;
            match next {
                ChannelState::Shutdown(data) => {
                    let (state, drained) = drain_shutdown(data)?;
                    outputs.to_peer.extend(drained.to_peer);
                    outputs.to_blockchain.extend(drained.to_blockchain);
                    outputs.events.extend(drained.events);
                    Ok((state, outputs))
                }
                other => Ok((other, outputs)),
            }
        }
        (ChannelState::Shutdown(data), Event::Peer(Messages::RevokeAndAck(msg))) => {
            let (next, mut outputs) = on_revoke_and_ack(ChannelState::Shutdown(data), &msg)?;
            match next {
                ChannelState::Shutdown(data) => {
                    let (state, drained) = drain_shutdown(data)?;
                    outputs.to_peer.extend(drained.to_peer);
                    outputs.to_blockchain.extend(drained.to_blockchain);
                    outputs.events.extend(drained.events);
                    Ok((state, outputs))
                }
                other => Ok((other, outputs)),
            }
        }
        (ChannelState::Shutdown(data), Event::Peer(Messages::Shutdown(msg))) => {
            let mut data = data;
            data.remote_shutdown_script = Some(msg.scriptpubkey);
            drain_shutdown(data)
        }
        (ChannelState::Shutdown(data), Event::CurrentBlockCount(height)) => {
            on_block_count(ChannelState::Shutdown(data), height)
        }

        // --- NEGOTIATING (spec §4.6) -----------------------------------------
        (ChannelState::Negotiating(data), Event::Command(Command::Sign)) => {
            start_closing_signed(data, policy, None)
        }
        (ChannelState::Negotiating(data), Event::Peer(Messages::ClosingSigned(msg))) => {
            on_closing_signed(data, policy, msg)
        }

        // --- CLOSING (spec §4.7) ---------------------------------------------
        (ChannelState::Closing(data), Event::Blockchain(BlockchainEvent::Confirmed { tag, .. })) => {
            on_closing_confirmed(data, tag)
        }
        (ChannelState::Closing(data), Event::Blockchain(BlockchainEvent::Spent { tag, tx })) => {
            on_closing_spend(data, tag, tx)
        }

        // A funding spend that reorgs back out after we declared it lost
        // freezes the channel rather than leaving it waiting forever (spec
        // §4.2 funding confirmation).
        (state, Event::Blockchain(BlockchainEvent::Lost { tag: WatchTag::FundingLost }))
            if !state.is_terminal() =>
        {
            Ok((ChannelState::ErrFundingLost, Outputs::default()))
        }

        // --- Local commands valid from any non-terminal, non-opening state ---
        (state, Event::Command(cmd)) => on_command(state, cmd),

        // No transition defined for this (state, event) pair: ignored rather
        // than treated as a protocol fault, matching BOLT-2's tolerance for
        // unexpected messages that are not outright violations.
        (state, _) => Ok((state, Outputs::default())),
    }
}

fn reconnect(prior_state: ChannelState) -> Result<(ChannelState, Outputs), Error> {
    let mut outputs = Outputs::default();
    if let Some(commitments) = prior_state.commitments() {
        for msg in commitments.unacked_messages.clone() {
            outputs.to_peer.push(msg);
        }
    }
    Ok((prior_state, outputs))
}

fn on_open_channel(
    opening: &mut DataOpening,
    policy: &Policy,
    msg: OpenChannel,
) -> Result<(ChannelState, Outputs), Error> {
    let remote_params = policy.validate_inbound(&msg)?;
    opening.common_params = CommonParams::with(&msg, policy.minimum_depth);
    opening.funding_satoshis = msg.funding_satoshis;
    opening.push_msat = msg.push_msat;
    opening.remote_params = Some(remote_params);
    opening.remote_keys = Some(RemoteKeyset::from(&msg));
    opening.active_channel_id = ActiveChannelId::Temporary(msg.temporary_channel_id);

    let accept_channel = funding::build_accept_channel(
        &msg,
        &opening.common_params,
        &opening.local_params,
        &opening.local_keys,
    );
    opening.last_sent = Some(Messages::AcceptChannel(accept_channel.clone()));

    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::AcceptChannel(accept_channel));
    Ok((ChannelState::WaitForFundingCreated(opening.clone()), outputs))
}

fn on_accept_channel(
    opening: &mut DataOpening,
    policy: &Policy,
    msg: lnp2p::bolt::AcceptChannel,
) -> Result<(ChannelState, Outputs), Error> {
    let remote_params = policy.confirm_outbound(opening.local_params, &msg)?;
    opening.remote_params = Some(remote_params);
    opening.remote_keys = Some(RemoteKeyset::from(&msg));
    opening.common_params.minimum_depth = msg.minimum_depth;

    let mut outputs = Outputs::default();
    outputs.to_blockchain.push(BlockchainRequest::MakeFundingTx {
        funding_satoshis: opening.funding_satoshis,
    });
    Ok((ChannelState::WaitForFundingInternal(opening.clone()), outputs))
}

fn on_funding_tx_made(
    opening: DataOpening,
    tx: bitcoin::Transaction,
    output_index: u16,
) -> Result<(ChannelState, Outputs), Error> {
    let remote_params = opening.remote_params.ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;
    let remote_keys = opening
        .remote_keys
        .clone()
        .ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;

    let commit_input = CommitInput {
        funding_txid: tx.txid(),
        funding_output_index: output_index,
        amount_sat: tx.output[output_index as usize].value,
    };
    let first = funding::make_first_commit_txs(
        true,
        commit_input,
        opening.push_msat,
        &opening.local_params,
        &remote_params,
        &opening.local_keys,
        &remote_keys,
    );
    let remote_sig = funding::sign_first_commitment(&first.remote_tx);
    let remote_commit = funding::first_commitment(
        first.remote_tx,
        remote_sig,
        first.remote_spec,
        remote_keys.first_per_commitment_point,
    );

    let channel_id = funding::finalize_channel_id(opening.active_channel_id, commit_input);
    let temporary_channel_id = opening
        .active_channel_id
        .temp_channel_id()
        .expect("funder carries a temporary channel id until funding_signed");

    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::FundingCreated(lnp2p::bolt::FundingCreated {
        temporary_channel_id,
        funding_txid: commit_input.funding_txid,
        funding_output_index: output_index,
        signature: remote_sig,
    }));
    outputs.events.push(ChannelEvent::ChannelIdAssigned(channel_id));

    Ok((
        ChannelState::WaitForFundingSigned(DataWaitForFundingSigned {
            opening,
            channel_id,
            commit_input,
            funding_tx: tx,
            local_commit_tx: first.local_tx,
            remote_commit,
        }),
        outputs,
    ))
}

fn on_funding_created(
    opening: DataOpening,
    msg: lnp2p::bolt::FundingCreated,
) -> Result<(ChannelState, Outputs), Error> {
    let remote_params = opening.remote_params.ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;
    let remote_keys = opening
        .remote_keys
        .clone()
        .ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;
    let commit_input = CommitInput {
        funding_txid: msg.funding_txid,
        funding_output_index: msg.funding_output_index,
        amount_sat: opening.funding_satoshis,
    };
    let first = funding::make_first_commit_txs(
        false,
        commit_input,
        opening.push_msat,
        &opening.local_params,
        &remote_params,
        &opening.local_keys,
        &remote_keys,
    );

    let local_commit = funding::first_commitment(
        first.local_tx,
        msg.signature,
        first.local_spec,
        opening.local_keys.first_per_commitment_point.key,
    );
    let remote_sig = funding::sign_first_commitment(&first.remote_tx);
    let remote_commit = funding::first_commitment(
        first.remote_tx,
        remote_sig,
        first.remote_spec,
        remote_keys.first_per_commitment_point,
    );

    let channel_id = ChannelId::with(commit_input.outpoint());
    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::FundingSigned(lnp2p::bolt::FundingSigned {
        channel_id,
        signature: remote_sig,
    }));
    outputs.events.push(ChannelEvent::ChannelIdAssigned(channel_id));
    outputs.to_blockchain.push(BlockchainRequest::WatchConfirmed {
        txid: commit_input.funding_txid,
        depth: opening.common_params.minimum_depth,
        tag: WatchTag::FundingDepthOk,
    });

    let commitments = Commitments {
        channel_id,
        is_originator: false,
        obscuring_factor: first.obscuring_factor,
        local_commit,
        remote_commit,
        remote_next_commit_info: RemoteCommitInfo::Point(remote_keys.first_per_commitment_point),
        local_changes: Default::default(),
        remote_changes: Default::default(),
        local_next_htlc_id: 0,
        remote_next_htlc_id: 0,
        unacked_messages: vec![],
        commit_input,
        per_commitment_secrets: crate::shachain::ShaChainStore::new(),
        local_params: opening.local_params,
        remote_params,
        local_keys: opening.local_keys,
        remote_keys,
        local_per_commitment_seed: opening.local_per_commitment_seed,
    };

    Ok((
        ChannelState::WaitForFundingConfirmed(DataWaitForFundingConfirmed {
            commitments,
            deferred_funding_locked: None,
            announce_channel: opening.common_params.announce_channel,
            minimum_depth: opening.common_params.minimum_depth,
        }),
        outputs,
    ))
}

fn on_funding_signed(
    data: DataWaitForFundingSigned,
    msg: lnp2p::bolt::FundingSigned,
) -> Result<(ChannelState, Outputs), Error> {
    let remote_params = data
        .opening
        .remote_params
        .ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;
    let remote_keys = data
        .opening
        .remote_keys
        .clone()
        .ok_or(Error::Funding(crate::funding::Error::NoFundingOutput))?;

    let first = funding::make_first_commit_txs(
        true,
        data.commit_input,
        data.opening.push_msat,
        &data.opening.local_params,
        &remote_params,
        &data.opening.local_keys,
        &remote_keys,
    );
    let local_commit = funding::first_commitment(
        data.local_commit_tx,
        msg.signature,
        first.local_spec,
        data.opening.local_keys.first_per_commitment_point.key,
    );

    let mut outputs = Outputs::default();
    outputs.to_blockchain.push(BlockchainRequest::PublishAsap(data.funding_tx));
    outputs.to_blockchain.push(BlockchainRequest::WatchConfirmed {
        txid: data.commit_input.funding_txid,
        depth: data.opening.common_params.minimum_depth,
        tag: WatchTag::FundingDepthOk,
    });

    let commitments = Commitments {
        channel_id: data.channel_id,
        is_originator: true,
        obscuring_factor: first.obscuring_factor,
        local_commit,
        remote_commit: data.remote_commit,
        remote_next_commit_info: RemoteCommitInfo::Point(remote_keys.first_per_commitment_point),
        local_changes: Default::default(),
        remote_changes: Default::default(),
        local_next_htlc_id: 0,
        remote_next_htlc_id: 0,
        unacked_messages: vec![],
        commit_input: data.commit_input,
        per_commitment_secrets: crate::shachain::ShaChainStore::new(),
        local_params: data.opening.local_params,
        remote_params,
        local_keys: data.opening.local_keys,
        remote_keys,
        local_per_commitment_seed: data.opening.local_per_commitment_seed,
    };

    Ok((
        ChannelState::WaitForFundingConfirmed(DataWaitForFundingConfirmed {
            commitments,
            deferred_funding_locked: None,
            announce_channel: data.opening.common_params.announce_channel,
            minimum_depth: data.opening.common_params.minimum_depth,
        }),
        outputs,
    ))
}

fn on_funding_depth_ok(
    data: DataWaitForFundingConfirmed,
    height: u32,
    tx_index: u32,
) -> Result<(ChannelState, Outputs), Error> {
    let short_channel_id = ShortChannelId::with(
        height,
        tx_index,
        data.commitments.commit_input.funding_output_index,
    );
    let secp = Secp256k1::new();
    let next_point =
        crate::shachain::generate_point(&secp, data.commitments.local_per_commitment_seed, 1);
    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::FundingLocked(lnp2p::bolt::FundingLocked {
        channel_id: data.commitments.channel_id,
        next_per_commitment_point: next_point,
    }));
    outputs.to_blockchain.push(BlockchainRequest::WatchSpent {
        txid: data.commitments.commit_input.funding_txid,
        vout: data.commitments.commit_input.funding_output_index as u32,
        tag: WatchTag::FundingSpent,
    });
    // spec §4.2: a reorg can still un-confirm the funding transaction after
    // we declared depth reached but before funding_locked is exchanged.
    outputs.to_blockchain.push(BlockchainRequest::WatchLost {
        txid: data.commitments.commit_input.funding_txid,
        depth: data.minimum_depth,
        tag: WatchTag::FundingLost,
    });

    let locked_data = DataWaitForFundingLocked {
        commitments: data.commitments,
        announce_channel: data.announce_channel,
        short_channel_id,
    };

    if let Some(deferred) = data.deferred_funding_locked {
        let (state, mut replayed) = on_funding_locked(locked_data, deferred)?;
        replayed.to_peer.splice(0..0, outputs.to_peer);
        replayed.to_blockchain.splice(0..0, outputs.to_blockchain);
        return Ok((state, replayed));
    }

    Ok((ChannelState::WaitForFundingLocked(locked_data), outputs))
}

fn on_funding_locked(
    data: DataWaitForFundingLocked,
    msg: lnp2p::bolt::FundingLocked,
) -> Result<(ChannelState, Outputs), Error> {
    if msg.channel_id != data.commitments.channel_id {
        return Err(Error::InformationLeak);
    }
    let mut outputs = Outputs::default();
    if data.announce_channel {
        let node_sig = funding::sign_announcement(data.commitments.channel_id, data.short_channel_id);
        outputs
            .to_peer
            .push(Messages::AnnouncementSignatures(lnp2p::bolt::AnnouncementSignatures {
                channel_id: data.commitments.channel_id,
                short_channel_id: data.short_channel_id,
                node_signature: node_sig,
                bitcoin_signature: node_sig,
            }));
        return Ok((
            ChannelState::WaitForAnnouncementSignatures(DataWaitForAnnouncementSignatures {
                commitments: data.commitments,
                short_channel_id: data.short_channel_id,
                local_announcement_signature: node_sig,
            }),
            outputs,
        ));
    }
    Ok((
        ChannelState::Normal(DataNormal {
            commitments: data.commitments,
            short_channel_id: Some(data.short_channel_id),
            announced: false,
        }),
        outputs,
    ))
}

fn on_announcement_signatures(
    data: DataWaitForAnnouncementSignatures,
    msg: lnp2p::bolt::AnnouncementSignatures,
) -> Result<(ChannelState, Outputs), Error> {
    if msg.short_channel_id != data.short_channel_id {
        return Err(Error::UnexpectedMessage(
            "announcement_signatures short_channel_id mismatch".into(),
        ));
    }
    let mut outputs = Outputs::default();
    outputs.events.push(ChannelEvent::Announced(data.short_channel_id));
    Ok((
        ChannelState::Normal(DataNormal {
            commitments: data.commitments,
            short_channel_id: Some(data.short_channel_id),
            announced: true,
        }),
        outputs,
    ))
}

/// `update_shutdown` received in `NORMAL` (spec §4.4 -> §4.5): parks in
/// `SHUTDOWN` if HTLCs or an in-flight sign round remain, otherwise replies
/// with our own `shutdown` and moves straight to `NEGOTIATING`.
fn on_peer_shutdown(
    commitments: Commitments,
    msg: lnp2p::bolt::Shutdown,
) -> Result<(ChannelState, Outputs), Error> {
    let local_shutdown_script =
        commitments.local_keys.shutdown_scriptpubkey.clone().unwrap_or_default();
    let mut outputs = Outputs::default();

    if commitments.local_has_changes()
        || commitments.remote_next_commit_info.is_awaiting()
        || !commitments.local_commit.spec.offered_htlcs.is_empty()
        || !commitments.local_commit.spec.received_htlcs.is_empty()
    {
        return Ok((
            ChannelState::Shutdown(DataShutdown {
                commitments,
                local_shutdown_script,
                remote_shutdown_script: Some(msg.scriptpubkey),
            }),
            outputs,
        ));
    }

    outputs.to_peer.push(Messages::Shutdown(lnp2p::bolt::Shutdown {
        channel_id: commitments.channel_id,
        scriptpubkey: local_shutdown_script.clone(),
    }));
    Ok((
        ChannelState::Negotiating(DataNegotiating {
            commitments,
            local_shutdown_script,
            remote_shutdown_script: msg.scriptpubkey,
            last_sent_fee: None,
            last_received_fee: None,
        }),
        outputs,
    ))
}

/// Handles `CMD_ADD_HTLC`/`CMD_FULFILL_HTLC`/`CMD_FAIL_HTLC`/`CMD_SIGN`/
/// `CMD_CLOSE`/`CMD_GET*` against any funded, non-terminal state (spec §4.4,
/// §6). Errors here are `Error::CommandRejected` unless the update algebra
/// itself reports a protocol-level fault.
fn on_command(state: ChannelState, cmd: Command) -> Result<(ChannelState, Outputs), Error> {
    match cmd {
        Command::GetState => {
            let mut outputs = Outputs::default();
            outputs.events.push(ChannelEvent::Info(state.name().to_string()));
            Ok((state, outputs))
        }
        Command::GetStateData | Command::GetInfo => {
            let mut outputs = Outputs::default();
            outputs.events.push(ChannelEvent::Info(format!("{:?}", state)));
            Ok((state, outputs))
        }
        Command::Close { final_script } => start_shutdown(state, final_script),
        // spec §4.5: CMD_ADD_HTLC is only valid in NORMAL; SHUTDOWN and
        // everything past it must reject new HTLCs.
        Command::AddHtlc { .. } if !matches!(state, ChannelState::Normal(_)) => Err(
            Error::CommandRejected("cannot add an HTLC outside NORMAL operation".into()),
        ),
        cmd => {
            let mut state = state;
            let commitments = state
                .commitments_mut()
                .ok_or_else(|| Error::CommandRejected("channel has no commitments yet".into()))?;
            match cmd {
                Command::AddHtlc { amount_msat, payment_hash, cltv_expiry, origin } => {
                    let htlc = commitments
                        .send_add(amount_msat, payment_hash, cltv_expiry)
                        .map_err(command_rejection)?;
                    let mut outputs = Outputs::default();
                    outputs.to_relayer.push(RelayerMsg::Bind { htlc, origin });
                    Ok((state, outputs))
                }
                Command::FulfillHtlc { id, payment_preimage } => {
                    commitments.send_fulfill(id, payment_preimage).map_err(command_rejection)?;
                    Ok((state, Outputs::default()))
                }
                Command::FailHtlc { id, reason } => {
                    commitments.send_fail(id, reason).map_err(command_rejection)?;
                    Ok((state, Outputs::default()))
                }
                // spec §4.4 CMD_SIGN: if a sign round is already in flight,
                // set its re_sign_asap flag instead of rejecting the command.
                Command::Sign => match commitments.remote_next_commit_info {
                    RemoteCommitInfo::Awaiting(ref mut waiting) => {
                        waiting.re_sign_asap = true;
                        Ok((state, Outputs::default()))
                    }
                    RemoteCommitInfo::Point(_) => {
                        let secp = Secp256k1::new();
                        let (msg, _commit) =
                            commitments.send_commit(&secp).map_err(command_rejection)?;
                        commitments.unacked_messages.push(msg.clone());
                        let mut outputs = Outputs::default();
                        outputs.to_peer.push(msg);
                        Ok((state, outputs))
                    }
                },
                _ => unreachable!("GetState/GetStateData/GetInfo/Close/AddHtlc-gate handled above"),
            }
        }
    }
}

/// Local command failures are reported to the caller without changing state
/// (spec §7 "command rejection"); only peer-driven update algebra failures
/// are protocol faults.
fn command_rejection(err: Error) -> Error {
    match err {
        Error::CommandRejected(_) => err,
        other => Error::CommandRejected(other.to_string()),
    }
}

fn on_commitment_signed(
    state: ChannelState,
    msg: &lnp2p::bolt::CommitmentSigned,
) -> Result<(ChannelState, Outputs), Error> {
    let mut state = state;
    let commitments = state.commitments_mut().ok_or(Error::NoCommitmentToRevoke)?;
    let (revoke_msg, _novel) = commitments.receive_commit(msg)?;
    let mut outputs = Outputs::default();
    outputs.to_peer.push(revoke_msg);
    outputs.events.push(ChannelEvent::SignatureReceived);
    // spec §4.4: if changes are still pending after applying this commit,
    // immediately start another sign round rather than waiting for CMD_SIGN.
    maybe_resign(commitments, &mut outputs);
    Ok((state, outputs))
}

fn on_revoke_and_ack(
    state: ChannelState,
    msg: &lnp2p::bolt::RevokeAndAck,
) -> Result<(ChannelState, Outputs), Error> {
    let mut state = state;
    let commitments = state.commitments_mut().ok_or(Error::NoCommitmentToRevoke)?;
    let (newly_acked_adds, re_sign_asap) = commitments.receive_revocation(msg)?;
    let mut outputs = Outputs::default();
    for htlc in newly_acked_adds {
        outputs.to_relayer.push(RelayerMsg::ForwardAdd { htlc });
    }
    if re_sign_asap {
        maybe_resign(commitments, &mut outputs);
    }
    Ok((state, outputs))
}

/// Starts a new sign round if changes remain and none is already in flight;
/// if one is in flight, marks it to re-sign as soon as it resolves (spec
/// §4.4 `re_sign_asap`).
fn maybe_resign(commitments: &mut Commitments, outputs: &mut Outputs) {
    if !commitments.local_has_changes() {
        return;
    }
    match commitments.remote_next_commit_info {
        RemoteCommitInfo::Awaiting(ref mut waiting) => {
            waiting.re_sign_asap = true;
        }
        RemoteCommitInfo::Point(_) => {
            let secp = Secp256k1::new();
            if let Ok((msg, _commit)) = commitments.send_commit(&secp) {
                commitments.unacked_messages.push(msg.clone());
                outputs.to_peer.push(msg);
            }
        }
    }
}

/// Forwards a fulfilled HTLC to the relayer only the first time it settles
/// (spec §4.3 `receive_fulfill`'s replay tolerance must not double-forward).
fn forward_fulfill(
    commitments: &mut Commitments,
    id: u64,
    payment_preimage: bitcoin_scripts::hlc::HashPreimage,
) -> Result<Outputs, Error> {
    let mut outputs = Outputs::default();
    if commitments.receive_fulfill(id, payment_preimage)? {
        outputs.to_relayer.push(RelayerMsg::ForwardFulfill { id, payment_preimage });
    }
    Ok(outputs)
}

/// Forwards a failed HTLC to the relayer only the first time it settles.
fn forward_fail(commitments: &mut Commitments, id: u64, reason: Vec<u8>) -> Result<Outputs, Error> {
    let mut outputs = Outputs::default();
    if commitments.receive_fail(id, reason.clone())? {
        outputs.to_relayer.push(RelayerMsg::ForwardFail { id, reason });
    }
    Ok(outputs)
}

fn on_block_count(state: ChannelState, height: u32) -> Result<(ChannelState, Outputs), Error> {
    if let Some(commitments) = state.commitments() {
        if commitments.has_timedout_htlcs(height) {
            return Err(Error::HtlcTimedOut(0));
        }
    }
    Ok((state, Outputs::default()))
}

/// `CMD_CLOSE` (spec §4.5): if HTLCs are still in flight or a sign round is
/// outstanding the channel parks in `SHUTDOWN` until they drain; otherwise it
/// moves straight to `NEGOTIATING` once the peer's `shutdown` arrives too.
fn start_shutdown(
    state: ChannelState,
    final_script: Option<bitcoin_scripts::PubkeyScript>,
) -> Result<(ChannelState, Outputs), Error> {
    let commitments = state
        .commitments()
        .cloned()
        .ok_or_else(|| Error::CommandRejected("channel has no commitments yet".into()))?;
    let local_shutdown_script = final_script
        .or_else(|| commitments.local_keys.shutdown_scriptpubkey.clone())
        .unwrap_or_default();

    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::Shutdown(lnp2p::bolt::Shutdown {
        channel_id: commitments.channel_id,
        scriptpubkey: local_shutdown_script.clone(),
    }));

    Ok((
        ChannelState::Shutdown(DataShutdown {
            commitments,
            local_shutdown_script,
            remote_shutdown_script: None,
        }),
        outputs,
    ))
}

/// Once both `shutdown` scripts are known and no HTLCs or in-flight sign
/// rounds remain, promotes `SHUTDOWN` to `NEGOTIATING` (spec §4.5 -> §4.6).
fn drain_shutdown(data: DataShutdown) -> Result<(ChannelState, Outputs), Error> {
    let remote_script = match data.remote_shutdown_script.clone() {
        Some(script) => script,
        None => return Ok((ChannelState::Shutdown(data), Outputs::default())),
    };
    let ready = !data.commitments.local_has_changes()
        && !data.commitments.remote_next_commit_info.is_awaiting()
        && data.commitments.local_commit.spec.offered_htlcs.is_empty()
        && data.commitments.local_commit.spec.received_htlcs.is_empty();
    if !ready {
        return Ok((ChannelState::Shutdown(data), Outputs::default()));
    }
    Ok((
        ChannelState::Negotiating(DataNegotiating {
            commitments: data.commitments,
            local_shutdown_script: data.local_shutdown_script,
            remote_shutdown_script: remote_script,
            last_sent_fee: None,
            last_received_fee: None,
        }),
        Outputs::default(),
    ))
}

fn closing_balances(commitments: &Commitments) -> (u64, u64) {
    (
        commitments.local_commit.spec.local_amount_msat / 1000,
        commitments.local_commit.spec.remote_amount_msat / 1000,
    )
}

fn start_closing_signed(
    data: DataNegotiating,
    policy: &Policy,
    fee_override: Option<u64>,
) -> Result<(ChannelState, Outputs), Error> {
    let fee = fee_override.unwrap_or_else(|| data.commitments.local_params.dust_limit_satoshis.max(1));
    policy.validate_closing_fee(fee).map_err(Error::Policy)?;
    let (local_sat, remote_sat) = closing_balances(&data.commitments);
    let tx = closing::build_closing_tx(
        &data.commitments.commit_input,
        &data.local_shutdown_script,
        &data.remote_shutdown_script,
        local_sat,
        remote_sat,
        fee,
        data.commitments.is_originator,
    );
    let sig = crate::commitments::deterministic_sig(&tx);
    let mut outputs = Outputs::default();
    outputs.to_peer.push(Messages::ClosingSigned(lnp2p::bolt::ClosingSigned {
        channel_id: data.commitments.channel_id,
        fee_satoshis: fee,
        signature: sig,
    }));
    Ok((
        ChannelState::Negotiating(DataNegotiating { last_sent_fee: Some(fee), ..data }),
        outputs,
    ))
}

/// `closing_signed` fee convergence (spec §4.6, law L3): accept once the
/// peer's proposal matches ours, else counter with the midpoint.
fn on_closing_signed(
    mut data: DataNegotiating,
    policy: &Policy,
    msg: lnp2p::bolt::ClosingSigned,
) -> Result<(ChannelState, Outputs), Error> {
    policy.validate_closing_fee(msg.fee_satoshis).map_err(Error::Policy)?;
    data.last_received_fee = Some(msg.fee_satoshis);

    let our_last = data.last_sent_fee.unwrap_or(msg.fee_satoshis);
    match closing::negotiate_fee(our_last, msg.fee_satoshis) {
        FeeNegotiation::Agreed(fee) => {
            let (local_sat, remote_sat) = closing_balances(&data.commitments);
            let tx = closing::build_closing_tx(
                &data.commitments.commit_input,
                &data.local_shutdown_script,
                &data.remote_shutdown_script,
                local_sat,
                remote_sat,
                fee,
                data.commitments.is_originator,
            );
            let mut outcomes = ClosingOutcomes::default();
            outcomes.mutual_close_published = Some(tx.clone());
            let mut outputs = Outputs::default();
            outputs.to_blockchain.push(BlockchainRequest::PublishAsap(tx.clone()));
            outputs.to_blockchain.push(BlockchainRequest::WatchConfirmed {
                txid: tx.txid(),
                depth: 1,
                tag: WatchTag::CloseDone,
            });
            Ok((
                ChannelState::Closing(DataClosing {
                    commitments: data.commitments,
                    outcomes,
                    pending_confirmations: 0,
                }),
                outputs,
            ))
        }
        FeeNegotiation::Propose(fee) => start_closing_signed(data, policy, Some(fee)),
    }
}

fn closing_done_outputs() -> Outputs {
    let mut outputs = Outputs::default();
    outputs.events.push(ChannelEvent::Info("closing transaction confirmed".into()));
    outputs
}

/// Reacts to a spend of the funding outpoint observed while `CLOSING` (spec
/// §4.7): recognizes our own commitment, the peer's current commitment, or a
/// revoked one, and emits the matching claim transactions.
fn on_closing_spend(
    mut data: DataClosing,
    _tag: WatchTag,
    tx: bitcoin::Transaction,
) -> Result<(ChannelState, Outputs), Error> {
    let mut outputs = Outputs::default();
    let height = 0u32;
    if tx.txid() == data.commitments.local_commit.tx.txid() {
        data.outcomes.local_commit_published = Some(tx);
        let claims = closing::claim_current_local_commit_tx_outputs(&data.commitments, &[], height);
        data.pending_confirmations += arm_claim_watches(claims, WatchTag::LocalCommitDone, &mut outputs);
    } else if tx.txid() == data.commitments.remote_commit.tx.txid() {
        data.outcomes.remote_commit_published = Some(tx.clone());
        let remote_commit = data.commitments.remote_commit.clone();
        let claims =
            closing::claim_remote_commit_tx_outputs(&data.commitments, &remote_commit, &[], height);
        data.pending_confirmations += arm_claim_watches(claims, WatchTag::RemoteCommitDone, &mut outputs);
    } else if let Some(claims) = closing::claim_revoked_remote_commit_tx_outputs(&data.commitments, &tx) {
        data.outcomes.revoked_commit_published.push(tx);
        data.pending_confirmations += arm_claim_watches(claims, WatchTag::PenaltyDone, &mut outputs);
    } else {
        return Err(Error::InformationLeak);
    }
    Ok((ChannelState::Closing(data), outputs))
}

/// Publishes each claim and arms a depth-3 `WATCH_CONFIRMED` under `done_tag`
/// (spec §4.7), plus a `WATCH_SPENT` on the output it spends for HTLC claims
/// so the relayer can extract a preimage from a racing sweep. Returns how
/// many confirmations `on_closing_confirmed` should now wait for.
fn arm_claim_watches(
    claims: Vec<closing::ClaimTx>,
    done_tag: WatchTag,
    outputs: &mut Outputs,
) -> u32 {
    let mut armed = 0;
    for claim in claims {
        let txid = claim.tx.txid();
        if let Some(input) = claim.tx.input.first() {
            if let Some(id) = htlc_claim_id(claim.kind) {
                outputs.to_blockchain.push(BlockchainRequest::WatchSpent {
                    txid: input.previous_output.txid,
                    vout: input.previous_output.vout,
                    tag: WatchTag::HtlcSpent(id),
                });
            }
        }
        outputs.to_blockchain.push(BlockchainRequest::PublishAsap(claim.tx));
        outputs.to_blockchain.push(BlockchainRequest::WatchConfirmed { txid, depth: 3, tag: done_tag });
        armed += 1;
    }
    armed
}

fn htlc_claim_id(kind: closing::ClaimKind) -> Option<u64> {
    match kind {
        closing::ClaimKind::HtlcSuccess(id)
        | closing::ClaimKind::HtlcTimeout(id)
        | closing::ClaimKind::HtlcPenalty(id) => Some(id),
        _ => None,
    }
}

/// A previously-armed `WATCH_CONFIRMED` reached its depth (spec §4.7). A
/// `CloseDone` confirmation (mutual close) settles immediately; any other
/// tag is one of potentially several outstanding claims, and only the last
/// one to confirm moves the channel to `CLOSED`.
fn on_closing_confirmed(
    mut data: DataClosing,
    tag: WatchTag,
) -> Result<(ChannelState, Outputs), Error> {
    if let WatchTag::CloseDone = tag {
        return Ok((ChannelState::Closed, closing_done_outputs()));
    }
    data.pending_confirmations = data.pending_confirmations.saturating_sub(1);
    if data.pending_confirmations == 0 {
        return Ok((ChannelState::Closed, closing_done_outputs()));
    }
    Ok((ChannelState::Closing(data), Outputs::default()))
}

#[cfg(test)]
mod test {
    use amplify::DumbDefault;
    use bitcoin::hashes::Hash;
    use bitcoin_scripts::hlc::{HashLock, HashPreimage};

    use super::*;
    use crate::commitments::{ChangeStream, Commitment, CommitmentSpec};
    use crate::keyset::{LocalKeyset, RemoteKeyset};
    use crate::shachain::ShaChainStore;

    fn policy() -> Policy {
        let mut policy = Policy::default();
        policy.funding_satoshis_min = None;
        policy.feerate_per_kw_range = 0..1_000_000;
        policy
    }

    fn keys() -> LocalKeyset {
        LocalKeyset::dumb_default()
    }

    fn empty_tx() -> bitcoin::Transaction {
        bitcoin::Transaction {
            version: 2,
            lock_time: bitcoin::PackedLockTime::ZERO,
            input: vec![],
            output: vec![],
        }
    }

    /// S1: happy-path open. The funder emits `open_channel` immediately and
    /// sits in `WAIT_FOR_ACCEPT_CHANNEL`.
    #[test]
    fn funder_opens_with_open_channel_message() {
        let (channel, outputs) = Channel::new_funder(
            Slice32::from_inner([0u8; 32]),
            1_000_000,
            0,
            PeerParams::default(),
            CommonParams::default(),
            keys(),
            [1u8; 32],
            policy(),
        );
        assert_eq!(channel.state().name(), "WAIT_FOR_ACCEPT_CHANNEL");
        assert!(matches!(outputs.to_peer[0], Messages::OpenChannel(_)));
    }

    /// Fundee starts in `WAIT_FOR_OPEN_CHANNEL` with nothing sent yet.
    #[test]
    fn fundee_waits_for_open_channel() {
        let (channel, outputs) = Channel::new_fundee(PeerParams::default(), keys(), [2u8; 32], policy());
        assert_eq!(channel.state().name(), "WAIT_FOR_OPEN_CHANNEL");
        assert!(outputs.to_peer.is_empty());
    }

    /// A local command issued before any `Commitments` exists is rejected
    /// without changing state (spec §7 "command rejection").
    #[test]
    fn command_rejected_before_commitments_exist() {
        let (mut channel, _) = Channel::new_fundee(PeerParams::default(), keys(), [2u8; 32], policy());
        let outputs = channel.advance(Event::Command(Command::AddHtlc {
            amount_msat: 1000,
            payment_hash: HashLock::from(HashPreimage::from_inner([1u8; 32])),
            cltv_expiry: 500_000,
            origin: crate::collaborators::HtlcOrigin::Local,
        }));
        assert_eq!(channel.state().name(), "WAIT_FOR_OPEN_CHANNEL");
        assert!(matches!(outputs.events.first(), Some(ChannelEvent::CommandRejected(_))));
    }

    /// A disconnect/reconnect cycle replays unacknowledged messages
    /// untouched (spec §4.8) and is a no-op on any state machinery.
    #[test]
    fn reconnect_replays_unacked_messages() {
        let (mut channel, _) = Channel::new_fundee(PeerParams::default(), keys(), [2u8; 32], policy());
        channel.advance(Event::Disconnected);
        assert_eq!(channel.state().name(), "OFFLINE");
        let outputs = channel.advance(Event::Reconnected);
        assert_eq!(channel.state().name(), "WAIT_FOR_OPEN_CHANNEL");
        assert!(outputs.to_peer.is_empty());
    }

    fn dumb_commitments() -> Commitments {
        let local_keys = LocalKeyset::dumb_default();
        let remote_keys = RemoteKeyset::dumb_default();
        let spec = CommitmentSpec::new(1_000_000_000, 1_000_000_000);
        let commit = Commitment {
            index: 0,
            tx: empty_tx(),
            sig: crate::commitments::deterministic_sig(&empty_tx()),
            htlc_sigs: vec![],
            spec,
            per_commitment_point: remote_keys.first_per_commitment_point,
        };
        Commitments {
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
        }
    }

    /// S3: fee negotiation started in `NEGOTIATING` converges immediately
    /// when the peer's first proposal matches ours.
    #[test]
    fn closing_signed_agrees_immediately_on_matching_proposal() {
        let data = DataNegotiating {
            commitments: dumb_commitments(),
            local_shutdown_script: Default::default(),
            remote_shutdown_script: Default::default(),
            last_sent_fee: Some(500),
            last_received_fee: None,
        };
        let (state, outputs) = on_closing_signed(
            data,
            &policy(),
            lnp2p::bolt::ClosingSigned {
                channel_id: ChannelId::default(),
                fee_satoshis: 500,
                signature: crate::commitments::deterministic_sig(&empty_tx()),
            },
        )
        .unwrap();
        assert_eq!(state.name(), "CLOSING");
        assert!(outputs.to_blockchain.iter().any(|req| matches!(req, BlockchainRequest::PublishAsap(_))));
    }

    /// A fee proposal more than one round apart counters with the midpoint
    /// instead of publishing anything yet.
    #[test]
    fn closing_signed_counters_when_proposals_differ() {
        let data = DataNegotiating {
            commitments: dumb_commitments(),
            local_shutdown_script: Default::default(),
            remote_shutdown_script: Default::default(),
            last_sent_fee: Some(1000),
            last_received_fee: None,
        };
        let (state, outputs) = on_closing_signed(
            data,
            &policy(),
            lnp2p::bolt::ClosingSigned {
                channel_id: ChannelId::default(),
                fee_satoshis: 2000,
                signature: crate::commitments::deterministic_sig(&empty_tx()),
            },
        )
        .unwrap();
        assert_eq!(state.name(), "NEGOTIATING");
        assert!(matches!(outputs.to_peer.first(), Some(Messages::ClosingSigned(_))));
    }
}
